#![warn(missing_docs)]
//! Core abstractions for reinforcement learning environments.
//!
//! This crate provides the environment contract ([`Env`], [`Step`]), the
//! observation/action domains ([`Space`], [`Value`]), the [`Wrapper`]
//! composition protocol with a suite of standard wrappers, and a global
//! [`registry`](crate::registry) for building environments by id.
pub mod config;
pub mod error;
pub mod registry;
pub mod space;
pub mod wrapper;

mod dummy;
mod env;
mod info;
mod rng;
mod value;

pub use dummy::DummyEnv;
pub use env::{Env, EnvSpec, RenderFrame, RenderMode, Step};
pub use error::GymError;
pub use info::{Info, InfoValue, KEY_EPISODE, KEY_FINAL_INFO, KEY_FINAL_OBS, KEY_TIME_LIMIT};
pub use rng::EnvRng;
pub use space::Space;
pub use value::{GraphValue, SeqValue, Value};
pub use wrapper::Wrapper;
