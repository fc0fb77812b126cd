#![warn(missing_docs)]
//! Reinforcement learning environments in Rust.
//!
//! Gymkit consists of the following crates:
//!
//! * [gymkit-core](../gymkit_core/index.html) provides the environment
//!   contract, observation/action spaces, the wrapper composition protocol
//!   and the global environment registry.
//! * [gymkit-classic](../gymkit_classic/index.html) provides classic control
//!   and toy-text environments built on the core abstractions.
//!
//! This crate re-exports both and wires the bundled environments into the
//! registry through [`init`].
pub use gymkit_classic as classic;
pub use gymkit_core as core;

pub use gymkit_core::{
    registry::{make, register, spec_of, MakeOptions, Registration},
    Env, EnvSpec, GymError, Info, InfoValue, RenderFrame, RenderMode, Space, Step, Value, Wrapper,
};

use anyhow::Result;

/// Registers all bundled environments. Call once per process.
pub fn init() -> Result<()> {
    gymkit_classic::register_all()
}
