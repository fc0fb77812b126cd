//! Wrapper composition.
//!
//! A [`Wrapper`] is an environment that owns exactly one inner environment
//! and layers a cross-cutting behavior around it: order enforcement, time
//! limits, observation transforms, statistics. Wrappers form a linear chain
//! by construction; every operation has a default that delegates to the
//! inner environment, so a concrete wrapper overrides only the operations
//! whose contract it changes.
//!
//! A wrapper's constructor validates its precondition against the *direct*
//! inner environment's declared spaces only; a failure therefore surfaces at
//! the first non-conforming layer of a chain.
mod action;
mod autoreset;
mod episode_statistics;
mod flatten_observation;
mod frame_skip;
mod frame_stack;
mod image;
mod normalize;
mod order_enforcing;
mod passive_checker;
mod time_limit;
mod transform;

pub use action::{ClipAction, RescaleAction};
pub use autoreset::{AutoReset, AutoResetMode};
pub use episode_statistics::RecordEpisodeStatistics;
pub use flatten_observation::FlattenObservation;
pub use frame_skip::FrameSkip;
pub use frame_stack::{FrameStack, StackPadding};
pub use image::{GrayscaleObservation, ResizeObservation};
pub use normalize::{NormalizeObservation, NormalizeReward, RunningMeanStd};
pub use order_enforcing::OrderEnforcing;
pub use passive_checker::PassiveEnvChecker;
pub use time_limit::TimeLimit;
pub use transform::{ShapeReward, TransformObservation, TransformReward};

use crate::env::{Env, EnvSpec, RenderFrame, Step};
use crate::info::Info;
use crate::space::Space;
use crate::value::Value;
use anyhow::Result;

/// An environment that delegates to an owned inner environment.
///
/// Implementors override only the operations they modify; the blanket
/// [`Env`] implementation forwards everything else unchanged.
pub trait Wrapper {
    /// The wrapped environment.
    type Inner: Env;

    /// The inner environment.
    fn inner(&self) -> &Self::Inner;

    /// The inner environment, mutably.
    fn inner_mut(&mut self) -> &mut Self::Inner;

    /// See [`Env::observation_space`].
    fn observation_space(&self) -> &Space {
        self.inner().observation_space()
    }

    /// See [`Env::action_space`].
    fn action_space(&self) -> &Space {
        self.inner().action_space()
    }

    /// See [`Env::reset`].
    fn reset(&mut self, seed: Option<u64>, options: Option<&Info>) -> Result<(Value, Info)> {
        self.inner_mut().reset(seed, options)
    }

    /// See [`Env::step`].
    fn step(&mut self, action: &Value) -> Result<Step> {
        self.inner_mut().step(action)
    }

    /// See [`Env::render`].
    fn render(&mut self) -> Option<RenderFrame> {
        self.inner_mut().render()
    }

    /// See [`Env::close`].
    fn close(&mut self) {
        self.inner_mut().close()
    }

    /// See [`Env::spec`].
    fn spec(&self) -> Option<&EnvSpec> {
        self.inner().spec()
    }
}

impl<W: Wrapper> Env for W {
    fn observation_space(&self) -> &Space {
        Wrapper::observation_space(self)
    }

    fn action_space(&self) -> &Space {
        Wrapper::action_space(self)
    }

    fn reset(&mut self, seed: Option<u64>, options: Option<&Info>) -> Result<(Value, Info)> {
        Wrapper::reset(self, seed, options)
    }

    fn step(&mut self, action: &Value) -> Result<Step> {
        Wrapper::step(self, action)
    }

    fn render(&mut self) -> Option<RenderFrame> {
        Wrapper::render(self)
    }

    fn close(&mut self) {
        Wrapper::close(self)
    }

    fn spec(&self) -> Option<&EnvSpec> {
        Wrapper::spec(self)
    }
}
