//! The environment contract.
//!
//! An environment is a state machine: constructed → `Ready` after the first
//! successful [`Env::reset`] → `Ready` after a non-final [`Env::step`] →
//! `Done` once a step reports `terminated || truncated`. From `Done` only
//! `reset` is defined; stepping a finished or never-reset episode fails with
//! [`GymError::ResetNeeded`](crate::error::GymError::ResetNeeded). This hard
//! policy is applied uniformly by every environment in the suite.
use crate::info::Info;
use crate::space::Space;
use crate::value::Value;
use anyhow::Result;

/// Result of one interaction step: `(o_{t+1}, r_t, terminated, truncated)`
/// plus auxiliary metadata.
///
/// `terminated` and `truncated` are orthogonal and semantically distinct:
/// `terminated` marks an absorbing MDP state (no continuation value),
/// `truncated` marks an external cutoff (continuation value still applies).
/// Value bootstrapping downstream must not conflate them.
#[derive(Debug, Clone)]
pub struct Step {
    /// Observation after the step.
    pub obs: Value,

    /// Scalar reward of the step.
    pub reward: f64,

    /// The episode reached a terminal MDP state.
    pub terminated: bool,

    /// The episode was cut off by an external limit.
    pub truncated: bool,

    /// Auxiliary metadata of the step.
    pub info: Info,
}

impl Step {
    /// Builds a step with empty info.
    pub fn new(obs: Value, reward: f64, terminated: bool, truncated: bool) -> Self {
        Self {
            obs,
            reward,
            terminated,
            truncated,
            info: Info::empty(),
        }
    }

    /// Terminated or truncated.
    pub fn is_done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// How an environment presents itself when [`Env::render`] is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RenderMode {
    /// Text snapshot, e.g. a character grid.
    Ansi,
}

/// A renderer-defined snapshot returned by [`Env::render`].
#[derive(Debug, Clone, PartialEq)]
pub enum RenderFrame {
    /// A text snapshot.
    Text(String),
}

/// Static metadata of a constructed environment.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EnvSpec {
    /// Environment id, e.g. `"CartPole-v1"`.
    pub id: String,

    /// Step budget enforced by the standard `TimeLimit` wrapper.
    pub max_episode_steps: Option<usize>,

    /// Reward at which the task counts as solved.
    pub reward_threshold: Option<f64>,

    /// Names of the wrappers applied around the base environment, innermost
    /// first.
    pub applied_wrappers: Vec<String>,
}

impl EnvSpec {
    /// Creates a spec with the given id and no metadata.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            max_episode_steps: None,
            reward_threshold: None,
            applied_wrappers: Vec::new(),
        }
    }

    /// Sets the step budget.
    pub fn max_episode_steps(mut self, steps: usize) -> Self {
        self.max_episode_steps = Some(steps);
        self
    }

    /// Sets the solved threshold.
    pub fn reward_threshold(mut self, threshold: f64) -> Self {
        self.reward_threshold = Some(threshold);
        self
    }
}

/// A simulated task with the `reset`/`step` lifecycle.
///
/// Observation and action spaces are fixed for the lifetime of the instance.
/// An environment owns its internal state exclusively; callers wanting
/// parallelism hold multiple independent instances, each with its own RNG
/// stream.
pub trait Env {
    /// The domain of observations this environment emits.
    fn observation_space(&self) -> &Space;

    /// The domain of actions this environment accepts.
    fn action_space(&self) -> &Space;

    /// Starts a new episode and returns the initial observation.
    ///
    /// Providing a `seed` reseeds the internal RNG stream; otherwise the
    /// stream is preserved (or lazily initialized from entropy on first
    /// use). `options` carries environment-specific reset parameters.
    fn reset(&mut self, seed: Option<u64>, options: Option<&Info>) -> Result<(Value, Info)>;

    /// Advances the simulation by one timestep.
    ///
    /// The action must be a member of [`Env::action_space`]; a validating
    /// wrapper rejects violations before they reach the simulation.
    fn step(&mut self, action: &Value) -> Result<Step>;

    /// Returns a render snapshot, or `None` if no render mode is configured.
    ///
    /// Must not mutate simulation state.
    fn render(&mut self) -> Option<RenderFrame> {
        None
    }

    /// Releases render resources. Idempotent.
    fn close(&mut self) {}

    /// Static metadata, if the environment was built through the registry.
    fn spec(&self) -> Option<&EnvSpec> {
        None
    }
}

impl Env for Box<dyn Env> {
    fn observation_space(&self) -> &Space {
        (**self).observation_space()
    }

    fn action_space(&self) -> &Space {
        (**self).action_space()
    }

    fn reset(&mut self, seed: Option<u64>, options: Option<&Info>) -> Result<(Value, Info)> {
        (**self).reset(seed, options)
    }

    fn step(&mut self, action: &Value) -> Result<Step> {
        (**self).step(action)
    }

    fn render(&mut self) -> Option<RenderFrame> {
        (**self).render()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn spec(&self) -> Option<&EnvSpec> {
        (**self).spec()
    }
}
