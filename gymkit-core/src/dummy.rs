//! A deterministic environment used by tests across the workspace.
use crate::env::{Env, Step};
use crate::error::GymError;
use crate::info::Info;
use crate::rng::EnvRng;
use crate::space::Space;
use crate::value::Value;
use anyhow::Result;
use rand::Rng;

/// A minimal environment with a 1-dimensional `Box` observation and a
/// `Discrete(2)` action space.
///
/// The reset observation is a uniform draw in `[0, 1)` from the seeded RNG
/// stream; each step emits reward 1.0 and the current step count as the
/// observation, and terminates once `horizon` steps were taken. It never
/// truncates on its own.
pub struct DummyEnv {
    observation_space: Space,
    action_space: Space,
    horizon: usize,
    count: usize,
    rng: Option<EnvRng>,
    live: bool,
}

impl DummyEnv {
    /// Creates an environment terminating after `horizon` steps.
    pub fn new(horizon: usize) -> Self {
        Self {
            observation_space: Space::boxed_uniform(0.0, f64::INFINITY, &[1])
                .expect("valid bounds"),
            action_space: Space::discrete(2).expect("valid n"),
            horizon,
            count: 0,
            rng: None,
            live: false,
        }
    }

    /// Steps taken in the current episode.
    pub fn count(&self) -> usize {
        self.count
    }
}

impl Env for DummyEnv {
    fn observation_space(&self) -> &Space {
        &self.observation_space
    }

    fn action_space(&self) -> &Space {
        &self.action_space
    }

    fn reset(&mut self, seed: Option<u64>, _options: Option<&Info>) -> Result<(Value, Info)> {
        if let Some(seed) = seed {
            self.rng = Some(EnvRng::from_seed(seed));
        }
        let rng = self.rng.get_or_insert_with(EnvRng::from_entropy);
        let obs = rng.fork().gen_range(0.0..1.0);
        self.count = 0;
        self.live = true;
        Ok((Value::vec(vec![obs]), Info::empty()))
    }

    fn step(&mut self, _action: &Value) -> Result<Step> {
        if !self.live {
            return Err(GymError::ResetNeeded("DummyEnv".into()).into());
        }
        self.count += 1;
        let terminated = self.count >= self.horizon;
        if terminated {
            self.live = false;
        }
        Ok(Step::new(
            Value::vec(vec![self.count as f64]),
            1.0,
            terminated,
            false,
        ))
    }
}
