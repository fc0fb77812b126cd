//! Episode truncation after a fixed step budget.
use super::Wrapper;
use crate::env::{Env, Step};
use crate::error::GymError;
use crate::info::{Info, InfoValue, KEY_TIME_LIMIT};
use crate::value::Value;
use anyhow::Result;

/// Forces `truncated = true` once an episode reaches `max_steps` steps.
///
/// A limit-induced truncation is tagged `info["TimeLimit.truncated"]`, which
/// distinguishes it from a truncation the environment reported itself.
pub struct TimeLimit<E: Env> {
    env: E,
    max_steps: usize,
    elapsed: usize,
}

impl<E: Env> TimeLimit<E> {
    /// Wraps an environment with a step budget. `max_steps` must be positive.
    pub fn new(env: E, max_steps: usize) -> Result<Self> {
        if max_steps == 0 {
            return Err(GymError::InvalidConfig("TimeLimit needs max_steps > 0".into()).into());
        }
        Ok(Self {
            env,
            max_steps,
            elapsed: 0,
        })
    }

    /// Steps taken in the current episode.
    pub fn elapsed(&self) -> usize {
        self.elapsed
    }
}

impl<E: Env> Wrapper for TimeLimit<E> {
    type Inner = E;

    fn inner(&self) -> &E {
        &self.env
    }

    fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }

    fn reset(&mut self, seed: Option<u64>, options: Option<&Info>) -> Result<(Value, Info)> {
        self.elapsed = 0;
        self.env.reset(seed, options)
    }

    fn step(&mut self, action: &Value) -> Result<Step> {
        let mut step = self.env.step(action)?;
        self.elapsed += 1;
        if self.elapsed >= self.max_steps && !step.truncated {
            step.truncated = true;
            step.info.insert(KEY_TIME_LIMIT, InfoValue::Bool(true));
        }
        Ok(step)
    }
}
