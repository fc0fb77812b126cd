//! Action repetition across several inner steps.
use super::Wrapper;
use crate::env::{Env, Step};
use crate::error::GymError;
use crate::value::Value;
use anyhow::Result;

/// Repeats the same action for `skip` inner steps, summing rewards.
///
/// If any inner step ends the episode, the loop short-circuits and the
/// result carries that step's observation, flags and info.
pub struct FrameSkip<E: Env> {
    env: E,
    skip: usize,
}

impl<E: Env> FrameSkip<E> {
    /// Wraps an environment. `skip` must be positive.
    pub fn new(env: E, skip: usize) -> Result<Self> {
        if skip == 0 {
            return Err(GymError::InvalidConfig("FrameSkip needs skip > 0".into()).into());
        }
        Ok(Self { env, skip })
    }
}

impl<E: Env> Wrapper for FrameSkip<E> {
    type Inner = E;

    fn inner(&self) -> &E {
        &self.env
    }

    fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }

    fn step(&mut self, action: &Value) -> Result<Step> {
        let mut total = 0.0;
        let mut last = None;
        for _ in 0..self.skip {
            let step = self.env.step(action)?;
            total += step.reward;
            let done = step.is_done();
            last = Some(step);
            if done {
                break;
            }
        }
        let mut step = last.expect("skip >= 1 guarantees at least one inner step");
        step.reward = total;
        Ok(step)
    }
}
