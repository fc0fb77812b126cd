//! Rejection of out-of-order lifecycle calls.
use super::Wrapper;
use crate::env::{Env, RenderFrame, Step};
use crate::error::GymError;
use crate::info::Info;
use crate::value::Value;
use anyhow::Result;
use log::warn;

/// Rejects `step` (and, by default, `render`) before the first `reset`.
pub struct OrderEnforcing<E: Env> {
    env: E,
    has_reset: bool,
    allow_render_before_reset: bool,
}

impl<E: Env> OrderEnforcing<E> {
    /// Wraps an environment.
    pub fn new(env: E) -> Self {
        Self {
            env,
            has_reset: false,
            allow_render_before_reset: false,
        }
    }

    /// Permits `render` calls before the first `reset`.
    pub fn allow_render_before_reset(mut self) -> Self {
        self.allow_render_before_reset = true;
        self
    }

    /// Whether the environment has been reset at least once.
    pub fn has_reset(&self) -> bool {
        self.has_reset
    }
}

impl<E: Env> Wrapper for OrderEnforcing<E> {
    type Inner = E;

    fn inner(&self) -> &E {
        &self.env
    }

    fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }

    fn reset(&mut self, seed: Option<u64>, options: Option<&Info>) -> Result<(Value, Info)> {
        let out = self.env.reset(seed, options)?;
        self.has_reset = true;
        Ok(out)
    }

    fn step(&mut self, action: &Value) -> Result<Step> {
        if !self.has_reset {
            return Err(GymError::OrderViolation("step".into()).into());
        }
        self.env.step(action)
    }

    fn render(&mut self) -> Option<RenderFrame> {
        if !self.has_reset && !self.allow_render_before_reset {
            warn!("render called before the first reset; returning no frame");
            return None;
        }
        self.env.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy::DummyEnv;

    #[test]
    fn step_before_reset_is_rejected() {
        let mut env = OrderEnforcing::new(DummyEnv::new(5));
        let err = Env::step(&mut env, &Value::Int(0)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GymError>(),
            Some(GymError::OrderViolation(_))
        ));
        Env::reset(&mut env, Some(0), None).unwrap();
        assert!(Env::step(&mut env, &Value::Int(0)).is_ok());
    }

    #[test]
    fn render_before_reset_yields_no_frame() {
        let mut env = OrderEnforcing::new(DummyEnv::new(5));
        assert_eq!(Wrapper::render(&mut env), None);
    }
}
