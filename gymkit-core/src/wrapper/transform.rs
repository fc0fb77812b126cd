//! Caller-supplied observation and reward transforms.
use super::Wrapper;
use crate::env::{Env, Step};
use crate::info::Info;
use crate::space::Space;
use crate::value::Value;
use anyhow::Result;

/// Applies a pure function to every observation.
///
/// When the function changes the observation's domain, the transformed space
/// must be supplied; otherwise the inner space is declared unchanged.
pub struct TransformObservation<E: Env> {
    env: E,
    f: Box<dyn Fn(Value) -> Value + Send>,
    observation_space: Option<Space>,
}

impl<E: Env> TransformObservation<E> {
    /// Wraps an environment with an observation function, keeping the inner
    /// observation space.
    pub fn new(env: E, f: impl Fn(Value) -> Value + Send + 'static) -> Self {
        Self {
            env,
            f: Box::new(f),
            observation_space: None,
        }
    }

    /// Wraps an environment with an observation function and the space the
    /// transformed observations live in.
    pub fn with_space(
        env: E,
        space: Space,
        f: impl Fn(Value) -> Value + Send + 'static,
    ) -> Self {
        Self {
            env,
            f: Box::new(f),
            observation_space: Some(space),
        }
    }
}

impl<E: Env> Wrapper for TransformObservation<E> {
    type Inner = E;

    fn inner(&self) -> &E {
        &self.env
    }

    fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }

    fn observation_space(&self) -> &Space {
        self.observation_space
            .as_ref()
            .unwrap_or_else(|| self.env.observation_space())
    }

    fn reset(&mut self, seed: Option<u64>, options: Option<&Info>) -> Result<(Value, Info)> {
        let (obs, info) = self.env.reset(seed, options)?;
        Ok(((self.f)(obs), info))
    }

    fn step(&mut self, action: &Value) -> Result<Step> {
        let mut step = self.env.step(action)?;
        step.obs = (self.f)(step.obs);
        Ok(step)
    }
}

/// Applies a pure function to every scalar reward.
pub struct TransformReward<E: Env> {
    env: E,
    f: Box<dyn Fn(f64) -> f64 + Send>,
}

impl<E: Env> TransformReward<E> {
    /// Wraps an environment with a reward function.
    pub fn new(env: E, f: impl Fn(f64) -> f64 + Send + 'static) -> Self {
        Self {
            env,
            f: Box::new(f),
        }
    }
}

impl<E: Env> Wrapper for TransformReward<E> {
    type Inner = E;

    fn inner(&self) -> &E {
        &self.env
    }

    fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }

    fn step(&mut self, action: &Value) -> Result<Step> {
        let mut step = self.env.step(action)?;
        step.reward = (self.f)(step.reward);
        Ok(step)
    }
}

/// Reshapes the reward with access to the step's observation and
/// termination flag.
pub struct ShapeReward<E: Env> {
    env: E,
    f: Box<dyn Fn(f64, &Value, bool) -> f64 + Send>,
}

impl<E: Env> ShapeReward<E> {
    /// Wraps an environment with a shaping function
    /// `(reward, observation, terminated) -> reward`.
    pub fn new(env: E, f: impl Fn(f64, &Value, bool) -> f64 + Send + 'static) -> Self {
        Self {
            env,
            f: Box::new(f),
        }
    }
}

impl<E: Env> Wrapper for ShapeReward<E> {
    type Inner = E;

    fn inner(&self) -> &E {
        &self.env
    }

    fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }

    fn step(&mut self, action: &Value) -> Result<Step> {
        let mut step = self.env.step(action)?;
        step.reward = (self.f)(step.reward, &step.obs, step.terminated);
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy::DummyEnv;

    #[test]
    fn observation_function_applies_to_reset_and_step() {
        let mut env = TransformObservation::new(DummyEnv::new(5), |obs| match obs {
            Value::Array(a) => Value::Array(a.mapv(|x| x * 2.0)),
            other => other,
        });
        let (obs, _) = Wrapper::reset(&mut env, Some(1), None).unwrap();
        let raw = obs.as_array().unwrap()[0];
        assert!(raw < 2.0);
        let step = Wrapper::step(&mut env, &Value::Int(0)).unwrap();
        assert_eq!(step.obs, Value::vec(vec![2.0]));
    }

    #[test]
    fn reward_function_applies_per_step() {
        let mut env = TransformReward::new(DummyEnv::new(5), |r| -r);
        Wrapper::reset(&mut env, Some(1), None).unwrap();
        let step = Wrapper::step(&mut env, &Value::Int(0)).unwrap();
        assert_eq!(step.reward, -1.0);
    }

    #[test]
    fn shaping_sees_observation_and_termination() {
        let mut env = ShapeReward::new(DummyEnv::new(2), |r, obs, terminated| {
            let x = obs.as_array().unwrap()[0];
            if terminated {
                r + 100.0
            } else {
                r + x
            }
        });
        Wrapper::reset(&mut env, Some(1), None).unwrap();
        assert_eq!(Wrapper::step(&mut env, &Value::Int(0)).unwrap().reward, 2.0);
        assert_eq!(
            Wrapper::step(&mut env, &Value::Int(0)).unwrap().reward,
            101.0
        );
    }
}
