//! Action clipping and rescaling.
use super::Wrapper;
use crate::env::{Env, Step};
use crate::error::GymError;
use crate::space::Space;
use crate::value::Value;
use anyhow::Result;
use ndarray::ArrayD;

fn box_action_space<E: Env>(env: &E, wrapper: &str) -> Result<(ArrayD<f64>, ArrayD<f64>)> {
    match env.action_space() {
        Space::Box(b) => Ok((b.low.clone(), b.high.clone())),
        other => Err(GymError::SpaceMismatch(format!(
            "{} needs a Box action space, got {:?}",
            wrapper, other
        ))
        .into()),
    }
}

fn as_action_array<'a>(action: &'a Value, shape: &[usize]) -> Result<&'a ArrayD<f64>> {
    let a = action.as_array().ok_or_else(|| {
        GymError::OutOfSpace(format!("expected an Array action, got {}", action.kind()))
    })?;
    if a.shape() != shape {
        return Err(GymError::OutOfSpace(format!(
            "action shape {:?} does not match {:?}",
            a.shape(),
            shape
        ))
        .into());
    }
    Ok(a)
}

/// Clips incoming actions elementwise into the inner `Box` action bounds.
///
/// The declared action space becomes unbounded: any array of the right
/// shape is accepted and clipped.
pub struct ClipAction<E: Env> {
    env: E,
    action_space: Space,
    low: ArrayD<f64>,
    high: ArrayD<f64>,
}

impl<E: Env> ClipAction<E> {
    /// Wraps an environment whose action space is a `Box`.
    pub fn new(env: E) -> Result<Self> {
        let (low, high) = box_action_space(&env, "ClipAction")?;
        let action_space =
            Space::boxed_uniform(f64::NEG_INFINITY, f64::INFINITY, low.shape())?;
        Ok(Self {
            env,
            action_space,
            low,
            high,
        })
    }
}

impl<E: Env> Wrapper for ClipAction<E> {
    type Inner = E;

    fn inner(&self) -> &E {
        &self.env
    }

    fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }

    fn action_space(&self) -> &Space {
        &self.action_space
    }

    fn step(&mut self, action: &Value) -> Result<Step> {
        let a = as_action_array(action, self.low.shape())?;
        let mut clipped = a.clone();
        ndarray::Zip::from(&mut clipped)
            .and(&self.low)
            .and(&self.high)
            .for_each(|x, l, h| *x = x.max(*l).min(*h));
        self.env.step(&Value::Array(clipped))
    }
}

/// Affinely rescales actions from a declared source range into the inner
/// `Box` bounds, then clips.
pub struct RescaleAction<E: Env> {
    env: E,
    action_space: Space,
    min: f64,
    max: f64,
    low: ArrayD<f64>,
    high: ArrayD<f64>,
}

impl<E: Env> RescaleAction<E> {
    /// Wraps an environment whose action space is a bounded `Box`; incoming
    /// actions are declared to live in `[min, max]` per element.
    pub fn new(env: E, min: f64, max: f64) -> Result<Self> {
        if !(min < max) {
            return Err(GymError::InvalidConfig(format!(
                "RescaleAction needs min < max, got [{}, {}]",
                min, max
            ))
            .into());
        }
        let (low, high) = box_action_space(&env, "RescaleAction")?;
        if low.iter().any(|l| !l.is_finite()) || high.iter().any(|h| !h.is_finite()) {
            return Err(GymError::SpaceMismatch(
                "RescaleAction needs a fully bounded Box action space".into(),
            )
            .into());
        }
        let action_space = Space::boxed_uniform(min, max, low.shape())?;
        Ok(Self {
            env,
            action_space,
            min,
            max,
            low,
            high,
        })
    }
}

impl<E: Env> Wrapper for RescaleAction<E> {
    type Inner = E;

    fn inner(&self) -> &E {
        &self.env
    }

    fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }

    fn action_space(&self) -> &Space {
        &self.action_space
    }

    fn step(&mut self, action: &Value) -> Result<Step> {
        let a = as_action_array(action, self.low.shape())?;
        let span = self.max - self.min;
        let mut scaled = a.clone();
        ndarray::Zip::from(&mut scaled)
            .and(&self.low)
            .and(&self.high)
            .for_each(|x, l, h| {
                let t = (*x - self.min) / span;
                *x = (l + t * (h - l)).max(*l).min(*h);
            });
        self.env.step(&Value::Array(scaled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Env;
    use crate::info::Info;

    /// Echoes the received action back as its observation.
    struct EchoEnv {
        obs: Space,
        act: Space,
    }

    impl EchoEnv {
        fn new(low: f64, high: f64) -> Self {
            Self {
                obs: Space::boxed_uniform(f64::NEG_INFINITY, f64::INFINITY, &[2]).unwrap(),
                act: Space::boxed_uniform(low, high, &[2]).unwrap(),
            }
        }
    }

    impl Env for EchoEnv {
        fn observation_space(&self) -> &Space {
            &self.obs
        }
        fn action_space(&self) -> &Space {
            &self.act
        }
        fn reset(&mut self, _: Option<u64>, _: Option<&Info>) -> Result<(Value, Info)> {
            Ok((Value::vec(vec![0.0, 0.0]), Info::empty()))
        }
        fn step(&mut self, action: &Value) -> Result<Step> {
            Ok(Step::new(action.clone(), 0.0, false, false))
        }
    }

    #[test]
    fn clip_pulls_actions_into_bounds() {
        let mut env = ClipAction::new(EchoEnv::new(-1.0, 1.0)).unwrap();
        Wrapper::reset(&mut env, None, None).unwrap();
        let step = Wrapper::step(&mut env, &Value::vec(vec![5.0, -5.0])).unwrap();
        assert_eq!(step.obs, Value::vec(vec![1.0, -1.0]));
    }

    #[test]
    fn clip_declares_an_unbounded_action_space() {
        let env = ClipAction::new(EchoEnv::new(-1.0, 1.0)).unwrap();
        assert!(Wrapper::action_space(&env).contains(&Value::vec(vec![1e9, -1e9])));
    }

    #[test]
    fn rescale_maps_the_source_range_onto_the_bounds() {
        let mut env = RescaleAction::new(EchoEnv::new(0.0, 10.0), -1.0, 1.0).unwrap();
        Wrapper::reset(&mut env, None, None).unwrap();
        let step = Wrapper::step(&mut env, &Value::vec(vec![-1.0, 1.0])).unwrap();
        assert_eq!(step.obs, Value::vec(vec![0.0, 10.0]));
        let step = Wrapper::step(&mut env, &Value::vec(vec![0.0, 0.0])).unwrap();
        assert_eq!(step.obs, Value::vec(vec![5.0, 5.0]));
    }

    #[test]
    fn rescale_requires_bounded_bounds() {
        struct UnboundedEnv(EchoEnv, Space);
        impl Env for UnboundedEnv {
            fn observation_space(&self) -> &Space {
                self.0.observation_space()
            }
            fn action_space(&self) -> &Space {
                &self.1
            }
            fn reset(&mut self, s: Option<u64>, o: Option<&Info>) -> Result<(Value, Info)> {
                self.0.reset(s, o)
            }
            fn step(&mut self, a: &Value) -> Result<Step> {
                self.0.step(a)
            }
        }
        let env = UnboundedEnv(
            EchoEnv::new(-1.0, 1.0),
            Space::boxed_uniform(f64::NEG_INFINITY, f64::INFINITY, &[2]).unwrap(),
        );
        assert!(RescaleAction::new(env, -1.0, 1.0).is_err());
    }
}
