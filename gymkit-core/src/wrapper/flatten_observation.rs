//! Flattening of structured observations to 1-dimensional tensors.
use super::Wrapper;
use crate::env::{Env, Step};
use crate::error::GymError;
use crate::info::Info;
use crate::space::{flatten, flatten_space, Space};
use crate::value::Value;
use anyhow::Result;

/// Flattens every observation through the canonical flattening of the inner
/// observation space.
///
/// The inner observation space must flatten to a `Box`; wrapping an
/// environment whose space has no `Box` flattening (`Sequence`, `Graph`) is
/// a configuration error.
pub struct FlattenObservation<E: Env> {
    env: E,
    observation_space: Space,
}

impl<E: Env> FlattenObservation<E> {
    /// Wraps an environment.
    pub fn new(env: E) -> Result<Self> {
        let observation_space = flatten_space(env.observation_space())?;
        match &observation_space {
            Space::Box(_) => {}
            other => {
                return Err(GymError::SpaceMismatch(format!(
                    "FlattenObservation needs an observation space flattening to a Box, got {:?}",
                    other
                ))
                .into())
            }
        }
        Ok(Self {
            env,
            observation_space,
        })
    }
}

impl<E: Env> Wrapper for FlattenObservation<E> {
    type Inner = E;

    fn inner(&self) -> &E {
        &self.env
    }

    fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }

    fn observation_space(&self) -> &Space {
        &self.observation_space
    }

    fn reset(&mut self, seed: Option<u64>, options: Option<&Info>) -> Result<(Value, Info)> {
        let (obs, info) = self.env.reset(seed, options)?;
        Ok((flatten(self.env.observation_space(), &obs)?, info))
    }

    fn step(&mut self, action: &Value) -> Result<Step> {
        let mut step = self.env.step(action)?;
        step.obs = flatten(self.env.observation_space(), &step.obs)?;
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Env;
    use crate::rng::EnvRng;

    struct DictObsEnv {
        obs: Space,
        act: Space,
        rng: EnvRng,
    }

    impl DictObsEnv {
        fn new() -> Self {
            Self {
                obs: Space::dict(vec![
                    ("cell", Space::discrete(3).unwrap()),
                    ("pos", Space::boxed_uniform(-1.0, 1.0, &[2]).unwrap()),
                ]),
                act: Space::discrete(2).unwrap(),
                rng: EnvRng::from_seed(0),
            }
        }
    }

    impl Env for DictObsEnv {
        fn observation_space(&self) -> &Space {
            &self.obs
        }
        fn action_space(&self) -> &Space {
            &self.act
        }
        fn reset(&mut self, seed: Option<u64>, _: Option<&Info>) -> Result<(Value, Info)> {
            if let Some(seed) = seed {
                self.rng = EnvRng::from_seed(seed);
            }
            Ok((self.obs.sample(&mut self.rng), Info::empty()))
        }
        fn step(&mut self, _: &Value) -> Result<Step> {
            let obs = self.obs.sample(&mut self.rng);
            Ok(Step::new(obs, 0.0, false, false))
        }
    }

    #[test]
    fn observations_are_flat_box_members() {
        let mut env = FlattenObservation::new(DictObsEnv::new()).unwrap();
        // One-hot of 3 plus a 2-dimensional box.
        assert_eq!(Wrapper::observation_space(&env).shape(), Some(vec![5]));
        let (obs, _) = Wrapper::reset(&mut env, Some(4), None).unwrap();
        assert!(Wrapper::observation_space(&env).contains(&obs));
        let step = Wrapper::step(&mut env, &Value::Int(0)).unwrap();
        assert!(Wrapper::observation_space(&env).contains(&step.obs));
    }

    #[test]
    fn sequence_observation_space_is_rejected() {
        struct SeqObsEnv {
            obs: Space,
            act: Space,
        }
        impl Env for SeqObsEnv {
            fn observation_space(&self) -> &Space {
                &self.obs
            }
            fn action_space(&self) -> &Space {
                &self.act
            }
            fn reset(&mut self, _: Option<u64>, _: Option<&Info>) -> Result<(Value, Info)> {
                unreachable!()
            }
            fn step(&mut self, _: &Value) -> Result<Step> {
                unreachable!()
            }
        }
        let env = SeqObsEnv {
            obs: Space::sequence(Space::discrete(2).unwrap(), 0, 3).unwrap(),
            act: Space::discrete(2).unwrap(),
        };
        assert!(FlattenObservation::new(env).is_err());
    }
}
