//! Running normalization of observations and rewards.
use super::Wrapper;
use crate::env::{Env, Step};
use crate::error::GymError;
use crate::info::Info;
use crate::space::Space;
use crate::value::Value;
use anyhow::Result;
use ndarray::ArrayD;

/// Welford-style running mean and variance over tensors.
#[derive(Debug, Clone)]
pub struct RunningMeanStd {
    mean: ArrayD<f64>,
    var: ArrayD<f64>,
    count: f64,
}

impl RunningMeanStd {
    /// Creates statistics for tensors of the given shape.
    pub fn new(shape: &[usize]) -> Self {
        Self {
            mean: ArrayD::zeros(ndarray::IxDyn(shape)),
            var: ArrayD::ones(ndarray::IxDyn(shape)),
            count: 1e-4,
        }
    }

    /// Folds one sample into the statistics.
    pub fn update(&mut self, x: &ArrayD<f64>) {
        let delta = x - &self.mean;
        let total = self.count + 1.0;
        self.mean = &self.mean + &(&delta * (1.0 / total));
        let m_a = &self.var * self.count;
        let m_b = &delta * &delta * (self.count / total);
        self.var = (m_a + m_b) / total;
        self.count = total;
    }

    /// Normalizes a sample by the current statistics.
    pub fn normalize(&self, x: &ArrayD<f64>, epsilon: f64) -> ArrayD<f64> {
        (x - &self.mean) / self.var.mapv(|v| (v + epsilon).sqrt())
    }

    /// Current running mean.
    pub fn mean(&self) -> &ArrayD<f64> {
        &self.mean
    }

    /// Current running variance.
    pub fn var(&self) -> &ArrayD<f64> {
        &self.var
    }
}

/// Normalizes `Box` observations to approximately zero mean and unit
/// variance using running statistics.
pub struct NormalizeObservation<E: Env> {
    env: E,
    observation_space: Space,
    rms: RunningMeanStd,
    epsilon: f64,

    /// Whether steps keep updating the running statistics. Disable for
    /// evaluation with frozen statistics.
    pub update_running_mean: bool,
}

impl<E: Env> NormalizeObservation<E> {
    /// Wraps an environment whose observation space is a `Box`.
    pub fn new(env: E) -> Result<Self> {
        let shape = match env.observation_space() {
            Space::Box(b) => b.shape().to_vec(),
            other => {
                return Err(GymError::SpaceMismatch(format!(
                    "NormalizeObservation needs a Box observation space, got {:?}",
                    other
                ))
                .into())
            }
        };
        // Normalized values can leave the declared bounds.
        let observation_space =
            Space::boxed_uniform(f64::NEG_INFINITY, f64::INFINITY, &shape)?;
        Ok(Self {
            env,
            observation_space,
            rms: RunningMeanStd::new(&shape),
            epsilon: 1e-8,
            update_running_mean: true,
        })
    }

    /// The running statistics.
    pub fn rms(&self) -> &RunningMeanStd {
        &self.rms
    }

    fn normalize(&mut self, obs: Value) -> Result<Value> {
        let a = obs
            .as_array()
            .ok_or_else(|| GymError::SpaceMismatch(format!("expected Array, got {}", obs.kind())))?;
        if self.update_running_mean {
            self.rms.update(a);
        }
        Ok(Value::Array(self.rms.normalize(a, self.epsilon)))
    }
}

impl<E: Env> Wrapper for NormalizeObservation<E> {
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
        Ok((self.normalize(obs)?, info))
    }

    fn step(&mut self, action: &Value) -> Result<Step> {
        let mut step = self.env.step(action)?;
        step.obs = self.normalize(step.obs)?;
        Ok(step)
    }
}

/// Scales rewards by the standard deviation of the exponentially discounted
/// running return.
pub struct NormalizeReward<E: Env> {
    env: E,
    gamma: f64,
    epsilon: f64,
    running_return: f64,
    rms: RunningMeanStd,

    /// Whether steps keep updating the running statistics.
    pub update_running_mean: bool,
}

impl<E: Env> NormalizeReward<E> {
    /// Wraps an environment with discount `gamma`.
    pub fn new(env: E, gamma: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&gamma) {
            return Err(GymError::InvalidConfig(format!(
                "NormalizeReward needs gamma in [0, 1], got {}",
                gamma
            ))
            .into());
        }
        Ok(Self {
            env,
            gamma,
            epsilon: 1e-8,
            running_return: 0.0,
            rms: RunningMeanStd::new(&[1]),
            update_running_mean: true,
        })
    }
}

impl<E: Env> Wrapper for NormalizeReward<E> {
    type Inner = E;

    fn inner(&self) -> &E {
        &self.env
    }

    fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }

    fn reset(&mut self, seed: Option<u64>, options: Option<&Info>) -> Result<(Value, Info)> {
        self.running_return = 0.0;
        self.env.reset(seed, options)
    }

    fn step(&mut self, action: &Value) -> Result<Step> {
        let mut step = self.env.step(action)?;
        self.running_return = self.running_return * self.gamma + step.reward;
        if self.update_running_mean {
            let x = ndarray::arr1(&[self.running_return]).into_dyn();
            self.rms.update(&x);
        }
        step.reward /= (self.rms.var()[[0]] + self.epsilon).sqrt();
        if step.is_done() {
            self.running_return = 0.0;
        }
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy::DummyEnv;

    #[test]
    fn welford_tracks_mean_and_variance() {
        let mut rms = RunningMeanStd::new(&[1]);
        for x in &[1.0, 2.0, 3.0, 4.0, 5.0] {
            rms.update(&ndarray::arr1(&[*x]).into_dyn());
        }
        assert!((rms.mean()[[0]] - 3.0).abs() < 1e-2);
        // Population variance of 1..5 is 2.
        assert!((rms.var()[[0]] - 2.0).abs() < 0.1);
    }

    #[test]
    fn observations_are_centered_over_time() {
        let mut env = NormalizeObservation::new(DummyEnv::new(1000)).unwrap();
        Wrapper::reset(&mut env, Some(0), None).unwrap();
        let mut last = 0.0;
        for _ in 0..200 {
            let step = Wrapper::step(&mut env, &Value::Int(0)).unwrap();
            last = step.obs.as_array().unwrap()[0];
        }
        // Raw observations grow linearly; normalized ones stay small.
        assert!(last.abs() < 5.0);
    }

    #[test]
    fn non_box_observation_space_is_rejected() {
        struct IntObsEnv {
            obs: Space,
            act: Space,
        }
        impl Env for IntObsEnv {
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
        let env = IntObsEnv {
            obs: Space::discrete(4).unwrap(),
            act: Space::discrete(2).unwrap(),
        };
        assert!(NormalizeObservation::new(env).is_err());
    }

    #[test]
    fn reward_scale_stabilizes() {
        let mut env = NormalizeReward::new(DummyEnv::new(1000), 0.99).unwrap();
        Wrapper::reset(&mut env, Some(0), None).unwrap();
        let mut rewards = Vec::new();
        for _ in 0..300 {
            rewards.push(Wrapper::step(&mut env, &Value::Int(0)).unwrap().reward);
        }
        // Constant raw reward 1.0; after warm-up the scaled reward settles
        // well below the raw discounted return.
        let tail = rewards[rewards.len() - 1];
        assert!(tail > 0.0 && tail < 1.0);
    }
}
