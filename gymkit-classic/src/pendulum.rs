//! The torque-controlled pendulum swing-up task.
use anyhow::Result;
use gymkit_core::{Env, EnvRng, GymError, Info, RenderFrame, RenderMode, Space, Step, Value};
use ndarray::{ArrayD, IxDyn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const MAX_SPEED: f64 = 8.0;
const MAX_TORQUE: f64 = 2.0;

/// Configuration of [`Pendulum`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendulumConfig {
    /// Gravitational acceleration.
    pub gravity: f64,

    /// Mass of the pendulum.
    pub mass: f64,

    /// Length of the pendulum.
    pub length: f64,

    /// Integration timestep in seconds.
    pub dt: f64,
}

impl Default for PendulumConfig {
    fn default() -> Self {
        Self {
            gravity: 10.0,
            mass: 1.0,
            length: 1.0,
            dt: 0.05,
        }
    }
}

/// Swing a pendulum upright and hold it there with a bounded torque.
///
/// Observations are `[cos(theta), sin(theta), theta_dot]`, actions a
/// 1-dimensional `Box` torque in `[-2, 2]`. The reward is the negated cost
/// `theta^2 + 0.1 * theta_dot^2 + 0.001 * torque^2` with the angle
/// normalized to `[-pi, pi]`; the episode never terminates on its own, so a
/// time limit is the only way it ends.
pub struct Pendulum {
    config: PendulumConfig,
    observation_space: Space,
    action_space: Space,
    theta: f64,
    theta_dot: f64,
    rng: Option<EnvRng>,
    live: bool,
    render_mode: Option<RenderMode>,
}

fn angle_normalize(theta: f64) -> f64 {
    (theta + PI).rem_euclid(2.0 * PI) - PI
}

impl Pendulum {
    /// Creates an environment with the given physical parameters.
    pub fn new(config: PendulumConfig) -> Result<Self> {
        if config.dt <= 0.0 {
            return Err(GymError::InvalidConfig("Pendulum dt must be positive".into()).into());
        }
        Ok(Self {
            observation_space: Space::boxed(
                ArrayD::from_shape_vec(IxDyn(&[3]), vec![-1.0, -1.0, -MAX_SPEED])?,
                ArrayD::from_shape_vec(IxDyn(&[3]), vec![1.0, 1.0, MAX_SPEED])?,
            )?,
            action_space: Space::boxed_uniform(-MAX_TORQUE, MAX_TORQUE, &[1])?,
            theta: 0.0,
            theta_dot: 0.0,
            rng: None,
            live: false,
            render_mode: None,
            config,
        })
    }

    /// Sets the render mode.
    pub fn render_mode(mut self, mode: Option<RenderMode>) -> Self {
        self.render_mode = mode;
        self
    }

    fn obs(&self) -> Value {
        Value::vec(vec![self.theta.cos(), self.theta.sin(), self.theta_dot])
    }
}

impl Env for Pendulum {
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
        let mut draw = rng.fork();
        self.theta = draw.gen_range(-PI..PI);
        self.theta_dot = draw.gen_range(-1.0..1.0);
        self.live = true;
        Ok((self.obs(), Info::empty()))
    }

    fn step(&mut self, action: &Value) -> Result<Step> {
        if !self.live {
            return Err(GymError::ResetNeeded("Pendulum".into()).into());
        }
        let torque = action
            .as_array()
            .and_then(|a| a.iter().next().copied())
            .ok_or_else(|| {
                GymError::OutOfSpace(format!(
                    "Pendulum action {:?} is not a 1-dimensional torque",
                    action
                ))
            })?
            .clamp(-MAX_TORQUE, MAX_TORQUE);

        let c = &self.config;
        let theta = angle_normalize(self.theta);
        let cost =
            theta * theta + 0.1 * self.theta_dot * self.theta_dot + 0.001 * torque * torque;

        let accel = 3.0 * c.gravity / (2.0 * c.length) * self.theta.sin()
            + 3.0 / (c.mass * c.length * c.length) * torque;
        self.theta_dot = (self.theta_dot + accel * c.dt).clamp(-MAX_SPEED, MAX_SPEED);
        self.theta += self.theta_dot * c.dt;

        Ok(Step::new(self.obs(), -cost, false, false))
    }

    fn render(&mut self) -> Option<RenderFrame> {
        self.render_mode?;
        Some(RenderFrame::Text(format!(
            "theta: {:+.4}  theta_dot: {:+.4}",
            angle_normalize(self.theta),
            self.theta_dot
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observation_stays_in_space() {
        let mut env = Pendulum::new(PendulumConfig::default()).unwrap();
        let space = env.observation_space().clone();
        let (obs, _) = env.reset(Some(0), None).unwrap();
        assert!(space.contains(&obs));
        for _ in 0..100 {
            let step = env.step(&Value::vec(vec![2.0])).unwrap();
            assert!(space.contains(&step.obs));
        }
    }

    #[test]
    fn never_terminates() {
        let mut env = Pendulum::new(PendulumConfig::default()).unwrap();
        env.reset(Some(0), None).unwrap();
        for _ in 0..300 {
            let step = env.step(&Value::vec(vec![0.0])).unwrap();
            assert!(!step.is_done());
        }
    }

    #[test]
    fn reward_is_negated_cost() {
        let mut env = Pendulum::new(PendulumConfig::default()).unwrap();
        env.reset(Some(0), None).unwrap();
        let step = env.step(&Value::vec(vec![0.5])).unwrap();
        assert!(step.reward <= 0.0);
        // The cost is bounded by pi^2 + 0.1 * 8^2 + 0.001 * 2^2.
        assert!(step.reward >= -(PI * PI + 6.4 + 0.004));
    }

    #[test]
    fn torque_beyond_bounds_is_clipped() {
        let run = |torque: f64| {
            let mut env = Pendulum::new(PendulumConfig::default()).unwrap();
            env.reset(Some(2), None).unwrap();
            env.step(&Value::vec(vec![torque])).unwrap().obs
        };
        assert_eq!(run(2.0), run(100.0));
    }

    #[test]
    fn angle_normalization_wraps_to_pi() {
        assert!((angle_normalize(3.0 * PI) - PI).abs() < 1e-12 || angle_normalize(3.0 * PI) == -PI);
        assert!((angle_normalize(0.5) - 0.5).abs() < 1e-12);
        assert!((angle_normalize(-0.5) + 0.5).abs() < 1e-12);
    }
}
