//! The cart-pole balancing task.
use anyhow::Result;
use gymkit_core::{Env, EnvRng, GymError, Info, RenderFrame, RenderMode, Space, Step, Value};
use ndarray::{ArrayD, IxDyn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Configuration of [`CartPole`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartPoleConfig {
    /// Gravitational acceleration.
    pub gravity: f64,

    /// Mass of the cart.
    pub masscart: f64,

    /// Mass of the pole.
    pub masspole: f64,

    /// Half-length of the pole.
    pub length: f64,

    /// Magnitude of the force applied by an action.
    pub force_mag: f64,

    /// Integration timestep in seconds.
    pub tau: f64,
}

impl Default for CartPoleConfig {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            masscart: 1.0,
            masspole: 0.1,
            length: 0.5,
            force_mag: 10.0,
            tau: 0.02,
        }
    }
}

/// Balance a pole hinged to a cart by pushing the cart left or right.
///
/// Observations are `[x, x_dot, theta, theta_dot]`, actions `Discrete(2)`
/// (push left, push right). Every live step yields reward 1.0; the episode
/// terminates when the cart leaves `±2.4` or the pole tilts past 12 degrees.
/// Dynamics use Euler integration with timestep `tau`.
pub struct CartPole {
    config: CartPoleConfig,
    observation_space: Space,
    action_space: Space,
    state: [f64; 4],
    theta_threshold: f64,
    x_threshold: f64,
    rng: Option<EnvRng>,
    live: bool,
    render_mode: Option<RenderMode>,
}

impl CartPole {
    /// Creates an environment with the given physical parameters.
    pub fn new(config: CartPoleConfig) -> Result<Self> {
        if config.tau <= 0.0 {
            return Err(GymError::InvalidConfig("CartPole tau must be positive".into()).into());
        }
        let theta_threshold = 12.0 * 2.0 * PI / 360.0;
        let x_threshold = 2.4;
        // Bounds are twice the failure thresholds so observations just past
        // the limit on the terminal step are still members of the space.
        let high = vec![
            x_threshold * 2.0,
            f64::INFINITY,
            theta_threshold * 2.0,
            f64::INFINITY,
        ];
        let low: Vec<f64> = high.iter().map(|v| -v).collect();
        Ok(Self {
            observation_space: Space::boxed(
                ArrayD::from_shape_vec(IxDyn(&[4]), low)?,
                ArrayD::from_shape_vec(IxDyn(&[4]), high)?,
            )?,
            action_space: Space::discrete(2)?,
            state: [0.0; 4],
            theta_threshold,
            x_threshold,
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
        Value::vec(self.state.to_vec())
    }
}

impl Env for CartPole {
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
        for v in self.state.iter_mut() {
            *v = draw.gen_range(-0.05..0.05);
        }
        self.live = true;
        Ok((self.obs(), Info::empty()))
    }

    fn step(&mut self, action: &Value) -> Result<Step> {
        if !self.live {
            return Err(GymError::ResetNeeded("CartPole".into()).into());
        }
        if !self.action_space.contains(action) {
            return Err(GymError::OutOfSpace(format!(
                "CartPole action {:?} is not in Discrete(2)",
                action
            ))
            .into());
        }
        let force = if action.as_int() == Some(1) {
            self.config.force_mag
        } else {
            -self.config.force_mag
        };

        let [x, x_dot, theta, theta_dot] = self.state;
        let c = &self.config;
        let total_mass = c.masscart + c.masspole;
        let polemass_length = c.masspole * c.length;

        let costheta = theta.cos();
        let sintheta = theta.sin();
        let temp = (force + polemass_length * theta_dot * theta_dot * sintheta) / total_mass;
        let thetaacc = (c.gravity * sintheta - costheta * temp)
            / (c.length * (4.0 / 3.0 - c.masspole * costheta * costheta / total_mass));
        let xacc = temp - polemass_length * thetaacc * costheta / total_mass;

        self.state = [
            x + c.tau * x_dot,
            x_dot + c.tau * xacc,
            theta + c.tau * theta_dot,
            theta_dot + c.tau * thetaacc,
        ];

        let terminated = self.state[0].abs() > self.x_threshold
            || self.state[2].abs() > self.theta_threshold;
        if terminated {
            self.live = false;
        }
        Ok(Step::new(self.obs(), 1.0, terminated, false))
    }

    fn render(&mut self) -> Option<RenderFrame> {
        self.render_mode?;
        Some(RenderFrame::Text(format!(
            "x: {:+.3}  x_dot: {:+.3}  theta: {:+.3}  theta_dot: {:+.3}",
            self.state[0], self.state[1], self.state[2], self.state[3]
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_draws_near_zero_state() {
        let mut env = CartPole::new(CartPoleConfig::default()).unwrap();
        let (obs, _) = env.reset(Some(0), None).unwrap();
        let a = obs.as_array().unwrap();
        for v in a.iter() {
            assert!(v.abs() < 0.05);
        }
    }

    #[test]
    fn constant_push_eventually_tips_the_pole() {
        let mut env = CartPole::new(CartPoleConfig::default()).unwrap();
        env.reset(Some(1), None).unwrap();
        let mut total = 0.0;
        for i in 0..500 {
            let step = env.step(&Value::Int(1)).unwrap();
            total += step.reward;
            if step.terminated {
                assert!(i < 200, "pushing one way must fail quickly");
                assert_eq!(total, (i + 1) as f64);
                return;
            }
        }
        panic!("episode never terminated under a constant push");
    }

    #[test]
    fn step_before_reset_is_rejected() {
        let mut env = CartPole::new(CartPoleConfig::default()).unwrap();
        let err = env.step(&Value::Int(0)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GymError>(),
            Some(GymError::ResetNeeded(_))
        ));
    }

    #[test]
    fn seeded_trajectories_match() {
        let run = |seed| {
            let mut env = CartPole::new(CartPoleConfig::default()).unwrap();
            env.reset(Some(seed), None).unwrap();
            let mut obs = Vec::new();
            for _ in 0..10 {
                obs.push(env.step(&Value::Int(0)).unwrap().obs);
            }
            obs
        };
        assert_eq!(run(3), run(3));
    }

    #[test]
    fn out_of_space_action_is_rejected() {
        let mut env = CartPole::new(CartPoleConfig::default()).unwrap();
        env.reset(Some(0), None).unwrap();
        let err = env.step(&Value::Int(2)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GymError>(),
            Some(GymError::OutOfSpace(_))
        ));
    }
}
