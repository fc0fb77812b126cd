//! The mountain-car task.
use anyhow::Result;
use gymkit_core::{Env, EnvRng, GymError, Info, RenderFrame, RenderMode, Space, Step, Value};
use ndarray::{ArrayD, IxDyn};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration of [`MountainCar`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MountainCarConfig {
    /// Acceleration per engine action.
    pub force: f64,

    /// Gravity scale of the valley.
    pub gravity: f64,

    /// Position at which the goal flag stands.
    pub goal_position: f64,
}

impl Default for MountainCarConfig {
    fn default() -> Self {
        Self {
            force: 0.001,
            gravity: 0.0025,
            goal_position: 0.5,
        }
    }
}

/// Drive an underpowered car out of a valley by building momentum.
///
/// Observations are `[position, velocity]` with position in `[-1.2, 0.6]`
/// and velocity in `[-0.07, 0.07]`; actions are `Discrete(3)` (push left,
/// coast, push right). Every step costs reward -1; the episode terminates
/// when the car reaches the goal position moving forward.
pub struct MountainCar {
    config: MountainCarConfig,
    observation_space: Space,
    action_space: Space,
    position: f64,
    velocity: f64,
    rng: Option<EnvRng>,
    live: bool,
    render_mode: Option<RenderMode>,
}

const MIN_POSITION: f64 = -1.2;
const MAX_POSITION: f64 = 0.6;
const MAX_SPEED: f64 = 0.07;

impl MountainCar {
    /// Creates an environment with the given physical parameters.
    pub fn new(config: MountainCarConfig) -> Result<Self> {
        if config.goal_position <= MIN_POSITION || config.goal_position > MAX_POSITION {
            return Err(GymError::InvalidConfig(format!(
                "MountainCar goal position {} is outside ({}, {}]",
                config.goal_position, MIN_POSITION, MAX_POSITION
            ))
            .into());
        }
        Ok(Self {
            observation_space: Space::boxed(
                ArrayD::from_shape_vec(IxDyn(&[2]), vec![MIN_POSITION, -MAX_SPEED])?,
                ArrayD::from_shape_vec(IxDyn(&[2]), vec![MAX_POSITION, MAX_SPEED])?,
            )?,
            action_space: Space::discrete(3)?,
            position: 0.0,
            velocity: 0.0,
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
        Value::vec(vec![self.position, self.velocity])
    }
}

impl Env for MountainCar {
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
        self.position = rng.fork().gen_range(-0.6..-0.4);
        self.velocity = 0.0;
        self.live = true;
        Ok((self.obs(), Info::empty()))
    }

    fn step(&mut self, action: &Value) -> Result<Step> {
        if !self.live {
            return Err(GymError::ResetNeeded("MountainCar".into()).into());
        }
        if !self.action_space.contains(action) {
            return Err(GymError::OutOfSpace(format!(
                "MountainCar action {:?} is not in Discrete(3)",
                action
            ))
            .into());
        }
        let direction = (action.as_int().unwrap_or(1) - 1) as f64;

        self.velocity += direction * self.config.force
            + (3.0 * self.position).cos() * (-self.config.gravity);
        self.velocity = self.velocity.clamp(-MAX_SPEED, MAX_SPEED);
        self.position = (self.position + self.velocity).clamp(MIN_POSITION, MAX_POSITION);
        // The left wall is inelastic.
        if self.position <= MIN_POSITION && self.velocity < 0.0 {
            self.velocity = 0.0;
        }

        let terminated = self.position >= self.config.goal_position && self.velocity >= 0.0;
        if terminated {
            self.live = false;
        }
        Ok(Step::new(self.obs(), -1.0, terminated, false))
    }

    fn render(&mut self) -> Option<RenderFrame> {
        self.render_mode?;
        Some(RenderFrame::Text(format!(
            "position: {:+.4}  velocity: {:+.4}",
            self.position, self.velocity
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_places_the_car_in_the_valley() {
        let mut env = MountainCar::new(MountainCarConfig::default()).unwrap();
        let (obs, _) = env.reset(Some(0), None).unwrap();
        let a = obs.as_array().unwrap();
        assert!(a[[0]] >= -0.6 && a[[0]] < -0.4);
        assert_eq!(a[[1]], 0.0);
    }

    #[test]
    fn oscillation_policy_reaches_the_goal() {
        let mut env = MountainCar::new(MountainCarConfig::default()).unwrap();
        env.reset(Some(0), None).unwrap();
        // Always push in the direction of the current velocity.
        let mut velocity = 0.0_f64;
        for _ in 0..2000 {
            let action = if velocity >= 0.0 { 2 } else { 0 };
            let step = env.step(&Value::Int(action)).unwrap();
            assert_eq!(step.reward, -1.0);
            let a = step.obs.as_array().unwrap();
            velocity = a[[1]];
            if step.terminated {
                assert!(a[[0]] >= 0.5);
                return;
            }
        }
        panic!("momentum policy should reach the goal");
    }

    #[test]
    fn coasting_never_escapes_the_valley() {
        let mut env = MountainCar::new(MountainCarConfig::default()).unwrap();
        env.reset(Some(0), None).unwrap();
        for _ in 0..500 {
            let step = env.step(&Value::Int(1)).unwrap();
            assert!(!step.terminated);
        }
    }

    #[test]
    fn bad_goal_position_is_rejected() {
        let config = MountainCarConfig {
            goal_position: 1.0,
            ..Default::default()
        };
        assert!(MountainCar::new(config).is_err());
    }
}
