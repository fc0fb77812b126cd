//! The acrobot swing-up task.
use anyhow::Result;
use gymkit_core::{Env, EnvRng, GymError, Info, RenderFrame, RenderMode, Space, Step, Value};
use ndarray::{ArrayD, IxDyn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const LINK_LENGTH_1: f64 = 1.0;
const LINK_MASS_1: f64 = 1.0;
const LINK_MASS_2: f64 = 1.0;
const LINK_COM_POS_1: f64 = 0.5;
const LINK_COM_POS_2: f64 = 0.5;
const LINK_MOI: f64 = 1.0;
const MAX_VEL_1: f64 = 4.0 * PI;
const MAX_VEL_2: f64 = 9.0 * PI;
const GRAVITY: f64 = 9.8;

/// Configuration of [`Acrobot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcrobotConfig {
    /// Integration timestep in seconds.
    pub dt: f64,

    /// Magnitude of the torque applied at the middle joint.
    pub torque_mag: f64,
}

impl Default for AcrobotConfig {
    fn default() -> Self {
        Self {
            dt: 0.2,
            torque_mag: 1.0,
        }
    }
}

/// Swing the tip of a two-link underactuated arm above a target height.
///
/// The state is `[theta1, theta2, dtheta1, dtheta2]`; observations expose it
/// as `[cos(t1), sin(t1), cos(t2), sin(t2), dt1, dt2]`. Actions are
/// `Discrete(3)` torques `{-1, 0, +1}` at the joint between the links. Each
/// step costs reward -1 until the tip height `-cos(t1) - cos(t1 + t2)`
/// exceeds 1, which terminates with reward 0. Dynamics follow the book
/// formulation integrated with a fourth-order Runge-Kutta step.
pub struct Acrobot {
    config: AcrobotConfig,
    observation_space: Space,
    action_space: Space,
    state: [f64; 4],
    rng: Option<EnvRng>,
    live: bool,
    render_mode: Option<RenderMode>,
}

fn wrap_angle(theta: f64) -> f64 {
    (theta + PI).rem_euclid(2.0 * PI) - PI
}

/// Time derivative of the augmented state `[t1, t2, dt1, dt2]` under a
/// constant joint torque.
fn dynamics(s: &[f64; 4], torque: f64) -> [f64; 4] {
    let (m1, m2) = (LINK_MASS_1, LINK_MASS_2);
    let l1 = LINK_LENGTH_1;
    let (lc1, lc2) = (LINK_COM_POS_1, LINK_COM_POS_2);
    let (i1, i2) = (LINK_MOI, LINK_MOI);
    let [theta1, theta2, dtheta1, dtheta2] = *s;

    let d1 = m1 * lc1 * lc1
        + m2 * (l1 * l1 + lc2 * lc2 + 2.0 * l1 * lc2 * theta2.cos())
        + i1
        + i2;
    let d2 = m2 * (lc2 * lc2 + l1 * lc2 * theta2.cos()) + i2;
    let phi2 = m2 * lc2 * GRAVITY * (theta1 + theta2 - PI / 2.0).cos();
    let phi1 = -m2 * l1 * lc2 * dtheta2 * dtheta2 * theta2.sin()
        - 2.0 * m2 * l1 * lc2 * dtheta2 * dtheta1 * theta2.sin()
        + (m1 * lc1 + m2 * l1) * GRAVITY * (theta1 - PI / 2.0).cos()
        + phi2;
    let ddtheta2 = (torque + d2 / d1 * phi1
        - m2 * l1 * lc2 * dtheta1 * dtheta1 * theta2.sin()
        - phi2)
        / (m2 * lc2 * lc2 + i2 - d2 * d2 / d1);
    let ddtheta1 = -(d2 * ddtheta2 + phi1) / d1;

    [dtheta1, dtheta2, ddtheta1, ddtheta2]
}

/// One fourth-order Runge-Kutta step of size `dt`.
fn rk4(s: &[f64; 4], torque: f64, dt: f64) -> [f64; 4] {
    let add = |a: &[f64; 4], b: &[f64; 4], scale: f64| {
        let mut out = [0.0; 4];
        for i in 0..4 {
            out[i] = a[i] + b[i] * scale;
        }
        out
    };
    let k1 = dynamics(s, torque);
    let k2 = dynamics(&add(s, &k1, dt / 2.0), torque);
    let k3 = dynamics(&add(s, &k2, dt / 2.0), torque);
    let k4 = dynamics(&add(s, &k3, dt), torque);
    let mut out = [0.0; 4];
    for i in 0..4 {
        out[i] = s[i] + dt / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
    }
    out
}

impl Acrobot {
    /// Creates an environment with the given parameters.
    pub fn new(config: AcrobotConfig) -> Result<Self> {
        if config.dt <= 0.0 {
            return Err(GymError::InvalidConfig("Acrobot dt must be positive".into()).into());
        }
        let high = vec![1.0, 1.0, 1.0, 1.0, MAX_VEL_1, MAX_VEL_2];
        let low: Vec<f64> = high.iter().map(|v| -v).collect();
        Ok(Self {
            observation_space: Space::boxed(
                ArrayD::from_shape_vec(IxDyn(&[6]), low)?,
                ArrayD::from_shape_vec(IxDyn(&[6]), high)?,
            )?,
            action_space: Space::discrete(3)?,
            state: [0.0; 4],
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
        let [t1, t2, dt1, dt2] = self.state;
        Value::vec(vec![t1.cos(), t1.sin(), t2.cos(), t2.sin(), dt1, dt2])
    }

    fn tip_height(&self) -> f64 {
        -self.state[0].cos() - (self.state[0] + self.state[1]).cos()
    }
}

impl Env for Acrobot {
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
            *v = draw.gen_range(-0.1..0.1);
        }
        self.live = true;
        Ok((self.obs(), Info::empty()))
    }

    fn step(&mut self, action: &Value) -> Result<Step> {
        if !self.live {
            return Err(GymError::ResetNeeded("Acrobot".into()).into());
        }
        if !self.action_space.contains(action) {
            return Err(GymError::OutOfSpace(format!(
                "Acrobot action {:?} is not in Discrete(3)",
                action
            ))
            .into());
        }
        let torque = (action.as_int().unwrap_or(1) - 1) as f64 * self.config.torque_mag;

        let mut s = rk4(&self.state, torque, self.config.dt);
        s[0] = wrap_angle(s[0]);
        s[1] = wrap_angle(s[1]);
        s[2] = s[2].clamp(-MAX_VEL_1, MAX_VEL_1);
        s[3] = s[3].clamp(-MAX_VEL_2, MAX_VEL_2);
        self.state = s;

        let terminated = self.tip_height() > 1.0;
        if terminated {
            self.live = false;
        }
        let reward = if terminated { 0.0 } else { -1.0 };
        Ok(Step::new(self.obs(), reward, terminated, false))
    }

    fn render(&mut self) -> Option<RenderFrame> {
        self.render_mode?;
        Some(RenderFrame::Text(format!(
            "theta1: {:+.4}  theta2: {:+.4}  tip height: {:+.4}",
            self.state[0],
            self.state[1],
            self.tip_height()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hanging_start_is_far_from_the_target() {
        let mut env = Acrobot::new(AcrobotConfig::default()).unwrap();
        env.reset(Some(0), None).unwrap();
        assert!(env.tip_height() < 0.0);
    }

    #[test]
    fn coasting_does_not_terminate_quickly() {
        let mut env = Acrobot::new(AcrobotConfig::default()).unwrap();
        env.reset(Some(0), None).unwrap();
        for _ in 0..100 {
            let step = env.step(&Value::Int(1)).unwrap();
            assert!(!step.terminated);
            assert_eq!(step.reward, -1.0);
        }
    }

    #[test]
    fn observation_stays_in_space() {
        let mut env = Acrobot::new(AcrobotConfig::default()).unwrap();
        let space = env.observation_space().clone();
        env.reset(Some(3), None).unwrap();
        for i in 0..200 {
            let step = env.step(&Value::Int((i % 3) as i64)).unwrap();
            assert!(space.contains(&step.obs));
            if step.is_done() {
                break;
            }
        }
    }

    #[test]
    fn seeded_trajectories_match() {
        let run = |seed| {
            let mut env = Acrobot::new(AcrobotConfig::default()).unwrap();
            env.reset(Some(seed), None).unwrap();
            (0..20)
                .map(|_| env.step(&Value::Int(2)).unwrap().obs)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(11), run(11));
    }
}
