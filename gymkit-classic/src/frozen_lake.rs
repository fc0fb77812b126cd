//! The FrozenLake grid world.
use anyhow::Result;
use gymkit_core::{
    Env, EnvRng, GymError, Info, InfoValue, RenderFrame, RenderMode, Space, Step, Value,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

const LEFT: i64 = 0;
const DOWN: i64 = 1;
const RIGHT: i64 = 2;
const UP: i64 = 3;

/// Configuration of [`FrozenLake`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenLakeConfig {
    /// Grid rows. `S` start, `F` frozen, `H` hole, `G` goal.
    pub map: Vec<String>,

    /// When set, a move slips to one of the two perpendicular directions
    /// with probability 1/3 each.
    pub is_slippery: bool,
}

impl Default for FrozenLakeConfig {
    fn default() -> Self {
        Self {
            map: Self::map_4x4(),
            is_slippery: true,
        }
    }
}

impl FrozenLakeConfig {
    /// The standard 4x4 map.
    pub fn map_4x4() -> Vec<String> {
        ["SFFF", "FHFH", "FFFH", "HFFG"]
            .iter()
            .map(|row| row.to_string())
            .collect()
    }

    /// The standard 8x8 map.
    pub fn map_8x8() -> Vec<String> {
        [
            "SFFFFFFF", "FFFFFFFF", "FFFHFFFF", "FFFFFHFF", "FFFHFFFF", "FHHFFFHF", "FHFFHFHF",
            "FFFHFFFG",
        ]
        .iter()
        .map(|row| row.to_string())
        .collect()
    }

    /// Replaces the map.
    pub fn map(mut self, map: Vec<String>) -> Self {
        self.map = map;
        self
    }

    /// Sets slippery transitions.
    pub fn is_slippery(mut self, v: bool) -> Self {
        self.is_slippery = v;
        self
    }
}

/// A grid world over a frozen lake: walk from `S` to `G` without falling
/// into a hole.
///
/// Observations are `Discrete(rows * cols)` cell indices in row-major order,
/// actions are `Discrete(4)` (left, down, right, up). Reaching `G` yields
/// reward 1.0 and terminates; falling into `H` terminates with reward 0.0.
/// With slippery transitions, the executed move is the intended one or one of
/// its two perpendicular neighbors, each with probability 1/3; the realized
/// transition probability is reported under the `"prob"` info key.
pub struct FrozenLake {
    config: FrozenLakeConfig,
    observation_space: Space,
    action_space: Space,
    rows: usize,
    cols: usize,
    state: usize,
    last_action: Option<i64>,
    rng: Option<EnvRng>,
    live: bool,
    render_mode: Option<RenderMode>,
}

impl FrozenLake {
    /// Creates an environment over the configured map.
    pub fn new(config: FrozenLakeConfig) -> Result<Self> {
        let rows = config.map.len();
        if rows == 0 {
            return Err(GymError::InvalidConfig("FrozenLake map is empty".into()).into());
        }
        let cols = config.map[0].len();
        if cols == 0 || config.map.iter().any(|row| row.len() != cols) {
            return Err(
                GymError::InvalidConfig("FrozenLake map must be rectangular".into()).into(),
            );
        }
        let cells: Vec<char> = config.map.iter().flat_map(|row| row.chars()).collect();
        if cells.iter().any(|c| !matches!(c, 'S' | 'F' | 'H' | 'G')) {
            return Err(GymError::InvalidConfig(
                "FrozenLake map cells must be one of S, F, H, G".into(),
            )
            .into());
        }
        if cells.iter().filter(|c| **c == 'S').count() != 1 {
            return Err(GymError::InvalidConfig(
                "FrozenLake map needs exactly one start cell".into(),
            )
            .into());
        }

        Ok(Self {
            observation_space: Space::discrete((rows * cols) as i64)?,
            action_space: Space::discrete(4)?,
            rows,
            cols,
            state: 0,
            last_action: None,
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

    fn cell(&self, state: usize) -> char {
        let row = state / self.cols;
        let col = state % self.cols;
        self.config.map[row].as_bytes()[col] as char
    }

    fn start_state(&self) -> usize {
        self.config
            .map
            .iter()
            .flat_map(|row| row.chars())
            .position(|c| c == 'S')
            .unwrap_or(0)
    }

    fn next_state(&self, state: usize, action: i64) -> usize {
        let row = state / self.cols;
        let col = state % self.cols;
        let (row, col) = match action {
            LEFT => (row, col.saturating_sub(1)),
            DOWN => ((row + 1).min(self.rows - 1), col),
            RIGHT => (row, (col + 1).min(self.cols - 1)),
            UP => (row.saturating_sub(1), col),
            _ => (row, col),
        };
        row * self.cols + col
    }
}

impl Env for FrozenLake {
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
        self.rng.get_or_insert_with(EnvRng::from_entropy);
        self.state = self.start_state();
        self.last_action = None;
        self.live = true;
        let mut info = Info::empty();
        info.insert("prob", InfoValue::Float(1.0));
        Ok((Value::Int(self.state as i64), info))
    }

    fn step(&mut self, action: &Value) -> Result<Step> {
        if !self.live {
            return Err(GymError::ResetNeeded("FrozenLake".into()).into());
        }
        if !self.action_space.contains(action) {
            return Err(GymError::OutOfSpace(format!(
                "FrozenLake action {:?} is not in Discrete(4)",
                action
            ))
            .into());
        }
        let intended = action.as_int().unwrap_or(0);

        let (executed, prob) = if self.config.is_slippery {
            // Intended direction or one of its two perpendicular neighbors.
            let rng = self.rng.get_or_insert_with(EnvRng::from_entropy);
            let offset = rng.fork().gen_range(0..3) as i64;
            ((intended + offset + 3) % 4, 1.0 / 3.0)
        } else {
            (intended, 1.0)
        };

        self.state = self.next_state(self.state, executed);
        self.last_action = Some(executed);
        let cell = self.cell(self.state);
        let terminated = matches!(cell, 'H' | 'G');
        let reward = if cell == 'G' { 1.0 } else { 0.0 };
        if terminated {
            self.live = false;
        }

        let mut step = Step::new(Value::Int(self.state as i64), reward, terminated, false);
        step.info.insert("prob", InfoValue::Float(prob));
        Ok(step)
    }

    fn render(&mut self) -> Option<RenderFrame> {
        self.render_mode?;
        let mut out = String::new();
        match self.last_action {
            Some(LEFT) => out.push_str("  (Left)\n"),
            Some(DOWN) => out.push_str("  (Down)\n"),
            Some(RIGHT) => out.push_str("  (Right)\n"),
            Some(UP) => out.push_str("  (Up)\n"),
            _ => out.push('\n'),
        }
        for (i, row) in self.config.map.iter().enumerate() {
            for (j, c) in row.chars().enumerate() {
                if i * self.cols + j == self.state {
                    out.push('[');
                    out.push(c);
                    out.push(']');
                } else {
                    out.push(c);
                }
            }
            out.push('\n');
        }
        Some(RenderFrame::Text(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn non_slippery() -> FrozenLake {
        FrozenLake::new(FrozenLakeConfig::default().is_slippery(false)).unwrap()
    }

    #[test]
    fn walks_deterministically_to_the_goal() {
        let mut env = non_slippery();
        env.reset(Some(0), None).unwrap();
        // Down, down, right, right, down, right on the 4x4 map.
        let plan = [DOWN, DOWN, RIGHT, RIGHT, DOWN, RIGHT];
        let mut last = None;
        for a in plan.iter() {
            last = Some(env.step(&Value::Int(*a)).unwrap());
        }
        let last = last.unwrap();
        assert!(last.terminated);
        assert_eq!(last.reward, 1.0);
        assert_eq!(last.obs, Value::Int(15));
    }

    #[test]
    fn hole_terminates_without_reward() {
        let mut env = non_slippery();
        env.reset(Some(0), None).unwrap();
        env.step(&Value::Int(DOWN)).unwrap();
        let step = env.step(&Value::Int(RIGHT)).unwrap();
        assert!(step.terminated);
        assert_eq!(step.reward, 0.0);
        assert!(env.step(&Value::Int(LEFT)).is_err());
    }

    #[test]
    fn edges_clamp_instead_of_wrapping() {
        let mut env = non_slippery();
        let (obs, _) = env.reset(Some(0), None).unwrap();
        assert_eq!(obs, Value::Int(0));
        let step = env.step(&Value::Int(UP)).unwrap();
        assert_eq!(step.obs, Value::Int(0));
        let step = env.step(&Value::Int(LEFT)).unwrap();
        assert_eq!(step.obs, Value::Int(0));
    }

    #[test]
    fn slippery_reports_transition_probability() {
        let mut env = FrozenLake::new(FrozenLakeConfig::default()).unwrap();
        env.reset(Some(0), None).unwrap();
        let step = env.step(&Value::Int(RIGHT)).unwrap();
        assert_eq!(step.info.get_float("prob"), Some(1.0 / 3.0));
    }

    #[test]
    fn slippery_episodes_are_reproducible() {
        let run = |seed| {
            let mut env = FrozenLake::new(FrozenLakeConfig::default()).unwrap();
            env.reset(Some(seed), None).unwrap();
            let mut states = Vec::new();
            for _ in 0..6 {
                let step = env.step(&Value::Int(RIGHT)).unwrap();
                states.push(step.obs.clone());
                if step.is_done() {
                    break;
                }
            }
            states
        };
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn invalid_maps_are_rejected() {
        assert!(FrozenLake::new(FrozenLakeConfig::default().map(vec![])).is_err());
        assert!(FrozenLake::new(
            FrozenLakeConfig::default().map(vec!["SF".into(), "FGH".into()])
        )
        .is_err());
        assert!(
            FrozenLake::new(FrozenLakeConfig::default().map(vec!["SX".into(), "FG".into()]))
                .is_err()
        );
        assert!(
            FrozenLake::new(FrozenLakeConfig::default().map(vec!["FF".into(), "FG".into()]))
                .is_err()
        );
    }

    #[test]
    fn render_marks_the_current_cell() {
        let mut env = non_slippery().render_mode(Some(RenderMode::Ansi));
        env.reset(Some(0), None).unwrap();
        env.step(&Value::Int(DOWN)).unwrap();
        let frame = env.render().unwrap();
        let RenderFrame::Text(text) = frame;
        assert!(text.contains("(Down)"));
        assert!(text.contains("[F]"));
    }
}
