//! Per-episode return and length accounting.
use super::Wrapper;
use crate::env::{Env, Step};
use crate::error::GymError;
use crate::info::{Info, InfoValue, KEY_EPISODE};
use crate::value::Value;
use anyhow::Result;
use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;

/// Accumulates episode return and length, and attaches them to the terminal
/// step's info under the stats key.
///
/// Finished episodes are also appended to three fixed-capacity sliding
/// windows (returns, lengths, elapsed seconds), evicting the oldest entry
/// beyond the window capacity. Writing the stats key into an info map that
/// already carries it is an error.
pub struct RecordEpisodeStatistics<E: Env> {
    env: E,
    stats_key: String,

    episode_return: f64,
    episode_length: usize,
    episode_start: Option<Instant>,

    /// Returns of recently finished episodes, newest last.
    pub return_queue: VecDeque<f64>,

    /// Lengths of recently finished episodes, newest last.
    pub length_queue: VecDeque<usize>,

    /// Wall-clock durations (seconds) of recently finished episodes.
    pub time_queue: VecDeque<f64>,

    buffer_length: usize,
}

impl<E: Env> RecordEpisodeStatistics<E> {
    /// Wraps an environment with the default stats key `"episode"`.
    pub fn new(env: E, buffer_length: usize) -> Result<Self> {
        Self::with_key(env, buffer_length, KEY_EPISODE)
    }

    /// Wraps an environment with a custom stats key.
    pub fn with_key(env: E, buffer_length: usize, stats_key: impl Into<String>) -> Result<Self> {
        if buffer_length == 0 {
            return Err(GymError::InvalidConfig(
                "RecordEpisodeStatistics needs buffer_length > 0".into(),
            )
            .into());
        }
        Ok(Self {
            env,
            stats_key: stats_key.into(),
            episode_return: 0.0,
            episode_length: 0,
            episode_start: None,
            return_queue: VecDeque::with_capacity(buffer_length),
            length_queue: VecDeque::with_capacity(buffer_length),
            time_queue: VecDeque::with_capacity(buffer_length),
            buffer_length,
        })
    }

    fn push<T>(queue: &mut VecDeque<T>, capacity: usize, value: T) {
        if queue.len() == capacity {
            queue.pop_front();
        }
        queue.push_back(value);
    }
}

impl<E: Env> Wrapper for RecordEpisodeStatistics<E> {
    type Inner = E;

    fn inner(&self) -> &E {
        &self.env
    }

    fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }

    fn reset(&mut self, seed: Option<u64>, options: Option<&Info>) -> Result<(Value, Info)> {
        self.episode_return = 0.0;
        self.episode_length = 0;
        self.episode_start = Some(Instant::now());
        self.env.reset(seed, options)
    }

    fn step(&mut self, action: &Value) -> Result<Step> {
        let mut step = self.env.step(action)?;
        self.episode_return += step.reward;
        self.episode_length += 1;
        if step.is_done() {
            let elapsed = self
                .episode_start
                .map(|t| t.elapsed().as_secs_f64())
                .unwrap_or(0.0);
            let mut stats = BTreeMap::new();
            stats.insert("r".to_string(), InfoValue::Float(self.episode_return));
            stats.insert("l".to_string(), InfoValue::Int(self.episode_length as i64));
            stats.insert("t".to_string(), InfoValue::Float(elapsed));
            step.info
                .try_insert(self.stats_key.clone(), InfoValue::Map(stats))?;

            Self::push(&mut self.return_queue, self.buffer_length, self.episode_return);
            Self::push(&mut self.length_queue, self.buffer_length, self.episode_length);
            Self::push(&mut self.time_queue, self.buffer_length, elapsed);

            self.episode_return = 0.0;
            self.episode_length = 0;
            self.episode_start = Some(Instant::now());
        }
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy::DummyEnv;

    #[test]
    fn stats_attached_on_the_terminal_step_only() {
        let mut env = RecordEpisodeStatistics::new(DummyEnv::new(10), 4).unwrap();
        Wrapper::reset(&mut env, Some(0), None).unwrap();
        for _ in 0..9 {
            let step = Wrapper::step(&mut env, &Value::Int(0)).unwrap();
            assert!(step.info.get(KEY_EPISODE).is_none());
        }
        let step = Wrapper::step(&mut env, &Value::Int(0)).unwrap();
        let stats = step.info.get_map(KEY_EPISODE).unwrap();
        assert_eq!(stats.get("r"), Some(&InfoValue::Float(10.0)));
        assert_eq!(stats.get("l"), Some(&InfoValue::Int(10)));
        assert_eq!(env.return_queue.back(), Some(&10.0));
        assert_eq!(env.length_queue.back(), Some(&10));
    }

    #[test]
    fn sliding_windows_evict_oldest() {
        let mut env = RecordEpisodeStatistics::new(DummyEnv::new(1), 2).unwrap();
        Wrapper::reset(&mut env, Some(0), None).unwrap();
        for _ in 0..3 {
            Wrapper::step(&mut env, &Value::Int(0)).unwrap();
            Wrapper::reset(&mut env, None, None).unwrap();
        }
        assert_eq!(env.return_queue.len(), 2);
        assert_eq!(env.length_queue.len(), 2);
        assert_eq!(env.time_queue.len(), 2);
    }

    #[test]
    fn key_collision_is_an_error() {
        struct CollidingEnv(DummyEnv);
        impl Env for CollidingEnv {
            fn observation_space(&self) -> &crate::space::Space {
                self.0.observation_space()
            }
            fn action_space(&self) -> &crate::space::Space {
                self.0.action_space()
            }
            fn reset(
                &mut self,
                seed: Option<u64>,
                options: Option<&Info>,
            ) -> Result<(Value, Info)> {
                self.0.reset(seed, options)
            }
            fn step(&mut self, action: &Value) -> Result<Step> {
                let mut step = self.0.step(action)?;
                step.info.insert(KEY_EPISODE, InfoValue::Bool(true));
                Ok(step)
            }
        }

        let mut env =
            RecordEpisodeStatistics::new(CollidingEnv(DummyEnv::new(1)), 4).unwrap();
        Wrapper::reset(&mut env, Some(0), None).unwrap();
        let err = Wrapper::step(&mut env, &Value::Int(0)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GymError>(),
            Some(GymError::KeyCollision(_))
        ));
    }
}
