//! Stacking of the most recent observations.
use super::Wrapper;
use crate::env::{Env, Step};
use crate::error::GymError;
use crate::info::Info;
use crate::space::Space;
use crate::value::Value;
use anyhow::Result;
use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// How the stack is filled right after a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackPadding {
    /// Repeat the reset observation in every slot.
    Reset,

    /// Zero-fill all slots but the last.
    Zero,
}

/// Keeps a circular buffer of the last `stack_size` observations and stacks
/// them along a new leading axis.
///
/// The stacked observation has shape `[stack_size] + inner_shape`, newest
/// frame last.
pub struct FrameStack<E: Env> {
    env: E,
    observation_space: Space,
    stack_size: usize,
    padding: StackPadding,
    frames: VecDeque<ArrayD<f64>>,
    inner_shape: Vec<usize>,
}

impl<E: Env> FrameStack<E> {
    /// Wraps an environment whose observation space is a `Box`.
    /// `stack_size` must be at least 2.
    pub fn new(env: E, stack_size: usize, padding: StackPadding) -> Result<Self> {
        if stack_size < 2 {
            return Err(
                GymError::InvalidConfig("FrameStack needs stack_size >= 2".into()).into(),
            );
        }
        let b = match env.observation_space() {
            Space::Box(b) => b,
            other => {
                return Err(GymError::SpaceMismatch(format!(
                    "FrameStack needs a Box observation space, got {:?}",
                    other
                ))
                .into())
            }
        };
        let inner_shape = b.shape().to_vec();
        let mut shape = vec![stack_size];
        shape.extend(&inner_shape);
        let rep = |a: &ArrayD<f64>| {
            let data: Vec<f64> = std::iter::repeat(a.iter().cloned())
                .take(stack_size)
                .flatten()
                .collect();
            ArrayD::from_shape_vec(IxDyn(&shape), data).expect("shape matches data")
        };
        let observation_space = Space::boxed(rep(&b.low), rep(&b.high))?;
        Ok(Self {
            env,
            observation_space,
            stack_size,
            padding,
            frames: VecDeque::with_capacity(stack_size),
            inner_shape,
        })
    }

    fn frame_of(&self, obs: &Value) -> Result<ArrayD<f64>> {
        let a = obs
            .as_array()
            .ok_or_else(|| GymError::SpaceMismatch(format!("expected Array, got {}", obs.kind())))?;
        Ok(a.clone())
    }

    fn stacked(&self) -> Value {
        let mut shape = vec![self.stack_size];
        shape.extend(&self.inner_shape);
        let data: Vec<f64> = self
            .frames
            .iter()
            .flat_map(|f| f.iter().cloned())
            .collect();
        Value::Array(ArrayD::from_shape_vec(IxDyn(&shape), data).expect("shape matches data"))
    }
}

impl<E: Env> Wrapper for FrameStack<E> {
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
        let frame = self.frame_of(&obs)?;
        self.frames.clear();
        match self.padding {
            StackPadding::Reset => {
                for _ in 0..self.stack_size {
                    self.frames.push_back(frame.clone());
                }
            }
            StackPadding::Zero => {
                let zero = ArrayD::zeros(IxDyn(&self.inner_shape));
                for _ in 0..self.stack_size - 1 {
                    self.frames.push_back(zero.clone());
                }
                self.frames.push_back(frame);
            }
        }
        Ok((self.stacked(), info))
    }

    fn step(&mut self, action: &Value) -> Result<Step> {
        let mut step = self.env.step(action)?;
        let frame = self.frame_of(&step.obs)?;
        self.frames.pop_front();
        self.frames.push_back(frame);
        step.obs = self.stacked();
        Ok(step)
    }
}
