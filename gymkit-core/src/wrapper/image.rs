//! Image-shaped observation conversions.
use super::Wrapper;
use crate::env::{Env, Step};
use crate::error::GymError;
use crate::info::Info;
use crate::space::Space;
use crate::value::Value;
use anyhow::Result;
use ndarray::{ArrayD, IxDyn};

/// Luminance weights of the ITU-R 601 grayscale conversion.
const LUMA: [f64; 3] = [0.299, 0.587, 0.114];

fn image_shape<E: Env>(env: &E, wrapper: &str) -> Result<(Vec<usize>, f64, f64)> {
    match env.observation_space() {
        Space::Box(b) if b.shape().len() == 3 && b.shape()[2] >= 3 => {
            let lo = b.low.iter().cloned().fold(f64::INFINITY, f64::min);
            let hi = b.high.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            Ok((b.shape().to_vec(), lo, hi))
        }
        other => Err(GymError::SpaceMismatch(format!(
            "{} needs a Box observation shaped [H, W, C>=3], got {:?}",
            wrapper, other
        ))
        .into()),
    }
}

/// Converts `[H, W, C]` color observations to `[H, W]` grayscale using fixed
/// luminance weights.
pub struct GrayscaleObservation<E: Env> {
    env: E,
    observation_space: Space,
    shape: Vec<usize>,
}

impl<E: Env> GrayscaleObservation<E> {
    /// Wraps an environment with an image-shaped `Box` observation space.
    pub fn new(env: E) -> Result<Self> {
        let (shape, lo, hi) = image_shape(&env, "GrayscaleObservation")?;
        let observation_space = Space::boxed_uniform(lo, hi, &shape[..2])?;
        Ok(Self {
            env,
            observation_space,
            shape,
        })
    }

    fn convert(&self, obs: &Value) -> Result<Value> {
        let a = obs
            .as_array()
            .ok_or_else(|| GymError::SpaceMismatch(format!("expected Array, got {}", obs.kind())))?;
        let (h, w) = (self.shape[0], self.shape[1]);
        let mut out = ArrayD::zeros(IxDyn(&[h, w]));
        for i in 0..h {
            for j in 0..w {
                let mut y = 0.0;
                for (c, weight) in LUMA.iter().enumerate() {
                    y += weight * a[[i, j, c]];
                }
                out[[i, j]] = y;
            }
        }
        Ok(Value::Array(out))
    }
}

impl<E: Env> Wrapper for GrayscaleObservation<E> {
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
        Ok((self.convert(&obs)?, info))
    }

    fn step(&mut self, action: &Value) -> Result<Step> {
        let mut step = self.env.step(action)?;
        step.obs = self.convert(&step.obs)?;
        Ok(step)
    }
}

/// Resamples `[H, W, C]` observations to a new height and width with
/// nearest-neighbor indexing.
pub struct ResizeObservation<E: Env> {
    env: E,
    observation_space: Space,
    src: Vec<usize>,
    out_h: usize,
    out_w: usize,
}

impl<E: Env> ResizeObservation<E> {
    /// Wraps an environment with an image-shaped `Box` observation space.
    pub fn new(env: E, out_h: usize, out_w: usize) -> Result<Self> {
        if out_h == 0 || out_w == 0 {
            return Err(GymError::InvalidConfig(
                "ResizeObservation needs a non-empty target shape".into(),
            )
            .into());
        }
        let (src, lo, hi) = image_shape(&env, "ResizeObservation")?;
        let observation_space = Space::boxed_uniform(lo, hi, &[out_h, out_w, src[2]])?;
        Ok(Self {
            env,
            observation_space,
            src,
            out_h,
            out_w,
        })
    }

    fn convert(&self, obs: &Value) -> Result<Value> {
        let a = obs
            .as_array()
            .ok_or_else(|| GymError::SpaceMismatch(format!("expected Array, got {}", obs.kind())))?;
        let (h, w, c) = (self.src[0], self.src[1], self.src[2]);
        let mut out = ArrayD::zeros(IxDyn(&[self.out_h, self.out_w, c]));
        for i in 0..self.out_h {
            let si = i * h / self.out_h;
            for j in 0..self.out_w {
                let sj = j * w / self.out_w;
                for k in 0..c {
                    out[[i, j, k]] = a[[si, sj, k]];
                }
            }
        }
        Ok(Value::Array(out))
    }
}

impl<E: Env> Wrapper for ResizeObservation<E> {
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
        Ok((self.convert(&obs)?, info))
    }

    fn step(&mut self, action: &Value) -> Result<Step> {
        let mut step = self.env.step(action)?;
        step.obs = self.convert(&step.obs)?;
        Ok(step)
    }
}
