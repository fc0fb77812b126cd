//! One-time structural validation of an environment's contract.
use super::Wrapper;
use crate::env::{Env, RenderFrame, Step};
use crate::error::GymError;
use crate::info::Info;
use crate::space::Space;
use crate::value::Value;
use anyhow::Result;
use log::{trace, warn};

/// Validates reset/step outputs against the declared spaces on the *first*
/// call of each operation, then becomes a transparent pass-through.
///
/// The amortized validation keeps the hot path free of per-step checks while
/// still surfacing a mismatched environment at first use. Render has no
/// failure channel, so its first frame is only checked with a logged warning.
pub struct PassiveEnvChecker<E: Env> {
    env: E,
    checked_reset: bool,
    checked_step: bool,
    checked_render: bool,
}

impl<E: Env> PassiveEnvChecker<E> {
    /// Wraps an environment, validating its declared spaces immediately.
    pub fn new(env: E) -> Result<Self> {
        check_space(env.observation_space(), "observation")?;
        check_space(env.action_space(), "action")?;
        Ok(Self {
            env,
            checked_reset: false,
            checked_step: false,
            checked_render: false,
        })
    }
}

fn check_space(space: &Space, role: &str) -> Result<()> {
    // Constructors already validate bounds; what is checked here is that the
    // declared space kind can describe samples at all (non-degenerate).
    match space {
        Space::Tuple(spaces) if spaces.is_empty() => Err(GymError::CheckFailed(format!(
            "{} space is an empty Tuple",
            role
        ))
        .into()),
        Space::Dict(spaces) if spaces.is_empty() => Err(GymError::CheckFailed(format!(
            "{} space is an empty Dict",
            role
        ))
        .into()),
        _ => Ok(()),
    }
}

impl<E: Env> Wrapper for PassiveEnvChecker<E> {
    type Inner = E;

    fn inner(&self) -> &E {
        &self.env
    }

    fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }

    fn reset(&mut self, seed: Option<u64>, options: Option<&Info>) -> Result<(Value, Info)> {
        let (obs, info) = self.env.reset(seed, options)?;
        if !self.checked_reset {
            trace!("validating first reset output");
            self.checked_reset = true;
            if !self.env.observation_space().contains(&obs) {
                return Err(GymError::CheckFailed(format!(
                    "reset returned an observation outside the declared space: {:?}",
                    obs
                ))
                .into());
            }
        }
        Ok((obs, info))
    }

    fn step(&mut self, action: &Value) -> Result<Step> {
        if !self.checked_step {
            trace!("validating first step input and output");
            self.checked_step = true;
            if !self.env.action_space().contains(action) {
                return Err(GymError::CheckFailed(format!(
                    "action outside the declared space: {:?}",
                    action
                ))
                .into());
            }
            let step = self.env.step(action)?;
            if !self.env.observation_space().contains(&step.obs) {
                return Err(GymError::CheckFailed(format!(
                    "step returned an observation outside the declared space: {:?}",
                    step.obs
                ))
                .into());
            }
            if !step.reward.is_finite() {
                return Err(
                    GymError::CheckFailed(format!("non-finite reward {}", step.reward)).into(),
                );
            }
            return Ok(step);
        }
        self.env.step(action)
    }

    fn render(&mut self) -> Option<RenderFrame> {
        let frame = self.env.render();
        if !self.checked_render {
            trace!("validating first render output");
            self.checked_render = true;
            match &frame {
                Some(RenderFrame::Text(text)) if text.is_empty() => {
                    warn!("render returned an empty text frame");
                }
                _ => {}
            }
        }
        frame
    }
}
