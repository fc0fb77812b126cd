//! Global environment registry.
//!
//! Environments register under a versioned id (e.g. `"CartPole-v1"`) together
//! with a factory closure. [`make`] builds a fresh instance and applies the
//! standard wrapper stack around it, innermost first:
//!
//! 1. [`PassiveEnvChecker`] (unless disabled),
//! 2. [`OrderEnforcing`],
//! 3. [`TimeLimit`] (if a step budget is known).
//!
//! The registry is process-global and thread-safe; registration after the
//! first `make` is allowed, re-registration of an existing id is not.
use crate::env::{Env, EnvSpec, RenderMode};
use crate::error::GymError;
use crate::wrapper::{OrderEnforcing, PassiveEnvChecker, TimeLimit, Wrapper};
use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::{OnceLock, PoisonError, RwLock};

type Factory = Box<dyn Fn(Option<RenderMode>) -> Result<Box<dyn Env>> + Send + Sync>;

/// A registry entry: an id, its default episode metadata and a factory.
pub struct Registration {
    id: String,
    max_episode_steps: Option<usize>,
    reward_threshold: Option<f64>,
    factory: Factory,
}

impl Registration {
    /// Creates an entry for `id` whose instances are built by `factory`.
    ///
    /// The factory receives the render mode requested at `make` time, or
    /// `None` when rendering is not wanted.
    pub fn new(
        id: impl Into<String>,
        factory: impl Fn(Option<RenderMode>) -> Result<Box<dyn Env>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            max_episode_steps: None,
            reward_threshold: None,
            factory: Box::new(factory),
        }
    }

    /// Default step budget applied by [`make`] through [`TimeLimit`].
    pub fn max_episode_steps(mut self, steps: usize) -> Self {
        self.max_episode_steps = Some(steps);
        self
    }

    /// Reward at which the task counts as solved.
    pub fn reward_threshold(mut self, threshold: f64) -> Self {
        self.reward_threshold = Some(threshold);
        self
    }
}

/// Per-call overrides for [`make`].
#[derive(Debug, Clone, Default)]
pub struct MakeOptions {
    /// Overrides the registered step budget.
    pub max_episode_steps: Option<usize>,

    /// Skips the [`PassiveEnvChecker`] layer.
    pub disable_env_checker: bool,

    /// Render mode passed through to the factory.
    pub render_mode: Option<RenderMode>,
}

fn registry() -> &'static RwLock<BTreeMap<String, Registration>> {
    static REGISTRY: OnceLock<RwLock<BTreeMap<String, Registration>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(BTreeMap::new()))
}

/// Adds an entry to the global registry.
///
/// Fails with [`GymError::DuplicateEnv`] if the id is already taken.
pub fn register(registration: Registration) -> Result<()> {
    let mut table = registry().write().unwrap_or_else(PoisonError::into_inner);
    if table.contains_key(&registration.id) {
        return Err(GymError::DuplicateEnv(registration.id).into());
    }
    log::debug!("Registered environment {}", registration.id);
    table.insert(registration.id.clone(), registration);
    Ok(())
}

/// Returns the metadata of a registered id without constructing an instance.
pub fn spec_of(id: &str) -> Result<EnvSpec> {
    let table = registry().read().unwrap_or_else(PoisonError::into_inner);
    let reg = table
        .get(id)
        .ok_or_else(|| GymError::UnknownEnv(id.to_string()))?;
    let mut spec = EnvSpec::new(&reg.id);
    spec.max_episode_steps = reg.max_episode_steps;
    spec.reward_threshold = reg.reward_threshold;
    Ok(spec)
}

/// Builds a registered environment with the standard wrapper stack applied.
pub fn make(id: &str, options: &MakeOptions) -> Result<Box<dyn Env>> {
    let table = registry().read().unwrap_or_else(PoisonError::into_inner);
    let reg = table
        .get(id)
        .ok_or_else(|| GymError::UnknownEnv(id.to_string()))?;

    let base = (reg.factory)(options.render_mode)?;
    let max_episode_steps = options.max_episode_steps.or(reg.max_episode_steps);

    let mut spec = EnvSpec::new(&reg.id);
    spec.max_episode_steps = max_episode_steps;
    spec.reward_threshold = reg.reward_threshold;
    if !options.disable_env_checker {
        spec.applied_wrappers.push("PassiveEnvChecker".to_string());
    }
    spec.applied_wrappers.push("OrderEnforcing".to_string());
    if max_episode_steps.is_some() {
        spec.applied_wrappers.push("TimeLimit".to_string());
    }
    log::info!("Making environment {} with wrappers {:?}", reg.id, spec.applied_wrappers);

    let mut env: Box<dyn Env> = Box::new(Specced { env: base, spec });
    if !options.disable_env_checker {
        env = Box::new(PassiveEnvChecker::new(env)?);
    }
    env = Box::new(OrderEnforcing::new(env));
    if let Some(steps) = max_episode_steps {
        env = Box::new(TimeLimit::new(env, steps)?);
    }
    Ok(env)
}

/// Innermost layer of a made stack: carries the [`EnvSpec`] so every outer
/// wrapper's default `spec` delegation finds it.
struct Specced {
    env: Box<dyn Env>,
    spec: EnvSpec,
}

impl Wrapper for Specced {
    type Inner = Box<dyn Env>;

    fn inner(&self) -> &Box<dyn Env> {
        &self.env
    }

    fn inner_mut(&mut self) -> &mut Box<dyn Env> {
        &mut self.env
    }

    fn spec(&self) -> Option<&EnvSpec> {
        Some(&self.spec)
    }
}
