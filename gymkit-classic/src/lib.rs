#![warn(missing_docs)]
//! Classic control and toy-text environments.
//!
//! Each environment is usable directly through its constructor or through
//! the global registry after [`register_all`].
mod acrobot;
mod cartpole;
mod frozen_lake;
mod mountain_car;
mod pendulum;

pub use acrobot::{Acrobot, AcrobotConfig};
pub use cartpole::{CartPole, CartPoleConfig};
pub use frozen_lake::{FrozenLake, FrozenLakeConfig};
pub use mountain_car::{MountainCar, MountainCarConfig};
pub use pendulum::{Pendulum, PendulumConfig};

use anyhow::Result;
use gymkit_core::registry::{register, Registration};
use gymkit_core::Env;
use log::info;

/// Registers every environment of this crate under its versioned id.
///
/// Fails if any of the ids is already taken, so call it once per process.
pub fn register_all() -> Result<()> {
    register(
        Registration::new("FrozenLake-v1", |mode| {
            Ok(Box::new(FrozenLake::new(FrozenLakeConfig::default())?.render_mode(mode))
                as Box<dyn Env>)
        })
        .max_episode_steps(100)
        .reward_threshold(0.7),
    )?;
    register(
        Registration::new("FrozenLake8x8-v1", |mode| {
            let config = FrozenLakeConfig::default().map(FrozenLakeConfig::map_8x8());
            Ok(Box::new(FrozenLake::new(config)?.render_mode(mode)) as Box<dyn Env>)
        })
        .max_episode_steps(200)
        .reward_threshold(0.85),
    )?;
    register(
        Registration::new("CartPole-v1", |mode| {
            Ok(Box::new(CartPole::new(CartPoleConfig::default())?.render_mode(mode))
                as Box<dyn Env>)
        })
        .max_episode_steps(500)
        .reward_threshold(475.0),
    )?;
    register(
        Registration::new("MountainCar-v0", |mode| {
            Ok(Box::new(MountainCar::new(MountainCarConfig::default())?.render_mode(mode))
                as Box<dyn Env>)
        })
        .max_episode_steps(200)
        .reward_threshold(-110.0),
    )?;
    register(
        Registration::new("Pendulum-v1", |mode| {
            Ok(Box::new(Pendulum::new(PendulumConfig::default())?.render_mode(mode))
                as Box<dyn Env>)
        })
        .max_episode_steps(200),
    )?;
    register(
        Registration::new("Acrobot-v1", |mode| {
            Ok(Box::new(Acrobot::new(AcrobotConfig::default())?.render_mode(mode))
                as Box<dyn Env>)
        })
        .max_episode_steps(500)
        .reward_threshold(-100.0),
    )?;
    info!("registered classic control and toy-text environments");
    Ok(())
}
