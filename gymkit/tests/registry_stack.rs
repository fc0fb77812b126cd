//! End-to-end behavior of environments built through the registry.
use anyhow::Result;
use gymkit::{make, spec_of, Env, GymError, MakeOptions, RenderFrame, RenderMode, Value};
use std::sync::Once;

fn init() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        env_logger::builder().is_test(true).try_init().ok();
        gymkit::init().unwrap();
    });
}

#[test]
fn made_env_carries_its_spec() -> Result<()> {
    init();
    let env = make("CartPole-v1", &MakeOptions::default())?;
    let spec = env.spec().unwrap();
    assert_eq!(spec.id, "CartPole-v1");
    assert_eq!(spec.max_episode_steps, Some(500));
    assert_eq!(spec.reward_threshold, Some(475.0));
    assert_eq!(
        spec.applied_wrappers,
        vec!["PassiveEnvChecker", "OrderEnforcing", "TimeLimit"]
    );
    Ok(())
}

#[test]
fn time_limit_truncates_mountain_car() -> Result<()> {
    init();
    let mut env = make("MountainCar-v0", &MakeOptions::default())?;
    env.reset(Some(0), None)?;
    // Coasting never reaches the goal, so the 200-step budget must end the
    // episode with truncated, not terminated.
    for _ in 0..199 {
        assert!(!env.step(&Value::Int(1))?.is_done());
    }
    let step = env.step(&Value::Int(1))?;
    assert!(step.truncated);
    assert!(!step.terminated);
    Ok(())
}

#[test]
fn step_before_reset_is_an_order_violation() -> Result<()> {
    init();
    let mut env = make("Acrobot-v1", &MakeOptions::default())?;
    let err = env.step(&Value::Int(0)).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GymError>(),
        Some(GymError::OrderViolation(_))
    ));
    Ok(())
}

#[test]
fn unknown_id_is_reported() {
    init();
    let err = make("DoesNotExist-v0", &MakeOptions::default()).err().unwrap();
    assert!(matches!(
        err.downcast_ref::<GymError>(),
        Some(GymError::UnknownEnv(_))
    ));
}

#[test]
fn spec_of_does_not_construct() -> Result<()> {
    init();
    let spec = spec_of("Pendulum-v1")?;
    assert_eq!(spec.max_episode_steps, Some(200));
    assert!(spec.applied_wrappers.is_empty());
    Ok(())
}

#[test]
fn budget_override_wins_over_registration() -> Result<()> {
    init();
    let options = MakeOptions {
        max_episode_steps: Some(5),
        ..Default::default()
    };
    let mut env = make("CartPole-v1", &options)?;
    env.reset(Some(0), None)?;
    let mut last = None;
    for _ in 0..5 {
        last = Some(env.step(&Value::Int(0))?);
    }
    assert!(last.unwrap().truncated);
    Ok(())
}

#[test]
fn render_mode_flows_through_the_stack() -> Result<()> {
    init();
    let options = MakeOptions {
        render_mode: Some(RenderMode::Ansi),
        ..Default::default()
    };
    let mut env = make("FrozenLake-v1", &options)?;
    env.reset(Some(0), None)?;
    let RenderFrame::Text(text) = env.render().unwrap();
    assert!(text.contains("[S]"));

    let mut silent = make("FrozenLake-v1", &MakeOptions::default())?;
    silent.reset(Some(0), None)?;
    assert!(silent.render().is_none());
    Ok(())
}

#[test]
fn seeded_episodes_are_reproducible_through_the_stack() -> Result<()> {
    init();
    let run = || -> Result<Vec<Value>> {
        let mut env = make("FrozenLake-v1", &MakeOptions::default())?;
        env.reset(Some(9), None)?;
        let mut out = Vec::new();
        for _ in 0..20 {
            let step = env.step(&Value::Int(2))?;
            out.push(step.obs.clone());
            if step.is_done() {
                break;
            }
        }
        Ok(out)
    };
    assert_eq!(run()?, run()?);
    Ok(())
}
