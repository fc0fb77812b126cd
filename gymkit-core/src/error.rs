//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
///
/// Every variant corresponds to a deterministic failure: there is no I/O on
/// the `reset`/`step` hot path, so no error here is transient or retryable.
#[derive(Error, Debug)]
pub enum GymError {
    /// A space was constructed with inconsistent parameters.
    #[error("Invalid space: {0}")]
    InvalidSpace(String),

    /// An environment or wrapper was configured with an invalid parameter.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A wrapper's precondition on its inner environment's spaces failed.
    #[error("Space mismatch: {0}")]
    SpaceMismatch(String),

    /// A value was rejected by the space it was checked against.
    #[error("Value outside of space: {0}")]
    OutOfSpace(String),

    /// Flatten/unflatten was invoked on a space kind with no flattening
    /// strategy, or on a sample of the wrong shape.
    #[error("Cannot flatten: {0}")]
    Unflattenable(String),

    /// A method was called before the first `reset` of the environment.
    #[error("Order violation: {0} called before reset")]
    OrderViolation(String),

    /// `step` was called with no live episode (never reset, or the previous
    /// episode finished without an intervening `reset`).
    #[error("Reset needed: {0}")]
    ResetNeeded(String),

    /// Mutually exclusive sampling constraints were supplied together.
    #[error("Sampling constraint error: {0}")]
    SampleConstraint(String),

    /// An info key that must be written was already present.
    #[error("Info key collision: {0}")]
    KeyCollision(String),

    /// A structural check of the passive environment checker failed.
    #[error("Environment check failed: {0}")]
    CheckFailed(String),

    /// An environment id is not present in the registry.
    #[error("Unknown environment id: {0}")]
    UnknownEnv(String),

    /// An environment id was registered twice.
    #[error("Environment id already registered: {0}")]
    DuplicateEnv(String),
}
