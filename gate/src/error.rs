use thiserror::Error;

/// Errors returned by the login gate.
///
/// Per-attempt media and scoring failures are *not* errors: they become
/// retries inside the verify outcomes. What surfaces here is either a call
/// made outside any in-flight login, or a fatal storage/model problem that
/// only an operator can fix.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("no login in progress for this session")]
    NoActiveLogin,

    #[error("call does not match the current login stage: expected {expected}")]
    WrongStage { expected: &'static str },

    #[error("verification backend failure: {0}")]
    Backend(String),
}
