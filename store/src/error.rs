use thiserror::Error;

/// Errors returned by the artifact store.
///
/// A *missing* per-user model is not an error (`Ok(None)` from the load
/// calls); an unreadable or undecodable blob is, since it means an
/// operator-side misconfiguration that only re-enrollment fixes.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt artifact {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("encode error: {0}")]
    Encode(String),

    #[error("background model missing at {path}")]
    UbmMissing { path: String },
}
