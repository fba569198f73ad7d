//! Persisted biometric artifacts: per-user voice and face models, the
//! shared background model, and raw sample retention.
//!
//! Model blobs are opaque MessagePack; the store validates on read and
//! reports a corrupt blob as a fatal error (operator misconfiguration),
//! while a merely *absent* per-user model is the ordinary `Ok(None)` the
//! login gate's bypass rule consumes.

mod error;
mod store;
mod types;

pub use error::StoreError;
pub use store::ModelStore;
pub use types::{FaceModel, VoiceModel, DEFAULT_MARGIN, DEFAULT_THRESHOLD};
