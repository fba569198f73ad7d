//! Multi-factor login sequencing: password, then voiceprint, then face,
//! with bounded independent retries per biometric stage.
//!
//! # State machine
//!
//! ```text
//! (anonymous) --password ok, student w/ voice model--> VoicePending
//! (anonymous) --password ok, teacher/admin or no model--> Authenticated
//! VoicePending --accept--> FacePending (or Authenticated if no face model)
//! VoicePending --reject/bad media x3--> destroyed (fresh anonymous start)
//! FacePending --accept--> Authenticated
//! FacePending --reject/bad media x3--> destroyed
//! ```
//!
//! Stages are a tagged enum and the face stage is constructible only by
//! the voice-accept transition, so "face without voice" is
//! unrepresentable rather than checked ad hoc. The anonymous state is the
//! absence of a session entry; destroying a session *is* the reset.

mod creds;
mod error;
mod gate;
mod stage;

pub use creds::{CredentialStore, Role, UserRecord};
pub use error::GateError;
pub use gate::{
    BiometricScorer, LoginGate, NextStep, PasswordOutcome, VerifyOutcome, MAX_ATTEMPTS,
};
pub use stage::{AuthStage, SessionStore};
