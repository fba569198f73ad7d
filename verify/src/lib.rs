//! Biometric enrollment, verification scoring, and threshold calibration.
//!
//! # Architecture
//!
//! Three engines over the shared stores and the injected background model:
//!
//! - [`Enroller`]: raw samples -> persisted per-user models
//! - [`Scorer`]: live sample + stored model -> [`Decision`]
//! - [`calibrate`]: held-out genuine/impostor scores -> operating point
//!
//! Voice decisions compare the log-likelihood ratio against
//! `threshold - margin` with a strict `>`; face decisions compare the
//! embedding distance against the face threshold with a non-strict `<=`.
//! The two polarities are intentionally opposite and must not be mixed up.
//!
//! No retry state lives here: the session gate owns attempt budgets, and
//! every failure is an ordinary [`VerifyError`] variant the gate converts
//! into a retry.

mod calibrate;
mod enroll;
mod error;
mod evaluate;
mod proctor;
mod score;

pub use calibrate::{calibrate, Calibration, SWEEP_CANDIDATES};
pub use enroll::{enroll_voice_task, Enroller};
pub use error::VerifyError;
pub use evaluate::{predict_face_label, ClassReport, ConfusionMatrix, Trial, NO_MATCH};
pub use proctor::ProctorEvent;
pub use score::{voice_llr, Decision, Scorer, ScorerConfig, DEFAULT_FACE_THRESHOLD};

#[cfg(test)]
mod tests;
