//! Diagonal-covariance Gaussian mixture modeling for speaker verification.
//!
//! # Architecture
//!
//! Speaker models are trained and scored in a shared, standardized feature
//! space:
//!
//! 1. [`StandardScaler::transform`]: raw 39-dim MFCC frames -> z-scored frames
//! 2. [`DiagGmm::fit`]: z-scored frames -> per-speaker density model
//! 3. [`DiagGmm::score`]: frames -> mean per-frame log-likelihood
//!
//! The scaler is always the one fit on the background corpus, so every
//! speaker's model lives in the same coordinate system. Likelihood-ratio
//! scoring subtracts the background model's score from the speaker model's
//! score over the same frames.
//!
//! # Scoring Convention
//!
//! [`DiagGmm::score`] returns the *mean* per-frame log-likelihood, not the
//! sum. This makes scores comparable across utterances of different length.

mod error;
mod gmm;
mod scaler;
mod ubm;

pub use error::GmmError;
pub use gmm::{DiagGmm, GmmConfig};
pub use scaler::StandardScaler;
pub use ubm::Ubm;
