use examgate_gmm::DiagGmm;
use serde::{Deserialize, Serialize};

/// Default acceptance threshold before any calibration has run. Only in
/// effect between model creation and the first calibration pass;
/// `is_trained` gates verification until then.
pub const DEFAULT_THRESHOLD: f64 = -1000.0;

/// Default safety margin subtracted from the threshold at decision time.
pub const DEFAULT_MARGIN: f64 = 10.0;

/// A user's persisted voice model.
///
/// The standardization scaler is deliberately absent: all speakers share
/// the background model's scaler so enrollment and verification live in
/// one feature space. Threshold and margin are always evaluated together,
/// `effective = threshold - margin`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceModel {
    /// Owning user id.
    pub user_id: String,
    /// Per-speaker density model over UBM-scaled features.
    pub gmm: DiagGmm,
    /// Calibrated acceptance boundary on the log-likelihood ratio.
    pub threshold: f64,
    /// Safety buffer subtracted from the threshold at decision time.
    pub margin: f64,
    /// Set once enrollment completes; verification refuses untrained
    /// models so the gate can apply its bypass rule.
    pub is_trained: bool,
}

impl VoiceModel {
    /// The decision boundary actually applied: `threshold - margin`.
    pub fn effective_threshold(&self) -> f64 {
        self.threshold - self.margin
    }
}

/// A user's persisted face model: one canonical embedding. The augmented
/// crop set lives beside it as derived artifacts, never in the embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceModel {
    /// Owning user id.
    pub user_id: String,
    /// Fixed-length embedding of the original enrollment crop.
    pub embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_threshold_subtracts_margin() {
        let model = VoiceModel {
            user_id: "u1".into(),
            gmm: DiagGmm {
                weights: vec![1.0],
                means: vec![vec![0.0]],
                variances: vec![vec![1.0]],
            },
            threshold: -40.0,
            margin: 10.0,
            is_trained: true,
        };
        assert_eq!(model.effective_threshold(), -50.0);
    }
}
