use serde::Serialize;
use tracing::info;

use crate::VerifyError;

/// Number of threshold candidates swept between the score extremes.
pub const SWEEP_CANDIDATES: usize = 100;

/// A calibrated operating point and the rates it achieves on the
/// validation sets.
#[derive(Debug, Clone, Serialize)]
pub struct Calibration {
    /// Chosen acceptance threshold.
    pub threshold: f64,
    /// Offset from the enrollment-time threshold to the chosen one.
    pub margin: f64,
    /// Validation accuracy at the chosen threshold.
    pub accuracy: f64,
    /// False-accept rate at the chosen threshold.
    pub far: f64,
    /// False-reject rate at the chosen threshold.
    pub frr: f64,
}

/// Sweeps candidate thresholds over held-out genuine and impostor scores
/// and picks the accuracy-maximizing operating point.
///
/// Candidates are linearly spaced between the global score minimum and
/// maximum; within the sweep a positive counts as accepted when its score
/// is `>= t`. Ties in accuracy resolve to the first candidate in
/// ascending order. The new margin is the offset from the
/// enrollment-time threshold to the chosen one, so
/// `threshold - margin` moves to `2*chosen - trained`.
pub fn calibrate(
    pos_scores: &[f64],
    neg_scores: &[f64],
    trained_threshold: f64,
) -> Result<Calibration, VerifyError> {
    if pos_scores.is_empty() || neg_scores.is_empty() {
        return Err(VerifyError::EmptyScores);
    }

    let all = pos_scores.iter().chain(neg_scores.iter());
    let min = all.clone().cloned().fold(f64::INFINITY, f64::min);
    let max = all.cloned().fold(f64::NEG_INFINITY, f64::max);

    let total = (pos_scores.len() + neg_scores.len()) as f64;
    let mut best: Option<Calibration> = None;

    for i in 0..SWEEP_CANDIDATES {
        let t = if SWEEP_CANDIDATES > 1 {
            min + (max - min) * i as f64 / (SWEEP_CANDIDATES - 1) as f64
        } else {
            min
        };

        let tp = pos_scores.iter().filter(|&&s| s >= t).count() as f64;
        let fn_ = pos_scores.len() as f64 - tp;
        let fp = neg_scores.iter().filter(|&&s| s >= t).count() as f64;
        let tn = neg_scores.len() as f64 - fp;

        let far = if fp + tn > 0.0 { fp / (fp + tn) } else { 0.0 };
        let frr = if fn_ + tp > 0.0 { fn_ / (fn_ + tp) } else { 0.0 };
        let accuracy = (tp + tn) / total;

        // Strict improvement only: ties keep the first (lowest) candidate.
        if best.as_ref().is_none_or(|b| accuracy > b.accuracy) {
            best = Some(Calibration {
                threshold: t,
                margin: trained_threshold - t,
                accuracy,
                far,
                frr,
            });
        }
    }

    // The sweep always runs at least once, so best is present.
    let chosen = best.ok_or(VerifyError::EmptyScores)?;
    info!(
        threshold = chosen.threshold,
        margin = chosen.margin,
        accuracy = chosen.accuracy,
        far = chosen.far,
        frr = chosen.frr,
        "threshold calibration complete"
    );
    Ok(chosen)
}
