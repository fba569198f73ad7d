use serde::Serialize;

use examgate_face::euclidean_distance;
use examgate_store::FaceModel;

/// Synthetic class for attempts that matched no enrolled user at the
/// operating threshold.
pub const NO_MATCH: &str = "No Match";

/// A labeled identification trial: what the sample truly was, and what
/// the system predicted.
#[derive(Debug, Clone)]
pub struct Trial {
    pub actual: String,
    pub predicted: String,
}

/// Confusion matrix over an ordered class list, with `No Match` kept as
/// the final class when present.
#[derive(Debug, Clone, Serialize)]
pub struct ConfusionMatrix {
    /// Class labels indexing both axes; rows = actual, columns = predicted.
    pub classes: Vec<String>,
    /// `counts[actual][predicted]`.
    pub counts: Vec<Vec<usize>>,
}

/// Per-class precision/recall/F1 row of an evaluation report.
#[derive(Debug, Clone, Serialize)]
pub struct ClassReport {
    pub class: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of trials whose actual label is this class.
    pub support: usize,
}

impl ConfusionMatrix {
    /// Builds a matrix from labeled trials. Classes are the sorted union
    /// of actual and predicted labels, `No Match` ordered last.
    pub fn from_trials(trials: &[Trial]) -> Self {
        let mut classes: Vec<String> = trials
            .iter()
            .flat_map(|t| [t.actual.clone(), t.predicted.clone()])
            .collect();
        classes.sort();
        classes.dedup();
        if let Some(idx) = classes.iter().position(|c| c == NO_MATCH) {
            let nm = classes.remove(idx);
            classes.push(nm);
        }

        let idx = |label: &str| classes.iter().position(|c| c == label).unwrap_or(0);
        let n = classes.len();
        let mut counts = vec![vec![0usize; n]; n];
        for t in trials {
            counts[idx(&t.actual)][idx(&t.predicted)] += 1;
        }
        Self { classes, counts }
    }

    /// Per-class precision, recall, and F1. Empty denominators report 0.
    pub fn report(&self) -> Vec<ClassReport> {
        let n = self.classes.len();
        (0..n)
            .map(|c| {
                let tp = self.counts[c][c] as f64;
                let predicted: f64 = (0..n).map(|a| self.counts[a][c] as f64).sum();
                let actual: f64 = (0..n).map(|p| self.counts[c][p] as f64).sum();

                let precision = if predicted > 0.0 { tp / predicted } else { 0.0 };
                let recall = if actual > 0.0 { tp / actual } else { 0.0 };
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassReport {
                    class: self.classes[c].clone(),
                    precision,
                    recall,
                    f1,
                    support: actual as usize,
                }
            })
            .collect()
    }

    /// Fraction of trials on the diagonal.
    pub fn accuracy(&self) -> f64 {
        let total: usize = self.counts.iter().flatten().sum();
        if total == 0 {
            return 0.0;
        }
        let correct: usize = (0..self.classes.len()).map(|c| self.counts[c][c]).sum();
        correct as f64 / total as f64
    }
}

/// Identifies an embedding against all enrolled face models: the nearest
/// model within the threshold wins, otherwise [`NO_MATCH`].
pub fn predict_face_label(embedding: &[f32], models: &[FaceModel], threshold: f32) -> String {
    let mut best: Option<(&FaceModel, f32)> = None;
    for m in models {
        let d = euclidean_distance(embedding, &m.embedding);
        if best.is_none_or(|(_, bd)| d < bd) {
            best = Some((m, d));
        }
    }
    match best {
        Some((m, d)) if d <= threshold => m.user_id.clone(),
        _ => NO_MATCH.to_string(),
    }
}
