use serde::{Deserialize, Serialize};

use crate::GmmError;

/// Per-feature standardization: subtract mean, divide by standard deviation.
///
/// Fit once on the pooled background corpus, then applied to every
/// enrollment and verification utterance, so all speakers share one
/// feature space. Uses f64 accumulation throughout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Per-feature mean.
    pub mean: Vec<f64>,
    /// Per-feature standard deviation, floored to avoid division blowup.
    pub scale: Vec<f64>,
}

/// Floor for the per-feature standard deviation.
const SCALE_FLOOR: f64 = 1e-12;

impl StandardScaler {
    /// Fits a scaler on the given frames.
    ///
    /// All frames must have the same dimension. Returns `EmptyInput` for
    /// zero frames.
    pub fn fit(frames: &[Vec<f32>]) -> Result<Self, GmmError> {
        let first = frames.first().ok_or(GmmError::EmptyInput)?;
        let dim = first.len();
        if dim == 0 {
            return Err(GmmError::EmptyInput);
        }
        let n = frames.len() as f64;

        let mut mean = vec![0.0f64; dim];
        for f in frames {
            if f.len() != dim {
                return Err(GmmError::DimensionMismatch {
                    expected: dim,
                    got: f.len(),
                });
            }
            for (m, &x) in mean.iter_mut().zip(f.iter()) {
                *m += x as f64;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut var = vec![0.0f64; dim];
        for f in frames {
            for d in 0..dim {
                let diff = f[d] as f64 - mean[d];
                var[d] += diff * diff;
            }
        }
        let scale = var
            .into_iter()
            .map(|v| (v / n).sqrt().max(SCALE_FLOOR))
            .collect();

        Ok(Self { mean, scale })
    }

    /// Returns the feature dimension this scaler was fit on.
    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    /// Applies the standardization to a batch of frames.
    pub fn transform(&self, frames: &[Vec<f32>]) -> Result<Vec<Vec<f32>>, GmmError> {
        let dim = self.mean.len();
        let mut out = Vec::with_capacity(frames.len());
        for f in frames {
            if f.len() != dim {
                return Err(GmmError::DimensionMismatch {
                    expected: dim,
                    got: f.len(),
                });
            }
            let mut scaled = Vec::with_capacity(dim);
            for d in 0..dim {
                scaled.push(((f[d] as f64 - self.mean[d]) / self.scale[d]) as f32);
            }
            out.push(scaled);
        }
        Ok(out)
    }
}
