use serde::{Deserialize, Serialize};

use crate::{DiagGmm, GmmConfig, GmmError, StandardScaler};

/// Universal background model: the speaker-independent (scaler, GMM) pair.
///
/// Trained offline on a pooled multi-speaker corpus, loaded once at process
/// start from its fixed artifact location, then shared read-only by every
/// enrollment and verification call. It is plain immutable data; callers
/// wrap it in an `Arc` and inject it where needed rather than reaching for
/// a global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ubm {
    /// Scaler fit on the background corpus. Anchors all speakers to one
    /// feature space; per-user models deliberately have no scaler of
    /// their own.
    pub scaler: StandardScaler,
    /// Background density model.
    pub gmm: DiagGmm,
}

impl Ubm {
    /// Trains a background pair from pooled raw frames.
    ///
    /// Fits the scaler on the pool, then the GMM on the scaled pool.
    pub fn train(frames: &[Vec<f32>], cfg: &GmmConfig) -> Result<Self, GmmError> {
        let scaler = StandardScaler::fit(frames)?;
        let scaled = scaler.transform(frames)?;
        let gmm = DiagGmm::fit(&scaled, cfg)?;
        Ok(Self { scaler, gmm })
    }

    /// Mean per-frame log-likelihood of already-scaled frames under the
    /// background model.
    pub fn score(&self, scaled_frames: &[Vec<f32>]) -> Result<f64, GmmError> {
        self.gmm.score(scaled_frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pooled_frames() -> Vec<Vec<f32>> {
        // Several "speakers" with different offsets pooled together.
        let mut frames = Vec::new();
        for s in 0..4 {
            for i in 0..50 {
                let jitter = ((i * 37 + s * 101) % 100) as f32 / 100.0 - 0.5;
                frames.push(vec![s as f32 + jitter, -(s as f32) + jitter * 0.5]);
            }
        }
        frames
    }

    fn cfg() -> GmmConfig {
        GmmConfig {
            n_components: 4,
            n_init: 1,
            max_iter: 30,
            tol: 1e-3,
            reg_covar: 1e-6,
            seed: Some(5),
        }
    }

    #[test]
    fn train_and_score() {
        let frames = pooled_frames();
        let ubm = Ubm::train(&frames, &cfg()).unwrap();
        assert_eq!(ubm.scaler.dimension(), 2);

        let scaled = ubm.scaler.transform(&frames).unwrap();
        let score = ubm.score(&scaled).unwrap();
        assert!(score.is_finite());
    }

    #[test]
    fn roundtrip_preserves_scores() {
        let frames = pooled_frames();
        let ubm = Ubm::train(&frames, &cfg()).unwrap();
        let scaled = ubm.scaler.transform(&frames).unwrap();

        let blob = rmp_serde::to_vec_named(&ubm).unwrap();
        let restored: Ubm = rmp_serde::from_slice(&blob).unwrap();

        assert_eq!(
            ubm.score(&scaled).unwrap(),
            restored.score(&scaled).unwrap()
        );
    }
}
