use std::io::Cursor;
use std::sync::Arc;

use examgate_audio::extract_voice_features;
use examgate_face::{augment, crop_face, decode_image, most_prominent, FaceDetector, FaceEncoder};
use examgate_gmm::{DiagGmm, GmmConfig, Ubm};
use examgate_store::{FaceModel, ModelStore, VoiceModel, DEFAULT_MARGIN};
use tracing::{info, warn};

use crate::VerifyError;

/// Builds and persists per-user biometric models.
///
/// Voice enrollment fits a fresh GMM on the user's pooled enrollment
/// features, standardized with the background model's scaler so every
/// speaker shares one feature space. Face enrollment stores the embedding
/// of the original detected crop and generates the fixed augmentation set
/// as derived artifacts.
pub struct Enroller {
    store: ModelStore,
    ubm: Arc<Ubm>,
    gmm_cfg: GmmConfig,
    detector: Arc<dyn FaceDetector>,
    encoder: Arc<dyn FaceEncoder>,
}

impl Enroller {
    pub fn new(
        store: ModelStore,
        ubm: Arc<Ubm>,
        gmm_cfg: GmmConfig,
        detector: Arc<dyn FaceDetector>,
        encoder: Arc<dyn FaceEncoder>,
    ) -> Self {
        Self {
            store,
            ubm,
            gmm_cfg,
            detector,
            encoder,
        }
    }

    /// Enrolls a user's voice from one or more raw WAV uploads.
    ///
    /// Samples that fail feature extraction are skipped (logged); if none
    /// survive the result is `InsufficientEnrollmentData`. The initial
    /// operating point is `threshold = mean(LLR) - 0.5 * std(LLR)` over
    /// the enrollment samples themselves, with the default margin;
    /// offline calibration refines both later.
    pub fn enroll_voice(
        &self,
        user_id: &str,
        samples: &[Vec<u8>],
    ) -> Result<VoiceModel, VerifyError> {
        let mut per_sample: Vec<Vec<Vec<f32>>> = Vec::new();
        let mut usable_bytes: Vec<&[u8]> = Vec::new();
        for (i, bytes) in samples.iter().enumerate() {
            match extract_voice_features(bytes) {
                Ok(frames) => {
                    per_sample.push(frames);
                    usable_bytes.push(bytes);
                }
                Err(e) => {
                    warn!(user = %user_id, sample = i, error = %e, "skipping unusable enrollment sample");
                }
            }
        }
        if per_sample.is_empty() {
            return Err(VerifyError::InsufficientEnrollmentData);
        }

        // Pool all frames, anchored to the UBM's feature space.
        let pooled: Vec<Vec<f32>> = per_sample.iter().flatten().cloned().collect();
        let scaled = self.ubm.scaler.transform(&pooled)?;
        let gmm = DiagGmm::fit(&scaled, &self.gmm_cfg)?;

        // LLR of the user's own enrollment data: speaker minus background.
        let mut llrs = Vec::with_capacity(per_sample.len());
        for frames in &per_sample {
            let scaled = self.ubm.scaler.transform(frames)?;
            let llr = gmm.score(&scaled)? - self.ubm.gmm.score(&scaled)?;
            llrs.push(llr);
        }
        let mean = llrs.iter().sum::<f64>() / llrs.len() as f64;
        let var = llrs.iter().map(|l| (l - mean) * (l - mean)).sum::<f64>() / llrs.len() as f64;
        let threshold = mean - 0.5 * var.sqrt();

        let model = VoiceModel {
            user_id: user_id.to_string(),
            gmm,
            threshold,
            margin: DEFAULT_MARGIN,
            is_trained: true,
        };
        self.store.save_voice_model(&model)?;

        // Retain the raw samples for retraining and offline evaluation.
        for bytes in usable_bytes {
            self.store.add_voice_sample(user_id, bytes)?;
        }

        info!(
            user = %user_id,
            samples = per_sample.len(),
            threshold,
            "voice enrollment complete"
        );
        Ok(model)
    }

    /// Enrolls a user's face from a single uploaded image.
    ///
    /// Only the original crop's embedding becomes the live model; the
    /// augmented variants are persisted separately for retraining and
    /// evaluation. `NoFaceDetected` propagates from the detector.
    pub fn enroll_face(&self, user_id: &str, image_bytes: &[u8]) -> Result<FaceModel, VerifyError> {
        let img = decode_image(image_bytes)?;
        let boxes = self.detector.detect(&img)?;
        let bbox = most_prominent(&boxes)?;
        let crop = crop_face(&img, &bbox);

        let embedding = self.encoder.encode(&crop)?;
        let model = FaceModel {
            user_id: user_id.to_string(),
            embedding,
        };
        self.store.save_face_model(&model)?;
        self.store.save_face_photo(user_id, image_bytes)?;

        for (kind, variant) in augment(&crop) {
            let mut png = Vec::new();
            variant
                .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
                .map_err(examgate_face::FaceError::from)?;
            self.store.save_face_augmented(user_id, kind.as_str(), &png)?;
        }

        info!(user = %user_id, dim = model.embedding.len(), "face enrollment complete");
        Ok(model)
    }
}

/// Runs voice enrollment on the blocking pool so GMM training never
/// stalls concurrent verification traffic.
pub async fn enroll_voice_task(
    enroller: Arc<Enroller>,
    user_id: String,
    samples: Vec<Vec<u8>>,
) -> Result<VoiceModel, VerifyError> {
    tokio::task::spawn_blocking(move || enroller.enroll_voice(&user_id, &samples))
        .await
        .map_err(|e| VerifyError::Background(e.to_string()))?
}
