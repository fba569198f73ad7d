use std::sync::Arc;

use examgate_audio::extract_voice_features;
use examgate_face::{
    crop_face, decode_image, euclidean_distance, most_prominent, FaceDetector, FaceEncoder,
};
use examgate_gmm::Ubm;
use examgate_store::{ModelStore, VoiceModel};
use tracing::{debug, info};

use crate::VerifyError;

/// Default acceptance boundary on face embedding distance. Encoders
/// L2-normalize their output, so genuine pairs land well under 1.0.
pub const DEFAULT_FACE_THRESHOLD: f32 = 0.9;

/// Configures the verification scorer.
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    /// Face accepts when the embedding distance is at or below this.
    pub face_threshold: f32,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            face_threshold: DEFAULT_FACE_THRESHOLD,
        }
    }
}

/// Accept/reject decision plus the continuous score behind it.
///
/// For voice the score is the log-likelihood ratio (higher = more like the
/// speaker); for face it is the embedding distance (lower = more similar).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub accepted: bool,
    pub score: f64,
}

/// Log-likelihood ratio of a live WAV sample under a specific model:
/// `llr = speaker_score - background_score` over the same UBM-scaled
/// frames. The operand order is load-bearing: flipping it inverts every
/// accept/reject decision.
pub fn voice_llr(ubm: &Ubm, model: &VoiceModel, wav_bytes: &[u8]) -> Result<f64, VerifyError> {
    let frames = extract_voice_features(wav_bytes)?;
    let scaled = ubm.scaler.transform(&frames)?;
    let llr = model.gmm.score(&scaled)? - ubm.gmm.score(&scaled)?;
    Ok(llr)
}

/// Scores live samples against stored models. Stateless between calls;
/// retry budgets live in the session gate, not here.
pub struct Scorer {
    store: ModelStore,
    ubm: Arc<Ubm>,
    detector: Arc<dyn FaceDetector>,
    encoder: Arc<dyn FaceEncoder>,
    cfg: ScorerConfig,
}

impl Scorer {
    pub fn new(
        store: ModelStore,
        ubm: Arc<Ubm>,
        detector: Arc<dyn FaceDetector>,
        encoder: Arc<dyn FaceEncoder>,
        cfg: ScorerConfig,
    ) -> Self {
        Self {
            store,
            ubm,
            detector,
            encoder,
            cfg,
        }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.cfg
    }

    pub(crate) fn store(&self) -> &ModelStore {
        &self.store
    }

    pub(crate) fn detector(&self) -> &dyn FaceDetector {
        self.detector.as_ref()
    }

    pub(crate) fn encoder(&self) -> &dyn FaceEncoder {
        self.encoder.as_ref()
    }

    /// Log-likelihood ratio of a live WAV sample under a specific model.
    pub fn voice_llr(&self, model: &VoiceModel, wav_bytes: &[u8]) -> Result<f64, VerifyError> {
        voice_llr(&self.ubm, model, wav_bytes)
    }

    /// Verifies a live voice sample for a user.
    ///
    /// Accepts iff `llr > threshold - margin` (strictly). A user without a
    /// trained model yields `ModelNotTrained` so the gate can apply its
    /// bypass rule instead of guessing.
    pub fn verify_voice(&self, user_id: &str, wav_bytes: &[u8]) -> Result<Decision, VerifyError> {
        let model = self
            .store
            .load_voice_model(user_id)?
            .filter(|m| m.is_trained)
            .ok_or_else(|| VerifyError::ModelNotTrained {
                user_id: user_id.to_string(),
            })?;

        let llr = self.voice_llr(&model, wav_bytes)?;
        let accepted = llr > model.effective_threshold();
        info!(
            user = %user_id,
            llr,
            threshold = model.threshold,
            margin = model.margin,
            accepted,
            "voice verification"
        );
        Ok(Decision {
            accepted,
            score: llr,
        })
    }

    /// Embedding distance of a live image against a stored embedding.
    pub fn face_distance(
        &self,
        stored: &[f32],
        image_bytes: &[u8],
    ) -> Result<f32, VerifyError> {
        let img = decode_image(image_bytes)?;
        let boxes = self.detector.detect(&img)?;
        let bbox = most_prominent(&boxes)?;
        let crop = crop_face(&img, &bbox);
        let live = self.encoder.encode(&crop)?;
        Ok(euclidean_distance(&live, stored))
    }

    /// Verifies a live face image for a user.
    ///
    /// Accepts iff `distance <= face_threshold` (non-strict): the inverse
    /// polarity of the voice rule, and the opposite boundary inclusivity.
    pub fn verify_face(&self, user_id: &str, image_bytes: &[u8]) -> Result<Decision, VerifyError> {
        let model = self.store.load_face_model(user_id)?.ok_or_else(|| {
            VerifyError::ModelNotTrained {
                user_id: user_id.to_string(),
            }
        })?;

        let distance = self.face_distance(&model.embedding, image_bytes)?;
        let accepted = distance <= self.cfg.face_threshold;
        info!(
            user = %user_id,
            distance,
            threshold = self.cfg.face_threshold,
            accepted,
            "face verification"
        );
        Ok(Decision {
            accepted,
            score: distance as f64,
        })
    }

    /// True when the user has a trained voice model.
    pub fn has_voice_model(&self, user_id: &str) -> Result<bool, VerifyError> {
        Ok(self
            .store
            .load_voice_model(user_id)?
            .is_some_and(|m| m.is_trained))
    }

    /// True when the user has an enrolled face model.
    pub fn has_face_model(&self, user_id: &str) -> Result<bool, VerifyError> {
        let present = self.store.load_face_model(user_id)?.is_some();
        debug!(user = %user_id, present, "face model lookup");
        Ok(present)
    }
}
