use examgate_face::{classify, crop_face, decode_image, Detection};
use tracing::{debug, warn};

use crate::{Scorer, VerifyError};

/// Outcome of one in-exam proctoring spot check.
///
/// The check never blocks the exam; the caller records the event. Frames
/// with several faces are flagged regardless of whether the dominant face
/// matches: that is the multiplicity signal the extractor surfaces
/// separately from extraction failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ProctorEvent {
    /// The dominant face matches the enrolled user.
    Match { distance: f32 },
    /// A face was found but does not match.
    MissMatch { distance: f32 },
    /// More than one face in frame: suspicious regardless of identity.
    MultipleFaces { count: usize },
    /// The frame could not be checked (no face, bad image, missing model).
    Error { reason: String },
}

impl Scorer {
    /// Periodic identity spot check against the exam-taker's webcam frame.
    pub fn proctor_check(&self, user_id: &str, frame_bytes: &[u8]) -> ProctorEvent {
        match self.proctor_inner(user_id, frame_bytes) {
            Ok(event) => event,
            Err(e) => {
                warn!(user = %user_id, error = %e, "proctor check failed");
                ProctorEvent::Error {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn proctor_inner(&self, user_id: &str, frame_bytes: &[u8]) -> Result<ProctorEvent, VerifyError> {
        let model = self.store().load_face_model(user_id)?.ok_or_else(|| {
            VerifyError::ModelNotTrained {
                user_id: user_id.to_string(),
            }
        })?;

        let img = decode_image(frame_bytes)?;
        let boxes = self.detector().detect(&img)?;
        let detection = classify(boxes);
        let event = match detection {
            Detection::None => ProctorEvent::Error {
                reason: "no face detected".to_string(),
            },
            Detection::Multiple(boxes) => ProctorEvent::MultipleFaces { count: boxes.len() },
            Detection::One(bbox) => {
                let crop = crop_face(&img, &bbox);
                let live = self.encoder().encode(&crop)?;
                let distance = examgate_face::euclidean_distance(&live, &model.embedding);
                if distance <= self.config().face_threshold {
                    ProctorEvent::Match { distance }
                } else {
                    ProctorEvent::MissMatch { distance }
                }
            }
        };
        debug!(user = %user_id, ?event, "proctor check");
        Ok(event)
    }
}
