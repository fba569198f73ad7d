use thiserror::Error;

/// Errors returned by enrollment, scoring, and calibration.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Audio(#[from] examgate_audio::AudioError),

    #[error(transparent)]
    Face(#[from] examgate_face::FaceError),

    #[error(transparent)]
    Model(#[from] examgate_gmm::GmmError),

    #[error(transparent)]
    Store(#[from] examgate_store::StoreError),

    #[error("insufficient enrollment data: no usable samples")]
    InsufficientEnrollmentData,

    #[error("no trained model for user {user_id}")]
    ModelNotTrained { user_id: String },

    #[error("calibration needs non-empty positive and negative score sets")]
    EmptyScores,

    #[error("background task failed: {0}")]
    Background(String),
}
