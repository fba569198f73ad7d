use thiserror::Error;

/// Errors returned by the face pipeline.
#[derive(Debug, Error)]
pub enum FaceError {
    #[error("payload too large: limit {limit} bytes, got {got}")]
    TooLarge { limit: usize, got: usize },

    #[error("undecodable image: {0}")]
    BadImage(String),

    #[error("no face detected")]
    NoFaceDetected,

    #[error("detector error: {0}")]
    Detector(String),

    #[error("encoder error: {0}")]
    Encoder(String),
}

impl From<image::ImageError> for FaceError {
    fn from(e: image::ImageError) -> Self {
        FaceError::BadImage(e.to_string())
    }
}
