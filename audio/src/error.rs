use thiserror::Error;

/// Errors returned by audio decoding and feature extraction.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("payload too large: limit {limit} bytes, got {got}")]
    TooLarge { limit: usize, got: usize },

    #[error("not a WAV file")]
    NotWav,

    #[error("unsupported WAV encoding: format tag {format_tag}, {bits} bits")]
    UnsupportedFormat { format_tag: u16, bits: u16 },

    #[error("truncated WAV: {0}")]
    Truncated(&'static str),

    #[error("decoded audio is empty")]
    Empty,

    #[error("audio too short after silence trim: need {min_samples} samples at 16 kHz, got {got}")]
    TooShort { min_samples: usize, got: usize },

    #[error("resample error: {0}")]
    Resample(String),
}

impl From<rubato::ResamplerConstructionError> for AudioError {
    fn from(e: rubato::ResamplerConstructionError) -> Self {
        AudioError::Resample(e.to_string())
    }
}

impl From<rubato::ResampleError> for AudioError {
    fn from(e: rubato::ResampleError) -> Self {
        AudioError::Resample(e.to_string())
    }
}
