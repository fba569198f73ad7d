//! WAV decoding, preprocessing, and MFCC feature extraction for voice
//! verification.
//!
//! # Pipeline
//!
//! Raw upload bytes flow through three stages:
//!
//! 1. [`wav::decode`]: RIFF/WAVE container -> interleaved f32 samples
//! 2. [`preprocess`]: resample to 16 kHz, mono mixdown, peak normalize,
//!    pre-emphasis 0.97, 20 dB silence trim, 3 s minimum duration
//! 3. [`mfcc::extract`]: 13 cepstra + Δ + Δ² per 25ms/10ms frame -> 39-dim
//!    frame vectors
//!
//! [`extract_voice_features`] composes the three. Every failure mode is an
//! ordinary [`AudioError`] variant; callers on the login path convert them
//! into retries, never into hard faults.

mod error;
pub mod mfcc;
pub mod preprocess;
pub mod wav;

pub use error::AudioError;
pub use mfcc::{extract as extract_mfcc, MfccConfig, FEATURE_DIM};
pub use preprocess::{preprocess, PreprocessConfig};
pub use wav::{decode as decode_wav, encode_mono16, WavAudio, MAX_WAV_BYTES};

use tracing::debug;

/// Converts raw uploaded WAV bytes into 39-dim MFCC+Δ+Δ² frame features.
///
/// The composed extraction operation used by both enrollment and
/// verification. Fails for non-WAV payloads, oversized uploads, and audio
/// shorter than 3 seconds once silence-trimmed.
pub fn extract_voice_features(bytes: &[u8]) -> Result<Vec<Vec<f32>>, AudioError> {
    let wav = wav::decode(bytes)?;
    let samples = preprocess::preprocess(&wav, &PreprocessConfig::default())?;
    let frames = mfcc::extract(&samples, &MfccConfig::default());
    if frames.is_empty() {
        return Err(AudioError::TooShort {
            min_samples: PreprocessConfig::default().min_samples,
            got: samples.len(),
        });
    }
    debug!(frames = frames.len(), "extracted voice features");
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone_wav(secs: f32) -> Vec<u8> {
        let n = (16000.0 * secs) as usize;
        let samples: Vec<f32> = (0..n)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16000.0).sin())
            .collect();
        encode_mono16(&samples, 16000)
    }

    #[test]
    fn extracts_39_dim_frames() {
        let frames = extract_voice_features(&tone_wav(4.0)).unwrap();
        assert!(!frames.is_empty());
        assert!(frames.iter().all(|f| f.len() == FEATURE_DIM));
    }

    #[test]
    fn rejects_garbage_bytes() {
        assert!(matches!(
            extract_voice_features(b"definitely not a wav"),
            Err(AudioError::NotWav)
        ));
    }

    #[test]
    fn rejects_short_clip() {
        assert!(matches!(
            extract_voice_features(&tone_wav(0.5)),
            Err(AudioError::TooShort { .. })
        ));
    }
}
