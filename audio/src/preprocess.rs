use rubato::{FftFixedInOut, Resampler};

use crate::wav::WavAudio;
use crate::AudioError;

/// Configures the preprocessing chain applied before feature extraction.
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Target sample rate in Hz (default: 16000).
    pub target_rate: u32,
    /// Pre-emphasis coefficient (default: 0.97).
    pub pre_emphasis: f32,
    /// Silence trim threshold in dB below the peak frame RMS (default: 20).
    pub trim_db: f32,
    /// Minimum retained duration in samples at the target rate
    /// (default: 48000 = 3 s @ 16 kHz).
    pub min_samples: usize,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            target_rate: 16000,
            pre_emphasis: 0.97,
            trim_db: 20.0,
            min_samples: 48_000,
        }
    }
}

/// Runs the full preprocessing chain: resample to the target rate, mix to
/// mono, peak-normalize, pre-emphasize, trim leading/trailing silence.
///
/// Fails `Empty` for zero decoded samples and `TooShort` when less than
/// the minimum duration survives the trim.
pub fn preprocess(wav: &WavAudio, cfg: &PreprocessConfig) -> Result<Vec<f32>, AudioError> {
    if wav.samples.is_empty() {
        return Err(AudioError::Empty);
    }

    let mono = mix_to_mono(&wav.samples, wav.channels);
    let mut y = if wav.sample_rate == cfg.target_rate {
        mono
    } else {
        resample(&mono, wav.sample_rate, cfg.target_rate)?
    };
    if y.is_empty() {
        return Err(AudioError::Empty);
    }

    normalize_peak(&mut y);
    pre_emphasize(&mut y, cfg.pre_emphasis);
    let y = trim_silence(&y, cfg.trim_db);

    if y.len() < cfg.min_samples {
        return Err(AudioError::TooShort {
            min_samples: cfg.min_samples,
            got: y.len(),
        });
    }
    Ok(y)
}

/// Averages interleaved channels into a mono signal.
fn mix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let ch = channels as usize;
    samples
        .chunks_exact(ch)
        .map(|frame| frame.iter().sum::<f32>() / ch as f32)
        .collect()
}

/// One-shot FFT resample of a mono buffer.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, AudioError> {
    let chunk_size = 1024;
    let mut resampler =
        FftFixedInOut::<f32>::new(from_rate as usize, to_rate as usize, chunk_size, 1)?;

    let expected = (samples.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    let mut out = Vec::with_capacity(expected + chunk_size);

    let mut pos = 0usize;
    // The final block is zero-padded; output is trimmed to the expected
    // length below.
    while pos < samples.len() {
        let needed = resampler.input_frames_next();
        let mut block = vec![0.0f32; needed];
        let take = needed.min(samples.len() - pos);
        block[..take].copy_from_slice(&samples[pos..pos + take]);
        pos += take;

        let processed = resampler.process(&[block], None)?;
        out.extend_from_slice(&processed[0]);
    }

    out.truncate(expected);
    Ok(out)
}

/// Scales the signal so the peak magnitude is 1.
fn normalize_peak(y: &mut [f32]) {
    let peak = y.iter().fold(0.0f32, |acc, &v| acc.max(v.abs()));
    let scale = 1.0 / (peak + 1e-9);
    for v in y.iter_mut() {
        *v *= scale;
    }
}

/// First-order high-pass: y[t] -= coef * y[t-1].
fn pre_emphasize(y: &mut [f32], coef: f32) {
    if coef <= 0.0 {
        return;
    }
    for i in (1..y.len()).rev() {
        y[i] -= coef * y[i - 1];
    }
    y[0] *= 1.0 - coef;
}

/// Window size for silence-trim RMS measurement.
const TRIM_FRAME: usize = 2048;
/// Hop between RMS measurements.
const TRIM_HOP: usize = 512;

/// Drops leading and trailing frames whose RMS sits more than `trim_db`
/// below the loudest frame.
fn trim_silence(y: &[f32], trim_db: f32) -> Vec<f32> {
    if y.len() < TRIM_FRAME {
        return y.to_vec();
    }

    let mut rms = Vec::new();
    let mut start = 0;
    while start + TRIM_FRAME <= y.len() {
        let frame = &y[start..start + TRIM_FRAME];
        let energy: f32 = frame.iter().map(|&v| v * v).sum::<f32>() / TRIM_FRAME as f32;
        rms.push(energy.sqrt());
        start += TRIM_HOP;
    }
    let peak = rms.iter().cloned().fold(0.0f32, f32::max);
    if peak <= 0.0 {
        return Vec::new();
    }
    let threshold = peak * 10.0f32.powf(-trim_db / 20.0);

    let first = rms.iter().position(|&r| r >= threshold);
    let last = rms.iter().rposition(|&r| r >= threshold);
    match (first, last) {
        (Some(f), Some(l)) => {
            let begin = f * TRIM_HOP;
            let end = (l * TRIM_HOP + TRIM_FRAME).min(y.len());
            y[begin..end].to_vec()
        }
        _ => Vec::new(),
    }
}
