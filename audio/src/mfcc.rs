use std::f64::consts::PI;

/// Configures MFCC extraction.
///
/// Defaults assume the preprocessed 16 kHz mono signal: 25ms frames,
/// 10ms shift, 40 mel bins reduced to 13 cepstra, regression deltas over
/// a 9-frame window.
#[derive(Debug, Clone)]
pub struct MfccConfig {
    /// Input sample rate in Hz (default: 16000).
    pub sample_rate: usize,
    /// Frame length in samples (default: 400 = 25ms @ 16kHz).
    pub frame_length: usize,
    /// Frame shift in samples (default: 160 = 10ms @ 16kHz).
    pub frame_shift: usize,
    /// Number of mel filterbank channels (default: 40).
    pub num_mels: usize,
    /// Number of cepstral coefficients kept after the DCT (default: 13).
    pub num_ceps: usize,
    /// Low cutoff frequency for mel bins (default: 20 Hz).
    pub low_freq: f64,
    /// High cutoff frequency, negative = offset from Nyquist (default: -400).
    pub high_freq: f64,
    /// Floor for log energy (default: 1e-10).
    pub energy_floor: f64,
    /// Regression window width for delta features, odd (default: 9).
    pub delta_width: usize,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            frame_length: 400,
            frame_shift: 160,
            num_mels: 40,
            num_ceps: 13,
            low_freq: 20.0,
            high_freq: -400.0,
            energy_floor: 1e-10,
            delta_width: 9,
        }
    }
}

/// Dimension of the full feature vector: cepstra + Δ + Δ².
pub const FEATURE_DIM: usize = 39;

/// Computes MFCC frames with first and second regression deltas appended.
///
/// Input is the preprocessed mono f32 signal (already pre-emphasized and
/// trimmed). Output is `[num_frames][3 * num_ceps]`. Returns an empty vec
/// if the signal is too short for a single frame.
pub fn extract(samples: &[f32], cfg: &MfccConfig) -> Vec<Vec<f32>> {
    let base = mfcc_frames(samples, cfg);
    if base.is_empty() {
        return base;
    }
    let d1 = deltas(&base, cfg.delta_width);
    let d2 = deltas(&d1, cfg.delta_width);

    base.into_iter()
        .zip(d1)
        .zip(d2)
        .map(|((mut f, d1), d2)| {
            f.extend(d1);
            f.extend(d2);
            f
        })
        .collect()
}

/// Computes the static cepstra: window -> FFT power -> mel -> log -> DCT.
fn mfcc_frames(samples: &[f32], cfg: &MfccConfig) -> Vec<Vec<f32>> {
    if cfg.frame_length == 0 || cfg.frame_shift == 0 || samples.len() < cfg.frame_length {
        return Vec::new();
    }
    let num_frames = (samples.len() - cfg.frame_length) / cfg.frame_shift + 1;

    let fft_size = next_pow2(cfg.frame_length);
    let window = povey_window(cfg.frame_length);

    let high_freq = if cfg.high_freq <= 0.0 {
        cfg.sample_rate as f64 / 2.0 + cfg.high_freq
    } else {
        cfg.high_freq
    };
    let filterbank = mel_filterbank(cfg.num_mels, fft_size, cfg.sample_rate, cfg.low_freq, high_freq);
    let dct = dct_matrix(cfg.num_ceps, cfg.num_mels);

    let mut result = Vec::with_capacity(num_frames);
    let mut fft_buf = vec![(0.0f64, 0.0f64); fft_size];

    for f in 0..num_frames {
        let offset = f * cfg.frame_shift;
        let frame = &samples[offset..offset + cfg.frame_length];

        for v in &mut fft_buf {
            *v = (0.0, 0.0);
        }
        for i in 0..cfg.frame_length {
            fft_buf[i] = (frame[i] as f64 * window[i], 0.0);
        }
        fft(&mut fft_buf);

        let mut log_mel = vec![0.0f64; cfg.num_mels];
        for m in 0..cfg.num_mels {
            let mut energy: f64 = 0.0;
            for (k, &w) in filterbank[m].iter().enumerate() {
                let (re, im) = fft_buf[k];
                energy += w * (re * re + im * im);
            }
            log_mel[m] = energy.max(cfg.energy_floor).ln();
        }

        let mut ceps = vec![0.0f32; cfg.num_ceps];
        for c in 0..cfg.num_ceps {
            let mut acc = 0.0f64;
            for m in 0..cfg.num_mels {
                acc += dct[c][m] * log_mel[m];
            }
            ceps[c] = acc as f32;
        }
        result.push(ceps);
    }
    result
}

/// Regression deltas over a centered window, edge frames replicated.
///
/// `d[t] = Σ_n n·(x[t+n] − x[t−n]) / (2·Σ_n n²)` for n in 1..=half.
fn deltas(frames: &[Vec<f32>], width: usize) -> Vec<Vec<f32>> {
    let t_max = frames.len();
    let dim = frames[0].len();
    let half = (width.max(3) / 2).max(1);
    let denom: f64 = 2.0 * (1..=half).map(|n| (n * n) as f64).sum::<f64>();

    let clamp = |t: isize| -> usize { t.clamp(0, t_max as isize - 1) as usize };

    let mut out = Vec::with_capacity(t_max);
    for t in 0..t_max as isize {
        let mut d = vec![0.0f32; dim];
        for n in 1..=half as isize {
            let fwd = &frames[clamp(t + n)];
            let back = &frames[clamp(t - n)];
            for k in 0..dim {
                d[k] += (n as f64 * (fwd[k] as f64 - back[k] as f64) / denom) as f32;
            }
        }
        out.push(d);
    }
    out
}

fn next_pow2(n: usize) -> usize {
    let mut p = 1;
    while p < n {
        p <<= 1;
    }
    p
}

fn hamming_window(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (n - 1) as f64).cos())
        .collect()
}

/// Povey window (hamming^0.85) used by Kaldi.
fn povey_window(n: usize) -> Vec<f64> {
    hamming_window(n).into_iter().map(|w| w.powf(0.85)).collect()
}

fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10.0_f64.powf(mel / 2595.0) - 1.0)
}

/// Computes triangular mel filterbank weights, `[num_mels][half_fft]`.
fn mel_filterbank(
    num_mels: usize,
    fft_size: usize,
    sample_rate: usize,
    low_freq: f64,
    high_freq: f64,
) -> Vec<Vec<f64>> {
    let half_fft = fft_size / 2 + 1;
    let mel_low = hz_to_mel(low_freq);
    let mel_high = hz_to_mel(high_freq);

    let mel_points: Vec<f64> = (0..num_mels + 2)
        .map(|i| mel_low + i as f64 * (mel_high - mel_low) / (num_mels + 1) as f64)
        .collect();

    let bin_indices: Vec<usize> = mel_points
        .iter()
        .map(|&m| {
            let hz = mel_to_hz(m);
            let bin = (hz * fft_size as f64 / sample_rate as f64).floor() as isize;
            bin.max(0).min(half_fft as isize - 1) as usize
        })
        .collect();

    let mut fb = Vec::with_capacity(num_mels);
    for m in 0..num_mels {
        let mut filter = vec![0.0f64; half_fft];
        let left = bin_indices[m];
        let center = bin_indices[m + 1];
        let right = bin_indices[m + 2];

        if center > left {
            for k in left..=center {
                filter[k] = (k - left) as f64 / (center - left) as f64;
            }
        }
        if right > center {
            for k in center..=right {
                filter[k] = (right - k) as f64 / (right - center) as f64;
            }
        }
        fb.push(filter);
    }
    fb
}

/// Orthonormal DCT-II rows, `[num_ceps][num_mels]`.
fn dct_matrix(num_ceps: usize, num_mels: usize) -> Vec<Vec<f64>> {
    let mut dct = Vec::with_capacity(num_ceps);
    let norm0 = (1.0 / num_mels as f64).sqrt();
    let norm = (2.0 / num_mels as f64).sqrt();
    for c in 0..num_ceps {
        let mut row = Vec::with_capacity(num_mels);
        for m in 0..num_mels {
            let v = (PI * c as f64 * (m as f64 + 0.5) / num_mels as f64).cos();
            row.push(if c == 0 { v * norm0 } else { v * norm });
        }
        dct.push(row);
    }
    dct
}

/// In-place Cooley-Tukey FFT over (real, imag) tuples.
/// Input length must be a power of 2.
fn fft(x: &mut [(f64, f64)]) {
    let n = x.len();
    if n <= 1 {
        return;
    }

    // Bit-reversal permutation.
    let mut j = 0usize;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j ^= bit;
        if i < j {
            x.swap(i, j);
        }
    }

    // Butterfly operations.
    let mut size = 2;
    while size <= n {
        let half = size / 2;
        let angle = -2.0 * PI / size as f64;
        let wn = (angle.cos(), angle.sin());
        let mut start = 0;
        while start < n {
            let mut w = (1.0, 0.0);
            for k in 0..half {
                let u = x[start + k];
                let t_re = w.0 * x[start + k + half].0 - w.1 * x[start + k + half].1;
                let t_im = w.0 * x[start + k + half].1 + w.1 * x[start + k + half].0;
                x[start + k] = (u.0 + t_re, u.1 + t_im);
                x[start + k + half] = (u.0 - t_re, u.1 - t_im);
                let new_w_re = w.0 * wn.0 - w.1 * wn.1;
                let new_w_im = w.0 * wn.1 + w.1 * wn.0;
                w = (new_w_re, new_w_im);
            }
            start += size;
        }
        size <<= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / 16000.0).sin() * 0.5)
            .collect()
    }

    #[test]
    fn extract_dimensions() {
        let cfg = MfccConfig::default();
        // 1 second @ 16 kHz -> (16000 - 400) / 160 + 1 = 98 frames.
        let features = extract(&tone(440.0, 16000), &cfg);
        assert_eq!(features.len(), 98);
        assert_eq!(features[0].len(), FEATURE_DIM);
    }

    #[test]
    fn extract_too_short_is_empty() {
        let cfg = MfccConfig::default();
        assert!(extract(&tone(440.0, 100), &cfg).is_empty());
    }

    #[test]
    fn different_tones_differ() {
        let cfg = MfccConfig::default();
        let a = extract(&tone(200.0, 16000), &cfg);
        let b = extract(&tone(2000.0, 16000), &cfg);
        let dist: f32 = a[10]
            .iter()
            .take(13)
            .zip(b[10].iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt();
        assert!(dist > 1.0, "distinct tones should yield distinct cepstra: {dist}");
    }

    #[test]
    fn deltas_of_constant_are_zero() {
        let frames = vec![vec![1.0f32, -2.0, 3.0]; 20];
        let d = deltas(&frames, 9);
        for f in d {
            for v in f {
                assert!(v.abs() < 1e-6);
            }
        }
    }

    #[test]
    fn deltas_of_ramp_are_constant_slope() {
        // x[t] = t  ->  d[t] = 1 in the interior.
        let frames: Vec<Vec<f32>> = (0..30).map(|t| vec![t as f32]).collect();
        let d = deltas(&frames, 9);
        for t in 4..26 {
            assert!((d[t][0] - 1.0).abs() < 1e-4, "slope at {t}: {}", d[t][0]);
        }
    }

    #[test]
    fn dct_matrix_rows_orthonormal() {
        let dct = dct_matrix(13, 40);
        for a in 0..13 {
            for b in 0..13 {
                let dot: f64 = (0..40).map(|m| dct[a][m] * dct[b][m]).sum();
                let expect = if a == b { 1.0 } else { 0.0 };
                assert!((dot - expect).abs() < 1e-9, "rows {a},{b}: {dot}");
            }
        }
    }

    #[test]
    fn fft_impulse_is_flat() {
        let mut buf = vec![(1.0, 0.0), (0.0, 0.0), (0.0, 0.0), (0.0, 0.0)];
        fft(&mut buf);
        for (re, im) in &buf {
            assert!((re - 1.0).abs() < 1e-10);
            assert!(im.abs() < 1e-10);
        }
    }

    #[test]
    fn mel_hz_roundtrip() {
        for &hz in &[0.0, 100.0, 440.0, 1000.0, 8000.0] {
            let back = mel_to_hz(hz_to_mel(hz));
            assert!((hz - back).abs() < 1e-6);
        }
    }
}
