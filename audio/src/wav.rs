use crate::AudioError;

/// Upload ceiling for raw audio payloads (5 MB).
pub const MAX_WAV_BYTES: usize = 5 * 1024 * 1024;

/// Decoded WAV audio: interleaved f32 samples in [-1, 1].
#[derive(Debug, Clone)]
pub struct WavAudio {
    /// Source sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count (1 or 2).
    pub channels: u16,
    /// Interleaved samples.
    pub samples: Vec<f32>,
}

impl WavAudio {
    /// Number of per-channel frames.
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }
}

/// Parses a RIFF/WAVE container holding PCM16 audio.
///
/// Layout, all little-endian:
///
/// ```text
/// [4B "RIFF"] [4B riff size] [4B "WAVE"]
/// Then a sequence of chunks: [4B id] [4B size] [size bytes, padded to even]
///   "fmt " -> [2B format tag] [2B channels] [4B sample rate]
///             [4B byte rate] [2B block align] [2B bits per sample] ...
///   "data" -> PCM16 interleaved samples
/// ```
///
/// Only format tag 1 (integer PCM) at 16 bits is accepted; anything else
/// is `UnsupportedFormat`. Non-RIFF payloads are `NotWav`. Payloads over
/// [`MAX_WAV_BYTES`] are rejected before parsing.
pub fn decode(bytes: &[u8]) -> Result<WavAudio, AudioError> {
    if bytes.len() > MAX_WAV_BYTES {
        return Err(AudioError::TooLarge {
            limit: MAX_WAV_BYTES,
            got: bytes.len(),
        });
    }
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(AudioError::NotWav);
    }

    let mut fmt: Option<(u16, u16, u32, u16)> = None;
    let mut data: Option<&[u8]> = None;

    let mut pos = 12usize;
    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let size = u32::from_le_bytes([
            bytes[pos + 4],
            bytes[pos + 5],
            bytes[pos + 6],
            bytes[pos + 7],
        ]) as usize;
        pos += 8;
        if pos + size > bytes.len() {
            return Err(AudioError::Truncated("chunk body past end of payload"));
        }
        let body = &bytes[pos..pos + size];

        match id {
            b"fmt " => {
                if size < 16 {
                    return Err(AudioError::Truncated("fmt chunk under 16 bytes"));
                }
                let format_tag = u16::from_le_bytes([body[0], body[1]]);
                let channels = u16::from_le_bytes([body[2], body[3]]);
                let sample_rate = u32::from_le_bytes([body[4], body[5], body[6], body[7]]);
                let bits = u16::from_le_bytes([body[14], body[15]]);
                fmt = Some((format_tag, channels, sample_rate, bits));
            }
            b"data" => {
                data = Some(body);
            }
            _ => {}
        }

        // Chunk bodies are padded to even length.
        pos += size + (size & 1);
    }

    let (format_tag, channels, sample_rate, bits) = fmt.ok_or(AudioError::Truncated("missing fmt chunk"))?;
    let data = data.ok_or(AudioError::Truncated("missing data chunk"))?;

    if format_tag != 1 || bits != 16 {
        return Err(AudioError::UnsupportedFormat { format_tag, bits });
    }
    if channels == 0 || channels > 2 || sample_rate == 0 {
        return Err(AudioError::UnsupportedFormat { format_tag, bits });
    }
    if data.is_empty() {
        return Err(AudioError::Empty);
    }

    let n_samples = data.len() / 2;
    let mut samples = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        let s = i16::from_le_bytes([data[2 * i], data[2 * i + 1]]);
        samples.push(s as f32 / 32768.0);
    }

    Ok(WavAudio {
        sample_rate,
        channels,
        samples,
    })
}

/// Encodes PCM16 mono WAV bytes from f32 samples. Test/tooling helper for
/// writing retained enrollment samples back out.
pub fn encode_mono16(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let data_len = samples.len() * 2;
    let mut out = Vec::with_capacity(44 + data_len);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&((36 + data_len) as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(data_len as u32).to_le_bytes());
    for &s in samples {
        let v = (s * 32767.0).clamp(-32768.0, 32767.0) as i16;
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}
