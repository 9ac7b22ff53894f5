//! 16-bit PCM encoding and decoding.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;

/// Base64 audio ready to send on the realtime session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    pub mime_type: String,
    pub data: String,
}

impl AudioChunk {
    /// Encode mono `f32` samples in `[-1.0, 1.0]` as little-endian 16-bit PCM.
    pub fn from_samples(samples: &[f32], sample_rate: u32) -> Self {
        Self {
            mime_type: pcm_mime_type(sample_rate),
            data: B64.encode(encode_le16(samples)),
        }
    }
}

/// Decoded synthesized speech.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFragment {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl AudioFragment {
    /// Decode base64 little-endian 16-bit PCM.
    pub fn from_base64(data: &str, sample_rate: u32) -> Result<Self, base64::DecodeError> {
        let bytes = B64.decode(data)?;
        Ok(Self {
            samples: decode_le16(&bytes),
            sample_rate,
        })
    }

    /// Playback length in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

/// `audio/pcm;rate=N`.
pub fn pcm_mime_type(sample_rate: u32) -> String {
    format!("audio/pcm;rate={sample_rate}")
}

/// Extract the rate from an `audio/pcm;rate=N` mime type.
pub fn rate_from_mime(mime_type: &str) -> Option<u32> {
    mime_type
        .split(';')
        .filter_map(|part| part.trim().strip_prefix("rate="))
        .find_map(|rate| rate.parse().ok())
}

/// Convert float samples to clamped little-endian `i16` bytes.
pub fn encode_le16(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let scaled = (sample.clamp(-1.0, 1.0) * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32);
        out.extend_from_slice(&(scaled as i16).to_le_bytes());
    }
    out
}

/// Convert little-endian `i16` bytes to samples. A trailing odd byte is dropped.
pub fn decode_le16(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_scale_is_clamped() {
        let bytes = encode_le16(&[1.0, -1.0, 2.5, 0.0]);
        let samples = decode_le16(&bytes);
        assert_eq!(samples, vec![i16::MAX, i16::MIN, i16::MAX, 0]);
    }

    #[test]
    fn chunk_carries_rate() {
        let chunk = AudioChunk::from_samples(&[0.0; 4], 16_000);
        assert_eq!(chunk.mime_type, "audio/pcm;rate=16000");
        assert_eq!(B64.decode(&chunk.data).unwrap().len(), 8);
    }

    #[test]
    fn fragment_duration() {
        let data = B64.encode(vec![0u8; 24_000 * 2]);
        let fragment = AudioFragment::from_base64(&data, 24_000).unwrap();
        assert_eq!(fragment.samples.len(), 24_000);
        assert!((fragment.duration() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn odd_trailing_byte_dropped() {
        assert_eq!(decode_le16(&[0x01, 0x00, 0x7f]), vec![1]);
    }

    #[test]
    fn rate_parsing() {
        assert_eq!(rate_from_mime("audio/pcm;rate=24000"), Some(24_000));
        assert_eq!(rate_from_mime("audio/pcm; rate=16000"), Some(16_000));
        assert_eq!(rate_from_mime("audio/pcm"), None);
    }
}
