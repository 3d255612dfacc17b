//! Linear-PCM decoding for narrated audio.
//!
//! The speech endpoint returns raw 16-bit little-endian samples; each one maps
//! to `i16 / 32768.0`, so the mapping is exact and deterministic.

use base64::Engine as _;
use thiserror::Error;

/// Sample rate of narration audio returned by the speech endpoint.
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;
pub const SPEECH_CHANNELS: usize = 1;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AudioError {
  #[error("no audio data received")]
  Empty,
  #[error("channel count must be at least 1")]
  NoChannels,
  #[error("PCM payload of {len} bytes is not a whole number of {frame}-byte frames")]
  Misaligned { len: usize, frame: usize },
  #[error("invalid base64 audio: {0}")]
  Base64(String),
}

/// Decoded audio: one `Vec<f32>` per channel, samples in [-1.0, 1.0).
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
  sample_rate: u32,
  channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
  /// Decode interleaved 16-bit LE PCM.
  pub fn from_pcm16le(bytes: &[u8], sample_rate: u32, channels: usize) -> Result<Self, AudioError> {
    if channels == 0 {
      return Err(AudioError::NoChannels);
    }
    if bytes.is_empty() {
      return Err(AudioError::Empty);
    }
    let frame = 2 * channels;
    if bytes.len() % frame != 0 {
      return Err(AudioError::Misaligned { len: bytes.len(), frame });
    }

    let frames = bytes.len() / frame;
    let mut data = vec![Vec::with_capacity(frames); channels];
    for (i, pair) in bytes.chunks_exact(2).enumerate() {
      let sample = i16::from_le_bytes([pair[0], pair[1]]);
      data[i % channels].push(sample as f32 / 32768.0);
    }
    Ok(Self { sample_rate, channels: data })
  }

  pub fn sample_rate(&self) -> u32 { self.sample_rate }
  pub fn channel_count(&self) -> usize { self.channels.len() }
  pub fn channel(&self, index: usize) -> Option<&[f32]> { self.channels.get(index).map(Vec::as_slice) }

  pub fn frames(&self) -> usize {
    self.channel(0).map(<[f32]>::len).unwrap_or(0)
  }

  pub fn duration_ms(&self) -> u64 {
    if self.sample_rate == 0 {
      return 0;
    }
    self.frames() as u64 * 1000 / self.sample_rate as u64
  }

  /// Re-encode to 16-bit LE PCM (inverse of `from_pcm16le` for decoded data).
  pub fn to_pcm16le(&self) -> Vec<u8> {
    let mut out = Vec::with_capacity(self.frames() * self.channel_count() * 2);
    for i in 0..self.frames() {
      for ch in &self.channels {
        let s = (ch[i] * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        out.extend_from_slice(&s.to_le_bytes());
      }
    }
    out
  }
}

/// Decode an inline base64 PCM payload (audio-capable chat models return one).
pub fn decode_base64_pcm(b64: &str, sample_rate: u32, channels: usize) -> Result<AudioBuffer, AudioError> {
  let bytes = base64::engine::general_purpose::STANDARD
    .decode(b64.trim())
    .map_err(|e| AudioError::Base64(e.to_string()))?;
  AudioBuffer::from_pcm16le(&bytes, sample_rate, channels)
}

pub fn encode_base64(bytes: &[u8]) -> String {
  base64::engine::general_purpose::STANDARD.encode(bytes)
}
