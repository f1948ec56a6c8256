use std::time::Duration;

use crate::{resample, AudioError};

/// Mono audio samples in `[-1, 1]` at a fixed sample rate.
///
/// A waveform is immutable once built. Operations that change the signal
/// (resampling, trimming) return a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    /// Creates a waveform from mono samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidSampleRate(sample_rate));
        }
        Ok(Self { samples, sample_rate })
    }

    /// Creates a mono waveform from interleaved multi-channel samples by
    /// averaging the channels of each frame.
    pub fn from_interleaved(
        data: &[f32],
        channels: usize,
        sample_rate: u32,
    ) -> Result<Self, AudioError> {
        if channels == 0 {
            return Err(AudioError::InvalidChannels(channels));
        }
        if channels == 1 {
            return Self::new(data.to_vec(), sample_rate);
        }
        let scale = 1.0 / channels as f32;
        let samples = data
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale)
            .collect();
        Self::new(samples, sample_rate)
    }

    /// Creates a waveform from raw int16 PCM bytes (little-endian, mono).
    pub fn from_pcm16(pcm_bytes: &[u8], sample_rate: u32) -> Result<Self, AudioError> {
        let samples = pcm_bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
            .collect();
        Self::new(samples, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Returns this waveform at `target_rate`, resampling only when the
    /// rates differ.
    pub fn resample(&self, target_rate: u32) -> Result<Waveform, AudioError> {
        if target_rate == self.sample_rate {
            return Ok(self.clone());
        }
        let samples = resample(&self.samples, self.sample_rate, target_rate)?;
        Waveform::new(samples, target_rate)
    }
}
