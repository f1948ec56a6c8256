use crate::{AudioError, Waveform};

/// A mono audio clip addressed in milliseconds.
///
/// Millisecond positions map to sample indices by truncation
/// (`ms * sample_rate / 1000`), and [`Clip::len_ms`] rounds to the nearest
/// millisecond. Slices past the end are clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Clip {
    /// Creates an empty clip at the given sample rate.
    pub fn empty(sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Clip duration in whole milliseconds.
    pub fn len_ms(&self) -> u64 {
        (self.samples.len() as f64 * 1000.0 / self.sample_rate as f64).round() as u64
    }

    fn index_at(&self, ms: u64) -> usize {
        let idx = (ms as u128 * self.sample_rate as u128 / 1000) as usize;
        idx.min(self.samples.len())
    }

    /// Returns the samples in `[start_ms, end_ms)`.
    pub fn slice_ms(&self, start_ms: u64, end_ms: u64) -> &[f32] {
        let start = self.index_at(start_ms);
        let end = self.index_at(end_ms).max(start);
        &self.samples[start..end]
    }

    /// Returns the samples from `start_ms` to the end of the clip.
    pub fn tail_ms(&self, start_ms: u64) -> &[f32] {
        &self.samples[self.index_at(start_ms)..]
    }

    /// Appends another clip recorded at the same sample rate.
    pub fn append(&mut self, other: &Clip) -> Result<(), AudioError> {
        if other.sample_rate != self.sample_rate {
            return Err(AudioError::SampleRateMismatch {
                expected: self.sample_rate,
                got: other.sample_rate,
            });
        }
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }

    pub(crate) fn extend_samples(&mut self, samples: &[f32]) {
        self.samples.extend_from_slice(samples);
    }

    /// Root-mean-square amplitude of the whole clip.
    pub fn rms(&self) -> f64 {
        rms(&self.samples)
    }

    /// Loudness relative to full scale (1.0). `-inf` for an empty or
    /// all-zero clip.
    pub fn dbfs(&self) -> f64 {
        dbfs(&self.samples)
    }

    pub fn into_waveform(self) -> Result<Waveform, AudioError> {
        Waveform::new(self.samples, self.sample_rate)
    }
}

impl From<&Waveform> for Clip {
    fn from(w: &Waveform) -> Self {
        Self {
            samples: w.samples().to_vec(),
            sample_rate: w.sample_rate(),
        }
    }
}

impl From<Waveform> for Clip {
    fn from(w: Waveform) -> Self {
        let sample_rate = w.sample_rate();
        Self {
            samples: w.into_samples(),
            sample_rate,
        }
    }
}

pub(crate) fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| s as f64 * s as f64).sum();
    (sum / samples.len() as f64).sqrt()
}

pub(crate) fn dbfs(samples: &[f32]) -> f64 {
    let r = rms(samples);
    if r == 0.0 {
        return f64::NEG_INFINITY;
    }
    20.0 * r.log10()
}
