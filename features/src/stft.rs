//! Framing and short-time spectra.

use deepvoice_audio::Waveform;
use tracing::debug;

use crate::config::FrameConfig;
use crate::fft::fft;
use crate::window::{pad_center, periodic_hann};
use crate::FeatureError;

/// Number of frames a signal of `len` samples yields.
///
/// `floor((len - frame_len) / hop) + 1`, or `TooShort` when not even one
/// frame fits.
pub fn frame_count(len: usize, frame_len: usize, hop: usize) -> Result<usize, FeatureError> {
    if hop == 0 {
        return Err(FeatureError::InvalidConfig("hop must be at least one sample".into()));
    }
    if len < frame_len || len == 0 {
        return Err(FeatureError::TooShort {
            needed: frame_len.max(1),
            got: len,
        });
    }
    Ok((len - frame_len) / hop + 1)
}

/// Validates the frame config and brings the waveform to the target rate.
pub(crate) fn prepare(wave: &Waveform, frame: &FrameConfig) -> Result<Vec<f64>, FeatureError> {
    frame.validate()?;
    if wave.is_empty() {
        return Err(FeatureError::EmptyWaveform);
    }
    let target = frame.target_sample_rate;
    let samples = if wave.sample_rate() != target {
        debug!(from = wave.sample_rate(), to = target, "resampling");
        wave.resample(target)?.into_samples()
    } else {
        wave.samples().to_vec()
    };
    Ok(samples.into_iter().map(f64::from).collect())
}

/// Mirrors `pad` samples on each side, excluding the edge sample itself.
pub(crate) fn reflect_pad(signal: &[f64], pad: usize) -> Result<Vec<f64>, FeatureError> {
    if signal.len() <= pad {
        return Err(FeatureError::TooShort {
            needed: pad + 1,
            got: signal.len(),
        });
    }
    let n = signal.len();
    let mut out = Vec::with_capacity(n + 2 * pad);
    out.extend((1..=pad).rev().map(|i| signal[i]));
    out.extend_from_slice(signal);
    out.extend((1..=pad).map(|i| signal[n - 1 - i]));
    Ok(out)
}

/// Frame splitter plus windowed FFT over a fixed geometry.
pub(crate) struct Stft {
    n_fft: usize,
    hop: usize,
    window: Vec<f64>,
}

impl Stft {
    /// Analysis geometry for the spectrogram extractors: periodic Hann of
    /// `win_length` samples, centred inside `n_fft` when `center` is set.
    pub(crate) fn hann(frame: &FrameConfig) -> Self {
        let hann = periodic_hann(frame.win_length());
        let window = if frame.center {
            pad_center(&hann, frame.n_fft)
        } else {
            hann
        };
        Self::new(frame.n_fft, frame.hop_length(), window)
    }

    /// Frames are `window.len()` samples long and zero-padded to `n_fft`.
    pub(crate) fn new(n_fft: usize, hop: usize, window: Vec<f64>) -> Self {
        Self { n_fft, hop, window }
    }

    pub(crate) fn frame_len(&self) -> usize {
        self.window.len()
    }

    /// `|X[k]|^2` for `k` in `0..=n_fft/2`, one row per frame.
    pub(crate) fn power(&self, signal: &[f64]) -> Result<Vec<Vec<f64>>, FeatureError> {
        let frame_len = self.frame_len();
        let num_frames = frame_count(signal.len(), frame_len, self.hop)?;
        let half = self.n_fft / 2 + 1;

        let mut real = vec![0.0f64; self.n_fft];
        let mut imag = vec![0.0f64; self.n_fft];
        let mut out = Vec::with_capacity(num_frames);
        for t in 0..num_frames {
            let offset = t * self.hop;
            real.fill(0.0);
            imag.fill(0.0);
            for (i, (x, w)) in signal[offset..offset + frame_len].iter().zip(&self.window).enumerate() {
                real[i] = x * w;
            }
            fft(&mut real, &mut imag);
            out.push((0..half).map(|k| real[k] * real[k] + imag[k] * imag[k]).collect());
        }
        Ok(out)
    }

    /// `|X[k]|` for each frame.
    pub(crate) fn magnitude(&self, signal: &[f64]) -> Result<Vec<Vec<f64>>, FeatureError> {
        let mut frames = self.power(signal)?;
        for frame in &mut frames {
            for v in frame.iter_mut() {
                *v = v.sqrt();
            }
        }
        Ok(frames)
    }
}

/// Magnitude spectrogram of a waveform under the Hann analysis geometry.
pub(crate) fn magnitude_spectrogram(wave: &Waveform, frame: &FrameConfig) -> Result<Vec<Vec<f64>>, FeatureError> {
    let samples = prepare(wave, frame)?;
    let stft = Stft::hann(frame);
    if frame.center {
        stft.magnitude(&reflect_pad(&samples, frame.n_fft / 2)?)
    } else {
        stft.magnitude(&samples)
    }
}
