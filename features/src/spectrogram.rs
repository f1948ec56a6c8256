use deepvoice_audio::Waveform;

use crate::config::{FrameConfig, MelConfig};
use crate::stft::magnitude_spectrogram;
use crate::{mel, FeatureError, FeatureMatrix, Orientation};

/// Floor applied before taking the logarithm in [`power_to_db`].
pub const AMIN: f64 = 1e-10;

/// Dynamic range kept below the loudest value by [`power_to_db`].
pub const TOP_DB: f64 = 80.0;

/// Converts power values to decibels relative to 1.0.
///
/// `10 * log10(max(AMIN, x))`, then everything below `max - TOP_DB` is
/// raised to that floor. The floor uses the maximum over the whole input.
pub fn power_to_db(values: &[f64]) -> Vec<f64> {
    let mut db: Vec<f64> = values.iter().map(|&x| 10.0 * x.max(AMIN).log10()).collect();
    let peak = db.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let floor = peak - TOP_DB;
    for v in &mut db {
        *v = v.max(floor);
    }
    db
}

/// Slaney mel bands of the magnitude spectrogram, `[frames][n_mels]`.
pub(crate) fn mel_frames(
    wave: &Waveform,
    frame: &FrameConfig,
    n_mels: usize,
    fmin: f64,
    fmax: Option<f64>,
) -> Result<Vec<Vec<f64>>, FeatureError> {
    if n_mels == 0 {
        return Err(FeatureError::InvalidConfig("n_mels must be positive".into()));
    }
    let (low, high) = frame.resolve_band(fmin, fmax)?;
    let spectra = magnitude_spectrogram(wave, frame)?;
    let bank = mel::slaney_filterbank(n_mels, frame.n_fft, frame.target_sample_rate, low, high);
    Ok(spectra.iter().map(|s| mel::apply(&bank, s)).collect())
}

/// Computes a (log-)mel spectrogram.
///
/// The waveform is resampled to `frame.target_sample_rate` when needed.
/// Output is time-major: `(frames, n_mels)`.
pub fn mel_spectrogram(wave: &Waveform, cfg: &MelConfig) -> Result<FeatureMatrix, FeatureError> {
    let frames = mel_frames(wave, &cfg.frame, cfg.n_mels, cfg.fmin, cfg.fmax)?;
    let num_frames = frames.len();
    let flat: Vec<f64> = frames.into_iter().flatten().collect();
    let flat = if cfg.log_mel { power_to_db(&flat) } else { flat };

    let rows = flat
        .chunks(cfg.n_mels)
        .map(|r| r.iter().map(|&v| v as f32).collect())
        .collect();
    let m = FeatureMatrix::from_rows(rows, Orientation::TimeMajor)?;
    debug_assert_eq!(m.rows(), num_frames);
    Ok(m)
}
