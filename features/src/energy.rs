use deepvoice_audio::Waveform;

use crate::config::EnergyConfig;
use crate::delta::{with_deltas, DeltaMethod};
use crate::stft::magnitude_spectrogram;
use crate::{FeatureError, FeatureMatrix, Orientation};

/// Per-frame RMS energy of the magnitude spectrogram.
///
/// Each frame reduces to `sqrt(mean_k |S[k]|^2)`. Deltas, when enabled,
/// are stacked as extra columns. Output is time-major `(frames, 1..=3)`.
pub fn energy(wave: &Waveform, cfg: &EnergyConfig) -> Result<FeatureMatrix, FeatureError> {
    let spectra = magnitude_spectrogram(wave, &cfg.frame)?;
    let mut base = FeatureMatrix::zeros(1, spectra.len(), Orientation::FeatureMajor);
    for (t, frame) in spectra.iter().enumerate() {
        let mean_sq = frame.iter().map(|s| s * s).sum::<f64>() / frame.len() as f64;
        base.set(0, t, mean_sq.sqrt() as f32);
    }
    let stacked = with_deltas(base, cfg.delta, cfg.delta_delta, DeltaMethod::SavitzkyGolay)?;
    Ok(stacked.transpose())
}
