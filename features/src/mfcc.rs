//! Mel-frequency cepstral coefficients.
//!
//! [`mfcc`] dispatches on [`MfccStrategy`]:
//!
//! - **V1** takes the DCT of the log Slaney-mel magnitude spectrogram. Its
//!   base matrix is feature-major, deltas are stacked below it, and the
//!   stack is transposed once at the end.
//! - **V2** works on the waveform directly: pre-emphasis, windowed power
//!   spectrum, HTK filterbank, natural log, DCT, lifter and an optional
//!   log-energy coefficient. Everything stays time-major.
//!
//! Both return a time-major matrix.

use deepvoice_audio::Waveform;
use tracing::trace;

use crate::config::{MfccConfig, MfccStrategy};
use crate::delta::{with_deltas, DeltaMethod};
use crate::spectrogram::{mel_frames, power_to_db};
use crate::stft::{prepare, Stft};
use crate::{dct, mel, FeatureError, FeatureMatrix, Orientation};

/// Computes MFCCs with the configured strategy.
pub fn mfcc(wave: &Waveform, cfg: &MfccConfig) -> Result<FeatureMatrix, FeatureError> {
    if cfg.n_mfcc == 0 || cfg.n_mfcc > cfg.n_mels {
        return Err(FeatureError::InvalidConfig(format!(
            "n_mfcc must be in 1..={}, got {}",
            cfg.n_mels, cfg.n_mfcc
        )));
    }
    match cfg.strategy {
        MfccStrategy::V1 => mfcc_v1(wave, cfg),
        MfccStrategy::V2 => mfcc_v2(wave, cfg),
    }
}

fn mfcc_v1(wave: &Waveform, cfg: &MfccConfig) -> Result<FeatureMatrix, FeatureError> {
    let mels = mel_frames(wave, &cfg.frame, cfg.n_mels, cfg.fmin, cfg.fmax)?;
    let num_frames = mels.len();
    let flat: Vec<f64> = mels.into_iter().flatten().collect();
    let log_mel = power_to_db(&flat);

    let basis = dct::dct_matrix(cfg.n_mfcc, cfg.n_mels);
    let mut base = FeatureMatrix::zeros(cfg.n_mfcc, num_frames, Orientation::FeatureMajor);
    for (t, frame) in log_mel.chunks(cfg.n_mels).enumerate() {
        for (k, c) in dct::apply(&basis, frame).into_iter().enumerate() {
            base.set(k, t, c as f32);
        }
    }

    let stacked = with_deltas(base, cfg.delta, cfg.delta_delta, DeltaMethod::SavitzkyGolay)?;
    trace!(rows = stacked.rows(), cols = stacked.cols(), "mfcc v1 stack");
    Ok(stacked.transpose())
}

fn mfcc_v2(wave: &Waveform, cfg: &MfccConfig) -> Result<FeatureMatrix, FeatureError> {
    let frame = &cfg.frame;
    let opts = &cfg.v2;
    let (low, high) = frame.resolve_band(cfg.fmin, cfg.fmax)?;
    let mut signal = prepare(wave, frame)?;

    if opts.pre_emph != 0.0 {
        for i in (1..signal.len()).rev() {
            signal[i] -= opts.pre_emph * signal[i - 1];
        }
    }

    let stft = Stft::new(frame.n_fft, frame.hop_length(), opts.window.coefficients(frame.win_length()));
    let scale = 1.0 / frame.n_fft as f64;
    let bank = mel::htk_filterbank(cfg.n_mels, frame.n_fft, frame.target_sample_rate, low, high);
    let basis = dct::dct_matrix(cfg.n_mfcc, cfg.n_mels);
    let lift = dct::lifter(cfg.n_mfcc, opts.cep_lifter);

    let mut rows = Vec::new();
    for spectrum in stft.power(&signal)? {
        let power: Vec<f64> = spectrum.iter().map(|p| p * scale).collect();
        let log_bands: Vec<f64> = mel::apply(&bank, &power)
            .into_iter()
            .map(|e| floor_eps(e).ln())
            .collect();

        let mut row: Vec<f32> = dct::apply(&basis, &log_bands)
            .iter()
            .zip(&lift)
            .map(|(c, l)| (c * l) as f32)
            .collect();
        if opts.append_energy {
            let energy: f64 = power.iter().sum();
            row.push(floor_eps(energy).ln() as f32);
        }
        rows.push(row);
    }

    let base = FeatureMatrix::from_rows(rows, Orientation::TimeMajor)?;
    with_deltas(base, cfg.delta, cfg.delta_delta, DeltaMethod::Regression)
}

fn floor_eps(x: f64) -> f64 {
    if x == 0.0 { f64::EPSILON } else { x }
}
