//! Spectral features for speaker-discriminative models.
//!
//! Every extractor takes a [`Waveform`], resamples it to the configured
//! target rate, splits it into `floor((len - window) / hop) + 1` frames and
//! returns a time-major [`FeatureMatrix`]:
//!
//! - [`mel_spectrogram`]: Slaney mel bands of the magnitude STFT, optionally in dB
//! - [`mfcc`]: cepstral coefficients, two strategies selected by [`MfccStrategy`]
//! - [`energy`]: RMS energy per frame
//!
//! MFCC and energy extraction can stack first and second order deltas next
//! to the base coefficients.
//!
//! # Example
//!
//! ```rust
//! use deepvoice_audio::Waveform;
//! use deepvoice_features::{mfcc, MfccConfig};
//!
//! // 500ms of a 220Hz tone at 16kHz
//! let samples: Vec<f32> = (0..8000)
//!     .map(|i| (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 16000.0).sin() * 0.3)
//!     .collect();
//! let wave = Waveform::new(samples, 16000).unwrap();
//!
//! let features = mfcc(&wave, &MfccConfig::v2()).unwrap();
//! assert_eq!(features.rows(), (8000 - 400) / 160 + 1);
//! assert_eq!(features.cols(), 42);
//! ```

mod config;
mod dct;
mod delta;
mod energy;
mod error;
mod fft;
mod matrix;
mod mel;
mod mfcc;
mod spectrogram;
mod stft;
mod window;

use deepvoice_audio::Waveform;

pub use config::{EnergyConfig, FeatureKind, FrameConfig, MelConfig, MfccConfig, MfccStrategy, V2Options};
pub use delta::{regression_delta, savgol_delta, DELTA_WIDTH};
pub use energy::energy;
pub use error::FeatureError;
pub use matrix::{FeatureMatrix, Orientation};
pub use mel::{hz_to_mel_htk, hz_to_mel_slaney, htk_filterbank, mel_to_hz_htk, mel_to_hz_slaney, slaney_filterbank};
pub use mfcc::mfcc;
pub use spectrogram::{mel_spectrogram, power_to_db, AMIN, TOP_DB};
pub use stft::frame_count;
pub use window::WindowFunction;

/// Turns a waveform into a time-major feature matrix.
///
/// Implemented by every extractor config and by [`FeatureKind`], so callers
/// can hold any of them behind one type.
pub trait FeatureExtractor: Send + Sync {
    /// Extracts features from `wave`.
    fn extract(&self, wave: &Waveform) -> Result<FeatureMatrix, FeatureError>;

    /// Number of columns in the extracted matrix.
    fn dim(&self) -> usize;
}
