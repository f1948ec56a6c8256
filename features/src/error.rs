use deepvoice_audio::AudioError;
use thiserror::Error;

/// Errors returned by feature extraction.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("empty waveform")]
    EmptyWaveform,

    #[error("signal too short: need at least {needed} samples, got {got}")]
    TooShort { needed: usize, got: usize },

    #[error("fft size {0} is not a power of two")]
    FftSize(usize),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("delta width {width} exceeds frame count {frames}")]
    DeltaWidth { width: usize, frames: usize },

    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("config parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Audio(#[from] AudioError),
}

impl FeatureError {
    /// Reports whether the input was simply too short to produce the
    /// requested features.
    pub fn is_too_short(&self) -> bool {
        matches!(
            self,
            FeatureError::TooShort { .. } | FeatureError::DeltaWidth { .. } | FeatureError::EmptyWaveform
        ) || matches!(self, FeatureError::Audio(AudioError::Empty))
    }
}
