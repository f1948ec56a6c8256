use std::path::Path;

use deepvoice_audio::Waveform;
use serde::{Deserialize, Serialize};

use crate::window::WindowFunction;
use crate::{FeatureError, FeatureExtractor, FeatureMatrix};

/// Framing shared by every extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Rate the waveform is resampled to before analysis (default: 16000).
    pub target_sample_rate: u32,
    /// Analysis window length in seconds (default: 0.025).
    pub win_len: f64,
    /// Hop between frames in seconds (default: 0.010).
    pub hop_len: f64,
    /// FFT size, a power of two (default: 512).
    pub n_fft: usize,
    /// Reflect-pad the signal by `n_fft / 2` and analyse `n_fft`-sample
    /// frames (default: false).
    pub center: bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000,
            win_len: 0.025,
            hop_len: 0.010,
            n_fft: 512,
            center: false,
        }
    }
}

impl FrameConfig {
    /// Window length in samples at the target rate.
    pub fn win_length(&self) -> usize {
        (self.win_len * self.target_sample_rate as f64).round() as usize
    }

    /// Hop length in samples at the target rate.
    pub fn hop_length(&self) -> usize {
        (self.hop_len * self.target_sample_rate as f64).round() as usize
    }

    /// Samples covered by one analysed frame.
    pub fn frame_length(&self) -> usize {
        if self.center { self.n_fft } else { self.win_length() }
    }

    pub fn nyquist(&self) -> f64 {
        self.target_sample_rate as f64 / 2.0
    }

    pub fn validate(&self) -> Result<(), FeatureError> {
        if self.target_sample_rate == 0 {
            return Err(FeatureError::InvalidConfig("target_sample_rate must be positive".into()));
        }
        crate::fft::check_size(self.n_fft)?;
        let (win, hop) = (self.win_length(), self.hop_length());
        if win == 0 || hop == 0 {
            return Err(FeatureError::InvalidConfig(format!(
                "window ({win}) and hop ({hop}) must be at least one sample"
            )));
        }
        if win > self.n_fft {
            return Err(FeatureError::InvalidConfig(format!(
                "window of {win} samples exceeds n_fft {}",
                self.n_fft
            )));
        }
        Ok(())
    }

    pub(crate) fn resolve_band(&self, fmin: f64, fmax: Option<f64>) -> Result<(f64, f64), FeatureError> {
        let high = fmax.unwrap_or_else(|| self.nyquist());
        if fmin < 0.0 || high <= fmin || high > self.nyquist() {
            return Err(FeatureError::InvalidConfig(format!(
                "frequency band [{fmin}, {high}] outside [0, {}]",
                self.nyquist()
            )));
        }
        Ok((fmin, high))
    }
}

/// Configures [`crate::mel_spectrogram`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MelConfig {
    pub frame: FrameConfig,
    /// Number of mel bands (default: 128).
    pub n_mels: usize,
    /// Lowest band edge in Hz (default: 0).
    pub fmin: f64,
    /// Highest band edge in Hz, `None` for Nyquist (default: 8000).
    pub fmax: Option<f64>,
    /// Convert to decibels (default: true).
    pub log_mel: bool,
}

impl Default for MelConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            n_mels: 128,
            fmin: 0.0,
            fmax: Some(8000.0),
            log_mel: true,
        }
    }
}

/// Selects how MFCCs are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MfccStrategy {
    /// From a log mel spectrogram. Output is built feature-major then
    /// transposed.
    #[default]
    V1,
    /// Directly from the waveform with pre-emphasis and liftering. Output
    /// is time-major throughout.
    V2,
}

/// Options only the [`MfccStrategy::V2`] path reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct V2Options {
    /// Sinusoidal lifter length, 0 disables (default: 22).
    pub cep_lifter: usize,
    /// Pre-emphasis coefficient, 0 disables (default: 0.97).
    pub pre_emph: f64,
    /// Per-frame window (default: rectangular).
    pub window: WindowFunction,
    /// Append log frame energy as one extra coefficient (default: true).
    pub append_energy: bool,
}

impl Default for V2Options {
    fn default() -> Self {
        Self {
            cep_lifter: 22,
            pre_emph: 0.97,
            window: WindowFunction::Rectangular,
            append_energy: true,
        }
    }
}

/// Configures [`crate::mfcc`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MfccConfig {
    pub frame: FrameConfig,
    pub strategy: MfccStrategy,
    /// Cepstral coefficients kept per frame (default: 13).
    pub n_mfcc: usize,
    /// Mel bands fed to the DCT (default: 22).
    pub n_mels: usize,
    pub fmin: f64,
    /// `None` for Nyquist.
    pub fmax: Option<f64>,
    /// Stack first-order deltas.
    pub delta: bool,
    /// Stack second-order deltas.
    pub delta_delta: bool,
    pub v2: V2Options,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            strategy: MfccStrategy::V1,
            n_mfcc: 13,
            n_mels: 22,
            fmin: 0.0,
            fmax: None,
            delta: false,
            delta_delta: false,
            v2: V2Options::default(),
        }
    }
}

impl MfccConfig {
    /// Defaults for the direct strategy: deltas and delta-deltas on.
    pub fn v2() -> Self {
        Self {
            strategy: MfccStrategy::V2,
            delta: true,
            delta_delta: true,
            ..Self::default()
        }
    }

    /// Coefficients per frame before deltas are stacked.
    pub fn base_dim(&self) -> usize {
        match self.strategy {
            MfccStrategy::V1 => self.n_mfcc,
            MfccStrategy::V2 => self.n_mfcc + usize::from(self.v2.append_energy),
        }
    }
}

/// Configures [`crate::energy`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    pub frame: FrameConfig,
    pub delta: bool,
    pub delta_delta: bool,
}

/// One configured extractor, as chosen in a dataset or training config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureKind {
    Mel(MelConfig),
    Mfcc(MfccConfig),
    Energy(EnergyConfig),
}

impl Default for FeatureKind {
    fn default() -> Self {
        FeatureKind::Mfcc(MfccConfig::default())
    }
}

impl FeatureExtractor for FeatureKind {
    fn extract(&self, wave: &Waveform) -> Result<FeatureMatrix, FeatureError> {
        match self {
            FeatureKind::Mel(cfg) => cfg.extract(wave),
            FeatureKind::Mfcc(cfg) => cfg.extract(wave),
            FeatureKind::Energy(cfg) => cfg.extract(wave),
        }
    }

    fn dim(&self) -> usize {
        match self {
            FeatureKind::Mel(cfg) => cfg.dim(),
            FeatureKind::Mfcc(cfg) => cfg.dim(),
            FeatureKind::Energy(cfg) => cfg.dim(),
        }
    }
}

fn blocks(delta: bool, delta_delta: bool) -> usize {
    1 + usize::from(delta) + usize::from(delta_delta)
}

impl FeatureExtractor for MelConfig {
    fn extract(&self, wave: &Waveform) -> Result<FeatureMatrix, FeatureError> {
        crate::mel_spectrogram(wave, self)
    }

    fn dim(&self) -> usize {
        self.n_mels
    }
}

impl FeatureExtractor for MfccConfig {
    fn extract(&self, wave: &Waveform) -> Result<FeatureMatrix, FeatureError> {
        crate::mfcc(wave, self)
    }

    fn dim(&self) -> usize {
        self.base_dim() * blocks(self.delta, self.delta_delta)
    }
}

impl FeatureExtractor for EnergyConfig {
    fn extract(&self, wave: &Waveform) -> Result<FeatureMatrix, FeatureError> {
        crate::energy(wave, self)
    }

    fn dim(&self) -> usize {
        blocks(self.delta, self.delta_delta)
    }
}

impl FeatureKind {
    pub fn frame(&self) -> &FrameConfig {
        match self {
            FeatureKind::Mel(cfg) => &cfg.frame,
            FeatureKind::Mfcc(cfg) => &cfg.frame,
            FeatureKind::Energy(cfg) => &cfg.frame,
        }
    }

    /// Parses a YAML document.
    pub fn from_yaml_str(s: &str) -> Result<Self, FeatureError> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Reads a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FeatureError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }
}
