//! Analysis window functions.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Window applied to each frame before the FFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowFunction {
    /// All ones.
    #[default]
    Rectangular,
    /// Symmetric Hann.
    Hann,
    /// Symmetric Hamming.
    Hamming,
    /// Hann raised to 0.85, as used by Kaldi.
    Povey,
}

impl WindowFunction {
    /// Generates the window coefficients for `n` samples.
    pub fn coefficients(self, n: usize) -> Vec<f64> {
        match self {
            WindowFunction::Rectangular => vec![1.0; n],
            WindowFunction::Hann => symmetric(n, |x| 0.5 - 0.5 * x.cos()),
            WindowFunction::Hamming => symmetric(n, |x| 0.54 - 0.46 * x.cos()),
            WindowFunction::Povey => symmetric(n, |x| (0.5 - 0.5 * x.cos()).powf(0.85)),
        }
    }
}

fn symmetric(n: usize, f: impl Fn(f64) -> f64) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|i| f(2.0 * PI * i as f64 / (n - 1) as f64))
        .collect()
}

/// Periodic Hann window (the DFT-even form used for STFT analysis).
pub(crate) fn periodic_hann(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos())
        .collect()
}

/// Centers `window` inside a zero buffer of length `len`.
pub(crate) fn pad_center(window: &[f64], len: usize) -> Vec<f64> {
    let mut out = vec![0.0; len];
    let offset = (len - window.len()) / 2;
    out[offset..offset + window.len()].copy_from_slice(window);
    out
}
