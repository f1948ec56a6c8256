//! Mel scales and triangular filterbanks.
//!
//! Two conventions are provided:
//!
//! - [`slaney_filterbank`]: Slaney mel scale (linear below 1 kHz, log above),
//!   continuous-frequency triangles, area-normalised. Used by the
//!   spectrogram-based extractors.
//! - [`htk_filterbank`]: HTK mel scale with triangles snapped to integer FFT
//!   bins. Used by the direct MFCC strategy.
//!
//! Both return `[num_mels][n_fft / 2 + 1]` weights.

/// Converts frequency in Hz to the HTK mel scale.
pub fn hz_to_mel_htk(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Converts HTK mel back to Hz.
pub fn mel_to_hz_htk(mel: f64) -> f64 {
    700.0 * (10.0_f64.powf(mel / 2595.0) - 1.0)
}

const SLANEY_F_SP: f64 = 200.0 / 3.0;
const SLANEY_MIN_LOG_HZ: f64 = 1000.0;
const SLANEY_MIN_LOG_MEL: f64 = SLANEY_MIN_LOG_HZ / SLANEY_F_SP;

fn slaney_logstep() -> f64 {
    6.4f64.ln() / 27.0
}

/// Converts frequency in Hz to the Slaney mel scale.
pub fn hz_to_mel_slaney(hz: f64) -> f64 {
    if hz >= SLANEY_MIN_LOG_HZ {
        SLANEY_MIN_LOG_MEL + (hz / SLANEY_MIN_LOG_HZ).ln() / slaney_logstep()
    } else {
        hz / SLANEY_F_SP
    }
}

/// Converts Slaney mel back to Hz.
pub fn mel_to_hz_slaney(mel: f64) -> f64 {
    if mel >= SLANEY_MIN_LOG_MEL {
        SLANEY_MIN_LOG_HZ * (slaney_logstep() * (mel - SLANEY_MIN_LOG_MEL)).exp()
    } else {
        SLANEY_F_SP * mel
    }
}

/// Builds a Slaney-style filterbank.
///
/// Band edges are `num_mels + 2` points equally spaced on the Slaney mel
/// scale between `low_freq` and `high_freq`. Each triangle is scaled by
/// `2 / (right_hz - left_hz)` so that every filter has unit area.
pub fn slaney_filterbank(
    num_mels: usize,
    fft_size: usize,
    sample_rate: u32,
    low_freq: f64,
    high_freq: f64,
) -> Vec<Vec<f64>> {
    let half_fft = fft_size / 2 + 1;
    let fft_freqs: Vec<f64> = (0..half_fft)
        .map(|k| k as f64 * sample_rate as f64 / fft_size as f64)
        .collect();

    let low_mel = hz_to_mel_slaney(low_freq);
    let high_mel = hz_to_mel_slaney(high_freq);
    let step = (high_mel - low_mel) / (num_mels + 1) as f64;
    let edges: Vec<f64> = (0..num_mels + 2)
        .map(|i| mel_to_hz_slaney(low_mel + i as f64 * step))
        .collect();

    let mut bank = Vec::with_capacity(num_mels);
    for m in 0..num_mels {
        let (left, center, right) = (edges[m], edges[m + 1], edges[m + 2]);
        let norm = 2.0 / (right - left);
        let filter = fft_freqs
            .iter()
            .map(|&f| {
                let rising = (f - left) / (center - left);
                let falling = (right - f) / (right - center);
                rising.min(falling).max(0.0) * norm
            })
            .collect();
        bank.push(filter);
    }
    bank
}

/// Builds an HTK-style filterbank.
///
/// Band edges are `num_mels + 2` points equally spaced on the HTK mel scale,
/// snapped to FFT bins with `floor((fft_size + 1) * hz / sample_rate)`.
/// Filters whose edges collapse onto the same bin stay empty on that side.
pub fn htk_filterbank(
    num_mels: usize,
    fft_size: usize,
    sample_rate: u32,
    low_freq: f64,
    high_freq: f64,
) -> Vec<Vec<f64>> {
    let half_fft = fft_size / 2 + 1;
    let low_mel = hz_to_mel_htk(low_freq);
    let high_mel = hz_to_mel_htk(high_freq);
    let step = (high_mel - low_mel) / (num_mels + 1) as f64;

    let bins: Vec<usize> = (0..num_mels + 2)
        .map(|i| {
            let hz = mel_to_hz_htk(low_mel + i as f64 * step);
            ((fft_size + 1) as f64 * hz / sample_rate as f64).floor() as usize
        })
        .collect();

    let mut bank = Vec::with_capacity(num_mels);
    for m in 0..num_mels {
        let mut filter = vec![0.0f64; half_fft];
        let (left, center, right) = (bins[m], bins[m + 1], bins[m + 2]);

        for k in left..center.min(half_fft) {
            filter[k] = (k - left) as f64 / (center - left) as f64;
        }
        for k in center..right.min(half_fft) {
            filter[k] = (right - k) as f64 / (right - center) as f64;
        }
        bank.push(filter);
    }
    bank
}

/// Applies a filterbank to one spectrum frame.
pub(crate) fn apply(bank: &[Vec<f64>], spectrum: &[f64]) -> Vec<f64> {
    bank.iter()
        .map(|filter| filter.iter().zip(spectrum).map(|(w, s)| w * s).sum())
        .collect()
}
