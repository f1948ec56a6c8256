//! In-place radix-2 Cooley-Tukey FFT.

use std::f64::consts::PI;

use crate::FeatureError;

/// Fails unless `n` is a non-zero power of two.
pub(crate) fn check_size(n: usize) -> Result<(), FeatureError> {
    if n == 0 || !n.is_power_of_two() {
        return Err(FeatureError::FftSize(n));
    }
    Ok(())
}

/// Performs an in-place radix-2 FFT.
/// `real` and `imag` must have the same power-of-2 length.
pub(crate) fn fft(real: &mut [f64], imag: &mut [f64]) {
    let n = real.len();
    debug_assert_eq!(n, imag.len());
    if n <= 1 {
        return;
    }

    // Bit-reversal permutation
    let mut j = 0usize;
    for i in 0..n - 1 {
        if i < j {
            real.swap(i, j);
            imag.swap(i, j);
        }
        let mut k = n >> 1;
        while k <= j {
            j -= k;
            k >>= 1;
        }
        j += k;
    }

    // Butterflies
    let mut size = 2;
    while size <= n {
        let half = size >> 1;
        let angle = -2.0 * PI / size as f64;
        let (w_r, w_i) = (angle.cos(), angle.sin());

        let mut start = 0;
        while start < n {
            let (mut t_r, mut t_i) = (1.0, 0.0);
            for k in 0..half {
                let u = start + k;
                let v = u + half;

                let tmp_r = t_r * real[v] - t_i * imag[v];
                let tmp_i = t_r * imag[v] + t_i * real[v];

                real[v] = real[u] - tmp_r;
                imag[v] = imag[u] - tmp_i;
                real[u] += tmp_r;
                imag[u] += tmp_i;

                let next_r = t_r * w_r - t_i * w_i;
                t_i = t_r * w_i + t_i * w_r;
                t_r = next_r;
            }
            start += size;
        }
        size <<= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impulse_is_flat() {
        let mut real = vec![0.0; 8];
        let mut imag = vec![0.0; 8];
        real[0] = 1.0;

        fft(&mut real, &mut imag);

        for &v in &real {
            assert!((v - 1.0).abs() < 1e-10);
        }
        for &v in &imag {
            assert!(v.abs() < 1e-10);
        }
    }

    #[test]
    fn test_single_bin_tone() {
        // cos(2*pi*2*n/16) puts N/2 in bins 2 and 14.
        let n = 16;
        let mut real: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * 2.0 * i as f64 / n as f64).cos())
            .collect();
        let mut imag = vec![0.0; n];
        fft(&mut real, &mut imag);

        for k in 0..n {
            let mag = (real[k] * real[k] + imag[k] * imag[k]).sqrt();
            let expected = if k == 2 || k == 14 { 8.0 } else { 0.0 };
            assert!((mag - expected).abs() < 1e-9, "bin {k}: {mag}");
        }
    }

    #[test]
    fn test_parseval() {
        let n = 64;
        let mut real: Vec<f64> = (0..n).map(|i| ((i * 7 % 13) as f64) - 6.0).collect();
        let mut imag = vec![0.0; n];
        let time_energy: f64 = real.iter().map(|x| x * x).sum();

        fft(&mut real, &mut imag);
        let freq_energy: f64 = real.iter().zip(&imag).map(|(r, i)| r * r + i * i).sum();

        assert!((time_energy * n as f64 - freq_energy).abs() < 1e-6);
    }

    #[test]
    fn test_size_check() {
        assert!(check_size(512).is_ok());
        assert!(matches!(check_size(400), Err(FeatureError::FftSize(400))));
        assert!(matches!(check_size(0), Err(FeatureError::FftSize(0))));
    }
}
