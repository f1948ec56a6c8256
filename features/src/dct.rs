use std::f64::consts::PI;

/// Orthonormal DCT-II basis, `[num_out][num_in]`.
pub(crate) fn dct_matrix(num_out: usize, num_in: usize) -> Vec<Vec<f64>> {
    let n = num_in as f64;
    (0..num_out)
        .map(|k| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            (0..num_in)
                .map(|i| scale * (PI * k as f64 * (2 * i + 1) as f64 / (2.0 * n)).cos())
                .collect()
        })
        .collect()
}

pub(crate) fn apply(basis: &[Vec<f64>], input: &[f64]) -> Vec<f64> {
    basis
        .iter()
        .map(|row| row.iter().zip(input).map(|(b, x)| b * x).sum())
        .collect()
}

/// Sinusoidal cepstral lifter `1 + (L / 2) * sin(pi * n / L)`.
/// `L == 0` gives all ones.
pub(crate) fn lifter(num: usize, l: usize) -> Vec<f64> {
    if l == 0 {
        return vec![1.0; num];
    }
    let l = l as f64;
    (0..num)
        .map(|n| 1.0 + (l / 2.0) * (PI * n as f64 / l).sin())
        .collect()
}
