//! Time derivatives of feature sequences.
//!
//! Two estimators are provided. [`savgol_delta`] fits a local polynomial of
//! degree `order` over `width` frames and returns its `order`-th derivative;
//! windows near the edges are clamped so they still cover `width` real frames.
//! [`regression_delta`] is the classic speech-recognition regression formula
//! with edge replication.
//!
//! Both work along the time axis of a [`FeatureMatrix`] regardless of its
//! [`Orientation`] and return a matrix of the same shape.

use crate::{FeatureError, FeatureMatrix, Orientation};

/// Window used by [`savgol_delta`] in the spectrogram-based extractors.
pub const DELTA_WIDTH: usize = 9;

/// Savitzky-Golay derivative of order 1 or 2.
pub fn savgol_delta(m: &FeatureMatrix, order: usize, width: usize) -> Result<FeatureMatrix, FeatureError> {
    if width < 3 || width % 2 == 0 {
        return Err(FeatureError::InvalidConfig(format!(
            "delta width must be odd and >= 3, got {width}"
        )));
    }
    let coeffs = savgol_coefficients(order, width)?;
    let frames = m.num_frames();
    if frames < width {
        return Err(FeatureError::DeltaWidth { width, frames });
    }

    let half = width / 2;
    Ok(map_series(m, |x| {
        let n = x.len();
        (0..n)
            .map(|t| {
                // Past the edges the fitted polynomial's derivative is constant,
                // so the nearest full window gives the same value.
                let center = t.clamp(half, n - 1 - half);
                coeffs
                    .iter()
                    .enumerate()
                    .map(|(i, c)| c * x[center + i - half])
                    .sum()
            })
            .collect()
    }))
}

fn savgol_coefficients(order: usize, width: usize) -> Result<Vec<f64>, FeatureError> {
    let half = (width / 2) as i64;
    let ks: Vec<f64> = (-half..=half).map(|k| k as f64).collect();
    match order {
        1 => {
            let norm: f64 = ks.iter().map(|k| k * k).sum();
            Ok(ks.iter().map(|k| k / norm).collect())
        }
        2 => {
            let mean_sq = ks.iter().map(|k| k * k).sum::<f64>() / width as f64;
            let centered: Vec<f64> = ks.iter().map(|k| k * k - mean_sq).collect();
            let norm: f64 = centered.iter().map(|c| c * c).sum();
            Ok(centered.iter().map(|c| 2.0 * c / norm).collect())
        }
        _ => Err(FeatureError::InvalidConfig(format!(
            "delta order must be 1 or 2, got {order}"
        ))),
    }
}

/// `d[t] = sum_{n=1..N} n * (c[t+n] - c[t-n]) / (2 * sum n^2)`, with the
/// first and last frames repeated past the edges.
pub fn regression_delta(m: &FeatureMatrix, n: usize) -> Result<FeatureMatrix, FeatureError> {
    if n == 0 {
        return Err(FeatureError::InvalidConfig("regression delta needs N >= 1".into()));
    }
    if m.num_frames() == 0 {
        return Err(FeatureError::DeltaWidth { width: 1, frames: 0 });
    }
    let denom = 2.0 * (1..=n).map(|i| (i * i) as f64).sum::<f64>();
    Ok(map_series(m, |x| {
        let last = x.len() - 1;
        (0..x.len())
            .map(|t| {
                (1..=n)
                    .map(|i| i as f64 * (x[(t + i).min(last)] - x[t.saturating_sub(i)]))
                    .sum::<f64>()
                    / denom
            })
            .collect()
    }))
}

/// Which delta estimator an extractor uses.
#[derive(Debug, Clone, Copy)]
pub(crate) enum DeltaMethod {
    /// Local polynomial fit; the second derivative is fitted directly.
    SavitzkyGolay,
    /// Regression with N = 1; the second derivative is the delta of the delta.
    Regression,
}

/// Appends first and/or second derivatives of `base` along the feature axis:
/// below it when feature-major, to the right when time-major.
pub(crate) fn with_deltas(
    base: FeatureMatrix,
    delta: bool,
    delta_delta: bool,
    method: DeltaMethod,
) -> Result<FeatureMatrix, FeatureError> {
    if !delta && !delta_delta {
        return Ok(base);
    }
    let mut parts = vec![base];
    match method {
        DeltaMethod::SavitzkyGolay => {
            if delta {
                parts.push(savgol_delta(&parts[0], 1, DELTA_WIDTH)?);
            }
            if delta_delta {
                parts.push(savgol_delta(&parts[0], 2, DELTA_WIDTH)?);
            }
        }
        DeltaMethod::Regression => {
            let d1 = regression_delta(&parts[0], 1)?;
            if delta_delta {
                let d2 = regression_delta(&d1, 1)?;
                if delta {
                    parts.push(d1);
                }
                parts.push(d2);
            } else {
                parts.push(d1);
            }
        }
    }
    match parts[0].orientation() {
        Orientation::FeatureMajor => FeatureMatrix::vstack(&parts),
        Orientation::TimeMajor => FeatureMatrix::hstack(&parts),
    }
}

/// Applies `f` to every coefficient's time series.
fn map_series(m: &FeatureMatrix, f: impl Fn(&[f64]) -> Vec<f64>) -> FeatureMatrix {
    let mut out = FeatureMatrix::zeros(m.rows(), m.cols(), m.orientation());
    let frames = m.num_frames();
    for k in 0..m.num_features() {
        let at = |t: usize| match m.orientation() {
            Orientation::TimeMajor => (t, k),
            Orientation::FeatureMajor => (k, t),
        };
        let series: Vec<f64> = (0..frames)
            .map(|t| {
                let (r, c) = at(t);
                m.get(r, c) as f64
            })
            .collect();
        for (t, v) in f(&series).into_iter().enumerate() {
            let (r, c) = at(t);
            out.set(r, c, v as f32);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f32], o: Orientation) -> FeatureMatrix {
        let m = FeatureMatrix::from_rows(values.iter().map(|v| vec![*v]).collect(), Orientation::TimeMajor)
            .unwrap();
        match o {
            Orientation::TimeMajor => m,
            Orientation::FeatureMajor => m.transpose(),
        }
    }

    fn values(m: &FeatureMatrix) -> Vec<f32> {
        m.to_time_major().column(0)
    }

    #[test]
    fn test_savgol_slope_of_line() {
        let line: Vec<f32> = (0..20).map(|t| 3.0 * t as f32 + 1.0).collect();
        for o in [Orientation::TimeMajor, Orientation::FeatureMajor] {
            let d = savgol_delta(&series(&line, o), 1, 9).unwrap();
            assert_eq!(d.orientation(), o);
            for v in values(&d) {
                assert!((v - 3.0).abs() < 1e-4, "{v}");
            }
        }
    }

    #[test]
    fn test_savgol_curvature_of_parabola() {
        let parab: Vec<f32> = (0..15).map(|t| 0.5 * (t * t) as f32 - t as f32).collect();
        let d2 = savgol_delta(&series(&parab, Orientation::TimeMajor), 2, 9).unwrap();
        for v in values(&d2) {
            assert!((v - 1.0).abs() < 1e-3, "{v}");
        }
        // A line has no curvature.
        let line: Vec<f32> = (0..15).map(|t| t as f32).collect();
        let d2 = savgol_delta(&series(&line, Orientation::TimeMajor), 2, 9).unwrap();
        assert!(values(&d2).iter().all(|v| v.abs() < 1e-5));
    }

    #[test]
    fn test_savgol_needs_width_frames() {
        let m = series(&[1.0; 8], Orientation::TimeMajor);
        assert!(matches!(
            savgol_delta(&m, 1, 9),
            Err(FeatureError::DeltaWidth { width: 9, frames: 8 })
        ));
        let m = series(&[1.0; 9], Orientation::TimeMajor);
        assert!(savgol_delta(&m, 1, 9).is_ok());
        assert!(savgol_delta(&m, 3, 9).is_err());
        assert!(savgol_delta(&m, 1, 4).is_err());
    }

    #[test]
    fn test_regression_with_edge_replication() {
        let m = series(&[0.0, 2.0, 6.0, 12.0], Orientation::TimeMajor);
        let d = regression_delta(&m, 1).unwrap();
        assert_eq!(values(&d), vec![1.0, 3.0, 5.0, 3.0]);

        let d = regression_delta(&m, 2).unwrap();
        // t=0: (1*(2-0) + 2*(6-0)) / 10
        assert!((values(&d)[0] - 1.4).abs() < 1e-6);
        assert!(regression_delta(&m, 0).is_err());
    }

    #[test]
    fn test_stacking_follows_orientation() {
        let base = FeatureMatrix::zeros(2, 12, Orientation::FeatureMajor);
        let out = with_deltas(base, true, true, DeltaMethod::SavitzkyGolay).unwrap();
        assert_eq!((out.rows(), out.cols()), (6, 12));

        let base = FeatureMatrix::zeros(12, 2, Orientation::TimeMajor);
        let out = with_deltas(base.clone(), true, false, DeltaMethod::Regression).unwrap();
        assert_eq!((out.rows(), out.cols()), (12, 4));
        let out = with_deltas(base.clone(), false, true, DeltaMethod::Regression).unwrap();
        assert_eq!((out.rows(), out.cols()), (12, 4));
        let out = with_deltas(base.clone(), false, false, DeltaMethod::Regression).unwrap();
        assert_eq!(out, base);
    }

    #[test]
    fn test_delta_delta_is_delta_of_delta_for_regression() {
        let m = series(&[0.0, 1.0, 4.0, 9.0, 16.0, 25.0], Orientation::TimeMajor);
        let out = with_deltas(m.clone(), true, true, DeltaMethod::Regression).unwrap();
        let d1 = regression_delta(&m, 1).unwrap();
        let d2 = regression_delta(&d1, 1).unwrap();
        assert_eq!(out.column(1), d1.column(0));
        assert_eq!(out.column(2), d2.column(0));
    }
}
