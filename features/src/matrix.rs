//! Dense 2D feature arrays.

use crate::FeatureError;

/// Which axis of a [`FeatureMatrix`] indexes time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Rows are frames, columns are coefficients.
    TimeMajor,
    /// Rows are coefficients, columns are frames.
    FeatureMajor,
}

impl Orientation {
    /// Returns the other orientation.
    pub fn flipped(self) -> Self {
        match self {
            Orientation::TimeMajor => Orientation::FeatureMajor,
            Orientation::FeatureMajor => Orientation::TimeMajor,
        }
    }
}

/// Row-major 2D `f32` array tagged with its [`Orientation`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
    orientation: Orientation,
}

impl FeatureMatrix {
    /// Creates a zero-filled matrix.
    pub fn zeros(rows: usize, cols: usize, orientation: Orientation) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
            orientation,
        }
    }

    /// Builds a matrix from equally long rows.
    pub fn from_rows(rows: Vec<Vec<f32>>, orientation: Orientation) -> Result<Self, FeatureError> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in &rows {
            if row.len() != cols {
                return Err(FeatureError::ShapeMismatch {
                    expected: cols,
                    got: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
            orientation,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Number of time frames, whichever axis holds them.
    pub fn num_frames(&self) -> usize {
        match self.orientation {
            Orientation::TimeMajor => self.rows,
            Orientation::FeatureMajor => self.cols,
        }
    }

    /// Number of coefficients per frame.
    pub fn num_features(&self) -> usize {
        match self.orientation {
            Orientation::TimeMajor => self.cols,
            Orientation::FeatureMajor => self.rows,
        }
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }

    pub(crate) fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Copies out one column.
    pub fn column(&self, col: usize) -> Vec<f32> {
        (0..self.rows).map(|r| self.get(r, col)).collect()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.data.chunks(self.cols.max(1)).take(self.rows).map(<[f32]>::to_vec).collect()
    }

    /// Swaps rows and columns and flips the orientation tag.
    pub fn transpose(&self) -> Self {
        let mut out = Self::zeros(self.cols, self.rows, self.orientation.flipped());
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.set(c, r, self.get(r, c));
            }
        }
        out
    }

    /// Concatenates matrices side by side. All parts need the same row count.
    pub fn hstack(parts: &[FeatureMatrix]) -> Result<Self, FeatureError> {
        let Some(first) = parts.first() else {
            return Err(FeatureError::InvalidConfig("nothing to stack".into()));
        };
        let rows = first.rows;
        for p in parts {
            if p.rows != rows {
                return Err(FeatureError::ShapeMismatch {
                    expected: rows,
                    got: p.rows,
                });
            }
        }
        let cols: usize = parts.iter().map(|p| p.cols).sum();
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for p in parts {
                data.extend_from_slice(p.row(r));
            }
        }
        Ok(Self {
            rows,
            cols,
            data,
            orientation: first.orientation,
        })
    }

    /// Concatenates matrices top to bottom. All parts need the same column count.
    pub fn vstack(parts: &[FeatureMatrix]) -> Result<Self, FeatureError> {
        let Some(first) = parts.first() else {
            return Err(FeatureError::InvalidConfig("nothing to stack".into()));
        };
        let cols = first.cols;
        let mut data = Vec::new();
        let mut rows = 0;
        for p in parts {
            if p.cols != cols {
                return Err(FeatureError::ShapeMismatch {
                    expected: cols,
                    got: p.cols,
                });
            }
            data.extend_from_slice(&p.data);
            rows += p.rows;
        }
        Ok(Self {
            rows,
            cols,
            data,
            orientation: first.orientation,
        })
    }

    /// Keeps the first `frames` frames of a time-major matrix.
    pub fn crop_frames(&self, frames: usize) -> Result<Self, FeatureError> {
        let m = self.to_time_major();
        if m.rows < frames {
            return Err(FeatureError::TooShort {
                needed: frames,
                got: m.rows,
            });
        }
        Ok(Self {
            rows: frames,
            cols: m.cols,
            data: m.data[..frames * m.cols].to_vec(),
            orientation: Orientation::TimeMajor,
        })
    }

    /// Returns a time-major copy, transposing when needed.
    pub fn to_time_major(&self) -> Self {
        match self.orientation {
            Orientation::TimeMajor => self.clone(),
            Orientation::FeatureMajor => self.transpose(),
        }
    }

    /// Subtracts the mean of every element and divides by their population
    /// standard deviation, floored at 1e-10.
    pub fn normalize(&mut self) {
        if self.data.is_empty() {
            return;
        }
        let n = self.data.len() as f64;
        let mean = self.data.iter().map(|&v| v as f64).sum::<f64>() / n;
        let var = self
            .data
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        let std = var.sqrt().max(1e-10);
        for v in &mut self.data {
            *v = ((*v as f64 - mean) / std) as f32;
        }
    }

    /// Mean and variance normalization per coefficient across frames.
    /// Standard deviations below 1e-10 are floored.
    pub fn cmvn(&mut self) {
        let frames = self.num_frames();
        if frames == 0 {
            return;
        }
        let t = frames as f64;
        let (cols, orientation) = (self.cols, self.orientation);
        for k in 0..self.num_features() {
            let idx = |i: usize| match orientation {
                Orientation::TimeMajor => i * cols + k,
                Orientation::FeatureMajor => k * cols + i,
            };
            let mean = (0..frames).map(|i| self.data[idx(i)] as f64).sum::<f64>() / t;
            let var = (0..frames)
                .map(|i| {
                    let d = self.data[idx(i)] as f64 - mean;
                    d * d
                })
                .sum::<f64>()
                / t;
            let std = var.sqrt().max(1e-10);
            for i in 0..frames {
                let j = idx(i);
                self.data[j] = ((self.data[j] as f64 - mean) / std) as f32;
            }
        }
    }
}
