//! Validated numeric batch representation.

use serde::{Deserialize, Serialize};

use crate::error::DetectError;

/// Row-major N×D matrix: one row per transaction, one column per feature.
///
/// Construction validates that the batch is rectangular, so downstream code
/// can index rows without re-checking lengths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl FeatureMatrix {
    /// Build a matrix from raw rows.
    ///
    /// An empty batch is accepted as a 0×0 matrix (sample-count validation
    /// rejects it later). Ragged rows or rows without features are rejected
    /// with [`DetectError::InvalidInputShape`].
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, DetectError> {
        let Some(first) = rows.first() else {
            return Ok(Self {
                rows: 0,
                cols: 0,
                data: Vec::new(),
            });
        };

        let cols = first.len();
        if cols == 0 {
            return Err(DetectError::InvalidInputShape(
                "rows contain no features".to_string(),
            ));
        }

        let n = rows.len();
        let mut data = Vec::with_capacity(n * cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != cols {
                return Err(DetectError::InvalidInputShape(format!(
                    "row {} has {} features, expected {}",
                    i,
                    row.len(),
                    cols
                )));
            }
            data.extend(row);
        }

        Ok(Self { rows: n, cols, data })
    }

    /// Build a matrix from a flat row-major buffer.
    pub fn from_shape(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, DetectError> {
        if data.len() != rows * cols {
            return Err(DetectError::InvalidInputShape(format!(
                "buffer of {} values does not fit {}x{}",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(Self { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Feature count D, the feature-space fingerprint.
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact panics on a zero chunk size.
        self.data.chunks_exact(self.cols.max(1))
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }
}
