//! Feature preprocessing: cleaning and standardization.
//!
//! Training fits a [`StandardScaler`] from the batch; scoring reuses the
//! scaler stored with the published snapshot so every batch is projected
//! into the same feature space.

use fraudlens_core::{DetectError, FeatureMatrix};
use serde::Serialize;
use tracing::debug;

use crate::stats::{all_finite, column_stats};

/// Finite stand-in for ±infinity and the clamp range for all raw values.
pub const SENTINEL_BOUND: f64 = 1e10;

/// Replace NaN with 0 and clamp everything (including ±inf) into
/// `[-SENTINEL_BOUND, SENTINEL_BOUND]`. Returns how many values changed.
pub fn clean(matrix: &mut FeatureMatrix) -> usize {
    let mut replaced = 0usize;
    for v in matrix.values_mut() {
        let cleaned = if v.is_nan() {
            0.0
        } else {
            v.clamp(-SENTINEL_BOUND, SENTINEL_BOUND)
        };
        if cleaned != *v || v.is_nan() {
            replaced += 1;
        }
        *v = cleaned;
    }
    replaced
}

/// Per-column standardization `(x - mean) / std`.
#[derive(Debug, Clone, Serialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(matrix: &FeatureMatrix) -> Self {
        let (means, stds) = column_stats(matrix);
        Self { means, stds }
    }

    /// Feature count the scaler was fit on.
    pub fn dims(&self) -> usize {
        self.means.len()
    }

    pub fn transform(&self, matrix: &FeatureMatrix) -> Result<FeatureMatrix, DetectError> {
        if matrix.cols() != self.dims() {
            return Err(DetectError::PreprocessingFailure(format!(
                "scaler fit on {} features, batch has {}",
                self.dims(),
                matrix.cols()
            )));
        }

        let cols = matrix.cols();
        let data: Vec<f64> = matrix
            .values()
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let c = i % cols;
                (v - self.means[c]) / self.stds[c]
            })
            .collect();

        if !all_finite(&data) {
            return Err(DetectError::PreprocessingFailure(
                "standardized features are not finite".to_string(),
            ));
        }

        FeatureMatrix::from_shape(matrix.rows(), cols, data)
    }
}

/// Clean a raw batch, fit a scaler on it and return both the scaler and the
/// transformed batch.
pub fn prepare_training(raw: &FeatureMatrix) -> Result<(StandardScaler, FeatureMatrix), DetectError> {
    let mut cleaned = raw.clone();
    let replaced = clean(&mut cleaned);
    if replaced > 0 {
        debug!(replaced, "Clamped non-finite or out-of-range feature values");
    }
    let scaler = StandardScaler::fit(&cleaned);
    let features = scaler.transform(&cleaned)?;
    Ok((scaler, features))
}

/// Clean a raw batch and project it with an already-fit scaler.
pub fn prepare_scoring(scaler: &StandardScaler, raw: &FeatureMatrix) -> Result<FeatureMatrix, DetectError> {
    let mut cleaned = raw.clone();
    let replaced = clean(&mut cleaned);
    if replaced > 0 {
        debug!(replaced, "Clamped non-finite or out-of-range feature values");
    }
    scaler.transform(&cleaned)
}
