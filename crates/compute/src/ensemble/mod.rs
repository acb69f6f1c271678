//! Combining the three detector score vectors into one.

pub mod threshold;

use fraudlens_core::config::EnsembleWeights;
use serde::Serialize;

use crate::detectors::DetectorKind;
use crate::stats::min_max_normalize;

pub use threshold::{estimate, ThresholdEstimate};

/// Per-detector scores for one batch, each of length N.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DetectorScores {
    pub density: Vec<f64>,
    pub cluster: Vec<f64>,
    pub reconstruction: Vec<f64>,
}

impl DetectorScores {
    pub fn get(&self, kind: DetectorKind) -> &[f64] {
        match kind {
            DetectorKind::Density => &self.density,
            DetectorKind::Cluster => &self.cluster,
            DetectorKind::Reconstruction => &self.reconstruction,
        }
    }

    pub fn len(&self) -> usize {
        self.density.len()
    }

    pub fn is_empty(&self) -> bool {
        self.density.is_empty()
    }

    /// Elementwise weighted sum, before renormalization.
    pub fn weighted_sum(&self, weights: &EnsembleWeights) -> Vec<f64> {
        self.density
            .iter()
            .zip(&self.cluster)
            .zip(&self.reconstruction)
            .map(|((d, c), r)| weights.density * d + weights.cluster * c + weights.reconstruction * r)
            .collect()
    }

    /// Weighted sum min-max renormalized to [0, 1]; all zeros when flat.
    pub fn combine(&self, weights: &EnsembleWeights) -> Vec<f64> {
        min_max_normalize(&self.weighted_sum(weights))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_sum_then_renormalize() {
        let scores = DetectorScores {
            density: vec![0.1, 0.9],
            cluster: vec![0.2, 0.8],
            reconstruction: vec![0.0, 1.0],
        };
        let weights = EnsembleWeights::default();

        let raw = scores.weighted_sum(&weights);
        assert!((raw[0] - 0.11).abs() < 1e-12);
        assert!((raw[1] - 0.89).abs() < 1e-12);
        assert_eq!(scores.combine(&weights), vec![0.0, 1.0]);
    }

    #[test]
    fn flat_combination_is_zero() {
        let scores = DetectorScores {
            density: vec![0.4; 3],
            cluster: vec![1.0; 3],
            reconstruction: vec![0.0; 3],
        };
        assert_eq!(scores.combine(&EnsembleWeights::default()), vec![0.0; 3]);
    }

    #[test]
    fn custom_weights_apply() {
        let scores = DetectorScores {
            density: vec![0.0, 1.0, 0.0],
            cluster: vec![1.0, 0.0, 0.0],
            reconstruction: vec![0.0, 0.0, 0.0],
        };
        let weights = EnsembleWeights {
            density: 1.0,
            cluster: 0.0,
            reconstruction: 0.0,
        };
        assert_eq!(scores.combine(&weights), vec![0.0, 1.0, 0.0]);
    }
}
