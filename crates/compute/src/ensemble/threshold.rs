//! Adaptive threshold, confidence and cross-detector agreement.

use std::collections::BTreeSet;

use fraudlens_core::config::EngineConfig;

use super::DetectorScores;
use crate::detectors::DetectorKind;
use crate::stats::{mean, percentile, variance};

/// Added to the variance so a near-flat batch cannot inflate confidence.
const VARIANCE_FLOOR: f64 = 0.1;

/// Confidence reported when one side of the threshold is empty.
const NEUTRAL_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdEstimate {
    pub threshold: f64,
    /// Indices strictly above `threshold`.
    pub anomalous_indices: BTreeSet<usize>,
    pub confidence: f64,
    pub method_agreement: f64,
}

pub fn estimate(combined: &[f64], detectors: &DetectorScores, config: &EngineConfig) -> ThresholdEstimate {
    let threshold = percentile(combined, config.threshold_percentile(combined.len()));
    let anomalous_indices = combined
        .iter()
        .enumerate()
        .filter(|&(_, &s)| s > threshold)
        .map(|(i, _)| i)
        .collect();

    ThresholdEstimate {
        threshold,
        anomalous_indices,
        confidence: confidence(combined, threshold),
        method_agreement: method_agreement(detectors, config.agreement_percentile),
    }
}

/// Separation between the flagged and unflagged populations, relative to the
/// spread of the whole batch, clamped to [0, 1].
pub fn confidence(combined: &[f64], threshold: f64) -> f64 {
    let (above, below): (Vec<f64>, Vec<f64>) = combined.iter().partition(|&&s| s > threshold);
    if above.is_empty() || below.is_empty() {
        return NEUTRAL_CONFIDENCE;
    }

    let separation = mean(&above) - mean(&below);
    (separation / (variance(combined) + VARIANCE_FLOOR)).clamp(0.0, 1.0)
}

/// Mean pairwise agreement of the detectors' own binary decisions, each
/// detector voting "anomalous" strictly above its own `p`-th percentile.
pub fn method_agreement(detectors: &DetectorScores, p: f64) -> f64 {
    let n = detectors.len();
    if n == 0 {
        return 0.0;
    }

    let votes: Vec<Vec<bool>> = DetectorKind::ALL
        .iter()
        .map(|&kind| {
            let scores = detectors.get(kind);
            let cut = percentile(scores, p);
            scores.iter().map(|&s| s > cut).collect()
        })
        .collect();

    let pairs = [(0, 1), (0, 2), (1, 2)];
    let total: f64 = pairs
        .iter()
        .map(|&(a, b)| {
            let same = votes[a].iter().zip(&votes[b]).filter(|(x, y)| x == y).count();
            same as f64 / n as f64
        })
        .sum();

    total / pairs.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_batch_uses_lower_percentile() {
        let combined: Vec<f64> = (0..10).map(|i| i as f64 / 9.0).collect();
        let detectors = DetectorScores {
            density: combined.clone(),
            cluster: combined.clone(),
            reconstruction: combined.clone(),
        };
        let est = estimate(&combined, &detectors, &EngineConfig::default());

        // 80th percentile of 0..=9 scaled: rank 7.2
        assert!((est.threshold - 7.2 / 9.0).abs() < 1e-12);
        assert_eq!(est.anomalous_indices, BTreeSet::from([8, 9]));
        assert_eq!(est.method_agreement, 1.0);
    }

    #[test]
    fn threshold_is_strict() {
        let combined = vec![0.0; 8];
        let detectors = DetectorScores {
            density: combined.clone(),
            cluster: combined.clone(),
            reconstruction: combined.clone(),
        };
        let est = estimate(&combined, &detectors, &EngineConfig::default());
        assert!(est.anomalous_indices.is_empty());
        assert_eq!(est.confidence, NEUTRAL_CONFIDENCE);
    }

    #[test]
    fn confidence_is_clamped() {
        let combined = vec![0.0, 0.0, 0.0, 1.0];
        // means 1 and 0, variance 0.1875 -> 1 / 0.2875 > 1
        assert_eq!(confidence(&combined, 0.5), 1.0);
        // separation 0.05, variance 0.00046875
        let spread = vec![0.0, 0.0, 0.0, 0.05];
        let c = confidence(&spread, 0.01);
        assert!((c - 0.05 / 0.100_468_75).abs() < 1e-12);
        assert!(c > 0.0 && c < 1.0);
    }

    #[test]
    fn disagreeing_detectors_lower_agreement() {
        let detectors = DetectorScores {
            density: vec![0.0, 0.0, 0.0, 1.0],
            cluster: vec![1.0, 0.0, 0.0, 0.0],
            reconstruction: vec![0.0, 0.0, 0.0, 1.0],
        };
        // density/recon agree fully; each disagrees with cluster on 2 of 4
        let agreement = method_agreement(&detectors, 90.0);
        assert!((agreement - (1.0 + 0.5 + 0.5) / 3.0).abs() < 1e-12);
    }
}
