//! Detector contract and the snapshot type each detector trains into.
//!
//! A detector is stateless apart from its configuration: `fit` produces an
//! immutable [`DetectorSnapshot`] and `score` only reads one, so any number
//! of batches can be scored concurrently against the same snapshot.

pub mod cluster;
pub mod density;
pub mod reconstruction;

use std::fmt;
use std::sync::Arc;

use fraudlens_core::config::EngineConfig;
use fraudlens_core::{DetectError, FeatureMatrix};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::algorithms::autoencoder::Autoencoder;
use crate::algorithms::isolation_forest::IsolationForest;

pub use cluster::ClusterOutlierScorer;
pub use density::DensityScorer;
pub use reconstruction::ReconstructionScorer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Density,
    Cluster,
    Reconstruction,
}

impl DetectorKind {
    pub const ALL: [DetectorKind; 3] = [
        DetectorKind::Density,
        DetectorKind::Cluster,
        DetectorKind::Reconstruction,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DetectorKind::Density => "density",
            DetectorKind::Cluster => "cluster",
            DetectorKind::Reconstruction => "reconstruction",
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Trained parameters, one variant per detector family.
#[derive(Debug, Clone)]
pub enum SnapshotParams {
    Density(IsolationForest),
    /// DBSCAN is re-evaluated per batch and carries no trained state.
    Cluster,
    Reconstruction(Autoencoder),
}

/// Immutable output of [`Detector::fit`].
#[derive(Debug, Clone)]
pub struct DetectorSnapshot {
    fingerprint: usize,
    params: SnapshotParams,
}

impl DetectorSnapshot {
    pub fn density(fingerprint: usize, forest: IsolationForest) -> Self {
        Self {
            fingerprint,
            params: SnapshotParams::Density(forest),
        }
    }

    pub fn cluster(fingerprint: usize) -> Self {
        Self {
            fingerprint,
            params: SnapshotParams::Cluster,
        }
    }

    pub fn reconstruction(fingerprint: usize, model: Autoencoder) -> Self {
        Self {
            fingerprint,
            params: SnapshotParams::Reconstruction(model),
        }
    }

    pub fn kind(&self) -> DetectorKind {
        match self.params {
            SnapshotParams::Density(_) => DetectorKind::Density,
            SnapshotParams::Cluster => DetectorKind::Cluster,
            SnapshotParams::Reconstruction(_) => DetectorKind::Reconstruction,
        }
    }

    /// Feature count the snapshot was trained on.
    pub fn fingerprint(&self) -> usize {
        self.fingerprint
    }

    pub fn params(&self) -> &SnapshotParams {
        &self.params
    }

    /// Reject batches from a different feature space or snapshots that
    /// belong to another detector.
    pub fn check(&self, kind: DetectorKind, features: &FeatureMatrix) -> Result<(), DetectError> {
        if self.kind() != kind {
            return Err(scoring_failure(
                kind,
                format!("snapshot was trained by the {} detector", self.kind()),
            ));
        }
        if features.cols() != self.fingerprint {
            return Err(scoring_failure(
                kind,
                format!(
                    "snapshot expects {} features, batch has {}",
                    self.fingerprint,
                    features.cols()
                ),
            ));
        }
        Ok(())
    }
}

pub fn scoring_failure(kind: DetectorKind, reason: impl Into<String>) -> DetectError {
    DetectError::DetectorScoringFailure {
        detector: kind.name().to_string(),
        reason: reason.into(),
    }
}

/// One independently trainable anomaly scorer.
pub trait Detector: Send + Sync {
    fn kind(&self) -> DetectorKind;

    /// Train on a standardized batch.
    fn fit(&self, features: &FeatureMatrix) -> Result<DetectorSnapshot, DetectError>;

    /// One score in [0, 1] per row, higher = more anomalous.
    fn score(
        &self,
        snapshot: &DetectorSnapshot,
        features: &FeatureMatrix,
    ) -> Result<Vec<f64>, DetectError>;

    /// Like [`Detector::score`], but a failure (or a malformed score vector)
    /// yields an all-zero vector so the detector contributes nothing to the
    /// ensemble. The absorbed error is returned alongside.
    fn score_or_neutral(
        &self,
        snapshot: &DetectorSnapshot,
        features: &FeatureMatrix,
    ) -> (Vec<f64>, Option<DetectError>) {
        let n = features.rows();
        let outcome = self.score(snapshot, features).and_then(|scores| {
            if scores.len() != n {
                return Err(scoring_failure(
                    self.kind(),
                    format!("produced {} scores for {} rows", scores.len(), n),
                ));
            }
            if scores.iter().any(|s| !s.is_finite()) {
                return Err(scoring_failure(self.kind(), "produced non-finite scores"));
            }
            Ok(scores.into_iter().map(|s| s.clamp(0.0, 1.0)).collect())
        });

        match outcome {
            Ok(scores) => (scores, None),
            Err(e) => {
                warn!(detector = %self.kind(), error = %e, "Detector failed, contributing neutral scores");
                (vec![0.0; n], Some(e))
            }
        }
    }
}

/// The three detectors the ensemble runs, one per family.
#[derive(Clone)]
pub struct DetectorSet {
    pub density: Arc<dyn Detector>,
    pub cluster: Arc<dyn Detector>,
    pub reconstruction: Arc<dyn Detector>,
}

impl DetectorSet {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            density: Arc::new(DensityScorer::new(config.density.clone(), config.seed)),
            cluster: Arc::new(ClusterOutlierScorer::new(config.cluster.clone())),
            reconstruction: Arc::new(ReconstructionScorer::new(
                config.reconstruction.clone(),
                config.seed,
            )),
        }
    }

    pub fn get(&self, kind: DetectorKind) -> &Arc<dyn Detector> {
        match kind {
            DetectorKind::Density => &self.density,
            DetectorKind::Cluster => &self.cluster,
            DetectorKind::Reconstruction => &self.reconstruction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl Detector for Broken {
        fn kind(&self) -> DetectorKind {
            DetectorKind::Cluster
        }

        fn fit(&self, features: &FeatureMatrix) -> Result<DetectorSnapshot, DetectError> {
            Ok(DetectorSnapshot::cluster(features.cols()))
        }

        fn score(
            &self,
            _snapshot: &DetectorSnapshot,
            _features: &FeatureMatrix,
        ) -> Result<Vec<f64>, DetectError> {
            Ok(vec![0.5])
        }
    }

    fn batch(rows: usize) -> FeatureMatrix {
        FeatureMatrix::from_rows((0..rows).map(|i| vec![i as f64, 1.0]).collect()).unwrap()
    }

    #[test]
    fn wrong_length_is_absorbed() {
        let features = batch(4);
        let snapshot = Broken.fit(&features).unwrap();
        let (scores, err) = Broken.score_or_neutral(&snapshot, &features);
        assert_eq!(scores, vec![0.0; 4]);
        assert!(matches!(err, Some(DetectError::DetectorScoringFailure { .. })));
    }

    #[test]
    fn fingerprint_mismatch_rejected() {
        let snapshot = DetectorSnapshot::cluster(3);
        let err = snapshot.check(DetectorKind::Cluster, &batch(2)).unwrap_err();
        assert!(err.to_string().contains("expects 3 features"));
    }

    #[test]
    fn foreign_snapshot_rejected() {
        let snapshot = DetectorSnapshot::cluster(2);
        let err = snapshot.check(DetectorKind::Density, &batch(2)).unwrap_err();
        assert!(matches!(
            err,
            DetectError::DetectorScoringFailure { ref detector, .. } if detector == "density"
        ));
    }
}
