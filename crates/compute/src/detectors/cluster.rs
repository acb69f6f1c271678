//! Cluster-outlier scorer backed by DBSCAN.
//!
//! Noise points score 1.0. Clustered points score `1 - size / largest`, so
//! members of the dominant cluster score 0 and small clusters score high.

use fraudlens_core::config::ClusterConfig;
use fraudlens_core::{DetectError, FeatureMatrix};
use tracing::debug;

use super::{Detector, DetectorKind, DetectorSnapshot};
use crate::algorithms::dbscan::dbscan;

pub struct ClusterOutlierScorer {
    config: ClusterConfig,
}

impl ClusterOutlierScorer {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }
}

impl Detector for ClusterOutlierScorer {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Cluster
    }

    fn fit(&self, features: &FeatureMatrix) -> Result<DetectorSnapshot, DetectError> {
        Ok(DetectorSnapshot::cluster(features.cols()))
    }

    fn score(
        &self,
        snapshot: &DetectorSnapshot,
        features: &FeatureMatrix,
    ) -> Result<Vec<f64>, DetectError> {
        snapshot.check(self.kind(), features)?;

        let result = dbscan(features, self.config.eps, self.config.min_points);
        let sizes = result.cluster_sizes();
        let largest = sizes.iter().copied().max().unwrap_or(0);
        debug!(
            clusters = result.num_clusters,
            noise = result.noise_count(),
            largest,
            "DBSCAN pass complete"
        );

        Ok(result
            .labels
            .iter()
            .map(|label| match label {
                Some(c) if largest > 0 => 1.0 - sizes[*c] as f64 / largest as f64,
                _ => 1.0,
            })
            .collect())
    }
}
