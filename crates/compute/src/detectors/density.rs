//! Density scorer backed by an isolation forest.

use fraudlens_core::config::DensityConfig;
use fraudlens_core::{DetectError, FeatureMatrix};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use super::{scoring_failure, Detector, DetectorKind, DetectorSnapshot, SnapshotParams};
use crate::algorithms::isolation_forest::IsolationForest;
use crate::stats::min_max_normalize;

pub struct DensityScorer {
    config: DensityConfig,
    seed: u64,
}

impl DensityScorer {
    pub fn new(config: DensityConfig, seed: u64) -> Self {
        Self { config, seed }
    }
}

impl Detector for DensityScorer {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Density
    }

    fn fit(&self, features: &FeatureMatrix) -> Result<DetectorSnapshot, DetectError> {
        if features.is_empty() {
            return Err(DetectError::TrainingFailure(
                "isolation forest needs at least one row".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let forest = IsolationForest::fit(
            features,
            self.config.trees,
            self.config.sample_size,
            &mut rng,
        );
        debug!(
            trees = forest.num_trees(),
            rows = features.rows(),
            "Isolation forest trained"
        );

        Ok(DetectorSnapshot::density(features.cols(), forest))
    }

    fn score(
        &self,
        snapshot: &DetectorSnapshot,
        features: &FeatureMatrix,
    ) -> Result<Vec<f64>, DetectError> {
        snapshot.check(self.kind(), features)?;
        let SnapshotParams::Density(forest) = snapshot.params() else {
            return Err(scoring_failure(self.kind(), "missing isolation forest"));
        };

        let raw: Vec<f64> = features.iter_rows().map(|row| forest.score(row)).collect();
        Ok(min_max_normalize(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> DensityScorer {
        DensityScorer::new(
            DensityConfig {
                trees: 50,
                sample_size: 64,
            },
            7,
        )
    }

    #[test]
    fn outlier_gets_top_score() {
        let mut rows: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![(i % 5) as f64 * 0.1, (i % 7) as f64 * 0.1])
            .collect();
        rows.push(vec![25.0, -25.0]);
        let features = FeatureMatrix::from_rows(rows).unwrap();

        let d = scorer();
        let snapshot = d.fit(&features).unwrap();
        let scores = d.score(&snapshot, &features).unwrap();

        assert_eq!(scores.len(), 41);
        assert_eq!(scores[40], 1.0);
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn constant_batch_scores_zero() {
        let features = FeatureMatrix::from_rows(vec![vec![0.0, 0.0]; 6]).unwrap();
        let d = scorer();
        let snapshot = d.fit(&features).unwrap();
        assert_eq!(d.score(&snapshot, &features).unwrap(), vec![0.0; 6]);
    }

    #[test]
    fn same_seed_same_scores() {
        let features =
            FeatureMatrix::from_rows((0..20).map(|i| vec![(i * i % 11) as f64]).collect()).unwrap();
        let a = scorer().fit(&features).unwrap();
        let b = scorer().fit(&features).unwrap();
        assert_eq!(
            scorer().score(&a, &features).unwrap(),
            scorer().score(&b, &features).unwrap()
        );
    }
}
