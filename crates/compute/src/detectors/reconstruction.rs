//! Reconstruction-error scorer backed by a compact autoencoder.

use fraudlens_core::config::ReconstructionConfig;
use fraudlens_core::{DetectError, FeatureMatrix};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use super::{scoring_failure, Detector, DetectorKind, DetectorSnapshot, SnapshotParams};
use crate::algorithms::autoencoder::{Autoencoder, AutoencoderParams};
use crate::stats::{all_finite, min_max_normalize};

pub struct ReconstructionScorer {
    config: ReconstructionConfig,
    seed: u64,
}

impl ReconstructionScorer {
    pub fn new(config: ReconstructionConfig, seed: u64) -> Self {
        Self { config, seed }
    }

    /// Bottleneck width for `dims` input features, at least 1.
    fn hidden_width(&self, dims: usize) -> usize {
        let width = (dims as f64 * self.config.hidden_ratio).round() as usize;
        width.clamp(1, dims.max(1))
    }
}

impl Detector for ReconstructionScorer {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Reconstruction
    }

    fn fit(&self, features: &FeatureMatrix) -> Result<DetectorSnapshot, DetectError> {
        let params = AutoencoderParams {
            hidden: self.hidden_width(features.cols()),
            epochs: self.config.epochs,
            learning_rate: self.config.learning_rate,
            batch_size: self.config.batch_size,
        };

        let mut rng = StdRng::seed_from_u64(self.seed);
        let model = Autoencoder::train(features, &params, &mut rng)
            .map_err(|e| DetectError::TrainingFailure(format!("autoencoder: {e}")))?;
        debug!(
            hidden = params.hidden,
            epochs = params.epochs,
            loss = model.final_loss(),
            "Autoencoder trained"
        );

        Ok(DetectorSnapshot::reconstruction(features.cols(), model))
    }

    fn score(
        &self,
        snapshot: &DetectorSnapshot,
        features: &FeatureMatrix,
    ) -> Result<Vec<f64>, DetectError> {
        snapshot.check(self.kind(), features)?;
        let SnapshotParams::Reconstruction(model) = snapshot.params() else {
            return Err(scoring_failure(self.kind(), "missing autoencoder"));
        };

        let errors = model.reconstruction_errors(features);
        if !all_finite(&errors) {
            return Err(scoring_failure(
                self.kind(),
                "reconstruction error is not finite",
            ));
        }
        Ok(min_max_normalize(&errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_width_is_bounded() {
        let scorer = ReconstructionScorer::new(ReconstructionConfig::default(), 1);
        assert_eq!(scorer.hidden_width(1), 1);
        assert_eq!(scorer.hidden_width(5), 3);
        assert_eq!(scorer.hidden_width(10), 5);
    }

    #[test]
    fn scores_are_normalized() {
        let rows: Vec<Vec<f64>> = (0..30)
            .map(|i| {
                let t = i as f64 / 30.0 - 0.5;
                vec![t, t, -t]
            })
            .chain(std::iter::once(vec![2.0, -2.0, 2.0]))
            .collect();
        let features = FeatureMatrix::from_rows(rows).unwrap();

        let scorer = ReconstructionScorer::new(ReconstructionConfig::default(), 3);
        let snapshot = scorer.fit(&features).unwrap();
        let scores = scorer.score(&snapshot, &features).unwrap();

        assert_eq!(scores.len(), 31);
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
        assert!(scores.iter().any(|&s| s == 1.0));
    }

    #[test]
    fn empty_batch_is_training_failure() {
        let scorer = ReconstructionScorer::new(ReconstructionConfig::default(), 3);
        let err = scorer.fit(&FeatureMatrix::from_rows(vec![]).unwrap()).unwrap_err();
        assert!(matches!(err, DetectError::TrainingFailure(_)));
    }
}
