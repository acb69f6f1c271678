//! Training lifecycle and the published snapshot set.
//!
//! The current [`SnapshotSet`] is immutable and shared through an `Arc`;
//! retraining builds a new set and swaps it in under the write lock, so
//! callers already scoring against the old set are unaffected.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fraudlens_core::{DetectError, FeatureMatrix};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::detectors::{DetectorKind, DetectorSet, DetectorSnapshot};
use crate::preprocess::{prepare_training, StandardScaler};

/// Output of one training run, before it is versioned and published.
#[derive(Debug, Clone)]
pub struct TrainedModels {
    pub scaler: StandardScaler,
    pub density: DetectorSnapshot,
    pub cluster: DetectorSnapshot,
    pub reconstruction: DetectorSnapshot,
}

/// Fit the preprocessor and all three detectors on a raw batch.
pub fn train(raw: &FeatureMatrix, detectors: &DetectorSet) -> Result<TrainedModels, DetectError> {
    let (scaler, features) = prepare_training(raw)?;

    let fit = |kind: DetectorKind| -> Result<DetectorSnapshot, DetectError> {
        let snapshot = detectors.get(kind).fit(&features)?;
        if snapshot.kind() != kind || snapshot.fingerprint() != features.cols() {
            return Err(DetectError::TrainingFailure(format!(
                "{kind} detector produced a snapshot for the {} detector over {} features",
                snapshot.kind(),
                snapshot.fingerprint()
            )));
        }
        Ok(snapshot)
    };

    Ok(TrainedModels {
        density: fit(DetectorKind::Density)?,
        cluster: fit(DetectorKind::Cluster)?,
        reconstruction: fit(DetectorKind::Reconstruction)?,
        scaler,
    })
}

/// A published, versioned set of trained models.
#[derive(Debug)]
pub struct SnapshotSet {
    models: TrainedModels,
    version: String,
    trained_at: DateTime<Utc>,
}

impl SnapshotSet {
    pub fn fingerprint(&self) -> usize {
        self.models.scaler.dims()
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.models.scaler
    }

    pub fn get(&self, kind: DetectorKind) -> &DetectorSnapshot {
        match kind {
            DetectorKind::Density => &self.models.density,
            DetectorKind::Cluster => &self.models.cluster,
            DetectorKind::Reconstruction => &self.models.reconstruction,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelState {
    pub trained: bool,
    /// Feature count of the current models.
    pub fingerprint: Option<usize>,
    pub version: Option<String>,
    pub trained_at: Option<DateTime<Utc>>,
}

/// What a caller gets back from [`ModelStateManager::acquire`].
#[derive(Debug, Clone)]
pub struct Acquired {
    pub snapshot: Arc<SnapshotSet>,
    /// Set when retraining failed and an earlier snapshot is served instead.
    pub training_error: Option<DetectError>,
}

#[derive(Default)]
struct Inner {
    state: ModelState,
    /// Last successfully trained set. Survives `reset` so a failed retrain
    /// can fall back to it.
    current: Option<Arc<SnapshotSet>>,
}

impl Inner {
    fn usable(&self, dims: usize) -> Option<Arc<SnapshotSet>> {
        if self.state.trained && self.state.fingerprint == Some(dims) {
            self.current.clone()
        } else {
            None
        }
    }
}

#[derive(Default)]
pub struct ModelStateManager {
    inner: RwLock<Inner>,
    generation: AtomicU64,
}

impl ModelStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a snapshot set for `dims`-feature batches, running `train`
    /// first when the models are untrained or were fit on a different
    /// feature count. Concurrent callers that need training wait on the
    /// write lock; only the first one trains.
    pub async fn acquire<F, Fut>(&self, dims: usize, train: F) -> Result<Acquired, DetectError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TrainedModels, DetectError>>,
    {
        if let Some(snapshot) = self.inner.read().await.usable(dims) {
            return Ok(Acquired {
                snapshot,
                training_error: None,
            });
        }

        let mut inner = self.inner.write().await;
        if let Some(snapshot) = inner.usable(dims) {
            return Ok(Acquired {
                snapshot,
                training_error: None,
            });
        }

        if let Some(previous) = inner.state.fingerprint.filter(|&fp| fp != dims) {
            info!(previous, dims, "Feature space changed, retraining");
        }

        match train().await {
            Ok(models) => {
                let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
                let trained_at = Utc::now();
                let version = format!("v{}-{}", generation, trained_at.format("%Y%m%d%H%M%S"));
                let set = Arc::new(SnapshotSet {
                    models,
                    version: version.clone(),
                    trained_at,
                });

                inner.state = ModelState {
                    trained: true,
                    fingerprint: Some(dims),
                    version: Some(version.clone()),
                    trained_at: Some(trained_at),
                };
                inner.current = Some(Arc::clone(&set));
                info!(version = %version, dims, "Models trained and published");

                Ok(Acquired {
                    snapshot: set,
                    training_error: None,
                })
            }
            Err(e) => {
                error!(error = %e, dims, "Model training failed");
                match inner.current.clone() {
                    Some(previous) if previous.fingerprint() == dims => {
                        warn!(version = %previous.version(), "Serving previous snapshot");
                        Ok(Acquired {
                            snapshot: previous,
                            training_error: Some(e),
                        })
                    }
                    _ => Err(e),
                }
            }
        }
    }

    /// Mark the models untrained so the next batch retrains.
    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        inner.state = ModelState::default();
        info!("Model state reset");
    }

    pub async fn state(&self) -> ModelState {
        self.inner.read().await.state.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use fraudlens_core::config::EngineConfig;

    use super::*;

    fn batch(cols: usize) -> FeatureMatrix {
        FeatureMatrix::from_rows(
            (0..12)
                .map(|i| (0..cols).map(|c| ((i * (c + 3)) % 7) as f64).collect())
                .collect(),
        )
        .unwrap()
    }

    fn detectors() -> DetectorSet {
        let mut config = EngineConfig::default();
        config.density.trees = 10;
        config.reconstruction.epochs = 5;
        DetectorSet::from_config(&config)
    }

    #[test]
    fn train_fits_all_detectors() {
        let models = train(&batch(3), &detectors()).unwrap();
        assert_eq!(models.scaler.dims(), 3);
        assert_eq!(models.density.kind(), DetectorKind::Density);
        assert_eq!(models.cluster.kind(), DetectorKind::Cluster);
        assert_eq!(models.reconstruction.fingerprint(), 3);
    }

    #[tokio::test]
    async fn trains_once_per_feature_space() {
        let manager = ModelStateManager::new();
        let calls = AtomicUsize::new(0);
        let det = detectors();

        for _ in 0..3 {
            manager
                .acquire(3, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    train(&batch(3), &det)
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let acquired = manager
            .acquire(4, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                train(&batch(4), &det)
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(acquired.snapshot.fingerprint(), 4);
        assert!(acquired.snapshot.version().starts_with("v2-"));

        let state = manager.state().await;
        assert!(state.trained);
        assert_eq!(state.fingerprint, Some(4));
    }

    #[tokio::test]
    async fn failed_retrain_falls_back_to_previous() {
        let manager = ModelStateManager::new();
        let det = detectors();
        let first = manager
            .acquire(3, || async { train(&batch(3), &det) })
            .await
            .unwrap();

        manager.reset().await;
        assert!(!manager.state().await.trained);

        let acquired = manager
            .acquire(3, || async { Err(DetectError::TrainingFailure("diverged".into())) })
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&acquired.snapshot, &first.snapshot));
        assert!(matches!(acquired.training_error, Some(DetectError::TrainingFailure(_))));
    }

    #[tokio::test]
    async fn failed_training_without_fallback_errors() {
        let manager = ModelStateManager::new();
        let err = manager
            .acquire(3, || async { Err(DetectError::TrainingFailure("diverged".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, DetectError::TrainingFailure(_)));
        assert_eq!(manager.state().await, ModelState::default());
    }
}
