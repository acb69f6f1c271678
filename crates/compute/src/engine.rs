//! The ensemble detection engine.
//!
//! One `DetectionEngine` owns everything a detection needs: the worker pool,
//! the three detectors, the model state, the circuit breaker and the
//! performance tracker. There is no process-wide state, so independent
//! engines never interfere.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use fraudlens_core::config::{Config, EngineConfig, GuardConfig};
use fraudlens_core::{DetectError, EnsembleResult, FeatureMatrix};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::detectors::{scoring_failure, DetectorKind, DetectorSet};
use crate::ensemble::{estimate, DetectorScores};
use crate::guard::ReliabilityGuard;
use crate::metrics::{PerformanceSnapshot, PerformanceTracker};
use crate::model_state::{train, ModelStateManager, SnapshotSet};
use crate::pool::WorkerPool;
use crate::preprocess::prepare_scoring;

/// Result of one `detect` call.
#[derive(Debug, Clone)]
pub enum DetectionOutcome {
    /// Every stage succeeded.
    Ok(EnsembleResult),
    /// A result was produced, but at least one detector was replaced with
    /// neutral scores or a failed retrain fell back to the previous models.
    Degraded {
        result: EnsembleResult,
        error: DetectError,
        /// Detectors whose scores were replaced with zeros.
        failed_detectors: Vec<DetectorKind>,
    },
    /// No result could be produced.
    Fatal(DetectError),
}

impl DetectionOutcome {
    /// Flatten into a single result. `Fatal` becomes the zeroed result
    /// carrying the error message.
    pub fn into_result(self) -> EnsembleResult {
        match self {
            Self::Ok(result) | Self::Degraded { result, .. } => result,
            Self::Fatal(error) => EnsembleResult::failed(&error),
        }
    }

    pub fn result(&self) -> Option<&EnsembleResult> {
        match self {
            Self::Ok(result) | Self::Degraded { result, .. } => Some(result),
            Self::Fatal(_) => None,
        }
    }

    pub fn error(&self) -> Option<&DetectError> {
        match self {
            Self::Ok(_) => None,
            Self::Degraded { error, .. } | Self::Fatal(error) => Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub trained: bool,
    pub version: Option<String>,
    pub fingerprint: Option<usize>,
    pub error_count: u32,
    pub circuit_open: bool,
    pub last_error_at: Option<DateTime<Utc>>,
    pub worker_threads: usize,
    pub performance: PerformanceSnapshot,
}

/// Failures absorbed while still producing a result.
struct Absorbed {
    training_error: Option<DetectError>,
    detector_errors: Vec<(DetectorKind, DetectError)>,
}

impl Absorbed {
    fn into_outcome(self, result: EnsembleResult) -> DetectionOutcome {
        let failed_detectors: Vec<DetectorKind> =
            self.detector_errors.iter().map(|(kind, _)| *kind).collect();
        let first_detector_error = self.detector_errors.into_iter().map(|(_, e)| e).next();

        match self.training_error.or(first_detector_error) {
            None => DetectionOutcome::Ok(result),
            Some(error) => DetectionOutcome::Degraded {
                result,
                error,
                failed_detectors,
            },
        }
    }
}

pub struct DetectionEngine {
    config: EngineConfig,
    pool: WorkerPool,
    detectors: DetectorSet,
    models: ModelStateManager,
    guard: ReliabilityGuard,
    tracker: PerformanceTracker,
}

impl DetectionEngine {
    pub fn new(config: EngineConfig, guard: GuardConfig) -> Result<Self, DetectError> {
        let detectors = DetectorSet::from_config(&config);
        Self::with_detectors(config, guard, detectors)
    }

    /// Build an engine around a custom detector set.
    pub fn with_detectors(
        config: EngineConfig,
        guard: GuardConfig,
        detectors: DetectorSet,
    ) -> Result<Self, DetectError> {
        let pool = WorkerPool::new(config.resolved_worker_threads())?;
        let tracker = PerformanceTracker::new(config.performance_window);
        Ok(Self {
            pool,
            detectors,
            models: ModelStateManager::new(),
            guard: ReliabilityGuard::new(guard),
            tracker,
            config,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, DetectError> {
        Self::new(config.engine.clone(), config.guard.clone())
    }

    /// Score a batch of transactions.
    pub async fn detect(&self, batch: Vec<Vec<f64>>) -> DetectionOutcome {
        let started = Instant::now();

        if let Err(e) = self.guard.check() {
            debug!(error = %e, "Detection rejected by open circuit");
            return DetectionOutcome::Fatal(e);
        }

        match self.run(batch, started).await {
            Ok((result, absorbed)) => {
                self.guard.record_success();

                let within_target = result.processing_time_ms <= self.config.processing_target_ms as f64;
                if !within_target {
                    warn!(
                        elapsed_ms = result.processing_time_ms,
                        target_ms = self.config.processing_target_ms,
                        "Detection exceeded processing target"
                    );
                }
                self.tracker.record_detection(
                    result.processing_time_ms,
                    result.total_transactions,
                    result.anomaly_count,
                    result.confidence,
                    within_target,
                );

                info!(
                    transactions = result.total_transactions,
                    anomalies = result.anomaly_count,
                    confidence = result.confidence,
                    elapsed_ms = result.processing_time_ms,
                    "Detection complete"
                );
                absorbed.into_outcome(result)
            }
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "Detection failed");
                self.guard.record_failure(&e);
                self.tracker.record_failure();
                DetectionOutcome::Fatal(e)
            }
        }
    }

    async fn run(
        &self,
        batch: Vec<Vec<f64>>,
        started: Instant,
    ) -> Result<(EnsembleResult, Absorbed), DetectError> {
        let raw = Arc::new(FeatureMatrix::from_rows(batch)?);
        let required = self.config.required_samples(raw.rows());
        if raw.rows() < required {
            return Err(DetectError::InsufficientSamples {
                got: raw.rows(),
                required,
            });
        }

        let acquired = self
            .models
            .acquire(raw.cols(), || {
                let raw = Arc::clone(&raw);
                let detectors = self.detectors.clone();
                async move {
                    self.pool
                        .run(move || train(&raw, &detectors))
                        .await
                        .and_then(|trained| trained)
                }
            })
            .await?;
        let snapshot = acquired.snapshot;

        let features = {
            let raw = Arc::clone(&raw);
            let snapshot = Arc::clone(&snapshot);
            self.pool
                .run(move || prepare_scoring(snapshot.scaler(), &raw))
                .await??
        };
        let features = Arc::new(features);

        let (density, cluster, reconstruction) = tokio::join!(
            self.score(DetectorKind::Density, &snapshot, &features),
            self.score(DetectorKind::Cluster, &snapshot, &features),
            self.score(DetectorKind::Reconstruction, &snapshot, &features),
        );

        let mut detector_errors = Vec::new();
        let mut take = |kind: DetectorKind, (scores, error): (Vec<f64>, Option<DetectError>)| {
            if let Some(e) = error {
                detector_errors.push((kind, e));
            }
            scores
        };
        let scores = DetectorScores {
            density: take(DetectorKind::Density, density),
            cluster: take(DetectorKind::Cluster, cluster),
            reconstruction: take(DetectorKind::Reconstruction, reconstruction),
        };

        let combined = scores.combine(&self.config.weights);
        let est = estimate(&combined, &scores, &self.config);
        let anomaly_count = est.anomalous_indices.len();

        let result = EnsembleResult {
            total_transactions: combined.len(),
            scores: combined,
            anomalous_indices: est.anomalous_indices,
            threshold: est.threshold,
            confidence: est.confidence,
            method_agreement: est.method_agreement,
            anomaly_count,
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            model_version: Some(snapshot.version().to_string()),
            trained_at: Some(snapshot.trained_at()),
            error: None,
        };

        Ok((
            result,
            Absorbed {
                training_error: acquired.training_error,
                detector_errors,
            },
        ))
    }

    /// Score one detector on the pool. Never fails: errors, including a
    /// panicking job, become neutral scores.
    async fn score(
        &self,
        kind: DetectorKind,
        snapshot: &Arc<SnapshotSet>,
        features: &Arc<FeatureMatrix>,
    ) -> (Vec<f64>, Option<DetectError>) {
        let rows = features.rows();
        let detector = Arc::clone(self.detectors.get(kind));
        let snapshot = Arc::clone(snapshot);
        let features = Arc::clone(features);

        match self
            .pool
            .run(move || detector.score_or_neutral(snapshot.get(kind), &features))
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(detector = %kind, error = %e, "Scoring job failed, contributing neutral scores");
                (vec![0.0; rows], Some(scoring_failure(kind, e.to_string())))
            }
        }
    }

    /// Mark the models untrained and clear the circuit breaker.
    pub async fn reset_models(&self) {
        self.models.reset().await;
        self.guard.reset();
        info!("Detection engine reset");
    }

    pub async fn health_status(&self) -> HealthStatus {
        let models = self.models.state().await;
        let reliability = self.guard.state();
        HealthStatus {
            trained: models.trained,
            version: models.version,
            fingerprint: models.fingerprint,
            error_count: reliability.consecutive_errors,
            circuit_open: reliability.circuit_open,
            last_error_at: reliability.last_error_at,
            worker_threads: self.pool.num_threads(),
            performance: self.tracker.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_engine() -> DetectionEngine {
        let mut config = EngineConfig::default();
        config.worker_threads = 2;
        config.density.trees = 20;
        config.reconstruction.epochs = 10;
        DetectionEngine::new(config, GuardConfig::default()).unwrap()
    }

    fn rows(n: usize) -> Vec<Vec<f64>> {
        (0..n)
            .map(|i| vec![(i % 4) as f64, (i % 3) as f64 * 2.0, 1.0])
            .collect()
    }

    #[tokio::test]
    async fn detect_produces_full_result() {
        let engine = small_engine();
        let outcome = engine.detect(rows(20)).await;
        assert!(outcome.is_ok());

        let result = outcome.into_result();
        assert_eq!(result.total_transactions, 20);
        assert_eq!(result.scores.len(), 20);
        assert_eq!(result.anomaly_count, result.anomalous_indices.len());
        assert!(result.model_version.as_deref().is_some_and(|v| v.starts_with("v1-")));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn ragged_batch_is_fatal() {
        let engine = small_engine();
        let mut batch = rows(10);
        batch[3].push(9.0);

        let outcome = engine.detect(batch).await;
        assert!(matches!(outcome.error(), Some(DetectError::InvalidInputShape(_))));
        let result = outcome.into_result();
        assert!(result.error.is_some());
        assert!(result.scores.is_empty());
    }

    #[tokio::test]
    async fn empty_batch_is_insufficient() {
        let engine = small_engine();
        let outcome = engine.detect(Vec::new()).await;
        assert!(matches!(
            outcome.error(),
            Some(DetectError::InsufficientSamples { got: 0, required: 5 })
        ));
    }

    #[tokio::test]
    async fn health_reflects_training() {
        let engine = small_engine();
        let before = engine.health_status().await;
        assert!(!before.trained);
        assert_eq!(before.worker_threads, 2);

        engine.detect(rows(12)).await;
        let after = engine.health_status().await;
        assert!(after.trained);
        assert_eq!(after.fingerprint, Some(3));
        assert_eq!(after.performance.total_detections, 1);
        assert_eq!(after.error_count, 0);
    }
}
