//! Per-call output of the ensemble engine.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DetectError;

/// Outcome of one `detect` call. Created fresh per invocation and owned by
/// the caller.
///
/// Failed calls produce the same shape with zeroed metrics and `error` set,
/// so pipeline consumers only ever inspect one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleResult {
    /// Combined anomaly score per transaction, each in [0, 1].
    pub scores: Vec<f64>,
    /// Indices whose combined score is strictly above `threshold`.
    pub anomalous_indices: BTreeSet<usize>,
    pub threshold: f64,
    pub confidence: f64,
    /// Pairwise consistency of the detectors' own binary decisions.
    pub method_agreement: f64,
    pub total_transactions: usize,
    pub anomaly_count: usize,
    pub processing_time_ms: f64,
    pub model_version: Option<String>,
    pub trained_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EnsembleResult {
    /// Safe empty result carrying an error message.
    pub fn failed(error: &DetectError) -> Self {
        Self {
            scores: Vec::new(),
            anomalous_indices: BTreeSet::new(),
            threshold: 0.0,
            confidence: 0.0,
            method_agreement: 0.0,
            total_transactions: 0,
            anomaly_count: 0,
            processing_time_ms: 0.0,
            model_version: None,
            trained_at: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// `(index, combined score)` for every flagged transaction, ascending by index.
    pub fn anomalies(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.anomalous_indices
            .iter()
            .filter_map(|&i| self.scores.get(i).map(|&s| (i, s)))
    }
}
