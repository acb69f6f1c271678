//! Rolling performance statistics for health reporting.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Fixed-capacity FIFO; pushing onto a full buffer evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl RingBuffer<f64> {
    pub fn mean(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        self.items.iter().sum::<f64>() / self.items.len() as f64
    }

    pub fn max(&self) -> f64 {
        self.items.iter().copied().fold(0.0, f64::max)
    }
}

/// Point-in-time view of the tracker, embedded in the health report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceSnapshot {
    pub total_detections: u64,
    pub total_transactions: u64,
    pub total_anomalies: u64,
    pub total_failures: u64,
    /// Rolling window statistics.
    pub avg_processing_ms: f64,
    pub max_processing_ms: f64,
    pub avg_confidence: f64,
    /// Fraction of windowed calls that met the processing target.
    pub within_target_ratio: f64,
    pub last_detection_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct Window {
    processing_ms: RingBuffer<f64>,
    confidence: RingBuffer<f64>,
    within_target: RingBuffer<bool>,
    total_detections: u64,
    total_transactions: u64,
    total_anomalies: u64,
    total_failures: u64,
    last_detection_at: Option<DateTime<Utc>>,
}

/// Thread-safe tracker shared by every `detect` call on one engine.
#[derive(Debug)]
pub struct PerformanceTracker {
    inner: Mutex<Window>,
}

impl PerformanceTracker {
    pub fn new(window: usize) -> Self {
        Self {
            inner: Mutex::new(Window {
                processing_ms: RingBuffer::new(window),
                confidence: RingBuffer::new(window),
                within_target: RingBuffer::new(window),
                total_detections: 0,
                total_transactions: 0,
                total_anomalies: 0,
                total_failures: 0,
                last_detection_at: None,
            }),
        }
    }

    pub fn record_detection(
        &self,
        processing_ms: f64,
        transactions: usize,
        anomalies: usize,
        confidence: f64,
        within_target: bool,
    ) {
        let mut w = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        w.processing_ms.push(processing_ms);
        w.confidence.push(confidence);
        w.within_target.push(within_target);
        w.total_detections += 1;
        w.total_transactions += transactions as u64;
        w.total_anomalies += anomalies as u64;
        w.last_detection_at = Some(Utc::now());
    }

    pub fn record_failure(&self) {
        let mut w = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        w.total_failures += 1;
    }

    pub fn snapshot(&self) -> PerformanceSnapshot {
        let w = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let within_target_ratio = if w.within_target.is_empty() {
            0.0
        } else {
            w.within_target.iter().filter(|&&ok| ok).count() as f64 / w.within_target.len() as f64
        };

        PerformanceSnapshot {
            total_detections: w.total_detections,
            total_transactions: w.total_transactions,
            total_anomalies: w.total_anomalies,
            total_failures: w.total_failures,
            avg_processing_ms: w.processing_ms.mean(),
            max_processing_ms: w.processing_ms.max(),
            avg_confidence: w.confidence.mean(),
            within_target_ratio,
            last_detection_at: w.last_detection_at,
        }
    }
}
