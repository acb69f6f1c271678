//! Circuit breaker around the detection pipeline.
//!
//! Closed until `error_limit` consecutive failures, then open: calls fail
//! fast without touching the detectors. Once `timeout` has elapsed since the
//! last failure the next check closes the circuit and clears the counter.
//! There is no half-open probe.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Utc};
use fraudlens_core::config::GuardConfig;
use fraudlens_core::DetectError;
use serde::Serialize;
use tracing::{info, warn};

/// Externally visible breaker state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReliabilityState {
    pub consecutive_errors: u32,
    pub circuit_open: bool,
    pub last_error_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Inner {
    consecutive_errors: u32,
    circuit_open: bool,
    last_error_at: Option<DateTime<Utc>>,
    last_error_instant: Option<Instant>,
}

#[derive(Debug)]
pub struct ReliabilityGuard {
    config: GuardConfig,
    inner: Mutex<Inner>,
}

impl ReliabilityGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Gate a call. Closes an expired open circuit as a side effect.
    pub fn check(&self) -> Result<(), DetectError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if !inner.circuit_open {
            return Ok(());
        }

        let timeout = self.config.timeout();
        let elapsed = inner
            .last_error_instant
            .map(|t| t.elapsed())
            .unwrap_or(timeout);

        if elapsed >= timeout {
            inner.circuit_open = false;
            inner.consecutive_errors = 0;
            info!("Circuit closed after {}ms cool-down", timeout.as_millis());
            return Ok(());
        }

        let remaining = timeout - elapsed;
        let retry_after_secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
        Err(DetectError::CircuitOpen { retry_after_secs })
    }

    pub fn record_failure(&self, error: &DetectError) {
        if !error.counts_as_failure() {
            return;
        }

        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.consecutive_errors = inner.consecutive_errors.saturating_add(1);
        inner.last_error_at = Some(Utc::now());
        inner.last_error_instant = Some(Instant::now());

        if !inner.circuit_open && inner.consecutive_errors >= self.config.error_limit {
            inner.circuit_open = true;
            warn!(
                consecutive_errors = inner.consecutive_errors,
                error = %error,
                "Circuit opened"
            );
        }
    }

    /// Only clears the counter when `reset_on_success` is enabled.
    pub fn record_success(&self) {
        if !self.config.reset_on_success {
            return;
        }
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.consecutive_errors = 0;
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *inner = Inner::default();
    }

    pub fn state(&self) -> ReliabilityState {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        ReliabilityState {
            consecutive_errors: inner.consecutive_errors,
            circuit_open: inner.circuit_open,
            last_error_at: inner.last_error_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn guard(limit: u32, timeout_ms: u64) -> ReliabilityGuard {
        ReliabilityGuard::new(GuardConfig {
            error_limit: limit,
            timeout_ms,
            reset_on_success: false,
        })
    }

    fn failure() -> DetectError {
        DetectError::TrainingFailure("diverged".into())
    }

    #[test]
    fn opens_at_limit() {
        let g = guard(3, 60_000);
        for _ in 0..2 {
            g.record_failure(&failure());
            assert!(g.check().is_ok());
        }
        g.record_failure(&failure());

        let state = g.state();
        assert!(state.circuit_open);
        assert_eq!(state.consecutive_errors, 3);
        assert!(state.last_error_at.is_some());
        assert!(matches!(
            g.check(),
            Err(DetectError::CircuitOpen { retry_after_secs }) if retry_after_secs > 0
        ));
    }

    #[test]
    fn closes_after_timeout() {
        let g = guard(1, 20);
        g.record_failure(&failure());
        assert!(g.check().is_err());

        std::thread::sleep(Duration::from_millis(40));
        assert!(g.check().is_ok());
        let state = g.state();
        assert!(!state.circuit_open);
        assert_eq!(state.consecutive_errors, 0);
    }

    #[test]
    fn success_keeps_counter_by_default() {
        let g = guard(5, 60_000);
        g.record_failure(&failure());
        g.record_failure(&failure());
        g.record_success();
        assert_eq!(g.state().consecutive_errors, 2);
    }

    #[test]
    fn success_resets_when_enabled() {
        let g = ReliabilityGuard::new(GuardConfig {
            error_limit: 5,
            timeout_ms: 60_000,
            reset_on_success: true,
        });
        g.record_failure(&failure());
        g.record_success();
        assert_eq!(g.state().consecutive_errors, 0);
    }

    #[test]
    fn circuit_open_is_not_counted() {
        let g = guard(1, 60_000);
        g.record_failure(&DetectError::CircuitOpen { retry_after_secs: 1 });
        assert_eq!(g.state().consecutive_errors, 0);
        assert!(!g.state().circuit_open);
    }

    #[test]
    fn reset_clears_everything() {
        let g = guard(1, 60_000);
        g.record_failure(&failure());
        g.reset();
        assert_eq!(
            g.state(),
            ReliabilityState {
                consecutive_errors: 0,
                circuit_open: false,
                last_error_at: None,
            }
        );
        assert!(g.check().is_ok());
    }
}
