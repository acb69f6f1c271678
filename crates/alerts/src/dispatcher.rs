//! Routes alerts to every configured sink.
//!
//! Individual sink failures don't block other sinks.

use std::time::Instant;

use serde::Serialize;

use crate::alert::FraudAlert;
use crate::sink::AlertSink;

/// Result of delivering one batch of alerts to a single sink.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryResult {
    pub sink: String,
    pub alerts: usize,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

#[derive(Default)]
pub struct AlertDispatcher {
    sinks: Vec<Box<dyn AlertSink>>,
}

impl AlertDispatcher {
    pub fn new(sinks: Vec<Box<dyn AlertSink>>) -> Self {
        Self { sinks }
    }

    pub fn add_sink(&mut self, sink: Box<dyn AlertSink>) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Deliver `alerts` to every sink, in registration order.
    pub async fn dispatch(&self, alerts: &[FraudAlert]) -> Vec<DeliveryResult> {
        if alerts.is_empty() {
            tracing::debug!("No alerts to dispatch");
            return Vec::new();
        }
        if self.sinks.is_empty() {
            tracing::debug!(alerts = alerts.len(), "No alert sinks configured");
            return Vec::new();
        }

        let mut results = Vec::with_capacity(self.sinks.len());

        for sink in &self.sinks {
            let start = Instant::now();
            let result = sink.deliver(alerts).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let (success, error) = match result {
                Ok(()) => {
                    tracing::info!(
                        sink = sink.sink_name(),
                        alerts = alerts.len(),
                        duration_ms,
                        "Alerts delivered"
                    );
                    (true, None)
                }
                Err(e) => {
                    tracing::warn!(
                        sink = sink.sink_name(),
                        error = %e,
                        duration_ms,
                        "Alert delivery failed"
                    );
                    (false, Some(e.to_string()))
                }
            };

            results.push(DeliveryResult {
                sink: sink.sink_name().to_string(),
                alerts: alerts.len(),
                success,
                error,
                duration_ms,
            });
        }

        results
    }
}
