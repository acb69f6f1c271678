//! Alert sink trait and the built-in sinks.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::warn;

use crate::alert::FraudAlert;

/// Errors that can occur while delivering alerts.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

/// Receives derived alerts. Persistence and forwarding are the sink's job.
#[async_trait::async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, alerts: &[FraudAlert]) -> Result<(), SinkError>;

    /// Human-readable name for this sink (e.g., "log", "jsonl").
    fn sink_name(&self) -> &str;
}

/// Emits one `warn!` event per alert.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait::async_trait]
impl AlertSink for LogSink {
    async fn deliver(&self, alerts: &[FraudAlert]) -> Result<(), SinkError> {
        for alert in alerts {
            warn!(
                alert_id = %alert.alert_id,
                transaction = alert.transaction_index,
                risk = %alert.risk_level,
                fraud_probability = alert.fraud_probability,
                auto_block = alert.auto_block_recommended,
                "Fraud alert"
            );
        }
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "log"
    }
}

/// Writes alerts as newline-delimited JSON to any async writer.
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W> JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait::async_trait]
impl<W> AlertSink for JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn deliver(&self, alerts: &[FraudAlert]) -> Result<(), SinkError> {
        let mut buf = Vec::new();
        for alert in alerts {
            serde_json::to_writer(&mut buf, alert)?;
            buf.push(b'\n');
        }

        let mut writer = self.writer.lock().await;
        writer.write_all(&buf).await?;
        writer.flush().await?;
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "jsonl"
    }
}
