//! Fraud alerts derived from ensemble detection results.
//!
//! This crate provides:
//! - `FraudAlert` and `RiskLevel`, the alert data model
//! - `Interpretation`, the optional narrative assessment an alert can draw on
//! - `AlertDeriver`, which turns an `EnsembleResult` into prioritized alerts
//! - `AlertSink` trait with log and JSON-lines sinks, plus a dispatcher

pub mod alert;
pub mod deriver;
pub mod dispatcher;
pub mod interpretation;
pub mod sink;

pub use alert::{FraudAlert, RiskLevel};
pub use deriver::AlertDeriver;
pub use dispatcher::{AlertDispatcher, DeliveryResult};
pub use interpretation::Interpretation;
pub use sink::{AlertSink, JsonLinesSink, LogSink, SinkError};
