//! Fraud alert data structures.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Risk level classification, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// Actions recommended when no interpretation supplies its own.
    pub fn default_actions(&self) -> Vec<String> {
        let actions: &[&str] = match self {
            RiskLevel::Low => &["monitor_account"],
            RiskLevel::Medium => &["flag_for_review", "monitor_account"],
            RiskLevel::High => &["manual_review", "verify_customer_identity"],
            RiskLevel::Critical => &[
                "block_transaction",
                "freeze_account",
                "escalate_to_fraud_team",
            ],
        };
        actions.iter().map(|a| a.to_string()).collect()
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A prioritized alert for one flagged transaction. Immutable once built;
/// persisting it is up to the receiving sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudAlert {
    pub alert_id: Uuid,
    /// Row index of the transaction in the scored batch.
    pub transaction_index: usize,
    pub fraud_probability: f64,
    pub confidence_score: f64,
    pub false_positive_likelihood: f64,
    pub risk_level: RiskLevel,
    pub recommended_actions: Vec<String>,
    pub auto_block_recommended: bool,
    pub requires_investigation: bool,
    /// Model version that produced the underlying score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    pub timestamp: DateTime<Utc>,
}
