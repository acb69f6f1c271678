//! Optional narrative assessment supplied alongside a detection result.

use serde::{Deserialize, Serialize};

use crate::alert::RiskLevel;

/// Confidence and false-positive estimate from an external interpreter.
/// Every field is optional on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Interpretation {
    pub confidence: f64,
    pub false_positive_likelihood: f64,
    pub risk_level: Option<RiskLevel>,
    pub recommended_actions: Vec<String>,
}

impl Default for Interpretation {
    fn default() -> Self {
        Self {
            confidence: 0.5,
            false_positive_likelihood: 0.5,
            risk_level: None,
            recommended_actions: Vec::new(),
        }
    }
}

impl Interpretation {
    /// Clamp probabilities into [0, 1]; non-finite values fall back to 0.5.
    pub fn sanitized(&self) -> Self {
        let unit = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.5 };
        Self {
            confidence: unit(self.confidence),
            false_positive_likelihood: unit(self.false_positive_likelihood),
            risk_level: self.risk_level,
            recommended_actions: self.recommended_actions.clone(),
        }
    }
}
