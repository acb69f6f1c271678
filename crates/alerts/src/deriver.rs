//! Turns an ensemble result into prioritized fraud alerts.

use chrono::Utc;
use fraudlens_core::config::AlertConfig;
use fraudlens_core::EnsembleResult;
use tracing::{debug, info};
use uuid::Uuid;

use crate::alert::{FraudAlert, RiskLevel};
use crate::interpretation::Interpretation;

/// Fraud probability blend: combined anomaly score vs interpretive confidence.
const SCORE_WEIGHT: f64 = 0.8;
const INTERPRETIVE_SCORE_WEIGHT: f64 = 0.2;
/// Overall confidence blend: ensemble vs interpretive confidence.
const ENSEMBLE_CONFIDENCE_WEIGHT: f64 = 0.6;
const INTERPRETIVE_CONFIDENCE_WEIGHT: f64 = 0.4;
/// False-positive blend: detector disagreement vs external estimate.
const DISAGREEMENT_WEIGHT: f64 = 0.6;
const EXTERNAL_FP_WEIGHT: f64 = 0.4;
/// External false-positive likelihood assumed without an interpretation.
const DEFAULT_EXTERNAL_FP: f64 = 0.5;

pub struct AlertDeriver {
    config: AlertConfig,
}

impl AlertDeriver {
    pub fn new(config: AlertConfig) -> Self {
        Self { config }
    }

    /// One alert per flagged transaction that clears both the priority and
    /// the confidence thresholds. Failed results never produce alerts.
    pub fn derive(
        &self,
        result: &EnsembleResult,
        interpretation: Option<&Interpretation>,
    ) -> Vec<FraudAlert> {
        if let Some(error) = &result.error {
            debug!(error = %error, "Skipping alert derivation for failed detection");
            return Vec::new();
        }

        let interpretation = interpretation.map(Interpretation::sanitized);
        let interpretive_confidence = interpretation
            .as_ref()
            .map_or(result.confidence, |i| i.confidence);
        let external_fp = interpretation
            .as_ref()
            .map_or(DEFAULT_EXTERNAL_FP, |i| i.false_positive_likelihood);

        let confidence_score = (ENSEMBLE_CONFIDENCE_WEIGHT * result.confidence
            + INTERPRETIVE_CONFIDENCE_WEIGHT * interpretive_confidence)
            .clamp(0.0, 1.0);
        let false_positive_likelihood = ((1.0 - result.method_agreement) * DISAGREEMENT_WEIGHT
            + external_fp * EXTERNAL_FP_WEIGHT)
            .clamp(0.0, 1.0);

        if confidence_score < self.config.confidence_threshold {
            debug!(
                confidence_score,
                threshold = self.config.confidence_threshold,
                "Overall confidence below alert threshold"
            );
            return Vec::new();
        }

        let escalated = interpretation
            .as_ref()
            .is_some_and(|i| i.risk_level == Some(RiskLevel::Critical));
        let timestamp = Utc::now();

        let alerts: Vec<FraudAlert> = result
            .anomalies()
            .filter_map(|(index, score)| {
                let fraud_probability = (SCORE_WEIGHT * score
                    + INTERPRETIVE_SCORE_WEIGHT * interpretive_confidence)
                    .clamp(0.0, 1.0);
                if fraud_probability < self.config.priority_threshold {
                    return None;
                }

                let risk_level = if escalated || fraud_probability >= self.config.critical_threshold {
                    RiskLevel::Critical
                } else {
                    RiskLevel::High
                };
                let auto_block_recommended = fraud_probability >= self.config.auto_block_threshold;
                let requires_investigation = !auto_block_recommended
                    || false_positive_likelihood >= self.config.investigation_fp_threshold;
                let recommended_actions = interpretation
                    .as_ref()
                    .filter(|i| !i.recommended_actions.is_empty())
                    .map_or_else(|| risk_level.default_actions(), |i| i.recommended_actions.clone());

                Some(FraudAlert {
                    alert_id: Uuid::new_v4(),
                    transaction_index: index,
                    fraud_probability,
                    confidence_score,
                    false_positive_likelihood,
                    risk_level,
                    recommended_actions,
                    auto_block_recommended,
                    requires_investigation,
                    model_version: result.model_version.clone(),
                    timestamp,
                })
            })
            .collect();

        if !alerts.is_empty() {
            info!(
                alerts = alerts.len(),
                anomalies = result.anomaly_count,
                confidence_score,
                "Fraud alerts derived"
            );
        }
        alerts
    }
}

impl Default for AlertDeriver {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use fraudlens_core::DetectError;

    use super::*;

    fn result(scores: Vec<f64>, flagged: &[usize], confidence: f64, agreement: f64) -> EnsembleResult {
        let anomalous_indices: BTreeSet<usize> = flagged.iter().copied().collect();
        EnsembleResult {
            total_transactions: scores.len(),
            anomaly_count: anomalous_indices.len(),
            scores,
            anomalous_indices,
            threshold: 0.5,
            confidence,
            method_agreement: agreement,
            processing_time_ms: 1.0,
            model_version: Some("v1-20260101000000".into()),
            trained_at: None,
            error: None,
        }
    }

    #[test]
    fn without_interpretation_uses_ensemble_confidence() {
        let r = result(vec![0.1, 0.95, 1.0], &[1, 2], 0.9, 0.8);
        let alerts = AlertDeriver::default().derive(&r, None);

        assert_eq!(alerts.len(), 2);
        let a = &alerts[0];
        assert_eq!(a.transaction_index, 1);
        // 0.8 * 0.95 + 0.2 * 0.9
        assert!((a.fraud_probability - 0.94).abs() < 1e-12);
        assert!((a.confidence_score - 0.9).abs() < 1e-12);
        // 0.2 * 0.6 + 0.5 * 0.4
        assert!((a.false_positive_likelihood - 0.32).abs() < 1e-12);
        assert_eq!(a.risk_level, RiskLevel::High);
        assert!(!a.auto_block_recommended);
        assert!(a.requires_investigation);
        assert_eq!(a.recommended_actions, RiskLevel::High.default_actions());

        let b = &alerts[1];
        assert!((b.fraud_probability - 0.98).abs() < 1e-12);
        assert_eq!(b.risk_level, RiskLevel::Critical);
        assert_ne!(a.alert_id, b.alert_id);
    }

    #[test]
    fn interpretation_feeds_every_metric() {
        let r = result(vec![1.0, 0.0], &[0], 0.8, 1.0);
        let interp = Interpretation {
            confidence: 1.0,
            false_positive_likelihood: 0.1,
            risk_level: None,
            recommended_actions: vec!["call_customer".into()],
        };
        let alerts = AlertDeriver::default().derive(&r, Some(&interp));

        assert_eq!(alerts.len(), 1);
        let a = &alerts[0];
        assert!((a.fraud_probability - 1.0).abs() < 1e-12);
        assert!((a.confidence_score - 0.88).abs() < 1e-12);
        assert!((a.false_positive_likelihood - 0.04).abs() < 1e-12);
        assert!(a.auto_block_recommended);
        assert!(!a.requires_investigation);
        assert_eq!(a.recommended_actions, vec!["call_customer".to_string()]);
    }

    #[test]
    fn below_priority_threshold_is_dropped() {
        let r = result(vec![0.85, 0.2], &[0], 0.9, 1.0);
        // 0.8 * 0.85 + 0.2 * 0.9 = 0.86
        assert!(AlertDeriver::default().derive(&r, None).is_empty());
    }

    #[test]
    fn low_confidence_suppresses_alerts() {
        let r = result(vec![1.0, 0.0], &[0], 0.5, 1.0);
        assert!(AlertDeriver::default().derive(&r, None).is_empty());
    }

    #[test]
    fn critical_interpretation_escalates() {
        let r = result(vec![0.95, 0.0], &[0], 0.9, 1.0);
        let interp = Interpretation {
            confidence: 0.9,
            risk_level: Some(RiskLevel::Critical),
            ..Default::default()
        };
        let alerts = AlertDeriver::default().derive(&r, Some(&interp));
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].fraud_probability < 0.95);
        assert_eq!(alerts[0].risk_level, RiskLevel::Critical);
        assert_eq!(alerts[0].recommended_actions, RiskLevel::Critical.default_actions());
    }

    #[test]
    fn failed_result_yields_nothing() {
        let r = EnsembleResult::failed(&DetectError::CircuitOpen { retry_after_secs: 30 });
        assert!(AlertDeriver::default().derive(&r, None).is_empty());
    }

    #[test]
    fn thresholds_are_configurable() {
        let r = result(vec![0.5, 0.0], &[0], 0.9, 1.0);
        let deriver = AlertDeriver::new(AlertConfig {
            priority_threshold: 0.5,
            ..AlertConfig::default()
        });
        let alerts = deriver.derive(&r, None);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].risk_level, RiskLevel::High);
    }
}
