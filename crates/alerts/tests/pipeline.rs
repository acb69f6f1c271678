//! Detection result → alerts → sink, end to end.

use fraudlens_alerts::{AlertDeriver, AlertDispatcher, FraudAlert, Interpretation, JsonLinesSink, RiskLevel};
use fraudlens_compute::DetectionEngine;
use fraudlens_core::config::{AlertConfig, EngineConfig, GuardConfig};
use fraudlens_core::Config;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn batch() -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(77);
    let mut rows: Vec<Vec<f64>> = (0..200)
        .map(|_| (0..4).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect();
    rows.extend((0..5).map(|i| vec![50.0 + i as f64, -50.0, 50.0, -50.0 - i as f64]));
    rows
}

fn engine() -> DetectionEngine {
    let mut config = EngineConfig::default();
    config.worker_threads = 2;
    DetectionEngine::new(config, GuardConfig::default()).unwrap()
}

#[tokio::test]
async fn injected_fraud_raises_alerts() {
    let result = engine().detect(batch()).await.into_result();
    assert!(result.error.is_none());

    let alerts = AlertDeriver::new(AlertConfig::default()).derive(&result, None);
    assert!(!alerts.is_empty());
    for alert in &alerts {
        assert!(alert.transaction_index >= 200, "alert on inlier {}", alert.transaction_index);
        assert!(alert.fraud_probability >= 0.9);
        assert!(alert.confidence_score >= 0.7);
        assert!(matches!(alert.risk_level, RiskLevel::High | RiskLevel::Critical));
        assert_eq!(alert.model_version, result.model_version);
    }
}

#[tokio::test]
async fn alerts_reach_json_lines_sink() {
    let config = Config::default();
    let result = engine().detect(batch()).await.into_result();
    let interpretation = Interpretation {
        confidence: 0.95,
        false_positive_likelihood: 0.05,
        risk_level: Some(RiskLevel::Critical),
        recommended_actions: vec!["hold_payout".into()],
    };
    let alerts = AlertDeriver::new(config.alerts).derive(&result, Some(&interpretation));
    assert!(!alerts.is_empty());
    assert!(alerts.iter().all(|a| a.risk_level == RiskLevel::Critical));

    let dispatcher = AlertDispatcher::new(vec![Box::new(JsonLinesSink::new(Vec::<u8>::new()))]);
    let delivery = dispatcher.dispatch(&alerts).await;
    assert_eq!(delivery.len(), 1);
    assert!(delivery[0].success);
    assert_eq!(delivery[0].alerts, alerts.len());

    let sink = JsonLinesSink::new(Vec::new());
    fraudlens_alerts::AlertSink::deliver(&sink, &alerts).await.unwrap();
    let written = String::from_utf8(sink.into_inner()).unwrap();
    let parsed: Vec<FraudAlert> = written
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(parsed, alerts);
    assert!(parsed.iter().all(|a| a.recommended_actions == vec!["hold_payout".to_string()]));
}

#[tokio::test]
async fn failed_detection_raises_nothing() {
    let result = engine().detect(vec![vec![1.0]; 2]).await.into_result();
    assert!(result.error.is_some());
    assert!(AlertDeriver::default().derive(&result, None).is_empty());
}
