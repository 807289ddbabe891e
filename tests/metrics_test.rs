//! Comprehensive unit tests for metrics.rs module

use std::time::Duration;

use call_screen::metrics::ScreeningMetrics;
use call_screen::models::DecisionReason;

#[test]
fn test_metric_names_share_prefix() {
    let metrics = ScreeningMetrics::default();
    for name in [
        metrics.decisions_total,
        metrics.decision_duration,
        metrics.events_appended_total,
        metrics.repository_errors_total,
    ] {
        assert!(name.starts_with("call_screen_"), "{name}");
    }
}

#[test]
fn test_metrics_initialization_only_once() {
    assert!(ScreeningMetrics::init().is_ok());
    assert!(ScreeningMetrics::init().is_err());
}

#[test]
fn test_record_every_decision_reason() {
    let metrics = ScreeningMetrics::default();
    for reason in [
        DecisionReason::Emergency,
        DecisionReason::Unknown,
        DecisionReason::BlockedNumber,
        DecisionReason::BlockedPrefix,
        DecisionReason::Allowed,
    ] {
        let blocked = !matches!(reason, DecisionReason::Emergency | DecisionReason::Allowed);
        metrics.record_decision(reason, blocked, Duration::from_micros(40));
    }
}

#[test]
fn test_record_event_and_repository_outcomes() {
    let metrics = ScreeningMetrics::default();
    metrics.record_event_append(true);
    metrics.record_event_append(false);
    metrics.record_repository_error("settings");
    metrics.record_repository_error("rules");
}
