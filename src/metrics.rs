use anyhow::Result;
use metrics::{counter, histogram};
use std::time::Duration;

use crate::models::DecisionReason;

/// Metric names emitted by the screening engine
#[derive(Debug, Clone, Copy)]
pub struct ScreeningMetrics {
    pub decisions_total: &'static str,
    pub decision_duration: &'static str,
    pub events_appended_total: &'static str,
    pub repository_errors_total: &'static str,
}

impl Default for ScreeningMetrics {
    fn default() -> Self {
        Self {
            decisions_total: "call_screen_decisions_total",
            decision_duration: "call_screen_decision_duration_seconds",
            events_appended_total: "call_screen_events_appended_total",
            repository_errors_total: "call_screen_repository_errors_total",
        }
    }
}

impl ScreeningMetrics {
    /// Install a no-op global recorder. Hosts that export metrics install
    /// their own recorder instead; calling this twice fails.
    pub fn init() -> Result<()> {
        metrics::set_global_recorder(metrics::NoopRecorder)
            .map_err(|_| anyhow::anyhow!("Failed to initialize metrics recorder: a recorder is already installed"))?;
        Ok(())
    }

    /// Record one screening decision
    pub fn record_decision(&self, reason: DecisionReason, blocked: bool, duration: Duration) {
        counter!(
            self.decisions_total,
            "reason" => reason.as_str(),
            "blocked" => if blocked { "true" } else { "false" }
        )
        .increment(1);
        histogram!(self.decision_duration).record(duration.as_secs_f64());
    }

    /// Record the outcome of appending a blocked-call event
    pub fn record_event_append(&self, success: bool) {
        counter!(
            self.events_appended_total,
            "status" => if success { "success" } else { "error" }
        )
        .increment(1);
    }

    /// Record a failed repository read; `source` is "settings" or "rules"
    pub fn record_repository_error(&self, source: &'static str) {
        counter!(self.repository_errors_total, "source" => source).increment(1);
    }
}
