use std::sync::Arc;

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Result, ScreenError};
use crate::logging::OperationTimer;
use crate::metrics::ScreeningMetrics;
use crate::models::{CallResponse, Decision, DecisionReason, IncomingCall, NewBlockedEvent, RuleSnapshot, Settings};
use crate::normalizer::normalize;
use crate::policy::ScreeningPolicy;
use crate::repository::{EventLog, RuleRepository};
use crate::validation::InputValidator;

/// Result of screening one call
#[derive(Debug)]
pub struct ScreeningOutcome {
    pub decision: Decision,
    pub response: CallResponse,
    /// Background append of the blocked-call event, present only when the call was blocked
    pub event_task: Option<JoinHandle<()>>,
}

/// Call-handling host: reads the rules, decides, answers and logs blocked calls
pub struct ScreeningService<R, L> {
    rules: Arc<R>,
    events: Arc<L>,
    policy: ScreeningPolicy,
    runtime: Handle,
    metrics: ScreeningMetrics,
}

impl<R, L> ScreeningService<R, L>
where
    R: RuleRepository + 'static,
    L: EventLog + 'static,
{
    pub fn new(rules: Arc<R>, events: Arc<L>, policy: ScreeningPolicy, runtime: Handle) -> Self {
        Self {
            rules,
            events,
            policy,
            runtime,
            metrics: ScreeningMetrics::default(),
        }
    }

    /// Build a service that spawns event appends on the current tokio runtime
    pub fn on_current_runtime(rules: Arc<R>, events: Arc<L>, policy: ScreeningPolicy) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| ScreenError::Other(format!("no tokio runtime: {e}")))?;
        Ok(Self::new(rules, events, policy, runtime))
    }

    /// Screen an incoming call.
    ///
    /// Never fails: when the rule store cannot be read the call is decided
    /// against an empty rule set with blocking of unknown callers off.
    pub fn screen(&self, call: &IncomingCall) -> ScreeningOutcome {
        let timer = OperationTimer::new("screen_call");
        let call = IncomingCall {
            caller_id: call.caller_id.as_deref().map(InputValidator::sanitize_caller_id),
            presentation: call.presentation,
        };

        let settings = self.load_settings();
        let rules = self.load_rules();
        let decision = self.policy.decide_call(&call, &rules, &settings);
        let response = CallResponse::from(&decision);

        debug!(
            reason = %decision.reason,
            block = decision.block,
            "Call screened"
        );
        self.metrics.record_decision(decision.reason, decision.block, timer.elapsed());

        let event_task = decision
            .block
            .then(|| self.log_blocked_call(blocked_event(&call, &decision, &rules)));

        ScreeningOutcome {
            decision,
            response,
            event_task,
        }
    }

    fn load_settings(&self) -> Settings {
        self.rules.settings().unwrap_or_else(|e| {
            warn!(error = %e, "Settings unavailable, screening with fail-open defaults");
            self.metrics.record_repository_error("settings");
            Settings::fail_open()
        })
    }

    fn load_rules(&self) -> RuleSnapshot {
        self.rules.snapshot().unwrap_or_else(|e| {
            warn!(error = %e, "Block rules unavailable, screening with no rules");
            self.metrics.record_repository_error("rules");
            RuleSnapshot {
                default_region: self.rules.default_region(),
                ..RuleSnapshot::default()
            }
        })
    }

    fn log_blocked_call(&self, event: NewBlockedEvent) -> JoinHandle<()> {
        let events = Arc::clone(&self.events);
        let metrics = self.metrics;
        self.runtime.spawn(async move {
            match events.append(event).await {
                Ok(stored) => {
                    metrics.record_event_append(true);
                    debug!(id = stored.id, "Blocked call logged");
                }
                Err(e) => {
                    metrics.record_event_append(false);
                    warn!(error = %e, "Failed to log blocked call");
                }
            }
        })
    }
}

/// Event for a blocked call: the caller's E.164 form when it normalizes, the
/// raw caller id otherwise, nothing for anonymous callers
fn blocked_event(call: &IncomingCall, decision: &Decision, rules: &RuleSnapshot) -> NewBlockedEvent {
    let e164 = match (decision.reason, call.caller_id.as_deref().map(str::trim)) {
        (DecisionReason::Unknown, _) | (_, None | Some("")) => None,
        (_, Some(number)) => Some(
            normalize(number, rules.default_region.as_deref())
                .e164
                .unwrap_or_else(|| number.to_string()),
        ),
    };
    NewBlockedEvent {
        e164,
        timestamp: Utc::now(),
    }
}
