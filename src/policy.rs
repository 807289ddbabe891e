//! Screening policy
//!
//! One call, one pass, no side effects. The rules are evaluated in the order of
//! [`PRECEDENCE`]; the first rule whose predicate holds decides the call, and a
//! call no rule claims is allowed.
//!
//! ```text
//! emergency ─▶ unknown caller ─▶ blocked number ─▶ blocked prefix ─▶ allowed
//! ```

use std::sync::Arc;

use crate::environment::CallEnvironment;
use crate::matcher;
use crate::models::{Decision, DecisionReason, IncomingCall, Presentation, RuleSnapshot, Settings};
use crate::prefix::PrefixMatcher;

/// Everything a precedence rule may look at
#[derive(Debug, Clone, Copy)]
pub struct CallContext<'a> {
    /// Raw caller id, if the network supplied one
    pub caller_id: Option<&'a str>,
    /// Presentation flag of the call
    pub presentation: Presentation,
    /// Block rules
    pub rules: &'a RuleSnapshot,
    /// Screening settings
    pub settings: &'a Settings,
}

impl<'a> CallContext<'a> {
    /// Caller id with surrounding whitespace removed, `None` when blank
    #[must_use]
    pub fn number(&self) -> Option<&'a str> {
        self.caller_id.map(str::trim).filter(|n| !n.is_empty())
    }

    /// No usable caller id, or a presentation that hides the caller
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.number().is_none() || self.presentation.is_anonymous()
    }
}

type Predicate = fn(&dyn CallEnvironment, &CallContext<'_>) -> bool;

/// One entry of the precedence table
#[derive(Clone, Copy)]
pub struct PrecedenceRule {
    /// Reason reported when this rule decides the call
    pub reason: DecisionReason,
    /// Whether this rule blocks or lets the call through
    pub block: bool,
    applies: Predicate,
}

impl PrecedenceRule {
    /// True if this rule decides the call described by `ctx`
    pub fn applies(&self, env: &dyn CallEnvironment, ctx: &CallContext<'_>) -> bool {
        (self.applies)(env, ctx)
    }
}

impl std::fmt::Debug for PrecedenceRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrecedenceRule")
            .field("reason", &self.reason)
            .field("block", &self.block)
            .finish_non_exhaustive()
    }
}

fn is_emergency(env: &dyn CallEnvironment, ctx: &CallContext<'_>) -> bool {
    ctx.number().is_some_and(|n| env.is_emergency_number(n))
}

fn is_blocked_unknown(_env: &dyn CallEnvironment, ctx: &CallContext<'_>) -> bool {
    ctx.settings.block_unknown_enabled && ctx.is_anonymous()
}

fn is_blocked_number(_env: &dyn CallEnvironment, ctx: &CallContext<'_>) -> bool {
    ctx.number().is_some_and(|n| {
        ctx.rules
            .blocked_numbers
            .iter()
            .any(|stored| matcher::matches(n, stored))
    })
}

fn is_blocked_prefix(_env: &dyn CallEnvironment, ctx: &CallContext<'_>) -> bool {
    ctx.number().is_some_and(|n| {
        PrefixMatcher::new(&ctx.rules.prefix_rules, ctx.rules.default_region.as_deref()).is_blocked(n)
    })
}

/// Screening rules, highest precedence first
pub const PRECEDENCE: [PrecedenceRule; 4] = [
    PrecedenceRule {
        reason: DecisionReason::Emergency,
        block: false,
        applies: is_emergency,
    },
    PrecedenceRule {
        reason: DecisionReason::Unknown,
        block: true,
        applies: is_blocked_unknown,
    },
    PrecedenceRule {
        reason: DecisionReason::BlockedNumber,
        block: true,
        applies: is_blocked_number,
    },
    PrecedenceRule {
        reason: DecisionReason::BlockedPrefix,
        block: true,
        applies: is_blocked_prefix,
    },
];

/// Decides incoming calls against a rule snapshot
#[derive(Clone)]
pub struct ScreeningPolicy {
    environment: Arc<dyn CallEnvironment>,
}

impl ScreeningPolicy {
    /// Create a policy using `environment` for emergency and presentation lookups
    #[must_use]
    pub fn new(environment: Arc<dyn CallEnvironment>) -> Self {
        Self { environment }
    }

    /// Decide a call from its raw caller id and presentation flag
    #[must_use]
    pub fn decide(
        &self,
        caller_id: Option<&str>,
        presentation: Presentation,
        rules: &RuleSnapshot,
        settings: &Settings,
    ) -> Decision {
        let ctx = CallContext {
            caller_id,
            presentation,
            rules,
            settings,
        };

        PRECEDENCE
            .iter()
            .find(|rule| rule.applies(self.environment.as_ref(), &ctx))
            .map_or_else(
                || Decision::new(false, DecisionReason::Allowed, settings),
                |rule| Decision::new(rule.block, rule.reason, settings),
            )
    }

    /// Decide an incoming call, asking the environment for its presentation
    #[must_use]
    pub fn decide_call(&self, call: &IncomingCall, rules: &RuleSnapshot, settings: &Settings) -> Decision {
        let presentation = self.environment.presentation_of(call);
        self.decide(call.caller_id.as_deref(), presentation, rules, settings)
    }
}

impl std::fmt::Debug for ScreeningPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreeningPolicy").finish_non_exhaustive()
    }
}
