//! Integration tests for the screening policy

use std::sync::Arc;

use call_screen::environment::{CallEnvironment, EmergencyNumbers};
use call_screen::models::{
    DecisionReason, IncomingCall, NewPrefixRule, Presentation, RuleSnapshot, Settings,
};
use call_screen::policy::ScreeningPolicy;
use chrono::Utc;
use mockall::mock;

mock! {
    pub Environment {}

    impl CallEnvironment for Environment {
        fn is_emergency_number(&self, raw: &str) -> bool;
    }
}

fn chile_rules(numbers: &[&str], prefixes: Vec<NewPrefixRule>) -> RuleSnapshot {
    RuleSnapshot {
        default_region: Some("CL".to_string()),
        blocked_numbers: numbers.iter().map(ToString::to_string).collect(),
        prefix_rules: prefixes
            .into_iter()
            .zip(1..)
            .map(|(rule, id)| rule.into_rule(id, Utc::now()))
            .collect(),
    }
}

fn default_policy() -> ScreeningPolicy {
    ScreeningPolicy::new(Arc::new(EmergencyNumbers::default()))
}

#[test]
fn test_emergency_wins_over_blocked_number() {
    let mut env = MockEnvironment::new();
    env.expect_is_emergency_number()
        .returning(|raw| raw == "+56987654321");
    let policy = ScreeningPolicy::new(Arc::new(env));
    let rules = chile_rules(&["+56987654321"], vec![NewPrefixRule::national("9")]);

    let decision = policy.decide(Some("+56987654321"), Presentation::Allowed, &rules, &Settings::default());
    assert_eq!(decision.reason, DecisionReason::Emergency);
    assert!(!decision.block);
}

#[test]
fn test_emergency_number_ignores_unknown_setting() {
    let decision = default_policy().decide(
        Some("112"),
        Presentation::Allowed,
        &chile_rules(&[], vec![NewPrefixRule::national("1")]),
        &Settings::default(),
    );
    assert_eq!(decision.reason, DecisionReason::Emergency);
    assert!(!decision.block);
}

#[test]
fn test_anonymous_caller_allowed_when_unknown_blocking_is_off() {
    let settings = Settings {
        block_unknown_enabled: false,
        ..Settings::default()
    };
    let rules = chile_rules(&["+56987654321"], vec![NewPrefixRule::national("9")]);

    for presentation in [Presentation::Restricted, Presentation::Unknown, Presentation::Payphone] {
        let decision = default_policy().decide(None, presentation, &rules, &settings);
        assert_eq!(decision.reason, DecisionReason::Allowed);
        assert!(!decision.block);
    }
}

#[test]
fn test_restricted_presentation_is_unknown_even_with_placeholder_number() {
    let decision = default_policy().decide(
        Some("+56987654321"),
        Presentation::Restricted,
        &RuleSnapshot::default(),
        &Settings::default(),
    );
    assert_eq!(decision.reason, DecisionReason::Unknown);
    assert!(decision.block);
}

#[test]
fn test_missing_caller_id_is_unknown() {
    let decision = default_policy().decide_call(
        &IncomingCall::default(),
        &RuleSnapshot::default(),
        &Settings::default(),
    );
    assert_eq!(decision.reason, DecisionReason::Unknown);
}

#[test]
fn test_blocked_number_in_national_form() {
    let rules = chile_rules(&["+56987654321"], vec![]);
    let decision = default_policy().decide_call(
        &IncomingCall::from_number("9 8765 4321"),
        &rules,
        &Settings::default(),
    );
    assert_eq!(decision.reason, DecisionReason::BlockedNumber);
    assert!(decision.block);
}

#[test]
fn test_blocked_number_wins_over_prefix() {
    let rules = chile_rules(&["+56987654321"], vec![NewPrefixRule::national("98")]);
    let decision = default_policy().decide(Some("+56987654321"), Presentation::Allowed, &rules, &Settings::default());
    assert_eq!(decision.reason, DecisionReason::BlockedNumber);
}

#[test]
fn test_prefix_blocks_when_number_is_not_listed() {
    let rules = chile_rules(&["+56911111111"], vec![NewPrefixRule::by_country(1, "800")]);
    let decision = default_policy().decide(Some("+18005551234"), Presentation::Allowed, &rules, &Settings::default());
    assert_eq!(decision.reason, DecisionReason::BlockedPrefix);
    assert!(decision.block);
}

#[test]
fn test_unmatched_number_is_allowed() {
    let rules = chile_rules(&["+56911111111"], vec![NewPrefixRule::by_country(1, "800")]);
    let decision = default_policy().decide(Some("+56987654321"), Presentation::Allowed, &rules, &Settings::default());
    assert_eq!(decision.reason, DecisionReason::Allowed);
    assert!(!decision.block);
}

#[test]
fn test_decision_carries_settings_flags() {
    let settings = Settings {
        block_unknown_enabled: true,
        skip_call_log_on_block: true,
        skip_notification_on_block: false,
    };
    let decision = default_policy().decide(None, Presentation::Unknown, &RuleSnapshot::default(), &settings);
    assert!(decision.block);
    assert!(decision.skip_call_log);
    assert!(!decision.skip_notification);
}

#[test]
fn test_missing_presentation_defaults_to_allowed() {
    let call = IncomingCall {
        caller_id: Some("+56987654321".to_string()),
        presentation: None,
    };
    let decision = default_policy().decide_call(&call, &RuleSnapshot::default(), &Settings::default());
    assert_eq!(decision.reason, DecisionReason::Allowed);
}
