//! Integration tests for the call-handling service

use std::sync::Arc;

use async_trait::async_trait;
use call_screen::environment::EmergencyNumbers;
use call_screen::error::{Result, ScreenError};
use call_screen::models::{
    BlockedEvent, DecisionReason, IncomingCall, NewBlockedEvent, NewPrefixRule, Presentation, PrefixRule, Settings,
};
use call_screen::policy::ScreeningPolicy;
use call_screen::repository::{EventLog, InMemoryEventLog, InMemoryRuleStore, RuleRepository};
use call_screen::service::ScreeningService;
use chrono::{DateTime, Utc};
use mockall::mock;

mock! {
    pub Log {}

    #[async_trait]
    impl EventLog for Log {
        async fn append(&self, event: NewBlockedEvent) -> Result<BlockedEvent>;
        async fn events_since(&self, since: DateTime<Utc>) -> Result<Vec<BlockedEvent>>;
    }
}

mock! {
    pub Rules {}

    impl RuleRepository for Rules {
        fn default_region(&self) -> Option<String>;
        fn settings(&self) -> Result<Settings>;
        fn blocked_numbers(&self) -> Result<Vec<String>>;
        fn prefix_rules(&self) -> Result<Vec<PrefixRule>>;
    }
}

fn policy() -> ScreeningPolicy {
    ScreeningPolicy::new(Arc::new(EmergencyNumbers::default()))
}

fn chile_store() -> Arc<InMemoryRuleStore> {
    Arc::new(InMemoryRuleStore::new(Some("CL".to_string())))
}

#[tokio::test]
async fn test_blocked_call_is_logged_with_e164() {
    let rules = chile_store();
    rules.add_blocked_number("987654321", Some("CL")).unwrap();
    let events = Arc::new(InMemoryEventLog::new());
    let service = ScreeningService::on_current_runtime(Arc::clone(&rules), Arc::clone(&events), policy()).unwrap();

    let outcome = service.screen(&IncomingCall::from_number("9 8765 4321"));
    assert!(outcome.decision.block);
    assert_eq!(outcome.decision.reason, DecisionReason::BlockedNumber);
    assert!(outcome.response.disallow_call);
    assert!(outcome.response.reject_call);

    outcome.event_task.expect("blocked call should be logged").await.unwrap();
    let logged = events.events_since(Utc::now() - chrono::Duration::minutes(1)).await.unwrap();
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].e164.as_deref(), Some("+56987654321"));
}

#[tokio::test]
async fn test_allowed_call_is_not_logged() {
    let events = Arc::new(InMemoryEventLog::new());
    let service = ScreeningService::on_current_runtime(chile_store(), Arc::clone(&events), policy()).unwrap();

    let outcome = service.screen(&IncomingCall::from_number("+16502530000"));
    assert!(!outcome.decision.block);
    assert!(!outcome.response.disallow_call);
    assert!(outcome.event_task.is_none());
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_anonymous_block_logs_no_number() {
    let events = Arc::new(InMemoryEventLog::new());
    let service = ScreeningService::on_current_runtime(chile_store(), Arc::clone(&events), policy()).unwrap();

    let outcome = service.screen(&IncomingCall::anonymous(Presentation::Restricted));
    assert_eq!(outcome.decision.reason, DecisionReason::Unknown);
    outcome.event_task.unwrap().await.unwrap();

    let logged = events.events_since(DateTime::<Utc>::MIN_UTC).await.unwrap();
    assert_eq!(logged.len(), 1);
    assert!(logged[0].e164.is_none());
}

#[tokio::test]
async fn test_event_log_failure_is_swallowed() {
    let rules = chile_store();
    rules
        .add_prefix_rule(NewPrefixRule::by_country(1, "800"))
        .unwrap();

    let mut events = MockLog::new();
    events
        .expect_append()
        .times(1)
        .returning(|_| Err(ScreenError::Other("disk full".to_string())));
    let service = ScreeningService::on_current_runtime(rules, Arc::new(events), policy()).unwrap();

    let outcome = service.screen(&IncomingCall::from_number("+18005551234"));
    assert_eq!(outcome.decision.reason, DecisionReason::BlockedPrefix);
    assert!(outcome.response.reject_call);

    // The failed append neither panics the task nor changes the decision
    outcome.event_task.unwrap().await.unwrap();
}

#[tokio::test]
async fn test_unavailable_repository_fails_open() {
    let mut rules = MockRules::new();
    rules.expect_default_region().returning(|| Some("CL".to_string()));
    rules
        .expect_settings()
        .returning(|| Err(ScreenError::Other("database locked".to_string())));
    rules
        .expect_blocked_numbers()
        .returning(|| Err(ScreenError::Other("database locked".to_string())));
    rules
        .expect_prefix_rules()
        .returning(|| Err(ScreenError::Other("database locked".to_string())));

    let mut events = MockLog::new();
    events.expect_append().never();
    let service = ScreeningService::on_current_runtime(Arc::new(rules), Arc::new(events), policy()).unwrap();

    let anonymous = service.screen(&IncomingCall::anonymous(Presentation::Unknown));
    assert_eq!(anonymous.decision.reason, DecisionReason::Allowed);
    assert!(!anonymous.decision.block);
    assert!(anonymous.event_task.is_none());

    let known = service.screen(&IncomingCall::from_number("+56987654321"));
    assert_eq!(known.decision.reason, DecisionReason::Allowed);
}

#[tokio::test]
async fn test_emergency_call_always_rings() {
    let rules = chile_store();
    rules.add_prefix_rule(NewPrefixRule::national("1")).unwrap();
    let events = Arc::new(InMemoryEventLog::new());
    let service = ScreeningService::on_current_runtime(rules, Arc::clone(&events), policy()).unwrap();

    let outcome = service.screen(&IncomingCall::from_number("112"));
    assert_eq!(outcome.decision.reason, DecisionReason::Emergency);
    assert!(!outcome.response.disallow_call);
    assert!(outcome.event_task.is_none());
}

#[test]
fn test_service_needs_a_runtime() {
    let result = ScreeningService::on_current_runtime(chile_store(), Arc::new(InMemoryEventLog::new()), policy());
    assert!(result.is_err());
}
