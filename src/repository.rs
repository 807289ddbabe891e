use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Result, ScreenError};
use crate::models::{BlockedEvent, BlockedNumber, NewBlockedEvent, NewPrefixRule, PrefixRule, RuleSnapshot, Settings};
use crate::validation::InputValidator;

/// Source of the block rules and settings the engine screens against
pub trait RuleRepository: Send + Sync {
    /// ISO region used to resolve numbers dialed without a country code
    fn default_region(&self) -> Option<String>;
    fn settings(&self) -> Result<Settings>;
    /// Canonical E.164 forms of all blocked numbers
    fn blocked_numbers(&self) -> Result<Vec<String>>;
    fn prefix_rules(&self) -> Result<Vec<PrefixRule>>;

    fn block_unknown_enabled(&self) -> Result<bool> {
        Ok(self.settings()?.block_unknown_enabled)
    }

    /// Read all block rules. Implementations backed by shared storage should
    /// override this so the rules come from a single consistent read.
    fn snapshot(&self) -> Result<RuleSnapshot> {
        Ok(RuleSnapshot {
            default_region: self.default_region(),
            blocked_numbers: self.blocked_numbers()?,
            prefix_rules: self.prefix_rules()?,
        })
    }
}

/// Append-only log of blocked calls
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn append(&self, event: NewBlockedEvent) -> Result<BlockedEvent>;
    /// Events at or after `since`, newest first
    async fn events_since(&self, since: DateTime<Utc>) -> Result<Vec<BlockedEvent>>;
}

#[derive(Debug, Default)]
struct RuleState {
    settings: Settings,
    numbers: Vec<BlockedNumber>,
    prefixes: Vec<PrefixRule>,
    next_prefix_id: i64,
}

/// Rule store kept in memory, for hosts without a database and for tests
#[derive(Debug, Default)]
pub struct InMemoryRuleStore {
    default_region: Option<String>,
    state: RwLock<RuleState>,
}

fn poisoned() -> ScreenError {
    ScreenError::Other("rule store lock poisoned".to_string())
}

impl InMemoryRuleStore {
    pub fn new(default_region: Option<String>) -> Self {
        Self {
            default_region,
            state: RwLock::default(),
        }
    }

    pub fn update_settings(&self, settings: Settings) -> Result<()> {
        self.state.write().map_err(|_| poisoned())?.settings = settings;
        Ok(())
    }

    /// Normalize and add a number; adding a number already on the list is a no-op
    pub fn add_blocked_number(&self, raw: &str, region: Option<&str>) -> Result<BlockedNumber> {
        let e164 = InputValidator::normalize_blocked_number(raw, region)?;
        let mut state = self.state.write().map_err(|_| poisoned())?;
        if let Some(existing) = state.numbers.iter().find(|n| n.e164 == e164) {
            return Ok(existing.clone());
        }
        let number = BlockedNumber {
            e164,
            created_at: Utc::now(),
        };
        state.numbers.push(number.clone());
        Ok(number)
    }

    pub fn remove_blocked_number(&self, e164: &str) -> Result<bool> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        let before = state.numbers.len();
        state.numbers.retain(|n| n.e164 != e164);
        Ok(state.numbers.len() != before)
    }

    pub fn add_prefix_rule(&self, rule: NewPrefixRule) -> Result<PrefixRule> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.next_prefix_id += 1;
        let rule = rule.into_rule(state.next_prefix_id, Utc::now());
        state.prefixes.push(rule.clone());
        Ok(rule)
    }

    pub fn remove_prefix_rule(&self, id: i64) -> Result<bool> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        let before = state.prefixes.len();
        state.prefixes.retain(|r| r.id != id);
        Ok(state.prefixes.len() != before)
    }
}

impl RuleRepository for InMemoryRuleStore {
    fn default_region(&self) -> Option<String> {
        self.default_region.clone()
    }

    fn settings(&self) -> Result<Settings> {
        Ok(self.state.read().map_err(|_| poisoned())?.settings)
    }

    fn blocked_numbers(&self) -> Result<Vec<String>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.numbers.iter().map(|n| n.e164.clone()).collect())
    }

    fn prefix_rules(&self) -> Result<Vec<PrefixRule>> {
        Ok(self.state.read().map_err(|_| poisoned())?.prefixes.clone())
    }

    fn snapshot(&self) -> Result<RuleSnapshot> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(RuleSnapshot {
            default_region: self.default_region.clone(),
            blocked_numbers: state.numbers.iter().map(|n| n.e164.clone()).collect(),
            prefix_rules: state.prefixes.clone(),
        })
    }
}

/// Event log kept in memory
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: Mutex<Vec<BlockedEvent>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, event: NewBlockedEvent) -> Result<BlockedEvent> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| ScreenError::Other("event log lock poisoned".to_string()))?;
        let stored = BlockedEvent {
            id: i64::try_from(events.len()).unwrap_or(i64::MAX - 1) + 1,
            e164: event.e164,
            timestamp: event.timestamp,
        };
        events.push(stored.clone());
        Ok(stored)
    }

    async fn events_since(&self, since: DateTime<Utc>) -> Result<Vec<BlockedEvent>> {
        let events = self
            .events
            .lock()
            .map_err(|_| ScreenError::Other("event log lock poisoned".to_string()))?;
        let mut recent: Vec<_> = events.iter().filter(|e| e.timestamp >= since).cloned().collect();
        recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(recent)
    }
}
