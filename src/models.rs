//! Data models for call screening
//!
//! This module contains the data structures shared by the decision engine, the
//! rule stores and the call-handling host: parsed numbers, block rules, settings,
//! decisions and blocked-call events.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ScreenError;

/// Canonical result of normalizing a raw caller id
///
/// Derived per decision and never stored. When `is_valid` is false `e164` is
/// always `None`; `national_significant_number` only ever holds ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedNumber {
    /// Country calling code, if one could be resolved
    pub country_code: Option<u16>,
    /// National significant number (digits only, may be empty)
    pub national_significant_number: String,
    /// True if the number satisfies its country's numbering plan
    pub is_valid: bool,
    /// Canonical "+<cc><nsn>" form, present only for valid numbers
    pub e164: Option<String>,
}

impl ParsedNumber {
    /// The result of a failed parse: no country, no digits, not valid
    #[must_use]
    pub const fn unparseable() -> Self {
        Self {
            country_code: None,
            national_significant_number: String::new(),
            is_valid: false,
            e164: None,
        }
    }

    /// True if the parse resolved a country code
    #[must_use]
    pub const fn is_parsed(&self) -> bool {
        self.country_code.is_some()
    }
}

/// A number on the block list, stored in canonical E.164 form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedNumber {
    /// Canonical E.164 string, unique across the block list
    pub e164: String,
    /// When the number was added
    pub created_at: DateTime<Utc>,
}

/// How a prefix rule scopes its digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrefixScope {
    /// Prefix applies to the NSN of numbers from one country code
    ByCountry,
    /// Prefix applies to the NSN of any number, whatever its country
    National,
}

impl PrefixScope {
    /// Stable storage name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ByCountry => "BY_COUNTRY",
            Self::National => "NATIONAL",
        }
    }
}

impl fmt::Display for PrefixScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrefixScope {
    type Err = ScreenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BY_COUNTRY" => Ok(Self::ByCountry),
            "NATIONAL" => Ok(Self::National),
            other => Err(ScreenError::InvalidPrefix(format!("unknown prefix scope: {other}"))),
        }
    }
}

/// A stored prefix block rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixRule {
    /// Generated identifier
    pub id: i64,
    /// Whether the rule is tied to a country code
    pub scope: PrefixScope,
    /// Country calling code; `Some` exactly when `scope` is `ByCountry`
    pub country_code: Option<u16>,
    /// Non-empty digit string matched against the start of the NSN
    pub prefix_digits: String,
    /// When the rule was added
    pub created_at: DateTime<Utc>,
}

impl PrefixRule {
    /// Human readable form: `+56 600*` or `800* (NSN)`
    #[must_use]
    pub fn label(&self) -> String {
        match (self.scope, self.country_code) {
            (PrefixScope::ByCountry, Some(cc)) => format!("+{cc} {}*", self.prefix_digits),
            _ => format!("{}* (NSN)", self.prefix_digits),
        }
    }
}

/// A validated prefix rule that has not been stored yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPrefixRule {
    /// Rule scope
    pub scope: PrefixScope,
    /// Country calling code for `ByCountry` rules
    pub country_code: Option<u16>,
    /// Digits to match
    pub prefix_digits: String,
}

impl NewPrefixRule {
    /// A rule over the NSN of any country
    #[must_use]
    pub fn national(prefix_digits: impl Into<String>) -> Self {
        Self {
            scope: PrefixScope::National,
            country_code: None,
            prefix_digits: prefix_digits.into(),
        }
    }

    /// A rule over the NSN of numbers with the given country code
    #[must_use]
    pub fn by_country(country_code: u16, prefix_digits: impl Into<String>) -> Self {
        Self {
            scope: PrefixScope::ByCountry,
            country_code: Some(country_code),
            prefix_digits: prefix_digits.into(),
        }
    }

    /// Attach an id and creation time
    #[must_use]
    pub fn into_rule(self, id: i64, created_at: DateTime<Utc>) -> PrefixRule {
        PrefixRule {
            id,
            scope: self.scope,
            country_code: self.country_code,
            prefix_digits: self.prefix_digits,
            created_at,
        }
    }
}

/// Screening settings singleton
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Block callers that present no usable identity
    pub block_unknown_enabled: bool,
    /// Ask the platform not to log blocked calls
    pub skip_call_log_on_block: bool,
    /// Ask the platform not to notify about blocked calls
    pub skip_notification_on_block: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            block_unknown_enabled: true,
            skip_call_log_on_block: false,
            skip_notification_on_block: true,
        }
    }
}

impl Settings {
    /// Settings used when the real ones cannot be read: never block for anonymity
    #[must_use]
    pub fn fail_open() -> Self {
        Self {
            block_unknown_enabled: false,
            ..Self::default()
        }
    }
}

/// How the network presented the caller's identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presentation {
    /// Number is presented normally
    #[default]
    Allowed,
    /// Caller withheld their number
    Restricted,
    /// Network could not determine the number
    Unknown,
    /// Call comes from a payphone
    Payphone,
}

impl Presentation {
    /// Restricted, unknown and payphone presentations hide the caller
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        !matches!(self, Self::Allowed)
    }
}

impl FromStr for Presentation {
    type Err = ScreenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allowed" => Ok(Self::Allowed),
            "restricted" => Ok(Self::Restricted),
            "unknown" => Ok(Self::Unknown),
            "payphone" => Ok(Self::Payphone),
            other => Err(ScreenError::Other(format!("unknown presentation: {other}"))),
        }
    }
}

/// An incoming call as handed over by the telephony layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingCall {
    /// Raw caller id, absent for anonymous callers
    pub caller_id: Option<String>,
    /// Presentation flag, absent when the platform could not report it
    pub presentation: Option<Presentation>,
}

impl IncomingCall {
    /// A call presenting the given number normally
    #[must_use]
    pub fn from_number(number: impl Into<String>) -> Self {
        Self {
            caller_id: Some(number.into()),
            presentation: Some(Presentation::Allowed),
        }
    }

    /// A call without caller id and with the given presentation
    #[must_use]
    pub const fn anonymous(presentation: Presentation) -> Self {
        Self {
            caller_id: None,
            presentation: Some(presentation),
        }
    }
}

/// Why a decision came out the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionReason {
    /// Emergency number, always let through
    Emergency,
    /// Anonymous caller blocked by the unknown-caller setting
    Unknown,
    /// Caller matches a blocked number
    BlockedNumber,
    /// Caller matches a prefix rule
    BlockedPrefix,
    /// No rule applied
    Allowed,
}

impl DecisionReason {
    /// Stable lowercase name, used for logs and metric labels
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Emergency => "emergency",
            Self::Unknown => "unknown",
            Self::BlockedNumber => "blocked-number",
            Self::BlockedPrefix => "blocked-prefix",
            Self::Allowed => "allowed",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of screening one call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Reject the call
    pub block: bool,
    /// Ask the platform not to log the call
    pub skip_call_log: bool,
    /// Ask the platform not to notify about the call
    pub skip_notification: bool,
    /// Rule that produced the decision
    pub reason: DecisionReason,
}

impl Decision {
    /// Build a decision, carrying the log and notification flags from settings
    #[must_use]
    pub const fn new(block: bool, reason: DecisionReason, settings: &Settings) -> Self {
        Self {
            block,
            skip_call_log: settings.skip_call_log_on_block,
            skip_notification: settings.skip_notification_on_block,
            reason,
        }
    }
}

/// Platform call response derived from a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResponse {
    /// Do not let the call ring through
    pub disallow_call: bool,
    /// Reject rather than just disallow
    pub reject_call: bool,
    /// Silence the ringer as well; some devices only honour blocking this way
    pub silence_call: bool,
    /// Keep the call out of the call log
    pub skip_call_log: bool,
    /// Suppress the missed-call notification
    pub skip_notification: bool,
}

impl From<&Decision> for CallResponse {
    fn from(decision: &Decision) -> Self {
        Self {
            disallow_call: decision.block,
            reject_call: decision.block,
            silence_call: decision.block,
            skip_call_log: decision.skip_call_log,
            skip_notification: decision.skip_notification,
        }
    }
}

/// Block rules read from a repository in one consistent pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSnapshot {
    /// ISO region used to resolve numbers without a country code
    pub default_region: Option<String>,
    /// Canonical E.164 strings on the block list
    pub blocked_numbers: Vec<String>,
    /// Prefix rules, in stored order
    pub prefix_rules: Vec<PrefixRule>,
}

/// A logged blocked call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedEvent {
    /// Generated identifier
    pub id: i64,
    /// Caller number, `None` for anonymous callers
    pub e164: Option<String>,
    /// When the call was blocked
    pub timestamp: DateTime<Utc>,
}

/// A blocked call about to be appended to the event log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBlockedEvent {
    /// Caller number, `None` for anonymous callers
    pub e164: Option<String>,
    /// When the call was blocked
    pub timestamp: DateTime<Utc>,
}
