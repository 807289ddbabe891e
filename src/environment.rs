//! Platform capabilities the decision engine depends on
//!
//! Emergency-number recognition and presentation lookup belong to the telephony
//! stack. They sit behind [`CallEnvironment`] so the engine can run, and be
//! tested, without one.

use std::collections::HashSet;

use crate::models::{IncomingCall, Presentation};
use crate::validation::InputValidator;

/// Emergency numbers recognized when nothing else is configured
pub const DEFAULT_EMERGENCY_NUMBERS: &[&str] = &["112", "911", "999", "000", "08", "110", "118", "119"];

/// Telephony services consulted while screening a call
pub trait CallEnvironment: Send + Sync {
    /// True if `raw` is an emergency number for the current network
    fn is_emergency_number(&self, raw: &str) -> bool;

    /// Presentation of the call; platforms that cannot report it count as allowed
    fn presentation_of(&self, call: &IncomingCall) -> Presentation {
        call.presentation.unwrap_or_default()
    }
}

/// Emergency registry backed by a fixed list of dialable short codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencyNumbers {
    numbers: HashSet<String>,
}

impl EmergencyNumbers {
    /// Build a registry from a list of numbers; separators in the list are ignored
    pub fn new<I, S>(numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let numbers = numbers
            .into_iter()
            .map(|n| n.as_ref().chars().filter(char::is_ascii_digit).collect::<String>())
            .filter(|n| !n.is_empty())
            .collect();
        Self { numbers }
    }

    /// Number of configured emergency numbers
    #[must_use]
    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    /// True if no emergency number is configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}

impl Default for EmergencyNumbers {
    fn default() -> Self {
        Self::new(DEFAULT_EMERGENCY_NUMBERS)
    }
}

impl CallEnvironment for EmergencyNumbers {
    /// Exact match on the dialed digits. SIP addresses and numbers written in
    /// international form are never emergency numbers.
    fn is_emergency_number(&self, raw: &str) -> bool {
        let cleaned = InputValidator::sanitize_caller_id(raw);
        if cleaned.is_empty() || cleaned.contains('@') || cleaned.starts_with('+') {
            return false;
        }
        if cleaned
            .chars()
            .any(|c| !c.is_ascii_digit() && !matches!(c, ' ' | '-' | '(' | ')'))
        {
            return false;
        }
        let digits: String = cleaned.chars().filter(char::is_ascii_digit).collect();
        self.numbers.contains(&digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_recognizes_common_numbers() {
        let registry = EmergencyNumbers::default();
        assert!(registry.is_emergency_number("112"));
        assert!(registry.is_emergency_number("911"));
        assert!(!registry.is_emergency_number("9110"));
        assert!(!registry.is_emergency_number("+112"));
        assert!(!registry.is_emergency_number("sip:112@example.com"));
    }

    #[test]
    fn test_custom_registry() {
        let registry = EmergencyNumbers::new(["131", "1-3-3"]);
        assert_eq!(registry.len(), 2);
        assert!(registry.is_emergency_number("133"));
        assert!(!registry.is_emergency_number("112"));
    }

    #[test]
    fn test_missing_presentation_counts_as_allowed() {
        let registry = EmergencyNumbers::default();
        let call = IncomingCall {
            caller_id: Some("123".to_string()),
            presentation: None,
        };
        assert_eq!(registry.presentation_of(&call), Presentation::Allowed);
    }
}
