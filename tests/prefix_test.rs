//! Integration tests for prefix rules

use call_screen::models::{NewPrefixRule, ParsedNumber, PrefixRule};
use call_screen::prefix::{is_blocked_by_prefix, rule_matches, PrefixMatcher};
use chrono::Utc;

fn rules(new_rules: Vec<NewPrefixRule>) -> Vec<PrefixRule> {
    new_rules
        .into_iter()
        .zip(1..)
        .map(|(rule, id)| rule.into_rule(id, Utc::now()))
        .collect()
}

#[test]
fn test_by_country_rule_is_scoped_to_its_country() {
    let rules = rules(vec![NewPrefixRule::by_country(1, "800")]);
    assert!(is_blocked_by_prefix("+18005551234", &rules, None));
    assert!(!is_blocked_by_prefix("+448005551234", &rules, None));
    assert!(!is_blocked_by_prefix("+18015551234", &rules, None));
}

#[test]
fn test_national_rule_applies_to_any_country() {
    let rules = rules(vec![NewPrefixRule::national("800")]);
    assert!(is_blocked_by_prefix("+18005551234", &rules, None));
    assert!(is_blocked_by_prefix("+448005551234", &rules, None));
    assert!(!is_blocked_by_prefix("+18015551234", &rules, None));
}

#[test]
fn test_national_number_uses_default_region() {
    let rules = rules(vec![NewPrefixRule::by_country(56, "600")]);
    assert!(is_blocked_by_prefix("600 123 4567", &rules, Some("CL")));
    assert!(!is_blocked_by_prefix("600 123 4567", &rules, None));
}

#[test]
fn test_prefix_applies_to_nsn_not_country_code() {
    // "56" is the country code here, not the start of the NSN
    let rules = rules(vec![NewPrefixRule::national("56")]);
    assert!(!is_blocked_by_prefix("+56987654321", &rules, None));
}

#[test]
fn test_invalid_but_parseable_number_is_still_checked() {
    let parsed = ParsedNumber {
        country_code: Some(1),
        national_significant_number: "800555".to_string(),
        is_valid: false,
        e164: None,
    };
    let rule = NewPrefixRule::by_country(1, "800").into_rule(1, Utc::now());
    assert!(rule_matches(&rule, &parsed));
    assert!(!rule_matches(&rule, &ParsedNumber::unparseable()));
}

#[test]
fn test_no_rules_never_block() {
    let matcher = PrefixMatcher::new(&[], Some("CL"));
    assert!(!matcher.is_blocked("+18005551234"));
    assert!(matcher.first_match("+18005551234").is_none());
}

#[test]
fn test_unparseable_number_is_not_blocked() {
    let rules = rules(vec![NewPrefixRule::national("8")]);
    assert!(!is_blocked_by_prefix("unknown", &rules, Some("CL")));
    assert!(!is_blocked_by_prefix("", &rules, Some("CL")));
}
