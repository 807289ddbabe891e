//! Prefix rule matching

use crate::models::{ParsedNumber, PrefixRule, PrefixScope};
use crate::normalizer::normalize;

/// True if `rule` applies to an already parsed number.
///
/// The prefix is a literal test against the start of the NSN. Rules with no
/// digits never match.
#[must_use]
pub fn rule_matches(rule: &PrefixRule, parsed: &ParsedNumber) -> bool {
    if rule.prefix_digits.is_empty() {
        return false;
    }
    let nsn_matches = parsed
        .national_significant_number
        .starts_with(&rule.prefix_digits);

    match rule.scope {
        PrefixScope::ByCountry => {
            rule.country_code.is_some() && parsed.country_code == rule.country_code && nsn_matches
        }
        PrefixScope::National => nsn_matches,
    }
}

/// Evaluates a list of prefix rules against incoming numbers
#[derive(Debug, Clone, Copy)]
pub struct PrefixMatcher<'a> {
    rules: &'a [PrefixRule],
    default_region: Option<&'a str>,
}

impl<'a> PrefixMatcher<'a> {
    /// Create a matcher over `rules`, resolving national numbers with `default_region`
    #[must_use]
    pub const fn new(rules: &'a [PrefixRule], default_region: Option<&'a str>) -> Self {
        Self { rules, default_region }
    }

    /// First rule, in list order, that applies to `incoming_raw`
    #[must_use]
    pub fn first_match(&self, incoming_raw: &str) -> Option<&'a PrefixRule> {
        if self.rules.is_empty() {
            return None;
        }
        let parsed = normalize(incoming_raw, self.default_region);
        if !parsed.is_parsed() {
            return None;
        }
        self.rules.iter().find(|rule| rule_matches(rule, &parsed))
    }

    /// True if any rule applies to `incoming_raw`
    #[must_use]
    pub fn is_blocked(&self, incoming_raw: &str) -> bool {
        self.first_match(incoming_raw).is_some()
    }
}

/// True if any of `rules` applies to `incoming_raw`
#[must_use]
pub fn is_blocked_by_prefix(
    incoming_raw: &str,
    rules: &[PrefixRule],
    default_region: Option<&str>,
) -> bool {
    PrefixMatcher::new(rules, default_region).is_blocked(incoming_raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPrefixRule;
    use chrono::Utc;

    fn rule(new: NewPrefixRule, id: i64) -> PrefixRule {
        new.into_rule(id, Utc::now())
    }

    #[test]
    fn test_empty_prefix_never_matches() {
        let parsed = normalize("+18005551234", None);
        assert!(!rule_matches(&rule(NewPrefixRule::national(""), 1), &parsed));
    }

    #[test]
    fn test_first_match_respects_list_order() {
        let rules = vec![
            rule(NewPrefixRule::national("900"), 1),
            rule(NewPrefixRule::by_country(1, "800"), 2),
            rule(NewPrefixRule::national("8005"), 3),
        ];
        let matcher = PrefixMatcher::new(&rules, None);
        assert_eq!(matcher.first_match("+18005551234").map(|r| r.id), Some(2));
    }

    #[test]
    fn test_unparseable_number_is_never_blocked() {
        let rules = vec![rule(NewPrefixRule::national("9"), 1)];
        assert!(!is_blocked_by_prefix("987654321", &rules, None));
        assert!(is_blocked_by_prefix("987654321", &rules, Some("CL")));
    }
}
