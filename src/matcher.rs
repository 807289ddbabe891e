//! Number matching
//!
//! Decides whether an incoming caller id and a stored block-list entry name the
//! same line. Follows libphonenumber's match levels: an exact match of country
//! code and national number, an NSN match when one side had to borrow the other
//! side's region, and a short NSN match when one national number is a suffix of
//! the other.

use phonenumber::PhoneNumber;

use crate::normalizer::{parse_in_region, parse_international};
use crate::validation::InputValidator;

/// How closely two numbers match, weakest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchType {
    /// At least one side is not a phone number
    NotANumber,
    /// Both sides are numbers, but different ones
    NoMatch,
    /// Same country, and one national number ends with the other
    ShortNsnMatch,
    /// National numbers agree once the country code ambiguity is resolved
    NsnMatch,
    /// Country code and national number agree
    ExactMatch,
}

impl MatchType {
    /// True for every level that identifies the same caller
    #[must_use]
    pub const fn is_match(self) -> bool {
        matches!(self, Self::ShortNsnMatch | Self::NsnMatch | Self::ExactMatch)
    }
}

/// The fields two numbers are compared on
#[derive(Debug, Clone, PartialEq, Eq)]
struct CoreNumber {
    country_code: Option<u16>,
    national: u64,
    leading_zeros: usize,
}

impl CoreNumber {
    fn from_phone(number: &PhoneNumber) -> Self {
        let national = number.national();
        Self {
            country_code: Some(number.code().value()),
            national: national.value(),
            leading_zeros: national.zeros() as usize,
        }
    }

    /// Digits taken as-is with no country code, for inputs no region can resolve
    fn loose(raw: &str) -> Option<Self> {
        let cleaned = InputValidator::sanitize_caller_id(raw);
        let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);
        if cleaned.chars().any(|c| !c.is_ascii_digit() && !is_separator(c)) {
            return None;
        }
        let digits: String = cleaned.chars().filter(char::is_ascii_digit).collect();
        if !(2..=17).contains(&digits.len()) {
            return None;
        }
        let trimmed = digits.trim_start_matches('0');
        let national = if trimmed.is_empty() { 0 } else { trimmed.parse().ok()? };
        Some(Self {
            country_code: None,
            national,
            leading_zeros: digits.len() - trimmed.len(),
        })
    }

    fn same_national(&self, other: &Self) -> bool {
        self.national == other.national && self.leading_zeros == other.leading_zeros
    }

    fn is_suffix_of_other(&self, other: &Self) -> bool {
        let first = self.national.to_string();
        let second = other.national.to_string();
        first.ends_with(&second) || second.ends_with(&first)
    }
}

const fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '-' | '.' | '(' | ')' | '/' | '\u{a0}')
}

fn compare(first: &CoreNumber, second: &CoreNumber) -> MatchType {
    match (first.country_code, second.country_code) {
        (Some(a), Some(b)) => {
            if a == b && first.same_national(second) {
                MatchType::ExactMatch
            } else if a == b && first.is_suffix_of_other(second) {
                MatchType::ShortNsnMatch
            } else {
                MatchType::NoMatch
            }
        }
        _ if first.same_national(second) => MatchType::NsnMatch,
        _ if first.is_suffix_of_other(second) => MatchType::ShortNsnMatch,
        _ => MatchType::NoMatch,
    }
}

/// Match a fully parsed number against a raw string
fn match_against(known: &PhoneNumber, other: &str) -> MatchType {
    let known_core = CoreNumber::from_phone(known);

    if let Some(number) = parse_international(other) {
        return compare(&known_core, &CoreNumber::from_phone(&number));
    }

    // The other side has no country code: read it as a national number of the
    // known side's region. Agreement then only proves an NSN match.
    match known.country().id() {
        Some(region) => match parse_in_region(other, region) {
            Some(number) => match compare(&known_core, &CoreNumber::from_phone(&number)) {
                MatchType::ExactMatch => MatchType::NsnMatch,
                other => other,
            },
            None => MatchType::NotANumber,
        },
        None => CoreNumber::loose(other)
            .map_or(MatchType::NotANumber, |number| compare(&known_core, &number)),
    }
}

/// Compare two raw numbers.
///
/// Symmetric in its arguments: whichever side carries a country code is parsed
/// first and the other side is resolved against it.
#[must_use]
pub fn match_type(first: &str, second: &str) -> MatchType {
    if let Some(number) = parse_international(first) {
        return match_against(&number, second);
    }
    if let Some(number) = parse_international(second) {
        return match_against(&number, first);
    }
    match (CoreNumber::loose(first), CoreNumber::loose(second)) {
        (Some(a), Some(b)) => compare(&a, &b),
        _ => MatchType::NotANumber,
    }
}

/// True if `incoming` and `stored` identify the same caller
#[must_use]
pub fn matches(incoming: &str, stored: &str) -> bool {
    match_type(incoming, stored).is_match()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert_eq!(match_type("+56987654321", "+56 9 8765 4321"), MatchType::ExactMatch);
    }

    #[test]
    fn test_national_form_is_nsn_match() {
        assert_eq!(match_type("987654321", "+56987654321"), MatchType::NsnMatch);
        assert_eq!(match_type("+56987654321", "987654321"), MatchType::NsnMatch);
    }

    #[test]
    fn test_different_country_is_no_match() {
        assert_eq!(match_type("+16502530000", "+56987654321"), MatchType::NoMatch);
    }

    #[test]
    fn test_suffix_is_short_nsn_match() {
        assert_eq!(match_type("+5687654321", "+56987654321"), MatchType::ShortNsnMatch);
    }

    #[test]
    fn test_garbage_is_not_a_number() {
        assert_eq!(match_type("", "+56987654321"), MatchType::NotANumber);
        assert_eq!(match_type("hello", "world"), MatchType::NotANumber);
    }

    #[test]
    fn test_loose_digits_compare_without_country() {
        assert_eq!(match_type("555 1234", "5551234"), MatchType::NsnMatch);
        assert_eq!(match_type("5551234", "15551234"), MatchType::ShortNsnMatch);
    }
}
