//! Number normalization
//!
//! Turns whatever the telephony layer hands over as a caller id into a
//! [`ParsedNumber`]. Parsing, validity and formatting are delegated to the
//! libphonenumber metadata shipped with the `phonenumber` crate; nothing here
//! hard-codes numbering plan lengths.

use phonenumber::{country, Mode, PhoneNumber};

use crate::models::ParsedNumber;
use crate::validation::InputValidator;

/// Region code meaning "no region context"
pub const UNKNOWN_REGION: &str = "ZZ";

/// Resolve an ISO 3166-1 alpha-2 region code against the numbering plan metadata.
///
/// Blank input and [`UNKNOWN_REGION`] resolve to `None`, as does any code the
/// metadata does not know.
#[must_use]
pub fn region_id(region: &str) -> Option<country::Id> {
    let region = region.trim();
    if region.is_empty() || region.eq_ignore_ascii_case(UNKNOWN_REGION) {
        return None;
    }
    region.to_ascii_uppercase().parse::<country::Id>().ok()
}

/// Parse a raw caller id, resolving bare national numbers with `default_region`.
///
/// Returns `None` when the input is empty, malformed, or is a national number
/// with no usable region.
pub(crate) fn parse(raw: &str, default_region: Option<&str>) -> Option<PhoneNumber> {
    let cleaned = InputValidator::sanitize_caller_id(raw);
    if cleaned.is_empty() {
        return None;
    }
    let region = default_region.and_then(region_id);
    phonenumber::parse(region, &cleaned).ok()
}

/// Parse a raw caller id as a number of `region` unless it carries its own country code
pub(crate) fn parse_in_region(raw: &str, region: country::Id) -> Option<PhoneNumber> {
    let cleaned = InputValidator::sanitize_caller_id(raw);
    if cleaned.is_empty() {
        return None;
    }
    phonenumber::parse(Some(region), &cleaned).ok()
}

/// Parse a raw caller id that carries its own country code
pub(crate) fn parse_international(raw: &str) -> Option<PhoneNumber> {
    parse(raw, None)
}

/// National significant number of a parsed number, leading zeros included
pub(crate) fn national_significant_number(number: &PhoneNumber) -> String {
    let national = number.national();
    let mut nsn = "0".repeat(national.zeros() as usize);
    nsn.push_str(&national.value().to_string());
    nsn
}

/// Canonical "+<cc><nsn>" form
pub(crate) fn format_e164(number: &PhoneNumber) -> String {
    number.format().mode(Mode::E164).to_string()
}

/// Normalize a raw caller id.
///
/// Never fails: anything that cannot be parsed comes back as
/// [`ParsedNumber::unparseable`]. Numbers that parse but break their country's
/// numbering plan keep their country code and NSN, are marked invalid, and
/// carry no E.164 form.
#[must_use]
pub fn normalize(raw: &str, default_region: Option<&str>) -> ParsedNumber {
    let Some(number) = parse(raw, default_region) else {
        return ParsedNumber::unparseable();
    };

    let is_valid = phonenumber::is_valid(&number);
    ParsedNumber {
        country_code: Some(number.code().value()),
        national_significant_number: national_significant_number(&number),
        is_valid,
        e164: is_valid.then(|| format_e164(&number)),
    }
}

/// E.164 form of a raw caller id, if it normalizes to a valid number
#[must_use]
pub fn to_e164(raw: &str, default_region: Option<&str>) -> Option<String> {
    normalize(raw, default_region).e164
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_id_resolution() {
        assert!(region_id("CL").is_some());
        assert!(region_id("cl").is_some());
        assert!(region_id("ZZ").is_none());
        assert!(region_id("  ").is_none());
        assert!(region_id("QQ").is_none());
    }

    #[test]
    fn test_national_number_needs_region() {
        let parsed = normalize("987654321", None);
        assert_eq!(parsed, ParsedNumber::unparseable());
    }

    #[test]
    fn test_international_number_without_region() {
        let parsed = normalize("+56 9 8765 4321", None);
        assert_eq!(parsed.country_code, Some(56));
        assert_eq!(parsed.national_significant_number, "987654321");
        assert!(parsed.is_valid);
        assert_eq!(parsed.e164.as_deref(), Some("+56987654321"));
    }

    #[test]
    fn test_blank_input_is_unparseable() {
        assert_eq!(normalize("   ", Some("CL")), ParsedNumber::unparseable());
    }
}
