use unicode_normalization::UnicodeNormalization;

use crate::error::{Result, ScreenError};
use crate::models::NewPrefixRule;
use crate::normalizer::{normalize, region_id};

/// Validation utilities for rule entry and input sanitization
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Clean a raw caller id before parsing.
    ///
    /// Folds compatibility characters (full-width digits and plus signs) to ASCII,
    /// drops control characters, strips a `tel:` scheme and trims.
    #[must_use]
    pub fn sanitize_caller_id(raw: &str) -> String {
        let folded: String = raw.nfkc().filter(|c| !c.is_control()).collect();
        let trimmed = folded.trim();
        let without_scheme = trimmed
            .get(..4)
            .filter(|scheme| scheme.eq_ignore_ascii_case("tel:"))
            .map_or(trimmed, |_| &trimmed[4..]);
        without_scheme.trim().to_string()
    }

    /// Validate an ISO 3166-1 alpha-2 region code and return it uppercased
    pub fn validate_region(region: &str) -> Result<String> {
        let region = region.trim();
        if region.len() != 2 || !region.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ScreenError::InvalidRegion(format!(
                "'{region}' is not a two-letter region code"
            )));
        }
        if region_id(region).is_none() {
            return Err(ScreenError::InvalidRegion(format!(
                "'{region}' is not a region known to the numbering plan"
            )));
        }
        Ok(region.to_ascii_uppercase())
    }

    /// Normalize a number entered for the block list to E.164.
    ///
    /// The number must parse with `region` (or carry its own country code) and
    /// satisfy its country's numbering plan.
    pub fn normalize_blocked_number(raw: &str, region: Option<&str>) -> Result<String> {
        if raw.trim().is_empty() {
            return Err(ScreenError::InvalidNumber("phone number cannot be empty".to_string()));
        }

        let parsed = normalize(raw, region);
        if !parsed.is_parsed() {
            let hint = if region.is_some() {
                "could not be parsed"
            } else {
                "has no country code and no default region is set"
            };
            return Err(ScreenError::InvalidNumber(format!("'{}' {hint}", raw.trim())));
        }

        parsed.e164.ok_or_else(|| {
            ScreenError::InvalidNumber(format!(
                "'{}' is not a valid number for country code +{}",
                raw.trim(),
                parsed.country_code.unwrap_or_default()
            ))
        })
    }

    /// Build a prefix rule from user input.
    ///
    /// Non-digit characters in the prefix are dropped. A blank country code makes
    /// the rule apply to the NSN of every country; otherwise the code (with or
    /// without a leading `+`) scopes the rule to that country.
    pub fn parse_prefix_rule(prefix_raw: &str, country_raw: Option<&str>) -> Result<NewPrefixRule> {
        let digits: String = prefix_raw
            .nfkc()
            .filter(char::is_ascii_digit)
            .collect();
        if digits.is_empty() {
            return Err(ScreenError::InvalidPrefix("prefix is empty or has no digits".to_string()));
        }
        if digits.len() > 15 {
            return Err(ScreenError::InvalidPrefix("prefix too long (max 15 digits)".to_string()));
        }

        let country = country_raw.map(str::trim).unwrap_or_default();
        let country = country.strip_prefix('+').unwrap_or(country).trim();
        if country.is_empty() {
            return Ok(NewPrefixRule::national(digits));
        }

        let code = Self::validate_country_code(country)?;
        Ok(NewPrefixRule::by_country(code, digits))
    }

    /// Validate a country calling code given without the `+`
    pub fn validate_country_code(code: &str) -> Result<u16> {
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(ScreenError::InvalidPrefix(format!(
                "country code '{code}' must contain only digits"
            )));
        }
        match code.parse::<u16>() {
            Ok(value) if (1..=999).contains(&value) && !code.starts_with('0') => Ok(value),
            _ => Err(ScreenError::InvalidPrefix(format!(
                "country code '{code}' must be between 1 and 999"
            ))),
        }
    }

    /// Validate the time of day the digest is prepared
    pub fn validate_digest_time(hour: u32, minute: u32) -> Result<()> {
        if hour > 23 {
            return Err(ScreenError::InvalidConfig(format!("digest hour {hour} out of range (0-23)")));
        }
        if minute > 59 {
            return Err(ScreenError::InvalidConfig(format!(
                "digest minute {minute} out of range (0-59)"
            )));
        }
        Ok(())
    }
}
