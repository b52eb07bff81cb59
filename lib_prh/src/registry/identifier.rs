//! # Company Identifiers
//!
//! Validated Finnish business identifiers ("y-tunnus") and the aggregate key
//! that ties a parent `company` row to all of its child rows.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;
use uuid::Uuid;

/// Error raised when a candidate identifier is not a well-formed business id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("company number is not in correct format: '{0}'")]
pub struct IdentifierError(pub String);

fn company_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Seven ASCII digits, a dash and a single check digit.
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{7}-[0-9]$").expect("static pattern compiles"))
}

/// A Finnish business identifier such as `1234567-8`.
///
/// Construction goes through [`CompanyNumber::parse`], so a value of this type
/// is always safe to hand to the fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CompanyNumber(String);

impl CompanyNumber {
    /// Validates the raw string against the `NNNNNNN-N` shape.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        if company_number_pattern().is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(IdentifierError(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompanyNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque key shared by a `company` row and every child row decomposed from it.
///
/// Reused from the caller when the company is already known, generated otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateKey(String);

impl AggregateKey {
    /// A fresh random key for a company seen for the first time.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Reuses the hint when present, otherwise generates a new key.
    pub fn from_hint(hint: Option<&str>) -> Self {
        match hint {
            Some(existing) if !existing.is_empty() => Self(existing.to_string()),
            _ => Self::generate(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AggregateKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for AggregateKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for AggregateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fresh row key for a child row. Never reused across syncs.
pub(crate) fn new_row_key() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_number_accepts_canonical_shape() {
        let number = CompanyNumber::parse("1234567-8").unwrap();
        assert_eq!(number.as_str(), "1234567-8");
    }

    #[test]
    fn test_company_number_rejects_other_shapes() {
        for raw in ["123456-78", "12345678", "1234567-89", "", "abcdefg-h", " 1234567-8"] {
            assert!(CompanyNumber::parse(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn test_company_number_rejects_non_ascii_digits() {
        // Arabic-Indic digits are \d in Unicode regexes but not valid business ids.
        assert!(CompanyNumber::parse("١٢٣٤٥٦٧-٨").is_err());
    }

    #[test]
    fn test_aggregate_key_reuses_hint() {
        assert_eq!(AggregateKey::from_hint(Some("abc")).as_str(), "abc");
        let generated = AggregateKey::from_hint(None);
        assert_eq!(generated.as_str().len(), 36);
        assert_ne!(AggregateKey::from_hint(Some("")).as_str(), "");
    }
}
