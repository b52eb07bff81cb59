//! # Field Translators
//!
//! Pure mappings from the registry's small integer code sets to the text labels
//! stored in the database, plus `YYYY-MM-DD` date parsing.
//!
//! Every code mapping follows one rule: an absent code gives `None`, an unknown
//! code gives `None`, a known code gives its label. Code `0` is a real value and
//! is never confused with "absent".

use chrono::NaiveDate;
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A date string that is present but does not follow `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date '{value}': {source}")]
pub struct TranslateError {
    pub value: String,
    #[source]
    pub source: chrono::ParseError,
}

/// Parses a registry date. Missing or empty input is `Ok(None)`.
pub fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>, TranslateError> {
    match raw {
        None => Ok(None),
        Some(value) if value.is_empty() => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, DATE_FORMAT)
            .map(Some)
            .map_err(|source| TranslateError {
                value: value.to_string(),
                source,
            }),
    }
}

/// Which register the record originates from.
pub fn source_label(code: Option<i64>) -> Option<&'static str> {
    match code? {
        0 => Some("common"),
        1 => Some("prh"),
        2 => Some("tax-administration"),
        3 => Some("business-registry"),
        _ => None,
    }
}

/// `0` is the current record, anything else a former one.
pub fn version_label(code: Option<i64>) -> Option<&'static str> {
    code.map(|value| if value == 0 { "current" } else { "former" })
}

pub fn address_type_label(code: Option<i64>) -> Option<&'static str> {
    match code? {
        1 => Some("physical_address"),
        2 => Some("mailing_address"),
        _ => None,
    }
}

pub fn entry_status_label(code: Option<i64>) -> Option<&'static str> {
    match code? {
        0 => Some("common"),
        1 => Some("unregistered"),
        2 => Some("registered"),
        _ => None,
    }
}

pub fn entry_register_label(code: Option<i64>) -> Option<&'static str> {
    match code? {
        1 => Some("trade-register"),
        2 => Some("foundation-register"),
        3 => Some("association-register"),
        4 => Some("tax-administration"),
        5 => Some("prepayment-register"),
        6 => Some("vat-register"),
        7 => Some("employer-register"),
        8 => Some("insurance-register"),
        _ => None,
    }
}

pub fn entry_authority_label(code: Option<i64>) -> Option<&'static str> {
    match code? {
        1 => Some("tax-administration"),
        2 => Some("prh"),
        3 => Some("population-register"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_valid() {
        let date = parse_date(Some("2019-03-01")).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2019, 3, 1));
    }

    #[test]
    fn test_parse_date_absent_or_empty_is_none() {
        assert_eq!(parse_date(None).unwrap(), None);
        assert_eq!(parse_date(Some("")).unwrap(), None);
    }

    #[test]
    fn test_parse_date_malformed_is_error() {
        let err = parse_date(Some("01.03.2019")).unwrap_err();
        assert_eq!(err.value, "01.03.2019");
        assert!(parse_date(Some("2019-13-01")).is_err());
    }

    #[test]
    fn test_zero_code_is_not_absent() {
        assert_eq!(source_label(Some(0)), Some("common"));
        assert_eq!(source_label(None), None);
        assert_eq!(version_label(Some(0)), Some("current"));
        assert_eq!(version_label(None), None);
        assert_eq!(entry_status_label(Some(0)), Some("common"));
    }

    #[test]
    fn test_version_nonzero_is_former() {
        assert_eq!(version_label(Some(1)), Some("former"));
        assert_eq!(version_label(Some(2)), Some("former"));
    }

    #[test]
    fn test_unknown_codes_degrade_to_none() {
        assert_eq!(source_label(Some(9)), None);
        assert_eq!(address_type_label(Some(0)), None);
        assert_eq!(address_type_label(Some(2)), Some("mailing_address"));
        assert_eq!(entry_register_label(Some(0)), None);
        assert_eq!(entry_register_label(Some(6)), Some("vat-register"));
        assert_eq!(entry_authority_label(Some(4)), None);
        assert_eq!(entry_authority_label(Some(3)), Some("population-register"));
    }
}
