//! M-Pesa phone number type.

use core::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Country calling code prefixed to every canonical number.
pub const COUNTRY_CODE: &str = "254";

/// National format: optional `+254`, `254` or `0` prefix, then a 9-digit
/// subscriber number starting with 1 or 7. ASCII digits only; `\d` would
/// also accept other scripts.
static NATIONAL_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // Static pattern, covered by tests
    Regex::new(r"^(?:\+?254|0)?([17][0-9]{8})$").expect("phone pattern is valid")
});

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input does not match the national format.
    #[error("please enter a valid Kenyan phone number")]
    InvalidFormat,
}

/// A mobile-money phone number in canonical international form.
///
/// Whitespace is ignored on input. Numbers may be written with a leading
/// `0`, a leading `+254`, a bare `254`, or as the 9 subscriber digits alone;
/// all of them normalize to `254` followed by the subscriber digits.
///
/// ## Examples
///
/// ```
/// use trumall_core::PhoneNumber;
///
/// let a = PhoneNumber::parse("0712345678").unwrap();
/// let b = PhoneNumber::parse("+254 712 345 678").unwrap();
/// let c = PhoneNumber::parse("254712345678").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(b, c);
/// assert_eq!(a.as_str(), "254712345678");
///
/// assert!(PhoneNumber::parse("0812345678").is_err());
/// assert!(PhoneNumber::parse("07123").is_err());
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parse and normalize a phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or does not match the
    /// national format.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        if cleaned.is_empty() {
            return Err(PhoneError::Empty);
        }

        let subscriber = NATIONAL_FORMAT
            .captures(&cleaned)
            .and_then(|caps| caps.get(1))
            .ok_or(PhoneError::InvalidFormat)?;

        Ok(Self(format!("{COUNTRY_CODE}{}", subscriber.as_str())))
    }

    /// Whether the input would parse, without allocating the result.
    #[must_use]
    pub fn is_valid(s: &str) -> bool {
        let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        NATIONAL_FORMAT.is_match(&cleaned)
    }

    /// Returns the canonical digit string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the number and returns its canonical digit string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// The 9 subscriber digits without the country code.
    #[must_use]
    pub fn subscriber(&self) -> &str {
        self.0.strip_prefix(COUNTRY_CODE).unwrap_or(&self.0)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for PhoneNumber {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_all_prefix_forms_normalize_to_same_number() {
        let expected = "254712345678";
        for input in ["0712345678", "+254712345678", "254712345678", "712345678"] {
            assert_eq!(PhoneNumber::parse(input).unwrap().as_str(), expected, "{input}");
        }
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let once = PhoneNumber::parse("0712345678").unwrap();
        let twice = PhoneNumber::parse(once.as_str()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_whitespace_is_ignored() {
        let phone = PhoneNumber::parse(" 0712 345 678 ").unwrap();
        assert_eq!(phone.as_str(), "254712345678");
    }

    #[test]
    fn test_accepts_01_prefix_numbers() {
        let phone = PhoneNumber::parse("0112345678").unwrap();
        assert_eq!(phone.as_str(), "254112345678");
        assert_eq!(phone.subscriber(), "112345678");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(PhoneNumber::parse("   "), Err(PhoneError::Empty));
    }

    #[test]
    fn test_parse_invalid() {
        for input in [
            "0812345678",
            "071234567",
            "07123456789",
            "+1712345678",
            "07a2345678",
            "2540712345678",
            "07١٢٣٤٥٦٧٨",
            "０７１２３４５６７８",
        ] {
            assert_eq!(
                PhoneNumber::parse(input),
                Err(PhoneError::InvalidFormat),
                "{input}"
            );
            assert!(!PhoneNumber::is_valid(input));
        }
    }

    #[test]
    fn test_deserialize_normalizes() {
        let phone: PhoneNumber = serde_json::from_str("\"+254712345678\"").unwrap();
        assert_eq!(serde_json::to_string(&phone).unwrap(), "\"254712345678\"");
        assert!(serde_json::from_str::<PhoneNumber>("\"12\"").is_err());
    }
}
