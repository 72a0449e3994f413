//! Input normalization. Every query is validated here before any I/O.

use std::fmt;

use serde::Serialize;

use crate::constants::{IDENTIFIER_LEN, MIN_NAME_LEN, MIN_REGION_LEN, PHONE_LEN};
use crate::error::{ResolveError, ResolveResult};

pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

pub fn alnum_upper(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// A 10-digit provider identity number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn parse(raw: &str) -> ResolveResult<Self> {
        let digits = digits_only(raw);
        if digits.len() != IDENTIFIER_LEN {
            return Err(ResolveError::InvalidInput(format!(
                "identifier must be exactly {IDENTIFIER_LEN} digits, got {} ({raw:?})",
                digits.len()
            )));
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> ResolveResult<Self> {
        let digits = digits_only(raw);
        if digits.len() != PHONE_LEN {
            return Err(ResolveError::InvalidInput(format!(
                "{} is not a valid phone number",
                dashed(&digits)
            )));
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&dashed(&self.0))
    }
}

fn dashed(digits: &str) -> String {
    match digits.len() {
        0..=3 => digits.to_string(),
        4..=6 => format!("{}-{}", &digits[..3], &digits[3..]),
        _ => format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..]),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameQuery {
    pub first: Option<String>,
    pub last: String,
    pub region: Option<String>,
}

impl NameQuery {
    /// Names are reduced to upper-case alphanumerics. `last` must survive
    /// that with at least one character, and first + last together must be
    /// at least `MIN_NAME_LEN` characters. A region shorter than
    /// `MIN_REGION_LEN` after stripping is dropped.
    pub fn parse(first: Option<&str>, last: &str, region: Option<&str>) -> ResolveResult<Self> {
        let last = alnum_upper(last);
        if last.is_empty() {
            return Err(ResolveError::InvalidInput(
                "last name is required".to_string(),
            ));
        }
        let first = first.map(alnum_upper).filter(|f| !f.is_empty());
        let total = last.len() + first.as_deref().map_or(0, str::len);
        if total < MIN_NAME_LEN {
            return Err(ResolveError::InvalidInput(format!(
                "provider name must be at least {MIN_NAME_LEN} letters"
            )));
        }
        let region = region
            .map(alnum_upper)
            .filter(|r| r.len() >= MIN_REGION_LEN);
        Ok(Self { first, last, region })
    }

    /// "SMITH" searches by last name; "JOHN SMITH" (or "JOHN Q SMITH")
    /// uses the first and last tokens.
    pub fn from_full_name(full: &str, region: Option<&str>) -> ResolveResult<Self> {
        let tokens: Vec<&str> = full.split_whitespace().collect();
        match tokens.as_slice() {
            [] => Err(ResolveError::InvalidInput(
                "last name is required".to_string(),
            )),
            [last] => Self::parse(None, last, region),
            [first, .., last] => Self::parse(Some(first), last, region),
        }
    }
}

impl fmt::Display for NameQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(first) = &self.first {
            write!(f, "{first} ")?;
        }
        f.write_str(&self.last)?;
        if let Some(region) = &self.region {
            write!(f, " ({region})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    ByIdentifier(Identifier),
    ByPhone(PhoneNumber),
    ByName(NameQuery),
}

impl Query {
    pub fn identifier(raw: &str) -> ResolveResult<Self> {
        Identifier::parse(raw).map(Query::ByIdentifier)
    }

    pub fn phone(raw: &str) -> ResolveResult<Self> {
        PhoneNumber::parse(raw).map(Query::ByPhone)
    }

    pub fn name(first: Option<&str>, last: &str, region: Option<&str>) -> ResolveResult<Self> {
        NameQuery::parse(first, last, region).map(Query::ByName)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Query::ByIdentifier(_) => "identifier",
            Query::ByPhone(_) => "phone",
            Query::ByName(_) => "name",
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::ByIdentifier(id) => write!(f, "identifier {id}"),
            Query::ByPhone(phone) => write!(f, "phone {phone}"),
            Query::ByName(name) => write!(f, "name '{name}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_strips_punctuation() {
        let id = Identifier::parse(" 123-456-7893 ").unwrap();
        assert_eq!(id.as_str(), "1234567893");
    }

    #[test]
    fn identifier_rejects_wrong_length() {
        assert!(Identifier::parse("123456789").unwrap_err().is_invalid_input());
        assert!(Identifier::parse("12345678931").unwrap_err().is_invalid_input());
        assert!(Identifier::parse("abcdefghij").unwrap_err().is_invalid_input());
    }

    #[test]
    fn phone_requires_ten_digits() {
        assert_eq!(PhoneNumber::parse("(555) 123-4567").unwrap().as_str(), "5551234567");
        let err = PhoneNumber::parse("555-1234").unwrap_err();
        assert!(err.to_string().contains("555-1234"));
    }

    #[test]
    fn name_is_upper_cased_and_stripped() {
        let q = NameQuery::parse(Some("jo-ann"), "o'brien", Some("oh")).unwrap();
        assert_eq!(q.first.as_deref(), Some("JOANN"));
        assert_eq!(q.last, "OBRIEN");
        assert_eq!(q.region.as_deref(), Some("OH"));
    }

    #[test]
    fn short_last_name_alone_is_rejected() {
        assert!(NameQuery::parse(None, "SM", None).unwrap_err().is_invalid_input());
        assert!(NameQuery::parse(None, " s.m ", None).unwrap_err().is_invalid_input());
    }

    #[test]
    fn short_last_name_with_first_name_is_accepted() {
        let q = NameQuery::parse(Some("John"), "Lee", None).unwrap();
        assert_eq!(q.last, "LEE");
    }

    #[test]
    fn empty_last_name_is_rejected() {
        assert!(NameQuery::parse(Some("Jonathan"), "--", None).is_err());
    }

    #[test]
    fn one_letter_region_is_ignored() {
        let q = NameQuery::parse(None, "SMITH", Some("o")).unwrap();
        assert_eq!(q.region, None);
    }

    #[test]
    fn full_name_uses_first_and_last_tokens() {
        let q = NameQuery::from_full_name("john q smith", None).unwrap();
        assert_eq!(q.first.as_deref(), Some("JOHN"));
        assert_eq!(q.last, "SMITH");

        let q = NameQuery::from_full_name("smith", Some("tx")).unwrap();
        assert_eq!(q.first, None);
        assert_eq!(q.region.as_deref(), Some("TX"));
    }
}
