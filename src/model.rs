use serde::{Serialize, Serializer};

use crate::constants::UNKNOWN;
use crate::error::TransportError;
use crate::normalize::{Identifier, digits_only};

/// A record value that is either known or the explicit `UNKNOWN` sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Field {
    Value(String),
    #[default]
    Unknown,
}

impl Field {
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Field::Unknown
        } else {
            Field::Value(trimmed.to_string())
        }
    }

    pub fn from_opt(raw: Option<&str>) -> Self {
        raw.map_or(Field::Unknown, Field::new)
    }

    /// Phone and fax numbers keep only their digits.
    pub fn digits(raw: Option<&str>) -> Self {
        Field::new(&digits_only(raw.unwrap_or_default()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Field::Value(v) => v,
            Field::Unknown => UNKNOWN,
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Field::Value(v) => Some(v),
            Field::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Field::Unknown)
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Address {
    pub line1: Field,
    pub line2: Field,
    pub city: Field,
    pub state: Field,
    pub postal_code: Field,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Contact {
    pub address: Address,
    pub phone: Field,
    pub fax: Field,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdentityRecord {
    pub first_name: Field,
    pub middle_name: Field,
    pub last_name: Field,
    pub organization_name: Field,
    pub credential: Field,
    pub mailing: Contact,
    pub practice: Contact,
    pub other_practice: Address,
    pub endpoint: Field,
}

impl IdentityRecord {
    /// Every field `UNKNOWN`; used when neither source knows the identifier.
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::default()
    }

    pub fn display_name(&self) -> String {
        if let Some(org) = self.organization_name.value() {
            return org.to_string();
        }
        let parts: Vec<&str> = [&self.first_name, &self.middle_name, &self.last_name]
            .iter()
            .filter_map(|f| f.value())
            .collect();
        if parts.is_empty() {
            UNKNOWN.to_string()
        } else {
            parts.join(" ")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnrollmentStatus {
    Yes,
    No,
    Unknown,
}

impl EnrollmentStatus {
    /// `Y`/`YES` means enrolled; any other flag value means not enrolled.
    pub fn from_flag(flag: &str) -> Self {
        let flag = flag.trim();
        if flag.eq_ignore_ascii_case("Y") || flag.eq_ignore_ascii_case("YES") {
            EnrollmentStatus::Yes
        } else {
            EnrollmentStatus::No
        }
    }

    /// Mirror cells are copied verbatim from the export: only an exact `Y`
    /// means enrolled.
    pub fn from_mirror_flag(flag: &str) -> Self {
        if flag == "Y" {
            EnrollmentStatus::Yes
        } else {
            EnrollmentStatus::No
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Provenance {
    Remote,
    Mirror,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalRecord {
    pub identifier: Identifier,
    pub identity: IdentityRecord,
    pub enrollment: EnrollmentStatus,
    pub identity_source: Provenance,
    pub enrollment_source: Provenance,
}

impl CanonicalRecord {
    /// True when either half came from the mirror or carries no data.
    pub fn is_degraded(&self) -> bool {
        self.identity_source == Provenance::Mirror
            || self.enrollment_source == Provenance::Mirror
            || self.identity.is_unknown()
            || self.enrollment == EnrollmentStatus::Unknown
    }
}

/// Outcome of a single remote registry call.
#[derive(Debug)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    Unavailable(TransportError),
}

impl<T> Lookup<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(v) => Lookup::Found(f(v)),
            Lookup::NotFound => Lookup::NotFound,
            Lookup::Unavailable(err) => Lookup::Unavailable(err),
        }
    }
}
