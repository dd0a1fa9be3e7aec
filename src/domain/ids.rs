//! Domain identifier types with validation

use super::errors::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Business identifier of an attribute document
///
/// An `Afid` is never zero. Its decimal form is used as the broker message
/// key, so republishing the same document replaces rather than duplicates
/// it downstream.
///
/// # Examples
///
/// ```
/// use afid_export::domain::ids::Afid;
///
/// let afid = Afid::new(1001).unwrap();
/// assert_eq!(afid.to_key(), "1001");
/// assert!(Afid::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Afid(i64);

impl Afid {
    /// Creates a new Afid, rejecting zero
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if value == 0 {
            return Err(ValidationError::ZeroIdentifier);
        }
        Ok(Self(value))
    }

    /// Returns the raw integer value
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Returns the broker message key for this identifier
    pub fn to_key(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for Afid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Afid {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| ValidationError::NonNumericIdentifier(format!("string '{s}'")))?;
        Self::new(value)
    }
}

impl TryFrom<i64> for Afid {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Afid> for i64 {
    fn from(afid: Afid) -> Self {
        afid.0
    }
}
