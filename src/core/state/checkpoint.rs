//! Checkpoint model for tracking incremental export state
//!
//! A checkpoint is the single instant at which the previous successful run
//! completed. It is persisted as `{"LastRunDate": "<RFC 3339 UTC>"}`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Persisted form of the last successful run
///
/// # Examples
///
/// ```
/// use afid_export::core::state::Checkpoint;
/// use chrono::{TimeZone, Utc};
///
/// let checkpoint = Checkpoint::new(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
/// let json = checkpoint.to_json().unwrap();
///
/// assert!(json.contains("\"LastRunDate\""));
/// assert_eq!(Checkpoint::from_json(&json).unwrap(), checkpoint);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Instant the last successful run completed
    #[serde(rename = "LastRunDate", with = "rfc3339_nanos")]
    pub last_run_date: DateTime<Utc>,
}

impl Checkpoint {
    /// Create a checkpoint for the given instant
    pub fn new(last_run_date: DateTime<Utc>) -> Self {
        Self { last_run_date }
    }

    /// Serialize to the on-disk JSON form
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse the on-disk JSON form
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Age of the checkpoint relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_run_date
    }
}

/// Full sub-second precision with a `Z` suffix
mod rfc3339_nanos {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_checkpoint_json_shape() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let json = Checkpoint::new(instant).to_json().unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["LastRunDate"], "2024-03-01T10:00:00Z");
        assert_eq!(value.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_checkpoint_keeps_sub_second_precision() {
        let instant = Utc.timestamp_opt(1_709_287_200, 123_456_789).unwrap();
        let checkpoint = Checkpoint::new(instant);

        let parsed = Checkpoint::from_json(&checkpoint.to_json().unwrap()).unwrap();
        assert_eq!(parsed.last_run_date, instant);
    }

    #[test]
    fn test_checkpoint_accepts_offset_timestamps() {
        let parsed =
            Checkpoint::from_json(r#"{"LastRunDate": "2024-03-01T12:00:00+02:00"}"#).unwrap();
        assert_eq!(
            parsed.last_run_date,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_checkpoint_rejects_garbage() {
        assert!(Checkpoint::from_json("{}").is_err());
        assert!(Checkpoint::from_json(r#"{"LastRunDate": "last tuesday"}"#).is_err());
        assert!(Checkpoint::from_json("not json").is_err());
    }

    #[test]
    fn test_checkpoint_age() {
        let then = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap();
        assert_eq!(Checkpoint::new(then).age(now), chrono::Duration::hours(24));
    }
}
