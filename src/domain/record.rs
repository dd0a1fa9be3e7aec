//! Raw and normalized attribute records
//!
//! [`RawRecord`] is the document as read from the store, with an open set of
//! fields. [`AfidAttributes`] is the typed projection that gets published.

use super::ids::Afid;
use chrono::{DateTime, Utc};
use mongodb::bson::{Bson, Document};
use serde::{Deserialize, Serialize};

/// Name of the identifying field
pub const AFID_FIELD: &str = "afid";

/// Name of the last-modified field that gates incremental inclusion
pub const UPDATED_FIELD: &str = "updated";

/// A document read from the source collection
///
/// Only `afid` and `updated` carry meaning here; every other field is kept
/// as-is and ignored by the exporter.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    document: Document,
}

impl RawRecord {
    /// Wrap a BSON document
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// Look up a field by name
    pub fn get(&self, field: &str) -> Option<&Bson> {
        self.document.get(field)
    }

    /// Last-modified timestamp
    ///
    /// Only BSON datetimes count. The store compares `updated` against a BSON
    /// date, so any other type never falls inside a time window.
    pub fn updated(&self) -> Option<DateTime<Utc>> {
        match self.document.get(UPDATED_FIELD)? {
            Bson::DateTime(dt) => DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis()),
            _ => None,
        }
    }
}

impl From<Document> for RawRecord {
    fn from(document: Document) -> Self {
        Self::new(document)
    }
}

/// Normalized attribute set published for each valid record
///
/// Field names are stable: absent attributes serialize as `null` rather than
/// being dropped, so consumers always see the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AfidAttributes {
    /// Business identifier
    pub afid: Afid,

    /// Attribute type
    #[serde(rename = "afidType")]
    pub afid_type: Option<String>,

    /// Stage classification
    #[serde(rename = "stageName")]
    pub stage_name: Option<String>,

    /// Campaign
    pub campaign: Option<String>,

    /// Advertising group
    #[serde(rename = "advGroup")]
    pub adv_group: Option<String>,
}

impl AfidAttributes {
    /// Create attributes with only the identifier set
    pub fn new(afid: Afid) -> Self {
        Self {
            afid,
            afid_type: None,
            stage_name: None,
            campaign: None,
            adv_group: None,
        }
    }

    /// Broker message key
    pub fn key(&self) -> String {
        self.afid.to_key()
    }

    /// Broker message value (flat JSON object)
    pub fn to_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
