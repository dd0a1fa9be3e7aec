//! Record transformation and validation
//!
//! Turns a [`RawRecord`] with an open set of fields into the typed
//! [`AfidAttributes`] that get published. Only the identifier is mandatory;
//! a record without a usable one is rejected and the caller skips it.

pub mod fields;

use crate::domain::record::AFID_FIELD;
use crate::domain::{AfidAttributes, RawRecord, ValidationError};
use fields::{attribute_text, parse_afid};

/// Source field for the attribute type
pub const AFID_TYPE_FIELD: &str = "afidType";
/// Source field for the stage classification
pub const STAGE_NAME_FIELD: &str = "stageName";
/// Source field for the campaign
pub const CAMPAIGN_FIELD: &str = "campaign";
/// Source field for the advertising group
pub const ADV_GROUP_FIELD: &str = "advGroup";

/// Project a raw record onto its normalized attributes
///
/// # Errors
///
/// Returns a [`ValidationError`] when `afid` is missing, non-numeric or zero.
///
/// # Examples
///
/// ```
/// use afid_export::core::transform::transform_record;
/// use afid_export::domain::RawRecord;
/// use mongodb::bson::doc;
///
/// let record = RawRecord::new(doc! { "afid": 42_i64, "campaign": "spring", "extra": true });
/// let attributes = transform_record(&record).unwrap();
///
/// assert_eq!(attributes.key(), "42");
/// assert_eq!(attributes.campaign.as_deref(), Some("spring"));
/// ```
pub fn transform_record(record: &RawRecord) -> Result<AfidAttributes, ValidationError> {
    let afid = parse_afid(record.get(AFID_FIELD))?;

    Ok(AfidAttributes {
        afid,
        afid_type: attribute_text(record.get(AFID_TYPE_FIELD)),
        stage_name: attribute_text(record.get(STAGE_NAME_FIELD)),
        campaign: attribute_text(record.get(CAMPAIGN_FIELD)),
        adv_group: attribute_text(record.get(ADV_GROUP_FIELD)),
    })
}
