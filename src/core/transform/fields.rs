//! Field extraction from raw BSON values

use crate::domain::{Afid, ValidationError};
use mongodb::bson::Bson;

/// Read the identifier from its BSON value
///
/// Accepts 32/64-bit integers and doubles holding a whole number. Strings are
/// not coerced: a record carrying `"afid": "42"` is malformed.
pub fn parse_afid(value: Option<&Bson>) -> Result<Afid, ValidationError> {
    let raw = match value {
        None | Some(Bson::Null) | Some(Bson::Undefined) => {
            return Err(ValidationError::MissingIdentifier)
        }
        Some(Bson::Int32(v)) => i64::from(*v),
        Some(Bson::Int64(v)) => *v,
        Some(Bson::Double(v)) => integral_double(*v)
            .ok_or_else(|| ValidationError::NonNumericIdentifier(format!("double {v}")))?,
        Some(other) => {
            return Err(ValidationError::NonNumericIdentifier(format!(
                "{:?}",
                other.element_type()
            )))
        }
    };

    Afid::new(raw)
}

fn integral_double(v: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
    if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

/// Read an optional attribute as text
///
/// Scalars are rendered as strings. Absent, null and structured values
/// (documents, arrays, binaries) yield `None`.
pub fn attribute_text(value: Option<&Bson>) -> Option<String> {
    match value? {
        Bson::String(s) => Some(s.clone()),
        Bson::Int32(v) => Some(v.to_string()),
        Bson::Int64(v) => Some(v.to_string()),
        Bson::Double(v) => Some(v.to_string()),
        Bson::Boolean(v) => Some(v.to_string()),
        Bson::Symbol(s) => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId};
    use test_case::test_case;

    #[test_case(Bson::Int32(42), 42 ; "int32")]
    #[test_case(Bson::Int64(9_000_000_000), 9_000_000_000 ; "int64")]
    #[test_case(Bson::Double(1001.0), 1001 ; "integral double")]
    #[test_case(Bson::Int64(-5), -5 ; "negative")]
    fn test_parse_afid_numeric(value: Bson, expected: i64) {
        assert_eq!(parse_afid(Some(&value)).unwrap().value(), expected);
    }

    #[test_case(None, ValidationError::MissingIdentifier ; "absent")]
    #[test_case(Some(Bson::Null), ValidationError::MissingIdentifier ; "null")]
    #[test_case(Some(Bson::Int32(0)), ValidationError::ZeroIdentifier ; "zero int32")]
    #[test_case(Some(Bson::Int64(0)), ValidationError::ZeroIdentifier ; "zero int64")]
    #[test_case(Some(Bson::Double(0.0)), ValidationError::ZeroIdentifier ; "zero double")]
    fn test_parse_afid_rejected(value: Option<Bson>, expected: ValidationError) {
        assert_eq!(parse_afid(value.as_ref()).unwrap_err(), expected);
    }

    #[test]
    fn test_parse_afid_non_numeric() {
        let cases = [
            Bson::String("42".to_string()),
            Bson::Double(1.5),
            Bson::Double(f64::NAN),
            Bson::Boolean(true),
            Bson::ObjectId(ObjectId::new()),
            Bson::Document(doc! { "value": 1 }),
        ];

        for value in cases {
            assert!(
                matches!(
                    parse_afid(Some(&value)),
                    Err(ValidationError::NonNumericIdentifier(_))
                ),
                "{value:?} should be rejected as non-numeric"
            );
        }
    }

    #[test]
    fn test_attribute_text() {
        assert_eq!(
            attribute_text(Some(&Bson::String("live".to_string()))),
            Some("live".to_string())
        );
        assert_eq!(attribute_text(Some(&Bson::Int32(7))), Some("7".to_string()));
        assert_eq!(attribute_text(Some(&Bson::Null)), None);
        assert_eq!(attribute_text(Some(&Bson::Array(vec![]))), None);
        assert_eq!(attribute_text(None), None);
    }
}
