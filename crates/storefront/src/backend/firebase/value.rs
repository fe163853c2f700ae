//! Firestore REST value codec.
//!
//! Firestore wraps every field in a single-key object naming its type, e.g.
//! `{"stringValue": "abc"}` or `{"integerValue": "42"}`. That is serde's
//! externally tagged enum layout, so [`Value`] maps onto it directly.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use gamewar_core::Dinars;

/// A typed Firestore value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    /// 64-bit integers travel as decimal strings.
    IntegerValue(String),
    DoubleValue(f64),
    /// RFC 3339, always UTC.
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(serde_json::Value),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: Fields,
}

/// The field map of a document or of a map value.
pub type Fields = BTreeMap<String, Value>;

impl Value {
    #[must_use]
    pub const fn null() -> Self {
        Self::NullValue(())
    }

    #[must_use]
    pub fn string(s: impl Into<String>) -> Self {
        Self::StringValue(s.into())
    }

    #[must_use]
    pub fn integer(n: i64) -> Self {
        Self::IntegerValue(n.to_string())
    }

    #[must_use]
    pub fn timestamp(at: DateTime<Utc>) -> Self {
        Self::TimestampValue(at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Whole amounts are stored as integers, fractional ones as doubles.
    #[must_use]
    pub fn dinars(amount: Dinars) -> Self {
        let decimal = amount.amount().normalize();
        if decimal.scale() == 0
            && let Some(whole) = decimal.to_i64()
        {
            return Self::integer(whole);
        }
        Self::DoubleValue(decimal.to_f64().unwrap_or_default())
    }

    /// `None` becomes `nullValue`.
    #[must_use]
    pub fn optional_string(s: Option<&str>) -> Self {
        s.map_or_else(Self::null, Self::string)
    }

    #[must_use]
    pub fn array(values: impl IntoIterator<Item = Self>) -> Self {
        Self::ArrayValue(ArrayValue {
            values: values.into_iter().collect(),
        })
    }

    #[must_use]
    pub const fn map(fields: Fields) -> Self {
        Self::MapValue(MapValue { fields })
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::StringValue(s) => Some(s),
            _ => None,
        }
    }

    /// Integers, and doubles with no fractional part.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::IntegerValue(s) => s.parse().ok(),
            #[allow(clippy::cast_possible_truncation)]
            Self::DoubleValue(d) if d.fract() == 0.0 && d.is_finite() => Some(*d as i64),
            // Some documents were written from forms without number coercion.
            Self::StringValue(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::IntegerValue(s) => s.parse().ok(),
            Self::DoubleValue(d) => Decimal::try_from(*d).ok(),
            Self::StringValue(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Timestamps, or RFC 3339 strings written by older clients.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::TimestampValue(s) | Self::StringValue(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|at| at.with_timezone(&Utc)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::ArrayValue(array) => Some(&array.values),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_map(&self) -> Option<&Fields> {
        match self {
            Self::MapValue(map) => Some(&map.fields),
            _ => None,
        }
    }
}

/// Typed getters over a field map.
///
/// Absent fields and fields of an unexpected type both read as `None`.
pub trait FieldsExt {
    fn str(&self, key: &str) -> Option<&str>;
    fn i64(&self, key: &str) -> Option<i64>;
    fn decimal(&self, key: &str) -> Option<Decimal>;
    fn timestamp(&self, key: &str) -> Option<DateTime<Utc>>;
    fn array(&self, key: &str) -> &[Value];
    /// A string field, or an empty string.
    fn text(&self, key: &str) -> String {
        self.str(key).unwrap_or_default().to_owned()
    }
    /// A non-blank string field.
    fn non_blank(&self, key: &str) -> Option<String> {
        self.str(key)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_owned)
    }
}

impl FieldsExt for Fields {
    fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    fn i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    fn decimal(&self, key: &str) -> Option<Decimal> {
        self.get(key).and_then(Value::as_decimal)
    }

    fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        self.get(key).and_then(Value::as_timestamp)
    }

    fn array(&self, key: &str) -> &[Value] {
        self.get(key).and_then(Value::as_array).unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_wire_layout() {
        assert_eq!(
            serde_json::to_value(Value::string("manette")).unwrap(),
            json!({"stringValue": "manette"})
        );
        assert_eq!(
            serde_json::to_value(Value::integer(4500)).unwrap(),
            json!({"integerValue": "4500"})
        );
        assert_eq!(
            serde_json::to_value(Value::null()).unwrap(),
            json!({"nullValue": null})
        );
        assert_eq!(
            serde_json::to_value(Value::array([])).unwrap(),
            json!({"arrayValue": {}})
        );
    }

    #[test]
    fn test_decodes_nested_document_fields() {
        let raw = json!({
            "price": {"doubleValue": 2500.5},
            "stock": {"integerValue": "3"},
            "images": {"arrayValue": {"values": [{"stringValue": "https://img/1.png"}]}},
            "empty": {"arrayValue": {}},
            "stockHistory": {"arrayValue": {"values": [
                {"mapValue": {"fields": {"newStock": {"integerValue": "5"}}}}
            ]}},
            "createdAt": {"timestampValue": "2025-03-01T10:00:00.123456Z"}
        });
        let fields: Fields = serde_json::from_value(raw).unwrap();

        assert_eq!(fields.decimal("price"), Some(Decimal::new(25005, 1)));
        assert_eq!(fields.i64("stock"), Some(3));
        assert_eq!(fields.array("images")[0].as_str(), Some("https://img/1.png"));
        assert!(fields.array("empty").is_empty());
        assert!(fields.array("missing").is_empty());
        let entry = fields.array("stockHistory")[0].as_map().unwrap();
        assert_eq!(entry.i64("newStock"), Some(5));
        assert_eq!(
            fields.timestamp("createdAt").unwrap().to_rfc3339(),
            "2025-03-01T10:00:00.123456+00:00"
        );
    }

    #[test]
    fn test_lenient_numbers() {
        assert_eq!(Value::DoubleValue(12.0).as_i64(), Some(12));
        assert_eq!(Value::DoubleValue(12.5).as_i64(), None);
        assert_eq!(Value::string(" 7 ").as_i64(), Some(7));
        assert_eq!(Value::string("n/a").as_i64(), None);
    }

    #[test]
    fn test_dinars_encoding() {
        assert_eq!(Value::dinars(Dinars::from_whole(1500)), Value::integer(1500));
        assert_eq!(
            Value::dinars(Dinars::new(Decimal::new(15000, 1))),
            Value::integer(1500)
        );
        assert_eq!(
            Value::dinars(Dinars::new(Decimal::new(9995, 1))),
            Value::DoubleValue(999.5)
        );
    }
}
