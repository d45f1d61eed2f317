//! Typed canonical values and their type tags

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Type tag recorded for every tracked field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text
    Text,
    /// Email address
    Email,
    /// Absolute http(s) URL
    Url,
    /// Whole number
    Integer,
    /// Real number
    Decimal,
    /// Boolean
    Boolean,
    /// One of a closed set of uppercase variants
    Enum,
    /// Timestamp
    Date,
    /// Array of child entities
    Collection,
    /// Not declared by the stage schema
    Unknown,
}

impl FieldKind {
    /// Stable tag string
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Email => "email",
            FieldKind::Url => "url",
            FieldKind::Integer => "integer",
            FieldKind::Decimal => "decimal",
            FieldKind::Boolean => "boolean",
            FieldKind::Enum => "enum",
            FieldKind::Date => "date",
            FieldKind::Collection => "collection",
            FieldKind::Unknown => "unknown",
        }
    }

    /// Best-effort tag for a field the schema does not declare
    #[must_use]
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::String(_) => FieldKind::Text,
            Value::Number(n) if n.is_i64() || n.is_u64() => FieldKind::Integer,
            Value::Number(_) => FieldKind::Decimal,
            Value::Bool(_) => FieldKind::Boolean,
            Value::Array(_) => FieldKind::Collection,
            Value::Null | Value::Object(_) => FieldKind::Unknown,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coerced canonical value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Trimmed text (also used for emails and URLs)
    Text(String),
    /// Whole number
    Integer(i64),
    /// Real number
    Decimal(f64),
    /// Boolean
    Boolean(bool),
    /// Uppercased enum variant
    Enum(String),
    /// Normalised timestamp
    Date(DateTime<Utc>),
}

impl FieldValue {
    /// Text content, for text and enum values
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) | FieldValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean content
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric content as f64
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Plain JSON rendering (dates as RFC 3339)
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) | FieldValue::Enum(s) => Value::String(s.clone()),
            FieldValue::Integer(i) => Value::from(*i),
            FieldValue::Decimal(d) => serde_json::Number::from_f64(*d)
                .map_or(Value::Null, Value::Number),
            FieldValue::Boolean(b) => Value::Bool(*b),
            FieldValue::Date(d) => Value::String(d.to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) | FieldValue::Enum(s) => f.write_str(s),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Decimal(d) => write!(f, "{d}"),
            FieldValue::Boolean(b) => write!(f, "{b}"),
            FieldValue::Date(d) => f.write_str(&d.to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn infer_kind_from_json_shape() {
        assert_eq!(FieldKind::infer(&json!("x")), FieldKind::Text);
        assert_eq!(FieldKind::infer(&json!(3)), FieldKind::Integer);
        assert_eq!(FieldKind::infer(&json!(3.5)), FieldKind::Decimal);
        assert_eq!(FieldKind::infer(&json!(true)), FieldKind::Boolean);
        assert_eq!(FieldKind::infer(&json!([])), FieldKind::Collection);
        assert_eq!(FieldKind::infer(&json!({})), FieldKind::Unknown);
    }

    #[test]
    fn date_renders_as_rfc3339() {
        let date = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(FieldValue::Date(date).to_json(), json!("2024-03-01T00:00:00Z"));
    }

    #[test]
    fn serde_is_tagged() {
        let v = FieldValue::Integer(4);
        let encoded = serde_json::to_value(&v).unwrap();
        assert_eq!(encoded, json!({"type": "integer", "value": 4}));
        let decoded: FieldValue = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, v);
    }

    #[test]
    fn numeric_accessors() {
        assert_eq!(FieldValue::Integer(2).as_f64(), Some(2.0));
        assert_eq!(FieldValue::Decimal(1.5).as_f64(), Some(1.5));
        assert_eq!(FieldValue::Text("2".into()).as_f64(), None);
    }
}
