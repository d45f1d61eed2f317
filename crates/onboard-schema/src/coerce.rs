//! Per-field coercion of canonical JSON values into typed values

use crate::catalog::{FieldSpec, ValueRule};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use onboard_model::FieldValue;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("valid email pattern"));

static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://[^\s/?#:]+(:\d+)?([/?#]\S*)?$").expect("valid url pattern")
});

const TRUTHY: &[&str] = &["true", "yes", "y", "on", "1"];
const FALSY: &[&str] = &["false", "no", "n", "off", "0"];

/// Outcome of coercing one present value
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Coerced {
    /// Blank or null: a deliberate clear, absent for required checks
    Clear,
    /// Typed value
    Value(FieldValue),
}

/// Coerce a present value according to its rule
///
/// Errors carry the offending raw (trimmed) input so the client can see
/// exactly what was rejected.
pub(crate) fn coerce(rule: &ValueRule, raw: &Value) -> Result<Coerced, String> {
    if is_blank(raw) {
        return Ok(Coerced::Clear);
    }
    let value = match rule {
        ValueRule::Text => FieldValue::Text(text(raw)?),
        ValueRule::Email => email(raw)?,
        ValueRule::Url => url(raw)?,
        ValueRule::Integer { min, max } => integer(raw, *min, *max)?,
        ValueRule::Decimal { min, max } => decimal(raw, *min, *max)?,
        ValueRule::Boolean => boolean(raw)?,
        ValueRule::Enum(variants) => enumeration(raw, variants)?,
        ValueRule::Date => date(raw)?,
        ValueRule::Collection => {
            return Err(format!("expected a collection, got {}", type_name(raw)))
        }
    };
    Ok(Coerced::Value(value))
}

impl FieldSpec {
    /// Coerce a present value with this field's rule
    ///
    /// `Ok(None)` is a blank value (a clear).
    ///
    /// # Errors
    ///
    /// The coercion failure message.
    pub fn coerce(&self, raw: &Value) -> Result<Option<FieldValue>, String> {
        match coerce(&self.rule, raw)? {
            Coerced::Clear => Ok(None),
            Coerced::Value(value) => Ok(Some(value)),
        }
    }
}

/// Null, blank strings and empty containers
pub fn is_blank(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// JSON type name for messages
pub(crate) fn type_name(raw: &Value) -> &'static str {
    match raw {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn text(raw: &Value) -> Result<String, String> {
    match raw {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(format!("expected text, got {}", type_name(other))),
    }
}

fn email(raw: &Value) -> Result<FieldValue, String> {
    let s = text(raw)?;
    if EMAIL.is_match(&s) {
        Ok(FieldValue::Text(s.to_lowercase()))
    } else {
        Err(format!("invalid email address '{s}'"))
    }
}

fn url(raw: &Value) -> Result<FieldValue, String> {
    let s = text(raw)?;
    if URL.is_match(&s) {
        Ok(FieldValue::Text(s))
    } else {
        Err(format!("invalid url '{s}'"))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn integer(raw: &Value, min: Option<i64>, max: Option<i64>) -> Result<FieldValue, String> {
    let whole = |f: f64| (f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15).then_some(f as i64);

    let n = match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(whole))
            .ok_or_else(|| format!("expected a whole number, got {n}"))?,
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole))
                .ok_or_else(|| format!("expected a whole number, got '{s}'"))?
        }
        other => return Err(format!("expected a whole number, got {}", type_name(other))),
    };

    if let Some(min) = min.filter(|m| n < *m) {
        return Err(format!("must be at least {min}, got {n}"));
    }
    if let Some(max) = max.filter(|m| n > *m) {
        return Err(format!("must be at most {max}, got {n}"));
    }
    Ok(FieldValue::Integer(n))
}

fn decimal(raw: &Value, min: Option<f64>, max: Option<f64>) -> Result<FieldValue, String> {
    let n = match raw {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("expected a number, got {n}"))?,
        Value::String(s) => {
            let s = s.trim();
            s.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .ok_or_else(|| format!("expected a number, got '{s}'"))?
        }
        other => return Err(format!("expected a number, got {}", type_name(other))),
    };

    if let Some(min) = min.filter(|m| n < *m) {
        return Err(format!("must be at least {min}, got {n}"));
    }
    if let Some(max) = max.filter(|m| n > *m) {
        return Err(format!("must be at most {max}, got {n}"));
    }
    Ok(FieldValue::Decimal(n))
}

fn boolean(raw: &Value) -> Result<FieldValue, String> {
    match raw {
        Value::Bool(b) => Ok(FieldValue::Boolean(*b)),
        Value::String(s) => {
            let lowered = s.trim().to_lowercase();
            if TRUTHY.contains(&lowered.as_str()) {
                Ok(FieldValue::Boolean(true))
            } else if FALSY.contains(&lowered.as_str()) {
                Ok(FieldValue::Boolean(false))
            } else {
                Err(format!("expected a boolean, got '{}'", s.trim()))
            }
        }
        Value::Number(n) => match n.as_i64() {
            Some(1) => Ok(FieldValue::Boolean(true)),
            Some(0) => Ok(FieldValue::Boolean(false)),
            _ => Err(format!("expected a boolean, got {n}")),
        },
        other => Err(format!("expected a boolean, got {}", type_name(other))),
    }
}

fn enumeration(raw: &Value, variants: &[&str]) -> Result<FieldValue, String> {
    let Value::String(s) = raw else {
        return Err(format!("expected one of {}, got {}", variants.join(", "), type_name(raw)));
    };
    let upper = s.trim().to_uppercase();
    if variants.contains(&upper.as_str()) {
        Ok(FieldValue::Enum(upper))
    } else {
        Err(format!(
            "'{}' is not one of {}",
            s.trim(),
            variants.join(", ")
        ))
    }
}

fn date(raw: &Value) -> Result<FieldValue, String> {
    let Value::String(s) = raw else {
        return Err(format!("expected a date string, got {}", type_name(raw)));
    };
    let s = s.trim();
    parse_date(s)
        .map(FieldValue::Date)
        .ok_or_else(|| format!("invalid date '{s}'"))
}

/// Accepted spellings: RFC 3339, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM:SS`,
/// `YYYY-MM-DD`, `MM/DD/YYYY`. Naive values are taken as UTC.
fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for format in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(day) = NaiveDate::parse_from_str(s, format) {
            return day
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }
    None
}
