//! Field progress tracker
//!
//! Turns every key of a canonical payload into a field progress row so a
//! reconnecting client can restore exactly what it last sent, field by
//! field, whatever the stage's overall state.

use chrono::{DateTime, Utc};
use onboard_model::{FieldKind, FieldProgress, FieldStatus, StageView};
use onboard_schema::{is_blank, schema, CanonicalPayload, CollectionSpec, FieldSpec};
use serde_json::{Map, Value};
use tracing::debug;

const MASK: &str = "••••";

/// Field progress row builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldTracker {
    mask_sensitive: bool,
}

impl Default for FieldTracker {
    fn default() -> Self {
        Self {
            mask_sensitive: true,
        }
    }
}

impl FieldTracker {
    /// Tracker that masks sensitive values
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle masking of sensitive values
    #[inline]
    #[must_use]
    pub fn with_masking(mut self, mask_sensitive: bool) -> Self {
        self.mask_sensitive = mask_sensitive;
        self
    }

    /// One row per payload key
    #[must_use]
    pub fn track(
        &self,
        payload: &CanonicalPayload,
        skipped: bool,
        now: DateTime<Utc>,
    ) -> Vec<FieldProgress> {
        let stage = payload.stage();
        let schema = schema(stage);

        payload
            .iter()
            .map(|(field, raw)| {
                let (kind, required, value) = match schema.field(field) {
                    Some(spec) => (spec.kind(), spec.required, self.declared_value(spec, schema.collection(), raw)),
                    None => {
                        debug!(stage = %stage, field, "tracking undeclared field");
                        (FieldKind::infer(raw), false, non_null(raw.clone()))
                    }
                };
                let status = if skipped {
                    FieldStatus::Skipped
                } else if value.as_ref().is_some_and(|v| !is_blank(v)) {
                    FieldStatus::Completed
                } else {
                    FieldStatus::InProgress
                };
                FieldProgress {
                    field: field.to_string(),
                    kind,
                    value,
                    status,
                    required,
                    updated_at: Some(now),
                }
            })
            .collect()
    }

    /// Every declared field of a stage, stored rows first, `not-started` for the rest
    #[must_use]
    pub fn restore(view: &StageView) -> Vec<FieldProgress> {
        let schema = schema(view.stage);
        let mut rows: Vec<FieldProgress> = schema
            .fields()
            .iter()
            .map(|spec| {
                view.fields
                    .get(spec.name)
                    .cloned()
                    .unwrap_or_else(|| FieldProgress::not_started(spec.name, spec.kind(), spec.required))
            })
            .collect();
        rows.extend(
            view.fields
                .values()
                .filter(|row| schema.field(&row.field).is_none())
                .cloned(),
        );
        rows
    }

    /// Typed value when it coerces, the raw input when it does not
    fn declared_value(
        &self,
        spec: &FieldSpec,
        collection: Option<&CollectionSpec>,
        raw: &Value,
    ) -> Option<Value> {
        if let (Some(collection), Value::Array(items)) = (collection, raw) {
            let items = items
                .iter()
                .map(|item| match item {
                    Value::Object(entity) => Value::Object(self.entity_value(collection, entity)),
                    other => other.clone(),
                })
                .collect();
            return Some(Value::Array(items));
        }

        let value = match spec.coerce(raw) {
            Ok(typed) => typed.map(|v| v.to_json()),
            Err(_) => non_null(raw.clone()),
        }?;
        Some(self.mask_if(spec, value))
    }

    fn entity_value(&self, collection: &CollectionSpec, entity: &Map<String, Value>) -> Map<String, Value> {
        entity
            .iter()
            .map(|(field, raw)| {
                let value = match collection.entity_field(field) {
                    Some(spec) => self.mask_if(spec, raw.clone()),
                    None => raw.clone(),
                };
                (field.clone(), value)
            })
            .collect()
    }

    fn mask_if(&self, spec: &FieldSpec, value: Value) -> Value {
        match value {
            Value::String(s) if self.mask_sensitive && spec.sensitive => Value::String(mask(&s)),
            other => other,
        }
    }
}

fn non_null(value: Value) -> Option<Value> {
    (!value.is_null()).then_some(value)
}

/// `••••` plus the last four characters; short values are masked entirely
fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return MASK.to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{MASK}{tail}")
}
