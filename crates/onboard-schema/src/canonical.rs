//! Alias canonicalization
//!
//! Maps arbitrary client key names onto the canonical field set of a stage.
//! For each canonical field the value of the first present key in priority
//! order wins; every other alias of that field is dropped. Keys no field
//! claims pass through verbatim so later layers can still see and log them.
//!
//! Canonicalization is pure, idempotent and never fails.

use crate::catalog::{schema, CollectionSpec, FieldSpec};
use indexmap::IndexMap;
use onboard_model::Stage;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Raw client payload
pub type RawPayload = Map<String, Value>;

/// Alias-free payload of one stage
///
/// Canonical fields come first in declaration order, passthrough keys follow
/// in input order. Equality ignores order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalPayload {
    stage: Stage,
    fields: IndexMap<String, Value>,
}

impl CanonicalPayload {
    /// Stage the payload was canonicalized for
    #[inline]
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Value under a canonical (or passthrough) key
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Keys, canonical first
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Key/value pairs, canonical first
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the payload carries no keys
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Back to a plain JSON object
    #[must_use]
    pub fn to_raw(&self) -> RawPayload {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Canonicalize a raw payload for a stage
///
/// For collection stages every object element of the collection is also
/// canonicalized against the entity alias table.
#[must_use]
pub fn canonicalize(stage: Stage, raw: &RawPayload) -> CanonicalPayload {
    let schema = schema(stage);
    let mut fields = resolve(schema.fields(), raw);

    if let Some(collection) = schema.collection() {
        if let Some(Value::Array(items)) = fields.get_mut(collection.field.name) {
            for item in items.iter_mut() {
                if let Value::Object(entity) = item {
                    *entity = canonicalize_entity(collection, entity);
                }
            }
        }
    }

    CanonicalPayload { stage, fields }
}

/// Canonicalize one collection element
#[must_use]
pub fn canonicalize_entity(collection: &CollectionSpec, raw: &RawPayload) -> RawPayload {
    resolve(&collection.entity, raw).into_iter().collect()
}

fn resolve(specs: &[FieldSpec], raw: &RawPayload) -> IndexMap<String, Value> {
    let mut out = IndexMap::with_capacity(raw.len());
    let mut claimed: HashSet<&str> = HashSet::new();

    for spec in specs {
        let mut winner = None;
        for key in spec.keys() {
            if raw.contains_key(key) {
                claimed.insert(key);
                if winner.is_none() {
                    winner = raw.get(key);
                }
            }
        }
        if let Some(value) = winner {
            out.insert(spec.name.to_string(), value.clone());
        }
    }

    for (key, value) in raw {
        if !claimed.contains(key.as_str()) && !out.contains_key(key) {
            out.insert(key.clone(), value.clone());
        }
    }

    out
}
