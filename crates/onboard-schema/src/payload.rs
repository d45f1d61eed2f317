//! Validated, typed payloads handed to the persistence layer

use crate::error::FieldError;
use onboard_model::{FieldValue, Stage};
use serde::Serialize;
use std::collections::BTreeMap;

/// Validation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Draft save: only fields that are present are checked
    Partial,
    /// Final submit: the payload must carry every required field
    Complete,
}

impl Mode {
    /// Mode for a request's `enforce_required` switch
    #[inline]
    #[must_use]
    pub const fn from_enforce_required(enforce: bool) -> Self {
        if enforce {
            Mode::Complete
        } else {
            Mode::Partial
        }
    }

    /// Whether required fields are enforced
    #[inline]
    #[must_use]
    pub const fn enforces_required(self) -> bool {
        matches!(self, Mode::Complete)
    }
}

/// Change to one field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum PatchValue {
    /// Store the value
    Set(FieldValue),
    /// Remove any stored value (submitted as null or blank)
    Clear,
}

/// Field-name to change map, in canonical name order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldPatch(BTreeMap<String, PatchValue>);

impl FieldPatch {
    /// Empty patch
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change
    pub fn insert(&mut self, field: impl Into<String>, change: PatchValue) {
        self.0.insert(field.into(), change);
    }

    /// Change for a field
    #[inline]
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&PatchValue> {
        self.0.get(field)
    }

    /// Value being set for a field, if any
    #[must_use]
    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        match self.0.get(field) {
            Some(PatchValue::Set(v)) => Some(v),
            _ => None,
        }
    }

    /// Whether the patch touches a field
    #[inline]
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// All changes
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PatchValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Fields being set
    pub fn set(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.iter().filter_map(|(k, v)| match v {
            PatchValue::Set(value) => Some((k, value)),
            PatchValue::Clear => None,
        })
    }

    /// Fields being cleared
    pub fn cleared(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter_map(|(k, v)| matches!(v, PatchValue::Clear).then_some(k))
    }

    /// Number of touched fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is touched
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, PatchValue)> for FieldPatch {
    fn from_iter<I: IntoIterator<Item = (String, PatchValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A collection element that passed validation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedEntity {
    /// Position in the submitted array
    pub index: usize,
    /// Normalised natural key
    pub natural_key: String,
    /// Submitted fields
    pub patch: FieldPatch,
    /// Values applied only if the entity turns out to be new
    pub defaults: BTreeMap<String, FieldValue>,
}

/// A collection element that failed validation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedEntity {
    /// Position in the submitted array
    pub index: usize,
    /// Natural key, when one could still be derived
    pub natural_key: Option<String>,
    /// Key fields that did coerce, for matching stored rows
    pub key_values: BTreeMap<String, FieldValue>,
    /// What went wrong, with `collection[index].field` paths
    pub errors: Vec<FieldError>,
}

/// Validated content of a collection submission
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntityBatch {
    /// Whether the collection key was present at all
    pub supplied: bool,
    /// Entities to create or update, in submission order
    pub entities: Vec<ValidatedEntity>,
    /// Entities skipped for this submission
    pub rejected: Vec<RejectedEntity>,
}

impl EntityBatch {
    /// Collection key absent: stored entities stay as they are
    #[inline]
    #[must_use]
    pub fn untouched() -> Self {
        Self::default()
    }

    /// Collection key present (possibly empty)
    #[inline]
    #[must_use]
    pub fn supplied() -> Self {
        Self {
            supplied: true,
            ..Self::default()
        }
    }

    /// Natural keys present in the submission, valid or not
    pub fn submitted_keys(&self) -> impl Iterator<Item = &str> {
        self.entities
            .iter()
            .map(|e| e.natural_key.as_str())
            .chain(self.rejected.iter().filter_map(|r| r.natural_key.as_deref()))
    }
}

/// Stage-shaped body of a validated payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum StageBody {
    /// Scalar stage patch
    Scalar(FieldPatch),
    /// Collection stage batch
    Collection(EntityBatch),
}

/// Output of the validator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedPayload {
    /// Stage
    pub stage: Stage,
    /// Mode used
    pub mode: Mode,
    /// Typed content
    pub body: StageBody,
    /// Keys the schema does not declare, kept for field progress and logs
    pub passthrough: Vec<String>,
}

impl ValidatedPayload {
    /// Scalar patch, for scalar stages
    #[must_use]
    pub fn patch(&self) -> Option<&FieldPatch> {
        match &self.body {
            StageBody::Scalar(patch) => Some(patch),
            StageBody::Collection(_) => None,
        }
    }

    /// Entity batch, for collection stages
    #[must_use]
    pub fn batch(&self) -> Option<&EntityBatch> {
        match &self.body {
            StageBody::Collection(batch) => Some(batch),
            StageBody::Scalar(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_splits_sets_and_clears() {
        let mut patch = FieldPatch::new();
        patch.insert("city", PatchValue::Set(FieldValue::Text("Porto".into())));
        patch.insert("state", PatchValue::Clear);

        assert_eq!(patch.value("city").and_then(FieldValue::as_str), Some("Porto"));
        assert!(patch.value("state").is_none());
        assert!(patch.contains("state"));
        assert_eq!(patch.cleared().collect::<Vec<_>>(), vec!["state"]);
        assert_eq!(patch.set().count(), 1);
    }

    #[test]
    fn submitted_keys_include_rejected_entities_with_keys() {
        let mut batch = EntityBatch::supplied();
        batch.entities.push(ValidatedEntity {
            index: 0,
            natural_key: "airbnb".into(),
            patch: FieldPatch::new(),
            defaults: BTreeMap::new(),
        });
        batch.rejected.push(RejectedEntity {
            index: 1,
            natural_key: Some("vrbo".into()),
            key_values: BTreeMap::new(),
            errors: vec![],
        });
        batch.rejected.push(RejectedEntity {
            index: 2,
            natural_key: None,
            key_values: BTreeMap::new(),
            errors: vec![],
        });
        assert_eq!(batch.submitted_keys().collect::<Vec<_>>(), vec!["airbnb", "vrbo"]);
    }

    #[test]
    fn mode_from_switch() {
        assert_eq!(Mode::from_enforce_required(true), Mode::Complete);
        assert!(!Mode::from_enforce_required(false).enforces_required());
    }
}
