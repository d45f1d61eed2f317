//! Stage schema validation in partial and complete mode
//!
//! The validator turns a [`CanonicalPayload`] into a [`ValidatedPayload`]:
//! every present field is coerced with its [`ValueRule`](crate::ValueRule),
//! and in [`Mode::Complete`] every required field must be present and
//! non-blank. Failures are aggregated; one error per bad field, never just
//! the first.
//!
//! Collection stages validate each element on its own. A bad element is
//! reported as a [`RejectedEntity`] and never fails the call.

use crate::canonical::CanonicalPayload;
use crate::catalog::{schema, CollectionSpec, FieldDefault, FieldSpec};
use crate::coerce::{coerce, is_blank, type_name, Coerced};
use crate::error::{FieldError, ValidationError};
use crate::payload::{
    EntityBatch, FieldPatch, Mode, PatchValue, RejectedEntity, StageBody, ValidatedEntity,
    ValidatedPayload,
};
use onboard_model::{FieldValue, Stage};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Default cap on elements in one collection submission
pub const DEFAULT_MAX_ENTITIES: usize = 200;

/// Stage schema validator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validator {
    max_entities: usize,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            max_entities: DEFAULT_MAX_ENTITIES,
        }
    }
}

impl Validator {
    /// Validator with the default batch cap
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the collection batch cap
    #[inline]
    #[must_use]
    pub fn with_max_entities(mut self, max_entities: usize) -> Self {
        self.max_entities = max_entities;
        self
    }

    /// Collection batch cap
    #[inline]
    #[must_use]
    pub fn max_entities(&self) -> usize {
        self.max_entities
    }

    /// Validate a canonical payload
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every invalid field, plus every
    /// missing required field in [`Mode::Complete`].
    pub fn validate(
        &self,
        payload: &CanonicalPayload,
        mode: Mode,
    ) -> Result<ValidatedPayload, ValidationError> {
        let stage = payload.stage();
        let schema = schema(stage);
        let mut errors = Vec::new();

        let passthrough: Vec<String> = payload
            .keys()
            .filter(|key| schema.field(key).is_none())
            .map(str::to_string)
            .collect();

        let body = match schema.collection() {
            None => StageBody::Scalar(check_fields(
                schema.fields(),
                |key| payload.get(key),
                mode.enforces_required(),
                str::to_string,
                &mut errors,
            )),
            Some(collection) => StageBody::Collection(self.entity_batch(
                collection,
                payload.get(collection.field.name),
                mode,
                &mut errors,
            )),
        };

        if !errors.is_empty() {
            debug!(stage = %stage, errors = errors.len(), ?mode, "payload rejected");
            return Err(ValidationError::new(Some(stage), errors));
        }

        Ok(ValidatedPayload {
            stage,
            mode,
            body,
            passthrough,
        })
    }

    fn entity_batch(
        &self,
        collection: &CollectionSpec,
        raw: Option<&Value>,
        mode: Mode,
        errors: &mut Vec<FieldError>,
    ) -> EntityBatch {
        let name = collection.field.name;

        let items: &[Value] = match raw {
            None => {
                if mode.enforces_required() {
                    errors.push(FieldError::required(name));
                }
                return EntityBatch::untouched();
            }
            Some(Value::Array(items)) => items.as_slice(),
            Some(blank) if is_blank(blank) => &[][..],
            Some(other) => {
                errors.push(FieldError::new(
                    name,
                    format!("expected an array, got {}", type_name(other)),
                ));
                return EntityBatch::untouched();
            }
        };

        if items.len() > self.max_entities {
            errors.push(FieldError::new(
                name,
                format!(
                    "at most {} entities per submission, got {}",
                    self.max_entities,
                    items.len()
                ),
            ));
            return EntityBatch::untouched();
        }
        if items.is_empty() && mode.enforces_required() {
            errors.push(FieldError::required(name));
        }

        let mut batch = EntityBatch::supplied();
        let mut seen = HashSet::new();

        for (index, item) in items.iter().enumerate() {
            match validate_entity(collection, index, item) {
                Ok(entity) if seen.insert(entity.natural_key.clone()) => batch.entities.push(entity),
                Ok(duplicate) => batch.rejected.push(RejectedEntity {
                    index,
                    errors: vec![FieldError::new(
                        format!("{name}[{index}]"),
                        format!(
                            "duplicates natural key '{}' of an earlier entity",
                            duplicate.natural_key
                        ),
                    )],
                    key_values: key_values(collection, &duplicate.patch),
                    natural_key: Some(duplicate.natural_key),
                }),
                Err(rejected) => {
                    if let Some(key) = &rejected.natural_key {
                        seen.insert(key.clone());
                    }
                    batch.rejected.push(rejected);
                }
            }
        }

        if mode.enforces_required() && !items.is_empty() && batch.entities.is_empty() {
            errors.push(FieldError::required(name));
            errors.extend(
                batch
                    .rejected
                    .iter()
                    .flat_map(|rejected| rejected.errors.iter().cloned()),
            );
        }

        if !batch.rejected.is_empty() {
            debug!(
                collection = name,
                accepted = batch.entities.len(),
                rejected = batch.rejected.len(),
                "entities rejected"
            );
        }
        batch
    }
}

/// Resolve a client stage ordinal
///
/// # Errors
///
/// Ordinals outside `1..=10` are a validation failure on `stage`.
pub fn stage_for_ordinal(ordinal: i64) -> Result<Stage, ValidationError> {
    Stage::try_from(ordinal).map_err(|e| ValidationError::single(None, "stage", e.to_string()))
}

fn validate_entity(
    collection: &CollectionSpec,
    index: usize,
    item: &Value,
) -> Result<ValidatedEntity, RejectedEntity> {
    let name = collection.field.name;
    let Value::Object(fields) = item else {
        return Err(RejectedEntity {
            index,
            natural_key: None,
            key_values: BTreeMap::new(),
            errors: vec![FieldError::new(
                format!("{name}[{index}]"),
                format!("expected an object, got {}", type_name(item)),
            )],
        });
    };

    let mut errors = Vec::new();
    let patch = check_fields(
        &collection.entity,
        |key| fields.get(key),
        true,
        |field| format!("{name}[{index}].{field}"),
        &mut errors,
    );
    let natural_key = collection.natural_key.derive(|field| patch.value(field));

    if !errors.is_empty() {
        return Err(RejectedEntity {
            index,
            natural_key,
            key_values: key_values(collection, &patch),
            errors,
        });
    }
    let Some(natural_key) = natural_key else {
        return Err(RejectedEntity {
            index,
            natural_key: None,
            key_values: BTreeMap::new(),
            errors: vec![FieldError::new(
                format!("{name}[{index}]"),
                "natural key could not be derived",
            )],
        });
    };

    let defaults = defaults_for(&collection.entity, &patch, index);
    Ok(ValidatedEntity {
        index,
        natural_key,
        patch,
        defaults,
    })
}

fn key_values(collection: &CollectionSpec, patch: &FieldPatch) -> BTreeMap<String, FieldValue> {
    collection
        .natural_key
        .fields()
        .iter()
        .filter_map(|field| Some((field.to_string(), patch.value(field)?.clone())))
        .collect()
}

fn defaults_for(specs: &[FieldSpec], patch: &FieldPatch, index: usize) -> BTreeMap<String, FieldValue> {
    specs
        .iter()
        .filter(|spec| !patch.contains(spec.name))
        .filter_map(|spec| {
            let value = match spec.default? {
                FieldDefault::Boolean(b) => FieldValue::Boolean(b),
                FieldDefault::ElementIndex => FieldValue::Integer(i64::try_from(index).ok()?),
            };
            Some((spec.name.to_string(), value))
        })
        .collect()
}

fn check_fields<'a, G, P>(
    specs: &[FieldSpec],
    get: G,
    enforce_required: bool,
    path: P,
    errors: &mut Vec<FieldError>,
) -> FieldPatch
where
    G: Fn(&str) -> Option<&'a Value>,
    P: Fn(&str) -> String,
{
    let mut patch = FieldPatch::new();
    for spec in specs {
        let Some(raw) = get(spec.name) else {
            if enforce_required && spec.required {
                errors.push(FieldError::required(path(spec.name)));
            }
            continue;
        };
        match coerce(&spec.rule, raw) {
            Ok(Coerced::Value(value)) => patch.insert(spec.name, PatchValue::Set(value)),
            Ok(Coerced::Clear) => {
                if enforce_required && spec.required {
                    errors.push(FieldError::required(path(spec.name)));
                }
                patch.insert(spec.name, PatchValue::Clear);
            }
            Err(message) => errors.push(FieldError::new(path(spec.name), message)),
        }
    }
    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::{canonicalize, RawPayload};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn payload(stage: Stage, value: Value) -> CanonicalPayload {
        let Value::Object(map) = value else {
            unreachable!("test payloads are objects")
        };
        canonicalize(stage, &map)
    }

    fn draft(stage: Stage, value: Value) -> Result<ValidatedPayload, ValidationError> {
        Validator::new().validate(&payload(stage, value), Mode::Partial)
    }

    fn final_submit(stage: Stage, value: Value) -> Result<ValidatedPayload, ValidationError> {
        Validator::new().validate(&payload(stage, value), Mode::Complete)
    }

    #[test]
    fn partial_mode_accepts_sparse_payloads() {
        let validated = draft(Stage::Property, json!({"town": " Porto ", "bedrooms": "2"})).unwrap();
        let patch = validated.patch().unwrap();
        assert_eq!(patch.value("city"), Some(&FieldValue::Text("Porto".into())));
        assert_eq!(patch.value("bedrooms"), Some(&FieldValue::Integer(2)));
        assert_eq!(patch.len(), 2);
    }

    #[test]
    fn partial_mode_still_rejects_bad_types() {
        let err = draft(Stage::Property, json!({"bedrooms": "lots"})).unwrap_err();
        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["bedrooms"]);
        assert_eq!(err.stage, Some(Stage::Property));
    }

    #[test]
    fn complete_mode_lists_every_missing_field() {
        let err = final_submit(Stage::Owner, json!({"firstName": "Ana", "email": "bad"})).unwrap_err();
        assert_eq!(
            err.fields().collect::<Vec<_>>(),
            vec!["last_name", "email", "phone"]
        );
    }

    #[test]
    fn blank_values_are_clears_and_count_as_missing() {
        let validated = draft(Stage::Property, json!({"state": "  ", "city": null})).unwrap();
        let patch = validated.patch().unwrap();
        assert_eq!(patch.get("state"), Some(&PatchValue::Clear));
        assert_eq!(patch.get("city"), Some(&PatchValue::Clear));

        let err = final_submit(Stage::Review, json!({"acknowledged": ""})).unwrap_err();
        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["acknowledged"]);
    }

    #[test]
    fn unknown_keys_are_carried_as_passthrough() {
        let validated = draft(Stage::Banking, json!({"bank": "Caixa", "nickname": "main"})).unwrap();
        assert_eq!(validated.passthrough, vec!["nickname".to_string()]);
    }

    #[test]
    fn missing_collection_key_leaves_batch_untouched() {
        let validated = draft(Stage::Staff, json!({})).unwrap();
        assert_eq!(validated.batch(), Some(&EntityBatch::untouched()));
    }

    #[test]
    fn null_collection_is_an_empty_supplied_batch() {
        let validated = draft(Stage::Photos, json!({"photos": null})).unwrap();
        let batch = validated.batch().unwrap();
        assert!(batch.supplied);
        assert!(batch.entities.is_empty());
    }

    #[test]
    fn collection_must_be_an_array() {
        let err = draft(Stage::Photos, json!({"photos": "cover.jpg"})).unwrap_err();
        assert_eq!(err.errors[0].field, "photos");
        assert!(err.errors[0].message.contains("expected an array"));
    }

    #[test]
    fn bad_entities_are_isolated() {
        let validated = draft(
            Stage::Credentials,
            json!({"channels": [
                {"channel": "airbnb", "login": "host@x.io"},
                {"platform": "myspace"},
                {"listingUrl": "https://vrbo.com/1"},
                42
            ]}),
        )
        .unwrap();
        let batch = validated.batch().unwrap();
        assert_eq!(batch.entities.len(), 1);
        assert_eq!(batch.entities[0].natural_key, "AIRBNB");

        let paths: Vec<&str> = batch
            .rejected
            .iter()
            .flat_map(|r| r.errors.iter().map(|e| e.field.as_str()))
            .collect();
        assert_eq!(
            paths,
            vec![
                "credentials[1].platform",
                "credentials[2].platform",
                "credentials[3]"
            ]
        );
    }

    #[test]
    fn later_duplicate_is_rejected() {
        let validated = draft(
            Stage::Amenities,
            json!({"amenities": [
                {"category": "Kitchen", "item_name": "Oven", "quantity": 1},
                {"category": "kitchen ", "item_name": "OVEN", "quantity": 2}
            ]}),
        )
        .unwrap();
        let batch = validated.batch().unwrap();
        assert_eq!(batch.entities.len(), 1);
        assert_eq!(batch.entities[0].patch.value("quantity"), Some(&FieldValue::Integer(1)));
        assert_eq!(batch.rejected[0].index, 1);
        assert_eq!(batch.rejected[0].natural_key.as_deref(), Some("kitchen::oven"));
    }

    #[test]
    fn rejected_entity_keeps_derivable_key() {
        let validated = draft(
            Stage::Staff,
            json!({"staff": [{"name": "Rui", "email": "rui@x.io", "role": "astronaut"}]}),
        )
        .unwrap();
        let rejected = &validated.batch().unwrap().rejected[0];
        assert_eq!(rejected.natural_key.as_deref(), Some("rui@x.io"));
    }

    #[test]
    fn defaults_cover_only_omitted_fields() {
        let validated = draft(
            Stage::Photos,
            json!({"photos": [
                {"url": "https://cdn.x.io/a.jpg"},
                {"url": "https://cdn.x.io/b.jpg", "sortOrder": 9}
            ]}),
        )
        .unwrap();
        let batch = validated.batch().unwrap();
        assert_eq!(
            batch.entities[0].defaults.get("sort_order"),
            Some(&FieldValue::Integer(0))
        );
        assert!(batch.entities[1].defaults.get("sort_order").is_none());
        assert_eq!(
            batch.entities[1].patch.value("sort_order"),
            Some(&FieldValue::Integer(9))
        );
    }

    #[test]
    fn oversized_batches_fail_on_the_collection_field() {
        let items: Vec<Value> = (0..3)
            .map(|i| json!({"url": format!("https://cdn.x.io/{i}.jpg")}))
            .collect();
        let mut raw = RawPayload::new();
        raw.insert("photos".into(), Value::Array(items));
        let err = Validator::new()
            .with_max_entities(2)
            .validate(&canonicalize(Stage::Photos, &raw), Mode::Partial)
            .unwrap_err();
        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["photos"]);
    }

    #[test]
    fn complete_collection_needs_elements() {
        let err = final_submit(Stage::Documents, json!({"documents": []})).unwrap_err();
        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["documents"]);
    }

    #[test]
    fn complete_collection_needs_a_valid_element() {
        let err = final_submit(Stage::Staff, json!({"staff": [{"name": "Ana", "role": "pilot"}]})).unwrap_err();
        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["staff", "staff[0].role"]);

        let validated = final_submit(
            Stage::Staff,
            json!({"staff": [
                {"name": "Ana", "role": "pilot"},
                {"name": "Rui", "role": "cleaner"}
            ]}),
        )
        .unwrap();
        let batch = validated.batch().unwrap();
        assert_eq!((batch.entities.len(), batch.rejected.len()), (1, 1));
    }

    #[test]
    fn urls_differing_in_case_are_distinct_photos() {
        let validated = draft(
            Stage::Photos,
            json!({"photos": [
                {"url": "https://cdn.x.io/A.jpg"},
                {"url": "https://cdn.x.io/a.jpg"}
            ]}),
        )
        .unwrap();
        let batch = validated.batch().unwrap();
        assert!(batch.rejected.is_empty());
        let keys: Vec<_> = batch.entities.iter().map(|e| e.natural_key.as_str()).collect();
        assert_eq!(keys, vec!["https://cdn.x.io/A.jpg", "https://cdn.x.io/a.jpg"]);
    }

    #[test]
    fn document_file_names_keep_their_case() {
        let validated = draft(
            Stage::Documents,
            json!({"documents": [
                {"documentType": "deed", "fileName": "Deed.pdf"},
                {"documentType": "deed", "fileName": "deed.pdf"}
            ]}),
        )
        .unwrap();
        let batch = validated.batch().unwrap();
        assert_eq!(batch.entities.len(), 2);
        assert_eq!(batch.entities[0].natural_key, "DEED::Deed.pdf");
    }

    #[test]
    fn rejected_entity_carries_coerced_key_fields() {
        let validated = draft(
            Stage::Staff,
            json!({"staff": [{"name": "Ana", "email": "Ana@X.io", "role": "pilot"}]}),
        )
        .unwrap();
        let rejected = &validated.batch().unwrap().rejected[0];
        assert_eq!(rejected.key_values.get("email"), Some(&FieldValue::Text("ana@x.io".into())));
        assert_eq!(rejected.key_values.get("name"), Some(&FieldValue::Text("Ana".into())));
    }

    #[test]
    fn stage_ordinals_outside_range_fail_on_stage() {
        assert_eq!(stage_for_ordinal(7).unwrap(), Stage::Staff);
        let err = stage_for_ordinal(11).unwrap_err();
        assert_eq!(err.stage, None);
        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["stage"]);
    }
}
