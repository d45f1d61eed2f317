//! Stage persister
//!
//! Plans the stage-data part of a commit by diffing a validated payload
//! against the stage's current contents. Scalar stages merge additively;
//! collection stages replace by natural key: matches update, unmatched
//! incoming entities are created, stored entities missing from the
//! submission are deactivated. Exact key matches win; remaining entities
//! fall back to [`NaturalKey::matches`] over the stored row's fields.

use crate::commit::{EntityOp, StageChange};
use onboard_model::{EntityId, EntityRow, StageView};
use onboard_schema::{
    schema, EntityBatch, FieldError, FieldPatch, KeyShape, NaturalKey, PatchValue, StageBody,
    ValidatedPayload,
};
use serde::Serialize;
use std::collections::HashSet;

/// Per-batch results summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// New entities
    pub created: usize,
    /// Matched entities, reactivated ones included
    pub updated: usize,
    /// Stored entities no longer submitted
    pub deactivated: usize,
    /// Elements rejected by validation
    pub failed: usize,
    /// Why they were rejected
    pub errors: Vec<FieldError>,
}

/// What a stage write did to stage data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum PersistReport {
    /// Scalar stage
    Scalar {
        /// Fields written
        set: Vec<String>,
        /// Fields deliberately cleared
        cleared: Vec<String>,
    },
    /// Collection stage
    Collection(BatchReport),
}

impl PersistReport {
    /// Batch summary, for collection stages
    #[must_use]
    pub fn batch(&self) -> Option<&BatchReport> {
        match self {
            PersistReport::Collection(report) => Some(report),
            PersistReport::Scalar { .. } => None,
        }
    }
}

/// Stage change plus its summary
#[derive(Debug, Clone, PartialEq)]
pub struct PersistPlan {
    /// Change to commit
    pub change: StageChange,
    /// Summary for the caller
    pub report: PersistReport,
}

/// Plan the stage data change for a validated payload
#[must_use]
pub fn plan(view: &StageView, payload: &ValidatedPayload) -> PersistPlan {
    match &payload.body {
        StageBody::Scalar(patch) => plan_scalar(patch),
        StageBody::Collection(batch) => plan_batch(view, batch),
    }
}

fn plan_scalar(patch: &FieldPatch) -> PersistPlan {
    let report = PersistReport::Scalar {
        set: patch.set().map(|(field, _)| field.to_string()).collect(),
        cleared: patch.cleared().map(str::to_string).collect(),
    };
    let change = if patch.is_empty() {
        StageChange::None
    } else {
        StageChange::Scalar {
            patch: patch.clone(),
        }
    };
    PersistPlan { change, report }
}

fn plan_batch(view: &StageView, batch: &EntityBatch) -> PersistPlan {
    let rows = view.entities.as_slice();
    let key = schema(view.stage).collection().map(|collection| collection.natural_key);
    let mut report = BatchReport {
        failed: batch.rejected.len(),
        errors: batch
            .rejected
            .iter()
            .flat_map(|rejected| rejected.errors.iter().cloned())
            .collect(),
        ..BatchReport::default()
    };

    if !batch.supplied {
        return PersistPlan {
            change: StageChange::None,
            report: PersistReport::Collection(report),
        };
    }

    let mut claimed = vec![false; rows.len()];
    let mut matched: Vec<Option<usize>> = batch
        .entities
        .iter()
        .map(|entity| claim(&mut claimed, rows, |row| row.natural_key == entity.natural_key))
        .collect();

    // Rows saved under an earlier key field, e.g. staff first saved by name
    if let Some(key) = key.filter(|key| matches!(key.shape(), KeyShape::FirstOf(_))) {
        for (entity, slot) in batch.entities.iter().zip(matched.iter_mut()) {
            if slot.is_none() {
                *slot = claim(&mut claimed, rows, |row| {
                    key.matches(|f| entity.patch.value(f), |f| row.fields.get(f))
                });
            }
        }
    }

    let mut ops = Vec::with_capacity(batch.entities.len());
    for (entity, slot) in batch.entities.iter().zip(matched.iter().copied()) {
        match slot.map(|i| &rows[i]) {
            Some(row) => {
                report.updated += 1;
                ops.push(EntityOp::Update {
                    id: row.id,
                    patch: entity.patch.clone(),
                    reactivate: !row.active,
                    rekey: key.and_then(|key| rekey(key, rows, row, &entity.patch)),
                });
            }
            None => {
                report.created += 1;
                let mut fields = entity.defaults.clone();
                fields.extend(
                    entity
                        .patch
                        .set()
                        .map(|(field, value)| (field.to_string(), value.clone())),
                );
                ops.push(EntityOp::Create {
                    id: EntityId::new(),
                    natural_key: entity.natural_key.clone(),
                    fields,
                });
            }
        }
    }

    let present: HashSet<&str> = batch.submitted_keys().collect();
    let protected = |row: &EntityRow| {
        present.contains(row.natural_key.as_str())
            || key.is_some_and(|key| {
                batch
                    .rejected
                    .iter()
                    .filter(|rejected| !rejected.key_values.is_empty())
                    .any(|rejected| key.matches(|f| rejected.key_values.get(f), |f| row.fields.get(f)))
            })
    };
    for (row, _) in rows
        .iter()
        .zip(&claimed)
        .filter(|(row, claimed)| row.active && !**claimed)
    {
        if !protected(row) {
            report.deactivated += 1;
            ops.push(EntityOp::Deactivate { id: row.id });
        }
    }

    PersistPlan {
        change: StageChange::Entities { ops },
        report: PersistReport::Collection(report),
    }
}

/// First unclaimed row satisfying `pred`, marked claimed
fn claim<P>(claimed: &mut [bool], rows: &[EntityRow], pred: P) -> Option<usize>
where
    P: Fn(&EntityRow) -> bool,
{
    let index = rows
        .iter()
        .zip(claimed.iter())
        .position(|(row, taken)| !taken && pred(row))?;
    claimed[index] = true;
    Some(index)
}

/// New stored key once the merged row derives a different, unused one
fn rekey(key: NaturalKey, rows: &[EntityRow], row: &EntityRow, patch: &FieldPatch) -> Option<String> {
    let merged = key.derive(|f| match patch.get(f) {
        Some(PatchValue::Set(value)) => Some(value),
        Some(PatchValue::Clear) => None,
        None => row.fields.get(f),
    })?;
    (merged != row.natural_key && rows.iter().all(|other| other.natural_key != merged)).then_some(merged)
}
