//! Completion calculator
//!
//! Derives per-stage completion from stored data only. Legacy flags are
//! never read here; the flag synchronizer consumes this output, not the
//! other way round.

use onboard_model::{EntityRow, OnboardingRecord, Stage, StageStatus};
use onboard_schema::schema;
use serde::Serialize;

/// Completion verdict for one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageCompletion {
    /// Stage
    pub stage: Stage,
    /// Whether the stage's rule is met
    pub is_complete: bool,
    /// Human-readable explanation
    pub reason: String,
    /// Fields the rule looks at
    pub required: Vec<String>,
    /// The subset currently satisfied
    pub satisfied: Vec<String>,
    /// Whether the stage was marked skipped
    pub skipped: bool,
}

/// Completion of a whole record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionReport {
    /// One entry per stage, in ordinal order
    pub stages: Vec<StageCompletion>,
    /// `round(100 × complete / total)`
    pub overall_percent: u8,
    /// Lowest stage neither complete nor skipped; review when none remain
    pub current_stage: Stage,
}

impl CompletionReport {
    /// Verdict for a stage
    #[inline]
    #[must_use]
    pub fn stage(&self, stage: Stage) -> &StageCompletion {
        &self.stages[stage.index()]
    }

    /// Stages whose rule is met
    pub fn complete_stages(&self) -> impl Iterator<Item = Stage> + '_ {
        self.stages.iter().filter(|s| s.is_complete).map(|s| s.stage)
    }
}

/// Stage-specific completion rules
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionCalculator;

impl CompletionCalculator {
    /// Evaluate every stage of a record
    ///
    /// `document_count` is the binary-storage signal; without it the
    /// documents rule counts active document rows.
    #[must_use]
    pub fn calculate(record: &OnboardingRecord, document_count: Option<usize>) -> CompletionReport {
        let stages: Vec<StageCompletion> = Stage::ALL
            .into_iter()
            .map(|stage| {
                let mut completion = match stage {
                    Stage::Property | Stage::Owner | Stage::Contract | Stage::Banking => {
                        required_fields_rule(record, stage)
                    }
                    Stage::Credentials => count_rule(
                        stage,
                        count_active(record, stage, |row| row.flag("is_active") == Some(true)),
                        "active credential",
                    ),
                    Stage::Documents => count_rule(
                        stage,
                        document_count.unwrap_or_else(|| count_active(record, stage, |_| true)),
                        "document",
                    ),
                    Stage::Staff => count_rule(stage, count_active(record, stage, |_| true), "staff member"),
                    Stage::Amenities => count_rule(
                        stage,
                        count_active(record, stage, |row| row.flag("available") == Some(true)),
                        "available amenity",
                    ),
                    Stage::Photos => count_rule(stage, count_active(record, stage, |_| true), "photo"),
                    Stage::Review => acknowledgement_rule(record),
                };
                completion.skipped = record
                    .progress(stage)
                    .is_some_and(|p| p.status == StageStatus::Skipped);
                completion
            })
            .collect();

        let complete = stages.iter().filter(|s| s.is_complete).count();
        let current_stage = stages
            .iter()
            .find(|s| !s.is_complete && !s.skipped)
            .map_or(Stage::Review, |s| s.stage);

        CompletionReport {
            overall_percent: percent(complete, stages.len()),
            current_stage,
            stages,
        }
    }
}

fn percent(complete: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    u8::try_from((100 * complete + total / 2) / total).unwrap_or(100)
}

fn count_active(record: &OnboardingRecord, stage: Stage, qualifies: impl Fn(&EntityRow) -> bool) -> usize {
    record.active_entities(stage).filter(|row| qualifies(row)).count()
}

fn required_fields_rule(record: &OnboardingRecord, stage: Stage) -> StageCompletion {
    let required = schema(stage).required_fields();
    let (satisfied, missing): (Vec<&str>, Vec<&str>) = required
        .iter()
        .copied()
        .partition(|field| record.value(stage, field).is_some());

    let reason = if missing.is_empty() {
        "all required fields present".to_string()
    } else {
        format!("missing {}", missing.join(", "))
    };
    StageCompletion {
        stage,
        is_complete: missing.is_empty(),
        reason,
        required: required.into_iter().map(String::from).collect(),
        satisfied: satisfied.into_iter().map(String::from).collect(),
        skipped: false,
    }
}

fn count_rule(stage: Stage, count: usize, noun: &str) -> StageCompletion {
    let key = schema(stage)
        .collection()
        .map_or(stage.name(), |c| c.field.name);
    let is_complete = count >= 1;
    let plural = if count == 1 { "" } else { "s" };
    StageCompletion {
        stage,
        is_complete,
        reason: format!("{count} {noun}{plural}"),
        required: vec![key.to_string()],
        satisfied: if is_complete { vec![key.to_string()] } else { Vec::new() },
        skipped: false,
    }
}

fn acknowledgement_rule(record: &OnboardingRecord) -> StageCompletion {
    let acknowledged = record
        .value(Stage::Review, "acknowledged")
        .and_then(onboard_model::FieldValue::as_bool)
        == Some(true);
    StageCompletion {
        stage: Stage::Review,
        is_complete: acknowledged,
        reason: if acknowledged {
            "acknowledged".to_string()
        } else {
            "awaiting acknowledgement".to_string()
        },
        required: vec!["acknowledged".to_string()],
        satisfied: if acknowledged {
            vec!["acknowledged".to_string()]
        } else {
            Vec::new()
        },
        skipped: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use onboard_model::{ActorId, EntityId, FieldValue, RecordId, ScalarSection, StageProgress};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn record() -> OnboardingRecord {
        OnboardingRecord::new(RecordId::new(), ActorId::system(), Utc::now())
    }

    fn set(record: &mut OnboardingRecord, stage: Stage, field: &str, value: FieldValue) {
        record
            .sections
            .entry(stage)
            .or_insert_with(ScalarSection::default)
            .values
            .insert(field.to_string(), value);
    }

    fn entity(fields: &[(&str, FieldValue)], active: bool) -> EntityRow {
        let now = Utc::now();
        EntityRow {
            id: EntityId::new(),
            natural_key: "k".into(),
            fields: fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect::<BTreeMap<_, _>>(),
            active,
            created_by: ActorId::system(),
            updated_by: ActorId::system(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn empty_record_is_zero_percent_at_property() {
        let report = CompletionCalculator::calculate(&record(), None);
        assert_eq!(report.overall_percent, 0);
        assert_eq!(report.current_stage, Stage::Property);
        assert_eq!(report.stages.len(), Stage::COUNT);
        assert_eq!(report.stage(Stage::Owner).reason, "missing first_name, last_name, email, phone");
    }

    #[test]
    fn scalar_stage_needs_every_required_field() {
        let mut record = record();
        set(&mut record, Stage::Banking, "account_holder_name", FieldValue::Text("M".into()));
        set(&mut record, Stage::Banking, "bank_name", FieldValue::Text("B".into()));
        set(&mut record, Stage::Banking, "account_number", FieldValue::Text("1".into()));

        let partial = CompletionCalculator::calculate(&record, None);
        assert!(!partial.stage(Stage::Banking).is_complete);
        assert_eq!(partial.stage(Stage::Banking).satisfied.len(), 3);

        set(&mut record, Stage::Banking, "account_type", FieldValue::Enum("SAVINGS".into()));
        let full = CompletionCalculator::calculate(&record, None);
        assert!(full.stage(Stage::Banking).is_complete);
        assert_eq!(full.overall_percent, 10);
    }

    #[test]
    fn collection_predicates_use_active_qualifying_rows() {
        let mut record = record();
        record.entities.insert(
            Stage::Credentials,
            vec![
                entity(&[("is_active", FieldValue::Boolean(false))], true),
                entity(&[("is_active", FieldValue::Boolean(true))], false),
            ],
        );
        record.entities.insert(
            Stage::Amenities,
            vec![entity(&[("available", FieldValue::Boolean(true))], true)],
        );

        let report = CompletionCalculator::calculate(&record, None);
        assert!(!report.stage(Stage::Credentials).is_complete);
        assert_eq!(report.stage(Stage::Credentials).reason, "0 active credentials");
        assert!(report.stage(Stage::Amenities).is_complete);
        assert_eq!(report.stage(Stage::Amenities).satisfied, vec!["amenities".to_string()]);
    }

    #[test]
    fn document_signal_overrides_rows() {
        let mut record = record();
        record.entities.insert(Stage::Documents, vec![entity(&[], true)]);

        assert!(CompletionCalculator::calculate(&record, None).stage(Stage::Documents).is_complete);
        assert!(!CompletionCalculator::calculate(&record, Some(0)).stage(Stage::Documents).is_complete);
    }

    #[test]
    fn review_needs_explicit_acknowledgement() {
        let mut record = record();
        set(&mut record, Stage::Review, "acknowledged", FieldValue::Boolean(false));
        assert!(!CompletionCalculator::calculate(&record, None).stage(Stage::Review).is_complete);

        set(&mut record, Stage::Review, "acknowledged", FieldValue::Boolean(true));
        assert!(CompletionCalculator::calculate(&record, None).stage(Stage::Review).is_complete);
    }

    #[test]
    fn flags_are_never_consulted() {
        let mut record = record();
        record.flags.set(Stage::Photos, true);
        let report = CompletionCalculator::calculate(&record, None);
        assert!(!report.stage(Stage::Photos).is_complete);
    }

    #[test]
    fn skipped_stages_are_passed_over_but_not_complete() {
        let mut record = record();
        let mut progress = StageProgress::new(record.id, Stage::Property, Utc::now());
        progress.status = StageStatus::Skipped;
        record.progress.insert(Stage::Property, progress);

        let report = CompletionCalculator::calculate(&record, None);
        assert!(report.stage(Stage::Property).skipped);
        assert!(!report.stage(Stage::Property).is_complete);
        assert_eq!(report.current_stage, Stage::Owner);
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(10, 10), 100);
        assert_eq!(percent(0, 0), 0);
    }
}
