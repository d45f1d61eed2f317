//! Scenario replay
//!
//! A scenario is a JSON list of steps run against one fresh record in a
//! fresh in-memory store. Typed failures (validation, conflicts) are step
//! results, not replay failures.

use anyhow::{Context, Result};
use onboard_core::{
    AggregateProgress, ErrorKind, OnboardingConfig, OnboardingError, OnboardingService, SubmitStage,
};
use onboard_model::{ActorId, FieldProgress, RecordId, Stage, StageStatus};
use onboard_schema::{FieldError, RawPayload};
use onboard_store::{MemoryStore, OnboardingStore, PersistReport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Steps to run against one record
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Label for output
    #[serde(default)]
    pub name: Option<String>,
    /// Acting user for every step
    #[serde(default = "default_actor")]
    pub actor: String,
    /// Steps, in order
    pub steps: Vec<Step>,
}

fn default_actor() -> String {
    "replay".to_string()
}

impl Scenario {
    /// Parse a scenario from JSON text
    ///
    /// # Errors
    ///
    /// When the text is not a valid scenario.
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("invalid scenario")
    }

    /// Load a scenario file
    ///
    /// # Errors
    ///
    /// When the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_json_str(&content).with_context(|| format!("parsing scenario {}", path.display()))
    }
}

/// One scenario step
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Submit a stage
    Submit(SubmitStep),
    /// Read aggregate progress
    Progress,
    /// Overwrite a legacy flag directly in the store
    SetFlag {
        /// Stage ordinal
        stage: i64,
        /// Flag value
        value: bool,
    },
    /// Read field progress of one stage
    Fields {
        /// Stage ordinal
        stage: i64,
    },
}

/// Stage submission step
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitStep {
    /// Stage ordinal
    pub stage: i64,
    /// Raw payload
    #[serde(default)]
    pub payload: RawPayload,
    /// Final submit
    #[serde(default)]
    pub completed: bool,
    /// Auto-save; without an explicit version the last seen one is used
    #[serde(default, alias = "autoSave", alias = "isAutoSave")]
    pub auto_save: bool,
    /// Explicit version
    #[serde(default)]
    pub version: Option<u64>,
    /// Skip the stage
    #[serde(default)]
    pub skipped: bool,
}

/// Outcome of one step
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StepResult {
    /// Submission accepted
    Accepted {
        /// Stage
        stage: Stage,
        /// New version
        version: u64,
        /// Stage status after the write
        status: StageStatus,
        /// What happened to stage data
        report: PersistReport,
        /// Overall completion afterwards
        overall_percent: u8,
    },
    /// Submission or read refused with a typed error
    Rejected {
        /// Error class
        kind: ErrorKind,
        /// Display text
        message: String,
        /// Field errors, for validation failures
        errors: Vec<FieldError>,
    },
    /// Aggregate read
    Progress {
        /// Current stage
        current_stage: Stage,
        /// Overall completion
        overall_percent: u8,
        /// Complete stages
        complete: Vec<Stage>,
        /// Stages whose legacy flag is set
        flags: Vec<Stage>,
    },
    /// Flag written
    FlagSet {
        /// Stage
        stage: Stage,
        /// Value written
        value: bool,
    },
    /// Field progress read
    Fields {
        /// Stage
        stage: Stage,
        /// Stored version
        version: u64,
        /// Rows
        fields: Vec<FieldProgress>,
    },
}

/// Numbered step outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    /// 1-based position in the scenario
    pub step: usize,
    /// Outcome
    #[serde(flatten)]
    pub result: StepResult,
}

/// Everything a replay produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    /// Scenario label
    pub name: Option<String>,
    /// Record the steps ran against
    pub record_id: RecordId,
    /// Per-step outcomes
    pub steps: Vec<StepReport>,
    /// Aggregate progress after the last step
    pub progress: AggregateProgress,
}

impl ReplayReport {
    /// Steps that ended in a typed error
    pub fn rejected(&self) -> impl Iterator<Item = &StepReport> {
        self.steps
            .iter()
            .filter(|s| matches!(s.result, StepResult::Rejected { .. }))
    }

    /// Human-readable summary
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        if let Some(name) = &self.name {
            let _ = writeln!(out, "Scenario: {name}");
        }
        let _ = writeln!(out, "Record: {}", self.record_id);
        for report in &self.steps {
            let _ = writeln!(out, "  #{:<3} {}", report.step, describe(&report.result));
        }
        let _ = writeln!(
            out,
            "Overall: {}% (current stage {} {})",
            self.progress.overall_percent,
            self.progress.current_stage.ordinal(),
            self.progress.current_stage
        );
        for stage in &self.progress.stages {
            let mark = if stage.is_complete {
                "x"
            } else if stage.skipped {
                "-"
            } else {
                " "
            };
            let _ = writeln!(
                out,
                "  [{mark}] {:>2} {:<12} v{:<3} {}",
                stage.stage.ordinal(),
                stage.stage,
                self.progress.version(stage.stage),
                stage.reason
            );
        }
        out
    }
}

fn describe(result: &StepResult) -> String {
    match result {
        StepResult::Accepted {
            stage,
            version,
            status,
            report,
            overall_percent,
        } => {
            let detail = match report {
                PersistReport::Scalar { set, cleared } => {
                    format!("{} set, {} cleared", set.len(), cleared.len())
                }
                PersistReport::Collection(batch) => format!(
                    "{} created, {} updated, {} deactivated, {} failed",
                    batch.created, batch.updated, batch.deactivated, batch.failed
                ),
            };
            format!(
                "submit {stage}: accepted v{version} {} ({detail}) -> {overall_percent}%",
                status.as_str()
            )
        }
        StepResult::Rejected { kind, message, .. } => format!("rejected [{kind}] {message}"),
        StepResult::Progress {
            current_stage,
            overall_percent,
            complete,
            flags,
        } => format!(
            "progress: {overall_percent}% at {current_stage}, complete {complete:?}, flags {flags:?}"
        ),
        StepResult::FlagSet { stage, value } => format!("flag {stage} := {value}"),
        StepResult::Fields { stage, version, fields } => {
            format!("fields {stage} v{version}: {} rows", fields.len())
        }
    }
}

/// Runs scenarios against a fresh in-memory store
#[derive(Debug)]
pub struct Replayer {
    service: OnboardingService,
    store: Arc<MemoryStore>,
}

impl Replayer {
    /// Replayer with a configuration
    #[must_use]
    pub fn new(config: OnboardingConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let service = OnboardingService::new(store.clone(), config);
        Self { service, store }
    }

    /// Run every step in order
    ///
    /// # Errors
    ///
    /// When the record cannot be created or a `set_flag` step names an
    /// unknown stage. Typed submission failures are step results instead.
    pub async fn run(&self, scenario: &Scenario) -> Result<ReplayReport> {
        let actor = ActorId::new(scenario.actor.as_str());
        let record_id = self
            .service
            .create_record(actor.clone())
            .await
            .context("creating record")?;

        let mut versions: BTreeMap<Stage, u64> = BTreeMap::new();
        let mut steps = Vec::with_capacity(scenario.steps.len());

        for (index, step) in scenario.steps.iter().enumerate() {
            let number = index + 1;
            debug!(step = number, ?step, "replaying step");
            let result = match step {
                Step::Submit(submit) => {
                    let request = submit_request(record_id, submit, &versions).by(actor.clone());
                    match self.service.submit_stage(request).await {
                        Ok(outcome) => {
                            versions.clone_from(&outcome.aggregate.versions);
                            StepResult::Accepted {
                                stage: outcome.stage,
                                version: outcome.version,
                                status: outcome.progress.status,
                                report: outcome.report,
                                overall_percent: outcome.aggregate.overall_percent,
                            }
                        }
                        Err(err) => rejected(&err),
                    }
                }
                Step::Progress => match self.service.aggregate_progress(record_id, Some(actor.clone())).await {
                    Ok(progress) => {
                        versions.clone_from(&progress.versions);
                        StepResult::Progress {
                            current_stage: progress.current_stage,
                            overall_percent: progress.overall_percent,
                            complete: progress
                                .stages
                                .iter()
                                .filter(|s| s.is_complete)
                                .map(|s| s.stage)
                                .collect(),
                            flags: progress.flags.set_stages().collect(),
                        }
                    }
                    Err(err) => rejected(&err),
                },
                Step::SetFlag { stage, value } => {
                    let stage = Stage::try_from(*stage)
                        .with_context(|| format!("step {number}: set_flag"))?;
                    self.store
                        .write_legacy_flag(record_id, stage, *value)
                        .await
                        .with_context(|| format!("step {number}: writing flag {stage}"))?;
                    StepResult::FlagSet { stage, value: *value }
                }
                Step::Fields { stage } => match self.service.stage_fields(record_id, *stage).await {
                    Ok(fields) => StepResult::Fields {
                        stage: fields.stage,
                        version: fields.version,
                        fields: fields.fields,
                    },
                    Err(err) => rejected(&err),
                },
            };
            steps.push(StepReport { step: number, result });
        }

        let progress = self
            .service
            .aggregate_progress(record_id, Some(actor))
            .await
            .context("reading final progress")?;

        Ok(ReplayReport {
            name: scenario.name.clone(),
            record_id,
            steps,
            progress,
        })
    }
}

fn submit_request(record_id: RecordId, step: &SubmitStep, versions: &BTreeMap<Stage, u64>) -> SubmitStage {
    let mut request = SubmitStage::new(record_id, step.stage, step.payload.clone());
    if step.auto_save {
        let last_seen = Stage::try_from(step.stage)
            .ok()
            .and_then(|stage| versions.get(&stage).copied())
            .unwrap_or(0);
        request = request.auto_save(step.version.unwrap_or(last_seen));
    } else if let Some(version) = step.version {
        request = request.at_version(version);
    }
    if step.completed {
        request = request.completed();
    }
    if step.skipped {
        request = request.skipped();
    }
    request
}

fn rejected(err: &OnboardingError) -> StepResult {
    StepResult::Rejected {
        kind: err.kind(),
        message: err.to_string(),
        errors: err.validation().map(|v| v.errors.clone()).unwrap_or_default(),
    }
}
