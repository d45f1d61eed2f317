//! Legacy per-stage completion booleans
//!
//! Kept eventually-consistent with the computed completion model. Nothing
//! decides anything by reading these.

use crate::stage::Stage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ten legacy completion flags, indexed by stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegacyFlags([bool; Stage::COUNT]);

impl LegacyFlags {
    /// All flags false
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag for a stage
    #[inline]
    #[must_use]
    pub fn get(&self, stage: Stage) -> bool {
        self.0[stage.index()]
    }

    /// Set the flag for a stage
    #[inline]
    pub fn set(&mut self, stage: Stage, value: bool) {
        self.0[stage.index()] = value;
    }

    /// Stages whose flag is set
    pub fn set_stages(&self) -> impl Iterator<Item = Stage> + '_ {
        Stage::ALL.into_iter().filter(|stage| self.get(*stage))
    }

    /// Name-keyed view for reporting
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<&'static str, bool> {
        Stage::ALL
            .into_iter()
            .map(|stage| (stage.name(), self.get(stage)))
            .collect()
    }
}
