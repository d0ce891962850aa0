//! Workflow state machine for a case.
//!
//! Each of the four stages is independently `Empty` or `Populated`. The UI
//! may show any stage at any time; what is ordered is which pipelines may
//! *run*:
//!
//! | Stage     | Requires populated        |
//! |-----------|---------------------------|
//! | Diagnosis | (input media only)        |
//! | Treatment | Diagnosis                 |
//! | Implant   | Diagnosis, Treatment      |
//! | Outcome   | (input media only)        |
//!
//! There is no `Populated -> Empty` transition: artifacts are overwritten on
//! re-run, never cleared.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Case, CaseUpdate};

/// One of the four workflow stages of a case.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Diagnosis,
    Treatment,
    Implant,
    Outcome,
}

impl Stage {
    /// All stages in display order.
    pub const ALL: [Stage; 4] = [
        Stage::Diagnosis,
        Stage::Treatment,
        Stage::Implant,
        Stage::Outcome,
    ];

    /// Stages whose artifacts must be populated before this one may run.
    pub fn prerequisites(self) -> &'static [Stage] {
        match self {
            Stage::Diagnosis | Stage::Outcome => &[],
            Stage::Treatment => &[Stage::Diagnosis],
            Stage::Implant => &[Stage::Diagnosis, Stage::Treatment],
        }
    }

    /// Human-readable name of the artifact this stage owns.
    pub fn artifact_name(self) -> &'static str {
        match self {
            Stage::Diagnosis => "diagnosis",
            Stage::Treatment => "treatment plan",
            Stage::Implant => "implant choice",
            Stage::Outcome => "outcome notes",
        }
    }

    /// Whether this stage's pipeline consumes input media.
    pub fn requires_media(self) -> bool {
        matches!(self, Stage::Diagnosis | Stage::Outcome)
    }

    /// The stored artifact for this stage, if populated.
    pub fn artifact(self, case: &Case) -> Option<&str> {
        let value = match self {
            Stage::Diagnosis => case.diagnosis.as_deref(),
            Stage::Treatment => case.treatment_plan.as_deref(),
            Stage::Implant => case.implant_choice.as_deref(),
            Stage::Outcome => case.outcome_notes.as_deref(),
        };
        value.filter(|text| !text.trim().is_empty())
    }

    /// Build the single-field update that stores this stage's artifact.
    pub fn artifact_update(self, text: impl Into<String>) -> CaseUpdate {
        let text = Some(text.into());
        match self {
            Stage::Diagnosis => CaseUpdate {
                diagnosis: text,
                ..Default::default()
            },
            Stage::Treatment => CaseUpdate {
                treatment_plan: text,
                ..Default::default()
            },
            Stage::Implant => CaseUpdate {
                implant_choice: text,
                ..Default::default()
            },
            Stage::Outcome => CaseUpdate {
                outcome_notes: text,
                ..Default::default()
            },
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Diagnosis => "diagnosis",
            Stage::Treatment => "treatment",
            Stage::Implant => "implant",
            Stage::Outcome => "outcome",
        };
        f.write_str(name)
    }
}

/// Whether a stage has produced a usable artifact.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    #[default]
    Empty,
    Populated,
}

/// Snapshot of all four stage states for one case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct WorkflowState {
    pub diagnosis: StageState,
    pub treatment: StageState,
    pub implant: StageState,
    pub outcome: StageState,
}

impl WorkflowState {
    /// Derive the workflow state from the case's stored artifacts.
    pub fn of(case: &Case) -> Self {
        let state = |stage: Stage| {
            if stage.artifact(case).is_some() {
                StageState::Populated
            } else {
                StageState::Empty
            }
        };
        Self {
            diagnosis: state(Stage::Diagnosis),
            treatment: state(Stage::Treatment),
            implant: state(Stage::Implant),
            outcome: state(Stage::Outcome),
        }
    }

    pub fn state(&self, stage: Stage) -> StageState {
        match stage {
            Stage::Diagnosis => self.diagnosis,
            Stage::Treatment => self.treatment,
            Stage::Implant => self.implant,
            Stage::Outcome => self.outcome,
        }
    }

    /// Check that every prerequisite of `stage` is populated.
    ///
    /// Returns `PreconditionFailed` naming the first missing artifact.
    pub fn check_can_run(&self, stage: Stage) -> Result<()> {
        match stage
            .prerequisites()
            .iter()
            .find(|prereq| self.state(**prereq) == StageState::Empty)
        {
            Some(missing) => Err(Error::PreconditionFailed {
                stage,
                missing: missing.artifact_name().to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn can_run(&self, stage: Stage) -> bool {
        self.check_can_run(stage).is_ok()
    }

    /// Stages whose pipelines may be started now.
    pub fn runnable(&self) -> Vec<Stage> {
        Stage::ALL
            .into_iter()
            .filter(|stage| self.can_run(*stage))
            .collect()
    }
}
