//! Core traits for orthox abstractions.
//!
//! The orchestrator is assembled from these seams: one case store and five
//! capability adapters, each injected at construction so tests can swap in
//! in-memory and recording implementations.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::media::MediaBlob;
use crate::models::*;

// =============================================================================
// CAPABILITIES
// =============================================================================

/// External capability the pipeline depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Vision,
    Reasoning,
    Classification,
    GroundedAdvice,
    OutcomeAssessment,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Vision => "vision",
            Capability::Reasoning => "reasoning",
            Capability::Classification => "classification",
            Capability::GroundedAdvice => "grounded_advice",
            Capability::OutcomeAssessment => "outcome_assessment",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Converts ordered media into structured, descriptive findings.
///
/// Output must describe what is visible (fracture lines, displacement,
/// hardware position) and never assert a definitive diagnosis.
#[async_trait]
pub trait VisionExtractor: Send + Sync {
    async fn extract(&self, media: &[MediaBlob]) -> Result<VisionFindings>;
}

/// Produces long-form clinical reasoning from findings and patient context.
#[async_trait]
pub trait ClinicalReasoner: Send + Sync {
    async fn reason(&self, findings: &VisionFindings, context: &str) -> Result<String>;
}

/// Classifies findings against the AO/OTA compendium.
///
/// Insufficient findings yield `Classification::InsufficientData`, not an
/// error.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, findings: &VisionFindings) -> Result<Classification>;
}

/// Search-grounded treatment and implant advice with citations.
#[async_trait]
pub trait GroundedAdvisor: Send + Sync {
    async fn advise(&self, request: &AdviceRequest) -> Result<GroundedAdvice>;
}

/// Single-shot post-operative outcome assessment.
#[async_trait]
pub trait OutcomeAssessor: Send + Sync {
    async fn assess(&self, findings: &VisionFindings, clinical_status: &str) -> Result<String>;
}

// =============================================================================
// CASE STORE
// =============================================================================

/// Durable record of cases, notes and media.
///
/// Each call is atomic on its own; callers get no cross-call transactions.
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Create a case with a pseudonymous reference and derived label.
    async fn create_case(&self, req: CreateCaseRequest) -> Result<Case>;

    /// Fetch a case with its notes and media.
    async fn get_case(&self, id: Uuid) -> Result<CaseFull>;

    /// All cases, newest first.
    async fn list_cases(&self) -> Result<Vec<Case>>;

    /// Apply the non-null fields of `update`. `CaseNotFound` if absent.
    async fn update_case_fields(&self, id: Uuid, update: CaseUpdate) -> Result<()>;

    async fn add_note(&self, req: CreateNoteRequest) -> Result<Note>;

    async fn add_media(&self, req: CreateMediaRequest) -> Result<Media>;

    /// Backend name for health reporting.
    fn backend_name(&self) -> &'static str;
}
