//! Post-operative outcome assessment.

use std::sync::Arc;

use async_trait::async_trait;

use orthox_core::{Capability, OutcomeAssessor, Result, VisionFindings};

use crate::gemini::{GeminiBackend, GenerateRequest};
use crate::prompts;

/// Gemini-backed [`OutcomeAssessor`]: one call covering positioning,
/// alignment, range of motion, complication screening and recovery scoring.
pub struct GeminiOutcomeAssessor {
    backend: Arc<GeminiBackend>,
}

impl GeminiOutcomeAssessor {
    pub fn new(backend: Arc<GeminiBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl OutcomeAssessor for GeminiOutcomeAssessor {
    async fn assess(&self, findings: &VisionFindings, clinical_status: &str) -> Result<String> {
        let request = GenerateRequest::text(
            &self.backend.config().reasoning_model,
            prompts::outcome_prompt(findings, clinical_status),
        );
        let generation = self
            .backend
            .generate(Capability::OutcomeAssessment, request)
            .await?;
        Ok(generation.text)
    }
}
