//! Search-grounded treatment and implant advice.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use orthox_core::defaults::NO_GUIDELINE_STATEMENT;
use orthox_core::{AdviceRequest, Capability, GroundedAdvice, GroundedAdvisor, Result};

use crate::gemini::{GeminiBackend, GenerateRequest, GroundingTool};
use crate::prompts;

/// Gemini-backed [`GroundedAdvisor`] using search grounding restricted to
/// AO Foundation sources.
pub struct GeminiGroundedAdvisor {
    backend: Arc<GeminiBackend>,
}

impl GeminiGroundedAdvisor {
    pub fn new(backend: Arc<GeminiBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl GroundedAdvisor for GeminiGroundedAdvisor {
    async fn advise(&self, request: &AdviceRequest) -> Result<GroundedAdvice> {
        let generate = GenerateRequest::text(
            &self.backend.config().grounded_model,
            prompts::advice_prompt(request),
        )
        .with_tool(GroundingTool::GoogleSearch);

        let generation = self
            .backend
            .generate(Capability::GroundedAdvice, generate)
            .await?;

        if generation.sources.is_empty() {
            warn!(
                subsystem = "inference",
                component = "advisor",
                kind = ?request.kind,
                "Grounded advice returned without sources"
            );
        }
        debug!(
            subsystem = "inference",
            component = "advisor",
            kind = ?request.kind,
            low_resource = request.low_resource,
            source_count = generation.sources.len(),
            "Grounded advice complete"
        );

        Ok(GroundedAdvice {
            text: ensure_grounding_statement(generation.text, generation.sources.is_empty()),
            sources: generation.sources,
        })
    }
}

/// Prefix the no-guideline statement to advice that has no sources and does
/// not already say so.
pub fn ensure_grounding_statement(text: String, ungrounded: bool) -> String {
    if ungrounded && !text.contains(NO_GUIDELINE_STATEMENT) {
        format!("{}.\n\n{}", NO_GUIDELINE_STATEMENT, text)
    } else {
        text
    }
}
