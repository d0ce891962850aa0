//! AO/OTA classification grounded on the 2018 compendium.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use orthox_core::{Capability, Classification, Classifier, Result, VisionFindings};

use crate::gemini::{GeminiBackend, GenerateRequest, GroundingTool};
use crate::prompts;

/// Gemini-backed [`Classifier`] reading the compendium through URL context.
///
/// Output stating that the sub-group cannot be determined becomes
/// `Classification::InsufficientData`. Output with neither that statement
/// nor an AO/OTA code is a bad response.
pub struct GeminiClassifier {
    backend: Arc<GeminiBackend>,
}

impl GeminiClassifier {
    pub fn new(backend: Arc<GeminiBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Classifier for GeminiClassifier {
    async fn classify(&self, findings: &VisionFindings) -> Result<Classification> {
        let request = GenerateRequest::text(
            &self.backend.config().grounded_model,
            prompts::classification_prompt(findings),
        )
        .with_tool(GroundingTool::UrlContext);

        let generation = self
            .backend
            .generate(Capability::Classification, request)
            .await?;
        let classification = Classification::from_model_output(&generation.text)?;

        match classification.code() {
            Some(code) => debug!(
                subsystem = "inference",
                component = "classification",
                code,
                "Classification coded"
            ),
            None => info!(
                subsystem = "inference",
                component = "classification",
                response_len = generation.text.len(),
                "Findings insufficient for a compendium code"
            ),
        }
        Ok(classification)
    }
}
