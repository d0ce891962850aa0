//! Vision extraction adapter.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use orthox_core::defaults::VISION_TEMPERATURE;
use orthox_core::{Capability, Error, MediaBlob, Result, VisionExtractor, VisionFindings};

use crate::gemini::{media_part, GeminiBackend, GenerateRequest};
use crate::prompts;

/// Gemini-backed [`VisionExtractor`].
///
/// Sends every media item in order, followed by the extraction instruction,
/// and returns the model's JSON findings as opaque text.
pub struct GeminiVisionExtractor {
    backend: Arc<GeminiBackend>,
}

impl GeminiVisionExtractor {
    pub fn new(backend: Arc<GeminiBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl VisionExtractor for GeminiVisionExtractor {
    async fn extract(&self, media: &[MediaBlob]) -> Result<VisionFindings> {
        if media.is_empty() {
            return Err(Error::InvalidInput(
                "vision extraction requires at least one media item".to_string(),
            ));
        }

        let mut parts = Vec::with_capacity(media.len() + 1);
        for (index, blob) in media.iter().enumerate() {
            trace!(
                index,
                mime_type = blob.mime_type().unwrap_or("unknown"),
                bytes = blob.byte_len(),
                "Adding media part"
            );
            parts.push(media_part(blob));
        }
        parts.push(crate::gemini::types::Part::text(prompts::vision_extraction()));

        let request = GenerateRequest::new(&self.backend.config().vision_model, parts)
            .with_temperature(VISION_TEMPERATURE)
            .json();
        let generation = self.backend.generate(Capability::Vision, request).await?;

        let findings = strip_markdown_fence(&generation.text);
        if findings.is_empty() {
            return Err(Error::CapabilityBadResponse {
                capability: Capability::Vision,
                message: "empty findings".to_string(),
            });
        }

        debug!(
            subsystem = "inference",
            component = "vision",
            media_count = media.len(),
            response_len = findings.len(),
            "Vision extraction complete"
        );
        Ok(VisionFindings::new(findings))
    }
}

/// Remove a surrounding ```json ... ``` fence if the model added one.
pub fn strip_markdown_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening line.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fence_with_language() {
        let text = "```json\n{\"fracture\":\"present\"}\n```";
        assert_eq!(strip_markdown_fence(text), "{\"fracture\":\"present\"}");
    }

    #[test]
    fn test_strip_fence_without_language() {
        assert_eq!(strip_markdown_fence("```\n{}\n```\n"), "{}");
    }

    #[test]
    fn test_strip_fence_passthrough() {
        assert_eq!(strip_markdown_fence("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_strip_fence_only() {
        assert_eq!(strip_markdown_fence("```json\n```"), "");
    }
}
