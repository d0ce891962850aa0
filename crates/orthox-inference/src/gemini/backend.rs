//! Gemini REST backend implementation.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use base64::Engine;
use reqwest::Client;
use tracing::{debug, info, trace, warn};

use orthox_core::defaults::{
    GEMINI_BASE_URL, GEMINI_GROUNDED_MODEL, GEMINI_REASONING_MODEL, GEMINI_TIMEOUT_SECS,
    GEMINI_VISION_MODEL,
};
use orthox_core::{Capability, Error, MediaBlob, Result, SourceCitation};

use super::error::{to_capability_error, transport_error, GeminiErrorCode};
use super::types::*;

/// Finish reasons that mean the candidate was withheld.
const BLOCKED_FINISH_REASONS: &[&str] = &["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

/// Configuration for the Gemini backend.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Base URL including the API version segment.
    pub base_url: String,
    /// API key sent as `x-goog-api-key`. Calls fail at call time when unset.
    pub api_key: Option<String>,
    /// Model used for vision extraction.
    pub vision_model: String,
    /// Model used for general reasoning and outcome assessment.
    pub reasoning_model: String,
    /// Model used for document- and search-grounded generation.
    pub grounded_model: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: GEMINI_BASE_URL.to_string(),
            api_key: None,
            vision_model: GEMINI_VISION_MODEL.to_string(),
            reasoning_model: GEMINI_REASONING_MODEL.to_string(),
            grounded_model: GEMINI_GROUNDED_MODEL.to_string(),
            timeout_seconds: GEMINI_TIMEOUT_SECS,
        }
    }
}

impl GeminiConfig {
    /// Read configuration from `GEMINI_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            vision_model: std::env::var("GEMINI_VISION_MODEL").unwrap_or(defaults.vision_model),
            reasoning_model: std::env::var("GEMINI_REASONING_MODEL")
                .unwrap_or(defaults.reasoning_model),
            grounded_model: std::env::var("GEMINI_GROUNDED_MODEL")
                .unwrap_or(defaults.grounded_model),
            timeout_seconds: std::env::var("GEMINI_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_seconds),
        }
    }
}

/// Grounding tool attached to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundingTool {
    /// Web search grounding; sources come back as grounding chunks.
    GoogleSearch,
    /// Lets the model read URLs named in the prompt.
    UrlContext,
}

/// A single generation call.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub parts: Vec<Part>,
    pub system_instruction: Option<String>,
    pub temperature: Option<f32>,
    pub json_output: bool,
    pub tool: Option<GroundingTool>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, parts: Vec<Part>) -> Self {
        Self {
            model: model.into(),
            parts,
            system_instruction: None,
            temperature: None,
            json_output: false,
            tool: None,
        }
    }

    /// Single text prompt.
    pub fn text(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(model, vec![Part::text(prompt)])
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system_instruction = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn json(mut self) -> Self {
        self.json_output = true;
        self
    }

    pub fn with_tool(mut self, tool: GroundingTool) -> Self {
        self.tool = Some(tool);
        self
    }

    fn prompt_len(&self) -> usize {
        self.parts
            .iter()
            .filter_map(|p| p.text.as_ref())
            .map(|t| t.len())
            .sum::<usize>()
            + self.system_instruction.as_ref().map_or(0, |s| s.len())
    }

    fn into_body(self) -> GenerateContentRequest {
        let generation_config = if self.temperature.is_some() || self.json_output {
            Some(GenerationConfig {
                temperature: self.temperature,
                response_mime_type: self.json_output.then(|| "application/json".to_string()),
            })
        } else {
            None
        };

        let tools = match self.tool {
            Some(GroundingTool::GoogleSearch) => vec![Tool {
                google_search: Some(EmptyConfig {}),
                ..Default::default()
            }],
            Some(GroundingTool::UrlContext) => vec![Tool {
                url_context: Some(EmptyConfig {}),
                ..Default::default()
            }],
            None => vec![],
        };

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: self.parts,
            }],
            system_instruction: self.system_instruction.map(|s| Content {
                role: None,
                parts: vec![Part::text(s)],
            }),
            generation_config,
            tools,
        }
    }
}

/// Text and grounding sources from one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub sources: Vec<SourceCitation>,
}

/// Gemini `generateContent` client shared by every Gemini-backed adapter.
pub struct GeminiBackend {
    client: Client,
    config: GeminiConfig,
}

impl GeminiBackend {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "inference",
            component = "gemini",
            base_url = %config.base_url,
            vision_model = %config.vision_model,
            reasoning_model = %config.reasoning_model,
            grounded_model = %config.grounded_model,
            api_key_configured = config.api_key.is_some(),
            "Initializing Gemini backend"
        );

        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env())
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Run one generation call on behalf of `capability`.
    ///
    /// Every failure is reported as a capability error naming `capability`.
    pub async fn generate(
        &self,
        capability: Capability,
        request: GenerateRequest,
    ) -> Result<Generation> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::CapabilityUnavailable {
                capability,
                message: "GEMINI_API_KEY is not configured".to_string(),
            })?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            request.model
        );
        let model = request.model.clone();
        let prompt_len = request.prompt_len();
        let body = request.into_body();
        let start = Instant::now();

        debug!(
            subsystem = "inference",
            component = "gemini",
            op = "generate",
            capability = %capability,
            model = %model,
            prompt_len,
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(capability, &e, self.config.timeout_seconds))?;

        let status = response.status();
        if !status.is_success() {
            let (message, api_status) = match response.json::<GeminiErrorResponse>().await {
                Ok(body) => (body.error.message, body.error.status),
                Err(_) => (status.to_string(), String::new()),
            };
            let code = GeminiErrorCode::from_response(status.as_u16(), &api_status);
            warn!(
                subsystem = "inference",
                component = "gemini",
                capability = %capability,
                model = %model,
                status = status.as_u16(),
                error_code = ?code,
                "Gemini returned an error status"
            );
            return Err(to_capability_error(capability, code, &message));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                transport_error(capability, &e, self.config.timeout_seconds)
            } else {
                Error::CapabilityBadResponse {
                    capability,
                    message: format!("Failed to parse response: {}", e),
                }
            }
        })?;

        let generation = parse_generation(capability, parsed)?;

        debug!(
            subsystem = "inference",
            component = "gemini",
            op = "generate",
            capability = %capability,
            model = %model,
            response_len = generation.text.len(),
            source_count = generation.sources.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Generation complete"
        );
        Ok(generation)
    }
}

/// Extract text and sources from a response, rejecting blocked or empty ones.
pub fn parse_generation(
    capability: Capability,
    response: GenerateContentResponse,
) -> Result<Generation> {
    let bad = |message: String| Error::CapabilityBadResponse {
        capability,
        message,
    };

    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(bad(format!("prompt blocked: {}", reason)));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| bad("no candidates returned".to_string()))?;

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if BLOCKED_FINISH_REASONS.contains(&reason) {
            return Err(bad(format!("candidate blocked: {}", reason)));
        }
    }

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(bad("empty response text".to_string()));
    }

    let sources = candidate
        .grounding_metadata
        .map(extract_sources)
        .unwrap_or_default();

    Ok(Generation { text, sources })
}

/// Grounding sources in order, dropping chunks without a URI and duplicates.
pub fn extract_sources(metadata: GroundingMetadata) -> Vec<SourceCitation> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for chunk in metadata.grounding_chunks {
        let Some(web) = chunk.web else { continue };
        let Some(url) = web.uri.filter(|u| !u.trim().is_empty()) else {
            continue;
        };
        if !seen.insert(url.clone()) {
            trace!(url = %url, "Skipping duplicate grounding source");
            continue;
        }
        let title = web
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| url.clone());
        sources.push(SourceCitation { title, url });
    }
    sources
}

/// Convert a media blob into a request part.
pub fn media_part(blob: &MediaBlob) -> Part {
    match blob {
        MediaBlob::Inline { data, mime_type } => Part::inline(
            mime_type.clone(),
            base64::engine::general_purpose::STANDARD.encode(data),
        ),
        MediaBlob::Reference { uri, mime_type } => Part::file(uri.clone(), mime_type.clone()),
    }
}
