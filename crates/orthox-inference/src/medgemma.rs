//! Dedicated clinical-reasoning backend (MedGemma behind an HTTP proxy).
//!
//! Request: `POST {endpoint}` with `{"visionData": ..., "context": ...}` and
//! an optional bearer key. Response: `{"reasoning": "..."}`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use orthox_core::defaults::MEDGEMMA_TIMEOUT_SECS;
use orthox_core::{Capability, ClinicalReasoner, Error, Result, VisionFindings};

use crate::gemini::error::transport_error;

#[derive(Debug, Clone)]
pub struct MedGemmaConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl MedGemmaConfig {
    /// Read `MEDGEMMA_ENDPOINT`, `MEDGEMMA_API_KEY` and `MEDGEMMA_TIMEOUT`
    /// (seconds).
    ///
    /// Returns `None` when no endpoint is configured.
    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var("MEDGEMMA_ENDPOINT")
            .ok()
            .filter(|e| !e.trim().is_empty())?;
        Some(Self {
            endpoint,
            api_key: std::env::var("MEDGEMMA_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            timeout_seconds: std::env::var("MEDGEMMA_TIMEOUT")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .unwrap_or(MEDGEMMA_TIMEOUT_SECS),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReasoningRequest<'a> {
    vision_data: &'a str,
    context: &'a str,
}

#[derive(Debug, Deserialize)]
struct ReasoningResponse {
    reasoning: Option<String>,
}

/// HTTP client for the dedicated reasoning backend.
pub struct MedGemmaReasoner {
    client: Client,
    config: MedGemmaConfig,
}

impl MedGemmaReasoner {
    pub fn new(config: MedGemmaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "inference",
            component = "medgemma",
            endpoint = %config.endpoint,
            api_key_configured = config.api_key.is_some(),
            "Initializing dedicated reasoning backend"
        );

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &MedGemmaConfig {
        &self.config
    }
}

#[async_trait]
impl ClinicalReasoner for MedGemmaReasoner {
    async fn reason(&self, findings: &VisionFindings, context: &str) -> Result<String> {
        let capability = Capability::Reasoning;
        let start = Instant::now();

        let mut request = self.client.post(&self.config.endpoint).json(&ReasoningRequest {
            vision_data: findings.as_str(),
            context,
        });
        if let Some(ref api_key) = self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(capability, &e, self.config.timeout_seconds))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::CapabilityUnavailable {
                capability,
                message: format!("dedicated reasoning backend returned {}", status),
            });
        }

        let body: ReasoningResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                transport_error(capability, &e, self.config.timeout_seconds)
            } else {
                Error::CapabilityBadResponse {
                    capability,
                    message: format!("Failed to parse response: {}", e),
                }
            }
        })?;

        let reasoning = body
            .reasoning
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| Error::CapabilityBadResponse {
                capability,
                message: "response has no reasoning text".to_string(),
            })?;

        debug!(
            subsystem = "inference",
            component = "medgemma",
            response_len = reasoning.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Dedicated reasoning complete"
        );
        Ok(reasoning)
    }
}
