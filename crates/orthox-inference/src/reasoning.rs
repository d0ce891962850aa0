//! Clinical reasoning adapters and the fallback strategy.
//!
//! [`FallbackReasoner`] is what the orchestrator receives. Its strategy is
//! chosen once from configuration: `Dedicated` when a dedicated reasoning
//! endpoint is configured, otherwise `GeneralFallback`. A dedicated backend
//! that is unreachable or times out degrades to the general backend for
//! that call; the degradation is logged at WARN and counted.
//!
//! The dedicated attempt runs under its own budget, shorter than the
//! orchestrator's per-call timeout, so a hanging dedicated backend still
//! leaves the general backend time to answer.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use orthox_core::defaults::MEDGEMMA_TIMEOUT_SECS;
use orthox_core::{Capability, ClinicalReasoner, Error, Result, VisionFindings};

use crate::gemini::{GeminiBackend, GenerateRequest};
use crate::prompts;

/// General-purpose reasoning through Gemini with explicit role framing.
pub struct GeminiReasoner {
    backend: Arc<GeminiBackend>,
}

impl GeminiReasoner {
    pub fn new(backend: Arc<GeminiBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ClinicalReasoner for GeminiReasoner {
    async fn reason(&self, findings: &VisionFindings, context: &str) -> Result<String> {
        let request = GenerateRequest::text(
            &self.backend.config().reasoning_model,
            prompts::reasoning_prompt(findings, context),
        )
        .with_system(prompts::reasoning_system());

        let generation = self.backend.generate(Capability::Reasoning, request).await?;
        Ok(generation.text)
    }
}

/// Which reasoning backend serves calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningStrategy {
    Dedicated,
    GeneralFallback,
}

impl ReasoningStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dedicated => "dedicated",
            Self::GeneralFallback => "general_fallback",
        }
    }
}

impl fmt::Display for ReasoningStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// [`ClinicalReasoner`] with a dedicated backend and a general fallback.
pub struct FallbackReasoner {
    dedicated: Option<Arc<dyn ClinicalReasoner>>,
    general: Arc<dyn ClinicalReasoner>,
    dedicated_budget: Duration,
    fallback_count: AtomicU64,
}

impl FallbackReasoner {
    pub fn new(
        dedicated: Option<Arc<dyn ClinicalReasoner>>,
        general: Arc<dyn ClinicalReasoner>,
    ) -> Self {
        let reasoner = Self {
            dedicated,
            general,
            dedicated_budget: Duration::from_secs(MEDGEMMA_TIMEOUT_SECS),
            fallback_count: AtomicU64::new(0),
        };
        info!(
            subsystem = "inference",
            component = "reasoning",
            strategy = %reasoner.strategy(),
            "Selected clinical reasoning strategy"
        );
        reasoner
    }

    /// Time allowed for one dedicated attempt before falling back.
    pub fn with_dedicated_budget(mut self, budget: Duration) -> Self {
        self.dedicated_budget = budget;
        self
    }

    /// The dedicated attempt's budget, `None` without a dedicated backend.
    pub fn dedicated_budget(&self) -> Option<Duration> {
        self.dedicated.as_ref().map(|_| self.dedicated_budget)
    }

    pub fn strategy(&self) -> ReasoningStrategy {
        if self.dedicated.is_some() {
            ReasoningStrategy::Dedicated
        } else {
            ReasoningStrategy::GeneralFallback
        }
    }

    /// Calls where the dedicated backend was configured but degraded to the
    /// general backend.
    pub fn fallback_count(&self) -> u64 {
        self.fallback_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ClinicalReasoner for FallbackReasoner {
    async fn reason(&self, findings: &VisionFindings, context: &str) -> Result<String> {
        let Some(dedicated) = &self.dedicated else {
            debug!(
                subsystem = "inference",
                component = "reasoning",
                strategy = %ReasoningStrategy::GeneralFallback,
                "Dedicated reasoning backend not configured, using general backend"
            );
            return self.general.reason(findings, context).await;
        };

        let attempt =
            tokio::time::timeout(self.dedicated_budget, dedicated.reason(findings, context))
                .await
                .unwrap_or_else(|_| {
                    Err(Error::capability_timeout(
                        Capability::Reasoning,
                        self.dedicated_budget,
                    ))
                });

        match attempt {
            Ok(text) => Ok(text),
            Err(e) if e.is_unreachable() => {
                let count = self.fallback_count.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    subsystem = "inference",
                    component = "reasoning",
                    strategy = %ReasoningStrategy::GeneralFallback,
                    fallback_count = count,
                    error = %e,
                    "Dedicated reasoning backend unavailable, falling back to general backend"
                );
                self.general.reason(findings, context).await
            }
            Err(e) => Err(e),
        }
    }
}
