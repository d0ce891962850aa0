//! # orthox-inference
//!
//! Capability adapters for orthox.
//!
//! This crate provides:
//! - [`gemini::GeminiBackend`]: the shared generative-language client
//! - [`medgemma::MedGemmaReasoner`]: the dedicated clinical-reasoning client
//! - One adapter per capability trait: vision extraction, clinical reasoning
//!   (with [`FallbackReasoner`] selecting between dedicated and general
//!   backends), AO/OTA classification, grounded advice, outcome assessment
//! - [`mock::MockCapabilities`] behind the `mock` feature
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use orthox_inference::{GeminiAdapters, InferenceConfig};
//!
//! let adapters = GeminiAdapters::build(InferenceConfig::from_env())?;
//! println!("reasoning strategy: {}", adapters.reasoner.strategy());
//! ```

pub mod advisor;
pub mod classification;
pub mod gemini;
pub mod medgemma;
pub mod outcome;
pub mod prompts;
pub mod reasoning;
pub mod vision;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

use std::sync::Arc;

// Re-export core types
pub use orthox_core::*;

pub use advisor::GeminiGroundedAdvisor;
pub use classification::GeminiClassifier;
pub use gemini::{GeminiBackend, GeminiConfig};
pub use medgemma::{MedGemmaConfig, MedGemmaReasoner};
pub use outcome::GeminiOutcomeAssessor;
pub use reasoning::{FallbackReasoner, GeminiReasoner, ReasoningStrategy};
pub use vision::GeminiVisionExtractor;

/// Configuration for every capability backend.
#[derive(Debug, Clone, Default)]
pub struct InferenceConfig {
    pub gemini: GeminiConfig,
    /// `None` selects the general-fallback reasoning strategy.
    pub medgemma: Option<MedGemmaConfig>,
}

impl InferenceConfig {
    pub fn from_env() -> Self {
        Self {
            gemini: GeminiConfig::from_env(),
            medgemma: MedGemmaConfig::from_env(),
        }
    }
}

/// Production adapters, all sharing one Gemini client.
#[derive(Clone)]
pub struct GeminiAdapters {
    pub vision: Arc<GeminiVisionExtractor>,
    pub reasoner: Arc<FallbackReasoner>,
    pub classifier: Arc<GeminiClassifier>,
    pub advisor: Arc<GeminiGroundedAdvisor>,
    pub outcome: Arc<GeminiOutcomeAssessor>,
}

impl GeminiAdapters {
    pub fn build(config: InferenceConfig) -> Result<Self> {
        let backend = Arc::new(GeminiBackend::new(config.gemini)?);

        let general: Arc<dyn ClinicalReasoner> = Arc::new(GeminiReasoner::new(backend.clone()));
        let reasoner = match config.medgemma {
            Some(medgemma) => {
                let budget = medgemma.timeout();
                let dedicated: Arc<dyn ClinicalReasoner> =
                    Arc::new(MedGemmaReasoner::new(medgemma)?);
                FallbackReasoner::new(Some(dedicated), general).with_dedicated_budget(budget)
            }
            None => FallbackReasoner::new(None, general),
        };

        Ok(Self {
            vision: Arc::new(GeminiVisionExtractor::new(backend.clone())),
            reasoner: Arc::new(reasoner),
            classifier: Arc::new(GeminiClassifier::new(backend.clone())),
            advisor: Arc::new(GeminiGroundedAdvisor::new(backend.clone())),
            outcome: Arc::new(GeminiOutcomeAssessor::new(backend)),
        })
    }
}
