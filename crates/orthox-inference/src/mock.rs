//! Recording mock capabilities for deterministic testing.
//!
//! One [`MockCapabilities`] implements all five capability traits. Clones
//! share configuration and call log, so a test can hand clones to the
//! orchestrator and still flip failures or inspect calls afterwards.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use orthox_inference::mock::{MockCapabilities, MockFailure};
//! use orthox_core::Capability;
//!
//! let mock = MockCapabilities::new()
//!     .with_response(Capability::Reasoning, "Displaced distal radius fracture");
//! mock.set_failure(Capability::Vision, MockFailure::Unavailable);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use orthox_core::{
    AdviceRequest, Capability, Classification, Classifier, ClinicalReasoner, Error,
    GroundedAdvice, GroundedAdvisor, MediaBlob, OutcomeAssessor, Result, SourceCitation,
    VisionExtractor, VisionFindings,
};

/// Default vision findings returned by the mock.
pub const MOCK_FINDINGS: &str = r#"{"fracture":"present"}"#;

/// How a mocked capability fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// `CapabilityUnavailable`.
    Unavailable,
    /// `CapabilityBadResponse`.
    BadResponse,
    /// Never returns (sleeps for an hour); use with a capability timeout.
    Hang,
}

/// One recorded capability call.
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub capability: Capability,
    /// Text input to the call (findings, context, diagnosis, ...).
    pub input: String,
    /// Low-resource flag for grounded-advice calls.
    pub low_resource: Option<bool>,
}

#[derive(Debug)]
struct MockConfig {
    responses: HashMap<Capability, String>,
    failures: HashMap<Capability, MockFailure>,
    sources: Vec<SourceCitation>,
    latency_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        let responses = HashMap::from([
            (Capability::Vision, MOCK_FINDINGS.to_string()),
            (Capability::Reasoning, "Mock clinical reasoning".to_string()),
            (
                Capability::Classification,
                "32-A1 Spiral fracture of the femoral diaphysis (Compendium section 32)"
                    .to_string(),
            ),
            (
                Capability::GroundedAdvice,
                "Mock grounded advice [AO Surgery Reference](https://surgeryreference.aofoundation.org/)"
                    .to_string(),
            ),
            (
                Capability::OutcomeAssessment,
                "Mock outcome assessment".to_string(),
            ),
        ]);
        Self {
            responses,
            failures: HashMap::new(),
            sources: vec![SourceCitation {
                title: "AO Surgery Reference".to_string(),
                url: "https://surgeryreference.aofoundation.org/".to_string(),
            }],
            latency_ms: 0,
        }
    }
}

/// Mock implementation of every capability trait.
#[derive(Clone)]
pub struct MockCapabilities {
    config: Arc<Mutex<MockConfig>>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

impl Default for MockCapabilities {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCapabilities {
    pub fn new() -> Self {
        Self {
            config: Arc::new(Mutex::new(MockConfig::default())),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the canned response text for a capability.
    pub fn with_response(self, capability: Capability, response: impl Into<String>) -> Self {
        self.config
            .lock()
            .unwrap()
            .responses
            .insert(capability, response.into());
        self
    }

    /// Set the grounding sources returned with advice.
    pub fn with_sources(self, sources: Vec<SourceCitation>) -> Self {
        self.config.lock().unwrap().sources = sources;
        self
    }

    /// Simulated latency for every call.
    pub fn with_latency_ms(self, latency_ms: u64) -> Self {
        self.config.lock().unwrap().latency_ms = latency_ms;
        self
    }

    pub fn with_failure(self, capability: Capability, failure: MockFailure) -> Self {
        self.set_failure(capability, failure);
        self
    }

    /// Make `capability` fail from now on. Shared with all clones.
    pub fn set_failure(&self, capability: Capability, failure: MockFailure) {
        self.config
            .lock()
            .unwrap()
            .failures
            .insert(capability, failure);
    }

    pub fn clear_failure(&self, capability: Capability) {
        self.config.lock().unwrap().failures.remove(&capability);
    }

    pub fn set_response(&self, capability: Capability, response: impl Into<String>) {
        self.config
            .lock()
            .unwrap()
            .responses
            .insert(capability, response.into());
    }

    /// All logged calls, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    pub fn calls_for(&self, capability: Capability) -> Vec<MockCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.capability == capability)
            .collect()
    }

    pub fn call_count(&self, capability: Capability) -> usize {
        self.calls_for(capability).len()
    }

    pub fn clear_calls(&self) {
        self.call_log.lock().unwrap().clear()
    }

    /// Log the call, apply latency and failure injection, return the response.
    async fn invoke(
        &self,
        capability: Capability,
        input: String,
        low_resource: Option<bool>,
    ) -> Result<String> {
        self.call_log.lock().unwrap().push(MockCall {
            capability,
            input,
            low_resource,
        });

        let (latency_ms, failure, response) = {
            let config = self.config.lock().unwrap();
            (
                config.latency_ms,
                config.failures.get(&capability).copied(),
                config.responses.get(&capability).cloned().unwrap_or_default(),
            )
        };

        if latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(latency_ms)).await;
        }

        match failure {
            Some(MockFailure::Unavailable) => Err(Error::CapabilityUnavailable {
                capability,
                message: "mock backend unavailable".to_string(),
            }),
            Some(MockFailure::BadResponse) => Err(Error::CapabilityBadResponse {
                capability,
                message: "mock backend returned garbage".to_string(),
            }),
            Some(MockFailure::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(Error::CapabilityUnavailable {
                    capability,
                    message: "mock backend hung".to_string(),
                })
            }
            None => Ok(response),
        }
    }
}

#[async_trait]
impl VisionExtractor for MockCapabilities {
    async fn extract(&self, media: &[MediaBlob]) -> Result<VisionFindings> {
        let input = media
            .iter()
            .map(|m| m.mime_type().unwrap_or("unknown"))
            .collect::<Vec<_>>()
            .join(",");
        let text = self.invoke(Capability::Vision, input, None).await?;
        Ok(VisionFindings::new(text))
    }
}

#[async_trait]
impl ClinicalReasoner for MockCapabilities {
    async fn reason(&self, findings: &VisionFindings, context: &str) -> Result<String> {
        let input = format!("{}\n{}", findings.as_str(), context);
        self.invoke(Capability::Reasoning, input, None).await
    }
}

#[async_trait]
impl Classifier for MockCapabilities {
    async fn classify(&self, findings: &VisionFindings) -> Result<Classification> {
        let text = self
            .invoke(Capability::Classification, findings.as_str().to_string(), None)
            .await?;
        Classification::from_model_output(&text)
    }
}

#[async_trait]
impl GroundedAdvisor for MockCapabilities {
    async fn advise(&self, request: &AdviceRequest) -> Result<GroundedAdvice> {
        let input = match &request.treatment_plan {
            Some(plan) => format!("{}\n{}", request.diagnosis, plan),
            None => format!(
                "{}\n{}",
                request.diagnosis,
                request.patient_context.as_deref().unwrap_or("")
            ),
        };
        let text = self
            .invoke(Capability::GroundedAdvice, input, Some(request.low_resource))
            .await?;
        let sources = self.config.lock().unwrap().sources.clone();
        Ok(GroundedAdvice { text, sources })
    }
}

#[async_trait]
impl OutcomeAssessor for MockCapabilities {
    async fn assess(&self, findings: &VisionFindings, clinical_status: &str) -> Result<String> {
        let input = format!("{}\n{}", findings.as_str(), clinical_status);
        self.invoke(Capability::OutcomeAssessment, input, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orthox_core::defaults::INSUFFICIENT_DATA_SENTINEL;

    #[tokio::test]
    async fn test_default_responses() {
        let mock = MockCapabilities::new();
        let findings = mock
            .extract(&[MediaBlob::inline(vec![1], "image/png")])
            .await
            .unwrap();
        assert_eq!(findings.as_str(), MOCK_FINDINGS);

        let classification = mock.classify(&findings).await.unwrap();
        assert_eq!(classification.code(), Some("32-A1"));
    }

    #[tokio::test]
    async fn test_failure_injection_is_shared_between_clones() {
        let mock = MockCapabilities::new();
        let clone = mock.clone();
        mock.set_failure(Capability::Reasoning, MockFailure::BadResponse);

        let result = clone
            .reason(&VisionFindings::new("{}"), "ctx")
            .await;
        assert!(matches!(result, Err(Error::CapabilityBadResponse { .. })));

        mock.clear_failure(Capability::Reasoning);
        assert!(clone.reason(&VisionFindings::new("{}"), "ctx").await.is_ok());
        assert_eq!(mock.call_count(Capability::Reasoning), 2);
    }

    #[tokio::test]
    async fn test_advice_records_low_resource_flag() {
        let mock = MockCapabilities::new();
        mock.advise(&AdviceRequest::treatment("dx", "ctx", true))
            .await
            .unwrap();

        let calls = mock.calls_for(Capability::GroundedAdvice);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].low_resource, Some(true));
        assert_eq!(calls[0].input, "dx\nctx");
    }

    #[tokio::test]
    async fn test_insufficient_classification_response() {
        let mock = MockCapabilities::new()
            .with_response(Capability::Classification, INSUFFICIENT_DATA_SENTINEL);
        let classification = mock
            .classify(&VisionFindings::new(MOCK_FINDINGS))
            .await
            .unwrap();
        assert!(classification.is_insufficient());
    }

    #[tokio::test]
    async fn test_codeless_classification_is_bad_response() {
        let mock = MockCapabilities::new()
            .with_response(Capability::Classification, "Cannot tell from these views.");
        let err = mock
            .classify(&VisionFindings::new(MOCK_FINDINGS))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "capability_bad_response");
    }
}
