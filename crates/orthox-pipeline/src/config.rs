//! Orchestrator configuration.

use std::time::Duration;

use orthox_core::defaults::{CAPABILITY_TIMEOUT_SECS, DIAGNOSIS_CONTEXT};
use orthox_core::{Error, Result};

/// Settings shared by every pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on each individual capability call.
    pub capability_timeout: Duration,
    /// Fixed context description handed to clinical reasoning.
    pub diagnosis_context: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capability_timeout: Duration::from_secs(CAPABILITY_TIMEOUT_SECS),
            diagnosis_context: DIAGNOSIS_CONTEXT.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Read `CAPABILITY_TIMEOUT_SECS` and `DIAGNOSIS_CONTEXT`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capability_timeout: std::env::var("CAPABILITY_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.capability_timeout),
            diagnosis_context: std::env::var("DIAGNOSIS_CONTEXT")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.diagnosis_context),
        }
    }

    pub fn with_capability_timeout(mut self, timeout: Duration) -> Self {
        self.capability_timeout = timeout;
        self
    }

    pub fn with_diagnosis_context(mut self, context: impl Into<String>) -> Self {
        self.diagnosis_context = context.into();
        self
    }

    /// Reject a dedicated-reasoning budget that would starve the general
    /// fallback. The dedicated attempt and the fallback share one capability
    /// timeout, so the attempt may use at most half of it.
    pub fn check_fallback_budget(&self, dedicated: Duration) -> Result<()> {
        if dedicated.saturating_mul(2) > self.capability_timeout {
            return Err(Error::Config(format!(
                "dedicated reasoning budget {}s leaves the general fallback too little of the {}s capability timeout; set MEDGEMMA_TIMEOUT to at most half of CAPABILITY_TIMEOUT_SECS",
                dedicated.as_secs_f64(),
                self.capability_timeout.as_secs_f64()
            )));
        }
        Ok(())
    }
}
