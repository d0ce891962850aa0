//! # orthox-pipeline
//!
//! Clinical workflow orchestration for orthox.
//!
//! This crate provides:
//! - The diagnosis pipeline (vision extraction, then clinical reasoning)
//! - Classification of retained findings, stored as a case note
//! - Search-grounded treatment and implant flows with a low-resource policy
//! - The outcome pipeline (vision extraction, then outcome assessment)
//! - A bounded timeout around every capability call
//!
//! The orchestrator depends only on the `CaseStore` and capability traits,
//! so any store and any set of adapters can be injected.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use orthox_pipeline::{Capabilities, PipelineConfig, PipelineOrchestrator};
//!
//! let orchestrator = PipelineOrchestrator::new(store, caps, PipelineConfig::from_env());
//! let result = orchestrator.run_diagnosis(case_id, &media).await?;
//! let classification = orchestrator.run_classification(case_id, &result.findings).await?;
//! ```

pub mod config;
pub mod orchestrator;

// Re-export core types
pub use orthox_core::*;

pub use config::PipelineConfig;
pub use orchestrator::{
    AdviceResult, Capabilities, ClassificationResult, DiagnosisResult, OutcomeResult,
    PipelineOrchestrator,
};
