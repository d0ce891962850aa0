//! # orthox-core
//!
//! Core types, traits, and workflow rules for the orthox clinical workflow
//! service.
//!
//! This crate provides the case data model, the error taxonomy shared by
//! every other crate, the capability and case-store traits the pipeline is
//! assembled from, and the workflow state machine that gates which stage may
//! run next. It performs no I/O.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod media;
pub mod models;
pub mod traits;
pub mod uuid_utils;
pub mod workflow;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use media::{detect_mime_type, media_kind_for_mime, MediaBlob};
pub use models::*;
pub use traits::*;
pub use uuid_utils::{new_v7, patient_label, new_patient_reference};
pub use workflow::{Stage, StageState, WorkflowState};
