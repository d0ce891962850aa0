//! Centralized default constants for orthox.
//!
//! Every environment-driven setting has its default here, and the fixed
//! clinical reference strings the adapters and orchestrator depend on live
//! alongside them so there is one place to audit them.

// =============================================================================
// SERVER
// =============================================================================

/// Default bind address.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default listen port.
pub const SERVER_PORT: u16 = 3000;

/// Default request body limit (50 MiB, enough for a few radiographs).
pub const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Default case store backend.
pub const STORE_BACKEND: &str = "postgres";

// =============================================================================
// DATABASE
// =============================================================================

/// Default database URL.
pub const DATABASE_URL: &str = "postgres://localhost/orthox";

/// Default maximum pool connections.
pub const DB_MAX_CONNECTIONS: u32 = 10;

/// Default minimum idle pool connections.
pub const DB_MIN_CONNECTIONS: u32 = 1;

/// Seconds to wait for a pooled connection.
pub const DB_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Seconds before an idle connection is closed.
pub const DB_IDLE_TIMEOUT_SECS: u64 = 600;

/// Maximum connection lifetime in seconds.
pub const DB_MAX_LIFETIME_SECS: u64 = 1800;

// =============================================================================
// PIPELINE
// =============================================================================

/// Per capability-call timeout in seconds.
pub const CAPABILITY_TIMEOUT_SECS: u64 = 120;

/// Context description handed to the reasoner by the diagnosis pipeline.
pub const DIAGNOSIS_CONTEXT: &str = "Orthopedic trauma case assessment.";

/// Prefix of the derived anonymised patient label.
pub const PATIENT_LABEL_PREFIX: &str = "Patient_";

/// Characters of the reference id used in the patient label.
pub const PATIENT_LABEL_LEN: usize = 8;

// =============================================================================
// GENERATIVE BACKEND (Gemini)
// =============================================================================

/// Default Gemini REST base URL.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used for vision extraction.
pub const GEMINI_VISION_MODEL: &str = "gemini-3.1-pro-preview";

/// Model used for general reasoning and outcome assessment.
pub const GEMINI_REASONING_MODEL: &str = "gemini-3.1-pro-preview";

/// Model used for document- and search-grounded generation.
pub const GEMINI_GROUNDED_MODEL: &str = "gemini-3-flash-preview";

/// HTTP timeout for generative calls in seconds.
pub const GEMINI_TIMEOUT_SECS: u64 = 180;

/// Temperature for vision extraction. Kept low for descriptive output.
pub const VISION_TEMPERATURE: f32 = 0.1;

// =============================================================================
// DEDICATED REASONING BACKEND (MedGemma)
// =============================================================================

/// Budget for one dedicated reasoning attempt in seconds. Must stay well
/// under `CAPABILITY_TIMEOUT_SECS` so the general fallback can still finish
/// inside the same per-call budget.
pub const MEDGEMMA_TIMEOUT_SECS: u64 = 45;

// =============================================================================
// CLINICAL REFERENCES
// =============================================================================

/// AO/OTA Fracture and Dislocation Classification Compendium (2018).
pub const AO_COMPENDIUM_URL: &str =
    "https://classification.aoeducation.org/files/download/AOOTA_Classification_2018_Compendium.pdf";

/// Returned verbatim when findings do not support a confident code.
pub const INSUFFICIENT_DATA_SENTINEL: &str =
    "(Precise sub-group cannot be determined from provided views per Compendium guidelines).";

/// Search restriction for grounded treatment and implant advice.
pub const AO_SEARCH_DOMAINS: &str = "site:surgeryreference.aofoundation.org OR site:aofoundation.org/approved/ OR site:journals.lww.com/jorthotrauma/Fulltext/2018/01001/";

/// Stated when grounded advice has no supporting source.
pub const NO_GUIDELINE_STATEMENT: &str =
    "No direct AO Foundation guideline found for this specific query";
