//! Structured logging schema and field name constants for orthox.
//!
//! Every crate uses these constants so log aggregation can query pipeline
//! runs by the same field names regardless of which subsystem emitted them.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, completed pipeline runs |
//! | DEBUG | Decision points (strategy selection, low-resource snapshot) |
//! | TRACE | Per-item detail (individual media parts, grounding chunks) |
//!
//! Media bytes and generated clinical text are never logged. Log their
//! lengths and counts instead.

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated from the `x-request-id` header.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "db", "inference", "pipeline"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "gemini", "medgemma", "orchestrator", "pool", "memory_store"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "run_diagnosis", "generate", "update_case_fields"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Case UUID being operated on.
pub const CASE_ID: &str = "case_id";

/// Workflow stage ("diagnosis", "treatment", "implant", "outcome").
pub const STAGE: &str = "stage";

/// Capability being invoked ("vision", "reasoning", ...).
pub const CAPABILITY: &str = "capability";

/// Reasoning strategy selected ("dedicated", "general_fallback").
pub const STRATEGY: &str = "strategy";

/// Model name used for a generation call.
pub const MODEL: &str = "model";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of media items sent to the vision stage.
pub const MEDIA_COUNT: &str = "media_count";

/// Number of grounding sources returned with advice.
pub const SOURCE_COUNT: &str = "source_count";

/// Byte length of a prompt.
pub const PROMPT_LEN: &str = "prompt_len";

/// Byte length of a model response.
pub const RESPONSE_LEN: &str = "response_len";

// ─── Policy fields ─────────────────────────────────────────────────────────

/// Low-resource flag in effect for a run.
pub const LOW_RESOURCE: &str = "low_resource";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Whether the operation succeeded.
pub const SUCCESS: &str = "success";

/// Error message (only on failure paths).
pub const ERROR: &str = "error";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_are_snake_case() {
        let fields = [
            REQUEST_ID,
            SUBSYSTEM,
            COMPONENT,
            OPERATION,
            CASE_ID,
            STAGE,
            CAPABILITY,
            STRATEGY,
            MODEL,
            DURATION_MS,
            MEDIA_COUNT,
            SOURCE_COUNT,
            PROMPT_LEN,
            RESPONSE_LEN,
            LOW_RESOURCE,
            SUCCESS,
            ERROR,
        ];
        for field in fields {
            assert!(
                field.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "field {} is not snake_case",
                field
            );
        }
    }
}
