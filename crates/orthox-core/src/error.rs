//! Error types for orthox.

use std::time::Duration;

use thiserror::Error;

use crate::traits::Capability;
use crate::workflow::Stage;

/// Result type alias using orthox's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for orthox operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Case not found
    #[error("Case not found: {0}")]
    CaseNotFound(uuid::Uuid),

    /// A vision-driven pipeline was started without any input media
    #[error("Insufficient media: the {stage} pipeline requires at least one media item")]
    InsufficientMedia { stage: Stage },

    /// A stage was run before its prerequisite artifact exists
    #[error("Precondition failed for {stage}: {missing} is required")]
    PreconditionFailed { stage: Stage, missing: String },

    /// Capability backend unreachable or misconfigured
    #[error("{capability} unavailable: {message}")]
    CapabilityUnavailable {
        capability: Capability,
        message: String,
    },

    /// Capability returned an unparseable or empty response
    #[error("{capability} returned a bad response: {message}")]
    CapabilityBadResponse {
        capability: Capability,
        message: String,
    },

    /// Capability call exceeded its time budget
    #[error("{capability} timed out after {timeout_secs}s")]
    CapabilityTimeout {
        capability: Capability,
        timeout_secs: u64,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Timeout error for an elapsed budget, rounded up to whole seconds so a
    /// sub-second budget never reports `0s`.
    pub fn capability_timeout(capability: Capability, budget: Duration) -> Self {
        let millis = budget.as_millis().max(1);
        Error::CapabilityTimeout {
            capability,
            timeout_secs: millis.div_ceil(1000) as u64,
        }
    }

    /// The capability that failed, for capability-level errors.
    pub fn capability(&self) -> Option<Capability> {
        match self {
            Error::CapabilityUnavailable { capability, .. }
            | Error::CapabilityBadResponse { capability, .. }
            | Error::CapabilityTimeout { capability, .. } => Some(*capability),
            _ => None,
        }
    }

    /// True for failures that abort a single run but never touch case state.
    pub fn is_capability_failure(&self) -> bool {
        self.capability().is_some()
    }

    /// True when the backend could not be reached in time or at all.
    ///
    /// Bad responses are excluded: the backend answered, just not usefully.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Error::CapabilityUnavailable { .. } | Error::CapabilityTimeout { .. }
        )
    }

    /// Stable snake_case identifier used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Database(_) => "database",
            Error::NotFound(_) => "not_found",
            Error::CaseNotFound(_) => "case_not_found",
            Error::InsufficientMedia { .. } => "insufficient_media",
            Error::PreconditionFailed { .. } => "precondition_failed",
            Error::CapabilityUnavailable { .. } => "capability_unavailable",
            Error::CapabilityBadResponse { .. } => "capability_bad_response",
            Error::CapabilityTimeout { .. } => "capability_timeout",
            Error::Serialization(_) => "serialization",
            Error::Config(_) => "config",
            Error::InvalidInput(_) => "invalid_input",
            Error::Request(_) => "request",
            Error::Internal(_) => "internal",
            Error::Io(_) => "io",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
