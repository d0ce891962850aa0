//! Gemini-specific error handling.
//!
//! Vendor failures are classified by status, then mapped onto the capability
//! taxonomy: anything that keeps the backend from answering is
//! `CapabilityUnavailable`, a client-side timeout is `CapabilityTimeout`.

use orthox_core::{Capability, Error};

/// Gemini error codes derived from HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeminiErrorCode {
    /// Missing, invalid or unauthorised API key.
    AuthenticationError,
    /// Quota or rate limit exceeded.
    RateLimitExceeded,
    /// Model not found or not available.
    ModelNotFound,
    /// Malformed request.
    InvalidRequest,
    /// Server error.
    ServerError,
    /// Unknown error.
    Unknown,
}

impl GeminiErrorCode {
    /// Determine error code from HTTP status and Google API status string.
    pub fn from_response(status: u16, api_status: &str) -> Self {
        match (status, api_status) {
            (401, _) | (403, _) | (_, "UNAUTHENTICATED") | (_, "PERMISSION_DENIED") => {
                Self::AuthenticationError
            }
            (429, _) | (_, "RESOURCE_EXHAUSTED") => Self::RateLimitExceeded,
            (404, _) | (_, "NOT_FOUND") => Self::ModelNotFound,
            (400, _) => Self::InvalidRequest,
            (500..=599, _) => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::AuthenticationError => "Authentication failed",
            Self::RateLimitExceeded => "Rate limit exceeded",
            Self::ModelNotFound => "Model not found",
            Self::InvalidRequest => "Invalid request",
            Self::ServerError => "Server error",
            Self::Unknown => "Unexpected status",
        }
    }
}

/// Convert a non-success Gemini response into a capability error.
pub fn to_capability_error(capability: Capability, code: GeminiErrorCode, message: &str) -> Error {
    Error::CapabilityUnavailable {
        capability,
        message: format!("{}: {}", code.label(), message),
    }
}

/// Convert a transport failure into a capability error.
pub fn transport_error(capability: Capability, err: &reqwest::Error, timeout_secs: u64) -> Error {
    if err.is_timeout() {
        Error::CapabilityTimeout {
            capability,
            timeout_secs,
        }
    } else {
        Error::CapabilityUnavailable {
            capability,
            message: format!("Request failed: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_from_401() {
        assert_eq!(
            GeminiErrorCode::from_response(401, ""),
            GeminiErrorCode::AuthenticationError
        );
    }

    #[test]
    fn test_error_code_from_permission_denied() {
        assert_eq!(
            GeminiErrorCode::from_response(403, "PERMISSION_DENIED"),
            GeminiErrorCode::AuthenticationError
        );
    }

    #[test]
    fn test_error_code_from_429() {
        assert_eq!(
            GeminiErrorCode::from_response(429, "RESOURCE_EXHAUSTED"),
            GeminiErrorCode::RateLimitExceeded
        );
    }

    #[test]
    fn test_error_code_from_404() {
        assert_eq!(
            GeminiErrorCode::from_response(404, "NOT_FOUND"),
            GeminiErrorCode::ModelNotFound
        );
    }

    #[test]
    fn test_error_code_from_400() {
        assert_eq!(
            GeminiErrorCode::from_response(400, "INVALID_ARGUMENT"),
            GeminiErrorCode::InvalidRequest
        );
    }

    #[test]
    fn test_error_code_from_503() {
        assert_eq!(
            GeminiErrorCode::from_response(503, "UNAVAILABLE"),
            GeminiErrorCode::ServerError
        );
    }

    #[test]
    fn test_error_code_from_unknown() {
        assert_eq!(
            GeminiErrorCode::from_response(418, ""),
            GeminiErrorCode::Unknown
        );
    }

    #[test]
    fn test_to_capability_error_names_capability() {
        let err = to_capability_error(
            Capability::GroundedAdvice,
            GeminiErrorCode::RateLimitExceeded,
            "quota",
        );
        assert_eq!(err.capability(), Some(Capability::GroundedAdvice));
        assert_eq!(
            err.to_string(),
            "grounded_advice unavailable: Rate limit exceeded: quota"
        );
    }
}
