//! Mapping from domain errors and extractor rejections to HTTP responses.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{debug, error, warn};

use orthox_core::Error;

/// Error returned by every handler and by the request extractors.
///
/// Body: `{"error": message, "kind": snake_case_kind}`.
#[derive(Debug)]
pub enum ApiError {
    Domain(Error),
    /// Malformed or unacceptable JSON body. Keeps axum's status (400, 415
    /// or 422).
    Body(JsonRejection),
    /// Path segment that does not parse, e.g. a case id that is not a UUID.
    Path(PathRejection),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Domain(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection)
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Path(rejection)
    }
}

/// HTTP status for a domain error.
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::CaseNotFound(_) | Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::InsufficientMedia { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        Error::PreconditionFailed { .. } => StatusCode::CONFLICT,
        Error::CapabilityUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        Error::CapabilityBadResponse { .. } => StatusCode::BAD_GATEWAY,
        Error::CapabilityTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_body(status: StatusCode, message: String, kind: &str) -> Response {
    let body = Json(serde_json::json!({
        "error": message,
        "kind": kind,
    }));
    (status, body).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Domain(err) => {
                let status = status_for(&err);
                if err.is_capability_failure() {
                    warn!(subsystem = "api", kind = err.kind(), error = %err, "Pipeline run failed");
                } else if status.is_server_error() {
                    error!(subsystem = "api", kind = err.kind(), error = %err, "Request failed");
                }
                error_body(status, err.to_string(), err.kind())
            }
            ApiError::Body(rejection) => {
                debug!(subsystem = "api", status = %rejection.status(), "Rejected request body");
                error_body(rejection.status(), rejection.body_text(), "invalid_input")
            }
            ApiError::Path(rejection) => {
                debug!(subsystem = "api", status = %rejection.status(), "Rejected request path");
                error_body(rejection.status(), rejection.body_text(), "invalid_input")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orthox_core::{Capability, Stage};
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::CaseNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
            (
                Error::InvalidInput("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                Error::InsufficientMedia {
                    stage: Stage::Diagnosis,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                Error::PreconditionFailed {
                    stage: Stage::Implant,
                    missing: "treatment plan".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                Error::CapabilityUnavailable {
                    capability: Capability::Vision,
                    message: "down".into(),
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                Error::CapabilityBadResponse {
                    capability: Capability::Reasoning,
                    message: "empty".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                Error::CapabilityTimeout {
                    capability: Capability::GroundedAdvice,
                    timeout_secs: 120,
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (Error::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(status_for(&err), expected, "{:?}", err);
        }
    }

    #[test]
    fn test_response_status() {
        let response = ApiError::from(Error::PreconditionFailed {
            stage: Stage::Treatment,
            missing: "diagnosis".into(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = ApiError::from(Error::InvalidInput("no media".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
