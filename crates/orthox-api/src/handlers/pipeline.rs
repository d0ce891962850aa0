//! Pipeline-trigger handlers.
//!
//! Media arrives straight from the client upload: base64 `data` (optionally a
//! `data:` URL) or an external `uri`. Nothing here persists media rows.

use axum::extract::State;
use axum::Json;
use base64::Engine;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use orthox_core::{detect_mime_type, Error, MediaBlob, Result, VisionFindings};
use orthox_pipeline::{AdviceResult, ClassificationResult, DiagnosisResult, OutcomeResult};

use crate::extract::{JsonBody, PathParam};
use crate::{ApiError, AppState};

/// One pipeline input item. Exactly one of `data` and `uri` must be set.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct MediaInput {
    /// Base64 bytes, or a `data:<mime>;base64,<payload>` URL.
    pub data: Option<String>,
    /// External reference such as a video link.
    pub uri: Option<String>,
    /// Detected from magic bytes when absent for inline data.
    pub mime_type: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DiagnosisRequest {
    #[serde(default)]
    pub media: Vec<MediaInput>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ClassificationRequest {
    /// Findings returned by a previous diagnosis run.
    #[schema(value_type = Option<String>)]
    pub findings: Option<VisionFindings>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TreatmentRequest {
    pub patient_context: Option<String>,
    /// Overrides the case flag for this run only.
    pub low_resource_mode: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ImplantRequest {
    pub low_resource_mode: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OutcomeRequest {
    #[serde(default)]
    pub media: Vec<MediaInput>,
    pub clinical_status: Option<String>,
}

impl MediaInput {
    /// Decode into a pipeline media blob.
    pub fn into_blob(self) -> Result<MediaBlob> {
        match (self.data, self.uri) {
            (Some(data), None) => {
                let (declared, payload) = split_data_url(&data);
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(payload.trim())
                    .map_err(|e| Error::InvalidInput(format!("Invalid base64 media data: {}", e)))?;
                if bytes.is_empty() {
                    return Err(Error::InvalidInput("media data is empty".to_string()));
                }
                let mime_type = self
                    .mime_type
                    .or(declared)
                    .or_else(|| detect_mime_type(&bytes).map(str::to_string))
                    .ok_or_else(|| {
                        Error::InvalidInput("could not determine media type".to_string())
                    })?;
                Ok(MediaBlob::inline(bytes, mime_type))
            }
            (None, Some(uri)) if !uri.trim().is_empty() => {
                Ok(MediaBlob::reference(uri.trim(), self.mime_type))
            }
            (None, Some(_)) => Err(Error::InvalidInput("media uri is empty".to_string())),
            _ => Err(Error::InvalidInput(
                "each media item needs exactly one of 'data' or 'uri'".to_string(),
            )),
        }
    }
}

/// Split `data:<mime>;base64,<payload>` into its MIME type and payload.
/// Plain base64 passes through with no declared type.
fn split_data_url(data: &str) -> (Option<String>, &str) {
    let Some(rest) = data.strip_prefix("data:") else {
        return (None, data);
    };
    match rest.split_once(',') {
        Some((header, payload)) => {
            let mime = header
                .split(';')
                .next()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string);
            (mime, payload)
        }
        None => (None, rest),
    }
}

fn decode_media(items: Vec<MediaInput>) -> Result<Vec<MediaBlob>> {
    items.into_iter().map(MediaInput::into_blob).collect()
}

/// Vision extraction followed by clinical reasoning.
#[utoipa::path(post, path = "/api/cases/{id}/pipeline/diagnosis", tag = "Pipeline",
    params(("id" = Uuid, Path, description = "Case id")),
    request_body = DiagnosisRequest,
    responses(
        (status = 200, description = "Diagnosis stored; findings returned for classification"),
        (status = 400, description = "Malformed media item"),
        (status = 404, description = "Case not found"),
        (status = 422, description = "No media supplied"),
        (status = 502, description = "Capability returned a bad response"),
        (status = 503, description = "Capability unavailable"),
        (status = 504, description = "Capability timed out"),
    ))]
pub async fn run_diagnosis(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(req): JsonBody<DiagnosisRequest>,
) -> std::result::Result<Json<DiagnosisResult>, ApiError> {
    let media = decode_media(req.media)?;
    Ok(Json(state.pipeline.run_diagnosis(id, &media).await?))
}

/// Classify findings from a diagnosis run and store the result as a note.
#[utoipa::path(post, path = "/api/cases/{id}/pipeline/classification", tag = "Pipeline",
    params(("id" = Uuid, Path, description = "Case id")),
    request_body = ClassificationRequest,
    responses(
        (status = 200, description = "Classification or insufficient-data sentinel stored as note"),
        (status = 404, description = "Case not found"),
        (status = 409, description = "Findings missing"),
    ))]
pub async fn run_classification(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(req): JsonBody<ClassificationRequest>,
) -> std::result::Result<Json<ClassificationResult>, ApiError> {
    let findings = req.findings.unwrap_or_else(|| VisionFindings::new(""));
    Ok(Json(state.pipeline.run_classification(id, &findings).await?))
}

/// Grounded treatment advice from the stored diagnosis.
#[utoipa::path(post, path = "/api/cases/{id}/pipeline/treatment", tag = "Pipeline",
    params(("id" = Uuid, Path, description = "Case id")),
    request_body = TreatmentRequest,
    responses(
        (status = 200, description = "Treatment plan stored; sources returned"),
        (status = 404, description = "Case not found"),
        (status = 409, description = "Diagnosis missing"),
    ))]
pub async fn run_treatment(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(req): JsonBody<TreatmentRequest>,
) -> std::result::Result<Json<AdviceResult>, ApiError> {
    let context = req.patient_context.unwrap_or_default();
    Ok(Json(
        state
            .pipeline
            .run_treatment(id, &context, req.low_resource_mode)
            .await?,
    ))
}

/// Grounded implant advice from the stored diagnosis and treatment plan.
#[utoipa::path(post, path = "/api/cases/{id}/pipeline/implant", tag = "Pipeline",
    params(("id" = Uuid, Path, description = "Case id")),
    request_body = ImplantRequest,
    responses(
        (status = 200, description = "Implant choice stored; sources returned"),
        (status = 404, description = "Case not found"),
        (status = 409, description = "Diagnosis or treatment plan missing"),
    ))]
pub async fn run_implant(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(req): JsonBody<ImplantRequest>,
) -> std::result::Result<Json<AdviceResult>, ApiError> {
    Ok(Json(
        state.pipeline.run_implant(id, req.low_resource_mode).await?,
    ))
}

/// Vision extraction followed by outcome assessment.
#[utoipa::path(post, path = "/api/cases/{id}/pipeline/outcome", tag = "Pipeline",
    params(("id" = Uuid, Path, description = "Case id")),
    request_body = OutcomeRequest,
    responses(
        (status = 200, description = "Outcome notes stored"),
        (status = 404, description = "Case not found"),
        (status = 422, description = "No media supplied"),
    ))]
pub async fn run_outcome(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(req): JsonBody<OutcomeRequest>,
) -> std::result::Result<Json<OutcomeResult>, ApiError> {
    let media = decode_media(req.media)?;
    let status = req.clinical_status.unwrap_or_default();
    Ok(Json(
        state.pipeline.run_outcome(id, &media, &status).await?,
    ))
}
