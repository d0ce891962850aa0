//! Case CRUD and workflow-state handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use orthox_core::{Case, CaseFull, CaseUpdate, CreateCaseRequest, Stage, WorkflowState};

use crate::extract::{JsonBody, PathParam};
use crate::{ApiError, AppState};

/// Fields a client may change directly. Artifact fields are written only by
/// pipeline runs, so they are rejected here.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateCaseRequest {
    pub low_resource_mode: Option<bool>,
    /// One-way: `false` never clears a confirmed case.
    pub phi_confirmed: Option<bool>,
}

impl From<UpdateCaseRequest> for CaseUpdate {
    fn from(req: UpdateCaseRequest) -> Self {
        CaseUpdate {
            low_resource_mode: req.low_resource_mode,
            phi_confirmed: req.phi_confirmed,
            ..Default::default()
        }
    }
}

/// Per-stage state plus the stages that may run now.
#[derive(Debug, Serialize, ToSchema)]
pub struct WorkflowResponse {
    pub case_id: Uuid,
    pub stages: WorkflowState,
    pub runnable: Vec<Stage>,
}

/// List all cases, newest first.
#[utoipa::path(get, path = "/api/cases", tag = "Cases",
    responses((status = 200, description = "Cases, newest first", body = [Case])))]
pub async fn list_cases(State(state): State<AppState>) -> Result<Json<Vec<Case>>, ApiError> {
    Ok(Json(state.store.list_cases().await?))
}

/// Create a case with a pseudonymous patient reference.
#[utoipa::path(post, path = "/api/cases", tag = "Cases",
    request_body = CreateCaseRequest,
    responses((status = 201, description = "Case created", body = Case)))]
pub async fn create_case(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateCaseRequest>,
) -> Result<(StatusCode, Json<Case>), ApiError> {
    let case = state.store.create_case(req).await?;
    info!(subsystem = "api", case_id = %case.id, "Case created");
    Ok((StatusCode::CREATED, Json(case)))
}

/// Fetch a case with its notes and media.
#[utoipa::path(get, path = "/api/cases/{id}", tag = "Cases",
    params(("id" = Uuid, Path, description = "Case id")),
    responses(
        (status = 200, description = "Case with notes and media", body = CaseFull),
        (status = 404, description = "Case not found"),
    ))]
pub async fn get_case(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<CaseFull>, ApiError> {
    Ok(Json(state.store.get_case(id).await?))
}

/// Toggle low-resource mode or confirm PHI review.
#[utoipa::path(patch, path = "/api/cases/{id}", tag = "Cases",
    params(("id" = Uuid, Path, description = "Case id")),
    request_body = UpdateCaseRequest,
    responses(
        (status = 200, description = "Updated case", body = Case),
        (status = 404, description = "Case not found"),
        (status = 422, description = "Unknown or artifact field in body"),
    ))]
pub async fn update_case(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(req): JsonBody<UpdateCaseRequest>,
) -> Result<Json<Case>, ApiError> {
    let update = CaseUpdate::from(req);
    if !update.is_empty() {
        state.store.update_case_fields(id, update).await?;
    }
    Ok(Json(state.store.get_case(id).await?.case))
}

/// Workflow state of a case.
#[utoipa::path(get, path = "/api/cases/{id}/workflow", tag = "Cases",
    params(("id" = Uuid, Path, description = "Case id")),
    responses(
        (status = 200, description = "Stage states", body = WorkflowResponse),
        (status = 404, description = "Case not found"),
    ))]
pub async fn get_workflow(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<WorkflowResponse>, ApiError> {
    let stages = state.pipeline.workflow(id).await?;
    Ok(Json(WorkflowResponse {
        case_id: id,
        runnable: stages.runnable(),
        stages,
    }))
}
