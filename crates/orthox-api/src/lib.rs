//! # orthox-api
//!
//! HTTP surface for orthox: case, note and media CRUD, workflow state, and
//! the pipeline-trigger routes.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod telemetry;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use uuid::Uuid;

use orthox_core::CaseStore;
use orthox_inference::ReasoningStrategy;
use orthox_pipeline::PipelineOrchestrator;

pub use config::{ServerConfig, StoreBackend};
pub use error::ApiError;

use handlers::{cases, health, notes, pipeline};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CaseStore>,
    pub pipeline: PipelineOrchestrator,
    /// Reported by the health route.
    pub reasoning_strategy: ReasoningStrategy,
}

impl AppState {
    /// Build state around an orchestrator, sharing its store.
    pub fn new(pipeline: PipelineOrchestrator, reasoning_strategy: ReasoningStrategy) -> Self {
        Self {
            store: pipeline.store().clone(),
            pipeline,
            reasoning_strategy,
        }
    }
}

/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "OrthoX API",
        description = "Orthopedic case workflow with AI-assisted diagnosis, treatment, implant and outcome stages"
    ),
    paths(
        cases::list_cases,
        cases::create_case,
        cases::get_case,
        cases::update_case,
        cases::get_workflow,
        notes::create_note,
        notes::create_media,
        pipeline::run_diagnosis,
        pipeline::run_classification,
        pipeline::run_treatment,
        pipeline::run_implant,
        pipeline::run_outcome,
        health::health_check,
    ),
    components(schemas(
        orthox_core::Case,
        orthox_core::CaseFull,
        orthox_core::Note,
        orthox_core::Media,
        orthox_core::MediaKind,
        orthox_core::CreateCaseRequest,
        orthox_core::CreateNoteRequest,
        orthox_core::CreateMediaRequest,
        orthox_core::Stage,
        orthox_core::StageState,
        orthox_core::WorkflowState,
        orthox_core::SourceCitation,
        cases::UpdateCaseRequest,
        cases::WorkflowResponse,
        pipeline::MediaInput,
        pipeline::DiagnosisRequest,
        pipeline::ClassificationRequest,
        pipeline::TreatmentRequest,
        pipeline::ImplantRequest,
        pipeline::OutcomeRequest,
        health::HealthResponse,
    )),
    tags(
        (name = "Cases", description = "Case records and workflow state"),
        (name = "Notes", description = "Case notes"),
        (name = "Media", description = "Persisted media references"),
        (name = "Pipeline", description = "AI pipeline runs"),
        (name = "System", description = "Health"),
    )
)]
pub struct ApiDoc;

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

fn cors_layer(origins: Option<&[axum::http::HeaderValue]>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));
    match origins {
        Some(origins) => layer.allow_origin(AllowOrigin::list(origins.iter().cloned())),
        None => layer.allow_origin(Any),
    }
}

/// Build the application router with all routes and middleware.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api-docs/openapi.json", get(health::openapi_json))
        // Cases
        .route("/api/cases", get(cases::list_cases).post(cases::create_case))
        .route(
            "/api/cases/:id",
            get(cases::get_case).patch(cases::update_case),
        )
        .route("/api/cases/:id/workflow", get(cases::get_workflow))
        // Notes and media
        .route("/api/notes", post(notes::create_note))
        .route("/api/media", post(notes::create_media))
        // Pipelines
        .route(
            "/api/cases/:id/pipeline/diagnosis",
            post(pipeline::run_diagnosis),
        )
        .route(
            "/api/cases/:id/pipeline/classification",
            post(pipeline::run_classification),
        )
        .route(
            "/api/cases/:id/pipeline/treatment",
            post(pipeline::run_treatment),
        )
        .route("/api/cases/:id/pipeline/implant", post(pipeline::run_implant))
        .route("/api/cases/:id/pipeline/outcome", post(pipeline::run_outcome))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors_layer(config.cors_allowed_origins.as_deref()))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .with_state(state)
}
