//! Note and media handlers ("save to workspace").

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use orthox_core::{CreateMediaRequest, CreateNoteRequest, Error, Media, Note};

use crate::extract::JsonBody;
use crate::{ApiError, AppState};

/// Append a note to a case, optionally citing a source.
#[utoipa::path(post, path = "/api/notes", tag = "Notes",
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created", body = Note),
        (status = 400, description = "Empty content"),
        (status = 404, description = "Case not found"),
    ))]
pub async fn create_note(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateNoteRequest>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    if req.content.trim().is_empty() {
        return Err(Error::InvalidInput("note content must not be empty".to_string()).into());
    }
    let note = state.store.add_note(req).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// Attach a media reference to a case.
#[utoipa::path(post, path = "/api/media", tag = "Media",
    request_body = CreateMediaRequest,
    responses(
        (status = 201, description = "Media created", body = Media),
        (status = 400, description = "Empty url"),
        (status = 404, description = "Case not found"),
    ))]
pub async fn create_media(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateMediaRequest>,
) -> Result<(StatusCode, Json<Media>), ApiError> {
    if req.url.trim().is_empty() {
        return Err(Error::InvalidInput("media url must not be empty".to_string()).into());
    }
    let media = state.store.add_media(req).await?;
    Ok((StatusCode::CREATED, Json(media)))
}
