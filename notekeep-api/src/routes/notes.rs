/// Note endpoints
///
/// All routes sit behind the bearer middleware and act on behalf of the
/// caller's [`AuthContext`]. A note id that is malformed, missing, or owned
/// by someone else yields the same `404 NOT_FOUND`.
///
/// # Endpoints
///
/// - `GET    /notes` - list, most recently updated first
/// - `POST   /notes` - create
/// - `GET    /notes/:id` - read
/// - `PUT    /notes/:id` - replace title and content
/// - `DELETE /notes/:id` - delete

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::auth::AuthContext,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use notekeep_shared::error::ServiceError;
use notekeep_shared::models::{Note, NoteInput};
use notekeep_shared::validation::validate_note_fields;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Create / update body
///
/// Missing fields default to empty and fail the blank check with the field
/// named.
#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub content: String,
}

impl NoteRequest {
    fn into_input(self) -> ApiResult<NoteInput> {
        validate_note_fields(&self.title, &self.content)?;
        Ok(NoteInput::new(self.title, self.content))
    }
}

/// `{ "note": ... }`
#[derive(Debug, Serialize, Deserialize)]
pub struct NoteResponse {
    pub note: Note,
}

/// `{ "notes": [...] }`
#[derive(Debug, Serialize, Deserialize)]
pub struct NotesResponse {
    pub notes: Vec<Note>,
}

/// `{ "message": ... }`
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Path ids that do not parse cannot name an owned note
fn parse_note_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::from(ServiceError::note_not_found()))
}

pub async fn list_notes(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<NotesResponse>> {
    let notes = state.notes.list_by_user(&ctx.actor).await?;
    Ok(Json(NotesResponse { notes }))
}

/// # Errors
///
/// - `400 VALIDATION`: blank title or content, title over 500 characters
pub async fn create_note(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    payload: Result<Json<NoteRequest>, JsonRejection>,
) -> ApiResult<Json<NoteResponse>> {
    let Json(req) = payload?;
    let input = req.into_input()?;

    let note = state.notes.create(&ctx.actor, &input).await?;
    Ok(Json(NoteResponse { note }))
}

pub async fn get_note(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<NoteResponse>> {
    let id = parse_note_id(&id)?;
    let note = state.notes.get_by_id(&ctx.actor, id).await?;
    Ok(Json(NoteResponse { note }))
}

/// # Errors
///
/// - `400 VALIDATION`: as for create; the stored note is left untouched
/// - `404 NOT_FOUND`: no owned note with this id
pub async fn update_note(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    payload: Result<Json<NoteRequest>, JsonRejection>,
) -> ApiResult<Json<NoteResponse>> {
    let id = parse_note_id(&id)?;
    let Json(req) = payload?;
    let input = req.into_input()?;

    let note = state.notes.update(&ctx.actor, id, &input).await?;
    Ok(Json(NoteResponse { note }))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_note_id(&id)?;
    state.notes.delete(&ctx.actor, id).await?;

    Ok(Json(MessageResponse {
        message: "Note deleted successfully".to_string(),
    }))
}
