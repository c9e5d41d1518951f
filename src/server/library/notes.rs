use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use super::check_unique_grantees;
use crate::access::Action;
use crate::auth::RequireAuth;
use crate::error::Error;
use crate::server::AppState;
use crate::server::access::{note_access, require, require_access};
use crate::server::dto::{
    CreateNoteRequest, ListNotesParams, NoteAccessRequest, UpdateNoteRequest, WithAccess,
};
use crate::server::response::{
    ApiError, ApiResponse, StoreOptionExt, StoreResultExt, store_error,
};
use crate::server::validation::{link, validate_title};
use crate::store::Store;
use crate::types::CoachNote;

fn load_note(store: &dyn Store, id: &str) -> Result<CoachNote, ApiError> {
    store
        .get_note(id)
        .api_err("Failed to get note")?
        .or_not_found("Note not found")
}

fn check_player(store: &dyn Store, player_id: &str) -> Result<(), ApiError> {
    store
        .get_player(player_id)
        .api_err("Failed to check player")?
        .ok_or_else(|| ApiError::bad_request("Player does not exist"))?;
    Ok(())
}

fn check_body(body: &str) -> Result<(), ApiError> {
    if body.trim().is_empty() {
        return Err(ApiError::bad_request("Note body cannot be empty"));
    }
    Ok(())
}

/// Lists the notes the caller may view.
pub async fn list_notes(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListNotesParams>,
) -> impl IntoResponse {
    let actor = &auth.actor;
    let store = state.store.as_ref();

    let mut visible = Vec::new();
    for note in store
        .list_notes(params.player_id.as_deref())
        .api_err("Failed to list notes")?
    {
        let access = note_access(store, actor, &note.id)?;
        if access.view {
            visible.push(WithAccess { item: note, access });
        }
    }

    Ok::<_, ApiError>(Json(ApiResponse::success(visible)))
}

pub async fn create_note(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateNoteRequest>,
) -> impl IntoResponse {
    let actor = &auth.actor;
    require(actor, Action::WriteNotes)?;
    let store = state.store.as_ref();

    validate_title(&req.title)?;
    check_body(&req.body)?;
    let player_id = req.player_id.and_then(link);
    if let Some(player_id) = &player_id {
        check_player(store, player_id)?;
    }

    let now = Utc::now();
    let note = CoachNote {
        id: Uuid::new_v4().to_string(),
        player_id,
        title: req.title.trim().to_string(),
        body: req.body,
        author_id: actor.user_id.clone(),
        created_at: now,
        updated_at: now,
    };

    store.create_note(&note).api_err("Failed to create note")?;

    let access = note_access(store, actor, &note.id)?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Note created",
            WithAccess { item: note, access },
        )),
    ))
}

pub async fn get_note(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let note = load_note(store, &id)?;

    let access = note_access(store, &auth.actor, &id)?;
    require_access(access.view, "You do not have access to this note")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(WithAccess { item: note, access })))
}

pub async fn update_note(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateNoteRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let mut note = load_note(store, &id)?;

    let access = note_access(store, &auth.actor, &id)?;
    require_access(access.edit, "You cannot edit this note")?;

    if let Some(title) = req.title {
        validate_title(&title)?;
        note.title = title.trim().to_string();
    }
    if let Some(body) = req.body {
        check_body(&body)?;
        note.body = body;
    }
    if let Some(player_id) = req.player_id {
        let player_id = link(player_id);
        if let Some(player_id) = &player_id {
            check_player(store, player_id)?;
        }
        note.player_id = player_id;
    }

    store.update_note(&note).api_err("Failed to update note")?;
    note.updated_at = Utc::now();

    Ok::<_, ApiError>(Json(ApiResponse::with_message(
        "Note updated",
        WithAccess { item: note, access },
    )))
}

pub async fn delete_note(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    load_note(store, &id)?;

    let access = note_access(store, &auth.actor, &id)?;
    require_access(access.delete, "You cannot delete this note")?;

    store.delete_note(&id).api_err("Failed to delete note")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn get_access(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ShareContent)?;
    let store = state.store.as_ref();
    load_note(store, &id)?;

    let staff_ids = store
        .list_note_viewers(&id)
        .api_err("Failed to list note access")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(NoteAccessRequest { staff_ids })))
}

/// Replaces the set of staff members who may read the note.
pub async fn replace_access(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<NoteAccessRequest>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ShareContent)?;
    let store = state.store.as_ref();
    load_note(store, &id)?;
    check_unique_grantees(req.staff_ids.iter().map(String::as_str))?;

    store
        .replace_note_viewers(&id, &req.staff_ids)
        .map_err(|e| match e {
            Error::ReferentialIntegrity => {
                ApiError::bad_request("Access list names an unknown staff member")
            }
            e => store_error(e, "Failed to update note access"),
        })?;

    Ok::<_, ApiError>(Json(ApiResponse::with_message("Access updated", req)))
}
