use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::access::Action;
use crate::audit::{self, FileRef, RequestMeta};
use crate::auth::{RequireAuth, hash_password};
use crate::error::Error;
use crate::server::AppState;
use crate::server::access::require;
use crate::server::dto::{CreatePlayerRequest, ListPlayersParams, UpdatePlayerRequest};
use crate::server::files::{file_response, read_upload_form};
use crate::server::response::{
    ApiError, ApiResponse, StoreOptionExt, StoreResultExt, store_error,
};
use crate::server::validation::{
    link, validate_email, validate_name, validate_password, validate_team_ref,
};
use crate::store::Store;
use crate::types::{FileAction, FileType, Player, Role, StoredFile, User};
use crate::uploads::Bucket;

const AVATAR_MIME_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/webp", "image/gif"];

fn load_player(store: &dyn Store, id: &str) -> Result<Player, ApiError> {
    store
        .get_player(id)
        .api_err("Failed to get player")?
        .or_not_found("Player not found")
}

pub async fn list_players(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListPlayersParams>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ViewPlayers)?;

    let players = state
        .store
        .list_players(params.team_id.as_deref())
        .api_err("Failed to list players")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(players)))
}

pub async fn create_player(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePlayerRequest>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ManagePlayers)?;
    let store = state.store.as_ref();

    validate_name(&req.first_name, "First")?;
    validate_name(&req.last_name, "Last")?;
    let email = req.email.map(|e| e.trim().to_string());
    if let Some(email) = &email {
        validate_email(email)?;
    }
    validate_team_ref(store, req.team_id.as_deref())?;

    let now = Utc::now();
    let first_name = req.first_name.trim().to_string();
    let last_name = req.last_name.trim().to_string();

    let login = match &req.password {
        Some(password) => {
            let email = email
                .clone()
                .ok_or_else(|| ApiError::bad_request("A player login requires an email"))?;
            validate_password(password)?;
            Some(User {
                id: Uuid::new_v4().to_string(),
                email,
                name: format!("{first_name} {last_name}"),
                password_hash: hash_password(password).api_err("Failed to hash password")?,
                role: Role::Player,
                created_at: now,
                updated_at: now,
            })
        }
        None => None,
    };

    let player = Player {
        id: Uuid::new_v4().to_string(),
        user_id: login.as_ref().map(|u| u.id.clone()),
        team_id: req.team_id,
        first_name,
        last_name,
        email,
        position: req.position,
        jersey_number: req.jersey_number,
        date_of_birth: req.date_of_birth,
        avatar: None,
        wellness_id: req.wellness_id,
        created_at: now,
        updated_at: now,
    };

    store
        .create_player(&player, login.as_ref())
        .map_err(|e| match e {
            Error::AlreadyExists => ApiError::conflict("Email is already registered"),
            e => store_error(e, "Failed to create player"),
        })?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Player created", player)),
    ))
}

pub async fn get_player(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ViewPlayers)?;
    let player = load_player(state.store.as_ref(), &id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(player)))
}

pub async fn update_player(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePlayerRequest>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ManagePlayers)?;
    let store = state.store.as_ref();
    let mut player = load_player(store, &id)?;

    if let Some(first_name) = req.first_name {
        validate_name(&first_name, "First")?;
        player.first_name = first_name.trim().to_string();
    }
    if let Some(last_name) = req.last_name {
        validate_name(&last_name, "Last")?;
        player.last_name = last_name.trim().to_string();
    }
    if let Some(email) = req.email {
        let email = email.trim().to_string();
        validate_email(&email)?;
        player.email = Some(email);
    }
    if let Some(team_id) = req.team_id {
        let team_id = link(team_id);
        validate_team_ref(store, team_id.as_deref())?;
        player.team_id = team_id;
    }
    if req.position.is_some() {
        player.position = req.position;
    }
    if req.jersey_number.is_some() {
        player.jersey_number = req.jersey_number;
    }
    if req.date_of_birth.is_some() {
        player.date_of_birth = req.date_of_birth;
    }
    if req.wellness_id.is_some() {
        player.wellness_id = req.wellness_id;
    }

    store.update_player(&player).map_err(|e| match e {
        Error::AlreadyExists => ApiError::conflict("Email is already registered"),
        e => store_error(e, "Failed to update player"),
    })?;
    player.updated_at = Utc::now();

    Ok::<_, ApiError>(Json(ApiResponse::with_message("Player updated", player)))
}

pub async fn delete_player(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ManagePlayers)?;
    let store = state.store.as_ref();
    let player = load_player(store, &id)?;

    store.delete_player(&id).api_err("Failed to delete player")?;

    if let Some(avatar) = &player.avatar {
        if let Err(e) = state.uploads.delete(Bucket::Avatars, &avatar.stored_name).await {
            tracing::warn!("Failed to remove avatar of deleted player {id}: {e}");
        }
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn upload_avatar(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    meta: RequestMeta,
    mut multipart: Multipart,
) -> impl IntoResponse {
    require(&auth.actor, Action::ManagePlayers)?;
    let store = state.store.as_ref();
    let mut player = load_player(store, &id)?;

    let form = read_upload_form(&mut multipart, state.uploads.max_bytes()).await?;
    let file = form
        .file
        .ok_or_else(|| ApiError::bad_request("Missing 'file' field"))?;

    if !AVATAR_MIME_TYPES.contains(&file.mime_type.as_str()) {
        return Err(ApiError::bad_request(format!(
            "Unsupported avatar type '{}'",
            file.mime_type
        )));
    }
    if file.data.is_empty() {
        return Err(ApiError::bad_request("Avatar file is empty"));
    }

    let blob = state
        .uploads
        .put(Bucket::Avatars, &file.data)
        .await
        .api_err("Failed to store avatar")?;

    let avatar = StoredFile {
        file_name: file.file_name,
        stored_name: blob.stored_name,
        mime_type: file.mime_type,
        size_bytes: blob.size_bytes,
        sha256: blob.sha256,
    };

    if let Err(e) = store.set_player_avatar(&id, Some(&avatar)) {
        if let Err(del) = state.uploads.delete(Bucket::Avatars, &avatar.stored_name).await {
            tracing::warn!("Failed to remove orphaned avatar {}: {del}", avatar.stored_name);
        }
        return Err(store_error(e, "Failed to save avatar"));
    }

    if let Some(previous) = player.avatar.replace(avatar.clone()) {
        if let Err(e) = state.uploads.delete(Bucket::Avatars, &previous.stored_name).await {
            tracing::warn!("Failed to remove previous avatar of player {id}: {e}");
        }
    }

    audit::record(
        store,
        &auth.actor.user_id,
        FileRef {
            file_type: FileType::Avatar,
            file_id: &player.id,
            file_name: &avatar.file_name,
        },
        FileAction::Upload,
        &meta,
    );

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Avatar uploaded", player)),
    ))
}

pub async fn get_avatar(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    meta: RequestMeta,
) -> impl IntoResponse {
    require(&auth.actor, Action::ViewPlayers)?;
    let store = state.store.as_ref();
    let player = load_player(store, &id)?;
    let avatar = player
        .avatar
        .ok_or_else(|| ApiError::not_found("Player has no avatar"))?;

    let file = state
        .uploads
        .open(Bucket::Avatars, &avatar.stored_name)
        .await
        .map_err(|e| match e {
            Error::NotFound => ApiError::not_found("Avatar file is missing"),
            e => store_error(e, "Failed to open avatar"),
        })?;

    audit::record(
        store,
        &auth.actor.user_id,
        FileRef {
            file_type: FileType::Avatar,
            file_id: &player.id,
            file_name: &avatar.file_name,
        },
        FileAction::View,
        &meta,
    );

    Ok::<_, ApiError>(file_response(file, &avatar, true))
}

pub async fn get_wellness(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ViewPlayers)?;
    let player = load_player(state.store.as_ref(), &id)?;

    let summary = state.wellness.fetch(player.wellness_id.as_deref()).await;

    Ok::<_, ApiError>(Json(ApiResponse::success(summary)))
}
