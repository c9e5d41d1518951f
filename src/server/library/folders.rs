use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use super::check_grants;
use crate::access::Action;
use crate::auth::RequireAuth;
use crate::error::Error;
use crate::server::AppState;
use crate::server::access::{creator_grant, folder_access, require, require_access};
use crate::server::dto::{CreateFolderRequest, ReplaceGrantsRequest, UpdateFolderRequest, WithAccess};
use crate::server::response::{
    ApiError, ApiResponse, StoreOptionExt, StoreResultExt, store_error,
};
use crate::server::validation::validate_name;
use crate::store::Store;
use crate::types::ReportFolder;

fn load_folder(store: &dyn Store, id: &str) -> Result<ReportFolder, ApiError> {
    store
        .get_folder(id)
        .api_err("Failed to get folder")?
        .or_not_found("Folder not found")
}

pub async fn list_folders(auth: RequireAuth, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let actor = &auth.actor;
    require(actor, Action::ViewReports)?;
    let store = state.store.as_ref();

    let mut visible = Vec::new();
    for folder in store.list_folders().api_err("Failed to list folders")? {
        let access = folder_access(store, actor, &folder.id)?;
        if access.view {
            visible.push(WithAccess {
                item: folder,
                access,
            });
        }
    }

    Ok::<_, ApiError>(Json(ApiResponse::success(visible)))
}

pub async fn create_folder(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateFolderRequest>,
) -> impl IntoResponse {
    let actor = &auth.actor;
    require(actor, Action::UploadReports)?;
    let store = state.store.as_ref();

    let name = req.name.trim().to_string();
    validate_name(&name, "Folder")?;

    let now = Utc::now();
    let folder = ReportFolder {
        id: Uuid::new_v4().to_string(),
        name,
        description: req.description,
        created_by: actor.user_id.clone(),
        created_at: now,
        updated_at: now,
    };

    store
        .create_folder(&folder, creator_grant(actor).as_ref())
        .api_err("Failed to create folder")?;

    let access = folder_access(store, actor, &folder.id)?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Folder created",
            WithAccess {
                item: folder,
                access,
            },
        )),
    ))
}

pub async fn get_folder(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let folder = load_folder(store, &id)?;

    let access = folder_access(store, &auth.actor, &id)?;
    require_access(access.view, "You do not have access to this folder")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(WithAccess {
        item: folder,
        access,
    })))
}

pub async fn update_folder(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateFolderRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let mut folder = load_folder(store, &id)?;

    let access = folder_access(store, &auth.actor, &id)?;
    require_access(access.edit, "You cannot edit this folder")?;

    if let Some(name) = req.name {
        let name = name.trim().to_string();
        validate_name(&name, "Folder")?;
        folder.name = name;
    }
    if req.description.is_some() {
        folder.description = req.description;
    }

    store.update_folder(&folder).api_err("Failed to update folder")?;
    folder.updated_at = Utc::now();

    Ok::<_, ApiError>(Json(ApiResponse::with_message(
        "Folder updated",
        WithAccess {
            item: folder,
            access,
        },
    )))
}

/// Reports inside the folder survive and become unfiled.
pub async fn delete_folder(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    load_folder(store, &id)?;

    let access = folder_access(store, &auth.actor, &id)?;
    require_access(access.delete, "You cannot delete this folder")?;

    store.delete_folder(&id).api_err("Failed to delete folder")?;

    tracing::info!("Folder {id} deleted by {}", auth.actor.user_id);

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn get_visibility(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ShareContent)?;
    let store = state.store.as_ref();
    load_folder(store, &id)?;

    let grants = store
        .list_folder_grants(&id)
        .api_err("Failed to list folder visibility")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(grants)))
}

/// Replaces the folder's whole grant set in one transaction.
pub async fn replace_visibility(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ReplaceGrantsRequest>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ShareContent)?;
    let store = state.store.as_ref();
    load_folder(store, &id)?;
    check_grants(&req.grants)?;

    store
        .replace_folder_grants(&id, &req.grants)
        .map_err(|e| match e {
            Error::ReferentialIntegrity => {
                ApiError::bad_request("Visibility names an unknown staff member")
            }
            e => store_error(e, "Failed to update folder visibility"),
        })?;

    tracing::info!(
        "Folder {id} visibility replaced with {} grants by {}",
        req.grants.len(),
        auth.actor.user_id
    );

    Ok::<_, ApiError>(Json(ApiResponse::with_message(
        "Visibility updated",
        req.grants,
    )))
}
