use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use super::check_grants;
use crate::access::Action;
use crate::audit::{self, FileRef, RequestMeta};
use crate::auth::RequireAuth;
use crate::error::Error;
use crate::server::AppState;
use crate::server::access::{
    creator_grant, folder_access, report_access, require, require_access,
};
use crate::server::dto::{ListReportsParams, ReplaceGrantsRequest, UpdateReportRequest, WithAccess};
use crate::server::files::{file_response, read_upload_form};
use crate::server::response::{
    ApiError, ApiResponse, StoreOptionExt, StoreResultExt, store_error,
};
use crate::server::validation::{link, validate_title};
use crate::store::{ReportFilter, Store};
use crate::types::{Actor, FileAction, FileType, Report, StoredFile};
use crate::uploads::Bucket;

fn load_report(store: &dyn Store, id: &str) -> Result<Report, ApiError> {
    store
        .get_report(id)
        .api_err("Failed to get report")?
        .or_not_found("Report not found")
}

/// Filing a report into a folder requires edit rights on that folder.
fn check_target_folder(store: &dyn Store, actor: &Actor, folder_id: &str) -> Result<(), ApiError> {
    store
        .get_folder(folder_id)
        .api_err("Failed to check folder")?
        .ok_or_else(|| ApiError::bad_request("Folder does not exist"))?;
    let access = folder_access(store, actor, folder_id)?;
    require_access(access.edit, "You cannot add reports to this folder")
}

fn check_player(store: &dyn Store, player_id: &str) -> Result<(), ApiError> {
    store
        .get_player(player_id)
        .api_err("Failed to check player")?
        .ok_or_else(|| ApiError::bad_request("Player does not exist"))?;
    Ok(())
}

fn file_ref(report: &Report) -> FileRef<'_> {
    FileRef {
        file_type: FileType::Report,
        file_id: &report.id,
        file_name: &report.file.file_name,
    }
}

pub async fn list_reports(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListReportsParams>,
    meta: RequestMeta,
) -> impl IntoResponse {
    let actor = &auth.actor;
    require(actor, Action::ViewReports)?;
    let store = state.store.as_ref();

    let reports = store
        .list_reports(&ReportFilter {
            folder_id: params.folder_id,
            player_id: params.player_id,
        })
        .api_err("Failed to list reports")?;

    let mut visible = Vec::new();
    for report in reports {
        let access = report_access(store, actor, &report.id)?;
        if access.view {
            audit::record(store, &actor.user_id, file_ref(&report), FileAction::View, &meta);
            visible.push(WithAccess {
                item: report,
                access,
            });
        }
    }

    Ok::<_, ApiError>(Json(ApiResponse::success(visible)))
}

/// Accepts multipart fields `file`, `title`, `description`, `folder_id`
/// and `player_id`.
pub async fn upload_report(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    meta: RequestMeta,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let actor = &auth.actor;
    require(actor, Action::UploadReports)?;
    let store = state.store.as_ref();

    let form = read_upload_form(&mut multipart, state.uploads.max_bytes()).await?;

    let title = form.text("title");
    let description = form.text("description");
    let folder_id = form.text("folder_id");
    let player_id = form.text("player_id");
    let file = form
        .file
        .ok_or_else(|| ApiError::bad_request("Missing 'file' field"))?;

    if file.data.is_empty() {
        return Err(ApiError::bad_request("Uploaded file is empty"));
    }
    let title = title.unwrap_or_else(|| file.file_name.clone());
    validate_title(&title)?;
    if let Some(folder_id) = &folder_id {
        check_target_folder(store, actor, folder_id)?;
    }
    if let Some(player_id) = &player_id {
        check_player(store, player_id)?;
    }

    let blob = state
        .uploads
        .put(Bucket::Reports, &file.data)
        .await
        .api_err("Failed to store report file")?;

    let now = Utc::now();
    let report = Report {
        id: Uuid::new_v4().to_string(),
        folder_id,
        player_id,
        title,
        description,
        file: StoredFile {
            file_name: file.file_name,
            stored_name: blob.stored_name,
            mime_type: file.mime_type,
            size_bytes: blob.size_bytes,
            sha256: blob.sha256,
        },
        author_id: actor.user_id.clone(),
        created_at: now,
        updated_at: now,
    };

    if let Err(e) = store.create_report(&report, creator_grant(actor).as_ref()) {
        if let Err(del) = state
            .uploads
            .delete(Bucket::Reports, &report.file.stored_name)
            .await
        {
            tracing::warn!(
                "Failed to remove orphaned report file {}: {del}",
                report.file.stored_name
            );
        }
        return Err(store_error(e, "Failed to create report"));
    }

    audit::record(store, &actor.user_id, file_ref(&report), FileAction::Upload, &meta);

    tracing::info!(
        "Report {} uploaded by {} ({} bytes)",
        report.id,
        actor.user_id,
        report.file.size_bytes
    );

    let access = report_access(store, actor, &report.id)?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Report uploaded",
            WithAccess {
                item: report,
                access,
            },
        )),
    ))
}

pub async fn get_report(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    meta: RequestMeta,
) -> impl IntoResponse {
    let actor = &auth.actor;
    let store = state.store.as_ref();
    let report = load_report(store, &id)?;

    let access = report_access(store, actor, &id)?;
    require_access(access.view, "You do not have access to this report")?;

    audit::record(store, &actor.user_id, file_ref(&report), FileAction::View, &meta);

    Ok::<_, ApiError>(Json(ApiResponse::success(WithAccess {
        item: report,
        access,
    })))
}

pub async fn update_report(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateReportRequest>,
) -> impl IntoResponse {
    let actor = &auth.actor;
    let store = state.store.as_ref();
    let mut report = load_report(store, &id)?;

    let access = report_access(store, actor, &id)?;
    require_access(access.edit, "You cannot edit this report")?;

    if let Some(title) = req.title {
        validate_title(&title)?;
        report.title = title.trim().to_string();
    }
    if req.description.is_some() {
        report.description = req.description;
    }
    if let Some(folder_id) = req.folder_id {
        let folder_id = link(folder_id);
        if let Some(target) = &folder_id {
            if report.folder_id.as_ref() != Some(target) {
                check_target_folder(store, actor, target)?;
            }
        }
        report.folder_id = folder_id;
    }
    if let Some(player_id) = req.player_id {
        let player_id = link(player_id);
        if let Some(player_id) = &player_id {
            check_player(store, player_id)?;
        }
        report.player_id = player_id;
    }

    store.update_report(&report).api_err("Failed to update report")?;
    report.updated_at = Utc::now();

    Ok::<_, ApiError>(Json(ApiResponse::with_message(
        "Report updated",
        WithAccess {
            item: report,
            access,
        },
    )))
}

pub async fn delete_report(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    meta: RequestMeta,
) -> impl IntoResponse {
    let actor = &auth.actor;
    let store = state.store.as_ref();
    let report = load_report(store, &id)?;

    let access = report_access(store, actor, &id)?;
    require_access(access.delete, "You cannot delete this report")?;

    store.delete_report(&id).api_err("Failed to delete report")?;

    if let Err(e) = state
        .uploads
        .delete(Bucket::Reports, &report.file.stored_name)
        .await
    {
        tracing::warn!("Failed to remove file of deleted report {id}: {e}");
    }

    audit::record(store, &actor.user_id, file_ref(&report), FileAction::Delete, &meta);

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn download_report(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    meta: RequestMeta,
) -> impl IntoResponse {
    let actor = &auth.actor;
    let store = state.store.as_ref();
    let report = load_report(store, &id)?;

    let access = report_access(store, actor, &id)?;
    require_access(access.view, "You do not have access to this report")?;

    let file = state
        .uploads
        .open(Bucket::Reports, &report.file.stored_name)
        .await
        .map_err(|e| match e {
            Error::NotFound => ApiError::not_found("Report file is missing"),
            e => store_error(e, "Failed to open report file"),
        })?;

    audit::record(store, &actor.user_id, file_ref(&report), FileAction::Download, &meta);

    Ok::<_, ApiError>(file_response(file, &report.file, false))
}

pub async fn get_visibility(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ShareContent)?;
    let store = state.store.as_ref();
    load_report(store, &id)?;

    let grants = store
        .list_report_grants(&id)
        .api_err("Failed to list report visibility")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(grants)))
}

/// Replaces the report's whole grant set in one transaction.
pub async fn replace_visibility(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ReplaceGrantsRequest>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ShareContent)?;
    let store = state.store.as_ref();
    load_report(store, &id)?;
    check_grants(&req.grants)?;

    store
        .replace_report_grants(&id, &req.grants)
        .map_err(|e| match e {
            Error::ReferentialIntegrity => {
                ApiError::bad_request("Visibility names an unknown staff member")
            }
            e => store_error(e, "Failed to update report visibility"),
        })?;

    tracing::info!(
        "Report {id} visibility replaced with {} grants by {}",
        req.grants.len(),
        auth.actor.user_id
    );

    Ok::<_, ApiError>(Json(ApiResponse::with_message(
        "Visibility updated",
        req.grants,
    )))
}
