mod folders;
mod notes;
mod reports;

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;
use crate::server::response::ApiError;
use crate::types::Grant;

pub fn library_router() -> Router<Arc<AppState>> {
    Router::new()
        // Folders
        .route(
            "/folders",
            get(folders::list_folders).post(folders::create_folder),
        )
        .route(
            "/folders/{id}",
            get(folders::get_folder)
                .put(folders::update_folder)
                .patch(folders::update_folder)
                .delete(folders::delete_folder),
        )
        .route(
            "/folders/{id}/visibility",
            get(folders::get_visibility).put(folders::replace_visibility),
        )
        // Reports
        .route("/reports", get(reports::list_reports))
        .route("/reports", post(reports::upload_report))
        .route(
            "/reports/{id}",
            get(reports::get_report)
                .put(reports::update_report)
                .patch(reports::update_report)
                .delete(reports::delete_report),
        )
        .route("/reports/{id}/download", get(reports::download_report))
        .route(
            "/reports/{id}/visibility",
            get(reports::get_visibility).put(reports::replace_visibility),
        )
        // Coach notes
        .route("/notes", get(notes::list_notes).post(notes::create_note))
        .route(
            "/notes/{id}",
            get(notes::get_note)
                .put(notes::update_note)
                .patch(notes::update_note)
                .delete(notes::delete_note),
        )
        .route(
            "/notes/{id}/access",
            get(notes::get_access).put(notes::replace_access),
        )
}

/// Rejects a grant set naming the same staff member twice.
fn check_unique_grantees<'a>(staff_ids: impl IntoIterator<Item = &'a str>) -> Result<(), ApiError> {
    let mut seen = HashSet::new();
    for staff_id in staff_ids {
        if !seen.insert(staff_id) {
            return Err(ApiError::bad_request(format!(
                "Staff member {staff_id} appears more than once"
            )));
        }
    }
    Ok(())
}

fn check_grants(grants: &[Grant]) -> Result<(), ApiError> {
    check_unique_grantees(grants.iter().map(|g| g.staff_id.as_str()))
}
