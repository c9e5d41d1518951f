use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::access::Action;
use crate::auth::{RequireAuth, hash_password};
use crate::error::Error;
use crate::server::AppState;
use crate::server::access::require;
use crate::server::dto::{CreateStaffRequest, StaffMember};
use crate::server::response::{
    ApiError, ApiResponse, StoreOptionExt, StoreResultExt, store_error,
};
use crate::server::validation::{validate_email, validate_name, validate_password};
use crate::store::Store;
use crate::types::{Role, Staff, StaffCapabilities, User};

fn to_member(store: &dyn Store, staff: Staff) -> Result<StaffMember, ApiError> {
    let user = store
        .get_user(&staff.user_id)
        .api_err("Failed to load staff user")?
        .or_not_found("Staff user not found")?;
    Ok(StaffMember {
        staff,
        email: user.email,
        name: user.name,
    })
}

pub async fn list_staff(auth: RequireAuth, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    require(&auth.actor, Action::ManageStaff)?;
    let store = state.store.as_ref();

    let members = store
        .list_staff()
        .api_err("Failed to list staff")?
        .into_iter()
        .map(|staff| to_member(store, staff))
        .collect::<Result<Vec<_>, _>>()?;

    Ok::<_, ApiError>(Json(ApiResponse::success(members)))
}

pub async fn create_staff(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateStaffRequest>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ManageStaff)?;
    let store = state.store.as_ref();

    let email = req.email.trim().to_string();
    validate_email(&email)?;
    validate_name(&req.name, "Staff")?;
    validate_password(&req.password)?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email,
        name: req.name.trim().to_string(),
        password_hash: hash_password(&req.password).api_err("Failed to hash password")?,
        role: Role::Staff,
        created_at: now,
        updated_at: now,
    };
    let staff = Staff {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        title: req.title,
        capabilities: req.capabilities,
        created_at: now,
        updated_at: now,
    };

    store
        .create_staff_member(&user, &staff)
        .map_err(|e| match e {
            Error::AlreadyExists => ApiError::conflict("Email is already registered"),
            e => store_error(e, "Failed to create staff member"),
        })?;

    tracing::info!("Staff member {} created", staff.id);

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Staff member created",
            StaffMember {
                staff,
                email: user.email,
                name: user.name,
            },
        )),
    ))
}

pub async fn get_staff(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ManageStaff)?;
    let store = state.store.as_ref();

    let staff = store
        .get_staff(&id)
        .api_err("Failed to get staff member")?
        .or_not_found("Staff member not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(to_member(store, staff)?)))
}

/// Replaces every capability flag of a staff member.
pub async fn update_capabilities(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(capabilities): Json<StaffCapabilities>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ManageStaff)?;
    let store = state.store.as_ref();

    let mut staff = store
        .get_staff(&id)
        .api_err("Failed to get staff member")?
        .or_not_found("Staff member not found")?;

    staff.capabilities = capabilities;
    store
        .update_staff(&staff)
        .api_err("Failed to update capabilities")?;
    staff.updated_at = Utc::now();

    tracing::info!(
        "Capabilities of staff member {} changed by {}",
        staff.id,
        auth.actor.user_id
    );

    Ok::<_, ApiError>(Json(ApiResponse::with_message(
        "Capabilities updated",
        to_member(store, staff)?,
    )))
}

/// Deletes the staff member's login; the staff row and their grants go with it.
pub async fn delete_staff(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ManageStaff)?;
    let store = state.store.as_ref();

    let staff = store
        .get_staff(&id)
        .api_err("Failed to get staff member")?
        .or_not_found("Staff member not found")?;

    if staff.user_id == auth.actor.user_id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }

    store.delete_user(&staff.user_id).map_err(|e| match e {
        Error::ReferentialIntegrity => {
            ApiError::conflict("Staff member still owns content and cannot be deleted")
        }
        e => store_error(e, "Failed to delete staff member"),
    })?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
