use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
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
use crate::server::dto::{CreateUserRequest, ListUsersParams, UpdateUserRequest};
use crate::server::response::{
    ApiError, ApiResponse, StoreOptionExt, StoreResultExt, store_error,
};
use crate::server::validation::{validate_email, validate_name, validate_password};
use crate::types::{Role, Staff, User};

pub async fn list_users(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListUsersParams>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ManageUsers)?;

    let users = state
        .store
        .list_users(params.role)
        .api_err("Failed to list users")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(users)))
}

pub async fn create_user(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ManageUsers)?;
    let store = state.store.as_ref();

    let email = req.email.trim().to_string();
    validate_email(&email)?;
    validate_name(&req.name, "User")?;
    validate_password(&req.password)?;

    if store
        .get_user_by_email(&email)
        .api_err("Failed to check email")?
        .is_some()
    {
        return Err(ApiError::conflict("Email is already registered"));
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email,
        name: req.name.trim().to_string(),
        password_hash: hash_password(&req.password).api_err("Failed to hash password")?,
        role: req.role,
        created_at: now,
        updated_at: now,
    };

    if user.role == Role::Staff {
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
            .api_err("Failed to create user")?;
    } else {
        store.create_user(&user).api_err("Failed to create user")?;
    }

    tracing::info!("User {} created with role {}", user.id, user.role);

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("User created", user)),
    ))
}

pub async fn get_user(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ManageUsers)?;

    let user = state
        .store
        .get_user(&id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

pub async fn update_user(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ManageUsers)?;
    let store = state.store.as_ref();

    let mut user = store
        .get_user(&id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    if let Some(email) = req.email {
        let email = email.trim().to_string();
        validate_email(&email)?;
        if let Some(existing) = store
            .get_user_by_email(&email)
            .api_err("Failed to check email")?
        {
            if existing.id != user.id {
                return Err(ApiError::conflict("Email is already registered"));
            }
        }
        user.email = email;
    }

    if let Some(name) = req.name {
        validate_name(&name, "User")?;
        user.name = name.trim().to_string();
    }

    if let Some(password) = req.password {
        validate_password(&password)?;
        user.password_hash = hash_password(&password).api_err("Failed to hash password")?;
    }

    store.update_user(&user).api_err("Failed to update user")?;
    user.updated_at = Utc::now();

    Ok::<_, ApiError>(Json(ApiResponse::with_message("User updated", user)))
}

pub async fn delete_user(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ManageUsers)?;

    if id == auth.actor.user_id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }

    let deleted = state.store.delete_user(&id).map_err(|e| match e {
        Error::ReferentialIntegrity => {
            ApiError::conflict("User still owns content and cannot be deleted")
        }
        e => store_error(e, "Failed to delete user"),
    })?;

    if !deleted {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!("User {id} deleted by {}", auth.actor.user_id);

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
