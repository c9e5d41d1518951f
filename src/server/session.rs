use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Duration;

use crate::auth::{RequireAuth, load_actor, verify_password};
use crate::server::AppState;
use crate::server::dto::{LoginRequest, LoginResponse, MeResponse};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::types::ActorKind;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub fn session_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let user = store
        .get_user_by_email(req.email.trim())
        .api_err("Failed to look up user")?
        .ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    let valid = verify_password(&req.password, &user.password_hash).unwrap_or_else(|e| {
        tracing::error!("Stored password hash for {} is unusable: {e}", user.id);
        false
    });
    if !valid {
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    // Staff without a staff record cannot act on anything; refuse the session.
    if load_actor(store, &user)
        .api_err("Failed to load staff record")?
        .is_none()
    {
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    let ttl = if req.remember_me {
        Duration::days(state.config.remember_me_days)
    } else {
        Duration::hours(state.config.token_ttl_hours)
    };

    let (token, expires_at) = state
        .tokens
        .issue(&user.id, user.role, ttl)
        .api_err("Failed to issue token")?;

    tracing::info!("User {} logged in", user.id);

    Ok::<_, ApiError>(Json(ApiResponse::with_message(
        "Logged in",
        LoginResponse {
            token,
            expires_at,
            user,
        },
    )))
}

pub async fn me(auth: RequireAuth, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let staff = match &auth.actor.kind {
        ActorKind::Staff { staff_id, .. } => state
            .store
            .get_staff(staff_id)
            .api_err("Failed to load staff record")?,
        _ => None,
    };

    Ok::<_, ApiError>(Json(ApiResponse::success(MeResponse {
        user: auth.user,
        staff,
    })))
}
