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
use crate::auth::RequireAuth;
use crate::server::AppState;
use crate::server::access::require;
use crate::server::dto::{CreateTeamRequest, UpdateTeamRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_name;
use crate::types::Team;

pub async fn list_teams(_auth: RequireAuth, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let teams = state.store.list_teams().api_err("Failed to list teams")?;
    Ok::<_, ApiError>(Json(ApiResponse::success(teams)))
}

pub async fn create_team(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTeamRequest>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ManageTeams)?;
    let store = state.store.as_ref();

    let name = req.name.trim().to_string();
    validate_name(&name, "Team")?;

    if store
        .get_team_by_name(&name)
        .api_err("Failed to check team")?
        .is_some()
    {
        return Err(ApiError::conflict("Team already exists"));
    }

    let now = Utc::now();
    let team = Team {
        id: Uuid::new_v4().to_string(),
        name,
        description: req.description,
        created_at: now,
        updated_at: now,
    };

    store.create_team(&team).api_err("Failed to create team")?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Team created", team)),
    ))
}

pub async fn get_team(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let team = state
        .store
        .get_team(&id)
        .api_err("Failed to get team")?
        .or_not_found("Team not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(team)))
}

pub async fn update_team(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTeamRequest>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ManageTeams)?;
    let store = state.store.as_ref();

    let mut team = store
        .get_team(&id)
        .api_err("Failed to get team")?
        .or_not_found("Team not found")?;

    if let Some(name) = req.name {
        let name = name.trim().to_string();
        validate_name(&name, "Team")?;
        if let Some(existing) = store.get_team_by_name(&name).api_err("Failed to check team")? {
            if existing.id != team.id {
                return Err(ApiError::conflict("Team already exists"));
            }
        }
        team.name = name;
    }

    if let Some(description) = req.description {
        team.description = Some(description);
    }

    store.update_team(&team).api_err("Failed to update team")?;
    team.updated_at = Utc::now();

    Ok::<_, ApiError>(Json(ApiResponse::with_message("Team updated", team)))
}

/// Players and events of the team are kept and lose their team link.
pub async fn delete_team(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ManageTeams)?;

    if !state
        .store
        .delete_team(&id)
        .api_err("Failed to delete team")?
    {
        return Err(ApiError::not_found("Team not found"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
