use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::access::Action;
use crate::auth::RequireAuth;
use crate::server::AppState;
use crate::server::access::require;
use crate::server::dto::{CreateEventRequest, ListEventsParams, UpdateEventRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{validate_team_ref, validate_title};
use crate::store::EventFilter;
use crate::types::Event;

pub fn calendar_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/{id}",
            get(get_event).patch(update_event).delete(delete_event),
        )
}

fn check_range(starts_at: &DateTime<Utc>, ends_at: &DateTime<Utc>) -> Result<(), ApiError> {
    if ends_at < starts_at {
        return Err(ApiError::bad_request("Event cannot end before it starts"));
    }
    Ok(())
}

pub async fn list_events(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListEventsParams>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ViewCalendar)?;

    if let (Some(from), Some(to)) = (&params.from, &params.to) {
        if to < from {
            return Err(ApiError::bad_request("'to' must not be before 'from'"));
        }
    }

    let events = state
        .store
        .list_events(&EventFilter {
            from: params.from,
            to: params.to,
            team_id: params.team_id,
        })
        .api_err("Failed to list events")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(events)))
}

pub async fn create_event(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateEventRequest>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ManageEvents)?;
    let store = state.store.as_ref();

    validate_title(&req.title)?;
    check_range(&req.starts_at, &req.ends_at)?;
    validate_team_ref(store, req.team_id.as_deref())?;

    let now = Utc::now();
    let event = Event {
        id: Uuid::new_v4().to_string(),
        title: req.title.trim().to_string(),
        description: req.description,
        kind: req.kind,
        location: req.location,
        starts_at: req.starts_at,
        ends_at: req.ends_at,
        team_id: req.team_id,
        created_by: auth.actor.user_id.clone(),
        created_at: now,
        updated_at: now,
    };

    store.create_event(&event).api_err("Failed to create event")?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Event created", event)),
    ))
}

pub async fn get_event(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ViewCalendar)?;

    let event = state
        .store
        .get_event(&id)
        .api_err("Failed to get event")?
        .or_not_found("Event not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(event)))
}

pub async fn update_event(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateEventRequest>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ManageEvents)?;
    let store = state.store.as_ref();

    let mut event = store
        .get_event(&id)
        .api_err("Failed to get event")?
        .or_not_found("Event not found")?;

    if let Some(title) = req.title {
        validate_title(&title)?;
        event.title = title.trim().to_string();
    }
    if req.description.is_some() {
        event.description = req.description;
    }
    if let Some(kind) = req.kind {
        event.kind = kind;
    }
    if req.location.is_some() {
        event.location = req.location;
    }
    if let Some(starts_at) = req.starts_at {
        event.starts_at = starts_at;
    }
    if let Some(ends_at) = req.ends_at {
        event.ends_at = ends_at;
    }
    check_range(&event.starts_at, &event.ends_at)?;
    if req.team_id.is_some() {
        validate_team_ref(store, req.team_id.as_deref())?;
        event.team_id = req.team_id;
    }

    store.update_event(&event).api_err("Failed to update event")?;
    event.updated_at = Utc::now();

    Ok::<_, ApiError>(Json(ApiResponse::with_message("Event updated", event)))
}

pub async fn delete_event(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ManageEvents)?;

    if !state
        .store
        .delete_event(&id)
        .api_err("Failed to delete event")?
    {
        return Err(ApiError::not_found("Event not found"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
