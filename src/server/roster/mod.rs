mod players;
mod staff;
mod teams;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, put},
};

use crate::server::AppState;

pub fn roster_router() -> Router<Arc<AppState>> {
    Router::new()
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        // Staff
        .route("/staff", get(staff::list_staff).post(staff::create_staff))
        .route(
            "/staff/{id}",
            get(staff::get_staff).delete(staff::delete_staff),
        )
        .route(
            "/staff/{id}/capabilities",
            put(staff::update_capabilities),
        )
        // Teams
        .route("/teams", get(teams::list_teams).post(teams::create_team))
        .route(
            "/teams/{id}",
            get(teams::get_team)
                .patch(teams::update_team)
                .delete(teams::delete_team),
        )
        // Players
        .route(
            "/players",
            get(players::list_players).post(players::create_player),
        )
        .route(
            "/players/{id}",
            get(players::get_player)
                .patch(players::update_player)
                .delete(players::delete_player),
        )
        .route(
            "/players/{id}/avatar",
            get(players::get_avatar).post(players::upload_avatar),
        )
        .route("/players/{id}/wellness", get(players::get_wellness))
}
