use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};
use tower::ServiceBuilder;

use super::audit::audit_router;
use super::calendar::calendar_router;
use super::library::library_router;
use super::roster::roster_router;
use super::session::session_router;
use crate::auth::TokenIssuer;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::store::Store;
use crate::uploads::UploadStorage;
use crate::wellness::WellnessClient;

/// Headroom on top of the file limit for multipart boundaries and text fields.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: TokenIssuer,
    pub uploads: UploadStorage,
    pub wellness: WellnessClient,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: ServerConfig, tokens: TokenIssuer) -> Result<Self> {
        Ok(Self {
            store,
            tokens,
            uploads: UploadStorage::new(&config.data_dir, config.max_upload_bytes),
            wellness: WellnessClient::new(config.wellness_base_url.clone())?,
            config,
        })
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.uploads.max_bytes() + MULTIPART_OVERHEAD;

    let api = Router::new()
        .merge(session_router())
        .merge(roster_router())
        .merge(calendar_router())
        .merge(library_router())
        .merge(audit_router());

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(log_request))
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}
