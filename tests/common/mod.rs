#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use chrono::{Duration, Utc};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use clubhouse::auth::{TokenIssuer, hash_password};
use clubhouse::config::ServerConfig;
use clubhouse::server::{AppState, create_router};
use clubhouse::store::{SqliteStore, Store};
use clubhouse::types::{Role, Staff, StaffCapabilities, User};

pub const SECRET: &[u8] = b"integration-test-signing-secret";
pub const PASSWORD: &str = "correct-horse-battery";
pub const BOUNDARY: &str = "clubhouse-test-boundary";

/// The router plus its backing state, rooted in a throwaway data directory.
pub struct TestApp {
    pub temp_dir: TempDir,
    pub state: Arc<AppState>,
    pub router: Router,
}

pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Response {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(configure: impl FnOnce(&mut ServerConfig)) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let mut config = ServerConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        configure(&mut config);

        let store = SqliteStore::new(config.db_path()).expect("open store");
        store.initialize().expect("create schema");

        let state = Arc::new(
            AppState::new(Arc::new(store), config, TokenIssuer::new(SECRET)).expect("build state"),
        );
        let router = create_router(state.clone());

        Self {
            temp_dir,
            state,
            router,
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.state.store.as_ref()
    }

    fn user(email: &str, role: Role, password_hash: String) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: email.split('@').next().unwrap_or(email).to_string(),
            password_hash,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn token_for(&self, user: &User) -> String {
        self.state
            .tokens
            .issue(&user.id, user.role, Duration::hours(1))
            .expect("issue token")
            .0
    }

    /// Seeds a non-staff user. The stored hash is unusable, so only
    /// [`TestApp::seed_with_password`] users can log in.
    pub fn seed(&self, role: Role, email: &str) -> (User, String) {
        assert_ne!(role, Role::Staff, "use seed_staff for staff users");
        let user = Self::user(email, role, "unusable".to_string());
        self.store().create_user(&user).expect("create user");
        let token = self.token_for(&user);
        (user, token)
    }

    pub fn seed_with_password(&self, role: Role, email: &str) -> User {
        let hash = hash_password(PASSWORD).expect("hash password");
        let user = Self::user(email, role, hash);
        self.store().create_user(&user).expect("create user");
        user
    }

    pub fn seed_staff(&self, email: &str, capabilities: StaffCapabilities) -> (User, Staff, String) {
        let user = Self::user(email, Role::Staff, "unusable".to_string());
        let now = Utc::now();
        let staff = Staff {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            title: Some("Physio".to_string()),
            capabilities,
            created_at: now,
            updated_at: now,
        };
        self.store()
            .create_staff_member(&user, &staff)
            .expect("create staff");
        let token = self.token_for(&user);
        (user, staff, token)
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body")
            .to_vec();
        Response {
            status,
            headers,
            body,
        }
    }

    pub async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        };
        self.send(request.expect("build request")).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> Response {
        self.call(Method::GET, uri, Some(token), None).await
    }

    /// Posts a multipart form with a single `file` part and the given text fields.
    pub async fn upload(
        &self,
        uri: &str,
        token: &str,
        file_name: &str,
        mime_type: &str,
        data: &[u8],
        fields: &[(&str, &str)],
    ) -> Response {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(file_name, mime_type, data, fields)))
            .expect("build request");
        self.send(request).await
    }
}

pub fn multipart_body(
    file_name: &str,
    mime_type: &str,
    data: &[u8],
    fields: &[(&str, &str)],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 1024);
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {mime_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}
