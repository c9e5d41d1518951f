//! File access audit trail.
//!
//! Entries are append-only. Recording never fails the request that caused
//! it: store errors are logged and dropped.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use chrono::Utc;
use uuid::Uuid;

use crate::store::Store;
use crate::types::{FileAccessLog, FileAction, FileType};

const MAX_USER_AGENT_LEN: usize = 512;

/// Client details captured for the audit trail.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl<S: Send + Sync> FromRequestParts<S> for RequestMeta {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let ip = forwarded.or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });

        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .map(|ua| ua.chars().take(MAX_USER_AGENT_LEN).collect());

        Ok(RequestMeta { ip, user_agent })
    }
}

/// One file touched by a request.
pub struct FileRef<'a> {
    pub file_type: FileType,
    pub file_id: &'a str,
    pub file_name: &'a str,
}

/// Appends one access log row. Failures are logged, never returned.
pub fn record(
    store: &dyn Store,
    user_id: &str,
    file: FileRef<'_>,
    action: FileAction,
    meta: &RequestMeta,
) {
    let entry = FileAccessLog {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        file_type: file.file_type,
        file_id: file.file_id.to_string(),
        file_name: file.file_name.to_string(),
        action,
        ip: meta.ip.clone(),
        user_agent: meta.user_agent.clone(),
        created_at: Utc::now(),
    };

    if let Err(e) = store.create_access_log(&entry) {
        tracing::warn!(
            "Failed to record {} of {} {}: {e}",
            action.as_str(),
            file.file_type.as_str(),
            file.file_id
        );
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;
    use tempfile::TempDir;

    use super::*;
    use crate::store::SqliteStore;
    use crate::types::AccessLogFilter;

    #[tokio::test]
    async fn test_request_meta_prefers_forwarded_header() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .header(USER_AGENT, "clubhouse-test")
            .body(())
            .unwrap();
        let (mut parts, ()) = request.into_parts();

        let meta = RequestMeta::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(meta.ip.as_deref(), Some("203.0.113.9"));
        assert_eq!(meta.user_agent.as_deref(), Some("clubhouse-test"));
    }

    #[test]
    fn test_record_appends_row() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("audit.db")).unwrap();
        store.initialize().unwrap();

        let meta = RequestMeta {
            ip: Some("127.0.0.1".to_string()),
            user_agent: None,
        };
        let file = FileRef {
            file_type: FileType::Report,
            file_id: "r1",
            file_name: "match.pdf",
        };
        record(&store, "coach", file, FileAction::Download, &meta);

        let logs = store
            .list_access_logs(&AccessLogFilter::default(), 10, 0)
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, FileAction::Download);
        assert_eq!(logs[0].ip.as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn test_record_swallows_store_errors() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("audit.db")).unwrap();
        // Schema never created, so the insert fails.
        let file = FileRef {
            file_type: FileType::Avatar,
            file_id: "p1",
            file_name: "face.png",
        };
        record(&store, "coach", file, FileAction::View, &RequestMeta::default());
    }
}
