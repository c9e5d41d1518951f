use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::access::Action;
use crate::auth::RequireAuth;
use crate::server::AppState;
use crate::server::access::require;
use crate::server::dto::{AuditQuery, PurgeAuditQuery, PurgeAuditResponse};
use crate::server::response::{ApiError, ApiResponse, PagedResponse, StoreResultExt};
use crate::types::AccessLogFilter;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

pub fn audit_router() -> Router<Arc<AppState>> {
    Router::new().route("/audit", get(list_audit).delete(purge_audit))
}

/// Which end of the day a bare date stands for.
#[derive(Clone, Copy)]
enum DayEdge {
    Start,
    End,
}

/// Parses an RFC 3339 timestamp or a `YYYY-MM-DD` date.
fn parse_instant(value: &str, edge: DayEdge) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let time = match edge {
        DayEdge::Start => NaiveTime::MIN,
        DayEdge::End => NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999)?,
    };
    Some(date.and_time(time).and_utc())
}

fn parse_param(
    value: Option<&str>,
    name: &str,
    edge: DayEdge,
) -> Result<Option<DateTime<Utc>>, ApiError> {
    value
        .map(|v| {
            parse_instant(v, edge).ok_or_else(|| {
                ApiError::bad_request(format!(
                    "'{name}' must be an ISO date or RFC 3339 timestamp"
                ))
            })
        })
        .transpose()
}

pub async fn list_audit(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditQuery>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ViewAudit)?;

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = query.offset.unwrap_or(0);
    if offset < 0 {
        return Err(ApiError::bad_request("'offset' cannot be negative"));
    }

    let filter = AccessLogFilter {
        action: query.action,
        file_type: query.file_type,
        from: parse_param(query.from.as_deref(), "from", DayEdge::Start)?,
        to: parse_param(query.to.as_deref(), "to", DayEdge::End)?,
    };
    if let (Some(from), Some(to)) = (&filter.from, &filter.to) {
        if to < from {
            return Err(ApiError::bad_request("'to' must not be before 'from'"));
        }
    }

    let store = state.store.as_ref();
    let total = store
        .count_access_logs(&filter)
        .api_err("Failed to count audit entries")?;
    let entries = store
        .list_access_logs(&filter, limit, offset)
        .api_err("Failed to list audit entries")?;

    Ok::<_, ApiError>(Json(PagedResponse::new(entries, total, limit, offset)))
}

pub async fn purge_audit(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(query): Query<PurgeAuditQuery>,
) -> impl IntoResponse {
    require(&auth.actor, Action::ManageAudit)?;

    let cutoff = parse_param(query.older_than.as_deref(), "olderThan", DayEdge::Start)?
        .ok_or_else(|| ApiError::bad_request("'olderThan' is required"))?;

    let deleted = state
        .store
        .delete_access_logs_before(&cutoff)
        .api_err("Failed to purge audit entries")?;

    tracing::info!("Purged {} audit entries older than {}", deleted, cutoff);

    Ok::<_, ApiError>(Json(ApiResponse::with_message(
        "Audit entries purged",
        PurgeAuditResponse { deleted },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_rfc3339() {
        let ts = parse_instant("2026-03-01T10:30:00+02:00", DayEdge::Start).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_date_edges() {
        let start = parse_instant("2026-03-01", DayEdge::Start).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap());

        let end = parse_instant("2026-03-01", DayEdge::End).unwrap();
        assert!(end > Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 59).unwrap());
        assert!(end < Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_instant("yesterday", DayEdge::Start).is_none());
        assert!(parse_instant("2026-13-01", DayEdge::Start).is_none());
        assert!(parse_param(Some("nope"), "from", DayEdge::Start).is_err());
        assert!(parse_param(None, "from", DayEdge::Start).unwrap().is_none());
    }
}
