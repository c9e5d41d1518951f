use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::error::{Error, Result as StoreResult};

/// Standard API response wrapper: `{message, data}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    #[must_use]
    pub fn success(data: T) -> Self {
        Self::with_message("OK", data)
    }

    #[must_use]
    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

/// Offset-paginated response for the audit log.
#[derive(Debug, Serialize)]
pub struct PagedResponse<T: Serialize> {
    pub message: String,
    pub data: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl<T: Serialize> PagedResponse<T> {
    #[must_use]
    pub fn new(data: Vec<T>, total: i64, limit: i64, offset: i64) -> Self {
        Self {
            message: "OK".to_string(),
            data,
            total,
            limit,
            offset,
        }
    }
}

/// API error that converts to a proper HTTP response
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    #[must_use]
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, message)
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    fn error_code(&self) -> &'static str {
        match self.status {
            StatusCode::BAD_REQUEST => "bad_request",
            StatusCode::UNAUTHORIZED => "unauthorized",
            StatusCode::FORBIDDEN => "forbidden",
            StatusCode::NOT_FOUND => "not_found",
            StatusCode::CONFLICT => "conflict",
            StatusCode::PAYLOAD_TOO_LARGE => "payload_too_large",
            s if s.is_client_error() => "client_error",
            _ => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "message": self.message, "error": self.error_code() });
        let mut response = (self.status, Json(body)).into_response();

        if self.status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer realm=\"clubhouse\""),
            );
        }

        response
    }
}

/// Maps a library error to a response. `context` is only used (and logged)
/// for errors that surface as 500.
pub fn store_error(e: Error, context: &'static str) -> ApiError {
    match e {
        Error::NotFound => ApiError::not_found("Not found"),
        Error::AlreadyExists => ApiError::conflict("Resource already exists"),
        Error::ReferentialIntegrity => ApiError::bad_request("Referenced record does not exist"),
        Error::BadRequest(message) => ApiError::bad_request(message),
        Error::PayloadTooLarge(message) => ApiError::payload_too_large(message),
        Error::InvalidToken | Error::TokenExpired => {
            ApiError::unauthorized("Authentication required")
        }
        e => {
            tracing::error!("{context}: {e}");
            ApiError::internal(context)
        }
    }
}

/// Extension trait for converting store results to API errors with a custom message.
pub trait StoreResultExt<T> {
    fn api_err(self, message: &'static str) -> Result<T, ApiError>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn api_err(self, message: &'static str) -> Result<T, ApiError> {
        self.map_err(|e| store_error(e, message))
    }
}

/// Extension for Option types from store operations.
pub trait StoreOptionExt<T> {
    fn or_not_found(self, message: &'static str) -> Result<T, ApiError>;
}

impl<T> StoreOptionExt<T> for Option<T> {
    fn or_not_found(self, message: &'static str) -> Result<T, ApiError> {
        self.ok_or_else(|| ApiError::not_found(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_statuses() {
        let cases = [
            (Error::NotFound, StatusCode::NOT_FOUND),
            (Error::AlreadyExists, StatusCode::CONFLICT),
            (Error::ReferentialIntegrity, StatusCode::BAD_REQUEST),
            (
                Error::PayloadTooLarge("big".to_string()),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                Error::Config("broken".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(store_error(error, "Failed").status, status);
        }
    }

    #[test]
    fn test_internal_errors_are_opaque() {
        let error = store_error(
            Error::Config("secret path /etc/x".to_string()),
            "Failed to load team",
        );
        assert_eq!(error.message, "Failed to load team");
    }

    #[test]
    fn test_unauthorized_sets_challenge_header() {
        let response = ApiError::unauthorized("Invalid email or password").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key("www-authenticate"));
    }
}
