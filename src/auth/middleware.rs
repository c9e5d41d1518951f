use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header::AUTHORIZATION, header::WWW_AUTHENTICATE, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::helpers::{TokenValidationError, extract_bearer_token, validate_token};
use crate::server::AppState;
use crate::types::{Actor, User};

/// Extractor that requires a valid session token.
pub struct RequireAuth {
    pub user: User,
    pub actor: Actor,
}

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let error = if status == StatusCode::UNAUTHORIZED {
            "unauthorized"
        } else {
            "internal_error"
        };
        let body = json!({ "message": message, "error": error });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"clubhouse\""),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let raw_token = extract_bearer_token(auth_header)
            .map_err(AuthError::from)?
            .ok_or(AuthError::MissingAuth)?;

        let (user, actor) = validate_token(state, raw_token).map_err(AuthError::from)?;

        Ok(RequireAuth { user, actor })
    }
}

impl From<TokenValidationError> for AuthError {
    fn from(e: TokenValidationError) -> Self {
        match e {
            TokenValidationError::InvalidScheme => AuthError::InvalidScheme,
            TokenValidationError::InvalidToken => AuthError::InvalidToken,
            TokenValidationError::TokenExpired => AuthError::TokenExpired,
            TokenValidationError::InternalError => AuthError::InternalError,
        }
    }
}
