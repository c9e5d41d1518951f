use std::sync::Arc;

use super::Claims;
use crate::error::{Error, Result};
use crate::server::AppState;
use crate::store::Store;
use crate::types::{Actor, ActorKind, Role, User};

#[derive(Debug)]
pub enum TokenValidationError {
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    InternalError,
}

/// Extracts a bearer token from the Authorization header.
/// Returns None if no auth header is present.
/// Returns Err if the auth scheme is unsupported.
pub fn extract_bearer_token(
    auth_header: Option<&str>,
) -> std::result::Result<Option<&str>, TokenValidationError> {
    match auth_header {
        Some(header) => match header.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(Some(token.trim())),
            Some(_) => Err(TokenValidationError::InvalidToken),
            None => Err(TokenValidationError::InvalidScheme),
        },
        None => Ok(None),
    }
}

/// Builds the request actor for a stored user. Staff users carry their
/// staff id and current capability flags; a staff user with no staff row
/// yields `None`.
pub fn load_actor(store: &dyn Store, user: &User) -> Result<Option<Actor>> {
    let kind = match user.role {
        Role::Admin => ActorKind::Admin,
        Role::Coach => ActorKind::Coach,
        Role::Player => ActorKind::Player,
        Role::Staff => match store.get_staff_by_user(&user.id)? {
            Some(staff) => ActorKind::Staff {
                staff_id: staff.id,
                capabilities: staff.capabilities,
            },
            None => return Ok(None),
        },
    };

    Ok(Some(Actor {
        user_id: user.id.clone(),
        kind,
    }))
}

/// Validates a raw token and resolves the user and actor behind it.
pub fn validate_token(
    state: &Arc<AppState>,
    raw_token: &str,
) -> std::result::Result<(User, Actor), TokenValidationError> {
    let claims: Claims = state.tokens.verify(raw_token).map_err(|e| match e {
        Error::TokenExpired => TokenValidationError::TokenExpired,
        _ => TokenValidationError::InvalidToken,
    })?;

    let user = state
        .store
        .get_user(&claims.sub)
        .map_err(|e| {
            tracing::error!("Failed to load user for token: {e}");
            TokenValidationError::InternalError
        })?
        .ok_or(TokenValidationError::InvalidToken)?;

    // A role change invalidates outstanding tokens.
    if user.role != claims.role {
        return Err(TokenValidationError::InvalidToken);
    }

    let actor = load_actor(state.store.as_ref(), &user)
        .map_err(|e| {
            tracing::error!("Failed to load staff record: {e}");
            TokenValidationError::InternalError
        })?
        .ok_or_else(|| {
            tracing::warn!("Staff user {} has no staff record", user.id);
            TokenValidationError::InvalidToken
        })?;

    Ok((user, actor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer_token() {
        assert!(matches!(extract_bearer_token(None), Ok(None)));
        assert!(matches!(
            extract_bearer_token(Some("Bearer abc.def.ghi")),
            Ok(Some("abc.def.ghi"))
        ));
        assert!(matches!(
            extract_bearer_token(Some("Basic dXNlcjpwYXNz")),
            Err(TokenValidationError::InvalidScheme)
        ));
        assert!(matches!(
            extract_bearer_token(Some("Bearer   ")),
            Err(TokenValidationError::InvalidToken)
        ));
    }
}
