//! Session tokens.
//!
//! Tokens are HS256 JWTs signed with a per-installation secret stored next
//! to the database. The claims only carry the user id and role; staff
//! capabilities are re-read from the store on every request so that a
//! capability change takes effect without re-login.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Role;

const SECRET_BYTES: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Loads the signing secret from `path`.
    pub fn from_secret_file(path: &Path) -> Result<Self> {
        let encoded = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "cannot read signing secret {}: {e}",
                path.display()
            ))
        })?;
        let secret = hex::decode(encoded.trim())
            .map_err(|e| Error::Config(format!("malformed signing secret: {e}")))?;
        Ok(Self::new(&secret))
    }

    /// Issues a token for `user_id` valid for `ttl`. Returns the token and
    /// its expiry.
    pub fn issue(&self, user_id: &str, role: Role, ttl: Duration) -> Result<(String, DateTime<Utc>)> {
        let now = Utc::now();
        let expires_at = now + ttl;
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Crypto(format!("failed to sign token: {e}")))?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .unwrap_or(expires_at);
        Ok((token, expires_at))
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => Error::TokenExpired,
                _ => Error::InvalidToken,
            })
    }
}

/// Generates a new hex-encoded signing secret.
#[must_use]
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
