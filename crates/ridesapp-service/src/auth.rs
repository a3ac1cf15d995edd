//! Session tokens and the authenticated-user extractor.
//!
//! Tokens are HS256 JWTs signed with the configured secret. The subject is
//! the user ID; email and role ride along so handlers can authorize without
//! a store lookup.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use ridesapp_core::{User, UserId, UserRole};

use crate::config::ServiceConfig;
use crate::error::ApiError;
use crate::state::AppState;

/// JWT claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: String,
    /// Email at the time of login.
    pub email: String,
    /// Role at the time of login.
    pub role: UserRole,
    /// Expiry (seconds since the epoch).
    pub exp: i64,
    /// Issued at (seconds since the epoch).
    pub iat: i64,
}

/// Sign a session token for `user`.
///
/// # Errors
///
/// Returns `ApiError::Internal` if signing fails.
pub fn issue_token(user: &User, config: &ServiceConfig) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: user.role,
        exp: (now + Duration::hours(config.jwt_expiration_hours)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
}

/// Validate a session token and return its claims.
///
/// # Errors
///
/// Returns `ApiError::Unauthorized` if the signature, algorithm or expiry
/// check fails.
pub fn decode_token(token: &str, config: &ServiceConfig) -> Result<Claims, ApiError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!(error = %e, "Rejected session token");
        ApiError::Unauthorized
    })
}

/// An authenticated user extracted from a bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user ID.
    pub user_id: UserId,
    /// The email claim.
    pub email: String,
    /// The role claim.
    pub role: UserRole,
}

impl AuthUser {
    /// Whether the token belongs to a driver.
    #[must_use]
    pub fn is_driver(&self) -> bool {
        self.role == UserRole::Driver
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        let claims = decode_token(token, &state.config)?;
        let user_id = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| ApiError::Unauthorized)?;

        Ok(AuthUser {
            user_id,
            email: claims.email,
            role: claims.role,
        })
    }
}
