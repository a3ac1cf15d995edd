//! Registration and login handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use ridesapp_core::{normalize_email, DriverDetails, User, UserRole};

use crate::auth::issue_token;
use crate::crypto::{self, MIN_PASSWORD_LEN};
use crate::error::ApiError;
use crate::state::AppState;

/// Registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Login email.
    pub email: String,
    /// Plain-text password.
    pub password: String,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Contact phone number.
    #[serde(default)]
    pub phone: String,
    /// Rider or driver.
    pub role: UserRole,
    /// Vehicle details, for drivers.
    #[serde(flatten)]
    pub driver: DriverDetails,
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login email.
    pub email: String,
    /// Plain-text password.
    pub password: String,
}

/// Session response returned by register and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// The authenticated user.
    pub user: User,
}

/// Register a new user.
///
/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let email = normalize_email(&req.email);
    if !is_plausible_email(&email) {
        return Err(ApiError::BadRequest("a valid email is required".into()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash = hash_blocking(req.password).await?;

    let mut user = User::new(&email, password_hash, req.role);
    user.first_name = req.first_name.trim().to_string();
    user.last_name = req.last_name.trim().to_string();
    user.phone = req.phone.trim().to_string();
    if user.is_driver() {
        user.driver = req.driver;
    }

    state.store().insert_user(&user).await?;

    tracing::info!(user_id = %user.id, role = %user.role, "User registered");

    let token = issue_token(&user, &state.config)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

/// Log in with email and password.
///
/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = normalize_email(&req.email);
    let Some(user) = state.store().get_user_by_email(&email).await? else {
        tracing::debug!("Login for unknown email");
        return Err(ApiError::Unauthorized);
    };

    let hash = user.password_hash.clone();
    let password = req.password;
    let verified = tokio::task::spawn_blocking(move || crypto::verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("password check task failed: {e}")))?;
    if !verified {
        tracing::debug!(user_id = %user.id, "Login with wrong password");
        return Err(ApiError::Unauthorized);
    }

    tracing::info!(user_id = %user.id, "User logged in");

    let token = issue_token(&user, &state.config)?;
    Ok(Json(AuthResponse { token, user }))
}

async fn hash_blocking(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || crypto::hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("password hashing task failed: {e}")))?
}

fn is_plausible_email(email: &str) -> bool {
    email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(is_plausible_email("a@example.com"));
        assert!(!is_plausible_email("example.com"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("a@localhost"));
    }
}
