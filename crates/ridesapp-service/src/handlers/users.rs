//! Profile handlers for the signed-in user.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use ridesapp_core::User;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Profile update request. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Contact phone number.
    pub phone: Option<String>,
    /// URL of the profile picture.
    pub profile_picture: Option<String>,
    /// Driving licence number (drivers only).
    pub license_number: Option<String>,
    /// Vehicle make and model (drivers only).
    pub vehicle_model: Option<String>,
    /// Vehicle colour (drivers only).
    pub vehicle_color: Option<String>,
    /// Licence plate (drivers only).
    pub vehicle_plate: Option<String>,
}

impl UpdateProfileRequest {
    fn apply(self, user: &mut User) -> Result<(), ApiError> {
        let touches_vehicle = self.license_number.is_some()
            || self.vehicle_model.is_some()
            || self.vehicle_color.is_some()
            || self.vehicle_plate.is_some();
        if touches_vehicle && !user.is_driver() {
            return Err(ApiError::BadRequest(
                "vehicle details can only be set by drivers".into(),
            ));
        }

        if let Some(v) = self.first_name {
            user.first_name = v.trim().to_string();
        }
        if let Some(v) = self.last_name {
            user.last_name = v.trim().to_string();
        }
        if let Some(v) = self.phone {
            user.phone = v.trim().to_string();
        }
        if let Some(v) = self.profile_picture {
            user.profile_picture = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Some(v) = self.license_number {
            user.driver.license_number = Some(v);
        }
        if let Some(v) = self.vehicle_model {
            user.driver.vehicle_model = Some(v);
        }
        if let Some(v) = self.vehicle_color {
            user.driver.vehicle_color = Some(v);
        }
        if let Some(v) = self.vehicle_plate {
            user.driver.vehicle_plate = Some(v);
        }
        user.updated_at = Utc::now();
        Ok(())
    }
}

/// Get the current user's profile.
///
/// GET /api/v1/users/me
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<User>, ApiError> {
    let user = load(&state, &auth).await?;
    Ok(Json(user))
}

/// Update the current user's profile.
///
/// PUT /api/v1/users/me
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    let mut user = load(&state, &auth).await?;
    req.apply(&mut user)?;
    state.store().update_user(&user).await?;

    tracing::info!(user_id = %user.id, "Profile updated");
    Ok(Json(user))
}

async fn load(state: &AppState, auth: &AuthUser) -> Result<User, ApiError> {
    state
        .store()
        .get_user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user not found: {}", auth.user_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridesapp_core::UserRole;

    #[test]
    fn riders_cannot_set_vehicle_details() {
        let mut rider = User::new("r@example.com", "h".into(), UserRole::Rider);
        let req = UpdateProfileRequest {
            vehicle_plate: Some("ABC-123".into()),
            ..UpdateProfileRequest::default()
        };
        assert!(matches!(req.apply(&mut rider), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn only_present_fields_change() {
        let mut driver = User::new("d@example.com", "h".into(), UserRole::Driver);
        driver.last_name = "Keep".into();
        let req = UpdateProfileRequest {
            first_name: Some("  Ana ".into()),
            vehicle_model: Some("Corolla".into()),
            ..UpdateProfileRequest::default()
        };
        req.apply(&mut driver).unwrap();
        assert_eq!(driver.first_name, "Ana");
        assert_eq!(driver.last_name, "Keep");
        assert_eq!(driver.driver.vehicle_model.as_deref(), Some("Corolla"));
    }
}
