//! Users: riders and drivers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{RideError, Result};
use crate::UserId;

/// Default rating assigned to a new user.
pub const DEFAULT_USER_RATING: f64 = 5.0;

/// Role a user registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Books rides and joins shared rides.
    Rider,
    /// Accepts and drives rides.
    Driver,
}

impl UserRole {
    /// Wire and column representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Rider => "rider",
            Self::Driver => "driver",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = RideError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rider" => Ok(Self::Rider),
            "driver" => Ok(Self::Driver),
            other => Err(RideError::validation(format!("unknown role: {other}"))),
        }
    }
}

/// Vehicle and licence details kept for drivers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverDetails {
    /// Driving licence number.
    pub license_number: Option<String>,
    /// Vehicle make and model.
    pub vehicle_model: Option<String>,
    /// Vehicle colour.
    pub vehicle_color: Option<String>,
    /// Licence plate.
    pub vehicle_plate: Option<String>,
}

/// A registered user.
///
/// The password hash is an argon2 PHC string and is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,

    /// Login email, stored lower-cased.
    pub email: String,

    /// Password hash in PHC format.
    #[serde(skip)]
    pub password_hash: String,

    /// Given name.
    pub first_name: String,

    /// Family name.
    pub last_name: String,

    /// Contact phone number.
    pub phone: String,

    /// Rider or driver.
    pub role: UserRole,

    /// URL of the profile picture.
    pub profile_picture: Option<String>,

    /// Average rating.
    pub rating: f64,

    /// Whether the user has been verified.
    pub is_verified: bool,

    /// Driver-only details.
    #[serde(flatten)]
    pub driver: DriverDetails,

    /// When the user registered.
    pub created_at: DateTime<Utc>,

    /// When the profile last changed.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new, unverified user.
    #[must_use]
    pub fn new(email: &str, password_hash: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::generate(),
            email: normalize_email(email),
            password_hash,
            first_name: String::new(),
            last_name: String::new(),
            phone: String::new(),
            role,
            profile_picture: None,
            rating: DEFAULT_USER_RATING,
            is_verified: false,
            driver: DriverDetails::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the user registered as a driver.
    #[must_use]
    pub fn is_driver(&self) -> bool {
        self.role == UserRole::Driver
    }

    /// Public projection of this user.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile::from(self)
    }
}

/// Public profile fields exposed when a user appears inside another record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User ID.
    pub id: UserId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Rider or driver.
    pub role: UserRole,
    /// URL of the profile picture.
    pub profile_picture: Option<String>,
    /// Average rating.
    pub rating: f64,
    /// Whether the user has been verified.
    pub is_verified: bool,
    /// Vehicle model, for drivers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_model: Option<String>,
    /// Vehicle colour, for drivers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_color: Option<String>,
    /// Licence plate, for drivers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_plate: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            profile_picture: user.profile_picture.clone(),
            rating: user.rating,
            is_verified: user.is_verified,
            vehicle_model: user.driver.vehicle_model.clone(),
            vehicle_color: user.driver.vehicle_color.clone(),
            vehicle_plate: user.driver.vehicle_plate.clone(),
        }
    }
}

/// Lower-case and trim an email address for storage and lookup.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_defaults() {
        let user = User::new("  Ada@Example.COM ", "hash".into(), UserRole::Rider);
        assert_eq!(user.email, "ada@example.com");
        assert!((user.rating - DEFAULT_USER_RATING).abs() < f64::EPSILON);
        assert!(!user.is_verified);
        assert!(!user.is_driver());
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let user = User::new("a@b.c", "secret-hash".into(), UserRole::Driver);
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("\"role\":\"driver\""));
    }

    #[test]
    fn role_parses_known_values_only() {
        assert_eq!("driver".parse::<UserRole>().unwrap(), UserRole::Driver);
        assert!("admin".parse::<UserRole>().is_err());
    }
}
