//! Passenger reservations on shared rides.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{RideError, Result};
use crate::ride::{Ride, RideStatus};
use crate::user::UserProfile;
use crate::{PassengerId, RideId, UserId};

/// Status of a passenger reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassengerStatus {
    /// Seats held while the ride waits for a driver.
    Requested,
    /// The ride has a driver.
    Confirmed,
}

impl PassengerStatus {
    /// Wire and column representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Confirmed => "confirmed",
        }
    }

    /// Status a new passenger gets on a ride in `ride_status`.
    #[must_use]
    pub const fn for_ride(ride_status: RideStatus) -> Self {
        match ride_status {
            RideStatus::Pending => Self::Requested,
            _ => Self::Confirmed,
        }
    }
}

impl fmt::Display for PassengerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PassengerStatus {
    type Err = RideError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "requested" => Ok(Self::Requested),
            "confirmed" => Ok(Self::Confirmed),
            other => Err(RideError::validation(format!(
                "unknown passenger status: {other}"
            ))),
        }
    }
}

/// A user holding seats on a shared ride.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passenger {
    /// Unique reservation ID.
    pub id: PassengerId,
    /// The ride the seats are on.
    pub ride_id: RideId,
    /// The passenger.
    pub user_id: UserId,
    /// Seats held.
    pub seats: i32,
    /// Reservation status.
    pub status: PassengerStatus,
    /// When the passenger joined.
    pub created_at: DateTime<Utc>,
    /// When the reservation last changed.
    pub updated_at: DateTime<Utc>,
}

impl Passenger {
    /// Create a reservation for `seats` on `ride`.
    ///
    /// # Errors
    ///
    /// Returns [`RideError::Validation`] if `seats` is less than one.
    pub fn new(ride: &Ride, user_id: UserId, seats: i32) -> Result<Self> {
        if seats < 1 {
            return Err(RideError::validation("at least one seat must be requested"));
        }

        let now = Utc::now();
        Ok(Self {
            id: PassengerId::generate(),
            ride_id: ride.id,
            user_id,
            seats,
            status: PassengerStatus::for_ride(ride.status),
            created_at: now,
            updated_at: now,
        })
    }

    /// Mark the reservation confirmed.
    pub fn confirm(&mut self) {
        self.status = PassengerStatus::Confirmed;
        self.updated_at = Utc::now();
    }
}

/// A passenger together with the public profile of the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassengerDetails {
    /// The reservation.
    #[serde(flatten)]
    pub passenger: Passenger,
    /// The passenger's profile.
    pub user: UserProfile,
}
