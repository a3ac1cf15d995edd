//! Rides, their lifecycle and the seat-capacity rules.
//!
//! A shared ride carries a fixed number of seats. The invariant
//! `0 <= seats_booked <= seats_available` is enforced here, by
//! [`Ride::reserve_seats`] and [`Ride::release_seats`]; storage backends call
//! these while holding an exclusive lock on the ride.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{RideError, Result};
use crate::{RideId, UserId};

// ============================================================================
// Enumerations
// ============================================================================

/// Kind of ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideType {
    /// Scheduled ride with seats other users can join.
    Shared,
    /// Immediate point-to-point ride for a single rider.
    OnDemand,
}

/// Status of a ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    /// Created, waiting for a driver.
    Pending,
    /// A driver accepted the ride.
    Accepted,
    /// The ride is under way.
    Started,
    /// The ride finished.
    Completed,
    /// The ride was called off.
    Cancelled,
}

/// How the rider intends to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash to the driver.
    Cash,
    /// Card on file.
    Card,
    /// In-app wallet.
    Wallet,
}

macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Wire and column representation.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = RideError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(RideError::validation(format!(
                        concat!("unknown ", stringify!($ty), ": {}"),
                        other
                    ))),
                }
            }
        }
    };
}

text_enum!(RideType { Shared => "shared", OnDemand => "on_demand" });
text_enum!(RideStatus {
    Pending => "pending",
    Accepted => "accepted",
    Started => "started",
    Completed => "completed",
    Cancelled => "cancelled",
});
text_enum!(PaymentMethod { Cash => "cash", Card => "card", Wallet => "wallet" });

impl RideStatus {
    /// Whether a ride may move from `self` to `to`.
    ///
    /// Allowed: pending→accepted, accepted→started, started→completed and
    /// pending/accepted→cancelled.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Accepted)
                | (Self::Accepted, Self::Started)
                | (Self::Started, Self::Completed)
                | (Self::Pending | Self::Accepted, Self::Cancelled)
        )
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

// ============================================================================
// Ride request
// ============================================================================

/// A point on the map with its street address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
    /// Human-readable address.
    pub address: String,
}

impl Place {
    fn validate(&self, which: &str) -> Result<()> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(RideError::validation(format!(
                "{which} latitude must be between -90 and 90"
            )));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(RideError::validation(format!(
                "{which} longitude must be between -180 and 180"
            )));
        }
        if self.address.trim().is_empty() {
            return Err(RideError::validation(format!("{which} address is required")));
        }
        Ok(())
    }
}

/// Everything a rider supplies when booking a ride.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideRequest {
    /// Shared or on-demand.
    pub ride_type: RideType,
    /// Where the ride starts.
    pub pickup: Place,
    /// Where the ride ends.
    pub dropoff: Place,
    /// Fare in cents.
    pub price_cents: i64,
    /// Route length in kilometres.
    pub distance_km: f64,
    /// Expected duration in minutes.
    pub duration_minutes: i32,
    /// Seats offered. Required for shared rides, ignored otherwise.
    #[serde(default)]
    pub seats_available: Option<i32>,
    /// Departure time. Required for shared rides, ignored otherwise.
    #[serde(default)]
    pub departure_time: Option<DateTime<Utc>>,
    /// Payment method.
    pub payment_method: PaymentMethod,
}

impl RideRequest {
    /// Check required and type-conditional fields.
    ///
    /// # Errors
    ///
    /// Returns [`RideError::Validation`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.pickup.validate("pickup")?;
        self.dropoff.validate("dropoff")?;

        if self.price_cents <= 0 {
            return Err(RideError::validation("price must be positive"));
        }
        if !self.distance_km.is_finite() || self.distance_km <= 0.0 {
            return Err(RideError::validation("distance must be positive"));
        }
        if self.duration_minutes <= 0 {
            return Err(RideError::validation("duration must be positive"));
        }

        if self.ride_type == RideType::Shared {
            match self.seats_available {
                Some(seats) if seats >= 1 => {}
                Some(_) => {
                    return Err(RideError::validation(
                        "shared rides must offer at least one seat",
                    ))
                }
                None => {
                    return Err(RideError::validation(
                        "seats_available is required for shared rides",
                    ))
                }
            }
            if self.departure_time.is_none() {
                return Err(RideError::validation(
                    "departure_time is required for shared rides",
                ));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Ride
// ============================================================================

/// A booked ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ride {
    /// Unique ride ID.
    pub id: RideId,
    /// Shared or on-demand.
    pub ride_type: RideType,
    /// The user who booked the ride.
    pub rider_id: UserId,
    /// The driver, once one accepted.
    pub driver_id: Option<UserId>,
    /// Pickup point.
    pub pickup: Place,
    /// Dropoff point.
    pub dropoff: Place,
    /// Current status.
    pub status: RideStatus,
    /// Fare in cents.
    pub price_cents: i64,
    /// Route length in kilometres.
    pub distance_km: f64,
    /// Expected duration in minutes.
    pub duration_minutes: i32,
    /// Seats offered (shared rides only, zero otherwise).
    pub seats_available: i32,
    /// Seats taken by passengers (shared rides only).
    pub seats_booked: i32,
    /// Departure time (shared rides only).
    pub departure_time: Option<DateTime<Utc>>,
    /// Payment method.
    pub payment_method: PaymentMethod,
    /// When the ride started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the ride completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the ride was created.
    pub created_at: DateTime<Utc>,
    /// When the ride last changed.
    pub updated_at: DateTime<Utc>,
}

/// Outcome of giving seats back to a ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeatRelease {
    /// Seats booked after the release.
    pub seats_booked: i32,
    /// The counter would have gone negative and was clamped to zero.
    pub clamped: bool,
}

impl Ride {
    /// Build a pending ride from a validated request.
    ///
    /// # Errors
    ///
    /// Returns [`RideError::Validation`] if the request is incomplete.
    pub fn from_request(rider_id: UserId, request: RideRequest) -> Result<Self> {
        request.validate()?;

        let (seats_available, departure_time) = match request.ride_type {
            RideType::Shared => (request.seats_available.unwrap_or(0), request.departure_time),
            RideType::OnDemand => (0, None),
        };

        let now = Utc::now();
        Ok(Self {
            id: RideId::generate(),
            ride_type: request.ride_type,
            rider_id,
            driver_id: None,
            pickup: request.pickup,
            dropoff: request.dropoff,
            status: RideStatus::Pending,
            price_cents: request.price_cents,
            distance_km: request.distance_km,
            duration_minutes: request.duration_minutes,
            seats_available,
            seats_booked: 0,
            departure_time,
            payment_method: request.payment_method,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Seats still free.
    #[must_use]
    pub fn seats_remaining(&self) -> i32 {
        (self.seats_available - self.seats_booked).max(0)
    }

    /// Whether a shared ride is still open for passengers.
    #[must_use]
    pub fn is_joinable(&self) -> bool {
        self.ride_type == RideType::Shared
            && self.status == RideStatus::Pending
            && self.seats_booked < self.seats_available
    }

    /// Book `seats` on this ride.
    ///
    /// # Errors
    ///
    /// - [`RideError::Validation`] if `seats` is less than one.
    /// - [`RideError::CapacityExceeded`] if the ride cannot hold them.
    pub fn reserve_seats(&mut self, seats: i32) -> Result<()> {
        if seats < 1 {
            return Err(RideError::validation("at least one seat must be requested"));
        }

        let booked = self.seats_booked.checked_add(seats);
        match booked {
            Some(total) if total <= self.seats_available => {
                self.seats_booked = total;
                self.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(RideError::CapacityExceeded {
                requested: seats,
                remaining: self.seats_remaining(),
            }),
        }
    }

    /// Give `seats` back to this ride, clamping the counter at zero.
    pub fn release_seats(&mut self, seats: i32) -> SeatRelease {
        let remaining = self.seats_booked - seats;
        let clamped = remaining < 0;
        self.seats_booked = remaining.max(0);
        self.updated_at = Utc::now();

        SeatRelease {
            seats_booked: self.seats_booked,
            clamped,
        }
    }

    /// Move the ride to `to`, stamping start and completion times.
    ///
    /// Acceptance needs a driver and only happens through [`Ride::accept`].
    ///
    /// # Errors
    ///
    /// - [`RideError::Validation`] if `to` is `accepted`.
    /// - [`RideError::InvalidTransition`] if the move is not allowed.
    pub fn transition_to(&mut self, to: RideStatus) -> Result<()> {
        if to == RideStatus::Accepted {
            return Err(RideError::validation(
                "a ride can only be accepted by assigning a driver",
            ));
        }
        self.apply_transition(to)
    }

    /// Accept a pending ride on behalf of `driver_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RideError::InvalidTransition`] unless the ride is pending.
    pub fn accept(&mut self, driver_id: UserId) -> Result<()> {
        self.apply_transition(RideStatus::Accepted)?;
        self.driver_id = Some(driver_id);
        Ok(())
    }

    fn apply_transition(&mut self, to: RideStatus) -> Result<()> {
        if !self.status.can_transition_to(to) {
            return Err(RideError::InvalidTransition {
                from: self.status,
                to,
            });
        }

        let now = Utc::now();
        match to {
            RideStatus::Started => self.started_at = Some(now),
            RideStatus::Completed => self.completed_at = Some(now),
            _ => {}
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }

    /// Whether `user` is the rider or the assigned driver.
    #[must_use]
    pub fn involves(&self, user: UserId) -> bool {
        self.rider_id == user || self.driver_id == Some(user)
    }
}
