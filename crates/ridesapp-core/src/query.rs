//! Ride listings and the expanded ride view returned by reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::passenger::PassengerDetails;
use crate::ride::{Ride, RideStatus, RideType};
use crate::user::UserProfile;
use crate::UserId;

/// Which rides a listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RideFilter {
    /// Rides booked by a rider, newest first.
    Rider(UserId),
    /// Rides assigned to a driver, newest first.
    Driver(UserId),
    /// Pending shared rides with at least one free seat, by departure.
    AvailableShared,
    /// Pending shared rides departing after the given instant, by departure.
    UpcomingShared {
        /// Cut-off; rides departing at or before it are excluded.
        after: DateTime<Utc>,
    },
}

impl RideFilter {
    /// Whether `ride` belongs in this listing.
    #[must_use]
    pub fn matches(&self, ride: &Ride) -> bool {
        match self {
            Self::Rider(rider) => ride.rider_id == *rider,
            Self::Driver(driver) => ride.driver_id == Some(*driver),
            Self::AvailableShared => ride.is_joinable(),
            Self::UpcomingShared { after } => {
                ride.ride_type == RideType::Shared
                    && ride.status == RideStatus::Pending
                    && ride.departure_time.is_some_and(|t| t > *after)
            }
        }
    }

    /// Ordering of rides in this listing.
    #[must_use]
    pub fn compare(&self, a: &Ride, b: &Ride) -> Ordering {
        match self {
            Self::Rider(_) | Self::Driver(_) => b
                .created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id)),
            Self::AvailableShared | Self::UpcomingShared { .. } => a
                .departure_time
                .cmp(&b.departure_time)
                .then_with(|| a.id.cmp(&b.id)),
        }
    }

    /// Filter and order a set of rides in memory.
    #[must_use]
    pub fn apply<'a, I>(&self, rides: I) -> Vec<Ride>
    where
        I: IntoIterator<Item = &'a Ride>,
    {
        let mut out: Vec<Ride> = rides
            .into_iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect();
        out.sort_by(|a, b| self.compare(a, b));
        out
    }
}

/// A ride with its participants expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideDetails {
    /// The ride.
    #[serde(flatten)]
    pub ride: Ride,
    /// The rider's profile.
    pub rider: Option<UserProfile>,
    /// The driver's profile, once assigned.
    pub driver: Option<UserProfile>,
    /// Passengers in join order.
    pub passengers: Vec<PassengerDetails>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ride::{PaymentMethod, Place, RideRequest};
    use chrono::Duration;

    fn shared(rider: UserId, seats: i32, departs_in: i64) -> Ride {
        let place = |address: &str| Place {
            lat: 10.0,
            lng: 20.0,
            address: address.into(),
        };
        Ride::from_request(
            rider,
            RideRequest {
                ride_type: RideType::Shared,
                pickup: place("north"),
                dropoff: place("south"),
                price_cents: 700,
                distance_km: 5.5,
                duration_minutes: 15,
                seats_available: Some(seats),
                departure_time: Some(Utc::now() + Duration::minutes(departs_in)),
                payment_method: PaymentMethod::Cash,
            },
        )
        .unwrap()
    }

    #[test]
    fn available_excludes_full_and_non_pending() {
        let rider = UserId::generate();
        let open = shared(rider, 2, 60);
        let mut full = shared(rider, 1, 30);
        full.reserve_seats(1).unwrap();
        let mut accepted = shared(rider, 2, 45);
        accepted.accept(UserId::generate()).unwrap();

        let listed = RideFilter::AvailableShared.apply([&open, &full, &accepted]);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, open.id);
    }

    #[test]
    fn upcoming_orders_by_departure() {
        let rider = UserId::generate();
        let later = shared(rider, 2, 120);
        let sooner = shared(rider, 2, 10);
        let past = shared(rider, 2, -10);

        let listed = RideFilter::UpcomingShared { after: Utc::now() }
            .apply([&later, &past, &sooner]);
        let ids: Vec<_> = listed.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![sooner.id, later.id]);
    }

    #[test]
    fn rider_listing_is_newest_first() {
        let rider = UserId::generate();
        let mut older = shared(rider, 1, 10);
        older.created_at -= Duration::minutes(5);
        let newer = shared(rider, 1, 10);
        let other = shared(UserId::generate(), 1, 10);

        let listed = RideFilter::Rider(rider).apply([&older, &other, &newer]);
        let ids: Vec<_> = listed.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[test]
    fn driver_listing_matches_assigned_driver() {
        let driver = UserId::generate();
        let mut ride = shared(UserId::generate(), 1, 10);
        assert!(!RideFilter::Driver(driver).matches(&ride));
        ride.accept(driver).unwrap();
        assert!(RideFilter::Driver(driver).matches(&ride));
    }
}
