//! Read-only ride queries.
//!
//! Every listing returns [`RideDetails`]: the ride with its rider, driver and
//! passengers expanded. Passengers and profiles for a whole listing are
//! each fetched in one batch.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use ridesapp_core::{
    Passenger, PassengerDetails, Result, Ride, RideDetails, RideError, RideFilter, RideId,
    UserId, UserProfile,
};
use ridesapp_store::Store;

use crate::profiles;

/// Looks up single rides and ride listings.
#[derive(Clone)]
pub struct RideQueries {
    store: Arc<dyn Store>,
}

impl RideQueries {
    /// Create a query layer over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// A single ride with its participants.
    ///
    /// # Errors
    ///
    /// Returns [`RideError::NotFound`] if the ride doesn't exist.
    pub async fn ride_by_id(&self, id: RideId) -> Result<RideDetails> {
        let ride = self
            .store
            .get_ride(id)
            .await?
            .ok_or_else(|| RideError::not_found("ride", id))?;

        self.expand(vec![ride])
            .await?
            .pop()
            .ok_or_else(|| RideError::not_found("ride", id))
    }

    /// Rides booked by `rider`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`RideError::Storage`] if the store fails.
    pub async fn rides_by_rider(&self, rider: UserId) -> Result<Vec<RideDetails>> {
        self.list(RideFilter::Rider(rider)).await
    }

    /// Rides assigned to `driver`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`RideError::Storage`] if the store fails.
    pub async fn rides_by_driver(&self, driver: UserId) -> Result<Vec<RideDetails>> {
        self.list(RideFilter::Driver(driver)).await
    }

    /// Pending shared rides with at least one free seat, by departure.
    ///
    /// # Errors
    ///
    /// Returns [`RideError::Storage`] if the store fails.
    pub async fn available_shared_rides(&self) -> Result<Vec<RideDetails>> {
        self.list(RideFilter::AvailableShared).await
    }

    /// Pending shared rides that have not departed yet, by departure.
    ///
    /// # Errors
    ///
    /// Returns [`RideError::Storage`] if the store fails.
    pub async fn upcoming_shared_rides(&self) -> Result<Vec<RideDetails>> {
        self.list(RideFilter::UpcomingShared { after: Utc::now() })
            .await
    }

    async fn list(&self, filter: RideFilter) -> Result<Vec<RideDetails>> {
        let rides = self.store.list_rides(&filter).await?;
        self.expand(rides).await
    }

    async fn expand(&self, rides: Vec<Ride>) -> Result<Vec<RideDetails>> {
        if rides.is_empty() {
            return Ok(Vec::new());
        }

        let ride_ids: Vec<RideId> = rides.iter().map(|r| r.id).collect();
        let mut passengers: HashMap<RideId, Vec<Passenger>> = HashMap::new();
        for passenger in self.store.list_passengers_for(&ride_ids).await? {
            passengers.entry(passenger.ride_id).or_default().push(passenger);
        }

        let mut ids: Vec<UserId> = Vec::new();
        for ride in &rides {
            ids.push(ride.rider_id);
            ids.extend(ride.driver_id);
        }
        ids.extend(passengers.values().flatten().map(|p| p.user_id));

        let profiles = profiles(self.store.as_ref(), &ids).await?;

        Ok(rides
            .into_iter()
            .map(|ride| {
                let riders = passengers.remove(&ride.id).unwrap_or_default();
                assemble(ride, riders, &profiles)
            })
            .collect())
    }
}

fn assemble(
    ride: Ride,
    passengers: Vec<Passenger>,
    profiles: &HashMap<UserId, UserProfile>,
) -> RideDetails {
    let rider = profiles.get(&ride.rider_id).cloned();
    let driver = ride.driver_id.and_then(|d| profiles.get(&d).cloned());
    let passengers = passengers
        .into_iter()
        .filter_map(|passenger| {
            let user = profiles.get(&passenger.user_id)?.clone();
            Some(PassengerDetails { passenger, user })
        })
        .collect();

    RideDetails {
        ride,
        rider,
        driver,
        passengers,
    }
}
