//! Ride lifecycle manager.

use std::sync::Arc;

use ridesapp_core::{Result, Ride, RideError, RideId, RideRequest, RideStatus, UserId};
use ridesapp_store::{RideChange, Store};

/// Creates rides and moves them through their statuses.
#[derive(Clone)]
pub struct RideLifecycleManager {
    store: Arc<dyn Store>,
}

impl RideLifecycleManager {
    /// Create a manager over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Book a new ride for `rider`.
    ///
    /// # Errors
    ///
    /// - [`RideError::Validation`] if the request is incomplete or out of range.
    /// - [`RideError::NotFound`] if the rider doesn't exist.
    pub async fn create_ride(&self, rider: UserId, request: RideRequest) -> Result<Ride> {
        let ride = Ride::from_request(rider, request)?;

        if self.store.get_user(rider).await?.is_none() {
            return Err(RideError::not_found("user", rider));
        }
        self.store.insert_ride(&ride).await?;

        tracing::info!(
            ride_id = %ride.id,
            rider_id = %rider,
            ride_type = %ride.ride_type,
            seats_available = ride.seats_available,
            "Ride created"
        );

        Ok(ride)
    }

    /// Move a ride to `status`. Acceptance goes through
    /// [`accept_ride`](Self::accept_ride) instead.
    ///
    /// # Errors
    ///
    /// - [`RideError::NotFound`] if the ride doesn't exist.
    /// - [`RideError::Validation`] if `status` is `accepted`.
    /// - [`RideError::InvalidTransition`] if the move is not allowed.
    pub async fn update_status(&self, ride: RideId, status: RideStatus) -> Result<Ride> {
        let updated = self
            .store
            .update_ride(ride, RideChange::Status(status))
            .await?;

        tracing::info!(ride_id = %ride, status = %updated.status, "Ride status updated");
        Ok(updated)
    }

    /// Assign `driver` to a pending ride and mark it accepted.
    ///
    /// # Errors
    ///
    /// - [`RideError::NotFound`] if the ride or driver doesn't exist.
    /// - [`RideError::Validation`] if the user is not a driver.
    /// - [`RideError::InvalidTransition`] if the ride is not pending.
    pub async fn accept_ride(&self, ride: RideId, driver: UserId) -> Result<Ride> {
        let user = self
            .store
            .get_user(driver)
            .await?
            .ok_or_else(|| RideError::not_found("user", driver))?;
        if !user.is_driver() {
            return Err(RideError::validation("only drivers can accept rides"));
        }

        let updated = self
            .store
            .update_ride(ride, RideChange::Accept { driver })
            .await?;

        tracing::info!(ride_id = %ride, driver_id = %driver, "Ride accepted");
        Ok(updated)
    }
}
