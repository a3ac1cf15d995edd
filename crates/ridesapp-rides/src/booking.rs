//! Seat booking engine.
//!
//! Joining and leaving shared rides. The capacity check and the write happen
//! inside one store operation under the ride's lock; this layer validates
//! input, retries transaction conflicts a bounded number of times and logs.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ridesapp_core::{PassengerDetails, PassengerId, Result, RideError, RideId, UserId};
use ridesapp_store::{Booking, LeaveOutcome, Store, StoreError};

use crate::profiles;

/// Number of attempts for a seat operation that keeps hitting conflicts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Backoff step between attempts; attempt `n` waits `n` steps.
pub const DEFAULT_BACKOFF_STEP_MS: u64 = 20;

/// How seat operations retry transaction conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Linear backoff step.
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_step: Duration::from_millis(DEFAULT_BACKOFF_STEP_MS),
        }
    }
}

/// Books and releases seats on shared rides.
#[derive(Clone)]
pub struct SeatBookingEngine {
    store: Arc<dyn Store>,
    retry: RetryPolicy,
}

impl SeatBookingEngine {
    /// Create an engine over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Reserve `seats` on `ride` for `user`.
    ///
    /// # Errors
    ///
    /// - [`RideError::Validation`] if `seats` is less than one.
    /// - [`RideError::NotFound`] if the ride or user doesn't exist.
    /// - [`RideError::CapacityExceeded`] if the seats don't fit; nothing is
    ///   written.
    /// - [`RideError::Storage`] if the store fails or conflicts persist.
    pub async fn join_ride(&self, ride: RideId, user: UserId, seats: i32) -> Result<Booking> {
        if seats < 1 {
            return Err(RideError::validation("at least one seat must be requested"));
        }

        let booking = match self
            .with_retry("join_ride", || self.store.join_ride(ride, user, seats))
            .await
        {
            Ok(booking) => booking,
            Err(RideError::CapacityExceeded { requested, remaining }) => {
                tracing::info!(
                    ride_id = %ride,
                    user_id = %user,
                    requested,
                    remaining,
                    "Seat request exceeds capacity"
                );
                return Err(RideError::CapacityExceeded { requested, remaining });
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            ride_id = %ride,
            user_id = %user,
            passenger_id = %booking.passenger.id,
            seats,
            seats_booked = booking.ride.seats_booked,
            seats_available = booking.ride.seats_available,
            "Passenger joined ride"
        );

        Ok(booking)
    }

    /// Remove a passenger and give their seats back to the ride.
    ///
    /// # Errors
    ///
    /// - [`RideError::NotFound`] if the passenger doesn't exist.
    /// - [`RideError::Storage`] if the store fails or conflicts persist.
    pub async fn leave_ride(&self, passenger: PassengerId) -> Result<LeaveOutcome> {
        let outcome = self
            .with_retry("leave_ride", || self.store.leave_ride(passenger))
            .await?;

        if outcome.release.clamped {
            tracing::error!(
                ride_id = %outcome.ride.id,
                passenger_id = %passenger,
                seats = outcome.passenger.seats,
                "seats_booked would have gone negative; clamped to zero"
            );
        }

        tracing::info!(
            ride_id = %outcome.ride.id,
            passenger_id = %passenger,
            seats_booked = outcome.ride.seats_booked,
            "Passenger left ride"
        );

        Ok(outcome)
    }

    /// All passengers of a ride in join order, with their profiles.
    ///
    /// # Errors
    ///
    /// Returns [`RideError::Storage`] if the store fails.
    pub async fn passengers_by_ride(&self, ride: RideId) -> Result<Vec<PassengerDetails>> {
        let passengers = self.store.list_passengers(ride).await?;
        if passengers.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<UserId> = passengers.iter().map(|p| p.user_id).collect();
        let profiles = profiles(self.store.as_ref(), &ids).await?;

        Ok(passengers
            .into_iter()
            .filter_map(|passenger| {
                let user = profiles.get(&passenger.user_id)?.clone();
                Some(PassengerDetails { passenger, user })
            })
            .collect())
    }

    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut run: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ridesapp_store::Result<T>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match run().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    if attempt >= max_attempts {
                        tracing::warn!(
                            operation,
                            attempt,
                            error = %e,
                            "Seat operation still conflicting after max attempts"
                        );
                        return Err(RideError::Storage(format!(
                            "{operation} failed after {attempt} attempts: {e}"
                        )));
                    }

                    let backoff = self.retry.backoff_step * attempt;
                    tracing::debug!(
                        operation,
                        attempt,
                        backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Seat operation conflicted, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(log_storage(operation, e)),
            }
        }
    }
}

fn log_storage(operation: &'static str, err: StoreError) -> RideError {
    if matches!(err, StoreError::Database(_) | StoreError::Serialization(_)) {
        tracing::error!(operation, error = %err, "Store failure");
    }
    err.into()
}
