//! Ride store for the rides app.
//!
//! This crate persists users, rides, passengers and ratings behind the
//! [`Store`] trait, with two backends:
//!
//! - [`MemoryStore`]: tables in a single `RwLock`, for tests and local runs
//! - [`PgStore`]: `PostgreSQL` via `sqlx`, with embedded migrations
//!
//! # Seat bookings
//!
//! [`Store::join_ride`] and [`Store::leave_ride`] are compound operations:
//! the ride is locked, the seat rule from `ridesapp-core` is checked, and the
//! seat counter and passenger row are written together or not at all. In
//! Postgres the lock is `SELECT ... FOR UPDATE` on the ride row inside a
//! transaction; in memory it is the table write lock.
//!
//! # Example
//!
//! ```no_run
//! use ridesapp_store::{MemoryStore, Store};
//! use ridesapp_core::{User, UserRole};
//!
//! # async fn example() -> ridesapp_store::Result<()> {
//! let store = MemoryStore::new();
//!
//! let user = User::new("rider@example.com", "hash".into(), UserRole::Rider);
//! store.insert_user(&user).await?;
//!
//! let found = store.get_user_by_email("rider@example.com").await?;
//! assert!(found.is_some());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use ridesapp_core::{
    Passenger, PassengerId, Rating, Ride, RideFilter, RideId, RideStatus, SeatRelease, User,
    UserId,
};
use serde::Serialize;

/// A change applied to a ride under its row lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RideChange {
    /// Move to a new status along the transition graph.
    Status(RideStatus),
    /// Accept a pending ride for a driver and confirm its passengers.
    Accept {
        /// The accepting driver.
        driver: UserId,
    },
}

/// Result of a successful seat booking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Booking {
    /// The new passenger row.
    pub passenger: Passenger,
    /// The ride after the seats were reserved.
    pub ride: Ride,
}

/// Result of a passenger leaving a ride.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaveOutcome {
    /// The removed passenger row.
    pub passenger: Passenger,
    /// The ride after the seats were released.
    pub ride: Ride,
    /// The seat counter update.
    pub release: SeatRelease,
}

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations (`PostgreSQL`, in-memory for testing).
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // User Operations
    // =========================================================================

    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Duplicate` if the email is already registered.
    async fn insert_user(&self, user: &User) -> Result<()>;

    /// Overwrite an existing user's profile. Email, role, password hash and
    /// creation time are kept from the stored row.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    async fn update_user(&self, user: &User) -> Result<()>;

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Get a user by (normalized) email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Get every user in `ids` that exists, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_users(&self, ids: &[UserId]) -> Result<Vec<User>>;

    // =========================================================================
    // Ride Operations
    // =========================================================================

    /// Insert a new ride.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the rider doesn't exist.
    async fn insert_ride(&self, ride: &Ride) -> Result<()>;

    /// Get a ride by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_ride(&self, id: RideId) -> Result<Option<Ride>>;

    /// List rides matching `filter`, in the filter's order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_rides(&self, filter: &RideFilter) -> Result<Vec<Ride>>;

    /// Apply `change` to a ride under an exclusive lock.
    ///
    /// A ride entering `accepted` also confirms its requested passengers in
    /// the same write. Returns the updated ride.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the ride (or accepting driver) doesn't exist.
    /// - `StoreError::Rejected` if the transition is not allowed.
    async fn update_ride(&self, id: RideId, change: RideChange) -> Result<Ride>;

    // =========================================================================
    // Compound Seat Operations
    // =========================================================================

    /// Reserve `seats` on a ride for `user` and record the passenger
    /// atomically.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the ride or user doesn't exist.
    /// - `StoreError::Rejected` with `CapacityExceeded` if the seats don't fit.
    /// - `StoreError::Conflict` if a concurrent transaction won the race.
    async fn join_ride(&self, ride: RideId, user: UserId, seats: i32) -> Result<Booking>;

    /// Delete a passenger and give its seats back to the ride atomically.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the passenger doesn't exist.
    /// - `StoreError::Conflict` if a concurrent transaction won the race.
    async fn leave_ride(&self, passenger: PassengerId) -> Result<LeaveOutcome>;

    /// Get a passenger by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_passenger(&self, id: PassengerId) -> Result<Option<Passenger>>;

    /// List a ride's passengers in join order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_passengers(&self, ride: RideId) -> Result<Vec<Passenger>>;

    /// List the passengers of several rides at once, in join order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_passengers_for(&self, rides: &[RideId]) -> Result<Vec<Passenger>>;

    // =========================================================================
    // Rating Operations
    // =========================================================================

    /// Insert a rating.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the ride or either user doesn't exist.
    async fn insert_rating(&self, rating: &Rating) -> Result<()>;

    /// List a ride's ratings in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_ratings(&self, ride: RideId) -> Result<Vec<Rating>>;
}
