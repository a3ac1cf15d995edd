//! Ride components for the rides app.
//!
//! This crate holds the operations the HTTP service exposes, each built on a
//! shared [`Store`] handle:
//!
//! - [`SeatBookingEngine`]: join and leave shared rides without overbooking
//! - [`RideLifecycleManager`]: create rides, accept them and move their status
//! - [`RatingCollector`]: record and list ratings
//! - [`RideQueries`]: single rides and listings with participants expanded
//!
//! [`RideManager`] bundles the four around one store.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ridesapp_rides::RideManager;
//! use ridesapp_store::MemoryStore;
//!
//! # async fn example() -> ridesapp_core::Result<()> {
//! let manager = RideManager::new(Arc::new(MemoryStore::new()));
//! let open = manager.queries().available_shared_rides().await?;
//! assert!(open.is_empty());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod booking;
pub mod lifecycle;
pub mod queries;
pub mod ratings;

pub use booking::{RetryPolicy, SeatBookingEngine};
pub use lifecycle::RideLifecycleManager;
pub use queries::RideQueries;
pub use ratings::RatingCollector;

use std::collections::HashMap;
use std::sync::Arc;

use ridesapp_core::{Result, UserId, UserProfile};
use ridesapp_store::Store;

/// The ride components sharing one store.
#[derive(Clone)]
pub struct RideManager {
    store: Arc<dyn Store>,
    booking: SeatBookingEngine,
    lifecycle: RideLifecycleManager,
    ratings: RatingCollector,
    queries: RideQueries,
}

impl RideManager {
    /// Build every component over `store` with the default retry policy.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_retry_policy(store, RetryPolicy::default())
    }

    /// Build every component over `store`.
    #[must_use]
    pub fn with_retry_policy(store: Arc<dyn Store>, retry: RetryPolicy) -> Self {
        Self {
            booking: SeatBookingEngine::new(Arc::clone(&store), retry),
            lifecycle: RideLifecycleManager::new(Arc::clone(&store)),
            ratings: RatingCollector::new(Arc::clone(&store)),
            queries: RideQueries::new(Arc::clone(&store)),
            store,
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Seat booking.
    #[must_use]
    pub fn booking(&self) -> &SeatBookingEngine {
        &self.booking
    }

    /// Ride creation and status changes.
    #[must_use]
    pub fn lifecycle(&self) -> &RideLifecycleManager {
        &self.lifecycle
    }

    /// Ratings.
    #[must_use]
    pub fn ratings(&self) -> &RatingCollector {
        &self.ratings
    }

    /// Read-only queries.
    #[must_use]
    pub fn queries(&self) -> &RideQueries {
        &self.queries
    }
}

/// Fetch the public profiles of `ids`, keyed by user.
async fn profiles(store: &dyn Store, ids: &[UserId]) -> Result<HashMap<UserId, UserProfile>> {
    let mut unique = ids.to_vec();
    unique.sort_unstable();
    unique.dedup();

    let users = store.get_users(&unique).await?;
    Ok(users.iter().map(|u| (u.id, u.profile())).collect())
}
