//! Error types for ride operations.

use crate::ids::IdError;
use crate::ride::RideStatus;

/// Result type for ride operations.
pub type Result<T> = std::result::Result<T, RideError>;

/// Errors that can occur in ride, seat and rating operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RideError {
    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity (`ride`, `passenger`, `user`).
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// Booking the requested seats would exceed the ride's capacity.
    #[error("not enough seats available: requested={requested}, remaining={remaining}")]
    CapacityExceeded {
        /// Seats asked for.
        requested: i32,
        /// Seats still free on the ride.
        remaining: i32,
    },

    /// Malformed or out-of-range input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The ride cannot move from its current status to the requested one.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: RideStatus,
        /// Requested status.
        to: RideStatus,
    },

    /// The underlying store failed.
    #[error("storage failure: {0}")]
    Storage(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}

impl RideError {
    /// Shorthand for a [`RideError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for a [`RideError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
