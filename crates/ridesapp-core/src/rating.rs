//! Ratings left by users after a ride.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RideError, Result};
use crate::ride::Ride;
use crate::user::UserProfile;
use crate::{RatingId, RideId, UserId};

/// Lowest accepted score.
pub const MIN_SCORE: i32 = 1;

/// Highest accepted score.
pub const MAX_SCORE: i32 = 5;

/// A score one user gave another for a ride.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    /// Unique rating ID.
    pub id: RatingId,
    /// The rated ride.
    pub ride_id: RideId,
    /// Who left the rating.
    pub from_user_id: UserId,
    /// Who was rated.
    pub to_user_id: UserId,
    /// Score between [`MIN_SCORE`] and [`MAX_SCORE`].
    pub rating: i32,
    /// Optional free-text comment.
    pub comment: Option<String>,
    /// When the rating was left.
    pub created_at: DateTime<Utc>,
    /// Ratings are immutable, so this always equals `created_at`.
    pub updated_at: DateTime<Utc>,
}

impl Rating {
    /// Create a rating, validating the score and normalising the comment.
    ///
    /// # Errors
    ///
    /// Returns [`RideError::Validation`] if the score is out of range or the
    /// rater and ratee are the same user.
    pub fn new(
        ride_id: RideId,
        from_user_id: UserId,
        to_user_id: UserId,
        score: i32,
        comment: Option<String>,
    ) -> Result<Self> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(RideError::validation(format!(
                "rating must be between {MIN_SCORE} and {MAX_SCORE}"
            )));
        }
        if from_user_id == to_user_id {
            return Err(RideError::validation("users cannot rate themselves"));
        }

        let comment = comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let now = Utc::now();
        Ok(Self {
            id: RatingId::generate(),
            ride_id,
            from_user_id,
            to_user_id,
            rating: score,
            comment,
            created_at: now,
            updated_at: now,
        })
    }
}

/// The user a rating on `ride` by `rater` is addressed to.
///
/// Anyone other than the rider rates the rider. The rider rates the driver,
/// and has nobody to rate until a driver is assigned.
#[must_use]
pub fn counterparty(ride: &Ride, rater: UserId) -> Option<UserId> {
    if rater == ride.rider_id {
        ride.driver_id
    } else {
        Some(ride.rider_id)
    }
}

/// A rating with the profiles of both users and the ride it refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingDetails {
    /// The rated ride.
    pub ride: Ride,
    /// The rating.
    #[serde(flatten)]
    pub rating: Rating,
    /// Who left it.
    pub from_user: Option<UserProfile>,
    /// Who received it.
    pub to_user: Option<UserProfile>,
}
