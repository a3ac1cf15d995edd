//! Rating collector.

use std::sync::Arc;

use ridesapp_core::{counterparty, Rating, RatingDetails, Result, RideError, RideId, UserId};
use ridesapp_store::Store;

use crate::profiles;

/// Records and lists ratings left after rides.
#[derive(Clone)]
pub struct RatingCollector {
    store: Arc<dyn Store>,
}

impl RatingCollector {
    /// Create a collector over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Record a rating by `from` on `ride`.
    ///
    /// The rating goes to the ride's rider, or to the driver when the rider
    /// is the one rating.
    ///
    /// # Errors
    ///
    /// - [`RideError::NotFound`] if the ride or rater doesn't exist.
    /// - [`RideError::Validation`] if the score is outside 1..=5 or the rider
    ///   rates a ride that has no driver.
    pub async fn add_rating(
        &self,
        ride: RideId,
        from: UserId,
        score: i32,
        comment: Option<String>,
    ) -> Result<Rating> {
        let ride = self
            .store
            .get_ride(ride)
            .await?
            .ok_or_else(|| RideError::not_found("ride", ride))?;

        let to = counterparty(&ride, from)
            .ok_or_else(|| RideError::validation("users cannot rate themselves"))?;
        let rating = Rating::new(ride.id, from, to, score, comment)?;

        self.store.insert_rating(&rating).await?;

        tracing::info!(
            ride_id = %ride.id,
            from_user_id = %from,
            to_user_id = %to,
            rating = score,
            "Rating recorded"
        );

        Ok(rating)
    }

    /// All ratings for a ride in creation order, with both users' profiles
    /// and the ride.
    ///
    /// # Errors
    ///
    /// Returns [`RideError::Storage`] if the store fails.
    pub async fn ratings_by_ride(&self, ride: RideId) -> Result<Vec<RatingDetails>> {
        let ratings = self.store.list_ratings(ride).await?;
        if ratings.is_empty() {
            return Ok(Vec::new());
        }

        let Some(ride) = self.store.get_ride(ride).await? else {
            return Ok(Vec::new());
        };

        let ids: Vec<UserId> = ratings
            .iter()
            .flat_map(|r| [r.from_user_id, r.to_user_id])
            .collect();
        let profiles = profiles(self.store.as_ref(), &ids).await?;

        Ok(ratings
            .into_iter()
            .map(|rating| RatingDetails {
                ride: ride.clone(),
                from_user: profiles.get(&rating.from_user_id).cloned(),
                to_user: profiles.get(&rating.to_user_id).cloned(),
                rating,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridesapp_core::{PaymentMethod, Place, Ride, RideRequest, RideType, User, UserRole};
    use ridesapp_store::{MemoryStore, RideChange};

    async fn setup() -> (RatingCollector, Arc<MemoryStore>, Ride, User) {
        let store = Arc::new(MemoryStore::new());
        let rider = User::new("rider@example.com", "h".into(), UserRole::Rider);
        store.insert_user(&rider).await.unwrap();

        let place = |address: &str| Place {
            lat: 48.85,
            lng: 2.35,
            address: address.into(),
        };
        let ride = Ride::from_request(
            rider.id,
            RideRequest {
                ride_type: RideType::OnDemand,
                pickup: place("Louvre"),
                dropoff: place("Orly"),
                price_cents: 4200,
                distance_km: 18.0,
                duration_minutes: 40,
                seats_available: None,
                departure_time: None,
                payment_method: PaymentMethod::Wallet,
            },
        )
        .unwrap();
        store.insert_ride(&ride).await.unwrap();

        (RatingCollector::new(store.clone()), store, ride, rider)
    }

    #[tokio::test]
    async fn score_bounds() {
        let (collector, store, ride, rider) = setup().await;
        let other = User::new("other@example.com", "h".into(), UserRole::Rider);
        store.insert_user(&other).await.unwrap();

        for bad in [0, 6] {
            let err = collector
                .add_rating(ride.id, other.id, bad, None)
                .await
                .unwrap_err();
            assert!(matches!(err, RideError::Validation(_)));
        }
        for good in [1, 5] {
            let rating = collector
                .add_rating(ride.id, other.id, good, None)
                .await
                .unwrap();
            assert_eq!(rating.to_user_id, rider.id);
        }
    }

    #[tokio::test]
    async fn rider_rates_driver_once_assigned() {
        let (collector, store, ride, rider) = setup().await;

        let err = collector
            .add_rating(ride.id, rider.id, 5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RideError::Validation(_)));

        let driver = User::new("driver@example.com", "h".into(), UserRole::Driver);
        store.insert_user(&driver).await.unwrap();
        store
            .update_ride(ride.id, RideChange::Accept { driver: driver.id })
            .await
            .unwrap();

        let rating = collector
            .add_rating(ride.id, rider.id, 5, Some("smooth".into()))
            .await
            .unwrap();
        assert_eq!(rating.to_user_id, driver.id);

        let listed = collector.ratings_by_ride(ride.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].to_user.as_ref().map(|u| u.id), Some(driver.id));
        assert_eq!(listed[0].ride.id, ride.id);
    }

    #[tokio::test]
    async fn unknown_ride() {
        let (collector, _store, _ride, rider) = setup().await;
        let err = collector
            .add_rating(RideId::generate(), rider.id, 3, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RideError::NotFound { entity: "ride", .. }));
        assert!(collector
            .ratings_by_ride(RideId::generate())
            .await
            .unwrap()
            .is_empty());
    }
}
