//! In-memory storage implementation.
//!
//! All tables live behind one `RwLock`. Compound operations take the write
//! lock, run every check first and only then mutate, so they are serialized
//! and all-or-nothing. The lock is never held across an `.await`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use ridesapp_core::{
    normalize_email, Passenger, PassengerId, PassengerStatus, Rating, RatingId, Ride,
    RideFilter, RideId, RideStatus, User, UserId,
};

use crate::error::{Result, StoreError};
use crate::{Booking, LeaveOutcome, RideChange, Store};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    // Normalized email to owner.
    emails: HashMap<String, UserId>,
    rides: HashMap<RideId, Ride>,
    // ULID keys keep iteration in creation order.
    passengers: BTreeMap<PassengerId, Passenger>,
    ratings: BTreeMap<RatingId, Rating>,
}

impl Tables {
    fn require_user(&self, id: UserId) -> Result<()> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::not_found("user", id))
        }
    }
}

/// Storage backed by process memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    // =========================================================================
    // User Operations
    // =========================================================================

    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut tables = self.write()?;

        let email = normalize_email(&user.email);
        if tables.emails.contains_key(&email) {
            return Err(StoreError::Duplicate {
                entity: "user",
                key: email,
            });
        }

        let mut user = user.clone();
        user.email = email.clone();
        tables.emails.insert(email, user.id);
        tables.users.insert(user.id, user);
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let mut tables = self.write()?;
        let existing = tables
            .users
            .get_mut(&user.id)
            .ok_or_else(|| StoreError::not_found("user", user.id))?;

        let mut updated = user.clone();
        updated.email = std::mem::take(&mut existing.email);
        updated.password_hash = std::mem::take(&mut existing.password_hash);
        updated.role = existing.role;
        updated.created_at = existing.created_at;
        *existing = updated;
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.read()?;
        Ok(tables
            .emails
            .get(&normalize_email(email))
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn get_users(&self, ids: &[UserId]) -> Result<Vec<User>> {
        let tables = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect())
    }

    // =========================================================================
    // Ride Operations
    // =========================================================================

    async fn insert_ride(&self, ride: &Ride) -> Result<()> {
        let mut tables = self.write()?;
        tables.require_user(ride.rider_id)?;
        tables.rides.insert(ride.id, ride.clone());
        Ok(())
    }

    async fn get_ride(&self, id: RideId) -> Result<Option<Ride>> {
        Ok(self.read()?.rides.get(&id).cloned())
    }

    async fn list_rides(&self, filter: &RideFilter) -> Result<Vec<Ride>> {
        let tables = self.read()?;
        Ok(filter.apply(tables.rides.values()))
    }

    async fn update_ride(&self, id: RideId, change: RideChange) -> Result<Ride> {
        let mut tables = self.write()?;

        if let RideChange::Accept { driver } = change {
            tables.require_user(driver)?;
        }

        let mut ride = tables
            .rides
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("ride", id))?;

        match change {
            RideChange::Status(status) => ride.transition_to(status)?,
            RideChange::Accept { driver } => ride.accept(driver)?,
        }

        if ride.status == RideStatus::Accepted {
            for passenger in tables.passengers.values_mut() {
                if passenger.ride_id == id && passenger.status == PassengerStatus::Requested {
                    passenger.confirm();
                }
            }
        }

        tables.rides.insert(id, ride.clone());
        Ok(ride)
    }

    // =========================================================================
    // Compound Seat Operations
    // =========================================================================

    async fn join_ride(&self, ride_id: RideId, user: UserId, seats: i32) -> Result<Booking> {
        let mut tables = self.write()?;

        let mut ride = tables
            .rides
            .get(&ride_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("ride", ride_id))?;
        tables.require_user(user)?;

        // Checks run on a copy; nothing is written unless both pass.
        let passenger = Passenger::new(&ride, user, seats)?;
        ride.reserve_seats(seats)?;

        tables.rides.insert(ride_id, ride.clone());
        tables.passengers.insert(passenger.id, passenger.clone());

        Ok(Booking { passenger, ride })
    }

    async fn leave_ride(&self, passenger_id: PassengerId) -> Result<LeaveOutcome> {
        let mut tables = self.write()?;

        let passenger = tables
            .passengers
            .get(&passenger_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("passenger", passenger_id))?;
        let mut ride = tables
            .rides
            .get(&passenger.ride_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("ride", passenger.ride_id))?;

        let release = ride.release_seats(passenger.seats);

        tables.rides.insert(ride.id, ride.clone());
        tables.passengers.remove(&passenger_id);

        Ok(LeaveOutcome {
            passenger,
            ride,
            release,
        })
    }

    async fn get_passenger(&self, id: PassengerId) -> Result<Option<Passenger>> {
        Ok(self.read()?.passengers.get(&id).cloned())
    }

    async fn list_passengers(&self, ride: RideId) -> Result<Vec<Passenger>> {
        Ok(self
            .read()?
            .passengers
            .values()
            .filter(|p| p.ride_id == ride)
            .cloned()
            .collect())
    }

    async fn list_passengers_for(&self, rides: &[RideId]) -> Result<Vec<Passenger>> {
        let wanted: HashSet<RideId> = rides.iter().copied().collect();
        Ok(self
            .read()?
            .passengers
            .values()
            .filter(|p| wanted.contains(&p.ride_id))
            .cloned()
            .collect())
    }

    // =========================================================================
    // Rating Operations
    // =========================================================================

    async fn insert_rating(&self, rating: &Rating) -> Result<()> {
        let mut tables = self.write()?;
        if !tables.rides.contains_key(&rating.ride_id) {
            return Err(StoreError::not_found("ride", rating.ride_id));
        }
        tables.require_user(rating.from_user_id)?;
        tables.require_user(rating.to_user_id)?;

        tables.ratings.insert(rating.id, rating.clone());
        Ok(())
    }

    async fn list_ratings(&self, ride: RideId) -> Result<Vec<Rating>> {
        Ok(self
            .read()?
            .ratings
            .values()
            .filter(|r| r.ride_id == ride)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use ridesapp_core::{PaymentMethod, Place, RideError, RideRequest, RideType, UserRole};
    use std::sync::Arc;

    async fn user(store: &MemoryStore, email: &str, role: UserRole) -> User {
        let user = User::new(email, "hash".into(), role);
        store.insert_user(&user).await.unwrap();
        user
    }

    async fn shared_ride(store: &MemoryStore, rider: UserId, seats: i32) -> Ride {
        let place = |address: &str| Place {
            lat: 40.0,
            lng: -73.0,
            address: address.into(),
        };
        let ride = Ride::from_request(
            rider,
            RideRequest {
                ride_type: RideType::Shared,
                pickup: place("Library"),
                dropoff: place("Airport"),
                price_cents: 2000,
                distance_km: 20.0,
                duration_minutes: 35,
                seats_available: Some(seats),
                departure_time: Some(Utc::now() + Duration::hours(1)),
                payment_method: PaymentMethod::Card,
            },
        )
        .unwrap();
        store.insert_ride(&ride).await.unwrap();
        ride
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let store = MemoryStore::new();
        user(&store, "dup@example.com", UserRole::Rider).await;

        let again = User::new("DUP@example.com", "hash".into(), UserRole::Driver);
        let result = store.insert_user(&again).await;
        assert!(matches!(result, Err(StoreError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn update_keeps_registered_email() {
        let store = MemoryStore::new();
        let taken = user(&store, "taken@example.com", UserRole::Rider).await;
        let mut mine = user(&store, "mine@example.com", UserRole::Rider).await;

        mine.email = taken.email.clone();
        mine.first_name = "Renamed".into();
        store.update_user(&mine).await.unwrap();

        let by_email = store.get_user_by_email("MINE@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, mine.id);
        assert_eq!(by_email.email, "mine@example.com");
        assert_eq!(by_email.first_name, "Renamed");

        let other = store.get_user_by_email("taken@example.com").await.unwrap().unwrap();
        assert_eq!(other.id, taken.id);
        assert!(store.get_user_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn passengers_listed_for_several_rides() {
        let store = MemoryStore::new();
        let rider = user(&store, "rider@example.com", UserRole::Rider).await;
        let joiner = user(&store, "joiner@example.com", UserRole::Rider).await;
        let first = shared_ride(&store, rider.id, 3).await;
        let second = shared_ride(&store, rider.id, 3).await;
        let untouched = shared_ride(&store, rider.id, 3).await;

        let mut joined = Vec::new();
        for ride in [&second, &first, &second, &untouched, &first] {
            let booking = store.join_ride(ride.id, joiner.id, 1).await.unwrap();
            if ride.id != untouched.id {
                joined.push(booking.passenger.id);
            }
        }

        let listed: Vec<_> = store
            .list_passengers_for(&[first.id, second.id])
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(listed, joined);
        assert!(store.list_passengers_for(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ride_requires_existing_rider() {
        let store = MemoryStore::new();
        let place = Place {
            lat: 0.0,
            lng: 0.0,
            address: "x".into(),
        };
        let ride = Ride::from_request(
            UserId::generate(),
            RideRequest {
                ride_type: RideType::OnDemand,
                pickup: place.clone(),
                dropoff: place,
                price_cents: 100,
                distance_km: 1.0,
                duration_minutes: 3,
                seats_available: None,
                departure_time: None,
                payment_method: PaymentMethod::Cash,
            },
        )
        .unwrap();

        let result = store.insert_ride(&ride).await;
        assert!(matches!(result, Err(StoreError::NotFound { entity: "user", .. })));
    }

    #[tokio::test]
    async fn join_and_leave_round_trip() {
        let store = MemoryStore::new();
        let rider = user(&store, "rider@example.com", UserRole::Rider).await;
        let joiner = user(&store, "joiner@example.com", UserRole::Rider).await;
        let ride = shared_ride(&store, rider.id, 3).await;

        let booking = store.join_ride(ride.id, joiner.id, 2).await.unwrap();
        assert_eq!(booking.ride.seats_booked, 2);
        assert_eq!(booking.passenger.status, PassengerStatus::Requested);
        assert_eq!(store.list_passengers(ride.id).await.unwrap().len(), 1);

        let outcome = store.leave_ride(booking.passenger.id).await.unwrap();
        assert!(!outcome.release.clamped);
        assert_eq!(outcome.ride.seats_booked, 0);
        assert!(store.list_passengers(ride.id).await.unwrap().is_empty());
        assert!(store
            .get_passenger(booking.passenger.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn over_capacity_join_writes_nothing() {
        let store = MemoryStore::new();
        let rider = user(&store, "r@example.com", UserRole::Rider).await;
        let joiner = user(&store, "j@example.com", UserRole::Rider).await;
        let ride = shared_ride(&store, rider.id, 2).await;

        store.join_ride(ride.id, joiner.id, 1).await.unwrap();
        let err = store.join_ride(ride.id, joiner.id, 2).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Rejected(RideError::CapacityExceeded {
                requested: 2,
                remaining: 1
            })
        ));

        let stored = store.get_ride(ride.id).await.unwrap().unwrap();
        assert_eq!(stored.seats_booked, 1);
        assert_eq!(store.list_passengers(ride.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn join_unknown_ride_or_user() {
        let store = MemoryStore::new();
        let rider = user(&store, "r@example.com", UserRole::Rider).await;
        let ride = shared_ride(&store, rider.id, 2).await;

        let err = store
            .join_ride(RideId::generate(), rider.id, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "ride", .. }));

        let err = store
            .join_ride(ride.id, UserId::generate(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "user", .. }));
    }

    #[tokio::test]
    async fn leave_unknown_passenger() {
        let store = MemoryStore::new();
        let err = store.leave_ride(PassengerId::generate()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "passenger", .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_never_overbook() {
        let store = Arc::new(MemoryStore::new());
        let rider = user(&store, "r@example.com", UserRole::Rider).await;
        let ride = shared_ride(&store, rider.id, 5).await;

        let mut joiners = Vec::new();
        for i in 0..20 {
            joiners.push(user(&store, &format!("j{i}@example.com"), UserRole::Rider).await);
        }

        let ride_id = ride.id;
        let tasks = joiners.into_iter().map(|joiner| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.join_ride(ride_id, joiner.id, 1).await })
        });
        let results = futures::future::join_all(tasks).await;

        let succeeded = results
            .into_iter()
            .filter(|r| matches!(r, Ok(Ok(_))))
            .count();
        assert_eq!(succeeded, 5);

        let stored = store.get_ride(ride.id).await.unwrap().unwrap();
        assert_eq!(stored.seats_booked, 5);
        assert_eq!(store.list_passengers(ride.id).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn accept_confirms_requested_passengers() {
        let store = MemoryStore::new();
        let rider = user(&store, "r@example.com", UserRole::Rider).await;
        let joiner = user(&store, "j@example.com", UserRole::Rider).await;
        let driver = user(&store, "d@example.com", UserRole::Driver).await;
        let ride = shared_ride(&store, rider.id, 2).await;

        let booking = store.join_ride(ride.id, joiner.id, 1).await.unwrap();
        let accepted = store
            .update_ride(ride.id, RideChange::Accept { driver: driver.id })
            .await
            .unwrap();
        assert_eq!(accepted.status, RideStatus::Accepted);
        assert_eq!(accepted.driver_id, Some(driver.id));

        let passenger = store
            .get_passenger(booking.passenger.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(passenger.status, PassengerStatus::Confirmed);

        let driving = store
            .list_rides(&RideFilter::Driver(driver.id))
            .await
            .unwrap();
        assert_eq!(driving.len(), 1);
    }

    #[tokio::test]
    async fn invalid_transition_leaves_ride_untouched() {
        let store = MemoryStore::new();
        let rider = user(&store, "r@example.com", UserRole::Rider).await;
        let ride = shared_ride(&store, rider.id, 2).await;

        let err = store
            .update_ride(ride.id, RideChange::Status(RideStatus::Completed))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Rejected(RideError::InvalidTransition { .. })
        ));

        let stored = store.get_ride(ride.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RideStatus::Pending);
    }

    #[tokio::test]
    async fn ratings_listed_in_creation_order() {
        let store = MemoryStore::new();
        let rider = user(&store, "r@example.com", UserRole::Rider).await;
        let other = user(&store, "o@example.com", UserRole::Rider).await;
        let ride = shared_ride(&store, rider.id, 2).await;

        let first = Rating::new(ride.id, other.id, rider.id, 4, None).unwrap();
        let second = Rating::new(ride.id, other.id, rider.id, 2, Some("late".into())).unwrap();
        store.insert_rating(&second).await.unwrap();
        store.insert_rating(&first).await.unwrap();

        let ratings = store.list_ratings(ride.id).await.unwrap();
        let ids: Vec<_> = ratings.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);

        let missing = Rating::new(RideId::generate(), other.id, rider.id, 3, None).unwrap();
        assert!(store.insert_rating(&missing).await.is_err());
    }
}
