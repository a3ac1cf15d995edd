//! Shared fixtures for ride component tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use ridesapp_core::{PaymentMethod, Place, Ride, RideRequest, RideType, User, UserRole};
use ridesapp_rides::RideManager;
use ridesapp_store::{MemoryStore, Store};

/// A manager over a fresh in-memory store.
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub manager: RideManager,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let manager = RideManager::new(store.clone());
        Self { store, manager }
    }

    pub async fn user(&self, email: &str, role: UserRole) -> User {
        let user = User::new(email, "hash".into(), role);
        self.store.insert_user(&user).await.unwrap();
        user
    }

    pub async fn shared_ride(&self, rider: &User, seats: i32) -> Ride {
        self.manager
            .lifecycle()
            .create_ride(rider.id, shared_request(seats))
            .await
            .unwrap()
    }

    pub async fn seats_booked(&self, ride: &Ride) -> i32 {
        self.store
            .get_ride(ride.id)
            .await
            .unwrap()
            .unwrap()
            .seats_booked
    }
}

pub fn place(address: &str) -> Place {
    Place {
        lat: 52.52,
        lng: 13.40,
        address: address.into(),
    }
}

pub fn shared_request(seats: i32) -> RideRequest {
    RideRequest {
        ride_type: RideType::Shared,
        pickup: place("Alexanderplatz"),
        dropoff: place("BER Airport"),
        price_cents: 1800,
        distance_km: 25.0,
        duration_minutes: 40,
        seats_available: Some(seats),
        departure_time: Some(Utc::now() + Duration::hours(2)),
        payment_method: PaymentMethod::Cash,
    }
}

pub fn on_demand_request() -> RideRequest {
    RideRequest {
        ride_type: RideType::OnDemand,
        pickup: place("Mitte"),
        dropoff: place("Kreuzberg"),
        price_cents: 1100,
        distance_km: 4.2,
        duration_minutes: 12,
        seats_available: None,
        departure_time: None,
        payment_method: PaymentMethod::Card,
    }
}
