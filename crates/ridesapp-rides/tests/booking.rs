//! Seat booking behaviour across the ride components.

mod common;

use std::sync::Arc;

use common::{on_demand_request, shared_request, Fixture};
use ridesapp_core::{RideError, UserRole};

#[tokio::test]
async fn two_seat_ride_scenario() {
    let fx = Fixture::new();
    let rider = fx.user("rider@example.com", UserRole::Rider).await;
    let alice = fx.user("alice@example.com", UserRole::Rider).await;
    let bob = fx.user("bob@example.com", UserRole::Rider).await;
    let ride = fx.shared_ride(&rider, 2).await;
    let booking = fx.manager.booking();

    let first = booking.join_ride(ride.id, alice.id, 2).await.unwrap();
    assert_eq!(fx.seats_booked(&ride).await, 2);

    let err = booking.join_ride(ride.id, bob.id, 1).await.unwrap_err();
    assert_eq!(
        err,
        RideError::CapacityExceeded {
            requested: 1,
            remaining: 0
        }
    );
    assert_eq!(fx.seats_booked(&ride).await, 2);

    booking.leave_ride(first.passenger.id).await.unwrap();
    assert_eq!(fx.seats_booked(&ride).await, 0);

    booking.join_ride(ride.id, bob.id, 1).await.unwrap();
    assert_eq!(fx.seats_booked(&ride).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn two_concurrent_joins_on_one_seat() {
    let fx = Fixture::new();
    let rider = fx.user("rider@example.com", UserRole::Rider).await;
    let a = fx.user("a@example.com", UserRole::Rider).await;
    let b = fx.user("b@example.com", UserRole::Rider).await;
    let ride = fx.shared_ride(&rider, 1).await;

    let booking = fx.manager.booking();
    let (left, right) = tokio::join!(
        booking.join_ride(ride.id, a.id, 1),
        booking.join_ride(ride.id, b.id, 1)
    );

    let results = [left, right];
    let ok = results.iter().filter(|r| r.is_ok()).count();
    let full = results
        .iter()
        .filter(|r| matches!(r, Err(RideError::CapacityExceeded { .. })))
        .count();
    assert_eq!((ok, full), (1, 1));
    assert_eq!(fx.seats_booked(&ride).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mixed_joins_never_overbook() {
    let fx = Fixture::new();
    let rider = fx.user("rider@example.com", UserRole::Rider).await;
    let ride = fx.shared_ride(&rider, 7).await;

    let mut users = Vec::new();
    for i in 0..16 {
        users.push(fx.user(&format!("u{i}@example.com"), UserRole::Rider).await);
    }

    let manager = Arc::new(fx.manager.clone());
    let ride_id = ride.id;
    let tasks = users.into_iter().enumerate().map(|(i, user)| {
        let manager = Arc::clone(&manager);
        let seats = i32::try_from(i % 3).unwrap() + 1;
        tokio::spawn(async move { manager.booking().join_ride(ride_id, user.id, seats).await })
    });
    let results = futures::future::join_all(tasks).await;

    let booked: i32 = results
        .into_iter()
        .filter_map(|r| r.unwrap().ok())
        .map(|b| b.passenger.seats)
        .sum();

    let stored = fx.seats_booked(&ride).await;
    assert_eq!(stored, booked);
    assert!(stored <= 7);

    let passengers = fx.manager.booking().passengers_by_ride(ride.id).await.unwrap();
    let seats: i32 = passengers.iter().map(|p| p.passenger.seats).sum();
    assert_eq!(seats, stored);
}

#[tokio::test]
async fn join_then_leave_restores_seats() {
    let fx = Fixture::new();
    let rider = fx.user("rider@example.com", UserRole::Rider).await;
    let early = fx.user("early@example.com", UserRole::Rider).await;
    let late = fx.user("late@example.com", UserRole::Rider).await;
    let ride = fx.shared_ride(&rider, 5).await;
    let booking = fx.manager.booking();

    booking.join_ride(ride.id, early.id, 1).await.unwrap();
    let before = fx.seats_booked(&ride).await;

    let joined = booking.join_ride(ride.id, late.id, 3).await.unwrap();
    let left = booking.leave_ride(joined.passenger.id).await.unwrap();

    assert!(!left.release.clamped);
    assert_eq!(fx.seats_booked(&ride).await, before);
}

#[tokio::test]
async fn available_listing_tracks_capacity() {
    let fx = Fixture::new();
    let rider = fx.user("rider@example.com", UserRole::Rider).await;
    let joiner = fx.user("joiner@example.com", UserRole::Rider).await;
    let ride = fx.shared_ride(&rider, 1).await;

    let listed = fx.manager.queries().available_shared_rides().await.unwrap();
    assert_eq!(listed.len(), 1);

    let booking = fx
        .manager
        .booking()
        .join_ride(ride.id, joiner.id, 1)
        .await
        .unwrap();
    let listed = fx.manager.queries().available_shared_rides().await.unwrap();
    assert!(listed.is_empty());

    fx.manager
        .booking()
        .leave_ride(booking.passenger.id)
        .await
        .unwrap();
    let listed = fx.manager.queries().available_shared_rides().await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn departure_time_only_required_for_shared() {
    let fx = Fixture::new();
    let rider = fx.user("rider@example.com", UserRole::Rider).await;

    let mut shared = shared_request(2);
    shared.departure_time = None;
    let err = fx
        .manager
        .lifecycle()
        .create_ride(rider.id, shared)
        .await
        .unwrap_err();
    assert!(matches!(err, RideError::Validation(_)));

    let ride = fx
        .manager
        .lifecycle()
        .create_ride(rider.id, on_demand_request())
        .await
        .unwrap();
    assert!(ride.departure_time.is_none());
}

#[tokio::test]
async fn on_demand_rides_cannot_be_joined() {
    let fx = Fixture::new();
    let rider = fx.user("rider@example.com", UserRole::Rider).await;
    let joiner = fx.user("joiner@example.com", UserRole::Rider).await;
    let ride = fx
        .manager
        .lifecycle()
        .create_ride(rider.id, on_demand_request())
        .await
        .unwrap();

    let err = fx
        .manager
        .booking()
        .join_ride(ride.id, joiner.id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, RideError::CapacityExceeded { .. }));
}

#[tokio::test]
async fn back_to_back_joins_keep_join_order() {
    let fx = Fixture::new();
    let rider = fx.user("rider@example.com", UserRole::Rider).await;
    let joiner = fx.user("joiner@example.com", UserRole::Rider).await;
    let ride = fx.shared_ride(&rider, 100).await;
    let booking = fx.manager.booking();

    let mut joined = Vec::new();
    for _ in 0..100 {
        let made = booking.join_ride(ride.id, joiner.id, 1).await.unwrap();
        joined.push(made.passenger.id);
    }

    let listed: Vec<_> = booking
        .passengers_by_ride(ride.id)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.passenger.id)
        .collect();
    assert_eq!(listed, joined);
    assert_eq!(fx.seats_booked(&ride).await, 100);
}
