//! Core types and rules for the rides app.
//!
//! This crate provides the foundational types shared by the store, the ride
//! components and the HTTP service:
//!
//! - **Identifiers**: `UserId`, `RideId`, `PassengerId`, `RatingId`
//! - **Users**: `User`, `UserProfile`, `UserRole`
//! - **Rides**: `Ride`, `RideRequest`, `RideStatus`, `RideType`
//! - **Passengers**: `Passenger`, `PassengerStatus`
//! - **Ratings**: `Rating`
//! - **Queries**: `RideFilter`, `RideDetails`
//!
//! # Seats
//!
//! A shared ride offers `seats_available` seats and tracks `seats_booked`.
//! [`Ride::reserve_seats`] refuses any booking that would push
//! `seats_booked` past `seats_available`, and [`Ride::release_seats`] never
//! lets it drop below zero.
//!
//! # Money
//!
//! Fares are stored as `i64` integer cents to avoid floating point
//! precision issues.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod passenger;
pub mod query;
pub mod rating;
pub mod ride;
pub mod user;

pub use error::{Result, RideError};
pub use ids::{IdError, PassengerId, RatingId, RideId, UserId};
pub use passenger::{Passenger, PassengerDetails, PassengerStatus};
pub use query::{RideDetails, RideFilter};
pub use rating::{counterparty, Rating, RatingDetails, MAX_SCORE, MIN_SCORE};
pub use ride::{PaymentMethod, Place, Ride, RideRequest, RideStatus, RideType, SeatRelease};
pub use user::{normalize_email, DriverDetails, User, UserProfile, UserRole, DEFAULT_USER_RATING};
