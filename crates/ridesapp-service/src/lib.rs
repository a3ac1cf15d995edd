//! Rides App HTTP API Service.
//!
//! This crate provides the HTTP API for booking rides, including:
//!
//! - Registration, login and profiles
//! - Ride creation and the ride lifecycle
//! - Seat booking on shared rides
//! - Ratings after a ride
//!
//! # Authentication
//!
//! Register and login return an HS256 session token. Every other endpoint
//! except health expects it as `Authorization: Bearer <token>`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers are async for axum even when they never await

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use auth::{issue_token, AuthUser, Claims};
pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
