//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, health, rides, users};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent requests for seat operations.
/// Joins and leaves take row locks, so they get a tighter bound.
const SEAT_MAX_CONCURRENT_REQUESTS: usize = 64;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 128;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /api/v1/health` - Health check
/// - `POST /api/v1/auth/register` - Register a rider or driver
/// - `POST /api/v1/auth/login` - Exchange credentials for a token
///
/// ## Users (bearer token)
/// - `GET /api/v1/users/me` - Current profile
/// - `PUT /api/v1/users/me` - Update profile
///
/// ## Rides (bearer token)
/// - `POST /api/v1/rides` - Book a ride
/// - `GET /api/v1/rides/my` - Own rides
/// - `GET /api/v1/rides/shared/available` - Shared rides with free seats
/// - `GET /api/v1/rides/shared/upcoming` - Shared rides not yet departed
/// - `GET /api/v1/rides/:id` - Ride details
/// - `PUT /api/v1/rides/:id/status` - Accept, start, complete or cancel
///
/// ## Seats (bearer token, concurrency-limited)
/// - `POST /api/v1/rides/:id/join` - Reserve seats
/// - `DELETE /api/v1/rides/:id/passengers/:passenger_id` - Give up seats
/// - `GET /api/v1/rides/:id/passengers` - List passengers
///
/// ## Ratings (bearer token)
/// - `POST /api/v1/rides/:id/ratings` - Rate the other party
/// - `GET /api/v1/rides/:id/ratings` - List ratings
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let seat_routes = Router::new()
        .route("/:id/join", post(rides::join_ride))
        .route(
            "/:id/passengers/:passenger_id",
            delete(rides::leave_ride),
        )
        .layer(ConcurrencyLimitLayer::new(SEAT_MAX_CONCURRENT_REQUESTS));

    let ride_routes = Router::new()
        .route("/", post(rides::create_ride))
        .route("/my", get(rides::my_rides))
        .route("/shared/available", get(rides::available_shared))
        .route("/shared/upcoming", get(rides::upcoming_shared))
        .route("/:id", get(rides::get_ride))
        .route("/:id/status", put(rides::update_status))
        .route("/:id/passengers", get(rides::list_passengers))
        .route(
            "/:id/ratings",
            post(rides::add_rating).get(rides::list_ratings),
        )
        .merge(seat_routes);

    let api_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/users/me", get(users::get_me).put(users::update_me))
        .nest("/rides", ride_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/api/v1/health", get(health::health))
        .nest("/api/v1", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
