//! Ride, seat and rating handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use ridesapp_core::{
    Passenger, PassengerDetails, PassengerId, Rating, RatingDetails, Ride, RideDetails, RideId,
    RideRequest, RideStatus, SeatRelease,
};

use super::parse_id;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Status change request.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// Target status.
    pub status: RideStatus,
}

/// Join request.
#[derive(Debug, Deserialize)]
pub struct JoinRideRequest {
    /// Seats to reserve (default: 1).
    #[serde(default = "one_seat")]
    pub seats: i32,
}

const fn one_seat() -> i32 {
    1
}

/// Rating request.
#[derive(Debug, Deserialize)]
pub struct AddRatingRequest {
    /// Score from 1 to 5.
    pub rating: i32,
    /// Optional free-text comment.
    #[serde(default)]
    pub comment: Option<String>,
}

// ============================================================================
// Rides
// ============================================================================

/// Book a ride for the current user.
///
/// POST /api/v1/rides
pub async fn create_ride(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<RideRequest>,
) -> Result<(StatusCode, Json<Ride>), ApiError> {
    let ride = state.rides.lifecycle().create_ride(auth.user_id, req).await?;
    Ok((StatusCode::CREATED, Json(ride)))
}

/// The current user's rides: booked ones for riders, assigned ones for
/// drivers.
///
/// GET /api/v1/rides/my
pub async fn my_rides(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<RideDetails>>, ApiError> {
    let queries = state.rides.queries();
    let rides = if auth.is_driver() {
        queries.rides_by_driver(auth.user_id).await?
    } else {
        queries.rides_by_rider(auth.user_id).await?
    };
    Ok(Json(rides))
}

/// Shared rides that still have free seats.
///
/// GET /api/v1/rides/shared/available
pub async fn available_shared(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
) -> Result<Json<Vec<RideDetails>>, ApiError> {
    Ok(Json(state.rides.queries().available_shared_rides().await?))
}

/// Shared rides that have not departed yet.
///
/// GET /api/v1/rides/shared/upcoming
pub async fn upcoming_shared(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
) -> Result<Json<Vec<RideDetails>>, ApiError> {
    Ok(Json(state.rides.queries().upcoming_shared_rides().await?))
}

/// A single ride with its participants.
///
/// GET /api/v1/rides/:id
pub async fn get_ride(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<RideDetails>, ApiError> {
    let id: RideId = parse_id(&id)?;
    Ok(Json(state.rides.queries().ride_by_id(id).await?))
}

/// Move a ride along its lifecycle.
///
/// Accepting is reserved for drivers and assigns the caller. Every other
/// move is reserved for the ride's rider and assigned driver.
///
/// PUT /api/v1/rides/:id/status
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Ride>, ApiError> {
    let id: RideId = parse_id(&id)?;
    let lifecycle = state.rides.lifecycle();

    if req.status == RideStatus::Accepted {
        if !auth.is_driver() {
            return Err(ApiError::Forbidden("only drivers can accept rides".into()));
        }
        return Ok(Json(lifecycle.accept_ride(id, auth.user_id).await?));
    }

    let ride = state
        .store()
        .get_ride(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("ride not found: {id}")))?;
    if !ride.involves(auth.user_id) {
        tracing::warn!(ride_id = %id, user_id = %auth.user_id, "Status change by outsider");
        return Err(ApiError::Forbidden(
            "only the rider or the assigned driver can change this ride".into(),
        ));
    }

    Ok(Json(lifecycle.update_status(id, req.status).await?))
}

// ============================================================================
// Seats
// ============================================================================

/// Reserve seats on a shared ride for the current user.
///
/// POST /api/v1/rides/:id/join
pub async fn join_ride(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<JoinRideRequest>,
) -> Result<(StatusCode, Json<Passenger>), ApiError> {
    let id: RideId = parse_id(&id)?;
    let booking = state
        .rides
        .booking()
        .join_ride(id, auth.user_id, req.seats)
        .await?;
    Ok((StatusCode::CREATED, Json(booking.passenger)))
}

/// Give up a seat reservation. Only the passenger may do this.
///
/// DELETE /api/v1/rides/:id/passengers/:passenger_id
pub async fn leave_ride(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((ride_id, passenger_id)): Path<(String, String)>,
) -> Result<Json<SeatRelease>, ApiError> {
    let ride_id: RideId = parse_id(&ride_id)?;
    let passenger_id: PassengerId = parse_id(&passenger_id)?;

    let passenger = state
        .store()
        .get_passenger(passenger_id)
        .await?
        .filter(|p| p.ride_id == ride_id)
        .ok_or_else(|| ApiError::NotFound(format!("passenger not found: {passenger_id}")))?;
    if passenger.user_id != auth.user_id {
        return Err(ApiError::Forbidden(
            "only the passenger can give up this seat".into(),
        ));
    }

    let outcome = state.rides.booking().leave_ride(passenger_id).await?;
    Ok(Json(outcome.release))
}

/// Passengers of a ride in join order.
///
/// GET /api/v1/rides/:id/passengers
pub async fn list_passengers(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<PassengerDetails>>, ApiError> {
    let id: RideId = parse_id(&id)?;
    Ok(Json(state.rides.booking().passengers_by_ride(id).await?))
}

// ============================================================================
// Ratings
// ============================================================================

/// Rate the other party of a ride.
///
/// POST /api/v1/rides/:id/ratings
pub async fn add_rating(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<AddRatingRequest>,
) -> Result<(StatusCode, Json<Rating>), ApiError> {
    let id: RideId = parse_id(&id)?;
    let rating = state
        .rides
        .ratings()
        .add_rating(id, auth.user_id, req.rating, req.comment)
        .await?;
    Ok((StatusCode::CREATED, Json(rating)))
}

/// Ratings left on a ride.
///
/// GET /api/v1/rides/:id/ratings
pub async fn list_ratings(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<RatingDetails>>, ApiError> {
    let id: RideId = parse_id(&id)?;
    Ok(Json(state.rides.ratings().ratings_by_ride(id).await?))
}
