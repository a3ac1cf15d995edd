//! Database schema definitions.
//!
//! Table names and the column lists shared by every `SELECT` so that row
//! structs and queries stay in step. The tables themselves are created by
//! the migrations under `migrations/`.

/// Table names in the `PostgreSQL` database.
pub mod table {
    /// Registered users, keyed by `id`.
    pub const USERS: &str = "users";

    /// Rides, keyed by `id`. Holds the seat counters.
    pub const RIDES: &str = "rides";

    /// Passenger reservations, keyed by `id` (ULID stored as UUID).
    pub const PASSENGERS: &str = "ride_passengers";

    /// Ratings, keyed by `id` (ULID stored as UUID).
    pub const RATINGS: &str = "ratings";
}

/// Columns selected into `UserRow`.
pub const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, role, \
    profile_picture, rating, is_verified, license_number, vehicle_model, vehicle_color, \
    vehicle_plate, created_at, updated_at";

/// Columns selected into `RideRow`.
pub const RIDE_COLUMNS: &str = "id, ride_type, rider_id, driver_id, pickup_lat, pickup_lng, \
    pickup_address, dropoff_lat, dropoff_lng, dropoff_address, status, price_cents, \
    distance_km, duration_minutes, seats_available, seats_booked, departure_time, \
    payment_method, started_at, completed_at, created_at, updated_at";

/// Columns selected into `PassengerRow`.
pub const PASSENGER_COLUMNS: &str = "id, ride_id, user_id, seats, status, created_at, updated_at";

/// Columns selected into `RatingRow`.
pub const RATING_COLUMNS: &str =
    "id, ride_id, from_user_id, to_user_id, rating, comment, created_at, updated_at";

/// Returns all table names, in dependency order.
#[must_use]
pub fn all_tables() -> Vec<&'static str> {
    vec![table::USERS, table::RIDES, table::PASSENGERS, table::RATINGS]
}
