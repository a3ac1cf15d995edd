//! `PostgreSQL` storage implementation.
//!
//! Compound operations run inside one transaction and lock the ride row with
//! `SELECT ... FOR UPDATE` before checking it. Concurrent bookings on the same
//! ride queue on that lock, so the seat check always sees the latest
//! `seats_booked`. A transaction dropped on an error path rolls back.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use ridesapp_core::{
    DriverDetails, Passenger, PassengerId, PassengerStatus, PaymentMethod, Place, Rating,
    RatingId, Ride, RideFilter, RideId, RideStatus, RideType, User, UserId, UserRole,
};

use crate::error::{Result, StoreError};
use crate::schema::{table, PASSENGER_COLUMNS, RATING_COLUMNS, RIDE_COLUMNS, USER_COLUMNS};
use crate::{Booking, LeaveOutcome, RideChange, Store};

/// PostgreSQL-backed storage implementation.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` with at most `max_connections` connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be reached.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(format!("failed to connect: {e}")))?;

        Ok(Self::new(pool))
    }

    /// Run the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn lock_ride(tx: &mut Transaction<'_, Postgres>, id: RideId) -> Result<Ride> {
        let sql = format!(
            "SELECT {RIDE_COLUMNS} FROM {} WHERE id = $1 FOR UPDATE",
            table::RIDES
        );
        let row = sqlx::query_as::<_, RideRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| StoreError::not_found("ride", id))?;
        tracing::debug!(ride_id = %id, "Ride row locked");
        row.try_into()
    }

    async fn user_exists(tx: &mut Transaction<'_, Postgres>, id: UserId) -> Result<bool> {
        let sql = format!("SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1)", table::USERS);
        let exists = sqlx::query_scalar::<_, bool>(&sql)
            .bind(id.as_uuid())
            .fetch_one(&mut **tx)
            .await?;
        Ok(exists)
    }

    async fn write_ride(tx: &mut Transaction<'_, Postgres>, ride: &Ride) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET status = $2, driver_id = $3, seats_booked = $4, \
             started_at = $5, completed_at = $6, updated_at = $7 WHERE id = $1",
            table::RIDES
        );
        sqlx::query(&sql)
            .bind(ride.id.as_uuid())
            .bind(ride.status.as_str())
            .bind(ride.driver_id.map(|d| *d.as_uuid()))
            .bind(ride.seats_booked)
            .bind(ride.started_at)
            .bind(ride.completed_at)
            .bind(ride.updated_at)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

/// Map insert failures caused by constraints to store errors.
fn insert_error(entity: &'static str, key: String, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            tracing::debug!(entity, key = %key, "Unique violation on insert");
            return StoreError::Duplicate { entity, key };
        }
        if db.is_foreign_key_violation() {
            let constraint = db.constraint().unwrap_or_default();
            tracing::debug!(entity, constraint, "Foreign key violation on insert");
            let referenced = if constraint.contains("ride_id") { "ride" } else { "user" };
            return StoreError::NotFound {
                entity: referenced,
                id: constraint.to_string(),
            };
        }
    }
    StoreError::from(err)
}

fn parse<T>(column: &str, value: &str) -> Result<T>
where
    T: FromStr,
{
    value
        .parse()
        .map_err(|_| StoreError::Serialization(format!("bad {column} value: {value}")))
}

// ============================================================================
// Rows
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    phone: String,
    role: String,
    profile_picture: Option<String>,
    rating: f64,
    is_verified: bool,
    license_number: Option<String>,
    vehicle_model: Option<String>,
    vehicle_color: Option<String>,
    vehicle_plate: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(Self {
            id: UserId::from_uuid(row.id),
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            role: parse::<UserRole>("role", &row.role)?,
            profile_picture: row.profile_picture,
            rating: row.rating,
            is_verified: row.is_verified,
            driver: DriverDetails {
                license_number: row.license_number,
                vehicle_model: row.vehicle_model,
                vehicle_color: row.vehicle_color,
                vehicle_plate: row.vehicle_plate,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RideRow {
    id: Uuid,
    ride_type: String,
    rider_id: Uuid,
    driver_id: Option<Uuid>,
    pickup_lat: f64,
    pickup_lng: f64,
    pickup_address: String,
    dropoff_lat: f64,
    dropoff_lng: f64,
    dropoff_address: String,
    status: String,
    price_cents: i64,
    distance_km: f64,
    duration_minutes: i32,
    seats_available: i32,
    seats_booked: i32,
    departure_time: Option<DateTime<Utc>>,
    payment_method: String,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RideRow> for Ride {
    type Error = StoreError;

    fn try_from(row: RideRow) -> Result<Self> {
        Ok(Self {
            id: RideId::from_uuid(row.id),
            ride_type: parse::<RideType>("ride_type", &row.ride_type)?,
            rider_id: UserId::from_uuid(row.rider_id),
            driver_id: row.driver_id.map(UserId::from_uuid),
            pickup: Place {
                lat: row.pickup_lat,
                lng: row.pickup_lng,
                address: row.pickup_address,
            },
            dropoff: Place {
                lat: row.dropoff_lat,
                lng: row.dropoff_lng,
                address: row.dropoff_address,
            },
            status: parse::<RideStatus>("status", &row.status)?,
            price_cents: row.price_cents,
            distance_km: row.distance_km,
            duration_minutes: row.duration_minutes,
            seats_available: row.seats_available,
            seats_booked: row.seats_booked,
            departure_time: row.departure_time,
            payment_method: parse::<PaymentMethod>("payment_method", &row.payment_method)?,
            started_at: row.started_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PassengerRow {
    id: Uuid,
    ride_id: Uuid,
    user_id: Uuid,
    seats: i32,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PassengerRow> for Passenger {
    type Error = StoreError;

    fn try_from(row: PassengerRow) -> Result<Self> {
        Ok(Self {
            id: PassengerId::from_uuid(row.id),
            ride_id: RideId::from_uuid(row.ride_id),
            user_id: UserId::from_uuid(row.user_id),
            seats: row.seats,
            status: parse::<PassengerStatus>("status", &row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RatingRow {
    id: Uuid,
    ride_id: Uuid,
    from_user_id: Uuid,
    to_user_id: Uuid,
    rating: i32,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RatingRow> for Rating {
    fn from(row: RatingRow) -> Self {
        Self {
            id: RatingId::from_uuid(row.id),
            ride_id: RideId::from_uuid(row.ride_id),
            from_user_id: UserId::from_uuid(row.from_user_id),
            to_user_id: UserId::from_uuid(row.to_user_id),
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ============================================================================
// Store
// ============================================================================

#[async_trait]
impl Store for PgStore {
    // =========================================================================
    // User Operations
    // =========================================================================

    async fn insert_user(&self, user: &User) -> Result<()> {
        let email = ridesapp_core::normalize_email(&user.email);
        let sql = format!(
            "INSERT INTO {} ({USER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
            table::USERS
        );
        sqlx::query(&sql)
            .bind(user.id.as_uuid())
            .bind(&email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.phone)
            .bind(user.role.as_str())
            .bind(&user.profile_picture)
            .bind(user.rating)
            .bind(user.is_verified)
            .bind(&user.driver.license_number)
            .bind(&user.driver.vehicle_model)
            .bind(&user.driver.vehicle_color)
            .bind(&user.driver.vehicle_plate)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| insert_error("user", email.clone(), e))?;
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET first_name = $2, last_name = $3, phone = $4, profile_picture = $5, \
             rating = $6, is_verified = $7, license_number = $8, vehicle_model = $9, \
             vehicle_color = $10, vehicle_plate = $11, updated_at = $12 WHERE id = $1",
            table::USERS
        );
        let result = sqlx::query(&sql)
            .bind(user.id.as_uuid())
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.phone)
            .bind(&user.profile_picture)
            .bind(user.rating)
            .bind(user.is_verified)
            .bind(&user.driver.license_number)
            .bind(&user.driver.vehicle_model)
            .bind(&user.driver.vehicle_color)
            .bind(&user.driver.vehicle_plate)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("user", user.id));
        }
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM {} WHERE id = $1", table::USERS);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM {} WHERE email = $1", table::USERS);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(ridesapp_core::normalize_email(email))
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn get_users(&self, ids: &[UserId]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let sql = format!("SELECT {USER_COLUMNS} FROM {} WHERE id = ANY($1)", table::USERS);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(uuids)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    // =========================================================================
    // Ride Operations
    // =========================================================================

    async fn insert_ride(&self, ride: &Ride) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} ({RIDE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, \
             $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)",
            table::RIDES
        );
        sqlx::query(&sql)
            .bind(ride.id.as_uuid())
            .bind(ride.ride_type.as_str())
            .bind(ride.rider_id.as_uuid())
            .bind(ride.driver_id.map(|d| *d.as_uuid()))
            .bind(ride.pickup.lat)
            .bind(ride.pickup.lng)
            .bind(&ride.pickup.address)
            .bind(ride.dropoff.lat)
            .bind(ride.dropoff.lng)
            .bind(&ride.dropoff.address)
            .bind(ride.status.as_str())
            .bind(ride.price_cents)
            .bind(ride.distance_km)
            .bind(ride.duration_minutes)
            .bind(ride.seats_available)
            .bind(ride.seats_booked)
            .bind(ride.departure_time)
            .bind(ride.payment_method.as_str())
            .bind(ride.started_at)
            .bind(ride.completed_at)
            .bind(ride.created_at)
            .bind(ride.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| insert_error("ride", ride.id.to_string(), e))?;
        Ok(())
    }

    async fn get_ride(&self, id: RideId) -> Result<Option<Ride>> {
        let sql = format!("SELECT {RIDE_COLUMNS} FROM {} WHERE id = $1", table::RIDES);
        sqlx::query_as::<_, RideRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Ride::try_from)
            .transpose()
    }

    async fn list_rides(&self, filter: &RideFilter) -> Result<Vec<Ride>> {
        let base = format!("SELECT {RIDE_COLUMNS} FROM {}", table::RIDES);
        let shared_pending = "ride_type = 'shared' AND status = 'pending'";

        let query = match filter {
            RideFilter::Rider(rider) => {
                let sql = format!("{base} WHERE rider_id = $1 ORDER BY created_at DESC, id DESC");
                sqlx::query_as::<_, RideRow>(&sql)
                    .bind(*rider.as_uuid())
                    .fetch_all(&self.pool)
                    .await
            }
            RideFilter::Driver(driver) => {
                let sql = format!("{base} WHERE driver_id = $1 ORDER BY created_at DESC, id DESC");
                sqlx::query_as::<_, RideRow>(&sql)
                    .bind(*driver.as_uuid())
                    .fetch_all(&self.pool)
                    .await
            }
            RideFilter::AvailableShared => {
                let sql = format!(
                    "{base} WHERE {shared_pending} AND seats_booked < seats_available \
                     ORDER BY departure_time ASC, id ASC"
                );
                sqlx::query_as::<_, RideRow>(&sql)
                    .fetch_all(&self.pool)
                    .await
            }
            RideFilter::UpcomingShared { after } => {
                let sql = format!(
                    "{base} WHERE {shared_pending} AND departure_time > $1 \
                     ORDER BY departure_time ASC, id ASC"
                );
                sqlx::query_as::<_, RideRow>(&sql)
                    .bind(*after)
                    .fetch_all(&self.pool)
                    .await
            }
        };

        query?.into_iter().map(Ride::try_from).collect()
    }

    async fn update_ride(&self, id: RideId, change: RideChange) -> Result<Ride> {
        let mut tx = self.pool.begin().await?;
        let mut ride = Self::lock_ride(&mut tx, id).await?;

        match change {
            RideChange::Status(status) => ride.transition_to(status)?,
            RideChange::Accept { driver } => {
                if !Self::user_exists(&mut tx, driver).await? {
                    return Err(StoreError::not_found("user", driver));
                }
                ride.accept(driver)?;
            }
        }

        if ride.status == RideStatus::Accepted {
            let sql = format!(
                "UPDATE {} SET status = $2, updated_at = $3 WHERE ride_id = $1 AND status = $4",
                table::PASSENGERS
            );
            sqlx::query(&sql)
                .bind(id.as_uuid())
                .bind(PassengerStatus::Confirmed.as_str())
                .bind(ride.updated_at)
                .bind(PassengerStatus::Requested.as_str())
                .execute(&mut *tx)
                .await?;
        }

        Self::write_ride(&mut tx, &ride).await?;
        tx.commit().await?;
        Ok(ride)
    }

    // =========================================================================
    // Compound Seat Operations
    // =========================================================================

    async fn join_ride(&self, ride_id: RideId, user: UserId, seats: i32) -> Result<Booking> {
        let mut tx = self.pool.begin().await?;
        let mut ride = Self::lock_ride(&mut tx, ride_id).await?;

        if !Self::user_exists(&mut tx, user).await? {
            return Err(StoreError::not_found("user", user));
        }

        let passenger = Passenger::new(&ride, user, seats)?;
        ride.reserve_seats(seats)?;

        Self::write_ride(&mut tx, &ride).await?;

        let sql = format!(
            "INSERT INTO {} ({PASSENGER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            table::PASSENGERS
        );
        sqlx::query(&sql)
            .bind(passenger.id.to_uuid())
            .bind(passenger.ride_id.as_uuid())
            .bind(passenger.user_id.as_uuid())
            .bind(passenger.seats)
            .bind(passenger.status.as_str())
            .bind(passenger.created_at)
            .bind(passenger.updated_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Booking { passenger, ride })
    }

    async fn leave_ride(&self, passenger_id: PassengerId) -> Result<LeaveOutcome> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT ride_id FROM {} WHERE id = $1", table::PASSENGERS);
        let ride_id = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(passenger_id.to_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .map(RideId::from_uuid)
            .ok_or_else(|| StoreError::not_found("passenger", passenger_id))?;

        let mut ride = Self::lock_ride(&mut tx, ride_id).await?;

        // A concurrent leave may have removed the row while we waited on the lock.
        let sql = format!(
            "DELETE FROM {} WHERE id = $1 RETURNING {PASSENGER_COLUMNS}",
            table::PASSENGERS
        );
        let passenger: Passenger = sqlx::query_as::<_, PassengerRow>(&sql)
            .bind(passenger_id.to_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::not_found("passenger", passenger_id))?
            .try_into()?;

        let release = ride.release_seats(passenger.seats);
        Self::write_ride(&mut tx, &ride).await?;

        tx.commit().await?;
        Ok(LeaveOutcome {
            passenger,
            ride,
            release,
        })
    }

    async fn get_passenger(&self, id: PassengerId) -> Result<Option<Passenger>> {
        let sql = format!(
            "SELECT {PASSENGER_COLUMNS} FROM {} WHERE id = $1",
            table::PASSENGERS
        );
        sqlx::query_as::<_, PassengerRow>(&sql)
            .bind(id.to_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Passenger::try_from)
            .transpose()
    }

    async fn list_passengers(&self, ride: RideId) -> Result<Vec<Passenger>> {
        let sql = format!(
            "SELECT {PASSENGER_COLUMNS} FROM {} WHERE ride_id = $1 ORDER BY id ASC",
            table::PASSENGERS
        );
        sqlx::query_as::<_, PassengerRow>(&sql)
            .bind(ride.as_uuid())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Passenger::try_from)
            .collect()
    }

    async fn list_passengers_for(&self, rides: &[RideId]) -> Result<Vec<Passenger>> {
        if rides.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {PASSENGER_COLUMNS} FROM {} WHERE ride_id = ANY($1) ORDER BY id ASC",
            table::PASSENGERS
        );
        let ids: Vec<Uuid> = rides.iter().map(|r| *r.as_uuid()).collect();
        sqlx::query_as::<_, PassengerRow>(&sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Passenger::try_from)
            .collect()
    }

    // =========================================================================
    // Rating Operations
    // =========================================================================

    async fn insert_rating(&self, rating: &Rating) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} ({RATING_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            table::RATINGS
        );
        sqlx::query(&sql)
            .bind(rating.id.to_uuid())
            .bind(rating.ride_id.as_uuid())
            .bind(rating.from_user_id.as_uuid())
            .bind(rating.to_user_id.as_uuid())
            .bind(rating.rating)
            .bind(&rating.comment)
            .bind(rating.created_at)
            .bind(rating.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| insert_error("rating", rating.id.to_string(), e))?;
        Ok(())
    }

    async fn list_ratings(&self, ride: RideId) -> Result<Vec<Rating>> {
        let sql = format!(
            "SELECT {RATING_COLUMNS} FROM {} WHERE ride_id = $1 ORDER BY id ASC",
            table::RATINGS
        );
        let rows = sqlx::query_as::<_, RatingRow>(&sql)
            .bind(ride.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Rating::from).collect())
    }
}
