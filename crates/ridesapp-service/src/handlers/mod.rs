//! API handlers.

pub mod auth;
pub mod health;
pub mod rides;
pub mod users;

use std::str::FromStr;

use ridesapp_core::{IdError, RideError};

use crate::error::ApiError;

/// Parse an identifier taken from the request path.
fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = IdError>,
{
    raw.parse::<T>()
        .map_err(|e| RideError::InvalidId(e).into())
}
