//! Error types for ride storage.

use ridesapp_core::RideError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// A stored value could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// The key that was looked up.
        id: String,
    },

    /// A unique key is already taken.
    #[error("duplicate {entity}: {key}")]
    Duplicate {
        /// Kind of record.
        entity: &'static str,
        /// The conflicting key.
        key: String,
    },

    /// The transaction lost a serialization race or deadlocked and may be
    /// retried.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    /// A ride rule refused the change; nothing was written.
    #[error(transparent)]
    Rejected(#[from] RideError),
}

impl StoreError {
    /// Shorthand for a [`StoreError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Whether the operation may succeed if run again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<StoreError> for RideError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => RideError::NotFound { entity, id },
            StoreError::Rejected(inner) => inner,
            StoreError::Duplicate { entity, key } => {
                RideError::validation(format!("{entity} already exists: {key}"))
            }
            other => RideError::Storage(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound {
                entity: "row",
                id: String::new(),
            },
            sqlx::Error::Database(db) => match db.code().as_deref() {
                // serialization_failure, deadlock_detected
                Some(code @ ("40001" | "40P01")) => {
                    tracing::debug!(sqlstate = code, "Transaction conflict, retryable");
                    Self::Conflict(db.message().to_string())
                }
                _ => Self::Database(err.to_string()),
            },
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::Serialization(err.to_string())
            }
            _ => Self::Database(err.to_string()),
        }
    }
}
