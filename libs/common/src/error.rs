//! Custom error types for the common library
//!
//! This module defines the persistence error type shared by every store
//! in the workspace.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// A stored value could not be mapped back into a domain type
    #[error("Database decode error: {0}")]
    Decode(String),

    /// A uniqueness constraint rejected the write
    #[error("Duplicate value for {0}")]
    Duplicate(String),
}

impl DatabaseError {
    /// Map a query error, surfacing unique violations as [`DatabaseError::Duplicate`].
    pub fn from_query(err: SqlxError) -> Self {
        if let SqlxError::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unique constraint").to_string();
                return DatabaseError::Duplicate(constraint);
            }
        }
        DatabaseError::Query(err)
    }
}

impl From<SqlxError> for DatabaseError {
    fn from(err: SqlxError) -> Self {
        DatabaseError::from_query(err)
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;
