//! Custom error types for the common library
//!
//! This module defines application-specific error types that can be used
//! throughout the application.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// PostgreSQL SQLSTATE for `exclusion_violation`
const EXCLUSION_VIOLATION: &str = "23P01";

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

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),

    /// A unique or exclusion constraint rejected the write
    #[error("Database constraint violated: {0}")]
    Constraint(String),
}

impl DatabaseError {
    /// Classify a query failure, surfacing unique and exclusion violations as
    /// [`DatabaseError::Constraint`] carrying the constraint name.
    pub fn from_query(err: SqlxError) -> Self {
        if let Some(db_err) = err.as_database_error() {
            let is_exclusion = db_err.code().as_deref() == Some(EXCLUSION_VIOLATION);
            if db_err.is_unique_violation() || is_exclusion {
                if let Some(constraint) = db_err.constraint() {
                    return DatabaseError::Constraint(constraint.to_string());
                }
            }
        }
        DatabaseError::Query(err)
    }

    /// Name of the violated constraint, if this is a constraint error
    pub fn constraint(&self) -> Option<&str> {
        match self {
            DatabaseError::Constraint(name) => Some(name),
            _ => None,
        }
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;
