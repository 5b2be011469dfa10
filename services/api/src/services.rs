//! Business logic between the HTTP handlers and the store
//!
//! Services own authorization and validation; handlers only extract input and
//! wrap results in the response envelope.

use common::error::DatabaseError;

use crate::error::{ApiError, ApiResult};

pub mod auth;
pub mod bookings;
pub mod listings;
pub mod reviews;

pub use auth::AuthService;
pub use bookings::BookingService;
pub use listings::ListingService;
pub use reviews::ReviewService;

/// Turn a violation of `constraint` into `conflict`; other failures stay database errors
fn on_constraint(
    err: DatabaseError,
    constraint: &str,
    conflict: impl FnOnce() -> ApiError,
) -> ApiError {
    if err.constraint() == Some(constraint) {
        conflict()
    } else {
        ApiError::Database(err)
    }
}

/// Trimmed, non-empty text
fn required_text(field: &'static str, value: &str, label: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(field, format!("{} is required", label)));
    }
    Ok(trimmed.to_string())
}

/// Trimmed text, with blank input treated as absent
fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
