//! Custom error types for the API service
//!
//! Every failure leaves the service as the uniform envelope
//! `{"success": false, "error": CODE, "message": ..., "field"?: ...}`.

use auth::AuthError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::DatabaseError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::pricing::PricingError;

/// Machine-readable error codes sent to clients
pub mod codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const NO_TOKEN: &str = "NO_TOKEN";
    pub const INVALID_TOKEN: &str = "INVALID_TOKEN";
    pub const INVALID_CREDENTIALS: &str = "INVALID_CREDENTIALS";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const ACCOUNT_SUSPENDED: &str = "ACCOUNT_SUSPENDED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const LISTING_NOT_FOUND: &str = "LISTING_NOT_FOUND";
    pub const BOOKING_NOT_FOUND: &str = "BOOKING_NOT_FOUND";
    pub const REVIEW_NOT_FOUND: &str = "REVIEW_NOT_FOUND";
    pub const USER_NOT_FOUND: &str = "USER_NOT_FOUND";
    pub const USER_ALREADY_EXISTS: &str = "USER_ALREADY_EXISTS";
    pub const DOUBLE_BOOKING: &str = "DOUBLE_BOOKING";
    pub const REVIEW_EXISTS: &str = "REVIEW_EXISTS";
    pub const INVALID_STATE: &str = "INVALID_STATE";
    pub const RATE_LIMITED: &str = "RATE_LIMITED";
    pub const PAYMENT_FAILED: &str = "PAYMENT_FAILED";
    pub const PAYMENT_VERIFICATION_FAILED: &str = "PAYMENT_VERIFICATION_FAILED";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        field: Option<String>,
        message: String,
    },

    #[error("{message}")]
    Unauthorized { code: &'static str, message: String },

    #[error("{message}")]
    Forbidden { code: &'static str, message: String },

    #[error("{message}")]
    NotFound { code: &'static str, message: String },

    #[error("{message}")]
    Conflict { code: &'static str, message: String },

    /// The entity is not in a state that allows the operation
    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    TooManyRequests(String),

    /// Gateway rejected the operation or the checkout proof did not verify
    #[error("{message}")]
    PaymentFailed {
        status: StatusCode,
        code: &'static str,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn unauthorized(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Unauthorized {
            code,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden {
            code: codes::FORBIDDEN,
            message: message.into(),
        }
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::NotFound {
            code,
            message: message.into(),
        }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        ApiError::InvalidState(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::InvalidState(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::PaymentFailed { status, .. } => *status,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => codes::VALIDATION_ERROR,
            ApiError::Unauthorized { code, .. }
            | ApiError::Forbidden { code, .. }
            | ApiError::NotFound { code, .. }
            | ApiError::Conflict { code, .. }
            | ApiError::PaymentFailed { code, .. } => *code,
            ApiError::InvalidState(_) => codes::INVALID_STATE,
            ApiError::TooManyRequests(_) => codes::RATE_LIMITED,
            ApiError::Database(_) | ApiError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation { field, message } => ApiError::Validation {
                field: Some(field.to_string()),
                message,
            },
            AuthError::InvalidToken(_) => {
                ApiError::unauthorized(codes::INVALID_TOKEN, "Invalid or expired token")
            }
            other => ApiError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl From<PricingError> for ApiError {
    fn from(err: PricingError) -> Self {
        ApiError::Validation {
            field: None,
            message: err.to_string(),
        }
    }
}

/// Failure envelope
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: &'static str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'a str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() && !matches!(self, ApiError::PaymentFailed { .. })
        {
            error!("Request failed: {:?}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let field = match &self {
            ApiError::Validation { field, .. } => field.as_deref(),
            _ => None,
        };

        let body = ErrorBody {
            success: false,
            error: self.code(),
            message: &message,
            field,
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
