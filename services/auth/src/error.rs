//! Errors raised by the authentication primitives

use thiserror::Error;

/// Error type for token, password and validation operations
#[derive(Error, Debug)]
pub enum AuthError {
    /// Required configuration is missing or malformed
    #[error("Auth configuration error: {0}")]
    Configuration(String),

    /// A client-supplied value failed validation
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// The token could not be decoded, has a bad signature or has expired
    #[error("Invalid token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    /// Signing a token failed
    #[error("Failed to sign token: {0}")]
    TokenSigning(#[source] jsonwebtoken::errors::Error),

    /// Password hashing failed
    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

impl AuthError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AuthError::Validation {
            field,
            message: message.into(),
        }
    }
}

/// Type alias for Result with AuthError
pub type AuthResult<T> = Result<T, AuthError>;
