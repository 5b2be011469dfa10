//! JWT service for token generation and validation
//!
//! Session tokens are signed with HS256 using a shared secret and carry the
//! user id, email and role so that protected routes can authorize without a
//! database round trip.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::models::{Role, User};

/// Default token lifetime: 7 days
pub const DEFAULT_EXPIRES_IN: u64 = 604_800;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared HMAC secret
    pub secret: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: HMAC signing secret (required)
    /// - `JWT_EXPIRES_IN`: Token lifetime in seconds (default: 604800)
    pub fn from_env() -> AuthResult<Self> {
        let secret = env::var("JWT_SECRET").map_err(|_| {
            AuthError::Configuration("JWT_SECRET environment variable not set".to_string())
        })?;

        if secret.trim().is_empty() {
            return Err(AuthError::Configuration(
                "JWT_SECRET must not be empty".to_string(),
            ));
        }

        let expires_in = env::var("JWT_EXPIRES_IN")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_EXPIRES_IN);

        Ok(JwtConfig { secret, expires_in })
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    /// Issued at time
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        }
    }

    /// Generate a session token for a user
    pub fn generate_token(&self, user: &User) -> AuthResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now,
            exp: now + self.config.expires_in as i64,
        };

        self.encode_claims(&claims)
    }

    fn encode_claims(&self, claims: &Claims) -> AuthResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(AuthError::TokenSigning)
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> AuthResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                warn!("Rejected token: {}", e);
                AuthError::InvalidToken(e)
            })
    }

    /// Get the token expiry time in seconds
    pub fn expires_in(&self) -> u64 {
        self.config.expires_in
    }
}
