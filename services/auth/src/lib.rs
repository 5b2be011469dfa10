//! Authentication primitives for the marketplace API
//!
//! Session tokens (HS256 JWT), argon2 password hashing, login rate limiting,
//! account input validation and the user model.

pub mod error;
pub mod jwt;
pub mod models;
pub mod password;
pub mod rate_limiter;
pub mod validation;

pub use error::{AuthError, AuthResult};
pub use jwt::{Claims, JwtConfig, JwtService};
pub use models::{NewUser, Role, User};
pub use password::PasswordService;
pub use rate_limiter::{RateLimiter, RateLimiterConfig};
