//! Authentication middleware for JWT token validation

use auth::Role;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::{ApiError, codes},
    state::AppState,
};

/// Authenticated user information
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail with `FORBIDDEN` unless the user has `role` (admins always pass)
    pub fn require_role(&self, role: Role) -> Result<(), ApiError> {
        if self.role == role || self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "This action requires the {} role",
                role
            )))
        }
    }
}

/// Authentication middleware
///
/// Validates the bearer token and inserts the decoded [`AuthUser`] into the
/// request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or_else(|| {
        ApiError::unauthorized(codes::NO_TOKEN, "Authentication token is required")
    })?;

    let claims = state.jwt.validate_token(bearer.token()).map_err(|_| {
        warn!("Request with invalid token to {}", req.uri().path());
        ApiError::unauthorized(codes::INVALID_TOKEN, "Invalid or expired token")
    })?;

    let user = AuthUser {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
    };

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
