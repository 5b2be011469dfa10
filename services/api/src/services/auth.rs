//! Registration, login and account administration

use auth::{
    JwtService, NewUser, PasswordService, RateLimiter, Role, User,
    validation::{normalize_email, validate_email, validate_name, validate_password, validate_phone},
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{on_constraint, optional_text};
use crate::{
    error::{ApiError, ApiResult, codes},
    middleware::AuthUser,
    models::{AuthResponse, LoginRequest, RegisterRequest},
    store::{Store, USERS_EMAIL_KEY, UserStore},
};

const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    jwt: JwtService,
    passwords: PasswordService,
    limiter: RateLimiter,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn Store>,
        jwt: JwtService,
        passwords: PasswordService,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            store,
            jwt,
            passwords,
            limiter,
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> ApiResult<AuthResponse> {
        let email = normalize_email(&request.email);
        validate_email(&email)?;
        validate_password(&request.password)?;

        let first_name = optional_text(request.first_name);
        let last_name = optional_text(request.last_name);
        let phone = optional_text(request.phone);
        validate_name("firstName", first_name.as_deref())?;
        validate_name("lastName", last_name.as_deref())?;
        validate_phone(phone.as_deref())?;

        let role = request.role.unwrap_or_default();
        if role == Role::Admin {
            return Err(ApiError::validation(
                "role",
                "Admin accounts cannot be self-registered",
            ));
        }

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(already_registered());
        }

        let password_hash = self.passwords.hash(&request.password)?;
        let user = self
            .store
            .insert_user(NewUser {
                email,
                password_hash,
                first_name,
                last_name,
                phone,
                role,
            })
            .await
            .map_err(|e| on_constraint(e, USERS_EMAIL_KEY, already_registered))?;

        info!(user_id = %user.id, role = %user.role, "Registered user");
        self.respond_with_token(user)
    }

    pub async fn login(&self, request: LoginRequest) -> ApiResult<AuthResponse> {
        let email = normalize_email(&request.email);

        if !self.limiter.is_allowed(&email).await {
            return Err(ApiError::TooManyRequests(
                "Too many login attempts, please try again later".to_string(),
            ));
        }

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            self.passwords.verify_unknown_user(&request.password)?;
            warn!("Login attempt for unknown email");
            return Err(invalid_credentials());
        };

        if !self.passwords.verify(&request.password, &user.password_hash)? {
            warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(invalid_credentials());
        }

        if user.is_suspended {
            return Err(ApiError::Forbidden {
                code: codes::ACCOUNT_SUSPENDED,
                message: "This account has been suspended".to_string(),
            });
        }

        self.limiter.reset(&email).await;
        info!(user_id = %user.id, "User logged in");
        self.respond_with_token(user)
    }

    /// Stored profile of the authenticated user
    pub async fn current_user(&self, user: &AuthUser) -> ApiResult<User> {
        self.store
            .find_user_by_id(user.id)
            .await?
            .ok_or_else(user_not_found)
    }

    pub async fn set_suspension(
        &self,
        admin: &AuthUser,
        user_id: Uuid,
        suspended: bool,
    ) -> ApiResult<User> {
        admin.require_role(Role::Admin)?;

        let user = self
            .store
            .set_user_suspended(user_id, suspended)
            .await?
            .ok_or_else(user_not_found)?;

        info!(user_id = %user.id, suspended, admin_id = %admin.id, "Updated user suspension");
        Ok(user)
    }

    fn respond_with_token(&self, user: User) -> ApiResult<AuthResponse> {
        let token = self.jwt.generate_token(&user)?;
        Ok(AuthResponse { user, token })
    }
}

fn already_registered() -> ApiError {
    ApiError::conflict(
        codes::USER_ALREADY_EXISTS,
        "An account with this email already exists",
    )
}

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized(codes::INVALID_CREDENTIALS, INVALID_CREDENTIALS_MESSAGE)
}

fn user_not_found() -> ApiError {
    ApiError::not_found(codes::USER_NOT_FOUND, "User not found")
}
