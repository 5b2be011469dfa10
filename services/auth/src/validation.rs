//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{AuthError, AuthResult};

/// Longest accepted first or last name
pub const MAX_NAME_LENGTH: usize = 100;

/// Trim and lowercase an email so lookups are case-insensitive
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate email
pub fn validate_email(email: &str) -> AuthResult<()> {
    if email.is_empty() {
        return Err(AuthError::validation("email", "Email is required"));
    }

    if email.len() > 254 {
        return Err(AuthError::validation(
            "email",
            "Email must be at most 254 characters long",
        ));
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err(AuthError::validation("email", "Invalid email format"));
    }

    Ok(())
}

/// Validate password: 8 to 128 characters with at least one letter and one digit
pub fn validate_password(password: &str) -> AuthResult<()> {
    if password.is_empty() {
        return Err(AuthError::validation("password", "Password is required"));
    }

    let length = password.chars().count();

    if length < 8 {
        return Err(AuthError::validation(
            "password",
            "Password must be at least 8 characters long",
        ));
    }

    if length > 128 {
        return Err(AuthError::validation(
            "password",
            "Password must be at most 128 characters long",
        ));
    }

    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !has_letter {
        return Err(AuthError::validation(
            "password",
            "Password must contain at least one letter",
        ));
    }

    if !has_digit {
        return Err(AuthError::validation(
            "password",
            "Password must contain at least one digit",
        ));
    }

    Ok(())
}

/// Validate an optional first or last name
pub fn validate_name(field: &'static str, name: Option<&str>) -> AuthResult<()> {
    let Some(name) = name else {
        return Ok(());
    };

    if name.trim().is_empty() {
        return Err(AuthError::validation(field, "Name must not be blank"));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AuthError::validation(
            field,
            format!("Name must be at most {} characters long", MAX_NAME_LENGTH),
        ));
    }

    Ok(())
}

/// Validate an optional phone number (digits with optional `+`, spaces and dashes)
pub fn validate_phone(phone: Option<&str>) -> AuthResult<()> {
    let Some(phone) = phone else {
        return Ok(());
    };

    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = PHONE_REGEX
        .get_or_init(|| Regex::new(r"^\+?[0-9][0-9 -]{6,19}$").expect("Failed to compile phone regex"));

    if !regex.is_match(phone.trim()) {
        return Err(AuthError::validation("phone", "Invalid phone number"));
    }

    Ok(())
}
