//! Request extractors whose rejections use the API error envelope

use axum::extract::{
    FromRequest, FromRequestParts,
    rejection::{JsonRejection, PathRejection, QueryRejection},
};
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

use crate::error::ApiError;

/// JSON body; malformed input becomes `VALIDATION_ERROR`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string; malformed input becomes `VALIDATION_ERROR`
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Path parameters; malformed ids become `VALIDATION_ERROR`
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Best-effort name of the offending field in a serde error message
fn field_from_message(message: &str) -> Option<String> {
    static MISSING_FIELD: OnceLock<Regex> = OnceLock::new();
    static FIELD_PATH: OnceLock<Regex> = OnceLock::new();

    let missing = MISSING_FIELD
        .get_or_init(|| Regex::new(r"(?:missing|unknown) field `([^`]+)`").expect("valid regex"));
    if let Some(caps) = missing.captures(message) {
        return Some(caps[1].to_string());
    }

    let path = FIELD_PATH.get_or_init(|| {
        Regex::new(r"(?:target type|query string): ([A-Za-z_][A-Za-z0-9_.]*): ").expect("valid regex")
    });
    path.captures(message).map(|caps| caps[1].to_string())
}

fn rejection_to_error(message: String) -> ApiError {
    warn!("Rejected request input: {}", message);
    ApiError::Validation {
        field: field_from_message(&message),
        message,
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        rejection_to_error(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        rejection_to_error(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        rejection_to_error(rejection.body_text())
    }
}
