//! Homestay marketplace API
//!
//! Listings, bookings with gateway-backed payments, and reviews over a
//! PostgreSQL schema, served as a JSON REST API.
//!
//! Requests flow router -> auth middleware -> handler -> service -> store.
//! Handlers wrap results as `{"success": true, "data": ...}`; failures are
//! rendered by [`error::ApiError`].

pub mod config;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod middleware;
pub mod models;
pub mod pricing;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

#[cfg(test)]
mod testing;

pub use crate::config::AppConfig;
pub use routes::create_router;
pub use state::AppState;
