//! Common library for the Homestay marketplace
//!
//! This crate provides shared functionality used across the services of the
//! marketplace: database connectivity and migrations, the database error type,
//! and pagination primitives.

pub mod database;
pub mod error;
pub mod pagination;

/// Example usage of the database module
///
/// ```rust,no_run
/// use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig::from_env()?;
///     let pool = init_pool(&config).await?;
///     run_migrations(&pool).await?;
///     let is_healthy = health_check(&pool).await?;
///     println!("Database health check: {}", is_healthy);
///     Ok(())
/// }
/// ```
pub use database::{DatabaseConfig, health_check, init_pool, run_migrations};
