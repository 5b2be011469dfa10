use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use api::{
    AppConfig, AppState, create_router,
    gateway::{RazorpayConfig, RazorpayGateway},
    store::PgStore,
};
use auth::{JwtConfig, JwtService, PasswordService, RateLimiter};
use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting homestay API service");

    let app_config = AppConfig::load().context("Failed to load server configuration")?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;
    run_migrations(&pool).await?;

    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let jwt = JwtService::new(JwtConfig::from_env()?);
    let gateway = RazorpayGateway::new(RazorpayConfig::from_env()?)?;

    let state = AppState::new(
        app_config.clone(),
        Arc::new(PgStore::new(pool)),
        jwt,
        PasswordService::new(),
        RateLimiter::default(),
        Arc::new(gateway),
    );

    // Start the web server
    let app = create_router(state);

    let address = app_config.bind_address();
    let listener = TcpListener::bind(&address).await?;
    info!(
        "API service listening on {} (commission {}%, currency {})",
        address, app_config.commission_percent, app_config.currency
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API service stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutting down API service");
}
