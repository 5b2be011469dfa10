//! Application state shared across handlers

use auth::{JwtService, PasswordService, RateLimiter};
use std::sync::Arc;

use crate::{
    config::AppConfig,
    gateway::PaymentGateway,
    services::{AuthService, BookingService, ListingService, ReviewService},
    store::Store,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub jwt: JwtService,
    pub auth: AuthService,
    pub listings: ListingService,
    pub bookings: BookingService,
    pub reviews: ReviewService,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn Store>,
        jwt: JwtService,
        passwords: PasswordService,
        limiter: RateLimiter,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let bookings = BookingService::new(
            store.clone(),
            gateway,
            config.commission_percent,
            config.currency.clone(),
        );

        Self {
            auth: AuthService::new(store.clone(), jwt.clone(), passwords, limiter),
            listings: ListingService::new(store.clone()),
            reviews: ReviewService::new(store.clone()),
            bookings,
            jwt,
            store,
            config: Arc::new(config),
        }
    }
}
