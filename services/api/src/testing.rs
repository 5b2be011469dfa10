//! Test fixtures: an in-memory application with a fake payment gateway

use async_trait::async_trait;
use auth::{JwtConfig, JwtService, NewUser, PasswordService, RateLimiter, Role};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    gateway::{
        ExternalOrder, GatewayError, GatewayRefund, OrderRequest, PaymentGateway,
        checkout_signature, verify_checkout_signature,
    },
    middleware::AuthUser,
    models::{
        Booking, CreateListingRequest, Listing, NewBooking, NewPayment, PaymentConfirmation,
    },
    pricing::{self, DEFAULT_COMMISSION_PERCENT},
    state::AppState,
    store::{BookingStore, Store, UserStore, memory::MemoryStore},
};

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";
pub const TEST_GATEWAY_SECRET: &str = "test-gateway-secret";

/// Checkout signature the fake gateway accepts
pub fn sign(order_id: &str, payment_id: &str) -> String {
    checkout_signature(TEST_GATEWAY_SECRET, order_id, payment_id).expect("hmac accepts any key")
}

/// Midnight UTC `days` from today
pub fn days_from_today(days: i64) -> DateTime<Utc> {
    let midnight = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is valid")
        .and_utc();
    midnight + Duration::days(days)
}

/// `YYYY-MM-DD` check-in and check-out relative to today
pub fn stay_dates(from: i64, to: i64) -> (String, String) {
    let format = |days| days_from_today(days).format("%Y-%m-%d").to_string();
    (format(from), format(to))
}

pub fn listing_request(city: &str, price_per_night: i64) -> CreateListingRequest {
    CreateListingRequest {
        title: format!("Cottage in {}", city),
        description: "Quiet two-bedroom cottage".to_string(),
        price_per_night,
        max_guests: 4,
        bedrooms: 2,
        bathrooms: 1,
        city: city.to_string(),
        state: None,
        address: "12 Palm Grove".to_string(),
        zip_code: None,
        lat: Some(15.49),
        lng: Some(73.82),
        amenities: vec!["wifi".to_string()],
        rules_and_policies: None,
        cancellation_policy: None,
    }
}

/// Gateway double recording its calls
#[derive(Default)]
pub struct FakeGateway {
    orders: Mutex<Vec<OrderRequest>>,
    refunds: Mutex<Vec<(String, i64)>>,
    failing: AtomicBool,
}

impl FakeGateway {
    pub fn fail_next_calls(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub async fn orders(&self) -> Vec<OrderRequest> {
        self.orders.lock().await.clone()
    }

    pub async fn refunds(&self) -> Vec<(String, i64)> {
        self.refunds.lock().await.clone()
    }

    fn check_available(&self) -> Result<(), GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Rejected {
                status: 503,
                body: "gateway unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(&self, request: OrderRequest) -> Result<ExternalOrder, GatewayError> {
        self.check_available()?;

        let order = ExternalOrder {
            id: format!("order_{}", Uuid::new_v4().simple()),
            amount: request.amount,
            currency: request.currency.clone(),
            receipt: Some(request.receipt.clone()),
            status: "created".to_string(),
        };
        self.orders.lock().await.push(request);
        Ok(order)
    }

    async fn refund(&self, payment_id: &str, amount: i64) -> Result<GatewayRefund, GatewayError> {
        self.check_available()?;

        self.refunds
            .lock()
            .await
            .push((payment_id.to_string(), amount));
        Ok(GatewayRefund {
            id: format!("rfnd_{}", Uuid::new_v4().simple()),
            amount,
            status: "processed".to_string(),
        })
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_checkout_signature(TEST_GATEWAY_SECRET, order_id, payment_id, signature)
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        frontend_url: "http://localhost:5173".to_string(),
        commission_percent: DEFAULT_COMMISSION_PERCENT,
        currency: "INR".to_string(),
    }
}

/// Application wired to a fresh in-memory store
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<FakeGateway>,
    pub state: AppState,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(FakeGateway::default());
        let jwt = JwtService::new(JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            expires_in: 3600,
        });
        let passwords = PasswordService::with_params(1024, 1, 1).expect("valid argon2 params");

        let state = AppState::new(
            test_config(),
            store.clone() as Arc<dyn Store>,
            jwt,
            passwords,
            RateLimiter::default(),
            gateway.clone() as Arc<dyn PaymentGateway>,
        );

        Self {
            store,
            gateway,
            state,
        }
    }

    /// Persist a user with `role` and return its identity
    pub async fn auth_user(&self, role: Role) -> AuthUser {
        let user = self
            .store
            .insert_user(NewUser {
                email: format!("{}-{}@example.com", role, Uuid::new_v4().simple()),
                password_hash: "unused".to_string(),
                first_name: Some("Test".to_string()),
                last_name: Some(role.to_string()),
                phone: None,
                role,
            })
            .await
            .unwrap();

        AuthUser {
            id: user.id,
            email: user.email,
            role: user.role,
        }
    }

    /// Bearer token for a persisted user
    pub async fn token(&self, user: &AuthUser) -> String {
        let user = self.store.find_user_by_id(user.id).await.unwrap().unwrap();
        self.state.jwt.generate_token(&user).unwrap()
    }

    pub async fn listing(&self, host: &AuthUser, price_per_night: i64) -> Listing {
        self.state
            .listings
            .create(host, listing_request("Goa", price_per_night))
            .await
            .unwrap()
    }

    /// Confirmed booking written straight to the store, bypassing date checks
    pub async fn confirmed_booking(
        &self,
        listing: &Listing,
        guest: &AuthUser,
        from: i64,
        to: i64,
    ) -> Booking {
        let check_in = days_from_today(from);
        let check_out = days_from_today(to);
        let nights = pricing::nights_between(check_in, check_out);
        let quote =
            pricing::quote(listing.price_per_night, nights, DEFAULT_COMMISSION_PERCENT).unwrap();

        let (booking, _) = self
            .store
            .insert_booking_with_payment(
                NewBooking {
                    listing_id: listing.id,
                    guest_id: guest.id,
                    host_id: listing.host_id,
                    check_in,
                    check_out,
                    number_of_guests: 1,
                    number_of_nights: nights as i32,
                    price_per_night: quote.price_per_night,
                    subtotal: quote.subtotal,
                    platform_fee: quote.platform_fee,
                    total_price: quote.total_price,
                },
                NewPayment {
                    gateway_order_id: format!("order_{}", Uuid::new_v4().simple()),
                    amount: quote.total_price,
                    currency: "INR".to_string(),
                },
            )
            .await
            .unwrap();

        self.store
            .confirm_booking(
                booking.id,
                PaymentConfirmation {
                    gateway_payment_id: "pay_test".to_string(),
                    gateway_signature: "sig_test".to_string(),
                },
            )
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn completed_booking(
        &self,
        listing: &Listing,
        guest: &AuthUser,
        from: i64,
        to: i64,
    ) -> Booking {
        let booking = self.confirmed_booking(listing, guest, from, to).await;
        self.store
            .complete_booking(booking.id)
            .await
            .unwrap()
            .unwrap()
    }
}
