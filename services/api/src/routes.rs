//! API service routes

use axum::{
    Extension, Json, Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use common::pagination::{PageQuery, PageRequest};
use serde::Serialize;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::warn;
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult, codes},
    extract::{ApiJson, ApiPath, ApiQuery},
    middleware::{AuthUser, auth_middleware},
    models::{
        CancelBookingRequest, CreateBookingRequest, CreateListingRequest, CreateReviewRequest,
        ListingSearchQuery, LoginRequest, RegisterRequest, ReplyReviewRequest, SuspensionRequest,
        UpdateListingRequest, VerifyPaymentRequest,
    },
};

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
        message: None,
    })
}

fn ok_with_message<T: Serialize>(data: T, message: &'static str) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
        message: Some(message),
    })
}

fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, ok(data))
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match HeaderValue::from_str(frontend_url) {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            warn!("Ignoring invalid frontend origin {:?} for CORS", frontend_url);
            cors
        }
    }
}

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/auth/me", get(current_user))
        .route("/api/listings", post(create_listing))
        .route("/api/listings/:id", put(update_listing).delete(delete_listing))
        .route("/api/listings/:id/reviews", post(create_review))
        .route("/api/host/listings", get(host_listings))
        .route("/api/host/bookings", get(host_bookings))
        .route("/api/reviews/:id/reply", post(reply_to_review))
        .route("/api/bookings", get(guest_bookings).post(create_booking))
        .route("/api/bookings/:id", get(get_booking))
        .route("/api/bookings/:id/cancel", post(cancel_booking))
        .route("/api/bookings/:id/payment/verify", post(verify_payment))
        .route("/api/bookings/:id/complete", post(complete_booking))
        .route("/api/bookings/:id/refund", post(refund_booking))
        .route("/api/admin/users/:id/suspension", put(set_suspension))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let public_routes = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/listings", get(search_listings))
        .route("/api/listings/:id", get(get_listing))
        .route("/api/listings/:id/reviews", get(listing_reviews));

    let cors = cors_layer(&state.config.frontend_url);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(route_not_found)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database_up = match state.store.ping().await {
        Ok(up) => up,
        Err(e) => {
            warn!("Health check could not reach the database: {}", e);
            false
        }
    };

    ok(HealthStatus {
        status: if database_up { "ok" } else { "degraded" },
        database: if database_up { "connected" } else { "disconnected" },
    })
}

async fn route_not_found() -> ApiError {
    ApiError::not_found(codes::NOT_FOUND, "Route not found")
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let response = state.auth.register(payload).await?;
    Ok(created(response))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let response = state.auth.login(payload).await?;
    Ok(ok(response))
}

pub async fn current_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.auth.current_user(&user).await?))
}

pub async fn set_suspension(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<SuspensionRequest>,
) -> ApiResult<impl IntoResponse> {
    let updated = state
        .auth
        .set_suspension(&user, id, payload.suspended)
        .await?;
    Ok(ok(updated))
}

pub async fn search_listings(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListingSearchQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.listings.search(query).await?))
}

pub async fn get_listing(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.listings.get(id).await?))
}

pub async fn create_listing(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<CreateListingRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(created(state.listings.create(&user, payload).await?))
}

pub async fn update_listing(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateListingRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.listings.update(&user, id, payload).await?))
}

pub async fn delete_listing(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let listing = state.listings.delete(&user, id).await?;
    Ok(ok_with_message(listing, "Listing deactivated"))
}

pub async fn host_listings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = PageRequest::from(page);
    Ok(ok(state.listings.host_listings(&user, page).await?))
}

pub async fn listing_reviews(
    State(state): State<AppState>,
    ApiPath(listing_id): ApiPath<Uuid>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = PageRequest::from(page);
    Ok(ok(state.reviews.list_for_listing(listing_id, page).await?))
}

pub async fn create_review(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(listing_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CreateReviewRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(created(state.reviews.create(&user, listing_id, payload).await?))
}

pub async fn reply_to_review(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<ReplyReviewRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.reviews.reply(&user, id, &payload.reply).await?))
}

pub async fn create_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<CreateBookingRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(created(state.bookings.create(&user, payload).await?))
}

pub async fn guest_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = PageRequest::from(page);
    Ok(ok(state.bookings.list_for_guest(&user, page).await?))
}

pub async fn host_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = PageRequest::from(page);
    Ok(ok(state.bookings.list_for_host(&user, page).await?))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.bookings.get(&user, id).await?))
}

/// The body is optional; a missing or unreadable one means no reason
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    payload: Option<ApiJson<CancelBookingRequest>>,
) -> ApiResult<impl IntoResponse> {
    let ApiJson(payload) = payload.unwrap_or_else(|| ApiJson(CancelBookingRequest::default()));
    let booking = state.bookings.cancel(&user, id, payload.reason).await?;
    Ok(ok_with_message(booking, "Booking cancelled"))
}

pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<VerifyPaymentRequest>,
) -> ApiResult<impl IntoResponse> {
    let booking = state.bookings.verify_payment(&user, id, payload).await?;
    Ok(ok_with_message(booking, "Payment verified"))
}

pub async fn complete_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.bookings.complete(&user, id).await?))
}

pub async fn refund_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let booking = state.bookings.refund(&user, id).await?;
    Ok(ok_with_message(booking, "Booking refunded"))
}
