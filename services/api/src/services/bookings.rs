//! Booking creation, payment confirmation and lifecycle transitions
//!
//! Creation pre-checks for confirmed overlaps, opens a gateway order, and then
//! persists the pending booking with its payment. The store repeats the
//! overlap check under a listing row lock, so a clash that slips past the
//! pre-check still surfaces as `DOUBLE_BOOKING`.

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::pagination::{Page, PageRequest};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{on_constraint, optional_text};
use crate::{
    error::{ApiError, ApiResult, codes},
    gateway::{GatewayError, OrderRequest, PaymentGateway},
    middleware::AuthUser,
    models::{
        Booking, BookingStatus, BookingWithListing, CreateBookingRequest, CreateBookingResponse,
        NewBooking, NewPayment, PaymentConfirmation, RefundRecord, VerifyPaymentRequest,
    },
    pricing::{self, DateRange, MAX_NIGHTS, nights_between, parse_stay_date},
    store::{BOOKINGS_NO_OVERLAP, BookingStore, ListingStore, Store},
};

/// Validated stay: dates, nights and party size
#[derive(Debug, Clone, Copy, PartialEq)]
struct StayRequest {
    stay: DateRange,
    nights: i64,
    guests: i32,
}

fn validate_stay(request: &CreateBookingRequest) -> ApiResult<StayRequest> {
    let check_in = parse_stay_date(&request.check_in)
        .ok_or_else(|| ApiError::validation("checkIn", "Check-in must be a valid date"))?;
    let check_out = parse_stay_date(&request.check_out)
        .ok_or_else(|| ApiError::validation("checkOut", "Check-out must be a valid date"))?;

    if check_out <= check_in {
        return Err(ApiError::validation(
            "checkOut",
            "Check-out must be after check-in",
        ));
    }

    let nights = nights_between(check_in, check_out);
    if nights < 1 {
        return Err(ApiError::validation(
            "checkOut",
            "A stay must be at least one night",
        ));
    }
    if nights > MAX_NIGHTS {
        return Err(ApiError::validation(
            "checkOut",
            format!("A stay cannot exceed {} nights", MAX_NIGHTS),
        ));
    }

    if check_in < Utc::now() - Duration::days(1) {
        return Err(ApiError::validation(
            "checkIn",
            "Check-in cannot be in the past",
        ));
    }

    if request.number_of_guests < 1 {
        return Err(ApiError::validation(
            "numberOfGuests",
            "At least one guest is required",
        ));
    }

    Ok(StayRequest {
        stay: DateRange::new(check_in, check_out),
        nights,
        guests: request.number_of_guests,
    })
}

fn gateway_failure(err: GatewayError) -> ApiError {
    error!("Payment gateway call failed: {}", err);
    ApiError::PaymentFailed {
        status: StatusCode::BAD_GATEWAY,
        code: codes::PAYMENT_FAILED,
        message: "Payment gateway request failed".to_string(),
    }
}

fn double_booking() -> ApiError {
    ApiError::conflict(
        codes::DOUBLE_BOOKING,
        "The listing is already booked for these dates",
    )
}

fn booking_not_found() -> ApiError {
    ApiError::not_found(codes::BOOKING_NOT_FOUND, "Booking not found")
}

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    commission_percent: u32,
    currency: String,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        commission_percent: u32,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            commission_percent,
            currency: currency.into(),
        }
    }

    pub async fn create(
        &self,
        guest: &AuthUser,
        request: CreateBookingRequest,
    ) -> ApiResult<CreateBookingResponse> {
        let stay = validate_stay(&request)?;

        let listing = self
            .store
            .find_listing(request.listing_id)
            .await?
            .filter(|l| l.is_active)
            .ok_or_else(|| ApiError::not_found(codes::LISTING_NOT_FOUND, "Listing not found"))?;

        if stay.guests > listing.max_guests {
            return Err(ApiError::validation(
                "numberOfGuests",
                format!("This listing accommodates at most {} guests", listing.max_guests),
            ));
        }

        if self
            .store
            .has_confirmed_overlap(listing.id, stay.stay, None)
            .await?
        {
            warn!(listing_id = %listing.id, "Rejected booking for unavailable dates");
            return Err(double_booking());
        }

        let quote = pricing::quote(listing.price_per_night, stay.nights, self.commission_percent)?;

        let notes = BTreeMap::from([
            ("listingId".to_string(), listing.id.to_string()),
            ("guestId".to_string(), guest.id.to_string()),
            ("hostId".to_string(), listing.host_id.to_string()),
        ]);
        let order = self
            .gateway
            .create_order(OrderRequest {
                amount: quote.total_price,
                currency: self.currency.clone(),
                receipt: format!("rcpt_{}", Uuid::new_v4().simple()),
                notes,
            })
            .await
            .map_err(gateway_failure)?;

        let booking = NewBooking {
            listing_id: listing.id,
            guest_id: guest.id,
            host_id: listing.host_id,
            check_in: stay.stay.start,
            check_out: stay.stay.end,
            number_of_guests: stay.guests,
            number_of_nights: stay.nights as i32,
            price_per_night: quote.price_per_night,
            subtotal: quote.subtotal,
            platform_fee: quote.platform_fee,
            total_price: quote.total_price,
        };
        let payment = NewPayment {
            gateway_order_id: order.id.clone(),
            amount: quote.total_price,
            currency: self.currency.clone(),
        };

        let (booking, _) = self
            .store
            .insert_booking_with_payment(booking, payment)
            .await
            .map_err(|e| on_constraint(e, BOOKINGS_NO_OVERLAP, double_booking))?;

        info!(
            booking_id = %booking.id,
            order_id = %order.id,
            total = booking.total_price,
            "Booking awaiting payment"
        );
        Ok(CreateBookingResponse {
            booking,
            external_order: order,
        })
    }

    /// Visible to the booking's guest and host only
    pub async fn get(&self, user: &AuthUser, id: Uuid) -> ApiResult<Booking> {
        let booking = self.find(id).await?;
        if booking.guest_id != user.id && booking.host_id != user.id {
            return Err(ApiError::forbidden(
                "You do not have access to this booking",
            ));
        }
        Ok(booking)
    }

    pub async fn list_for_guest(
        &self,
        user: &AuthUser,
        page: PageRequest,
    ) -> ApiResult<Page<BookingWithListing>> {
        let (items, total) = self.store.bookings_by_guest(user.id, page).await?;
        Ok(Page::new(items, total, page))
    }

    pub async fn list_for_host(&self, user: &AuthUser, page: PageRequest) -> ApiResult<Page<Booking>> {
        let (items, total) = self.store.bookings_by_host(user.id, page).await?;
        Ok(Page::new(items, total, page))
    }

    pub async fn cancel(
        &self,
        user: &AuthUser,
        id: Uuid,
        reason: Option<String>,
    ) -> ApiResult<Booking> {
        let booking = self.find(id).await?;
        if booking.guest_id != user.id {
            return Err(ApiError::forbidden("Only the guest can cancel a booking"));
        }
        if !booking.status.is_cancellable() {
            return Err(ApiError::invalid_state(format!(
                "A {} booking cannot be cancelled",
                booking.status
            )));
        }

        let cancelled = self
            .store
            .cancel_booking(id, optional_text(reason))
            .await?
            .ok_or_else(|| ApiError::invalid_state("The booking can no longer be cancelled"))?;

        info!(booking_id = %id, "Booking cancelled by guest");
        Ok(cancelled)
    }

    /// Check the gateway checkout proof and confirm the booking
    pub async fn verify_payment(
        &self,
        user: &AuthUser,
        id: Uuid,
        request: VerifyPaymentRequest,
    ) -> ApiResult<Booking> {
        let booking = self.find(id).await?;
        if booking.guest_id != user.id {
            return Err(ApiError::forbidden(
                "Only the guest can confirm payment for a booking",
            ));
        }
        if booking.status != BookingStatus::Pending {
            return Err(ApiError::invalid_state(format!(
                "A {} booking cannot accept payment",
                booking.status
            )));
        }

        let payment = self
            .store
            .find_payment_for_booking(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("booking {} has no payment record", id))?;
        if payment.gateway_order_id != request.order_id {
            return Err(ApiError::validation(
                "orderId",
                "Order does not belong to this booking",
            ));
        }

        if !self
            .gateway
            .verify_signature(&request.order_id, &request.payment_id, &request.signature)
        {
            warn!(booking_id = %id, order_id = %request.order_id, "Payment signature mismatch");
            self.store
                .fail_payment(id, "Payment signature verification failed")
                .await?;
            return Err(ApiError::PaymentFailed {
                status: StatusCode::BAD_REQUEST,
                code: codes::PAYMENT_VERIFICATION_FAILED,
                message: "Payment verification failed".to_string(),
            });
        }

        let confirmation = PaymentConfirmation {
            gateway_payment_id: request.payment_id,
            gateway_signature: request.signature,
        };
        let confirmed = self
            .store
            .confirm_booking(id, confirmation)
            .await
            .map_err(|e| on_constraint(e, BOOKINGS_NO_OVERLAP, double_booking))?
            .ok_or_else(|| ApiError::invalid_state("The booking is no longer pending"))?;

        Ok(confirmed)
    }

    /// Host marks a confirmed stay as finished once check-out has passed
    pub async fn complete(&self, user: &AuthUser, id: Uuid) -> ApiResult<Booking> {
        let booking = self.find(id).await?;
        if booking.host_id != user.id {
            return Err(ApiError::forbidden("Only the host can complete a booking"));
        }
        if booking.status != BookingStatus::Confirmed {
            return Err(ApiError::invalid_state(format!(
                "A {} booking cannot be completed",
                booking.status
            )));
        }
        if Utc::now() < booking.check_out {
            return Err(ApiError::invalid_state(
                "A booking can only be completed after check-out",
            ));
        }

        let completed = self
            .store
            .complete_booking(id)
            .await?
            .ok_or_else(|| ApiError::invalid_state("The booking is no longer confirmed"))?;

        info!(booking_id = %id, "Booking completed");
        Ok(completed)
    }

    /// Host refunds the full captured amount of a confirmed booking
    pub async fn refund(&self, user: &AuthUser, id: Uuid) -> ApiResult<Booking> {
        let booking = self.find(id).await?;
        if booking.host_id != user.id {
            return Err(ApiError::forbidden("Only the host can refund a booking"));
        }
        if booking.status != BookingStatus::Confirmed {
            return Err(ApiError::invalid_state(format!(
                "A {} booking cannot be refunded",
                booking.status
            )));
        }

        let payment = self
            .store
            .find_payment_for_booking(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("booking {} has no payment record", id))?;
        let Some(gateway_payment_id) = payment.gateway_payment_id.as_deref() else {
            return Err(ApiError::invalid_state(
                "The booking has no captured payment",
            ));
        };

        let refund = self
            .gateway
            .refund(gateway_payment_id, payment.amount)
            .await
            .map_err(gateway_failure)?;

        let refunded = self
            .store
            .refund_booking(
                id,
                RefundRecord {
                    amount: refund.amount,
                    refunded_at: Utc::now(),
                },
            )
            .await?
            .ok_or_else(|| ApiError::invalid_state("The booking is no longer confirmed"))?;

        Ok(refunded)
    }

    async fn find(&self, id: Uuid) -> ApiResult<Booking> {
        self.store
            .find_booking(id)
            .await?
            .ok_or_else(booking_not_found)
    }
}
