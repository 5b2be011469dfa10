//! Booking models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gateway::ExternalOrder;
use crate::models::Listing;
use crate::pricing::DateRange;

/// Reservation lifecycle
///
/// `pending -> confirmed -> {completed, refunded}` and
/// `pending | confirmed -> cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Refunded,
    Completed,
}

string_enum!(BookingStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Cancelled => "cancelled",
    Refunded => "refunded",
    Completed => "completed",
});

impl BookingStatus {
    pub fn is_cancellable(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

/// Payment side of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

string_enum!(PaymentStatus {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
    Refunded => "refunded",
});

/// Booking entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub guest_id: Uuid,
    pub host_id: Uuid,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    pub number_of_guests: i32,
    pub number_of_nights: i32,
    pub price_per_night: i64,
    pub subtotal: i64,
    pub platform_fee: i64,
    pub total_price: i64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn stay(&self) -> DateRange {
        DateRange::new(self.check_in, self.check_out)
    }
}

/// Booking with pricing snapshot, ready to insert
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub listing_id: Uuid,
    pub guest_id: Uuid,
    pub host_id: Uuid,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    pub number_of_guests: i32,
    pub number_of_nights: i32,
    pub price_per_night: i64,
    pub subtotal: i64,
    pub platform_fee: i64,
    pub total_price: i64,
}

impl NewBooking {
    pub fn stay(&self) -> DateRange {
        DateRange::new(self.check_in, self.check_out)
    }
}

/// A guest's booking with the listing it reserves
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingWithListing {
    #[serde(flatten)]
    pub booking: Booking,
    pub listing: Listing,
}

/// Request for booking creation; dates are RFC 3339 or `YYYY-MM-DD`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub listing_id: Uuid,
    pub check_in: String,
    pub check_out: String,
    pub number_of_guests: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingResponse {
    pub booking: Booking,
    pub external_order: ExternalOrder,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelBookingRequest {
    pub reason: Option<String>,
}

/// Checkout result posted back by the client
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}
