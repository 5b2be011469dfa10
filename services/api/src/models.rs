//! API models for entities and request/response payloads

/// Implements `as_str`, `Display` and `FromStr` for a lowercase string enum
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("Unknown {}: {}", stringify!($name), other)),
                }
            }
        }
    };
}

pub mod booking;
pub mod listing;
pub mod payment;
pub mod review;
pub mod user;

pub use booking::{
    Booking, BookingStatus, BookingWithListing, CancelBookingRequest, CreateBookingRequest,
    CreateBookingResponse, NewBooking, PaymentStatus, VerifyPaymentRequest,
};
pub use listing::{
    CancellationPolicy, CreateListingRequest, Listing, ListingChanges, ListingFilter,
    ListingSearchQuery, ListingSort, NewListing, UpdateListingRequest,
};
pub use payment::{NewPayment, Payment, PaymentConfirmation, RefundRecord, TransactionStatus};
pub use review::{
    CreateReviewRequest, NewReview, ReplyReviewRequest, Review, ReviewAuthor, ReviewWithAuthor,
};
pub use user::{AuthResponse, LoginRequest, RegisterRequest, SuspensionRequest};
