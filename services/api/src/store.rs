//! Data store abstraction over the marketplace schema
//!
//! Each entity has its own async repository trait. [`Store`] bundles them so
//! services can share one handle. `postgres` is the production implementation;
//! `memory` mirrors its semantics for tests.

use async_trait::async_trait;
use auth::{NewUser, User};
use common::error::DatabaseResult;
use common::pagination::PageRequest;
use uuid::Uuid;

use crate::models::{
    Booking, BookingWithListing, Listing, ListingChanges, ListingFilter, NewBooking, NewListing,
    NewPayment, NewReview, Payment, PaymentConfirmation, RefundRecord, Review, ReviewWithAuthor,
};
use crate::pricing::DateRange;

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

/// Unique constraint on `users.email`
pub const USERS_EMAIL_KEY: &str = "users_email_key";
/// Exclusion constraint forbidding overlapping confirmed stays on one listing
pub const BOOKINGS_NO_OVERLAP: &str = "bookings_no_confirmed_overlap";
/// Unique constraint on `reviews.booking_id`
pub const REVIEWS_BOOKING_KEY: &str = "reviews_booking_id_key";

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: NewUser) -> DatabaseResult<User>;

    /// Lookup by already-normalized email
    async fn find_user_by_email(&self, email: &str) -> DatabaseResult<Option<User>>;

    async fn find_user_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>>;

    async fn set_user_suspended(&self, id: Uuid, suspended: bool) -> DatabaseResult<Option<User>>;
}

#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn insert_listing(&self, listing: NewListing) -> DatabaseResult<Listing>;

    async fn find_listing(&self, id: Uuid) -> DatabaseResult<Option<Listing>>;

    /// Active listings matching `filter`, plus the total match count
    async fn search_listings(
        &self,
        filter: &ListingFilter,
        page: PageRequest,
    ) -> DatabaseResult<(Vec<Listing>, i64)>;

    /// A host's listings, active or not, newest first
    async fn listings_by_host(
        &self,
        host_id: Uuid,
        page: PageRequest,
    ) -> DatabaseResult<(Vec<Listing>, i64)>;

    async fn update_listing(
        &self,
        id: Uuid,
        changes: ListingChanges,
    ) -> DatabaseResult<Option<Listing>>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Whether a confirmed booking other than `exclude` overlaps `stay`
    async fn has_confirmed_overlap(
        &self,
        listing_id: Uuid,
        stay: DateRange,
        exclude: Option<Uuid>,
    ) -> DatabaseResult<bool>;

    /// Insert a pending booking and its payment atomically
    ///
    /// The listing row is locked and the overlap check repeated inside the
    /// transaction; a clash fails with `Constraint(BOOKINGS_NO_OVERLAP)`.
    async fn insert_booking_with_payment(
        &self,
        booking: NewBooking,
        payment: NewPayment,
    ) -> DatabaseResult<(Booking, Payment)>;

    async fn find_booking(&self, id: Uuid) -> DatabaseResult<Option<Booking>>;

    async fn find_payment_for_booking(&self, booking_id: Uuid) -> DatabaseResult<Option<Payment>>;

    async fn bookings_by_guest(
        &self,
        guest_id: Uuid,
        page: PageRequest,
    ) -> DatabaseResult<(Vec<BookingWithListing>, i64)>;

    async fn bookings_by_host(
        &self,
        host_id: Uuid,
        page: PageRequest,
    ) -> DatabaseResult<(Vec<Booking>, i64)>;

    /// Cancel a pending or confirmed booking; `None` if it is in neither state
    async fn cancel_booking(
        &self,
        id: Uuid,
        reason: Option<String>,
    ) -> DatabaseResult<Option<Booking>>;

    /// Capture the payment and confirm a pending booking atomically
    ///
    /// Locks the listing row and re-checks confirmed overlaps, failing with
    /// `Constraint(BOOKINGS_NO_OVERLAP)`. `None` if the booking is no longer pending.
    async fn confirm_booking(
        &self,
        id: Uuid,
        confirmation: PaymentConfirmation,
    ) -> DatabaseResult<Option<Booking>>;

    /// Mark the booking's payment failed after a bad checkout signature
    async fn fail_payment(&self, booking_id: Uuid, reason: &str) -> DatabaseResult<()>;

    /// Complete a confirmed booking; `None` if it is not confirmed
    async fn complete_booking(&self, id: Uuid) -> DatabaseResult<Option<Booking>>;

    /// Refund a confirmed booking and its payment; `None` if it is not confirmed
    async fn refund_booking(
        &self,
        id: Uuid,
        refund: RefundRecord,
    ) -> DatabaseResult<Option<Booking>>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn find_review(&self, id: Uuid) -> DatabaseResult<Option<Review>>;

    async fn find_review_by_booking(&self, booking_id: Uuid) -> DatabaseResult<Option<Review>>;

    /// Insert a review and refresh the listing's rating aggregates atomically
    async fn insert_review(&self, review: NewReview) -> DatabaseResult<Review>;

    async fn reviews_by_listing(
        &self,
        listing_id: Uuid,
        page: PageRequest,
    ) -> DatabaseResult<(Vec<ReviewWithAuthor>, i64)>;

    async fn set_host_reply(&self, id: Uuid, reply: String) -> DatabaseResult<Option<Review>>;
}

/// Every repository behind one handle
#[async_trait]
pub trait Store: UserStore + ListingStore + BookingStore + ReviewStore {
    /// Whether the backing database answers
    async fn ping(&self) -> DatabaseResult<bool>;
}
