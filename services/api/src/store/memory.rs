//! In-memory store with the same constraint behaviour as the PostgreSQL one

use async_trait::async_trait;
use auth::{NewUser, User};
use chrono::Utc;
use common::error::{DatabaseError, DatabaseResult};
use common::pagination::PageRequest;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    BOOKINGS_NO_OVERLAP, BookingStore, ListingStore, REVIEWS_BOOKING_KEY, ReviewStore, Store,
    USERS_EMAIL_KEY, UserStore,
};
use crate::models::{
    Booking, BookingStatus, BookingWithListing, Listing, ListingChanges, ListingFilter,
    ListingSort, NewBooking, NewListing, NewPayment, NewReview, Payment, PaymentConfirmation,
    PaymentStatus, RefundRecord, Review, ReviewAuthor, ReviewWithAuthor, TransactionStatus,
};
use crate::pricing::DateRange;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    listings: Vec<Listing>,
    bookings: Vec<Booking>,
    payments: Vec<Payment>,
    reviews: Vec<Review>,
}

impl Tables {
    fn confirmed_overlap(&self, listing_id: Uuid, stay: DateRange, exclude: Option<Uuid>) -> bool {
        self.bookings.iter().any(|b| {
            b.listing_id == listing_id
                && b.status == BookingStatus::Confirmed
                && Some(b.id) != exclude
                && b.stay().overlaps(&stay)
        })
    }

    fn booking_mut(&mut self, id: Uuid) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == id)
    }

    fn payment_mut(&mut self, booking_id: Uuid) -> Option<&mut Payment> {
        self.payments.iter_mut().find(|p| p.booking_id == booking_id)
    }
}

/// Rows are kept in insertion order; listings read newest first
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Mean rating rounded to two decimals, plus the review count
fn average_rating(ratings: &[i16]) -> (f64, i32) {
    if ratings.is_empty() {
        return (0.0, 0);
    }
    let sum: f64 = ratings.iter().map(|r| f64::from(*r)).sum();
    let mean = sum / ratings.len() as f64;
    ((mean * 100.0).round() / 100.0, ratings.len() as i32)
}

fn paginate<T>(items: Vec<T>, page: PageRequest) -> (Vec<T>, i64) {
    let total = items.len() as i64;
    let items = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect();
    (items, total)
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> DatabaseResult<User> {
        let mut tables = self.tables.lock().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(DatabaseError::Constraint(USERS_EMAIL_KEY.to_string()));
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            profile_image: None,
            bio: None,
            phone: user.phone,
            role: user.role,
            is_verified: false,
            is_suspended: false,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn set_user_suspended(&self, id: Uuid, suspended: bool) -> DatabaseResult<Option<User>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.is_suspended = suspended;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn insert_listing(&self, listing: NewListing) -> DatabaseResult<Listing> {
        let now = Utc::now();
        let created = Listing {
            id: Uuid::new_v4(),
            host_id: listing.host_id,
            title: listing.title,
            description: listing.description,
            price_per_night: listing.price_per_night,
            max_guests: listing.max_guests,
            bedrooms: listing.bedrooms,
            bathrooms: listing.bathrooms,
            city: listing.city,
            state: listing.state,
            address: listing.address,
            zip_code: listing.zip_code,
            lat: listing.lat,
            lng: listing.lng,
            amenities: listing.amenities,
            rules_and_policies: listing.rules_and_policies,
            cancellation_policy: listing.cancellation_policy,
            average_rating: 0.0,
            review_count: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().await.listings.push(created.clone());
        Ok(created)
    }

    async fn find_listing(&self, id: Uuid) -> DatabaseResult<Option<Listing>> {
        let tables = self.tables.lock().await;
        Ok(tables.listings.iter().find(|l| l.id == id).cloned())
    }

    async fn search_listings(
        &self,
        filter: &ListingFilter,
        page: PageRequest,
    ) -> DatabaseResult<(Vec<Listing>, i64)> {
        let tables = self.tables.lock().await;
        let mut matches: Vec<Listing> = tables
            .listings
            .iter()
            .rev()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect();

        match filter.sort {
            ListingSort::PriceAsc => matches.sort_by_key(|l| l.price_per_night),
            ListingSort::PriceDesc => matches.sort_by_key(|l| std::cmp::Reverse(l.price_per_night)),
            ListingSort::RatingDesc => matches.sort_by(|a, b| {
                b.average_rating
                    .total_cmp(&a.average_rating)
                    .then(b.review_count.cmp(&a.review_count))
            }),
            ListingSort::Newest => {}
        }

        Ok(paginate(matches, page))
    }

    async fn listings_by_host(
        &self,
        host_id: Uuid,
        page: PageRequest,
    ) -> DatabaseResult<(Vec<Listing>, i64)> {
        let tables = self.tables.lock().await;
        let owned = tables
            .listings
            .iter()
            .rev()
            .filter(|l| l.host_id == host_id)
            .cloned()
            .collect();
        Ok(paginate(owned, page))
    }

    async fn update_listing(
        &self,
        id: Uuid,
        changes: ListingChanges,
    ) -> DatabaseResult<Option<Listing>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.listings.iter_mut().find(|l| l.id == id).map(|listing| {
            changes.apply_to(listing);
            listing.updated_at = Utc::now();
            listing.clone()
        }))
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn has_confirmed_overlap(
        &self,
        listing_id: Uuid,
        stay: DateRange,
        exclude: Option<Uuid>,
    ) -> DatabaseResult<bool> {
        let tables = self.tables.lock().await;
        Ok(tables.confirmed_overlap(listing_id, stay, exclude))
    }

    async fn insert_booking_with_payment(
        &self,
        booking: NewBooking,
        payment: NewPayment,
    ) -> DatabaseResult<(Booking, Payment)> {
        let mut tables = self.tables.lock().await;
        if tables.confirmed_overlap(booking.listing_id, booking.stay(), None) {
            return Err(DatabaseError::Constraint(BOOKINGS_NO_OVERLAP.to_string()));
        }

        let now = Utc::now();
        let created = Booking {
            id: Uuid::new_v4(),
            listing_id: booking.listing_id,
            guest_id: booking.guest_id,
            host_id: booking.host_id,
            check_in: booking.check_in,
            check_out: booking.check_out,
            number_of_guests: booking.number_of_guests,
            number_of_nights: booking.number_of_nights,
            price_per_night: booking.price_per_night,
            subtotal: booking.subtotal,
            platform_fee: booking.platform_fee,
            total_price: booking.total_price,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            cancellation_reason: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        };
        let payment = Payment {
            id: Uuid::new_v4(),
            booking_id: created.id,
            gateway_order_id: payment.gateway_order_id,
            gateway_payment_id: None,
            gateway_signature: None,
            amount: payment.amount,
            currency: payment.currency,
            status: TransactionStatus::Pending,
            method: None,
            failure_reason: None,
            refund_amount: 0,
            refunded_at: None,
            created_at: now,
            updated_at: now,
        };

        tables.bookings.push(created.clone());
        tables.payments.push(payment.clone());
        Ok((created, payment))
    }

    async fn find_booking(&self, id: Uuid) -> DatabaseResult<Option<Booking>> {
        let tables = self.tables.lock().await;
        Ok(tables.bookings.iter().find(|b| b.id == id).cloned())
    }

    async fn find_payment_for_booking(&self, booking_id: Uuid) -> DatabaseResult<Option<Payment>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .payments
            .iter()
            .find(|p| p.booking_id == booking_id)
            .cloned())
    }

    async fn bookings_by_guest(
        &self,
        guest_id: Uuid,
        page: PageRequest,
    ) -> DatabaseResult<(Vec<BookingWithListing>, i64)> {
        let tables = self.tables.lock().await;
        let items = tables
            .bookings
            .iter()
            .rev()
            .filter(|b| b.guest_id == guest_id)
            .filter_map(|booking| {
                let listing = tables.listings.iter().find(|l| l.id == booking.listing_id)?;
                Some(BookingWithListing {
                    booking: booking.clone(),
                    listing: listing.clone(),
                })
            })
            .collect();
        Ok(paginate(items, page))
    }

    async fn bookings_by_host(
        &self,
        host_id: Uuid,
        page: PageRequest,
    ) -> DatabaseResult<(Vec<Booking>, i64)> {
        let tables = self.tables.lock().await;
        let items = tables
            .bookings
            .iter()
            .rev()
            .filter(|b| b.host_id == host_id)
            .cloned()
            .collect();
        Ok(paginate(items, page))
    }

    async fn cancel_booking(
        &self,
        id: Uuid,
        reason: Option<String>,
    ) -> DatabaseResult<Option<Booking>> {
        let mut tables = self.tables.lock().await;
        let Some(booking) = tables.booking_mut(id).filter(|b| b.status.is_cancellable()) else {
            return Ok(None);
        };

        let now = Utc::now();
        booking.status = BookingStatus::Cancelled;
        booking.cancellation_reason = reason;
        booking.cancelled_at = Some(now);
        booking.updated_at = now;
        Ok(Some(booking.clone()))
    }

    async fn confirm_booking(
        &self,
        id: Uuid,
        confirmation: PaymentConfirmation,
    ) -> DatabaseResult<Option<Booking>> {
        let mut tables = self.tables.lock().await;
        let Some(pending) = tables
            .bookings
            .iter()
            .find(|b| b.id == id && b.status == BookingStatus::Pending)
            .cloned()
        else {
            return Ok(None);
        };
        if tables.confirmed_overlap(pending.listing_id, pending.stay(), Some(id)) {
            return Err(DatabaseError::Constraint(BOOKINGS_NO_OVERLAP.to_string()));
        }

        let now = Utc::now();
        if let Some(payment) = tables.payment_mut(id) {
            payment.status = TransactionStatus::Captured;
            payment.gateway_payment_id = Some(confirmation.gateway_payment_id);
            payment.gateway_signature = Some(confirmation.gateway_signature);
            payment.failure_reason = None;
            payment.updated_at = now;
        }

        Ok(tables.booking_mut(id).map(|booking| {
            booking.status = BookingStatus::Confirmed;
            booking.payment_status = PaymentStatus::Paid;
            booking.updated_at = now;
            booking.clone()
        }))
    }

    async fn fail_payment(&self, booking_id: Uuid, reason: &str) -> DatabaseResult<()> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        if let Some(payment) = tables.payment_mut(booking_id) {
            payment.status = TransactionStatus::Failed;
            payment.failure_reason = Some(reason.to_string());
            payment.updated_at = now;
        }
        if let Some(booking) = tables.booking_mut(booking_id) {
            booking.payment_status = PaymentStatus::Failed;
            booking.updated_at = now;
        }
        Ok(())
    }

    async fn complete_booking(&self, id: Uuid) -> DatabaseResult<Option<Booking>> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .booking_mut(id)
            .filter(|b| b.status == BookingStatus::Confirmed)
            .map(|booking| {
                booking.status = BookingStatus::Completed;
                booking.updated_at = Utc::now();
                booking.clone()
            }))
    }

    async fn refund_booking(
        &self,
        id: Uuid,
        refund: RefundRecord,
    ) -> DatabaseResult<Option<Booking>> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let Some(refunded) = tables
            .booking_mut(id)
            .filter(|b| b.status == BookingStatus::Confirmed)
            .map(|booking| {
                booking.status = BookingStatus::Refunded;
                booking.payment_status = PaymentStatus::Refunded;
                booking.updated_at = now;
                booking.clone()
            })
        else {
            return Ok(None);
        };

        if let Some(payment) = tables.payment_mut(id) {
            payment.status = TransactionStatus::Refunded;
            payment.refund_amount = refund.amount;
            payment.refunded_at = Some(refund.refunded_at);
            payment.updated_at = now;
        }
        Ok(Some(refunded))
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn find_review(&self, id: Uuid) -> DatabaseResult<Option<Review>> {
        let tables = self.tables.lock().await;
        Ok(tables.reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn find_review_by_booking(&self, booking_id: Uuid) -> DatabaseResult<Option<Review>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .reviews
            .iter()
            .find(|r| r.booking_id == booking_id)
            .cloned())
    }

    async fn insert_review(&self, review: NewReview) -> DatabaseResult<Review> {
        let mut tables = self.tables.lock().await;
        if tables.reviews.iter().any(|r| r.booking_id == review.booking_id) {
            return Err(DatabaseError::Constraint(REVIEWS_BOOKING_KEY.to_string()));
        }

        let now = Utc::now();
        let created = Review {
            id: Uuid::new_v4(),
            booking_id: review.booking_id,
            listing_id: review.listing_id,
            guest_id: review.guest_id,
            host_id: review.host_id,
            rating: review.rating,
            title: review.title,
            comment: review.comment,
            cleanliness: review.cleanliness,
            communication: review.communication,
            check_in: review.check_in,
            accuracy: review.accuracy,
            location: review.location,
            value: review.value,
            host_reply: None,
            host_replied_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.reviews.push(created.clone());

        let ratings: Vec<i16> = tables
            .reviews
            .iter()
            .filter(|r| r.listing_id == created.listing_id)
            .map(|r| r.rating)
            .collect();
        let (average, count) = average_rating(&ratings);
        if let Some(listing) = tables
            .listings
            .iter_mut()
            .find(|l| l.id == created.listing_id)
        {
            listing.average_rating = average;
            listing.review_count = count;
            listing.updated_at = now;
        }

        Ok(created)
    }

    async fn reviews_by_listing(
        &self,
        listing_id: Uuid,
        page: PageRequest,
    ) -> DatabaseResult<(Vec<ReviewWithAuthor>, i64)> {
        let tables = self.tables.lock().await;
        let items = tables
            .reviews
            .iter()
            .rev()
            .filter(|r| r.listing_id == listing_id)
            .filter_map(|review| {
                let guest = tables.users.iter().find(|u| u.id == review.guest_id)?;
                Some(ReviewWithAuthor {
                    review: review.clone(),
                    author: ReviewAuthor {
                        first_name: guest.first_name.clone(),
                        last_name: guest.last_name.clone(),
                    },
                })
            })
            .collect();
        Ok(paginate(items, page))
    }

    async fn set_host_reply(&self, id: Uuid, reply: String) -> DatabaseResult<Option<Review>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.reviews.iter_mut().find(|r| r.id == id).map(|review| {
            let now = Utc::now();
            review.host_reply = Some(reply);
            review.host_replied_at = Some(now);
            review.updated_at = now;
            review.clone()
        }))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> DatabaseResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_average_rating() {
        assert_eq!(average_rating(&[]), (0.0, 0));
        assert_eq!(average_rating(&[5, 4, 4]), (4.33, 3));
        assert_eq!(average_rating(&[5, 4]), (4.5, 2));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_a_constraint_error() {
        let store = MemoryStore::new();
        let user = NewUser {
            email: "dup@example.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: None,
            last_name: None,
            phone: None,
            role: auth::Role::Guest,
        };

        store.insert_user(user.clone()).await.unwrap();
        let err = store.insert_user(user).await.unwrap_err();
        assert_eq!(err.constraint(), Some(USERS_EMAIL_KEY));
    }

    #[tokio::test]
    async fn test_confirm_rejects_overlap_with_confirmed_booking() {
        let store = MemoryStore::new();
        let listing_id = Uuid::new_v4();
        let start = Utc::now() + Duration::days(10);

        let new_booking = |from: i64, to: i64| NewBooking {
            listing_id,
            guest_id: Uuid::new_v4(),
            host_id: Uuid::new_v4(),
            check_in: start + Duration::days(from),
            check_out: start + Duration::days(to),
            number_of_guests: 1,
            number_of_nights: (to - from) as i32,
            price_per_night: 100,
            subtotal: 100,
            platform_fee: 12,
            total_price: 112,
        };
        let new_payment = |order: &str| NewPayment {
            gateway_order_id: order.to_string(),
            amount: 112,
            currency: "INR".to_string(),
        };
        let confirmation = || PaymentConfirmation {
            gateway_payment_id: "pay".to_string(),
            gateway_signature: "sig".to_string(),
        };

        let (first, _) = store
            .insert_booking_with_payment(new_booking(0, 3), new_payment("order_1"))
            .await
            .unwrap();
        let (second, _) = store
            .insert_booking_with_payment(new_booking(2, 4), new_payment("order_2"))
            .await
            .unwrap();
        let (touching, _) = store
            .insert_booking_with_payment(new_booking(3, 5), new_payment("order_3"))
            .await
            .unwrap();

        store.confirm_booking(first.id, confirmation()).await.unwrap();

        let err = store
            .confirm_booking(second.id, confirmation())
            .await
            .unwrap_err();
        assert_eq!(err.constraint(), Some(BOOKINGS_NO_OVERLAP));

        let confirmed = store
            .confirm_booking(touching.id, confirmation())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
    }
}
