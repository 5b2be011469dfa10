//! Guest reviews of completed stays and host replies

use common::pagination::{Page, PageRequest};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{on_constraint, optional_text, required_text};
use crate::{
    error::{ApiError, ApiResult, codes},
    middleware::AuthUser,
    models::{BookingStatus, CreateReviewRequest, NewReview, Review, ReviewWithAuthor},
    store::{BookingStore, ListingStore, REVIEWS_BOOKING_KEY, ReviewStore, Store},
};

const RATING_RANGE: std::ops::RangeInclusive<i16> = 1..=5;

fn validate_rating(field: &'static str, rating: i16) -> ApiResult<i16> {
    if !RATING_RANGE.contains(&rating) {
        return Err(ApiError::validation(
            field,
            format!("{} must be between 1 and 5", field),
        ));
    }
    Ok(rating)
}

fn review_exists() -> ApiError {
    ApiError::conflict(
        codes::REVIEW_EXISTS,
        "A review already exists for this booking",
    )
}

#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn Store>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        guest: &AuthUser,
        listing_id: Uuid,
        request: CreateReviewRequest,
    ) -> ApiResult<Review> {
        let rating = validate_rating("rating", request.rating)?;
        for (field, value) in request.sub_ratings() {
            if let Some(value) = value {
                validate_rating(field, value)?;
            }
        }
        let comment = required_text("comment", &request.comment, "Comment")?;

        if self
            .store
            .find_review_by_booking(request.booking_id)
            .await?
            .is_some()
        {
            return Err(review_exists());
        }

        let booking = self
            .store
            .find_booking(request.booking_id)
            .await?
            .filter(|b| b.guest_id == guest.id)
            .ok_or_else(|| ApiError::not_found(codes::BOOKING_NOT_FOUND, "Booking not found"))?;

        if booking.listing_id != listing_id {
            return Err(ApiError::validation(
                "bookingId",
                "Booking is not for this listing",
            ));
        }
        if booking.status != BookingStatus::Completed {
            return Err(ApiError::invalid_state(
                "Only completed stays can be reviewed",
            ));
        }

        let review = NewReview {
            booking_id: booking.id,
            listing_id,
            guest_id: guest.id,
            host_id: booking.host_id,
            rating,
            title: optional_text(request.title),
            comment,
            cleanliness: request.cleanliness,
            communication: request.communication,
            check_in: request.check_in,
            accuracy: request.accuracy,
            location: request.location,
            value: request.value,
        };

        let review = self
            .store
            .insert_review(review)
            .await
            .map_err(|e| on_constraint(e, REVIEWS_BOOKING_KEY, review_exists))?;

        info!(review_id = %review.id, listing_id = %listing_id, "Review posted");
        Ok(review)
    }

    pub async fn list_for_listing(
        &self,
        listing_id: Uuid,
        page: PageRequest,
    ) -> ApiResult<Page<ReviewWithAuthor>> {
        if self.store.find_listing(listing_id).await?.is_none() {
            return Err(ApiError::not_found(
                codes::LISTING_NOT_FOUND,
                "Listing not found",
            ));
        }

        let (items, total) = self.store.reviews_by_listing(listing_id, page).await?;
        Ok(Page::new(items, total, page))
    }

    pub async fn reply(&self, host: &AuthUser, review_id: Uuid, reply: &str) -> ApiResult<Review> {
        let review = self
            .store
            .find_review(review_id)
            .await?
            .ok_or_else(review_not_found)?;

        if review.host_id != host.id {
            return Err(ApiError::forbidden(
                "Only the host of the reviewed stay can reply",
            ));
        }
        let reply = required_text("reply", reply, "Reply")?;

        let review = self
            .store
            .set_host_reply(review_id, reply)
            .await?
            .ok_or_else(review_not_found)?;

        info!(review_id = %review.id, "Host replied to review");
        Ok(review)
    }
}

fn review_not_found() -> ApiError {
    ApiError::not_found(codes::REVIEW_NOT_FOUND, "Review not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;
    use auth::Role;

    fn review_request(booking_id: Uuid, rating: i16) -> CreateReviewRequest {
        CreateReviewRequest {
            booking_id,
            rating,
            comment: "Lovely place, great host".to_string(),
            title: None,
            cleanliness: Some(5),
            communication: None,
            check_in: None,
            accuracy: None,
            location: None,
            value: None,
        }
    }

    #[tokio::test]
    async fn test_review_updates_listing_rating() {
        let ctx = TestContext::new();
        let host = ctx.auth_user(Role::Host).await;
        let guest = ctx.auth_user(Role::Guest).await;
        let listing = ctx.listing(&host, 100).await;
        let first = ctx.completed_booking(&listing, &guest, -10, -8).await;
        let second = ctx.completed_booking(&listing, &guest, -6, -4).await;

        let review = ctx
            .state
            .reviews
            .create(&guest, listing.id, review_request(first.id, 5))
            .await
            .unwrap();
        assert_eq!(review.host_id, host.id);
        ctx.state
            .reviews
            .create(&guest, listing.id, review_request(second.id, 4))
            .await
            .unwrap();

        let listing = ctx.state.listings.get(listing.id).await.unwrap();
        assert_eq!(listing.review_count, 2);
        assert_eq!(listing.average_rating, 4.5);

        let page = ctx
            .state
            .reviews
            .list_for_listing(listing.id, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].review.booking_id, second.id);
        assert!(page.items[0].author.first_name.is_some());
    }

    #[tokio::test]
    async fn test_second_review_conflicts_for_anyone() {
        let ctx = TestContext::new();
        let host = ctx.auth_user(Role::Host).await;
        let guest = ctx.auth_user(Role::Guest).await;
        let stranger = ctx.auth_user(Role::Guest).await;
        let listing = ctx.listing(&host, 100).await;
        let booking = ctx.completed_booking(&listing, &guest, -4, -2).await;

        ctx.state
            .reviews
            .create(&guest, listing.id, review_request(booking.id, 5))
            .await
            .unwrap();

        let err = ctx
            .state
            .reviews
            .create(&guest, listing.id, review_request(booking.id, 3))
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::REVIEW_EXISTS);

        let err = ctx
            .state
            .reviews
            .create(&stranger, listing.id, review_request(booking.id, 3))
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::REVIEW_EXISTS);
    }

    #[tokio::test]
    async fn test_review_preconditions() {
        let ctx = TestContext::new();
        let host = ctx.auth_user(Role::Host).await;
        let guest = ctx.auth_user(Role::Guest).await;
        let stranger = ctx.auth_user(Role::Guest).await;
        let listing = ctx.listing(&host, 100).await;
        let other_listing = ctx.listing(&host, 200).await;
        let completed = ctx.completed_booking(&listing, &guest, -4, -2).await;
        let upcoming = ctx.confirmed_booking(&listing, &guest, 3, 5).await;

        let err = ctx
            .state
            .reviews
            .create(&guest, listing.id, review_request(completed.id, 6))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: Some(f), .. } if f == "rating"));

        let bad_sub = CreateReviewRequest {
            check_in: Some(0),
            ..review_request(completed.id, 4)
        };
        let err = ctx.state.reviews.create(&guest, listing.id, bad_sub).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: Some(f), .. } if f == "checkIn"));

        let err = ctx
            .state
            .reviews
            .create(&stranger, listing.id, review_request(completed.id, 4))
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::BOOKING_NOT_FOUND);

        let err = ctx
            .state
            .reviews
            .create(&guest, other_listing.id, review_request(completed.id, 4))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: Some(f), .. } if f == "bookingId"));

        let err = ctx
            .state
            .reviews
            .create(&guest, listing.id, review_request(upcoming.id, 4))
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::INVALID_STATE);
    }

    #[tokio::test]
    async fn test_only_host_can_reply() {
        let ctx = TestContext::new();
        let host = ctx.auth_user(Role::Host).await;
        let guest = ctx.auth_user(Role::Guest).await;
        let listing = ctx.listing(&host, 100).await;
        let booking = ctx.completed_booking(&listing, &guest, -4, -2).await;
        let review = ctx
            .state
            .reviews
            .create(&guest, listing.id, review_request(booking.id, 5))
            .await
            .unwrap();

        let err = ctx
            .state
            .reviews
            .reply(&guest, review.id, "Thanks!")
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::FORBIDDEN);

        let err = ctx
            .state
            .reviews
            .reply(&host, Uuid::new_v4(), "Thanks!")
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::REVIEW_NOT_FOUND);

        let replied = ctx
            .state
            .reviews
            .reply(&host, review.id, " Thanks for staying! ")
            .await
            .unwrap();
        assert_eq!(replied.host_reply.as_deref(), Some("Thanks for staying!"));
        assert!(replied.host_replied_at.is_some());
    }
}
