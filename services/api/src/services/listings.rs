//! Listing publication, search and host management

use auth::Role;
use common::pagination::{Page, PageRequest};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{optional_text, required_text};
use crate::{
    error::{ApiError, ApiResult, codes},
    middleware::AuthUser,
    models::{
        CreateListingRequest, Listing, ListingChanges, ListingSearchQuery, NewListing,
        UpdateListingRequest,
    },
    store::{ListingStore, Store},
};

pub const MAX_TITLE_LENGTH: usize = 200;

fn validate_title(title: &str) -> ApiResult<String> {
    let title = required_text("title", title, "Title")?;
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ApiError::validation(
            "title",
            format!("Title must be at most {} characters", MAX_TITLE_LENGTH),
        ));
    }
    Ok(title)
}

fn validate_price(price: i64) -> ApiResult<i64> {
    if price <= 0 {
        return Err(ApiError::validation(
            "pricePerNight",
            "Price per night must be positive",
        ));
    }
    Ok(price)
}

fn validate_count(field: &'static str, value: i32, min: i32) -> ApiResult<i32> {
    if value < min {
        return Err(ApiError::validation(
            field,
            format!("{} must be at least {}", field, min),
        ));
    }
    Ok(value)
}

fn validate_coordinate(field: &'static str, value: Option<f64>, bound: f64) -> ApiResult<Option<f64>> {
    match value {
        Some(v) if !(-bound..=bound).contains(&v) => Err(ApiError::validation(
            field,
            format!("{} must be between -{} and {}", field, bound, bound),
        )),
        _ => Ok(value),
    }
}

/// Trim, drop blanks and remove duplicates, keeping first occurrences in order
fn normalize_amenities(amenities: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(amenities.len());
    for amenity in amenities {
        let amenity = amenity.trim();
        if !amenity.is_empty() && !normalized.iter().any(|a| a == amenity) {
            normalized.push(amenity.to_string());
        }
    }
    normalized
}

#[derive(Clone)]
pub struct ListingService {
    store: Arc<dyn Store>,
}

impl ListingService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, user: &AuthUser, request: CreateListingRequest) -> ApiResult<Listing> {
        user.require_role(Role::Host)?;

        let listing = NewListing {
            host_id: user.id,
            title: validate_title(&request.title)?,
            description: required_text("description", &request.description, "Description")?,
            price_per_night: validate_price(request.price_per_night)?,
            max_guests: validate_count("maxGuests", request.max_guests, 1)?,
            bedrooms: validate_count("bedrooms", request.bedrooms, 0)?,
            bathrooms: validate_count("bathrooms", request.bathrooms, 0)?,
            city: required_text("city", &request.city, "City")?,
            state: optional_text(request.state),
            address: required_text("address", &request.address, "Address")?,
            zip_code: optional_text(request.zip_code),
            lat: validate_coordinate("lat", request.lat, 90.0)?,
            lng: validate_coordinate("lng", request.lng, 180.0)?,
            amenities: normalize_amenities(request.amenities),
            rules_and_policies: optional_text(request.rules_and_policies),
            cancellation_policy: request.cancellation_policy.unwrap_or_default(),
        };

        let listing = self.store.insert_listing(listing).await?;
        info!(listing_id = %listing.id, host_id = %listing.host_id, "Created listing");
        Ok(listing)
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<Listing> {
        self.store
            .find_listing(id)
            .await?
            .ok_or_else(listing_not_found)
    }

    pub async fn search(&self, query: ListingSearchQuery) -> ApiResult<Page<Listing>> {
        let (filter, page) = query.into_parts();

        if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
            if min > max {
                return Err(ApiError::validation(
                    "minPrice",
                    "Minimum price cannot exceed maximum price",
                ));
            }
        }
        if filter.min_rating.is_some_and(|r| !(0.0..=5.0).contains(&r)) {
            return Err(ApiError::validation(
                "minRating",
                "Minimum rating must be between 0 and 5",
            ));
        }

        let (items, total) = self.store.search_listings(&filter, page).await?;
        Ok(Page::new(items, total, page))
    }

    /// The caller's own listings, including deactivated ones
    pub async fn host_listings(&self, user: &AuthUser, page: PageRequest) -> ApiResult<Page<Listing>> {
        let (items, total) = self.store.listings_by_host(user.id, page).await?;
        Ok(Page::new(items, total, page))
    }

    pub async fn update(
        &self,
        user: &AuthUser,
        id: Uuid,
        request: UpdateListingRequest,
    ) -> ApiResult<Listing> {
        self.owned_listing(user, id).await?;

        let changes = ListingChanges {
            title: request.title.as_deref().map(validate_title).transpose()?,
            description: request
                .description
                .as_deref()
                .map(|d| required_text("description", d, "Description"))
                .transpose()?,
            price_per_night: request.price_per_night.map(validate_price).transpose()?,
            max_guests: request
                .max_guests
                .map(|g| validate_count("maxGuests", g, 1))
                .transpose()?,
            bedrooms: request
                .bedrooms
                .map(|b| validate_count("bedrooms", b, 0))
                .transpose()?,
            bathrooms: request
                .bathrooms
                .map(|b| validate_count("bathrooms", b, 0))
                .transpose()?,
            city: request
                .city
                .as_deref()
                .map(|c| required_text("city", c, "City"))
                .transpose()?,
            state: optional_text(request.state),
            address: request
                .address
                .as_deref()
                .map(|a| required_text("address", a, "Address"))
                .transpose()?,
            zip_code: optional_text(request.zip_code),
            lat: validate_coordinate("lat", request.lat, 90.0)?,
            lng: validate_coordinate("lng", request.lng, 180.0)?,
            amenities: request.amenities.map(normalize_amenities),
            rules_and_policies: optional_text(request.rules_and_policies),
            cancellation_policy: request.cancellation_policy,
            is_active: request.is_active,
        };

        let listing = self
            .store
            .update_listing(id, changes)
            .await?
            .ok_or_else(listing_not_found)?;

        info!(listing_id = %listing.id, "Updated listing");
        Ok(listing)
    }

    /// Soft delete: the listing is deactivated and disappears from search
    pub async fn delete(&self, user: &AuthUser, id: Uuid) -> ApiResult<Listing> {
        self.owned_listing(user, id).await?;

        let changes = ListingChanges {
            is_active: Some(false),
            ..ListingChanges::default()
        };
        let listing = self
            .store
            .update_listing(id, changes)
            .await?
            .ok_or_else(listing_not_found)?;

        info!(listing_id = %listing.id, "Deactivated listing");
        Ok(listing)
    }

    async fn owned_listing(&self, user: &AuthUser, id: Uuid) -> ApiResult<Listing> {
        let listing = self.get(id).await?;
        if listing.host_id != user.id {
            return Err(ApiError::forbidden(
                "Only the listing's host can modify it",
            ));
        }
        Ok(listing)
    }
}

fn listing_not_found() -> ApiError {
    ApiError::not_found(codes::LISTING_NOT_FOUND, "Listing not found")
}
