//! Listing models

use chrono::{DateTime, Utc};
use common::pagination::PageRequest;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How much of the booking is refundable when a guest cancels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancellationPolicy {
    Flexible,
    #[default]
    Moderate,
    Strict,
}

string_enum!(CancellationPolicy {
    Flexible => "flexible",
    Moderate => "moderate",
    Strict => "strict",
});

/// Listing entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: Uuid,
    pub host_id: Uuid,
    pub title: String,
    pub description: String,
    /// Minor currency units
    pub price_per_night: i64,
    pub max_guests: i32,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub city: String,
    pub state: Option<String>,
    pub address: String,
    pub zip_code: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub amenities: Vec<String>,
    pub rules_and_policies: Option<String>,
    pub cancellation_policy: CancellationPolicy,
    pub average_rating: f64,
    pub review_count: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated listing ready to insert
#[derive(Debug, Clone)]
pub struct NewListing {
    pub host_id: Uuid,
    pub title: String,
    pub description: String,
    pub price_per_night: i64,
    pub max_guests: i32,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub city: String,
    pub state: Option<String>,
    pub address: String,
    pub zip_code: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub amenities: Vec<String>,
    pub rules_and_policies: Option<String>,
    pub cancellation_policy: CancellationPolicy,
}

/// Validated partial update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default)]
pub struct ListingChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price_per_night: Option<i64>,
    pub max_guests: Option<i32>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub address: Option<String>,
    pub zip_code: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub amenities: Option<Vec<String>>,
    pub rules_and_policies: Option<String>,
    pub cancellation_policy: Option<CancellationPolicy>,
    pub is_active: Option<bool>,
}

impl ListingChanges {
    /// Apply the changes to an in-memory listing
    pub fn apply_to(self, listing: &mut Listing) {
        if let Some(title) = self.title {
            listing.title = title;
        }
        if let Some(description) = self.description {
            listing.description = description;
        }
        if let Some(price) = self.price_per_night {
            listing.price_per_night = price;
        }
        if let Some(max_guests) = self.max_guests {
            listing.max_guests = max_guests;
        }
        if let Some(bedrooms) = self.bedrooms {
            listing.bedrooms = bedrooms;
        }
        if let Some(bathrooms) = self.bathrooms {
            listing.bathrooms = bathrooms;
        }
        if let Some(city) = self.city {
            listing.city = city;
        }
        if self.state.is_some() {
            listing.state = self.state;
        }
        if let Some(address) = self.address {
            listing.address = address;
        }
        if self.zip_code.is_some() {
            listing.zip_code = self.zip_code;
        }
        if self.lat.is_some() {
            listing.lat = self.lat;
        }
        if self.lng.is_some() {
            listing.lng = self.lng;
        }
        if let Some(amenities) = self.amenities {
            listing.amenities = amenities;
        }
        if self.rules_and_policies.is_some() {
            listing.rules_and_policies = self.rules_and_policies;
        }
        if let Some(policy) = self.cancellation_policy {
            listing.cancellation_policy = policy;
        }
        if let Some(is_active) = self.is_active {
            listing.is_active = is_active;
        }
    }
}

/// Request for listing creation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    pub title: String,
    pub description: String,
    pub price_per_night: i64,
    pub max_guests: i32,
    #[serde(default)]
    pub bedrooms: i32,
    #[serde(default)]
    pub bathrooms: i32,
    pub city: String,
    pub state: Option<String>,
    pub address: String,
    pub zip_code: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub rules_and_policies: Option<String>,
    pub cancellation_policy: Option<CancellationPolicy>,
}

/// Request for a partial listing update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price_per_night: Option<i64>,
    pub max_guests: Option<i32>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub address: Option<String>,
    pub zip_code: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub amenities: Option<Vec<String>>,
    pub rules_and_policies: Option<String>,
    pub cancellation_policy: Option<CancellationPolicy>,
    pub is_active: Option<bool>,
}

/// Sort order for listing search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingSort {
    PriceAsc,
    PriceDesc,
    RatingDesc,
    #[default]
    Newest,
}

/// Query parameters for `GET /api/listings`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingSearchQuery {
    pub city: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub guests: Option<i32>,
    pub min_rating: Option<f64>,
    pub sort_by: Option<ListingSort>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListingSearchQuery {
    /// Split into the store filter and the page request
    pub fn into_parts(self) -> (ListingFilter, PageRequest) {
        let page = PageRequest::new(self.page, self.limit);
        let city = self
            .city
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let filter = ListingFilter {
            city,
            min_price: self.min_price,
            max_price: self.max_price,
            min_guests: self.guests,
            min_rating: self.min_rating,
            sort: self.sort_by.unwrap_or_default(),
        };

        (filter, page)
    }
}

/// Search filter over active listings; every present field narrows the result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilter {
    /// Exact city equality
    pub city: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub min_guests: Option<i32>,
    pub min_rating: Option<f64>,
    pub sort: ListingSort,
}

impl ListingFilter {
    pub fn matches(&self, listing: &Listing) -> bool {
        listing.is_active
            && self
                .city
                .as_ref()
                .is_none_or(|city| listing.city == *city)
            && self.min_price.is_none_or(|min| listing.price_per_night >= min)
            && self.max_price.is_none_or(|max| listing.price_per_night <= max)
            && self.min_guests.is_none_or(|guests| listing.max_guests >= guests)
            && self.min_rating.is_none_or(|rating| listing.average_rating >= rating)
    }
}
