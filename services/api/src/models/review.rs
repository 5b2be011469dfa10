//! Review models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Review entity; one per booking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub listing_id: Uuid,
    pub guest_id: Uuid,
    pub host_id: Uuid,
    pub rating: i16,
    pub title: Option<String>,
    pub comment: String,
    pub cleanliness: Option<i16>,
    pub communication: Option<i16>,
    pub check_in: Option<i16>,
    pub accuracy: Option<i16>,
    pub location: Option<i16>,
    pub value: Option<i16>,
    pub host_reply: Option<String>,
    pub host_replied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub booking_id: Uuid,
    pub listing_id: Uuid,
    pub guest_id: Uuid,
    pub host_id: Uuid,
    pub rating: i16,
    pub title: Option<String>,
    pub comment: String,
    pub cleanliness: Option<i16>,
    pub communication: Option<i16>,
    pub check_in: Option<i16>,
    pub accuracy: Option<i16>,
    pub location: Option<i16>,
    pub value: Option<i16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAuthor {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReviewWithAuthor {
    #[serde(flatten)]
    pub review: Review,
    pub author: ReviewAuthor,
}

/// Request for review creation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub booking_id: Uuid,
    pub rating: i16,
    pub comment: String,
    pub title: Option<String>,
    pub cleanliness: Option<i16>,
    pub communication: Option<i16>,
    pub check_in: Option<i16>,
    pub accuracy: Option<i16>,
    pub location: Option<i16>,
    pub value: Option<i16>,
}

impl CreateReviewRequest {
    /// Named sub-ratings, using the JSON field names
    pub fn sub_ratings(&self) -> [(&'static str, Option<i16>); 6] {
        [
            ("cleanliness", self.cleanliness),
            ("communication", self.communication),
            ("checkIn", self.check_in),
            ("accuracy", self.accuracy),
            ("location", self.location),
            ("value", self.value),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplyReviewRequest {
    pub reply: String,
}
