//! PostgreSQL implementation of the store traits
//!
//! Queries are runtime-checked (`sqlx::query` + `bind`) and rows are mapped by
//! hand with the `row_to_*` helpers below.

use async_trait::async_trait;
use auth::{NewUser, User};
use chrono::Utc;
use common::error::{DatabaseError, DatabaseResult};
use common::pagination::PageRequest;
use sqlx::{
    PgExecutor, PgPool, Postgres, QueryBuilder, Row,
    postgres::PgRow,
    types::Json,
};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

use super::{BOOKINGS_NO_OVERLAP, BookingStore, ListingStore, ReviewStore, Store, UserStore};
use crate::models::{
    Booking, BookingStatus, BookingWithListing, Listing, ListingChanges, ListingFilter, ListingSort,
    NewBooking, NewListing, NewPayment, NewReview, Payment, PaymentConfirmation, RefundRecord,
    Review, ReviewAuthor, ReviewWithAuthor,
};
use crate::pricing::DateRange;

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, profile_image, \
     bio, phone, role, is_verified, is_suspended, created_at, updated_at";

const LISTING_COLUMNS: &str = "id, host_id, title, description, price_per_night, max_guests, \
     bedrooms, bathrooms, city, state, address, zip_code, lat, lng, amenities, \
     rules_and_policies, cancellation_policy, average_rating, review_count, is_active, \
     created_at, updated_at";

const BOOKING_COLUMNS: &str = "id, listing_id, guest_id, host_id, check_in, check_out, \
     number_of_guests, number_of_nights, price_per_night, subtotal, platform_fee, total_price, \
     status, payment_status, cancellation_reason, cancelled_at, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, booking_id, gateway_order_id, gateway_payment_id, \
     gateway_signature, amount, currency, status, method, failure_reason, refund_amount, \
     refunded_at, created_at, updated_at";

const REVIEW_COLUMNS: &str = "r.id, r.booking_id, r.listing_id, r.guest_id, r.host_id, \
     r.rating, r.title, r.comment, r.cleanliness, r.communication, r.check_in, r.accuracy, \
     r.location, r.value, r.host_reply, r.host_replied_at, r.created_at, r.updated_at";

/// Decode a TEXT column holding one of our string enums
fn parse_column<T>(row: &PgRow, column: &str) -> DatabaseResult<T>
where
    T: FromStr<Err = String>,
{
    let text: String = row.try_get(column).map_err(DatabaseError::Query)?;
    text.parse()
        .map_err(|e: String| DatabaseError::Query(sqlx::Error::Decode(e.into())))
}

fn row_to_user(row: &PgRow) -> DatabaseResult<User> {
    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        profile_image: row.get("profile_image"),
        bio: row.get("bio"),
        phone: row.get("phone"),
        role: parse_column(row, "role")?,
        is_verified: row.get("is_verified"),
        is_suspended: row.get("is_suspended"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_listing(row: &PgRow) -> DatabaseResult<Listing> {
    let Json(amenities): Json<Vec<String>> =
        row.try_get("amenities").map_err(DatabaseError::Query)?;

    Ok(Listing {
        id: row.get("id"),
        host_id: row.get("host_id"),
        title: row.get("title"),
        description: row.get("description"),
        price_per_night: row.get("price_per_night"),
        max_guests: row.get("max_guests"),
        bedrooms: row.get("bedrooms"),
        bathrooms: row.get("bathrooms"),
        city: row.get("city"),
        state: row.get("state"),
        address: row.get("address"),
        zip_code: row.get("zip_code"),
        lat: row.get("lat"),
        lng: row.get("lng"),
        amenities,
        rules_and_policies: row.get("rules_and_policies"),
        cancellation_policy: parse_column(row, "cancellation_policy")?,
        average_rating: row.get("average_rating"),
        review_count: row.get("review_count"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_booking(row: &PgRow) -> DatabaseResult<Booking> {
    Ok(Booking {
        id: row.get("id"),
        listing_id: row.get("listing_id"),
        guest_id: row.get("guest_id"),
        host_id: row.get("host_id"),
        check_in: row.get("check_in"),
        check_out: row.get("check_out"),
        number_of_guests: row.get("number_of_guests"),
        number_of_nights: row.get("number_of_nights"),
        price_per_night: row.get("price_per_night"),
        subtotal: row.get("subtotal"),
        platform_fee: row.get("platform_fee"),
        total_price: row.get("total_price"),
        status: parse_column(row, "status")?,
        payment_status: parse_column(row, "payment_status")?,
        cancellation_reason: row.get("cancellation_reason"),
        cancelled_at: row.get("cancelled_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_payment(row: &PgRow) -> DatabaseResult<Payment> {
    Ok(Payment {
        id: row.get("id"),
        booking_id: row.get("booking_id"),
        gateway_order_id: row.get("gateway_order_id"),
        gateway_payment_id: row.get("gateway_payment_id"),
        gateway_signature: row.get("gateway_signature"),
        amount: row.get("amount"),
        currency: row.get("currency"),
        status: parse_column(row, "status")?,
        method: row.get("method"),
        failure_reason: row.get("failure_reason"),
        refund_amount: row.get("refund_amount"),
        refunded_at: row.get("refunded_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_review(row: &PgRow) -> DatabaseResult<Review> {
    Ok(Review {
        id: row.get("id"),
        booking_id: row.get("booking_id"),
        listing_id: row.get("listing_id"),
        guest_id: row.get("guest_id"),
        host_id: row.get("host_id"),
        rating: row.get("rating"),
        title: row.get("title"),
        comment: row.get("comment"),
        cleanliness: row.get("cleanliness"),
        communication: row.get("communication"),
        check_in: row.get("check_in"),
        accuracy: row.get("accuracy"),
        location: row.get("location"),
        value: row.get("value"),
        host_reply: row.get("host_reply"),
        host_replied_at: row.get("host_replied_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn rows_to<T>(
    rows: &[PgRow],
    map: impl Fn(&PgRow) -> DatabaseResult<T>,
) -> DatabaseResult<Vec<T>> {
    rows.iter().map(map).collect()
}

/// Confirmed bookings on `listing_id` intersecting `stay`, ignoring `exclude`
async fn confirmed_overlap<'e, E>(
    executor: E,
    listing_id: Uuid,
    stay: DateRange,
    exclude: Option<Uuid>,
) -> DatabaseResult<bool>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM bookings
            WHERE listing_id = $1
              AND status = 'confirmed'
              AND check_out > $2
              AND check_in < $3
              AND ($4::uuid IS NULL OR id <> $4)
        )
        "#,
    )
    .bind(listing_id)
    .bind(stay.start)
    .bind(stay.end)
    .bind(exclude)
    .fetch_one(executor)
    .await
    .map_err(DatabaseError::Query)
}

/// Take the row lock that serializes writers competing for one listing's dates
async fn lock_listing<'e, E>(executor: E, listing_id: Uuid) -> DatabaseResult<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query("SELECT id FROM listings WHERE id = $1 FOR UPDATE")
        .bind(listing_id)
        .fetch_optional(executor)
        .await
        .map_err(DatabaseError::Query)?;
    Ok(())
}

fn push_listing_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ListingFilter) {
    builder.push(" WHERE is_active = TRUE");

    if let Some(city) = &filter.city {
        builder
            .push(" AND city = ")
            .push_bind(city.clone());
    }
    if let Some(min_price) = filter.min_price {
        builder.push(" AND price_per_night >= ").push_bind(min_price);
    }
    if let Some(max_price) = filter.max_price {
        builder.push(" AND price_per_night <= ").push_bind(max_price);
    }
    if let Some(guests) = filter.min_guests {
        builder.push(" AND max_guests >= ").push_bind(guests);
    }
    if let Some(rating) = filter.min_rating {
        builder.push(" AND average_rating >= ").push_bind(rating);
    }
}

fn listing_order(sort: ListingSort) -> &'static str {
    match sort {
        ListingSort::PriceAsc => " ORDER BY price_per_night ASC, created_at DESC",
        ListingSort::PriceDesc => " ORDER BY price_per_night DESC, created_at DESC",
        ListingSort::RatingDesc => {
            " ORDER BY average_rating DESC, review_count DESC, created_at DESC"
        }
        ListingSort::Newest => " ORDER BY created_at DESC, id DESC",
    }
}

/// Store backed by a PostgreSQL connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn count(&self, sql: &str, id: Uuid) -> DatabaseResult<i64> {
        sqlx::query_scalar(sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::Query)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: NewUser) -> DatabaseResult<User> {
        info!("Creating new user: {}", user.email);

        let sql = format!(
            "INSERT INTO users (email, password_hash, first_name, last_name, phone, role) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.phone)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        row_to_user(&row)
    }

    async fn find_user_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        debug!("Finding user by email: {}", email);

        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_user_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn set_user_suspended(&self, id: Uuid, suspended: bool) -> DatabaseResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET is_suspended = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(suspended)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(row_to_user).transpose()
    }
}

#[async_trait]
impl ListingStore for PgStore {
    async fn insert_listing(&self, listing: NewListing) -> DatabaseResult<Listing> {
        let sql = format!(
            "INSERT INTO listings (host_id, title, description, price_per_night, max_guests, \
             bedrooms, bathrooms, city, state, address, zip_code, lat, lng, amenities, \
             rules_and_policies, cancellation_policy) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {LISTING_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(listing.host_id)
            .bind(&listing.title)
            .bind(&listing.description)
            .bind(listing.price_per_night)
            .bind(listing.max_guests)
            .bind(listing.bedrooms)
            .bind(listing.bathrooms)
            .bind(&listing.city)
            .bind(&listing.state)
            .bind(&listing.address)
            .bind(&listing.zip_code)
            .bind(listing.lat)
            .bind(listing.lng)
            .bind(Json(&listing.amenities))
            .bind(&listing.rules_and_policies)
            .bind(listing.cancellation_policy.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        row_to_listing(&row)
    }

    async fn find_listing(&self, id: Uuid) -> DatabaseResult<Option<Listing>> {
        let sql = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(row_to_listing).transpose()
    }

    async fn search_listings(
        &self,
        filter: &ListingFilter,
        page: PageRequest,
    ) -> DatabaseResult<(Vec<Listing>, i64)> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM listings");
        push_listing_filter(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {LISTING_COLUMNS} FROM listings"
        ));
        push_listing_filter(&mut select, filter);
        select.push(listing_order(filter.sort));
        select
            .push(" LIMIT ")
            .push_bind(i64::from(page.limit()))
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok((rows_to(&rows, row_to_listing)?, total))
    }

    async fn listings_by_host(
        &self,
        host_id: Uuid,
        page: PageRequest,
    ) -> DatabaseResult<(Vec<Listing>, i64)> {
        let total = self
            .count("SELECT COUNT(*) FROM listings WHERE host_id = $1", host_id)
            .await?;

        let sql = format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE host_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(host_id)
            .bind(i64::from(page.limit()))
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok((rows_to(&rows, row_to_listing)?, total))
    }

    async fn update_listing(
        &self,
        id: Uuid,
        changes: ListingChanges,
    ) -> DatabaseResult<Option<Listing>> {
        let sql = format!(
            "UPDATE listings SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                price_per_night = COALESCE($4, price_per_night), \
                max_guests = COALESCE($5, max_guests), \
                bedrooms = COALESCE($6, bedrooms), \
                bathrooms = COALESCE($7, bathrooms), \
                city = COALESCE($8, city), \
                state = COALESCE($9, state), \
                address = COALESCE($10, address), \
                zip_code = COALESCE($11, zip_code), \
                lat = COALESCE($12, lat), \
                lng = COALESCE($13, lng), \
                amenities = COALESCE($14, amenities), \
                rules_and_policies = COALESCE($15, rules_and_policies), \
                cancellation_policy = COALESCE($16, cancellation_policy), \
                is_active = COALESCE($17, is_active), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {LISTING_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.description)
            .bind(changes.price_per_night)
            .bind(changes.max_guests)
            .bind(changes.bedrooms)
            .bind(changes.bathrooms)
            .bind(changes.city)
            .bind(changes.state)
            .bind(changes.address)
            .bind(changes.zip_code)
            .bind(changes.lat)
            .bind(changes.lng)
            .bind(changes.amenities.map(Json))
            .bind(changes.rules_and_policies)
            .bind(changes.cancellation_policy.map(|p| p.as_str()))
            .bind(changes.is_active)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        row.as_ref().map(row_to_listing).transpose()
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn has_confirmed_overlap(
        &self,
        listing_id: Uuid,
        stay: DateRange,
        exclude: Option<Uuid>,
    ) -> DatabaseResult<bool> {
        confirmed_overlap(&self.pool, listing_id, stay, exclude).await
    }

    async fn insert_booking_with_payment(
        &self,
        booking: NewBooking,
        payment: NewPayment,
    ) -> DatabaseResult<(Booking, Payment)> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::Query)?;

        lock_listing(&mut *tx, booking.listing_id).await?;
        if confirmed_overlap(&mut *tx, booking.listing_id, booking.stay(), None).await? {
            return Err(DatabaseError::Constraint(BOOKINGS_NO_OVERLAP.to_string()));
        }

        let sql = format!(
            "INSERT INTO bookings (listing_id, guest_id, host_id, check_in, check_out, \
             number_of_guests, number_of_nights, price_per_night, subtotal, platform_fee, \
             total_price, status, payment_status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'pending', 'pending') \
             RETURNING {BOOKING_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(booking.listing_id)
            .bind(booking.guest_id)
            .bind(booking.host_id)
            .bind(booking.check_in)
            .bind(booking.check_out)
            .bind(booking.number_of_guests)
            .bind(booking.number_of_nights)
            .bind(booking.price_per_night)
            .bind(booking.subtotal)
            .bind(booking.platform_fee)
            .bind(booking.total_price)
            .fetch_one(&mut *tx)
            .await
            .map_err(DatabaseError::from_query)?;
        let created = row_to_booking(&row)?;

        let sql = format!(
            "INSERT INTO payments (booking_id, gateway_order_id, amount, currency, status) \
             VALUES ($1, $2, $3, $4, 'pending') RETURNING {PAYMENT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(created.id)
            .bind(&payment.gateway_order_id)
            .bind(payment.amount)
            .bind(&payment.currency)
            .fetch_one(&mut *tx)
            .await
            .map_err(DatabaseError::from_query)?;
        let payment = row_to_payment(&row)?;

        tx.commit().await.map_err(DatabaseError::Query)?;

        info!(
            booking_id = %created.id,
            listing_id = %created.listing_id,
            "Created pending booking"
        );
        Ok((created, payment))
    }

    async fn find_booking(&self, id: Uuid) -> DatabaseResult<Option<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(row_to_booking).transpose()
    }

    async fn find_payment_for_booking(&self, booking_id: Uuid) -> DatabaseResult<Option<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE booking_id = $1");
        let row = sqlx::query(&sql)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(row_to_payment).transpose()
    }

    async fn bookings_by_guest(
        &self,
        guest_id: Uuid,
        page: PageRequest,
    ) -> DatabaseResult<(Vec<BookingWithListing>, i64)> {
        let total = self
            .count("SELECT COUNT(*) FROM bookings WHERE guest_id = $1", guest_id)
            .await?;

        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE guest_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(guest_id)
            .bind(i64::from(page.limit()))
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;
        let bookings = rows_to(&rows, row_to_booking)?;

        let listing_ids: Vec<Uuid> = bookings.iter().map(|b| b.listing_id).collect();
        let sql = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = ANY($1)");
        let rows = sqlx::query(&sql)
            .bind(&listing_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;
        let listings: HashMap<Uuid, Listing> = rows_to(&rows, row_to_listing)?
            .into_iter()
            .map(|listing| (listing.id, listing))
            .collect();

        let items = bookings
            .into_iter()
            .filter_map(|booking| {
                let listing = listings.get(&booking.listing_id)?.clone();
                Some(BookingWithListing { booking, listing })
            })
            .collect();

        Ok((items, total))
    }

    async fn bookings_by_host(
        &self,
        host_id: Uuid,
        page: PageRequest,
    ) -> DatabaseResult<(Vec<Booking>, i64)> {
        let total = self
            .count("SELECT COUNT(*) FROM bookings WHERE host_id = $1", host_id)
            .await?;

        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE host_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(host_id)
            .bind(i64::from(page.limit()))
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok((rows_to(&rows, row_to_booking)?, total))
    }

    async fn cancel_booking(
        &self,
        id: Uuid,
        reason: Option<String>,
    ) -> DatabaseResult<Option<Booking>> {
        let sql = format!(
            "UPDATE bookings SET status = 'cancelled', cancellation_reason = $2, \
             cancelled_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status IN ('pending', 'confirmed') \
             RETURNING {BOOKING_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(reason)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(row_to_booking).transpose()
    }

    async fn confirm_booking(
        &self,
        id: Uuid,
        confirmation: PaymentConfirmation,
    ) -> DatabaseResult<Option<Booking>> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::Query)?;

        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DatabaseError::Query)?;
        let Some(booking) = row.as_ref().map(row_to_booking).transpose()? else {
            return Ok(None);
        };
        if booking.status != BookingStatus::Pending {
            return Ok(None);
        }

        lock_listing(&mut *tx, booking.listing_id).await?;
        if confirmed_overlap(&mut *tx, booking.listing_id, booking.stay(), Some(id)).await? {
            return Err(DatabaseError::Constraint(BOOKINGS_NO_OVERLAP.to_string()));
        }

        sqlx::query(
            "UPDATE payments SET status = 'captured', gateway_payment_id = $2, \
             gateway_signature = $3, failure_reason = NULL, updated_at = NOW() \
             WHERE booking_id = $1",
        )
        .bind(id)
        .bind(&confirmation.gateway_payment_id)
        .bind(&confirmation.gateway_signature)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from_query)?;

        let sql = format!(
            "UPDATE bookings SET status = 'confirmed', payment_status = 'paid', \
             updated_at = NOW() WHERE id = $1 RETURNING {BOOKING_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(DatabaseError::from_query)?;
        let confirmed = row_to_booking(&row)?;

        tx.commit().await.map_err(DatabaseError::Query)?;

        info!(booking_id = %id, "Confirmed booking after payment capture");
        Ok(Some(confirmed))
    }

    async fn fail_payment(&self, booking_id: Uuid, reason: &str) -> DatabaseResult<()> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::Query)?;

        sqlx::query(
            "UPDATE payments SET status = 'failed', failure_reason = $2, updated_at = NOW() \
             WHERE booking_id = $1",
        )
        .bind(booking_id)
        .bind(reason)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::Query)?;

        sqlx::query(
            "UPDATE bookings SET payment_status = 'failed', updated_at = NOW() WHERE id = $1",
        )
        .bind(booking_id)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::Query)?;

        tx.commit().await.map_err(DatabaseError::Query)
    }

    async fn complete_booking(&self, id: Uuid) -> DatabaseResult<Option<Booking>> {
        let sql = format!(
            "UPDATE bookings SET status = 'completed', updated_at = NOW() \
             WHERE id = $1 AND status = 'confirmed' RETURNING {BOOKING_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(row_to_booking).transpose()
    }

    async fn refund_booking(
        &self,
        id: Uuid,
        refund: RefundRecord,
    ) -> DatabaseResult<Option<Booking>> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::Query)?;

        let sql = format!(
            "UPDATE bookings SET status = 'refunded', payment_status = 'refunded', \
             updated_at = NOW() WHERE id = $1 AND status = 'confirmed' \
             RETURNING {BOOKING_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DatabaseError::Query)?;
        let Some(refunded) = row.as_ref().map(row_to_booking).transpose()? else {
            return Ok(None);
        };

        sqlx::query(
            "UPDATE payments SET status = 'refunded', refund_amount = $2, refunded_at = $3, \
             updated_at = NOW() WHERE booking_id = $1",
        )
        .bind(id)
        .bind(refund.amount)
        .bind(refund.refunded_at)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::Query)?;

        tx.commit().await.map_err(DatabaseError::Query)?;

        info!(booking_id = %id, amount = refund.amount, "Refunded booking");
        Ok(Some(refunded))
    }
}

#[async_trait]
impl ReviewStore for PgStore {
    async fn find_review(&self, id: Uuid) -> DatabaseResult<Option<Review>> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews r WHERE r.id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(row_to_review).transpose()
    }

    async fn find_review_by_booking(&self, booking_id: Uuid) -> DatabaseResult<Option<Review>> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews r WHERE r.booking_id = $1");
        let row = sqlx::query(&sql)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(row_to_review).transpose()
    }

    async fn insert_review(&self, review: NewReview) -> DatabaseResult<Review> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::Query)?;

        let sql = format!(
            "INSERT INTO reviews AS r (booking_id, listing_id, guest_id, host_id, rating, title, \
             comment, cleanliness, communication, check_in, accuracy, location, value) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {REVIEW_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(review.booking_id)
            .bind(review.listing_id)
            .bind(review.guest_id)
            .bind(review.host_id)
            .bind(review.rating)
            .bind(&review.title)
            .bind(&review.comment)
            .bind(review.cleanliness)
            .bind(review.communication)
            .bind(review.check_in)
            .bind(review.accuracy)
            .bind(review.location)
            .bind(review.value)
            .fetch_one(&mut *tx)
            .await
            .map_err(DatabaseError::from_query)?;
        let created = row_to_review(&row)?;

        sqlx::query(
            r#"
            UPDATE listings SET
                average_rating = stats.average_rating,
                review_count = stats.review_count,
                updated_at = NOW()
            FROM (
                SELECT COALESCE(ROUND(AVG(rating)::numeric, 2), 0)::float8 AS average_rating,
                       COUNT(*)::int AS review_count
                FROM reviews
                WHERE listing_id = $1
            ) AS stats
            WHERE listings.id = $1
            "#,
        )
        .bind(review.listing_id)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::Query)?;

        tx.commit().await.map_err(DatabaseError::Query)?;

        info!(review_id = %created.id, listing_id = %created.listing_id, "Created review");
        Ok(created)
    }

    async fn reviews_by_listing(
        &self,
        listing_id: Uuid,
        page: PageRequest,
    ) -> DatabaseResult<(Vec<ReviewWithAuthor>, i64)> {
        let total = self
            .count("SELECT COUNT(*) FROM reviews WHERE listing_id = $1", listing_id)
            .await?;

        let sql = format!(
            "SELECT {REVIEW_COLUMNS}, u.first_name AS author_first_name, \
             u.last_name AS author_last_name \
             FROM reviews r JOIN users u ON u.id = r.guest_id \
             WHERE r.listing_id = $1 \
             ORDER BY r.created_at DESC, r.id DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(listing_id)
            .bind(i64::from(page.limit()))
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        let items = rows_to(&rows, |row| {
            Ok(ReviewWithAuthor {
                review: row_to_review(row)?,
                author: ReviewAuthor {
                    first_name: row.get("author_first_name"),
                    last_name: row.get("author_last_name"),
                },
            })
        })?;

        Ok((items, total))
    }

    async fn set_host_reply(&self, id: Uuid, reply: String) -> DatabaseResult<Option<Review>> {
        let sql = format!(
            "UPDATE reviews AS r SET host_reply = $2, host_replied_at = $3, updated_at = NOW() \
             WHERE r.id = $1 RETURNING {REVIEW_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(reply)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(row_to_review).transpose()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> DatabaseResult<bool> {
        common::database::health_check(&self.pool).await
    }
}
