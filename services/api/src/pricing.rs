//! Stay arithmetic: nights, commission, totals and date-range overlap
//!
//! All amounts are integer minor units. Every operation that can overflow is
//! checked and reported as [`PricingError::Overflow`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

pub const MS_PER_DAY: i64 = 86_400_000;

/// Longest stay a single booking may cover
pub const MAX_NIGHTS: i64 = 365;

/// Platform commission applied when none is configured
pub const DEFAULT_COMMISSION_PERCENT: u32 = 12;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PricingError {
    #[error("Booking amount is too large")]
    Overflow,
}

/// Half-open interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Ranges that merely touch (one ends where the other starts) do not overlap
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn nights(&self) -> i64 {
        nights_between(self.start, self.end)
    }
}

/// Whole nights between two instants, rounded to the nearest night with halves rounding up
pub fn nights_between(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> i64 {
    let ms = (check_out - check_in).num_milliseconds();
    (ms + MS_PER_DAY / 2).div_euclid(MS_PER_DAY)
}

/// Parse a stay date given as an RFC 3339 timestamp or a `YYYY-MM-DD` date (midnight UTC)
pub fn parse_stay_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(input) {
        return Some(timestamp.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

/// Commission on `subtotal`, rounded half up
pub fn platform_fee(subtotal: i64, commission_percent: u32) -> Result<i64, PricingError> {
    subtotal
        .checked_mul(i64::from(commission_percent))
        .and_then(|scaled| scaled.checked_add(50))
        .map(|scaled| scaled.div_euclid(100))
        .ok_or(PricingError::Overflow)
}

/// Price snapshot stored on a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub nights: i64,
    pub price_per_night: i64,
    pub subtotal: i64,
    pub platform_fee: i64,
    pub total_price: i64,
}

/// Price a stay of `nights` nights at `price_per_night`
pub fn quote(
    price_per_night: i64,
    nights: i64,
    commission_percent: u32,
) -> Result<PriceQuote, PricingError> {
    let subtotal = price_per_night
        .checked_mul(nights)
        .ok_or(PricingError::Overflow)?;
    let platform_fee = platform_fee(subtotal, commission_percent)?;
    let total_price = subtotal
        .checked_add(platform_fee)
        .ok_or(PricingError::Overflow)?;

    Ok(PriceQuote {
        nights,
        price_per_night,
        subtotal,
        platform_fee,
        total_price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_three_nights_at_one_hundred() {
        let nights = nights_between(day(10), day(13));
        let quote = quote(100, nights, DEFAULT_COMMISSION_PERCENT).unwrap();

        assert_eq!(quote.nights, 3);
        assert_eq!(quote.subtotal, 300);
        assert_eq!(quote.platform_fee, 36);
        assert_eq!(quote.total_price, 336);
    }

    #[test]
    fn test_nights_round_to_nearest() {
        let start = day(10);
        assert_eq!(nights_between(start, start + Duration::hours(23)), 1);
        assert_eq!(nights_between(start, start + Duration::hours(25)), 1);
        assert_eq!(nights_between(start, start + Duration::hours(12)), 1);
        assert_eq!(
            nights_between(start, start + Duration::hours(12) - Duration::milliseconds(1)),
            0
        );
        assert_eq!(nights_between(start, start), 0);
        assert!(nights_between(day(13), day(10)) < 0);
    }

    #[test]
    fn test_platform_fee_rounds_half_up() {
        assert_eq!(platform_fee(1042, 12).unwrap(), 125);
        assert_eq!(platform_fee(1046, 12).unwrap(), 126);
        assert_eq!(platform_fee(5, 10).unwrap(), 1);
        assert_eq!(platform_fee(4, 10).unwrap(), 0);
        assert_eq!(platform_fee(0, 12).unwrap(), 0);
    }

    #[test]
    fn test_overflow_is_an_error() {
        assert_eq!(quote(i64::MAX, 2, 12), Err(PricingError::Overflow));
        assert_eq!(platform_fee(i64::MAX / 2, 12), Err(PricingError::Overflow));
    }

    #[test]
    fn test_touching_ranges_do_not_overlap() {
        let first = DateRange::new(day(1), day(4));
        let second = DateRange::new(day(4), day(6));
        assert!(!first.overlaps(&second));
        assert!(!second.overlaps(&first));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let outer = DateRange::new(day(1), day(10));
        let inner = DateRange::new(day(3), day(5));
        let straddle = DateRange::new(day(9), day(12));

        assert!(outer.overlaps(&inner) && inner.overlaps(&outer));
        assert!(outer.overlaps(&straddle) && straddle.overlaps(&outer));
        assert!(!inner.overlaps(&straddle));
    }

    #[test]
    fn test_parse_stay_date() {
        assert_eq!(parse_stay_date("2025-03-10"), Some(day(10)));
        assert_eq!(parse_stay_date("2025-03-10T00:00:00Z"), Some(day(10)));
        assert_eq!(
            parse_stay_date("2025-03-10T05:30:00+05:30"),
            Some(day(10))
        );
        assert_eq!(parse_stay_date("10/03/2025"), None);
        assert_eq!(parse_stay_date("2025-02-30"), None);
    }
}
