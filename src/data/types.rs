//! Core data types for price series.
//!
//! A `PriceSeries` is the in-memory view of one asset's closing prices,
//! ordered by timestamp. Loaders produce it, the metrics calculator and
//! the integrity validator read it.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Datetime layouts carrying a UTC offset.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%z",
];

/// Naive datetime layouts.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Date-only layouts, interpreted as midnight.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse a timestamp as it appears in a price file.
///
/// Accepts RFC 3339, ISO-like datetimes with or without an offset,
/// US-style `MM/DD/YYYY` dates and bare integers (Unix seconds).
/// Offsets are normalized to UTC. Returns `None` when no layout matches.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.naive_utc());
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    s.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.naive_utc())
}

/// A single closing price observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Bar timestamp (UTC when the source carried an offset)
    pub timestamp: NaiveDateTime,

    /// Closing price, never negative
    pub price: f64,
}

impl PricePoint {
    pub fn new(timestamp: NaiveDateTime, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// Time-ordered closing prices for a single asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Wrap points as given. No reordering happens here.
    pub fn new(points: Vec<PricePoint>) -> Self {
        Self { points }
    }

    /// Build a series with one close per calendar day starting at `start`.
    pub fn from_daily_closes(start: NaiveDate, closes: &[f64]) -> Self {
        let midnight = start.and_hms_opt(0, 0, 0).unwrap_or_default();
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &price)| PricePoint::new(midnight + Duration::days(i as i64), price))
            .collect();
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Closing prices in series order.
    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// First and last timestamp, in series order.
    pub fn time_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((self.first()?.timestamp, self.last()?.timestamp))
    }

    /// True when timestamps never decrease. Equal neighbours are allowed.
    pub fn is_sorted(&self) -> bool {
        self.points
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp)
    }

    /// Stable sort by timestamp; rows sharing a timestamp keep file order.
    pub fn sort_by_time(&mut self) {
        self.points.sort_by_key(|p| p.timestamp);
    }
}

impl FromIterator<PricePoint> for PriceSeries {
    fn from_iter<I: IntoIterator<Item = PricePoint>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_parse_timestamp_layouts() {
        assert_eq!(
            parse_timestamp("2024-03-01 09:15:00"),
            Some(ts("2024-03-01 09:15:00"))
        );
        assert_eq!(
            parse_timestamp("2024-03-01T09:15:00"),
            Some(ts("2024-03-01 09:15:00"))
        );
        assert_eq!(
            parse_timestamp("2024-03-01 09:15"),
            Some(ts("2024-03-01 09:15:00"))
        );
        assert_eq!(parse_timestamp("2024-03-01"), Some(ts("2024-03-01 00:00:00")));
        assert_eq!(parse_timestamp("03/01/2024"), Some(ts("2024-03-01 00:00:00")));
        assert_eq!(
            parse_timestamp("  2024-03-01 09:15:00  "),
            Some(ts("2024-03-01 09:15:00"))
        );
    }

    #[test]
    fn test_parse_timestamp_normalizes_offsets() {
        assert_eq!(
            parse_timestamp("2024-03-01T09:15:00+05:30"),
            Some(ts("2024-03-01 03:45:00"))
        );
        assert_eq!(
            parse_timestamp("2024-03-01 09:15:00+05:30"),
            Some(ts("2024-03-01 03:45:00"))
        );
        assert_eq!(
            parse_timestamp("2024-03-01T09:15:00Z"),
            Some(ts("2024-03-01 09:15:00"))
        );
    }

    #[test]
    fn test_parse_timestamp_unix_seconds() {
        assert_eq!(parse_timestamp("0"), Some(ts("1970-01-01 00:00:00")));
        assert_eq!(parse_timestamp("86400"), Some(ts("1970-01-02 00:00:00")));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-13-45"), None);
    }

    #[test]
    fn test_from_daily_closes() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 30).unwrap();
        let series = PriceSeries::from_daily_closes(start, &[1.0, 2.0, 3.0]);
        assert_eq!(series.len(), 3);
        assert_eq!(series.prices(), vec![1.0, 2.0, 3.0]);
        assert_eq!(
            series.time_range(),
            Some((ts("2024-01-30 00:00:00"), ts("2024-02-01 00:00:00")))
        );
        assert!(series.is_sorted());
    }

    #[test]
    fn test_sort_by_time_is_stable() {
        let mut series = PriceSeries::new(vec![
            PricePoint::new(ts("2024-01-02 00:00:00"), 2.0),
            PricePoint::new(ts("2024-01-01 00:00:00"), 1.0),
            PricePoint::new(ts("2024-01-02 00:00:00"), 3.0),
        ]);
        assert!(!series.is_sorted());

        series.sort_by_time();
        assert!(series.is_sorted());
        assert_eq!(series.prices(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_empty_series() {
        let series = PriceSeries::default();
        assert!(series.is_empty());
        assert!(series.is_sorted());
        assert_eq!(series.first(), None);
        assert_eq!(series.time_range(), None);
    }
}
