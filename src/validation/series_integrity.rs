//! Data integrity checks for a loaded price series.
//!
//! Validates:
//! - Series is non-empty and has at least two prices
//! - Timestamps are in ascending order
//! - No duplicated timestamps
//! - No zero prices (they make the following return undefined)
//! - No large gaps between consecutive observations
//!
//! None of these are fatal. Metrics still compute; the report tells the
//! user why some of them may come out undefined or look odd.

use std::collections::{BTreeSet, HashSet};

use chrono::{Duration, NaiveDateTime};

use crate::data::PriceSeries;

/// Examples listed in a failed check's details.
const MAX_DETAIL_ITEMS: usize = 5;

/// Result of a single validation check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
    /// 1-based series rows the check flagged, in series order
    pub rows: Vec<usize>,
}

impl CheckResult {
    pub fn pass(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: message.to_string(),
            details: None,
            rows: Vec::new(),
        }
    }

    /// A failure about the series as a whole.
    pub fn fail(name: &str, message: &str) -> Self {
        Self {
            passed: false,
            ..Self::pass(name, message)
        }
    }

    /// A failure pinned to specific rows. `items` describes each flagged
    /// row and is shortened into `details`.
    pub fn fail_at_rows(name: &str, message: &str, rows: Vec<usize>, items: &[String]) -> Self {
        Self {
            details: Some(truncate_details(items)),
            rows,
            ..Self::fail(name, message)
        }
    }
}

/// Integrity report for one price series.
#[derive(Debug)]
pub struct IntegrityReport {
    pub rows: usize,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub checks: Vec<CheckResult>,
}

impl IntegrityReport {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failed_checks(&self) -> Vec<&CheckResult> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }

    /// Every row flagged by any check, ascending.
    pub fn flagged_rows(&self) -> BTreeSet<usize> {
        self.checks
            .iter()
            .flat_map(|c| c.rows.iter().copied())
            .collect()
    }

    pub fn summary(&self) -> String {
        let passed = self.checks.iter().filter(|c| c.passed).count();
        let range = match (self.start, self.end) {
            (Some(start), Some(end)) => format!("{} to {}", start, end),
            _ => "no data".to_string(),
        };
        format!(
            "{} rows ({}): {}/{} checks passed",
            self.rows,
            range,
            passed,
            self.checks.len()
        )
    }
}

/// Validator for price series integrity.
#[derive(Debug, Clone)]
pub struct SeriesIntegrityValidator {
    max_gap: Duration,
}

impl Default for SeriesIntegrityValidator {
    fn default() -> Self {
        Self {
            max_gap: Duration::days(7),
        }
    }
}

impl SeriesIntegrityValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag consecutive observations further apart than `max_gap`.
    pub fn with_max_gap(mut self, max_gap: Duration) -> Self {
        self.max_gap = max_gap;
        self
    }

    /// Run all checks.
    pub fn validate(&self, series: &PriceSeries) -> IntegrityReport {
        let checks = vec![
            self.check_non_empty(series),
            self.check_min_observations(series),
            self.check_time_order(series),
            self.check_duplicate_timestamps(series),
            self.check_zero_prices(series),
            self.check_gaps(series),
        ];

        let (start, end) = match series.time_range() {
            Some((start, end)) => (Some(start), Some(end)),
            None => (None, None),
        };

        IntegrityReport {
            rows: series.len(),
            start,
            end,
            checks,
        }
    }

    fn check_non_empty(&self, series: &PriceSeries) -> CheckResult {
        if series.is_empty() {
            CheckResult::fail("non_empty", "Series has no rows")
        } else {
            CheckResult::pass("non_empty", &format!("{} rows", series.len()))
        }
    }

    fn check_min_observations(&self, series: &PriceSeries) -> CheckResult {
        if series.len() < 2 {
            CheckResult::fail(
                "min_observations",
                "Fewer than 2 prices; drawdown and Sharpe ratio will be undefined",
            )
        } else {
            CheckResult::pass("min_observations", "At least 2 prices")
        }
    }

    fn check_time_order(&self, series: &PriceSeries) -> CheckResult {
        let (rows, items): (Vec<usize>, Vec<String>) = series
            .points()
            .windows(2)
            .enumerate()
            .filter(|(_, w)| w[1].timestamp < w[0].timestamp)
            .map(|(i, w)| {
                let row = i + 2;
                (row, format!("row {}: {} after {}", row, w[1].timestamp, w[0].timestamp))
            })
            .unzip();

        if rows.is_empty() {
            CheckResult::pass("time_order", "Timestamps ascending")
        } else {
            CheckResult::fail_at_rows(
                "time_order",
                &format!("{} rows out of time order", rows.len()),
                rows,
                &items,
            )
        }
    }

    fn check_duplicate_timestamps(&self, series: &PriceSeries) -> CheckResult {
        let mut seen = HashSet::new();
        let (rows, items): (Vec<usize>, Vec<String>) = series
            .points()
            .iter()
            .enumerate()
            .filter(|(_, p)| !seen.insert(p.timestamp))
            .map(|(i, p)| (i + 1, p.timestamp.to_string()))
            .unzip();

        if rows.is_empty() {
            CheckResult::pass("duplicate_timestamps", "All timestamps unique")
        } else {
            CheckResult::fail_at_rows(
                "duplicate_timestamps",
                &format!("{} duplicated timestamps", rows.len()),
                rows,
                &items,
            )
        }
    }

    fn check_zero_prices(&self, series: &PriceSeries) -> CheckResult {
        let (rows, items): (Vec<usize>, Vec<String>) = series
            .points()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.price == 0.0)
            .map(|(i, p)| (i + 1, format!("row {} ({})", i + 1, p.timestamp)))
            .unzip();

        if rows.is_empty() {
            CheckResult::pass("zero_prices", "No zero prices")
        } else {
            CheckResult::fail_at_rows(
                "zero_prices",
                &format!(
                    "{} zero prices; returns following them are undefined",
                    rows.len()
                ),
                rows,
                &items,
            )
        }
    }

    fn check_gaps(&self, series: &PriceSeries) -> CheckResult {
        let (rows, items): (Vec<usize>, Vec<String>) = series
            .points()
            .windows(2)
            .enumerate()
            .filter(|(_, w)| w[1].timestamp - w[0].timestamp > self.max_gap)
            .map(|(i, w)| {
                let gap = format!(
                    "{} to {} ({} days)",
                    w[0].timestamp,
                    w[1].timestamp,
                    (w[1].timestamp - w[0].timestamp).num_days()
                );
                (i + 2, gap)
            })
            .unzip();

        if rows.is_empty() {
            CheckResult::pass("time_gaps", "No major gaps")
        } else {
            CheckResult::fail_at_rows(
                "time_gaps",
                &format!("{} major gaps found", rows.len()),
                rows,
                &items,
            )
        }
    }
}

fn truncate_details(items: &[String]) -> String {
    let mut details = items
        .iter()
        .take(MAX_DETAIL_ITEMS)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if items.len() > MAX_DETAIL_ITEMS {
        details.push_str(&format!(", ... ({} more)", items.len() - MAX_DETAIL_ITEMS));
    }
    details
}
