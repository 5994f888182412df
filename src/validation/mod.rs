//! Validation module for loaded price data.
//!
//! Checks a `PriceSeries` for conditions that make metrics undefined or
//! misleading (empty input, unsorted or duplicated timestamps, zero
//! prices, large gaps). Findings are warnings, never fatal.

pub mod series_integrity;

pub use series_integrity::{CheckResult, IntegrityReport, SeriesIntegrityValidator};
