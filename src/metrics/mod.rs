//! Performance metrics module.
//!
//! Computes the headline statistics of a closing-price series:
//! - Total return
//! - Maximum drawdown (and where it happened)
//! - Annualized Sharpe ratio

pub mod calculator;

pub use calculator::{
    format_metric, DrawdownAnalysis, MetricsCalculator, MetricsResult, RISK_FREE_RATE,
    TRADING_DAYS_PER_YEAR,
};
