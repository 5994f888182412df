//! Performance metrics calculator.
//!
//! Turns a closing-price series into total return, maximum drawdown and
//! annualized Sharpe ratio. Every metric is an `Option<f64>`: a metric
//! whose inputs are degenerate (empty series, zero price, zero
//! volatility) is `None` instead of an error or a NaN.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::data::PriceSeries;

/// Trading days per year used to annualize daily statistics.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Daily risk-free rate subtracted from the mean return.
pub const RISK_FREE_RATE: f64 = 0.0;

/// Headline metrics for one price series.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsResult {
    pub total_return_percent: Option<f64>,
    pub max_drawdown_percent: Option<f64>,
    pub sharpe_ratio_annualized: Option<f64>,
}

impl MetricsResult {
    /// Machine-friendly field names, in column order.
    pub const FIELD_NAMES: [&'static str; 3] = [
        "total_return_percent",
        "max_drawdown_percent",
        "sharpe_ratio_annualized",
    ];

    /// Human-friendly labels, in column order.
    pub const DISPLAY_LABELS: [&'static str; 3] = [
        "Total Return (%)",
        "Maximum Drawdown (%)",
        "Sharpe Ratio (Annualized)",
    ];

    /// Metric values in column order.
    pub fn values(&self) -> [Option<f64>; 3] {
        [
            self.total_return_percent,
            self.max_drawdown_percent,
            self.sharpe_ratio_annualized,
        ]
    }

    /// True when no metric could be computed.
    pub fn is_undefined(&self) -> bool {
        self.values().iter().all(Option::is_none)
    }

    /// Generate a summary report.
    pub fn summary(&self) -> String {
        Self::DISPLAY_LABELS
            .iter()
            .zip(self.values())
            .map(|(label, value)| format!("{}: {}", label, format_metric(value)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Two decimals, or `undefined`.
pub fn format_metric(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "undefined".to_string(),
    }
}

/// Where the worst drawdown happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownAnalysis {
    pub max_drawdown_pct: Option<f64>,
    /// Timestamp of the running peak the worst drawdown is measured from
    pub peak_time: Option<NaiveDateTime>,
    /// Timestamp of the worst trough
    pub trough_time: Option<NaiveDateTime>,
    /// Number of defined returns folded into the cumulative curve
    pub observations: usize,
}

/// Metrics calculator.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Calculate all metrics for a price series.
    ///
    /// The series is read as given; it must already be in time order.
    pub fn compute(series: &PriceSeries) -> MetricsResult {
        let prices = series.prices();
        let returns = Self::period_returns(&prices);
        let cumulative = Self::cumulative_returns(&returns);

        MetricsResult {
            total_return_percent: Self::total_return_percent(&prices),
            max_drawdown_percent: Self::max_drawdown_percent(&cumulative),
            sharpe_ratio_annualized: Self::sharpe_ratio(&returns),
        }
    }

    /// Period-over-period returns.
    ///
    /// Element `j` is the return from `prices[j]` to `prices[j + 1]`, so the
    /// output is one shorter than the input. A zero previous price gives `None`.
    pub fn period_returns(prices: &[f64]) -> Vec<Option<f64>> {
        prices
            .windows(2)
            .map(|w| {
                if w[0] == 0.0 {
                    None
                } else {
                    Some((w[1] - w[0]) / w[0])
                }
            })
            .collect()
    }

    /// First-to-last return in percent.
    pub fn total_return_percent(prices: &[f64]) -> Option<f64> {
        let first = *prices.first()?;
        let last = *prices.last()?;
        if first == 0.0 {
            return None;
        }
        Some((last - first) / first * 100.0)
    }

    /// Compounded growth factor over the defined returns.
    ///
    /// `cum[0] = 1 + r`, `cum[k] = cum[k - 1] * (1 + r)`; undefined returns
    /// are skipped, not treated as zero.
    pub fn cumulative_returns(returns: &[Option<f64>]) -> Vec<f64> {
        returns
            .iter()
            .flatten()
            .scan(1.0, |growth, r| {
                *growth *= 1.0 + r;
                Some(*growth)
            })
            .collect()
    }

    /// Worst peak-to-trough decline of a cumulative curve, in percent.
    ///
    /// The running peak starts at the first cumulative value, so a fall on
    /// the very first return is never counted. Always `<= 0`; `None` for an
    /// empty curve or one whose every drawdown is undefined (a zero peak).
    pub fn max_drawdown_percent(cumulative: &[f64]) -> Option<f64> {
        Self::drawdown_path(cumulative)
            .into_iter()
            .map(|(_, _, drawdown)| drawdown)
            .fold(None, |worst: Option<f64>, dd| {
                Some(worst.map_or(dd, |w| w.min(dd)))
            })
            .map(|w| w * 100.0)
    }

    /// `(index, peak index, drawdown)` for every point of the curve whose
    /// drawdown is finite.
    fn drawdown_path(cumulative: &[f64]) -> Vec<(usize, usize, f64)> {
        let mut peak = f64::NEG_INFINITY;
        let mut peak_idx = 0;

        cumulative
            .iter()
            .enumerate()
            .filter_map(|(k, &growth)| {
                if growth > peak {
                    peak = growth;
                    peak_idx = k;
                }
                let drawdown = growth / peak - 1.0;
                drawdown.is_finite().then_some((k, peak_idx, drawdown))
            })
            .collect()
    }

    /// Annualized Sharpe ratio over the defined returns.
    ///
    /// Uses the sample standard deviation. `None` with fewer than two
    /// defined returns or zero volatility.
    pub fn sharpe_ratio(returns: &[Option<f64>]) -> Option<f64> {
        let defined: Vec<f64> = returns.iter().flatten().copied().collect();
        if defined.len() < 2 {
            return None;
        }

        let n = defined.len() as f64;
        let mean = defined.iter().sum::<f64>() / n;
        let variance = defined.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let std_dev = variance.sqrt();

        if std_dev == 0.0 || !std_dev.is_finite() {
            return None;
        }

        let sharpe = (mean - RISK_FREE_RATE) / std_dev * TRADING_DAYS_PER_YEAR.sqrt();
        sharpe.is_finite().then_some(sharpe)
    }

    /// Locate the worst drawdown in time.
    ///
    /// Walks the same cumulative curve as `compute`, so `max_drawdown_pct`
    /// always matches `MetricsResult::max_drawdown_percent`.
    pub fn analyze_drawdown(series: &PriceSeries) -> DrawdownAnalysis {
        let points = series.points();
        let returns = Self::period_returns(&series.prices());
        let cumulative = Self::cumulative_returns(&returns);

        // Bar that closes each defined return, aligned with `cumulative`
        let bar_times: Vec<NaiveDateTime> = returns
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_some())
            .map(|(j, _)| points[j + 1].timestamp)
            .collect();

        let worst = Self::drawdown_path(&cumulative)
            .into_iter()
            .fold(None, |worst: Option<(usize, usize, f64)>, step| {
                if worst.map_or(true, |(_, _, w)| step.2 < w) {
                    Some(step)
                } else {
                    worst
                }
            });

        DrawdownAnalysis {
            max_drawdown_pct: Self::max_drawdown_percent(&cumulative),
            peak_time: worst.map(|(_, peak_idx, _)| bar_times[peak_idx]),
            trough_time: worst.map(|(k, _, _)| bar_times[k]),
            observations: cumulative.len(),
        }
    }
}
