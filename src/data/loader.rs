//! Price file loader.
//!
//! Reads a CSV or Parquet file into a `PriceSeries`. Only two columns
//! matter: a timestamp column (default `start_time`) and a closing price
//! column (default `close`). Everything else in the file is ignored.
//!
//! Timestamps are cast to strings and parsed with `parse_timestamp`, so
//! string, date and datetime columns all work. Prices are cast to `f64`;
//! a null, non-numeric, non-finite or negative price rejects the file.

use std::path::{Path, PathBuf};

use polars::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use super::types::{parse_timestamp, PricePoint, PriceSeries};

/// Default timestamp column name.
pub const DEFAULT_TIME_COLUMN: &str = "start_time";

/// Default closing price column name.
pub const DEFAULT_PRICE_COLUMN: &str = "close";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Missing required column '{0}'")]
    MissingColumn(String),

    #[error("Cannot parse timestamp {value:?} at row {row}")]
    InvalidTimestamp { row: usize, value: String },

    #[error("Invalid price {value} at row {row}")]
    InvalidPrice { row: usize, value: String },

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Tabular layouts the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Parquet,
}

impl InputFormat {
    /// Pick a format from the file extension. No extension means CSV.
    pub fn from_path(path: &Path) -> Result<Self, LoaderError> {
        match path.extension().and_then(|e| e.to_str()) {
            None => Ok(Self::Csv),
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(Self::Csv),
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => Ok(Self::Parquet),
            Some(ext) => Err(LoaderError::UnsupportedFormat(ext.to_string())),
        }
    }
}

/// Loader for closing-price files.
#[derive(Debug, Clone)]
pub struct PriceLoader {
    time_column: String,
    price_column: String,
    sort: bool,
}

impl Default for PriceLoader {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_COLUMN, DEFAULT_PRICE_COLUMN)
    }
}

impl PriceLoader {
    /// Create a loader reading the given timestamp and price columns.
    pub fn new(time_column: &str, price_column: &str) -> Self {
        Self {
            time_column: time_column.to_string(),
            price_column: price_column.to_string(),
            sort: true,
        }
    }

    /// Disable or enable sorting the loaded rows by timestamp.
    pub fn with_sort(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }

    pub fn time_column(&self) -> &str {
        &self.time_column
    }

    pub fn price_column(&self) -> &str {
        &self.price_column
    }

    /// Load a price file into a series.
    pub fn load(&self, path: &Path) -> Result<PriceSeries, LoaderError> {
        if !path.exists() {
            return Err(LoaderError::FileNotFound(path.display().to_string()));
        }

        let df = match InputFormat::from_path(path)? {
            InputFormat::Csv => self.read_csv(path)?,
            InputFormat::Parquet => self.read_parquet(path)?,
        };
        debug!(
            "Read {} rows x {} columns from {}",
            df.height(),
            df.width(),
            path.display()
        );

        let mut series = self.dataframe_to_series(&df)?;

        if self.sort && !series.is_sorted() {
            info!("Input rows are not in time order; sorting by {}", self.time_column);
            series.sort_by_time();
        }

        Ok(series)
    }

    fn read_csv(&self, path: &Path) -> Result<DataFrame, LoaderError> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
            .finish()?;
        Ok(df)
    }

    fn read_parquet(&self, path: &Path) -> Result<DataFrame, LoaderError> {
        let mut lf = LazyFrame::scan_parquet(path, ScanArgsParquet::default())?;
        let schema = lf.collect_schema()?;
        for name in [&self.time_column, &self.price_column] {
            if schema.get(name.as_str()).is_none() {
                return Err(LoaderError::MissingColumn(name.clone()));
            }
        }

        let df = lf
            .select([col(self.time_column.as_str()), col(self.price_column.as_str())])
            .collect()?;
        Ok(df)
    }

    /// Convert the timestamp and price columns of a frame into a series.
    ///
    /// Row numbers in errors are 1-based data rows (the header is not counted).
    pub fn dataframe_to_series(&self, df: &DataFrame) -> Result<PriceSeries, LoaderError> {
        let time_col = df
            .column(&self.time_column)
            .map_err(|_| LoaderError::MissingColumn(self.time_column.clone()))?
            .cast(&DataType::String)?;
        let price_col = df
            .column(&self.price_column)
            .map_err(|_| LoaderError::MissingColumn(self.price_column.clone()))?
            .cast(&DataType::Float64)?;

        let times = time_col.str()?;
        let prices = price_col.f64()?;

        let mut points = Vec::with_capacity(df.height());
        for (idx, (raw_time, raw_price)) in times.into_iter().zip(prices.into_iter()).enumerate() {
            let row = idx + 1;

            let timestamp = raw_time
                .and_then(parse_timestamp)
                .ok_or_else(|| LoaderError::InvalidTimestamp {
                    row,
                    value: raw_time.unwrap_or("null").to_string(),
                })?;

            let price = match raw_price {
                Some(p) if p.is_finite() && p >= 0.0 => p,
                Some(p) => {
                    return Err(LoaderError::InvalidPrice {
                        row,
                        value: p.to_string(),
                    })
                }
                None => {
                    return Err(LoaderError::InvalidPrice {
                        row,
                        value: "null".to_string(),
                    })
                }
            };

            points.push(PricePoint::new(timestamp, price));
        }

        Ok(PriceSeries::new(points))
    }
}
