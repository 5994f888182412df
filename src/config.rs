//! Run configuration.
//!
//! Everything a run needs (input file, column names, output file and
//! layout, log level) lives in one `Config` value. It can be loaded from a
//! TOML file; every field has a default so a file only needs the keys it
//! changes. The CLI applies its flags on top.
//!
//! ```toml
//! [input]
//! path = "data/master_day.csv"
//! time_column = "start_time"
//! price_column = "close"
//!
//! [output]
//! path = "calculated_financial_metrics.csv"
//! labels = "display"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{DEFAULT_PRICE_COLUMN, DEFAULT_TIME_COLUMN};
use crate::export::ColumnLabels;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("No input file given (use --input or [input] path)")]
    MissingInput,
}

/// Input file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Price file (CSV or Parquet).
    pub path: Option<PathBuf>,

    /// Timestamp column name.
    pub time_column: String,

    /// Closing price column name.
    pub price_column: String,

    /// Sort rows by timestamp after loading.
    pub sort: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: None,
            time_column: DEFAULT_TIME_COLUMN.to_string(),
            price_column: DEFAULT_PRICE_COLUMN.to_string(),
            sort: true,
        }
    }
}

/// Output file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Destination; the extension picks CSV, Parquet or JSON.
    pub path: PathBuf,

    /// Column naming style.
    pub labels: ColumnLabels,

    /// Text written to CSV for an undefined metric.
    pub null_value: String,

    /// Fixed number of decimals in CSV output. Full precision when unset.
    pub float_precision: Option<usize>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("calculated_financial_metrics.csv"),
            labels: ColumnLabels::default(),
            null_value: String::new(),
            float_precision: None,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level for this crate's logs (`RUST_LOG` still applies to the rest).
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Input path, or an error when none was configured.
    pub fn input_path(&self) -> Result<&Path, ConfigError> {
        self.input
            .path
            .as_deref()
            .ok_or(ConfigError::MissingInput)
    }
}
