//! Metrics export.
//!
//! Writes a `MetricsResult` as a single-row table. The file extension
//! picks the layout:
//! - `.csv` (or no extension): header + one row, undefined metrics as an
//!   empty cell (or the configured null marker)
//! - `.parquet`: one row, undefined metrics as nulls
//! - `.json`: one object, undefined metrics as `null`
//!
//! An undefined metric is never written as `NaN`.

use std::fs;
use std::path::Path;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::config::OutputConfig;
use crate::metrics::MetricsResult;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Column naming style for exported metrics.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ColumnLabels {
    /// `total_return_percent`, `max_drawdown_percent`, `sharpe_ratio_annualized`
    #[default]
    Snake,
    /// `Total Return (%)`, `Maximum Drawdown (%)`, `Sharpe Ratio (Annualized)`
    Display,
}

impl ColumnLabels {
    pub fn names(&self) -> [&'static str; 3] {
        match self {
            Self::Snake => MetricsResult::FIELD_NAMES,
            Self::Display => MetricsResult::DISPLAY_LABELS,
        }
    }
}

/// Output layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Parquet,
    Json,
}

impl OutputFormat {
    /// Pick a format from the file extension. No extension means CSV.
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        match path.extension().and_then(|e| e.to_str()) {
            None => Ok(Self::Csv),
            Some(ext) => match ext.to_ascii_lowercase().as_str() {
                "csv" => Ok(Self::Csv),
                "parquet" => Ok(Self::Parquet),
                "json" => Ok(Self::Json),
                _ => Err(ExportError::UnsupportedFormat(ext.to_string())),
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
            Self::Json => "json",
        }
    }
}

/// Writer for a single metrics row.
#[derive(Debug, Clone, Default)]
pub struct MetricsWriter {
    labels: ColumnLabels,
    null_value: String,
    float_precision: Option<usize>,
}

impl MetricsWriter {
    pub fn new(labels: ColumnLabels) -> Self {
        Self {
            labels,
            ..Self::default()
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self {
            labels: config.labels,
            null_value: config.null_value.clone(),
            float_precision: config.float_precision,
        }
    }

    /// Text written to CSV for an undefined metric.
    pub fn with_null_value(mut self, null_value: &str) -> Self {
        self.null_value = null_value.to_string();
        self
    }

    /// Fixed decimals for CSV floats.
    pub fn with_float_precision(mut self, precision: Option<usize>) -> Self {
        self.float_precision = precision;
        self
    }

    /// Write metrics to `path`, creating parent directories as needed.
    pub fn write(&self, metrics: &MetricsResult, path: &Path) -> Result<OutputFormat, ExportError> {
        let format = OutputFormat::from_path(path)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        match format {
            OutputFormat::Csv => {
                let mut df = self.to_dataframe(metrics)?;
                let mut file = fs::File::create(path)?;
                CsvWriter::new(&mut file)
                    .include_header(true)
                    .with_null_value(self.null_value.clone())
                    .with_float_precision(self.float_precision)
                    .finish(&mut df)?;
            }
            OutputFormat::Parquet => {
                let mut df = self.to_dataframe(metrics)?;
                let file = fs::File::create(path)?;
                ParquetWriter::new(file).finish(&mut df)?;
            }
            OutputFormat::Json => {
                let content = serde_json::to_string_pretty(&self.to_json(metrics))?;
                fs::write(path, content)?;
            }
        }

        debug!("Wrote {} metrics to {}", format.as_str(), path.display());
        Ok(format)
    }

    /// One-row frame with a nullable `f64` column per metric.
    pub fn to_dataframe(&self, metrics: &MetricsResult) -> PolarsResult<DataFrame> {
        let columns = self
            .labels
            .names()
            .iter()
            .zip(metrics.values())
            .map(|(name, value)| Column::from(Series::new((*name).into(), &[value])))
            .collect::<Vec<Column>>();
        DataFrame::new(columns)
    }

    /// One JSON object keyed by column label.
    pub fn to_json(&self, metrics: &MetricsResult) -> Value {
        let record: Map<String, Value> = self
            .labels
            .names()
            .iter()
            .zip(metrics.values())
            .map(|(name, value)| (name.to_string(), Value::from(value)))
            .collect();
        Value::Object(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> MetricsResult {
        MetricsResult {
            total_return_percent: Some(21.0),
            max_drawdown_percent: Some(-12.5),
            sharpe_ratio_annualized: None,
        }
    }

    #[test]
    fn test_output_format_from_path() {
        assert_eq!(OutputFormat::from_path(Path::new("m.csv")).unwrap(), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_path(Path::new("m.JSON")).unwrap(), OutputFormat::Json);
        assert_eq!(
            OutputFormat::from_path(Path::new("m.parquet")).unwrap(),
            OutputFormat::Parquet
        );
        assert_eq!(OutputFormat::from_path(Path::new("metrics")).unwrap(), OutputFormat::Csv);
        assert!(matches!(
            OutputFormat::from_path(Path::new("m.xlsx")),
            Err(ExportError::UnsupportedFormat(ext)) if ext == "xlsx"
        ));
    }

    #[test]
    fn test_csv_undefined_is_empty_cell() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metrics.csv");

        let format = MetricsWriter::default().write(&sample(), &path).unwrap();
        assert_eq!(format, OutputFormat::Csv);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "total_return_percent,max_drawdown_percent,sharpe_ratio_annualized"
        );

        let cells: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0].parse::<f64>().unwrap(), 21.0);
        assert_eq!(cells[1].parse::<f64>().unwrap(), -12.5);
        assert_eq!(cells[2], "");
        assert!(!content.contains("NaN"));
    }

    #[test]
    fn test_csv_display_labels_and_precision() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("metrics.csv");

        MetricsWriter::new(ColumnLabels::Display)
            .with_null_value("NA")
            .with_float_precision(Some(2))
            .write(&sample(), &path)
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Total Return (%),Maximum Drawdown (%),Sharpe Ratio (Annualized)\n21.00,-12.50,NA\n"
        );
    }

    #[test]
    fn test_parquet_undefined_is_null() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metrics.parquet");

        MetricsWriter::default().write(&sample(), &path).unwrap();

        let df = LazyFrame::scan_parquet(&path, ScanArgsParquet::default())
            .unwrap()
            .collect()
            .unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.column("total_return_percent").unwrap().null_count(), 0);
        assert_eq!(df.column("sharpe_ratio_annualized").unwrap().null_count(), 1);
    }

    #[test]
    fn test_json_undefined_is_null() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metrics.json");

        MetricsWriter::default().write(&sample(), &path).unwrap();

        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["total_return_percent"], Value::from(21.0));
        assert_eq!(value["max_drawdown_percent"], Value::from(-12.5));
        assert!(value["sharpe_ratio_annualized"].is_null());
    }

    #[test]
    fn test_unsupported_format_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metrics.xlsx");

        let err = MetricsWriter::default().write(&sample(), &path).unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedFormat(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_all_undefined_frame() {
        let df = MetricsWriter::default()
            .to_dataframe(&MetricsResult::default())
            .unwrap();
        assert_eq!(df.shape(), (1, 3));
        for column in df.get_columns() {
            assert_eq!(column.null_count(), 1);
            assert_eq!(column.dtype(), &DataType::Float64);
        }
    }
}
