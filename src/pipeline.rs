//! Load → validate → compute → export.
//!
//! `Pipeline` owns a `Config` and runs the whole job against it. Each
//! stage failure is reported with the boundary it happened at; undefined
//! metrics are not failures.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Config, ConfigError};
use crate::data::{LoaderError, PriceLoader, PriceSeries};
use crate::export::{ExportError, MetricsWriter, OutputFormat};
use crate::metrics::{DrawdownAnalysis, MetricsCalculator, MetricsResult};
use crate::validation::{IntegrityReport, SeriesIntegrityValidator};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to load price series from {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: LoaderError,
    },

    #[error("Failed to write metrics to {path}: {source}")]
    Export {
        path: String,
        #[source]
        source: ExportError,
    },
}

/// Outcome of a successful run.
#[derive(Debug)]
pub struct RunReport {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub output_format: OutputFormat,
    pub rows: usize,
    pub metrics: MetricsResult,
    pub drawdown: DrawdownAnalysis,
    pub integrity: IntegrityReport,
}

/// Metrics job for one price file.
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn loader(&self) -> PriceLoader {
        PriceLoader::new(&self.config.input.time_column, &self.config.input.price_column)
            .with_sort(self.config.input.sort)
    }

    /// Load the configured input file.
    pub fn load(&self) -> Result<PriceSeries, PipelineError> {
        let path = self.config.input_path()?;
        info!("Loading prices from {}", path.display());

        let series = self.loader().load(path).map_err(|source| PipelineError::Load {
            path: path.display().to_string(),
            source,
        })?;

        info!("Loaded {} rows", series.len());
        Ok(series)
    }

    /// Load the input and run integrity checks only.
    pub fn check(&self) -> Result<IntegrityReport, PipelineError> {
        let series = self.load()?;
        Ok(SeriesIntegrityValidator::new().validate(&series))
    }

    /// Full run: load, check, compute and write the metrics row.
    pub fn run(&self) -> Result<RunReport, PipelineError> {
        let series = self.load()?;

        let integrity = SeriesIntegrityValidator::new().validate(&series);
        for check in integrity.failed_checks() {
            match &check.details {
                Some(details) => warn!("{}: {} ({})", check.name, check.message, details),
                None => warn!("{}: {}", check.name, check.message),
            }
        }
        let flagged = integrity.flagged_rows();
        if !flagged.is_empty() {
            warn!("{} of {} rows flagged by integrity checks", flagged.len(), series.len());
        }

        let metrics = MetricsCalculator::compute(&series);
        let drawdown = MetricsCalculator::analyze_drawdown(&series);
        if metrics.is_undefined() {
            warn!("No metric could be computed from {} rows", series.len());
        }
        if let (Some(peak), Some(trough)) = (drawdown.peak_time, drawdown.trough_time) {
            info!("Worst drawdown from {} to {}", peak, trough);
        }

        let output_path = self.config.output.path.clone();
        let output_format = MetricsWriter::from_config(&self.config.output)
            .write(&metrics, &output_path)
            .map_err(|source| PipelineError::Export {
                path: output_path.display().to_string(),
                source,
            })?;
        info!("Metrics exported to {}", output_path.display());

        Ok(RunReport {
            input_path: self.config.input_path()?.to_path_buf(),
            output_path,
            output_format,
            rows: series.len(),
            metrics,
            drawdown,
            integrity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn config_for(input: &Path, output: &Path) -> Config {
        let mut config = Config::default();
        config.input.path = Some(input.to_path_buf());
        config.output.path = output.to_path_buf();
        config
    }

    #[test]
    fn test_run_end_to_end() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("master_day.csv");
        let output = dir.path().join("out").join("metrics.csv");
        fs::write(
            &input,
            "start_time,close\n\
             2024-01-03 00:00:00,60\n\
             2024-01-01 00:00:00,100\n\
             2024-01-02 00:00:00,120\n",
        )
        .unwrap();

        let report = Pipeline::new(config_for(&input, &output)).run().unwrap();

        assert_eq!(report.rows, 3);
        assert_eq!(report.output_format, OutputFormat::Csv);
        assert_eq!(report.output_path, output);
        // Rows were sorted: 100 -> 120 -> 60
        assert_relative_eq!(
            report.metrics.total_return_percent.unwrap(),
            -40.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            report.metrics.max_drawdown_percent.unwrap(),
            -50.0,
            epsilon = 1e-9
        );
        assert!(report.integrity.all_passed());
        assert!(output.exists());
    }

    #[test]
    fn test_run_with_undefined_metrics() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("zero.csv");
        let output = dir.path().join("metrics.json");
        fs::write(&input, "start_time,close\n2024-01-01,0\n2024-01-02,100\n").unwrap();

        let report = Pipeline::new(config_for(&input, &output)).run().unwrap();

        assert!(report.metrics.is_undefined());
        assert!(!report.integrity.all_passed());
        assert_eq!(report.integrity.flagged_rows().into_iter().collect::<Vec<_>>(), vec![1]);
        let json = fs::read_to_string(&output).unwrap();
        assert!(json.contains("null"));
        assert!(!json.contains("NaN"));
    }

    #[test]
    fn test_missing_input_path() {
        let err = Pipeline::new(Config::default()).run().unwrap_err();
        assert!(matches!(err, PipelineError::Config(ConfigError::MissingInput)));
    }

    #[test]
    fn test_load_failure_names_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("missing.csv");
        let output = dir.path().join("metrics.csv");

        let err = Pipeline::new(config_for(&input, &output)).run().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Load {
                source: LoaderError::FileNotFound(_),
                ..
            }
        ));
        assert!(err.to_string().contains("missing.csv"));
        assert!(!output.exists());
    }

    #[test]
    fn test_export_failure_after_compute() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("prices.csv");
        let output = dir.path().join("metrics.xlsx");
        fs::write(&input, "start_time,close\n2024-01-01,1\n2024-01-02,2\n").unwrap();

        let err = Pipeline::new(config_for(&input, &output)).run().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Export {
                source: ExportError::UnsupportedFormat(_),
                ..
            }
        ));
    }

    #[test]
    fn test_check_only() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("prices.csv");
        let output = dir.path().join("metrics.csv");
        fs::write(&input, "start_time,close\n2024-01-01,1\n").unwrap();

        let report = Pipeline::new(config_for(&input, &output)).check().unwrap();
        assert_eq!(report.rows, 1);
        assert_eq!(report.failed_checks().len(), 1);
        assert!(!output.exists());
    }
}
