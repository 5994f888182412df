pub mod config;
pub mod data;
pub mod export;
pub mod metrics;
pub mod pipeline;
pub mod validation;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use data::{LoaderError, PriceLoader, PricePoint, PriceSeries};
pub use export::{ColumnLabels, ExportError, MetricsWriter, OutputFormat};
pub use metrics::{DrawdownAnalysis, MetricsCalculator, MetricsResult};
pub use pipeline::{Pipeline, PipelineError, RunReport};
pub use validation::{IntegrityReport, SeriesIntegrityValidator};
