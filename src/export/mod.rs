//! Export of computed metrics to tabular files.

pub mod writer;

pub use writer::{ColumnLabels, ExportError, MetricsWriter, OutputFormat};
