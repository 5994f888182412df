//! # Compute metrics for a price file
//! ohlc-metrics run --input data/master_day.csv --output calculated_financial_metrics.csv
//!
//! # Use a config file, override the output
//! ohlc-metrics --config config/default.toml run --output results/metrics.json
//!
//! # Check a price file without computing anything
//! ohlc-metrics check --input data/master_day.csv

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use ohlc_metrics::export::ColumnLabels;
use ohlc_metrics::metrics::format_metric;
use ohlc_metrics::{Config, Pipeline};

const SEPARATOR: &str = "------------------------------------------------------------";

#[derive(Parser)]
#[command(name = "ohlc-metrics")]
#[command(about = "Total return, maximum drawdown and Sharpe ratio from closing prices")]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Price file (CSV or Parquet)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Timestamp column name
    #[arg(long)]
    time_column: Option<String>,

    /// Closing price column name
    #[arg(long)]
    price_column: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute metrics and export them as a single row
    Run {
        #[command(flatten)]
        input: InputArgs,

        /// Output file (.csv, .parquet or .json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Column naming style in the output
        #[arg(long, value_enum)]
        labels: Option<ColumnLabels>,
    },

    /// Load a price file and report data integrity checks
    Check {
        #[command(flatten)]
        input: InputArgs,
    },
}

impl InputArgs {
    fn apply(self, config: &mut Config) {
        if let Some(path) = self.input {
            config.input.path = Some(path);
        }
        if let Some(column) = self.time_column {
            config.input.time_column = column;
        }
        if let Some(column) = self.price_column {
            config.input.price_column = column;
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let directive = format!("ohlc_metrics={}", level)
        .parse::<Directive>()
        .with_context(|| format!("Invalid log level '{}'", level))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn cmd_run(config: Config) -> Result<()> {
    let report = Pipeline::new(config).run()?;

    println!("--- Calculated Metrics from {} ---", report.input_path.display());
    println!("{}", report.metrics.summary());
    if let (Some(peak), Some(trough)) = (report.drawdown.peak_time, report.drawdown.trough_time) {
        println!(
            "Worst drawdown: {} ({} to {})",
            format_metric(report.drawdown.max_drawdown_pct),
            peak,
            trough
        );
    }
    println!("\nMetrics exported to: {}", report.output_path.display());

    Ok(())
}

fn cmd_check(config: Config) -> Result<()> {
    let report = Pipeline::new(config).check()?;

    println!("{}", SEPARATOR);
    println!("{}", report.summary());
    println!("{}", SEPARATOR);
    for check in &report.checks {
        let status = if check.passed { "PASS" } else { "FAIL" };
        println!("  [{}] {}: {}", status, check.name, check.message);
        if let Some(details) = &check.details {
            println!("         {}", details);
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    init_logging(&config.logging.level)?;

    match cli.command {
        Commands::Run {
            input,
            output,
            labels,
        } => {
            input.apply(&mut config);
            if let Some(path) = output {
                config.output.path = path;
            }
            if let Some(labels) = labels {
                config.output.labels = labels;
            }
            cmd_run(config)?;
        }
        Commands::Check { input } => {
            input.apply(&mut config);
            cmd_check(config)?;
        }
    }

    Ok(())
}
