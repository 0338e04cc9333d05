//! CLI entry point: load a CSV file, run the analysis pipeline and print the
//! report as JSON on stdout.
//!
//! Fatal input failures (missing file, unsupported extension, parse errors)
//! print `{"error": ...}` and exit non-zero; the presentation layer treats
//! both shapes as one contract.

use clap::Parser;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::path::Path;
use std::process::ExitCode;
use tabular_insights::{Analyzer, AnalyzerConfig};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Statistical analysis of tabular datasets",
    long_about = "Analyzes a CSV dataset and prints a JSON report with per-column\n\
                  statistics, histograms, correlations, clustering, anomaly\n\
                  detection and plain-language insights.\n\n\
                  EXAMPLES:\n  \
                  tabular-insights data.csv\n  \
                  tabular-insights data.csv --pretty\n  \
                  tabular-insights data.csv --contamination 0.05"
)]
struct Args {
    /// Path to the CSV file to analyze
    input: String,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,

    /// Expected fraction of anomalous rows (0.0 - 0.5)
    #[arg(long, default_value_t = 0.1)]
    contamination: f64,

    /// Seed for the clustering and anomaly detection RNG
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(report) => {
            println!("{}", report);
            ExitCode::SUCCESS
        }
        Err(message) => {
            error!("{}", message);
            println!("{}", serde_json::json!({ "error": message }));
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<String, String> {
    let df = load_csv(&args.input).map_err(|e| e.to_string())?;
    debug!(rows = df.height(), columns = df.width(), "dataset loaded");

    let analyzer = Analyzer::with_config(AnalyzerConfig {
        contamination: args.contamination,
        seed: args.seed,
        ..AnalyzerConfig::default()
    });
    let report = analyzer.analyze(&df).map_err(|e| e.to_string())?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };
    json.map_err(|e| e.to_string())
}

fn load_csv(input: &str) -> Result<DataFrame, tabular_insights::AnalysisError> {
    let path = Path::new(input);
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if extension != "csv" {
        return Err(tabular_insights::AnalysisError::UnsupportedFormat(format!(
            ".{}",
            extension
        )));
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}
