//! Tabular Insights
//!
//! A statistical analysis pipeline for tabular datasets built on Polars.
//!
//! One immutable `DataFrame` goes in, one [`AnalysisReport`] comes out:
//!
//! - **Schema classification**: numeric vs. categorical columns
//!   (all-or-nothing: every non-missing cell must parse as a number)
//! - **Descriptive statistics**: mean, median, sample std, min/max,
//!   IQR outlier counts and 10-bin histograms per numeric column
//! - **Correlations**: pairwise-complete Pearson over the numeric columns
//! - **Clustering**: seeded k-means over the numeric feature matrix
//! - **Anomaly detection**: an isolation forest gate with per-column
//!   z-score/IQR explanations
//! - **Insights**: short deterministic plain-language observations
//!
//! Clustering and anomaly detection degrade to per-stage error markers on
//! failure; the rest of the report is always produced.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use polars::prelude::*;
//! use tabular_insights::Analyzer;
//!
//! let df = df![
//!     "price" => [10.0, 12.0, 11.0, 250.0],
//!     "city" => ["Lyon", "Lyon", "Nice", "Nice"],
//! ]?;
//!
//! let report = Analyzer::new().analyze(&df)?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! ```

pub mod anomaly;
pub mod cluster;
pub mod correlation;
pub mod error;
pub mod insight;
pub mod pipeline;
pub mod schema;
pub mod stats;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use anomaly::{AnomalyDetection, IsolationForest, detect_anomalies};
pub use cluster::{KMeans, cluster_rows};
pub use correlation::{CorrelationPair, pairwise_correlations};
pub use error::{AnalysisError, Result as AnalysisResult};
pub use insight::generate_insights;
pub use pipeline::{Analyzer, AnalyzerConfig};
pub use schema::SchemaClassifier;
pub use stats::{histogram, numeric_summary};
pub use types::{
    AnalysisReport, CategoricalStats, ClusterOutcome, ClusterResult, ColumnKind, ColumnStats,
    Histogram, NumericStats, OutlierRecord, RangeStatus,
};
