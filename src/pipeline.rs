//! The analysis pipeline orchestrator.
//!
//! Sequences schema classification, descriptive statistics, correlations,
//! clustering, anomaly detection and insight generation over one immutable
//! `DataFrame`, then assembles the final [`AnalysisReport`]. Clustering and
//! anomaly failures are isolated to their report fields; the other stages
//! always populate.

use crate::anomaly::detect_anomalies;
use crate::cluster::cluster_rows;
use crate::correlation::pairwise_correlations;
use crate::error::Result;
use crate::insight::{STRONG_CORRELATION, generate_insights};
use crate::schema::SchemaClassifier;
use crate::stats::{histogram, numeric_summary};
use crate::types::{AnalysisReport, CategoricalStats, ColumnKind, ColumnStats, Histogram};
use crate::utils::{format_cell, numeric_columns};
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Tuning knobs for one analysis run. The defaults mirror the report
/// contract: 10% contamination, seed 0, strong correlations above |0.8|.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Expected fraction of anomalous rows for the global detector.
    pub contamination: f64,
    /// Seed shared by the clustering and anomaly RNG streams.
    pub seed: u64,
    /// K-means restarts; the lowest-inertia run wins.
    pub kmeans_restarts: usize,
    /// |r| above which a correlation appears in the insights.
    pub strong_correlation: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            contamination: 0.1,
            seed: 0,
            kmeans_restarts: 10,
            strong_correlation: STRONG_CORRELATION,
        }
    }
}

/// Runs the full analysis pipeline over one dataset.
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            config: AnalyzerConfig::default(),
        }
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Produce the complete report for one dataset.
    ///
    /// The only errors surfaced here are dataset access failures; stage-local
    /// clustering/anomaly failures degrade to their markers instead.
    pub fn analyze(&self, df: &DataFrame) -> Result<AnalysisReport> {
        let headers: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        info!(rows = df.height(), columns = df.width(), "starting analysis");

        let types = SchemaClassifier::classify(df)?;
        let numeric = numeric_columns(df, &types)?;
        debug!(numeric = numeric.len(), "schema classified");

        let (stats, histograms) = column_summaries(df, &headers, &types, &numeric)?;

        let correlations = pairwise_correlations(&numeric);
        let raw_rows = render_rows(df);

        let clusters = cluster_rows(
            &numeric,
            df.height(),
            self.config.seed,
            self.config.kmeans_restarts,
        );
        let anomalies = detect_anomalies(
            &numeric,
            &headers,
            &raw_rows,
            self.config.contamination,
            self.config.seed,
        );

        let insights = generate_insights(
            df.height(),
            &correlations,
            &headers,
            &stats,
            self.config.strong_correlation,
        );

        let correlations: BTreeMap<String, f64> = correlations
            .iter()
            .map(|pair| (pair.key(), pair.coefficient))
            .collect();

        info!(
            insights = insights.len(),
            flagged = anomalies.flagged_rows.len(),
            "analysis finished"
        );
        Ok(AnalysisReport {
            headers,
            types,
            stats,
            correlations,
            histograms,
            clusters,
            insights,
            raw_rows,
            outlier_indices: anomalies.flagged_rows,
            outlier_details: anomalies.records,
        })
    }
}

type SummaryMaps = (BTreeMap<String, ColumnStats>, BTreeMap<String, Histogram>);

/// Per-column statistics and histograms.
///
/// Numeric columns drop missing values before aggregating; categorical
/// columns count distinct values with nulls excluded.
fn column_summaries(
    df: &DataFrame,
    headers: &[String],
    types: &[ColumnKind],
    numeric: &[crate::utils::NumericColumn],
) -> Result<SummaryMaps> {
    let mut stats = BTreeMap::new();
    let mut histograms = BTreeMap::new();
    let mut numeric_iter = numeric.iter();

    for (header, kind) in headers.iter().zip(types) {
        match kind {
            ColumnKind::Numeric => {
                let column = numeric_iter
                    .next()
                    .ok_or_else(|| crate::error::AnalysisError::ColumnNotFound(header.clone()))?;
                let present = column.present();
                stats.insert(header.clone(), ColumnStats::Numeric(numeric_summary(&present)));
                if let Some(hist) = histogram(&present) {
                    histograms.insert(header.clone(), hist);
                }
            }
            ColumnKind::Categorical => {
                let series = df.column(header)?.as_materialized_series();
                let unique = series.drop_nulls().n_unique()?;
                stats.insert(
                    header.clone(),
                    ColumnStats::Categorical(CategoricalStats { unique }),
                );
            }
        }
    }
    Ok((stats, histograms))
}

/// Render the whole table as text, row-major. Missing cells become "".
fn render_rows(df: &DataFrame) -> Vec<Vec<String>> {
    let columns: Vec<&Series> = df
        .get_columns()
        .iter()
        .map(|c| c.as_materialized_series())
        .collect();
    (0..df.height())
        .map(|row| {
            columns
                .iter()
                .map(|series| {
                    series
                        .get(row)
                        .map(|value| format_cell(&value))
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClusterOutcome;

    #[test]
    fn test_render_rows_stringifies_nulls_as_empty() {
        let df = df![
            "x" => [Some(1.0f64), None],
            "name" => ["alice", "bob"],
        ]
        .unwrap();
        let rows = render_rows(&df);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["1.0", "alice"]);
        assert_eq!(rows[1][0], "");
        assert_eq!(rows[1][1], "bob");
    }

    #[test]
    fn test_analyze_mixed_dataset() {
        let df = df![
            "x" => [1.0f64, 2.0, 3.0, 4.0, 100.0],
            "y" => [10.0f64, 20.0, 30.0, 40.0, 39.0],
            "label" => ["a", "b", "a", "b", "c"],
        ]
        .unwrap();
        let report = Analyzer::new().analyze(&df).unwrap();

        assert_eq!(report.headers, vec!["x", "y", "label"]);
        assert_eq!(
            report.types,
            vec![ColumnKind::Numeric, ColumnKind::Numeric, ColumnKind::Categorical]
        );
        let x_stats = report.stats["x"].as_numeric().unwrap();
        assert_eq!(x_stats.mean, 22.0);
        assert_eq!(x_stats.outliers, 1);
        assert!(report.correlations.contains_key("x__y"));
        assert_eq!(report.raw_rows.len(), 5);
        assert!(matches!(report.clusters, Some(ClusterOutcome::Ready(_))));
    }

    #[test]
    fn test_analyze_is_deterministic() {
        let df = df![
            "a" => (0..30).map(|i| (i * 7 % 13) as f64).collect::<Vec<f64>>(),
            "b" => (0..30).map(|i| (i * 11 % 17) as f64).collect::<Vec<f64>>(),
        ]
        .unwrap();
        let first = Analyzer::new().analyze(&df).unwrap();
        let second = Analyzer::new().analyze(&df).unwrap();
        assert_eq!(first.clusters, second.clusters);
        assert_eq!(first.outlier_indices, second.outlier_indices);
        assert_eq!(first.insights, second.insights);
    }

    #[test]
    fn test_categorical_unique_excludes_nulls() {
        let df = df!["c" => [Some("a"), Some("b"), None, Some("a")]].unwrap();
        let report = Analyzer::new().analyze(&df).unwrap();
        match &report.stats["c"] {
            ColumnStats::Categorical(stats) => assert_eq!(stats.unique, 2),
            ColumnStats::Numeric(_) => panic!("expected categorical stats"),
        }
    }
}
