//! Report types produced by the analysis pipeline.
//!
//! Everything here serializes to the JSON shape consumed by the presentation
//! layer; field renames follow that contract (`binEdges`, `zScore`, `rawRows`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Classification of a column, derived once and reused by every engine.
///
/// A column is `Numeric` iff every non-missing cell is a real number; there
/// are no partial-numeric columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// Summary statistics for a numeric column.
///
/// `std` is the sample standard deviation (N-1 denominator) and is NaN when
/// fewer than 2 values are present; NaN fields serialize as JSON null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericStats {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    /// Count of values outside `[Q1 - 1.5*IQR, Q3 + 1.5*IQR]`.
    pub outliers: usize,
}

/// Summary statistics for a categorical column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalStats {
    /// Distinct non-missing values.
    pub unique: usize,
}

/// Per-column statistics, shaped by the column's kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnStats {
    Numeric(NumericStats),
    Categorical(CategoricalStats),
}

impl ColumnStats {
    pub fn as_numeric(&self) -> Option<&NumericStats> {
        match self {
            Self::Numeric(stats) => Some(stats),
            Self::Categorical(_) => None,
        }
    }
}

/// A 10-bin equal-width histogram over `[min, max]`.
///
/// Bins are half-open `[edge, next)` except the last, which includes `max`,
/// so the counts always sum to the column's non-missing value count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Histogram {
    /// Ascending lower bound of each bin.
    #[serde(rename = "binEdges")]
    pub bin_edges: Vec<f64>,
    pub counts: Vec<u32>,
}

/// Output of a successful clustering run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterResult {
    /// One cluster id per row.
    pub assignments: Vec<usize>,
    /// One centroid per cluster, in the same feature space as `points`.
    pub centroids: Vec<Vec<f64>>,
    /// The numeric feature matrix actually clustered (nulls filled with 0).
    pub points: Vec<Vec<f64>>,
}

/// Clustering stage outcome: either a result or a stage-scoped error marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClusterOutcome {
    Ready(ClusterResult),
    Failed { error: String },
}

impl ClusterOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Position of a value relative to the column's IQR fences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeStatus {
    BelowRange,
    AboveRange,
}

/// One corroborated (row, column) anomaly explanation.
///
/// Records exist only for rows flagged by the global detector, and only when
/// the column independently corroborates the anomaly (z-score above 2.0 or a
/// value outside the IQR fences).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierRecord {
    /// 1-based row id, as shown to users.
    pub id: usize,
    /// Column that triggered this record.
    pub variable: String,
    pub value: f64,
    #[serde(rename = "zScore")]
    pub z_score: f64,
    #[serde(rename = "iqrStatus")]
    pub iqr_status: Option<RangeStatus>,
    /// Full row snapshot, every cell stringified.
    #[serde(rename = "rowData")]
    pub row_data: BTreeMap<String, String>,
}

/// The full analysis report: one per run, immutable once assembled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Column names, in dataset order.
    pub headers: Vec<String>,
    /// Parallel to `headers`.
    pub types: Vec<ColumnKind>,
    pub stats: BTreeMap<String, ColumnStats>,
    /// Keyed `"colA__colB"`, one entry per unordered numeric pair.
    pub correlations: BTreeMap<String, f64>,
    /// Numeric columns only; omitted for empty or degenerate ranges.
    pub histograms: BTreeMap<String, Histogram>,
    /// Absent when the dataset has no numeric columns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clusters: Option<ClusterOutcome>,
    pub insights: Vec<String>,
    /// All cells stringified, row-major.
    #[serde(rename = "rawRows")]
    pub raw_rows: Vec<Vec<String>>,
    /// 0-based indices of rows flagged by the global anomaly detector.
    pub outlier_indices: Vec<usize>,
    pub outlier_details: Vec<OutlierRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&ColumnKind::Numeric).unwrap(),
            "\"numeric\""
        );
        assert_eq!(
            serde_json::to_string(&ColumnKind::Categorical).unwrap(),
            "\"categorical\""
        );
    }

    #[test]
    fn test_column_stats_untagged_shape() {
        let numeric = ColumnStats::Numeric(NumericStats {
            mean: 2.0,
            median: 2.0,
            std: 1.0,
            min: 1.0,
            max: 3.0,
            outliers: 0,
        });
        let json = serde_json::to_value(&numeric).unwrap();
        assert!(json.get("mean").is_some());
        assert!(json.get("unique").is_none());

        let categorical = ColumnStats::Categorical(CategoricalStats { unique: 4 });
        let json = serde_json::to_value(&categorical).unwrap();
        assert_eq!(json, serde_json::json!({"unique": 4}));
    }

    #[test]
    fn test_nan_std_serializes_as_null() {
        let stats = NumericStats {
            mean: 5.0,
            median: 5.0,
            std: f64::NAN,
            min: 5.0,
            max: 5.0,
            outliers: 0,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["std"].is_null());
    }

    #[test]
    fn test_cluster_outcome_error_marker_shape() {
        let outcome = ClusterOutcome::Failed {
            error: "insufficient columns".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["error"], "insufficient columns");
        assert!(outcome.is_failed());
    }

    #[test]
    fn test_outlier_record_field_names() {
        let record = OutlierRecord {
            id: 5,
            variable: "x".to_string(),
            value: 100.0,
            z_score: 3.2,
            iqr_status: Some(RangeStatus::AboveRange),
            row_data: BTreeMap::from([("x".to_string(), "100".to_string())]),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["zScore"], 3.2);
        assert_eq!(json["iqrStatus"], "above_range");
        assert_eq!(json["rowData"]["x"], "100");
    }

    #[test]
    fn test_report_clusters_absent_when_none() {
        let report = AnalysisReport {
            headers: vec!["name".to_string()],
            types: vec![ColumnKind::Categorical],
            stats: BTreeMap::new(),
            correlations: BTreeMap::new(),
            histograms: BTreeMap::new(),
            clusters: None,
            insights: vec![],
            raw_rows: vec![],
            outlier_indices: vec![],
            outlier_details: vec![],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("clusters").is_none());
        assert!(json.get("rawRows").is_some());
    }
}
