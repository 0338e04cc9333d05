//! Anomaly detection: a global isolation forest gate plus per-column
//! univariate explanations.
//!
//! The global detector nominates rows; a row/column pair only produces an
//! [`OutlierRecord`] when the column independently corroborates the anomaly
//! (z-score above 2.0 or a value outside the IQR fences). Any internal
//! failure degrades both outputs to empty lists; the stage never aborts the
//! pipeline.

mod forest;

pub use forest::IsolationForest;

use crate::stats::{iqr_fences, mean, sample_std};
use crate::types::{OutlierRecord, RangeStatus};
use crate::utils::NumericColumn;
use ndarray::Array2;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Z-score above which a column corroborates a flagged row.
const Z_SCORE_THRESHOLD: f64 = 2.0;

/// Output of the anomaly stage.
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetection {
    /// 0-based flagged row indices, ascending.
    pub flagged_rows: Vec<usize>,
    /// One record per corroborated (row, column) pair, in row-major order.
    pub records: Vec<OutlierRecord>,
}

/// Per-column reference statistics for the univariate explainer, computed
/// over the column's non-missing values.
struct ColumnReference {
    mean: f64,
    std: f64,
    lower_fence: f64,
    upper_fence: f64,
}

impl ColumnReference {
    fn of(column: &NumericColumn) -> Self {
        let present = column.present();
        let mut sorted = present.clone();
        sorted.sort_by(f64::total_cmp);
        let (lower_fence, upper_fence) = iqr_fences(&sorted);
        Self {
            mean: mean(&present),
            std: sample_std(&present),
            lower_fence,
            upper_fence,
        }
    }

    fn z_score(&self, value: f64) -> f64 {
        if self.std.is_finite() && self.std > 0.0 {
            (value - self.mean).abs() / self.std
        } else {
            0.0
        }
    }

    fn range_status(&self, value: f64) -> Option<RangeStatus> {
        if value < self.lower_fence {
            Some(RangeStatus::BelowRange)
        } else if value > self.upper_fence {
            Some(RangeStatus::AboveRange)
        } else {
            None
        }
    }
}

/// Run both detectors over the numeric columns.
///
/// `raw_rows` is the stringified table used for row snapshots; `headers` is
/// the full column list (not just numeric columns).
pub fn detect_anomalies(
    columns: &[NumericColumn],
    headers: &[String],
    raw_rows: &[Vec<String>],
    contamination: f64,
    seed: u64,
) -> AnomalyDetection {
    let rows = raw_rows.len();
    if columns.is_empty() || rows < 2 {
        return AnomalyDetection::default();
    }

    let flagged = match global_flags(columns, rows, contamination, seed) {
        Ok(flagged) => flagged,
        Err(e) => {
            warn!("anomaly detection degraded: {}", e);
            return AnomalyDetection::default();
        }
    };
    debug!(flagged = flagged.len(), rows, "global detector finished");

    let references: Vec<ColumnReference> = columns.iter().map(ColumnReference::of).collect();
    let mut records = Vec::new();
    for &row in &flagged {
        for (column, reference) in columns.iter().zip(&references) {
            let Some(value) = column.values[row].filter(|v| v.is_finite()) else {
                continue;
            };
            let z_score = reference.z_score(value);
            let iqr_status = reference.range_status(value);
            if z_score > Z_SCORE_THRESHOLD || iqr_status.is_some() {
                records.push(OutlierRecord {
                    id: row + 1,
                    variable: column.name.clone(),
                    value,
                    z_score,
                    iqr_status,
                    row_data: row_snapshot(headers, &raw_rows[row]),
                });
            }
        }
    }

    AnomalyDetection {
        flagged_rows: flagged,
        records,
    }
}

/// Fit the isolation forest on the 0-filled feature matrix and return the
/// ascending list of flagged row indices.
fn global_flags(
    columns: &[NumericColumn],
    rows: usize,
    contamination: f64,
    seed: u64,
) -> crate::error::Result<Vec<usize>> {
    let mut flat = Vec::with_capacity(rows * columns.len());
    for row in 0..rows {
        for column in columns {
            flat.push(column.values[row].filter(|v| v.is_finite()).unwrap_or(0.0));
        }
    }
    let x = Array2::from_shape_vec((rows, columns.len()), flat)
        .map_err(|e| crate::error::AnalysisError::AnomalyDetection(e.to_string()))?;

    let mut forest = IsolationForest::new()
        .with_contamination(contamination)
        .with_seed(seed);
    forest.fit(&x)?;
    Ok(forest
        .predict(&x)?
        .into_iter()
        .enumerate()
        .filter_map(|(i, anomalous)| anomalous.then_some(i))
        .collect())
}

fn row_snapshot(headers: &[String], raw_row: &[String]) -> BTreeMap<String, String> {
    headers.iter().cloned().zip(raw_row.iter().cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, values: &[Option<f64>]) -> NumericColumn {
        NumericColumn {
            name: name.to_string(),
            values: values.to_vec(),
        }
    }

    fn raw(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_no_numeric_columns_is_empty() {
        let raw_rows = raw(&[&["a"], &["b"]]);
        let result = detect_anomalies(&[], &["name".to_string()], &raw_rows, 0.1, 0);
        assert!(result.flagged_rows.is_empty());
        assert!(result.records.is_empty());
    }

    #[test]
    fn test_single_row_is_empty_not_error() {
        let cols = [column("x", &[Some(1.0)])];
        let raw_rows = raw(&[&["1"]]);
        let result = detect_anomalies(&cols, &["x".to_string()], &raw_rows, 0.1, 0);
        assert!(result.flagged_rows.is_empty());
    }

    #[test]
    fn test_extreme_row_flagged_and_explained() {
        let mut x_vals: Vec<Option<f64>> = (0..20).map(|i| Some((i % 5) as f64)).collect();
        let mut y_vals: Vec<Option<f64>> = (0..20).map(|i| Some((i % 5) as f64 + 1.0)).collect();
        x_vals.push(Some(500.0));
        y_vals.push(Some(500.0));
        let cols = [column("x", &x_vals), column("y", &y_vals)];

        let headers = vec!["x".to_string(), "y".to_string()];
        let raw_rows: Vec<Vec<String>> = x_vals
            .iter()
            .zip(&y_vals)
            .map(|(x, y)| vec![format!("{}", x.unwrap()), format!("{}", y.unwrap())])
            .collect();

        let result = detect_anomalies(&cols, &headers, &raw_rows, 0.1, 0);
        assert!(result.flagged_rows.contains(&20));

        let extreme: Vec<&OutlierRecord> =
            result.records.iter().filter(|r| r.id == 21).collect();
        assert!(!extreme.is_empty());
        let record = extreme[0];
        assert_eq!(record.iqr_status, Some(RangeStatus::AboveRange));
        assert!(record.z_score > Z_SCORE_THRESHOLD);
        assert_eq!(record.row_data["x"], "500");
    }

    #[test]
    fn test_records_only_for_flagged_rows() {
        let x_vals: Vec<Option<f64>> = (0..30).map(|i| Some(i as f64)).collect();
        let y_vals: Vec<Option<f64>> = (0..30).map(|i| Some((30 - i) as f64)).collect();
        let cols = [column("x", &x_vals), column("y", &y_vals)];
        let headers = vec!["x".to_string(), "y".to_string()];
        let raw_rows: Vec<Vec<String>> =
            (0..30).map(|i| vec![i.to_string(), (30 - i).to_string()]).collect();

        let result = detect_anomalies(&cols, &headers, &raw_rows, 0.1, 0);
        for record in &result.records {
            assert!(result.flagged_rows.contains(&(record.id - 1)));
        }
    }

    #[test]
    fn test_missing_cell_produces_no_record_for_that_column() {
        let mut x_vals: Vec<Option<f64>> = (0..15).map(|i| Some((i % 3) as f64)).collect();
        let mut y_vals: Vec<Option<f64>> = (0..15).map(|i| Some((i % 3) as f64)).collect();
        // The extreme row is missing in x, so only y may explain it.
        x_vals.push(None);
        y_vals.push(Some(900.0));
        let cols = [column("x", &x_vals), column("y", &y_vals)];
        let headers = vec!["x".to_string(), "y".to_string()];
        let raw_rows: Vec<Vec<String>> = x_vals
            .iter()
            .zip(&y_vals)
            .map(|(x, y)| {
                vec![
                    x.map(|v| v.to_string()).unwrap_or_default(),
                    y.map(|v| v.to_string()).unwrap_or_default(),
                ]
            })
            .collect();

        let result = detect_anomalies(&cols, &headers, &raw_rows, 0.1, 0);
        assert!(result.records.iter().all(|r| r.variable == "y"));
    }

    #[test]
    fn test_all_nan_column_degrades_instead_of_crashing() {
        let x_vals: Vec<Option<f64>> = (0..10).map(|i| Some((i * i % 7) as f64)).collect();
        let y_vals: Vec<Option<f64>> = (0..10).map(|_| Some(f64::NAN)).collect();
        let cols = [column("x", &x_vals), column("y", &y_vals)];
        let headers = vec!["x".to_string(), "y".to_string()];
        let raw_rows: Vec<Vec<String>> =
            (0..10).map(|i| vec![i.to_string(), String::new()]).collect();

        let result = detect_anomalies(&cols, &headers, &raw_rows, 0.1, 0);
        assert!(result
            .records
            .iter()
            .all(|r| r.variable == "x" && r.value.is_finite()));
    }

    #[test]
    fn test_zero_std_gives_zero_z_score() {
        let reference = ColumnReference::of(&column("c", &[Some(5.0), Some(5.0), Some(5.0)]));
        assert_eq!(reference.z_score(9.0), 0.0);
        // The IQR fences still catch it.
        assert_eq!(reference.range_status(9.0), Some(RangeStatus::AboveRange));
    }
}
