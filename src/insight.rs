//! Plain-language insights derived from the statistics and correlations.

use crate::correlation::CorrelationPair;
use crate::types::ColumnStats;
use std::collections::BTreeMap;

/// Default |r| above which a correlation is called out as strong.
pub const STRONG_CORRELATION: f64 = 0.8;

/// Generate the ordered insight sentences.
///
/// Order is fixed: the row-count summary first, then one sentence per strong
/// correlation in pair order, then one per column with IQR outliers in
/// column order. Deterministic; no randomness anywhere.
pub fn generate_insights(
    row_count: usize,
    correlations: &[CorrelationPair],
    headers: &[String],
    stats: &BTreeMap<String, ColumnStats>,
    strong_threshold: f64,
) -> Vec<String> {
    let mut insights = vec![format!("Analyzed {} records.", row_count)];

    for pair in correlations {
        if pair.coefficient.abs() > strong_threshold {
            insights.push(format!(
                "Strong correlation between {} and {} (r = {:.2}).",
                pair.left, pair.right, pair.coefficient
            ));
        }
    }

    for header in headers {
        let outliers = stats
            .get(header)
            .and_then(ColumnStats::as_numeric)
            .map_or(0, |s| s.outliers);
        if outliers > 0 {
            insights.push(format!(
                "Detected {} outlier values in column {}.",
                outliers, header
            ));
        }
    }

    insights
}
