//! Pairwise Pearson correlation over the numeric columns.

use crate::utils::NumericColumn;

/// Correlation between one unordered pair of numeric columns.
///
/// `left` and `right` keep the columns' original dataset order, so emitting
/// pairs in generation order reproduces the stable `i < j` enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationPair {
    pub left: String,
    pub right: String,
    pub coefficient: f64,
}

impl CorrelationPair {
    /// Report key, `"colA__colB"`.
    pub fn key(&self) -> String {
        format!("{}__{}", self.left, self.right)
    }
}

/// Compute the full pairwise correlation list.
///
/// Runs only when at least 2 numeric columns exist; each pair uses
/// pairwise-complete observations (rows missing in either column are
/// excluded for that pair). Degenerate pairs (zero variance, fewer than 2
/// complete rows) are coerced to 0.0.
pub fn pairwise_correlations(columns: &[NumericColumn]) -> Vec<CorrelationPair> {
    if columns.len() < 2 {
        return Vec::new();
    }
    let mut pairs = Vec::with_capacity(columns.len() * (columns.len() - 1) / 2);
    for i in 0..columns.len() {
        for j in (i + 1)..columns.len() {
            pairs.push(CorrelationPair {
                left: columns[i].name.clone(),
                right: columns[j].name.clone(),
                coefficient: pearson(&columns[i].values, &columns[j].values),
            });
        }
    }
    pairs
}

/// Pearson coefficient over pairwise-complete rows (non-finite cells count
/// as missing), NaN coerced to 0.0 and the result clamped into `[-1, 1]`
/// against float drift.
fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> f64 {
    let complete: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    let n = complete.len();
    if n < 2 {
        return 0.0;
    }

    let mean_x = complete.iter().map(|(x, _)| x).sum::<f64>() / n as f64;
    let mean_y = complete.iter().map(|(_, y)| y).sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &complete {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let r = cov / (var_x.sqrt() * var_y.sqrt());
    if r.is_nan() { 0.0 } else { r.clamp(-1.0, 1.0) }
}
