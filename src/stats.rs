//! Descriptive statistics: per-column summaries and histograms.
//!
//! All functions here are pure functions of the column values. Conventions
//! for degenerate inputs: aggregates over zero values are NaN (serialized as
//! null), the sample standard deviation needs at least 2 values, histograms
//! need a non-degenerate `[min, max]` range.

use crate::types::{Histogram, NumericStats};

/// Number of equal-width histogram bins.
pub const HISTOGRAM_BINS: usize = 10;

/// Arithmetic mean; NaN for an empty slice.
pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (N-1 denominator); NaN below 2 values.
pub(crate) fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64;
    variance.sqrt()
}

/// Quantile by linear interpolation on an ascending-sorted slice.
///
/// `pos = q * (n - 1)`; the value is interpolated between the neighbouring
/// order statistics. NaN for an empty slice.
pub(crate) fn quantile_linear(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return sorted[0];
    }
    let pos = q * (n - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + frac * (sorted[upper] - sorted[lower])
}

/// IQR fences `(Q1 - 1.5*IQR, Q3 + 1.5*IQR)` of an ascending-sorted slice.
pub(crate) fn iqr_fences(sorted: &[f64]) -> (f64, f64) {
    let q1 = quantile_linear(sorted, 0.25);
    let q3 = quantile_linear(sorted, 0.75);
    let iqr = q3 - q1;
    (q1 - 1.5 * iqr, q3 + 1.5 * iqr)
}

/// Summarize the non-missing values of a numeric column.
pub fn numeric_summary(values: &[f64]) -> NumericStats {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let (min, max) = match (sorted.first(), sorted.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => (f64::NAN, f64::NAN),
    };

    let (lower, upper) = iqr_fences(&sorted);
    let outliers = if sorted.is_empty() {
        0
    } else {
        sorted.iter().filter(|v| **v < lower || **v > upper).count()
    };

    NumericStats {
        mean: mean(values),
        median: quantile_linear(&sorted, 0.5),
        std: sample_std(values),
        min,
        max,
        outliers,
    }
}

/// Build the 10-bin histogram over `[min, max]`.
///
/// Returns None when the column has no values or a degenerate range
/// (`min == max`), matching the report contract.
pub fn histogram(values: &[f64]) -> Option<Histogram> {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if values.is_empty() || min >= max {
        return None;
    }

    let width = (max - min) / HISTOGRAM_BINS as f64;
    let bin_edges: Vec<f64> = (0..HISTOGRAM_BINS)
        .map(|i| min + i as f64 * width)
        .collect();

    let mut counts = vec![0u32; HISTOGRAM_BINS];
    for value in values {
        // The last bin is inclusive of max; float rounding near the top edge
        // is clamped into it as well.
        let bin = (((value - min) / width) as usize).min(HISTOGRAM_BINS - 1);
        counts[bin] += 1;
    }

    Some(Histogram { bin_edges, counts })
}
