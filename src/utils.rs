//! Shared helpers for cell parsing and numeric column extraction.

use crate::error::Result;
use crate::types::ColumnKind;
use polars::prelude::*;

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Try to parse a string cell as a finite real number.
///
/// Strict: the schema rule is all-or-nothing, so anything beyond surrounding
/// whitespace disqualifies the value. Non-finite tokens (`NaN`, `inf`) are
/// rejected as well; the engines treat them as missing.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Render one cell as text for row snapshots. Missing cells become "".
pub fn format_cell(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(s) => (*s).to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => format!("{}", other),
    }
}

/// A numeric column extracted from the dataset, one `Option<f64>` per row.
///
/// This is the shared input of the correlation, cluster and anomaly engines;
/// each applies its own missing-value policy (`present` drops, `filled`
/// substitutes).
#[derive(Debug, Clone)]
pub struct NumericColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl NumericColumn {
    /// Non-missing values, in row order. Non-finite cells count as missing.
    pub fn present(&self) -> Vec<f64> {
        self.values
            .iter()
            .copied()
            .filter_map(|v| v.filter(|x| x.is_finite()))
            .collect()
    }

    /// All rows with missing or non-finite values replaced by `fill`.
    pub fn filled(&self, fill: f64) -> Vec<f64> {
        self.values
            .iter()
            .copied()
            .map(|v| v.filter(|x| x.is_finite()).unwrap_or(fill))
            .collect()
    }
}

/// Extract every Numeric column as `f64` cells, preserving column order.
///
/// String columns classified as numeric are parsed cell by cell; native
/// numeric dtypes are cast through polars.
pub fn numeric_columns(df: &DataFrame, kinds: &[ColumnKind]) -> Result<Vec<NumericColumn>> {
    let mut columns = Vec::new();
    for (column, kind) in df.get_columns().iter().zip(kinds) {
        if *kind != ColumnKind::Numeric {
            continue;
        }
        let series = column.as_materialized_series();
        let values: Vec<Option<f64>> = match series.dtype() {
            DataType::String => series
                .str()?
                .into_iter()
                .map(|v| v.and_then(parse_numeric_string))
                .collect(),
            _ => series
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .map(|v| v.filter(|x| x.is_finite()))
                .collect(),
        };
        columns.push(NumericColumn {
            name: series.name().to_string(),
            values,
        });
    }
    Ok(columns)
}
