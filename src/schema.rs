//! Schema classification: numeric vs. categorical columns.

use crate::error::Result;
use crate::types::ColumnKind;
use crate::utils::{is_numeric_dtype, parse_numeric_string};
use polars::prelude::*;
use tracing::debug;

/// Partitions dataset columns into numeric and categorical.
pub struct SchemaClassifier;

impl SchemaClassifier {
    /// Classify every column, in column order. Never fails on data content;
    /// only propagates polars access errors.
    pub fn classify(df: &DataFrame) -> Result<Vec<ColumnKind>> {
        let mut kinds = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            let series = column.as_materialized_series();
            let kind = Self::classify_series(series)?;
            debug!(column = %series.name(), ?kind, "classified column");
            kinds.push(kind);
        }
        Ok(kinds)
    }

    /// A column is Numeric iff 100% of its non-missing values are real
    /// numbers. Columns with zero rows are Categorical by default.
    fn classify_series(series: &Series) -> Result<ColumnKind> {
        if series.is_empty() {
            return Ok(ColumnKind::Categorical);
        }
        if is_numeric_dtype(series.dtype()) {
            return Ok(ColumnKind::Numeric);
        }
        if series.dtype() == &DataType::String {
            let non_null = series.len() - series.null_count();
            if non_null == 0 {
                return Ok(ColumnKind::Categorical);
            }
            let all_numeric = series
                .str()?
                .into_iter()
                .flatten()
                .all(|v| parse_numeric_string(v).is_some());
            if all_numeric {
                return Ok(ColumnKind::Numeric);
            }
        }
        Ok(ColumnKind::Categorical)
    }
}
