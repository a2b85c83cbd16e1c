//! Owned cell values and DataFrame extraction/construction helpers.
//!
//! Backend query results arrive as Polars DataFrames. The reconstruction
//! engines (gap-fill, bucket densification) need to read small result sets
//! into owned values, compute against cached metadata, and build fresh
//! frames. [`ScalarValue`] is the owned, lifetime-free cell value used for
//! cached unique-value sets, filter literals and rebuilt columns.

use crate::{Result, VizsqlError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

// =============================================================================
// ScalarValue
// =============================================================================

/// An owned scalar cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

impl ScalarValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Int(v) => Some(*v as f64),
            ScalarValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Total ordering across all variants: numbers first (by value), then
    /// booleans, then strings. Used for deterministic result ordering.
    pub fn total_cmp(&self, other: &ScalarValue) -> Ordering {
        use ScalarValue::*;
        match (self, other) {
            (Int(_) | Float(_), Int(_) | Float(_)) => {
                let a = self.as_f64().unwrap_or(f64::NAN);
                let b = other.as_f64().unwrap_or(f64::NAN);
                a.total_cmp(&b)
            }
            (Bool(a), Bool(b)) => a.cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            ScalarValue::Int(_) | ScalarValue::Float(_) => 0,
            ScalarValue::Bool(_) => 1,
            ScalarValue::String(_) => 2,
        }
    }

    /// Convert a borrowed Polars value into an owned scalar.
    ///
    /// Returns `None` for nulls and for dtypes the engine has no use for
    /// (nested types, binary, etc.).
    pub fn from_any(value: &AnyValue) -> Option<ScalarValue> {
        match value {
            AnyValue::Null => None,
            AnyValue::Boolean(v) => Some(ScalarValue::Bool(*v)),
            AnyValue::String(v) => Some(ScalarValue::String((*v).to_string())),
            AnyValue::StringOwned(v) => Some(ScalarValue::String(v.to_string())),
            AnyValue::Int8(v) => Some(ScalarValue::Int(*v as i64)),
            AnyValue::Int16(v) => Some(ScalarValue::Int(*v as i64)),
            AnyValue::Int32(v) => Some(ScalarValue::Int(*v as i64)),
            AnyValue::Int64(v) => Some(ScalarValue::Int(*v)),
            AnyValue::UInt8(v) => Some(ScalarValue::Int(*v as i64)),
            AnyValue::UInt16(v) => Some(ScalarValue::Int(*v as i64)),
            AnyValue::UInt32(v) => Some(ScalarValue::Int(*v as i64)),
            AnyValue::UInt64(v) => Some(ScalarValue::Int(*v as i64)),
            AnyValue::Float32(v) => Some(ScalarValue::Float(*v as f64)),
            AnyValue::Float64(v) => Some(ScalarValue::Float(*v)),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Int(v) => write!(f, "{}", v),
            ScalarValue::Float(v) => write!(f, "{}", v),
            ScalarValue::Bool(v) => write!(f, "{}", v),
            ScalarValue::String(v) => write!(f, "{}", v),
        }
    }
}

// =============================================================================
// Extraction helpers
// =============================================================================

/// Read one cell as an owned scalar. `Ok(None)` means null.
pub fn scalar_at(df: &DataFrame, column: &str, row: usize) -> Result<Option<ScalarValue>> {
    let col = df
        .column(column)
        .map_err(|e| VizsqlError::BackendError(format!("missing result column: {}", e)))?;
    let value = col
        .get(row)
        .map_err(|e| VizsqlError::BackendError(format!("row out of range: {}", e)))?;
    Ok(ScalarValue::from_any(&value))
}

/// Read one cell as `f64`, erroring on nulls and non-numeric values.
pub fn f64_at(df: &DataFrame, column: &str, row: usize) -> Result<f64> {
    scalar_at(df, column, row)?
        .and_then(|v| v.as_f64())
        .ok_or_else(|| {
            VizsqlError::BackendError(format!(
                "expected a numeric value in column '{}' at row {}",
                column, row
            ))
        })
}

/// Read one cell as a non-negative count.
pub fn usize_at(df: &DataFrame, column: &str, row: usize) -> Result<usize> {
    let value = f64_at(df, column, row)?;
    if value < 0.0 {
        return Err(VizsqlError::BackendError(format!(
            "expected a non-negative count in column '{}', got {}",
            column, value
        )));
    }
    Ok(value as usize)
}

/// Read a whole column into owned scalars (`None` for null cells).
pub fn column_scalars(df: &DataFrame, column: &str) -> Result<Vec<Option<ScalarValue>>> {
    (0..df.height())
        .map(|row| scalar_at(df, column, row))
        .collect()
}

// =============================================================================
// Construction helpers
// =============================================================================

/// Build a Series from homogeneous scalars.
///
/// Mixed int/float columns are widened to `Float64`; an empty slice yields
/// an empty `Float64` series. Mixing numbers with strings or booleans is an
/// internal error, since rebuilt columns always come from one source column.
pub fn series_from_scalars(name: &str, values: &[ScalarValue]) -> Result<Series> {
    let Some(first) = values.first() else {
        return Ok(Series::new_empty(name.into(), &DataType::Float64));
    };

    match first {
        ScalarValue::Int(_) | ScalarValue::Float(_) => {
            let all_int = values.iter().all(|v| matches!(v, ScalarValue::Int(_)));
            if all_int {
                let ints: Vec<i64> = values
                    .iter()
                    .map(|v| match v {
                        ScalarValue::Int(i) => *i,
                        _ => unreachable!(),
                    })
                    .collect();
                Ok(Series::new(name.into(), ints))
            } else {
                let floats: Result<Vec<f64>> = values
                    .iter()
                    .map(|v| v.as_f64().ok_or_else(|| mixed_column_error(name)))
                    .collect();
                Ok(Series::new(name.into(), floats?))
            }
        }
        ScalarValue::Bool(_) => {
            let bools: Result<Vec<bool>> = values
                .iter()
                .map(|v| match v {
                    ScalarValue::Bool(b) => Ok(*b),
                    _ => Err(mixed_column_error(name)),
                })
                .collect();
            Ok(Series::new(name.into(), bools?))
        }
        ScalarValue::String(_) => {
            let strings: Result<Vec<String>> = values
                .iter()
                .map(|v| match v {
                    ScalarValue::String(s) => Ok(s.clone()),
                    _ => Err(mixed_column_error(name)),
                })
                .collect();
            Ok(Series::new(name.into(), strings?))
        }
    }
}

fn mixed_column_error(name: &str) -> VizsqlError {
    VizsqlError::InternalError(format!("mixed value types in rebuilt column '{}'", name))
}

/// Assemble a DataFrame from series, mapping Polars errors to internal ones.
pub fn frame_from_series(series: Vec<Series>) -> Result<DataFrame> {
    let columns: Vec<Column> = series.into_iter().map(|s| s.into_column()).collect();
    DataFrame::new(columns)
        .map_err(|e| VizsqlError::InternalError(format!("failed to assemble result table: {}", e)))
}
