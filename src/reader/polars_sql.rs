//! Polars SQL context reader.
//!
//! Executes SQL against registered in-memory Polars DataFrames. This reader
//! has no external connection; it backs embedded use and tests. Note that
//! the Polars SQL dialect has no catalog views or `width_bucket`, so the
//! metadata and binning paths need a real backend (or a scripted reader).
//! Ungrouped aggregates are broadcast to one row per input row instead of
//! collapsing to a single row; the count helpers read row 0 and are
//! unaffected.

use crate::reader::Reader;
use crate::{DataFrame, Result, VizsqlError};
use polars::prelude::*;
use polars::sql::SQLContext;
use std::cell::RefCell;
use std::collections::HashSet;

/// In-memory reader over Polars' built-in SQL context.
///
/// # Examples
///
/// ```rust,ignore
/// use vizsql::reader::{PolarsReader, Reader};
/// use polars::prelude::*;
///
/// let reader = PolarsReader::new();
/// let df = df! { "x" => [1, 2, 3] }?;
/// reader.register("data", df)?;
/// let result = reader.execute("SELECT COUNT(*) AS \"length\" FROM data")?;
/// ```
pub struct PolarsReader {
    ctx: RefCell<SQLContext>,
    registered_tables: RefCell<HashSet<String>>,
}

impl PolarsReader {
    pub fn new() -> Self {
        Self {
            ctx: RefCell::new(SQLContext::new()),
            registered_tables: RefCell::new(HashSet::new()),
        }
    }

    /// Register a DataFrame as a queryable table, replacing any previous
    /// registration under the same name.
    pub fn register(&self, name: &str, df: DataFrame) -> Result<()> {
        validate_table_name(name)?;
        if self.table_exists(name) {
            self.ctx.borrow_mut().unregister(name);
            self.registered_tables.borrow_mut().remove(name);
        }
        self.ctx.borrow_mut().register(name, df.lazy());
        self.registered_tables.borrow_mut().insert(name.to_string());
        Ok(())
    }

    fn table_exists(&self, name: &str) -> bool {
        self.registered_tables.borrow().contains(name)
    }

    /// Registered table names.
    pub fn list_tables(&self) -> Vec<String> {
        self.registered_tables.borrow().iter().cloned().collect()
    }
}

impl Default for PolarsReader {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_table_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(VizsqlError::BackendError(
            "Table name cannot be empty".into(),
        ));
    }
    let forbidden = ['"', '\0', '\n', '\r'];
    for ch in forbidden {
        if name.contains(ch) {
            return Err(VizsqlError::BackendError(format!(
                "Table name '{}' contains invalid character '{}'",
                name,
                ch.escape_default()
            )));
        }
    }
    Ok(())
}

impl Reader for PolarsReader {
    fn execute(&self, sql: &str) -> Result<DataFrame> {
        let lazy_frame = self.ctx.borrow_mut().execute(sql).map_err(|e| {
            VizsqlError::BackendError(format!("Failed to execute SQL `{}`: {}", sql, e))
        })?;

        lazy_frame.collect().map_err(|e| {
            VizsqlError::BackendError(format!("Failed to collect query result: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_count() {
        let reader = PolarsReader::new();
        let df = df! { "x" => [1i64, 2, 3] }.unwrap();
        reader.register("data", df).unwrap();

        // Polars SQL broadcasts ungrouped aggregates to one row per input
        // row; count consumers read row 0, so only that cell matters.
        let result = reader
            .execute("SELECT COUNT(*) AS \"length\" FROM data")
            .unwrap();
        assert_eq!(crate::data::usize_at(&result, "length", 0).unwrap(), 3);
    }

    #[test]
    fn test_group_by_count() {
        let reader = PolarsReader::new();
        let df = df! {
            "region" => ["N", "N", "S"],
        }
        .unwrap();
        reader.register("sales", df).unwrap();

        let result = reader
            .execute(
                "SELECT \"region\", COUNT(\"region\") AS \"count\" FROM sales GROUP BY \"region\"",
            )
            .unwrap();
        assert_eq!(result.height(), 2);
    }

    #[test]
    fn test_invalid_sql_is_backend_error() {
        let reader = PolarsReader::new();
        let result = reader.execute("SELECT FROM nothing");
        assert!(matches!(result, Err(VizsqlError::BackendError(_))));
    }

    #[test]
    fn test_register_rejects_bad_names() {
        let reader = PolarsReader::new();
        let df = df! { "x" => [1i64] }.unwrap();
        assert!(reader.register("", df.clone()).is_err());
        assert!(reader.register("bad\"name", df).is_err());
    }
}
