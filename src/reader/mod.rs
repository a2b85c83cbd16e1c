//! Backend query abstraction layer.
//!
//! The reader module provides a pluggable interface for executing SQL
//! queries against a tabular-SQL-compatible backend and returning Polars
//! DataFrames.
//!
//! # Architecture
//!
//! All readers implement the [`Reader`] trait, which provides:
//! - SQL query execution -> DataFrame conversion
//! - Dialect hooks for the backend's random-ordering function and its
//!   bucketing primitive
//!
//! Queries are issued strictly sequentially per chart; the executor never
//! retries. Connection management, credentials and retry policy belong to
//! the collaborator that constructs the reader.

use crate::{DataFrame, Result};

pub mod polars_sql;

pub use polars_sql::PolarsReader;

/// Trait for backend query execution.
///
/// Readers execute SQL queries and return Polars DataFrames with column
/// names preserved.
pub trait Reader {
    /// Execute a SQL query and return the result as a DataFrame.
    ///
    /// # Errors
    ///
    /// Returns `VizsqlError::BackendError` if the SQL is invalid, the
    /// connection fails, or the table or columns don't exist. Errors are
    /// propagated verbatim; no retry is performed.
    fn execute(&self, sql: &str) -> Result<DataFrame>;

    // =========================================================================
    // Dialect hooks
    // =========================================================================

    /// SQL expression producing a uniform random sort key, used with
    /// `ORDER BY ... LIMIT` for sampling.
    fn random_function(&self) -> &str {
        "random()"
    }

    /// SQL expression assigning a value to an integer bucket index in
    /// `[0, n]` given `n` sorted interior boundaries.
    ///
    /// `column` is an already-quoted identifier and `boundaries` a
    /// comma-separated list of boundary values. The default emits the
    /// Postgres `width_bucket` array form; backends without it can emulate
    /// the primitive here (e.g. with a CASE ladder).
    fn bucket_expr(&self, column: &str, boundaries: &str) -> String {
        format!(
            "width_bucket(CAST ({} AS FLOAT), '{{{}}}')",
            column, boundaries
        )
    }
}

/// Issue one query through the reader, logging it first.
///
/// Single choke point so every backend round-trip shows up in traces.
pub(crate) fn run_query(reader: &dyn Reader, sql: &str) -> Result<DataFrame> {
    tracing::debug!(query = %sql, "issuing backend query");
    reader.execute(sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DialectOnly;

    impl Reader for DialectOnly {
        fn execute(&self, _sql: &str) -> Result<DataFrame> {
            Ok(DataFrame::empty())
        }
    }

    #[test]
    fn test_default_random_function() {
        assert_eq!(DialectOnly.random_function(), "random()");
    }

    #[test]
    fn test_default_bucket_expr() {
        let expr = DialectOnly.bucket_expr("\"age\"", "10,20,30");
        assert_eq!(expr, "width_bucket(CAST (\"age\" AS FLOAT), '{10,20,30}')");
    }
}
