//! Centralized naming conventions for vizsql-generated columns and fields.
//!
//! Every synthetic column name that crosses a query boundary lives here, so
//! the SQL builders and the result-reconstruction code cannot drift apart.
//!
//! # Categories
//!
//! - **Synthetic measure**: the row-count pseudo-attribute (`Record`)
//! - **Aggregate aliases**: names given to aggregate output columns
//!   (`count`, `length`)
//! - **Bucket columns**: names produced by the bucketing queries
//!   (`width_bucket`, `width_bucket1`, `width_bucket2`)
//! - **Heatmap cell columns**: derived rectangle bounds (`xBinStart`, ...)
//! - **Catalog columns**: lower-cased names returned by the backend's
//!   `INFORMATION_SCHEMA` views

// ============================================================================
// Synthetic attributes and measures
// ============================================================================

/// Pseudo-attribute standing for "number of records"; never a real column.
pub const RECORD_ATTRIBUTE: &str = "Record";

/// Column name for the per-bin record count in 1-D histogram results.
pub const BIN_COUNT_COLUMN: &str = "Number of Records";

// ============================================================================
// Aggregate query aliases
// ============================================================================

/// Alias for `COUNT(...)` output before it is renamed to [`RECORD_ATTRIBUTE`].
pub const COUNT_COLUMN: &str = "count";

/// Alias for the authoritative filtered row count.
pub const LENGTH_COLUMN: &str = "length";

// ============================================================================
// Bucketing query columns
// ============================================================================

/// Bucket index column in 1-D binning queries.
pub const BUCKET_COLUMN: &str = "width_bucket";

/// X-axis bucket index column in 2-D binning queries.
pub const BUCKET_X_COLUMN: &str = "width_bucket1";

/// Y-axis bucket index column in 2-D binning queries.
pub const BUCKET_Y_COLUMN: &str = "width_bucket2";

// ============================================================================
// Heatmap cell rectangle columns
// ============================================================================

pub const X_BIN_START_COLUMN: &str = "xBinStart";
pub const X_BIN_END_COLUMN: &str = "xBinEnd";
pub const Y_BIN_START_COLUMN: &str = "yBinStart";
pub const Y_BIN_END_COLUMN: &str = "yBinEnd";

// ============================================================================
// Catalog columns
// ============================================================================

/// Column-name column of the backend catalog view.
pub const CATALOG_COLUMN_NAME: &str = "column_name";

/// Storage-type column of the backend catalog view.
pub const CATALOG_DATA_TYPE: &str = "data_type";

/// Distinct-count alias used by cardinality queries.
pub const CARDINALITY_COLUMN: &str = "count";

/// Aliases used by the per-column min/max statistics query.
pub const MIN_COLUMN: &str = "min";
pub const MAX_COLUMN: &str = "max";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(RECORD_ATTRIBUTE, "Record");
        assert_eq!(BIN_COUNT_COLUMN, "Number of Records");
        assert_eq!(COUNT_COLUMN, "count");
        assert_eq!(LENGTH_COLUMN, "length");
    }

    #[test]
    fn test_bucket_columns() {
        assert_eq!(BUCKET_COLUMN, "width_bucket");
        assert_eq!(BUCKET_X_COLUMN, "width_bucket1");
        assert_eq!(BUCKET_Y_COLUMN, "width_bucket2");
    }

    #[test]
    fn test_cell_columns() {
        assert_eq!(X_BIN_START_COLUMN, "xBinStart");
        assert_eq!(X_BIN_END_COLUMN, "xBinEnd");
        assert_eq!(Y_BIN_START_COLUMN, "yBinStart");
        assert_eq!(Y_BIN_END_COLUMN, "yBinEnd");
    }
}
