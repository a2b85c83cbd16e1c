//! Data source metadata inference.
//!
//! For a remote table, discovers the column list and per-column semantic
//! type, cardinality, unique-value set and (for quantitative columns)
//! min/max statistics, without ever pulling the full table. Metadata is
//! computed once per source and read by every engine; recomputation while
//! chart queries are in flight is undefined and must be serialized by the
//! caller.

use crate::data::{self, ScalarValue};
use crate::message::MessageLog;
use crate::naming;
use crate::reader::{run_query, Reader};
use crate::sql::{quote_ident, quote_literal};
use crate::{Result, VizsqlError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Numeric columns with fewer distinct values than this are treated as
/// nominal codes rather than quantities.
const NOMINAL_CARDINALITY_CEILING: usize = 13;

/// Distinct-to-total ratio at which a numeric column counts as id-like.
const ID_LIKE_RATIO: f64 = 0.98;

/// Backend storage types classified as nominal outright.
const NOMINAL_STORAGE_TYPES: &[&str] =
    &["character", "character varying", "boolean", "uuid", "text"];

/// Backend storage types classified as numeric.
const NUMERIC_STORAGE_TYPES: &[&str] = &[
    "integer",
    "numeric",
    "decimal",
    "bigint",
    "real",
    "smallint",
    "smallserial",
    "serial",
    "double precision",
];

/// Numeric storage types whose values are integers; drives the ceiling rule
/// in the binning engines.
const INTEGER_STORAGE_TYPES: &[&str] =
    &["integer", "bigint", "smallint", "smallserial", "serial"];

// =============================================================================
// Types
// =============================================================================

/// Semantic column classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Nominal,
    Quantitative,
    Temporal,
    Id,
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SemanticType::Nominal => "nominal",
            SemanticType::Quantitative => "quantitative",
            SemanticType::Temporal => "temporal",
            SemanticType::Id => "id",
        };
        write!(f, "{}", name)
    }
}

/// Cached per-source metadata, computed once and read-mostly thereafter.
///
/// Columns with no classification rule are simply absent from `types`;
/// operations that need a type for such a column fail with a configuration
/// error rather than guessing.
#[derive(Debug, Clone, Default)]
pub struct SourceMetadata {
    /// Column names in catalog order.
    pub columns: Vec<String>,
    /// Semantic type per classified column.
    pub types: HashMap<String, SemanticType>,
    /// Distinct non-null value count per column.
    pub cardinality: HashMap<String, usize>,
    /// Distinct non-null values per column; potentially expensive, cached.
    pub unique_values: HashMap<String, Vec<ScalarValue>>,
    /// (min, max) per quantitative column.
    pub min_max: HashMap<String, (f64, f64)>,
    /// Columns whose storage type holds integers.
    pub integer_typed: HashSet<String>,
    /// Unfiltered row count of the whole table.
    pub row_count: usize,
}

impl SourceMetadata {
    /// Unique values for a column, as a configuration error when absent.
    pub fn unique_values_for(&self, column: &str) -> Result<&Vec<ScalarValue>> {
        self.unique_values.get(column).ok_or_else(|| {
            VizsqlError::ConfigError(format!("no cached unique values for column '{}'", column))
        })
    }

    /// Min/max statistics for a column, as a configuration error when absent
    /// (the column was not classified as quantitative).
    pub fn min_max_for(&self, column: &str) -> Result<(f64, f64)> {
        self.min_max.get(column).copied().ok_or_else(|| {
            VizsqlError::ConfigError(format!(
                "no quantitative statistics for column '{}'",
                column
            ))
        })
    }

    /// Whether the column's storage type holds integers.
    pub fn is_integer_typed(&self, column: &str) -> bool {
        self.integer_typed.contains(column)
    }
}

/// A named remote table plus cached metadata and the advisory message log.
#[derive(Debug, Clone)]
pub struct DataSource {
    /// Table name, possibly schema-qualified (`analytics.sales`).
    pub table_name: String,
    /// Cached metadata; `None` until inferred.
    pub metadata: Option<SourceMetadata>,
    /// Advisory messages posted by the executor.
    pub messages: MessageLog,
}

impl DataSource {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            metadata: None,
            messages: MessageLog::new(),
        }
    }

    /// Attach pre-computed metadata (tests, or callers managing inference).
    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Cached metadata, as a configuration error when absent.
    pub fn metadata(&self) -> Result<&SourceMetadata> {
        self.metadata.as_ref().ok_or_else(|| {
            VizsqlError::ConfigError(format!(
                "metadata for table '{}' has not been inferred",
                self.table_name
            ))
        })
    }

    /// Run metadata inference if it has not happened yet.
    pub fn ensure_metadata(&mut self, reader: &dyn Reader) -> Result<()> {
        if self.metadata.is_none() {
            self.metadata = Some(infer_metadata(&self.table_name, reader)?);
        }
        Ok(())
    }
}

// =============================================================================
// Inference pipeline
// =============================================================================

/// Compute full metadata for a table: columns, types, cardinalities,
/// unique values, min/max statistics and the unfiltered row count.
pub fn infer_metadata(table_name: &str, reader: &dyn Reader) -> Result<SourceMetadata> {
    let columns = fetch_columns(table_name, reader)?;

    let mut cardinality = HashMap::new();
    for column in &columns {
        cardinality.insert(column.clone(), fetch_cardinality(table_name, column, reader)?);
    }

    let row_count = fetch_row_count(table_name, reader)?;

    let mut types = HashMap::new();
    let mut integer_typed = HashSet::new();
    for column in &columns {
        let storage_type = fetch_storage_type(table_name, column, reader)?;
        if INTEGER_STORAGE_TYPES.contains(&storage_type.as_str()) {
            integer_typed.insert(column.clone());
        }
        let card = cardinality[column];
        if let Some(semantic) = classify_column(column, &storage_type, card, row_count) {
            types.insert(column.clone(), semantic);
        }
    }

    let mut unique_values = HashMap::new();
    for column in &columns {
        unique_values.insert(column.clone(), fetch_unique_values(table_name, column, reader)?);
    }

    let mut min_max = HashMap::new();
    for column in &columns {
        if types.get(column) == Some(&SemanticType::Quantitative) {
            min_max.insert(column.clone(), fetch_min_max(table_name, column, reader)?);
        }
    }

    Ok(SourceMetadata {
        columns,
        types,
        cardinality,
        unique_values,
        min_max,
        integer_typed,
        row_count,
    })
}

/// Classify one column by the fixed precedence: temporal-by-name, then
/// storage type (string-ish, numeric with cardinality/id-likeness rules,
/// temporal-by-substring). Unmatched columns stay unclassified.
pub fn classify_column(
    name: &str,
    storage_type: &str,
    cardinality: usize,
    row_count: usize,
) -> Option<SemanticType> {
    let lowered = name.to_ascii_lowercase();
    if lowered == "month" || lowered == "year" {
        return Some(SemanticType::Temporal);
    }
    if NOMINAL_STORAGE_TYPES.contains(&storage_type) {
        return Some(SemanticType::Nominal);
    }
    if NUMERIC_STORAGE_TYPES.contains(&storage_type) {
        if cardinality < NOMINAL_CARDINALITY_CEILING {
            return Some(SemanticType::Nominal);
        }
        if is_id_like(name, cardinality, row_count) {
            return Some(SemanticType::Id);
        }
        return Some(SemanticType::Quantitative);
    }
    if storage_type.contains("time") || storage_type.contains("date") {
        return Some(SemanticType::Temporal);
    }
    None
}

/// Heuristic: a numeric column is a record identifier when its name says so
/// or its values are near-unique.
pub fn is_id_like(name: &str, cardinality: usize, row_count: usize) -> bool {
    let lowered = name.to_ascii_lowercase();
    if lowered == "id" || lowered.ends_with("_id") {
        return true;
    }
    if row_count == 0 {
        return false;
    }
    cardinality as f64 / row_count as f64 >= ID_LIKE_RATIO
}

/// Strip a schema qualifier before catalog lookups: `analytics.sales` ->
/// `sales`. Catalog views key on the bare table name.
pub fn catalog_table_name(table_name: &str) -> &str {
    match table_name.find('.') {
        Some(idx) => &table_name[idx + 1..],
        None => table_name,
    }
}

// =============================================================================
// Catalog and statistics queries
// =============================================================================

fn fetch_columns(table_name: &str, reader: &dyn Reader) -> Result<Vec<String>> {
    let query = format!(
        "SELECT column_name FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = {}",
        quote_literal(catalog_table_name(table_name)),
    );
    let df = run_query(reader, &query)?;
    if df.height() == 0 {
        return Err(VizsqlError::SchemaError(format!(
            "no catalog entries for table '{}'",
            table_name
        )));
    }

    let mut columns = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        match data::scalar_at(&df, naming::CATALOG_COLUMN_NAME, row)? {
            Some(ScalarValue::String(name)) => columns.push(name),
            _ => {
                return Err(VizsqlError::SchemaError(format!(
                    "malformed catalog row for table '{}'",
                    table_name
                )))
            }
        }
    }
    Ok(columns)
}

fn fetch_storage_type(table_name: &str, column: &str, reader: &dyn Reader) -> Result<String> {
    let query = format!(
        "SELECT DATA_TYPE FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = {} AND COLUMN_NAME = {}",
        quote_literal(catalog_table_name(table_name)),
        quote_literal(column),
    );
    let df = run_query(reader, &query)?;
    if df.height() == 0 {
        return Err(VizsqlError::SchemaError(format!(
            "no catalog entry for column '{}' in table '{}'",
            column, table_name
        )));
    }
    match data::scalar_at(&df, naming::CATALOG_DATA_TYPE, 0)? {
        Some(ScalarValue::String(storage)) => Ok(storage),
        _ => Err(VizsqlError::SchemaError(format!(
            "malformed storage type for column '{}' in table '{}'",
            column, table_name
        ))),
    }
}

fn fetch_cardinality(table_name: &str, column: &str, reader: &dyn Reader) -> Result<usize> {
    let query = format!(
        "SELECT COUNT(DISTINCT {col}) AS \"count\" FROM {table} WHERE {col} IS NOT NULL",
        col = quote_ident(column),
        table = table_name,
    );
    let df = run_query(reader, &query)?;
    if df.height() == 0 {
        return Err(VizsqlError::SchemaError(format!(
            "cardinality query returned no rows for column '{}'",
            column
        )));
    }
    data::usize_at(&df, naming::CARDINALITY_COLUMN, 0)
}

fn fetch_unique_values(
    table_name: &str,
    column: &str,
    reader: &dyn Reader,
) -> Result<Vec<ScalarValue>> {
    let query = format!(
        "SELECT DISTINCT {col} FROM {table} WHERE {col} IS NOT NULL",
        col = quote_ident(column),
        table = table_name,
    );
    let df = run_query(reader, &query)?;
    let values = data::column_scalars(&df, column)?;
    Ok(values.into_iter().flatten().collect())
}

fn fetch_row_count(table_name: &str, reader: &dyn Reader) -> Result<usize> {
    let query = format!(
        "SELECT COUNT(*) AS \"length\" FROM {table}",
        table = table_name
    );
    let df = run_query(reader, &query)?;
    if df.height() == 0 {
        return Err(VizsqlError::SchemaError(format!(
            "row count query returned no rows for table '{}'",
            table_name
        )));
    }
    data::usize_at(&df, naming::LENGTH_COLUMN, 0)
}

fn fetch_min_max(table_name: &str, column: &str, reader: &dyn Reader) -> Result<(f64, f64)> {
    let query = format!(
        "SELECT MIN({col}) AS \"min\", MAX({col}) AS \"max\" FROM {table}",
        col = quote_ident(column),
        table = table_name,
    );
    let df = run_query(reader, &query)?;
    if df.height() == 0 {
        return Err(VizsqlError::SchemaError(format!(
            "statistics query returned no rows for column '{}'",
            column
        )));
    }
    let min = data::f64_at(&df, naming::MIN_COLUMN, 0).map_err(|_| {
        VizsqlError::SchemaError(format!("no minimum value for column '{}'", column))
    })?;
    let max = data::f64_at(&df, naming::MAX_COLUMN, 0).map_err(|_| {
        VizsqlError::SchemaError(format!("no maximum value for column '{}'", column))
    })?;
    Ok((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_table_name_strips_schema() {
        assert_eq!(catalog_table_name("analytics.sales"), "sales");
        assert_eq!(catalog_table_name("sales"), "sales");
    }

    #[test]
    fn test_classify_temporal_by_name() {
        assert_eq!(
            classify_column("Year", "integer", 50, 1000),
            Some(SemanticType::Temporal)
        );
        assert_eq!(
            classify_column("month", "text", 12, 1000),
            Some(SemanticType::Temporal)
        );
    }

    #[test]
    fn test_classify_nominal_storage() {
        assert_eq!(
            classify_column("region", "character varying", 4, 1000),
            Some(SemanticType::Nominal)
        );
        assert_eq!(
            classify_column("active", "boolean", 2, 1000),
            Some(SemanticType::Nominal)
        );
    }

    #[test]
    fn test_classify_numeric_low_cardinality_is_nominal() {
        assert_eq!(
            classify_column("cylinders", "integer", 5, 1000),
            Some(SemanticType::Nominal)
        );
    }

    #[test]
    fn test_classify_numeric_id_like() {
        assert_eq!(
            classify_column("user_id", "bigint", 990, 1000),
            Some(SemanticType::Id)
        );
        assert_eq!(
            classify_column("serial_no", "bigint", 999, 1000),
            Some(SemanticType::Id)
        );
    }

    #[test]
    fn test_classify_quantitative() {
        assert_eq!(
            classify_column("age", "integer", 80, 1000),
            Some(SemanticType::Quantitative)
        );
        assert_eq!(
            classify_column("weight", "double precision", 400, 1000),
            Some(SemanticType::Quantitative)
        );
    }

    #[test]
    fn test_classify_temporal_storage() {
        assert_eq!(
            classify_column("created", "timestamp without time zone", 900, 1000),
            Some(SemanticType::Temporal)
        );
        assert_eq!(
            classify_column("day", "date", 300, 1000),
            Some(SemanticType::Temporal)
        );
    }

    #[test]
    fn test_classify_unknown_storage_unclassified() {
        assert_eq!(classify_column("payload", "jsonb", 900, 1000), None);
    }

    #[test]
    fn test_is_id_like() {
        assert!(is_id_like("id", 10, 1000));
        assert!(is_id_like("customer_id", 10, 1000));
        assert!(is_id_like("code", 985, 1000));
        assert!(!is_id_like("age", 80, 1000));
        assert!(!is_id_like("value", 0, 0));
    }

    #[test]
    fn test_missing_metadata_is_config_error() {
        let source = DataSource::new("sales");
        assert!(matches!(
            source.metadata(),
            Err(VizsqlError::ConfigError(_))
        ));
    }

    #[test]
    fn test_stats_accessors() {
        let mut meta = SourceMetadata::default();
        meta.min_max.insert("age".to_string(), (0.0, 90.0));
        assert_eq!(meta.min_max_for("age").unwrap(), (0.0, 90.0));
        assert!(matches!(
            meta.min_max_for("name"),
            Err(VizsqlError::ConfigError(_))
        ));
        assert!(matches!(
            meta.unique_values_for("name"),
            Err(VizsqlError::ConfigError(_))
        ));
    }
}
