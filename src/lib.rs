/*!
# vizsql - Declarative Visualization to SQL

vizsql translates abstract chart specifications into the SQL queries needed to
materialize their data, and post-processes the raw results into complete,
analysis-ready tables.

Given a [`ChartSpec`] (attributes bound to visual channels, filters,
aggregation and binning requests, a mark-type hint) and a [`DataSource`]
backed by a remote table, the executor:

- compiles filter clauses into a safely-quoted predicate,
- infers per-column semantic types and statistics without materializing the
  full table,
- decides whether to fetch in full, sample, or escalate a large scatter to a
  binned heatmap,
- issues the grouped/binned queries for bar, line, histogram and heatmap
  marks, and
- repairs structurally incomplete results (missing groups, missing buckets)
  so downstream consumers never see ragged data.

## Example

```rust,ignore
use vizsql::{executor, ChartSpec, Clause, Channel, DataSource, ExecutorConfig, Mark};
use vizsql::reader::PolarsReader;

let reader = PolarsReader::new();
let mut source = DataSource::new("sales");
let mut views = vec![ChartSpec::new(
    vec![
        Clause::attribute("region").on_channel(Channel::X).groupby(),
        Clause::record_count().on_channel(Channel::Y),
    ],
    Mark::Bar,
)];
executor::execute(&mut views, &mut source, &reader, &ExecutorConfig::default())?;
let table = views[0].data.as_ref().unwrap();
```

## Core Components

- [`spec`] - Declarative chart specification types
- [`metadata`] - Data source metadata inference
- [`executor`] - Query translation and result reconstruction engines
- [`reader`] - Backend query abstraction layer
*/

pub mod config;
pub mod data;
pub mod executor;
pub mod message;
pub mod metadata;
pub mod naming;
pub mod reader;
pub mod spec;
pub mod sql;

// Re-export key types for convenience
pub use config::ExecutorConfig;
pub use data::ScalarValue;
pub use message::{Message, MessageLog};
pub use metadata::{DataSource, SemanticType, SourceMetadata};
pub use spec::{Aggregation, Channel, ChartSpec, Clause, FilterOp, Mark, ResultTable};

// DataFrame payload for result tables (wraps Polars)
pub use polars::prelude::DataFrame;

/// Main library error type
#[derive(thiserror::Error, Debug)]
pub enum VizsqlError {
    /// A chart or column is missing configuration the operation needs
    /// (unclassified semantic type, absent statistics, malformed spec).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The backend catalog disagrees with expectations (missing catalog
    /// rows for a table or column).
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// A query failed or the backend returned a malformed result.
    #[error("Backend error: {0}")]
    BackendError(String),

    /// Cached metadata is inconsistent with the live table.
    #[error("Invariant violation: {0}")]
    InvariantError(String),

    /// Internal error (bug in vizsql itself).
    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, VizsqlError>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
