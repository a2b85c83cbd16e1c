//! Query translation and result reconstruction engines.
//!
//! The dispatcher routes each chart specification to the engine matching
//! its mark tag:
//!
//! - `Empty` -> lazy preview sample of the unfiltered table
//! - `Scatter` -> row-count gate, then scatter fetch or heatmap escalation
//! - `Bar` / `Line` -> [`aggregate`] grouped queries with gap-fill
//! - `Histogram` -> [`binning`] dense 1-D histogram reconstruction
//! - `Heatmap` -> [`binning2d`] sparse 2-D cell counts
//!
//! Queries for one chart run strictly sequentially (later queries depend on
//! earlier results); independent charts share nothing and may be computed
//! in parallel by callers whose reader tolerates concurrent use.

pub mod aggregate;
pub mod binning;
pub mod binning2d;
pub mod scatter;

use crate::config::ExecutorConfig;
use crate::data;
use crate::metadata::DataSource;
use crate::naming;
use crate::reader::{run_query, Reader};
use crate::spec::{Channel, ChartSpec, Mark, ResultTable};
use crate::sql::compile_filter;
use crate::{Result, VizsqlError};

/// Advisory posted when a large scatter is escalated to a heatmap.
pub const HEATMAP_ESCALATION_NOTICE: &str =
    "Large scatterplot detected: displaying a binned heatmap instead of individual points.";

/// Priority of the escalation advisory in the source's message log.
pub const HEATMAP_NOTICE_PRIORITY: u8 = 98;

/// Populate the result table of every chart in `views`.
///
/// Runs metadata inference for the source if it has not happened yet, then
/// dispatches each spec to the engine for its mark. Specs that no engine
/// claims (e.g. an aggregate chart with no aggregation tags) are left
/// unpopulated by design.
pub fn execute(
    views: &mut [ChartSpec],
    source: &mut DataSource,
    reader: &dyn Reader,
    config: &ExecutorConfig,
) -> Result<()> {
    source.ensure_metadata(reader)?;
    for view in views.iter_mut() {
        execute_view(view, source, reader, config)?;
    }
    Ok(())
}

fn execute_view(
    view: &mut ChartSpec,
    source: &mut DataSource,
    reader: &dyn Reader,
    config: &ExecutorConfig,
) -> Result<()> {
    match view.mark {
        Mark::Empty => execute_preview(view, source, reader, config),
        Mark::Scatter => {
            let (predicate, _) = compile_filter(view);
            let length = filtered_count(&source.table_name, &predicate, reader)?;
            let color_bound = view.clauses_on_channel(Channel::Color).len() == 1;
            match route_scatter(color_bound, length, config) {
                Mark::Scatter => scatter::execute_scatter(view, source, reader, config, length),
                _ => {
                    // Explicit state rewrite: the spec now is a heatmap.
                    view.mark = Mark::Heatmap;
                    source
                        .messages
                        .add_unique(HEATMAP_ESCALATION_NOTICE, HEATMAP_NOTICE_PRIORITY);
                    binning2d::execute_2d_binning(view, source, reader, config, length)
                }
            }
        }
        Mark::Bar | Mark::Line => aggregate::execute_aggregate(view, source, reader, true),
        Mark::Histogram => binning::execute_binning(view, source, reader),
        Mark::Heatmap => {
            let (predicate, _) = compile_filter(view);
            let length = filtered_count(&source.table_name, &predicate, reader)?;
            binning2d::execute_2d_binning(view, source, reader, config, length)
        }
    }
}

/// Decide how a scatter-tagged spec is rendered.
///
/// A bound color channel always keeps the scatter; otherwise the filtered
/// row count decides: below the threshold stays scatter, at or above it the
/// spec escalates to a binned heatmap.
pub fn route_scatter(color_bound: bool, filtered_rows: usize, config: &ExecutorConfig) -> Mark {
    if color_bound || filtered_rows < config.scatter_row_threshold {
        Mark::Scatter
    } else {
        Mark::Heatmap
    }
}

/// Lazy preview for mark-less specs: a fixed fraction of the unfiltered
/// table, for placeholder rendering only. This path ignores filters and the
/// scatter sampling cap.
fn execute_preview(
    view: &mut ChartSpec,
    source: &DataSource,
    reader: &dyn Reader,
    config: &ExecutorConfig,
) -> Result<()> {
    let row_count = source.metadata()?.row_count;
    let limit = (row_count as f64 * config.sampling_start_fraction) as usize;
    let query = format!("SELECT * FROM {} LIMIT {}", source.table_name, limit);
    let df = run_query(reader, &query)?;
    view.data = Some(ResultTable::new(df, row_count));
    Ok(())
}

/// Authoritative filtered row count: `COUNT(*)` under the compiled
/// predicate. Always attached to the eventual result table as `length`.
pub(crate) fn filtered_count(
    table_name: &str,
    predicate: &str,
    reader: &dyn Reader,
) -> Result<usize> {
    let query = with_predicate(
        format!("SELECT COUNT(*) AS \"length\" FROM {}", table_name),
        predicate,
    );
    let df = run_query(reader, &query)?;
    if df.height() == 0 {
        return Err(VizsqlError::BackendError(
            "count query returned no rows".to_string(),
        ));
    }
    data::usize_at(&df, naming::LENGTH_COLUMN, 0)
}

/// Append a predicate fragment, omitting it cleanly when empty.
pub(crate) fn with_predicate(prefix: String, predicate: &str) -> String {
    if predicate.is_empty() {
        prefix
    } else {
        format!("{} {}", prefix, predicate)
    }
}
