//! 2-D heatmap binning.
//!
//! Buckets both axes server-side in a single grouped query, then annotates
//! each returned cell with its rectangle bounds. Unlike the 1-D path, the
//! result stays sparse: cells with no rows never appear.

use crate::config::ExecutorConfig;
use crate::data::{f64_at, frame_from_series, usize_at};
use crate::executor::with_predicate;
use crate::metadata::DataSource;
use crate::naming;
use crate::reader::{run_query, Reader};
use crate::spec::{Channel, ChartSpec, ResultTable};
use crate::sql::{compile_filter, quote_ident};
use crate::{Result, VizsqlError};
use polars::prelude::*;

pub fn execute_2d_binning(
    view: &mut ChartSpec,
    source: &DataSource,
    reader: &dyn Reader,
    config: &ExecutorConfig,
    length: usize,
) -> Result<()> {
    let num_bins = config.heatmap_bin_count;
    if num_bins == 0 {
        return Err(VizsqlError::ConfigError(
            "heatmap bin count must be positive".to_string(),
        ));
    }
    let x_attr = channel_attribute(view, Channel::X)?;
    let y_attr = channel_attribute(view, Channel::Y)?;

    let metadata = source.metadata()?;
    let (x_min, x_max) = metadata.min_max_for(&x_attr)?;
    let (y_min, y_max) = metadata.min_max_for(&y_attr)?;
    let x_width = (x_max - x_min) / num_bins as f64;
    let y_width = (y_max - y_min) / num_bins as f64;

    let x_edges = axis_edges(x_min, x_width, num_bins, metadata.is_integer_typed(&x_attr));
    let y_edges = axis_edges(y_min, y_width, num_bins, metadata.is_integer_typed(&y_attr));

    let (predicate, _) = compile_filter(view);

    let inner = with_predicate(
        format!(
            "SELECT {xb} AS {x}, {yb} AS {y} FROM {t}",
            xb = reader.bucket_expr(&quote_ident(&x_attr), &join_edges(&x_edges)),
            yb = reader.bucket_expr(&quote_ident(&y_attr), &join_edges(&y_edges)),
            x = naming::BUCKET_X_COLUMN,
            y = naming::BUCKET_Y_COLUMN,
            t = source.table_name
        ),
        &predicate,
    );
    let query = format!(
        "SELECT {x}, {y}, COUNT(*) AS \"count\" FROM ({inner}) AS buckets GROUP BY {x}, {y}",
        x = naming::BUCKET_X_COLUMN,
        y = naming::BUCKET_Y_COLUMN,
        inner = inner
    );
    let df = run_query(reader, &query)?;

    if df.height() == 0 {
        view.data = Some(ResultTable::new(df, length));
        return Ok(());
    }

    let mut x_starts = Vec::with_capacity(df.height());
    let mut x_ends = Vec::with_capacity(df.height());
    let mut y_starts = Vec::with_capacity(df.height());
    let mut y_ends = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let (start, end) = cell_bounds(
            usize_at(&df, naming::BUCKET_X_COLUMN, row)?,
            &x_edges,
            x_width,
        );
        x_starts.push(start);
        x_ends.push(end);
        let (start, end) = cell_bounds(
            usize_at(&df, naming::BUCKET_Y_COLUMN, row)?,
            &y_edges,
            y_width,
        );
        y_starts.push(start);
        y_ends.push(end);
    }

    let counts: Result<Vec<i64>> = (0..df.height())
        .map(|row| f64_at(&df, naming::COUNT_COLUMN, row).map(|v| v as i64))
        .collect();

    let table = frame_from_series(vec![
        Series::new(naming::BUCKET_X_COLUMN.into(), bucket_indices(&df, naming::BUCKET_X_COLUMN)?),
        Series::new(naming::BUCKET_Y_COLUMN.into(), bucket_indices(&df, naming::BUCKET_Y_COLUMN)?),
        Series::new(naming::COUNT_COLUMN.into(), counts?),
        Series::new(naming::X_BIN_START_COLUMN.into(), x_starts),
        Series::new(naming::X_BIN_END_COLUMN.into(), x_ends),
        Series::new(naming::Y_BIN_START_COLUMN.into(), y_starts),
        Series::new(naming::Y_BIN_END_COLUMN.into(), y_ends),
    ])?;
    view.data = Some(ResultTable::new(table, length));
    Ok(())
}

fn channel_attribute(view: &ChartSpec, channel: Channel) -> Result<String> {
    view.clauses_on_channel(channel)
        .first()
        .filter(|c| !c.is_record())
        .map(|c| c.attribute.clone())
        .ok_or_else(|| {
            VizsqlError::ConfigError(
                "heatmap requires quantitative attributes on both axes".to_string(),
            )
        })
}

fn bucket_indices(df: &DataFrame, column: &str) -> Result<Vec<i64>> {
    (0..df.height())
        .map(|row| usize_at(df, column, row).map(|v| v as i64))
        .collect()
}

/// The `n` bucket boundaries for one axis, starting at the attribute
/// minimum. Integer-typed attributes get boundaries rounded up.
pub fn axis_edges(attr_min: f64, width: f64, num_bins: usize, integer: bool) -> Vec<f64> {
    (0..num_bins)
        .map(|k| {
            let edge = attr_min + k as f64 * width;
            if integer {
                edge.ceil()
            } else {
                edge
            }
        })
        .collect()
}

fn join_edges(edges: &[f64]) -> String {
    edges
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Rectangle bounds of a bucket along one axis.
///
/// Bucket 0 holds values below the first boundary and saturates to the
/// first edge; the overflow bucket saturates to the last.
pub fn cell_bounds(bucket: usize, edges: &[f64], width: f64) -> (f64, f64) {
    let idx = bucket.saturating_sub(1).min(edges.len() - 1);
    let end = edges[idx];
    (end - width, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_edges_include_minimum() {
        let edges = axis_edges(0.0, 10.0, 4, false);
        assert_eq!(edges, vec![0.0, 10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_axis_edges_integer_round_up() {
        let edges = axis_edges(0.0, 2.5, 4, true);
        assert_eq!(edges, vec![0.0, 3.0, 5.0, 8.0]);
    }

    #[test]
    fn test_cell_bounds() {
        let edges = vec![0.0, 10.0, 20.0, 30.0];
        assert_eq!(cell_bounds(2, &edges, 10.0), (0.0, 10.0));
        assert_eq!(cell_bounds(4, &edges, 10.0), (20.0, 30.0));
    }

    #[test]
    fn test_cell_bounds_saturate() {
        let edges = vec![0.0, 10.0, 20.0, 30.0];
        // Underflow bucket clamps to the first edge, overflow to the last.
        assert_eq!(cell_bounds(0, &edges, 10.0), (-10.0, 0.0));
        assert_eq!(cell_bounds(9, &edges, 10.0), (20.0, 30.0));
    }

    #[test]
    fn test_join_edges_renders_whole_floats_bare() {
        assert_eq!(join_edges(&[0.0, 2.5, 5.0]), "0,2.5,5");
    }
}
