//! 1-D histogram binning.
//!
//! Computes equal-width bucket counts server-side via the backend's
//! bucketing primitive, then densifies the sparse bucket/count pairs into
//! one row per bin with the bin's center value and an explicit zero for
//! empty bins.

use crate::data::{frame_from_series, usize_at};
use crate::executor::{filtered_count, with_predicate};
use crate::metadata::DataSource;
use crate::naming;
use crate::reader::{run_query, Reader};
use crate::spec::{ChartSpec, ResultTable};
use crate::sql::{compile_filter, quote_ident};
use crate::{Result, VizsqlError};
use polars::prelude::*;

pub fn execute_binning(view: &mut ChartSpec, source: &DataSource, reader: &dyn Reader) -> Result<()> {
    let clause = view.bin_clause().cloned().ok_or_else(|| {
        VizsqlError::ConfigError("histogram requires a clause with a bin count".to_string())
    })?;
    let num_bins = clause.bin_count.unwrap_or(0);
    if num_bins == 0 {
        return Err(VizsqlError::ConfigError(
            "histogram bin count must be positive".to_string(),
        ));
    }

    let metadata = source.metadata()?;
    let (attr_min, attr_max) = metadata.min_max_for(&clause.attribute)?;
    let integer = metadata.is_integer_typed(&clause.attribute);
    let width = (attr_max - attr_min) / num_bins as f64;

    let edges = interior_edges(attr_min, width, num_bins, integer);
    let boundaries = edges
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(",");

    let (predicate, _) = compile_filter(view);
    let length = filtered_count(&source.table_name, &predicate, reader)?;

    let bucket = reader.bucket_expr(&quote_ident(&clause.attribute), &boundaries);
    let inner = with_predicate(
        format!(
            "SELECT {} AS {} FROM {}",
            bucket,
            naming::BUCKET_COLUMN,
            source.table_name
        ),
        &predicate,
    );
    let query = format!(
        "SELECT {b}, COUNT({b}) AS \"count\" FROM ({inner}) AS buckets \
         GROUP BY {b} ORDER BY {b}",
        b = naming::BUCKET_COLUMN,
        inner = inner
    );
    let df = run_query(reader, &query)?;

    let bucket_col = df
        .column(naming::BUCKET_COLUMN)
        .map_err(|e| VizsqlError::BackendError(format!("missing bucket column: {}", e)))?;
    if bucket_col.null_count() > 0 {
        // Null buckets mean the column is all null under the predicate;
        // leave the spec unpopulated.
        tracing::debug!(
            attribute = %clause.attribute,
            "null bucket indices in histogram result, skipping"
        );
        return Ok(());
    }

    let mut counts = vec![0i64; num_bins];
    for row in 0..df.height() {
        let bucket_index = usize_at(&df, naming::BUCKET_COLUMN, row)?;
        let count = usize_at(&df, naming::COUNT_COLUMN, row)?;
        // Bucket n (values at the upper bound) folds into the last bin.
        counts[bucket_index.min(num_bins - 1)] += count as i64;
    }

    let centers = bin_centers(attr_min, attr_max, width, &edges, integer);

    let table = frame_from_series(vec![
        Series::new(clause.attribute.as_str().into(), centers),
        Series::new(naming::BIN_COUNT_COLUMN.into(), counts),
    ])?;
    view.data = Some(ResultTable::new(table, length));
    Ok(())
}

/// The `n - 1` interior bucket boundaries for `n` equal-width bins.
///
/// Integer-typed attributes get their boundaries rounded up so buckets
/// align with representable values.
pub fn interior_edges(attr_min: f64, width: f64, num_bins: usize, integer: bool) -> Vec<f64> {
    (1..num_bins)
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

/// Center value of each bin.
///
/// The first and last bins run from the true min/max to the nearest
/// interior edge; interior bins are midpoints of consecutive edges. A
/// single-bin histogram centers on the midrange.
pub fn bin_centers(
    attr_min: f64,
    attr_max: f64,
    width: f64,
    edges: &[f64],
    integer: bool,
) -> Vec<f64> {
    if edges.is_empty() {
        return vec![(attr_min + attr_max) / 2.0];
    }

    let round = |v: f64| if integer { v.ceil() } else { v };

    let mut centers = Vec::with_capacity(edges.len() + 1);
    centers.push(round((attr_min + attr_min + width) / 2.0));
    for pair in edges.windows(2) {
        centers.push((pair[0] + pair[1]) / 2.0);
    }
    centers.push(round((edges[edges.len() - 1] + attr_max) / 2.0));
    centers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interior_edges_age_example() {
        // age in [0, 90], 9 bins of width 10.
        let edges = interior_edges(0.0, 10.0, 9, true);
        assert_eq!(edges, vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0]);
    }

    #[test]
    fn test_bin_centers_age_example() {
        let edges = interior_edges(0.0, 10.0, 9, true);
        let centers = bin_centers(0.0, 90.0, 10.0, &edges, true);
        assert_eq!(
            centers,
            vec![5.0, 15.0, 25.0, 35.0, 45.0, 55.0, 65.0, 75.0, 85.0]
        );
    }

    #[test]
    fn test_bin_centers_fractional_width() {
        let edges = interior_edges(0.0, 2.5, 4, false);
        assert_eq!(edges, vec![2.5, 5.0, 7.5]);
        let centers = bin_centers(0.0, 10.0, 2.5, &edges, false);
        assert_eq!(centers, vec![1.25, 3.75, 6.25, 8.75]);
    }

    #[test]
    fn test_single_bin_centers_on_midrange() {
        let centers = bin_centers(10.0, 30.0, 20.0, &[], false);
        assert_eq!(centers, vec![20.0]);
    }

    #[test]
    fn test_integer_edges_round_up() {
        // range [0, 10] with 3 bins: raw edges 3.33, 6.67.
        let edges = interior_edges(0.0, 10.0 / 3.0, 3, true);
        assert_eq!(edges, vec![4.0, 7.0]);
    }
}
