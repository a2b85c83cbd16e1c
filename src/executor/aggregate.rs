//! Aggregation engine for bar and line charts.
//!
//! Builds the grouped count/aggregate query (optionally sub-grouped by a
//! color attribute), then repairs missing group combinations against the
//! cached unique-value sets so every expected category appears with an
//! explicit zero. Final rows are sorted ascending by the groupby attribute.

use crate::data::{self, series_from_scalars, ScalarValue};
use crate::executor::{filtered_count, with_predicate};
use crate::metadata::DataSource;
use crate::naming;
use crate::reader::{run_query, Reader};
use crate::spec::{Aggregation, Channel, ChartSpec, Clause, ResultTable};
use crate::sql::{compile_filter, quote_ident};
use crate::{Result, VizsqlError};
use std::collections::HashMap;

/// One sparse result row: groupby value, optional color value, measure.
type GroupRow = (ScalarValue, Option<ScalarValue>, ScalarValue);

/// Populate an aggregate (bar/line) chart.
///
/// Exactly one of the x/y clauses must carry an aggregate function; the
/// other is the categorical groupby attribute. Specs where neither channel
/// aggregates are intentionally left unpopulated (they belong to a
/// different, non-aggregating path), so this returns `Ok` without work.
pub fn execute_aggregate(
    view: &mut ChartSpec,
    source: &DataSource,
    reader: &dyn Reader,
    is_filtered: bool,
) -> Result<()> {
    let x = view
        .clauses_on_channel(Channel::X)
        .first()
        .map(|c| (*c).clone());
    let y = view
        .clauses_on_channel(Channel::Y)
        .first()
        .map(|c| (*c).clone());
    let (Some(x), Some(y)) = (x, y) else {
        return Err(VizsqlError::ConfigError(
            "aggregate charts require clauses on both the x and y channels".to_string(),
        ));
    };

    // Untagged channels mean the spec was never routed for aggregation.
    if x.aggregation.is_none() || y.aggregation.is_none() {
        return Ok(());
    }

    // The x tag wins when both channels carry one.
    let mut picked: Option<(Clause, Clause, Aggregation)> = None;
    if let Some(func) = y.aggregate_function() {
        picked = Some((x.clone(), y.clone(), func));
    }
    if let Some(func) = x.aggregate_function() {
        picked = Some((y.clone(), x.clone(), func));
    }
    let Some((groupby, measure, func)) = picked else {
        return Ok(());
    };

    let color = view
        .clauses_on_channel(Channel::Color)
        .first()
        .map(|c| (*c).clone());

    let metadata = source.metadata()?;
    let groupby_unique = metadata.unique_values.get(&groupby.attribute).cloned();
    let (color_values, color_cardinality) = match &color {
        Some(clause) => {
            let values = metadata.unique_values_for(&clause.attribute)?.clone();
            let cardinality = values.len();
            (Some(values), cardinality)
        }
        None => (None, 1),
    };

    let (predicate, _) = compile_filter(view);
    let length = filtered_count(&source.table_name, &predicate, reader)?;

    let query = build_aggregate_query(
        &source.table_name,
        &predicate,
        &groupby,
        &measure,
        func,
        color.as_ref(),
    )?;
    let df = run_query(reader, &query)?;

    // Count output is renamed to the synthetic Record measure downstream.
    let (measure_source, measure_name) = if measure.is_record() {
        (naming::COUNT_COLUMN.to_string(), naming::RECORD_ATTRIBUTE)
    } else {
        (measure.attribute.clone(), measure.attribute.as_str())
    };

    let mut rows: Vec<GroupRow> = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let group = data::scalar_at(&df, &groupby.attribute, row)?.ok_or_else(|| {
            VizsqlError::BackendError(format!(
                "null group value in aggregated result for '{}'",
                groupby.attribute
            ))
        })?;
        let color_value = match &color {
            Some(clause) => Some(data::scalar_at(&df, &clause.attribute, row)?.ok_or_else(
                || {
                    VizsqlError::BackendError(format!(
                        "null color value in aggregated result for '{}'",
                        clause.attribute
                    ))
                },
            )?),
            None => None,
        };
        let value = data::scalar_at(&df, &measure_source, row)?.ok_or_else(|| {
            VizsqlError::BackendError(format!(
                "null measure value in aggregated result for '{}'",
                measure_source
            ))
        })?;
        rows.push((group, color_value, value));
    }

    // For filtered aggregations with missing groupby values, set the
    // missing cells to zero: no datapoints, not no category.
    let should_fill = is_filtered || (color.is_some() && groupby_unique.is_some());
    if should_fill {
        let unique = groupby_unique.ok_or_else(|| {
            VizsqlError::ConfigError(format!(
                "no cached unique values for column '{}'",
                groupby.attribute
            ))
        })?;
        if rows.len() != unique.len() * color_cardinality {
            let zero = if measure.is_record() {
                ScalarValue::Int(0)
            } else {
                ScalarValue::Float(0.0)
            };
            rows = gap_fill(
                rows,
                &unique,
                color_values.as_deref(),
                zero,
                &groupby.attribute,
            )?;
        }
    }

    rows.sort_by(|a, b| {
        a.0.total_cmp(&b.0).then_with(|| match (&a.1, &b.1) {
            (Some(ca), Some(cb)) => ca.total_cmp(cb),
            _ => std::cmp::Ordering::Equal,
        })
    });

    let mut series = Vec::with_capacity(3);
    let groups: Vec<ScalarValue> = rows.iter().map(|r| r.0.clone()).collect();
    series.push(series_from_scalars(&groupby.attribute, &groups)?);
    if let Some(clause) = &color {
        let colors: Result<Vec<ScalarValue>> = rows
            .iter()
            .map(|r| {
                r.1.clone().ok_or_else(|| {
                    VizsqlError::InternalError(format!(
                        "row without a color value for bound channel '{}'",
                        clause.attribute
                    ))
                })
            })
            .collect();
        series.push(series_from_scalars(&clause.attribute, &colors?)?);
    }
    let measures: Vec<ScalarValue> = rows.iter().map(|r| r.2.clone()).collect();
    series.push(series_from_scalars(measure_name, &measures)?);

    let table = data::frame_from_series(series)?;
    view.data = Some(ResultTable::new(table, length));
    Ok(())
}

/// Build the grouped count or aggregate query text.
pub fn build_aggregate_query(
    table_name: &str,
    predicate: &str,
    groupby: &Clause,
    measure: &Clause,
    func: Aggregation,
    color: Option<&Clause>,
) -> Result<String> {
    let group_ident = quote_ident(&groupby.attribute);

    let query = if measure.is_record() {
        // Count case: count the groupby column itself.
        match color {
            Some(clause) => {
                let color_ident = quote_ident(&clause.attribute);
                with_predicate(
                    format!(
                        "SELECT {g}, {c}, COUNT({g}) AS \"count\" FROM {t}",
                        g = group_ident,
                        c = color_ident,
                        t = table_name
                    ),
                    predicate,
                ) + &format!(" GROUP BY {}, {}", group_ident, color_ident)
            }
            None => {
                with_predicate(
                    format!(
                        "SELECT {g}, COUNT({g}) AS \"count\" FROM {t}",
                        g = group_ident,
                        t = table_name
                    ),
                    predicate,
                ) + &format!(" GROUP BY {}", group_ident)
            }
        }
    } else {
        let function = func.sql_function().ok_or_else(|| {
            VizsqlError::ConfigError(format!(
                "measure attribute '{}' carries no aggregate function",
                measure.attribute
            ))
        })?;
        if func == Aggregation::Count {
            return Err(VizsqlError::ConfigError(
                "count aggregation requires the synthetic Record attribute".to_string(),
            ));
        }
        let measure_ident = quote_ident(&measure.attribute);
        match color {
            Some(clause) => {
                let color_ident = quote_ident(&clause.attribute);
                with_predicate(
                    format!(
                        "SELECT {g}, {c}, {f}({m}) AS {m} FROM {t}",
                        g = group_ident,
                        c = color_ident,
                        f = function,
                        m = measure_ident,
                        t = table_name
                    ),
                    predicate,
                ) + &format!(" GROUP BY {}, {}", group_ident, color_ident)
            }
            None => {
                with_predicate(
                    format!(
                        "SELECT {g}, {f}({m}) AS {m} FROM {t}",
                        g = group_ident,
                        f = function,
                        m = measure_ident,
                        t = table_name
                    ),
                    predicate,
                ) + &format!(" GROUP BY {}", group_ident)
            }
        }
    };

    Ok(query)
}

/// Densify a sparse aggregate result against the cached cross product of
/// groupby values (and color values, when bound).
///
/// Any returned group that is absent from the cached sets means the
/// metadata no longer matches the live table, which is an invariant
/// violation rather than something to paper over.
fn gap_fill(
    rows: Vec<GroupRow>,
    unique: &[ScalarValue],
    color_values: Option<&[ScalarValue]>,
    zero: ScalarValue,
    groupby_attribute: &str,
) -> Result<Vec<GroupRow>> {
    let mut sparse: HashMap<(String, String), GroupRow> = HashMap::with_capacity(rows.len());
    for row in rows {
        let key = (
            row.0.to_string(),
            row.1.as_ref().map(|v| v.to_string()).unwrap_or_default(),
        );
        sparse.insert(key, row);
    }

    let mut dense: Vec<GroupRow> = Vec::new();
    match color_values {
        Some(colors) => {
            for color in colors {
                for group in unique {
                    let key = (group.to_string(), color.to_string());
                    match sparse.remove(&key) {
                        Some(row) => dense.push(row),
                        None => dense.push((group.clone(), Some(color.clone()), zero.clone())),
                    }
                }
            }
        }
        None => {
            for group in unique {
                let key = (group.to_string(), String::new());
                match sparse.remove(&key) {
                    Some(row) => dense.push(row),
                    None => dense.push((group.clone(), None, zero.clone())),
                }
            }
        }
    }

    if !sparse.is_empty() {
        return Err(VizsqlError::InvariantError(format!(
            "aggregated result for '{}' contains {} group value(s) missing from cached metadata",
            groupby_attribute,
            sparse.len()
        )));
    }

    Ok(dense)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::FilterOp;

    fn groupby_clause() -> Clause {
        Clause::attribute("region").on_channel(Channel::X).groupby()
    }

    #[test]
    fn test_count_query_text() {
        let query = build_aggregate_query(
            "sales",
            "WHERE \"region\" IS NOT NULL",
            &groupby_clause(),
            &Clause::record_count().on_channel(Channel::Y),
            Aggregation::Count,
            None,
        )
        .unwrap();
        assert_eq!(
            query,
            "SELECT \"region\", COUNT(\"region\") AS \"count\" FROM sales \
             WHERE \"region\" IS NOT NULL GROUP BY \"region\""
        );
    }

    #[test]
    fn test_mean_query_with_color() {
        let color = Clause::attribute("segment").on_channel(Channel::Color);
        let query = build_aggregate_query(
            "sales",
            "",
            &groupby_clause(),
            &Clause::attribute("revenue")
                .on_channel(Channel::Y)
                .aggregate(Aggregation::Mean),
            Aggregation::Mean,
            Some(&color),
        )
        .unwrap();
        assert_eq!(
            query,
            "SELECT \"region\", \"segment\", AVG(\"revenue\") AS \"revenue\" FROM sales \
             GROUP BY \"region\", \"segment\""
        );
    }

    #[test]
    fn test_count_on_real_column_rejected() {
        let result = build_aggregate_query(
            "sales",
            "",
            &groupby_clause(),
            &Clause::attribute("revenue")
                .on_channel(Channel::Y)
                .aggregate(Aggregation::Count),
            Aggregation::Count,
            None,
        );
        assert!(matches!(result, Err(VizsqlError::ConfigError(_))));
    }

    #[test]
    fn test_gap_fill_without_color() {
        let rows = vec![
            (
                ScalarValue::String("N".into()),
                None,
                ScalarValue::Int(12),
            ),
            (
                ScalarValue::String("S".into()),
                None,
                ScalarValue::Int(7),
            ),
        ];
        let unique: Vec<ScalarValue> = ["E", "N", "S", "W"]
            .iter()
            .map(|s| ScalarValue::String((*s).to_string()))
            .collect();
        let dense = gap_fill(rows, &unique, None, ScalarValue::Int(0), "region").unwrap();
        assert_eq!(dense.len(), 4);
        let west = dense
            .iter()
            .find(|r| r.0 == ScalarValue::String("W".into()))
            .unwrap();
        assert_eq!(west.2, ScalarValue::Int(0));
    }

    #[test]
    fn test_gap_fill_with_color_cross_product() {
        let rows = vec![(
            ScalarValue::String("N".into()),
            Some(ScalarValue::String("a".into())),
            ScalarValue::Int(3),
        )];
        let unique = vec![
            ScalarValue::String("N".into()),
            ScalarValue::String("S".into()),
        ];
        let colors = vec![
            ScalarValue::String("a".into()),
            ScalarValue::String("b".into()),
        ];
        let dense = gap_fill(rows, &unique, Some(&colors), ScalarValue::Int(0), "region").unwrap();
        assert_eq!(dense.len(), 4);
        assert_eq!(
            dense
                .iter()
                .filter(|r| r.2 == ScalarValue::Int(0))
                .count(),
            3
        );
    }

    #[test]
    fn test_gap_fill_detects_stale_metadata() {
        let rows = vec![(
            ScalarValue::String("X".into()),
            None,
            ScalarValue::Int(1),
        )];
        let unique = vec![ScalarValue::String("N".into())];
        let result = gap_fill(rows, &unique, None, ScalarValue::Int(0), "region");
        assert!(matches!(result, Err(VizsqlError::InvariantError(_))));
    }

    #[test]
    fn test_filter_clause_does_not_pick_channels() {
        // A filter on x's attribute must not be mistaken for the x clause.
        let spec = ChartSpec::new(
            vec![
                Clause::attribute("region").on_channel(Channel::X).groupby(),
                Clause::record_count().on_channel(Channel::Y),
                Clause::filter("year", FilterOp::Eq, ScalarValue::Int(2024)),
            ],
            crate::spec::Mark::Bar,
        );
        assert_eq!(spec.clauses_on_channel(Channel::X).len(), 1);
    }
}
