//! Declarative chart specification types.
//!
//! A [`ChartSpec`] is an ordered collection of [`Clause`] objects plus a
//! [`Mark`] tag. Clauses are produced by an upstream intent parser and are
//! immutable once built; the executor only ever attaches a [`ResultTable`]
//! to the spec, with one exception: a large scatter may have its mark
//! rewritten to [`Mark::Heatmap`] by the dispatcher.

use crate::data::ScalarValue;
use crate::naming;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Mark, Channel, Aggregation, FilterOp
// =============================================================================

/// Chart-kind tag. `Empty` marks an unqualified spec that only receives a
/// lazy preview sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    #[default]
    Empty,
    Scatter,
    Bar,
    Line,
    Histogram,
    Heatmap,
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mark::Empty => "",
            Mark::Scatter => "scatter",
            Mark::Bar => "bar",
            Mark::Line => "line",
            Mark::Histogram => "histogram",
            Mark::Heatmap => "heatmap",
        };
        write!(f, "{}", name)
    }
}

/// Visual channel an attribute is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    X,
    Y,
    Color,
}

/// Aggregation tag carried by a clause.
///
/// `None` is a real tag (it marks the categorical groupby side of an
/// aggregate chart); a clause with no tag at all carries `Option::None`
/// instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    None,
    Mean,
    Sum,
    Max,
    Count,
}

impl Aggregation {
    /// SQL aggregate function name, if this tag aggregates.
    pub fn sql_function(&self) -> Option<&'static str> {
        match self {
            Aggregation::None => None,
            Aggregation::Mean => Some("AVG"),
            Aggregation::Sum => Some("SUM"),
            Aggregation::Max => Some("MAX"),
            Aggregation::Count => Some("COUNT"),
        }
    }
}

/// Comparison operator of a filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            FilterOp::Eq => "=",
            FilterOp::NotEq => "!=",
            FilterOp::Lt => "<",
            FilterOp::LtEq => "<=",
            FilterOp::Gt => ">",
            FilterOp::GtEq => ">=",
        };
        write!(f, "{}", op)
    }
}

/// Comparison predicate attached to a filter clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub op: FilterOp,
    pub value: ScalarValue,
}

// =============================================================================
// Clause
// =============================================================================

/// One atomic piece of a chart specification: an attribute/channel binding,
/// an aggregation or bin-count request, or a filter predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    /// Attribute (column) name; the synthetic `Record` attribute stands for
    /// the row count and never refers to a real column.
    pub attribute: String,
    /// Visual channel this attribute is bound to, if any.
    pub channel: Option<Channel>,
    /// Aggregation tag; `None` means the clause carries no tag at all.
    pub aggregation: Option<Aggregation>,
    /// Requested histogram bin count, if any.
    pub bin_count: Option<usize>,
    /// Filter predicate, if this is a filter clause.
    pub filter: Option<Filter>,
}

impl Clause {
    /// Plain attribute binding with no tags.
    pub fn attribute(name: impl Into<String>) -> Self {
        Self {
            attribute: name.into(),
            channel: None,
            aggregation: None,
            bin_count: None,
            filter: None,
        }
    }

    /// The synthetic record-count measure (`Record`, aggregation `count`).
    pub fn record_count() -> Self {
        Self::attribute(naming::RECORD_ATTRIBUTE).aggregate(Aggregation::Count)
    }

    /// Filter clause: `attribute <op> value`.
    pub fn filter(name: impl Into<String>, op: FilterOp, value: ScalarValue) -> Self {
        let mut clause = Self::attribute(name);
        clause.filter = Some(Filter { op, value });
        clause
    }

    pub fn on_channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn aggregate(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = Some(aggregation);
        self
    }

    /// Tag this clause as the categorical groupby side of an aggregate chart.
    pub fn groupby(self) -> Self {
        self.aggregate(Aggregation::None)
    }

    pub fn with_bins(mut self, bin_count: usize) -> Self {
        self.bin_count = Some(bin_count);
        self
    }

    /// Whether this clause is a filter predicate.
    pub fn is_filter(&self) -> bool {
        self.filter.is_some()
    }

    /// Whether this clause names the synthetic record-count attribute.
    pub fn is_record(&self) -> bool {
        self.attribute == naming::RECORD_ATTRIBUTE
    }

    /// The aggregate function requested by this clause, if it aggregates.
    pub fn aggregate_function(&self) -> Option<Aggregation> {
        match self.aggregation {
            Some(Aggregation::None) | None => None,
            Some(func) => Some(func),
        }
    }
}

// =============================================================================
// ChartSpec and ResultTable
// =============================================================================

/// The full declarative description of one chart, plus its eventually
/// attached result table.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub clauses: Vec<Clause>,
    pub mark: Mark,
    /// Populated by the executor; `None` until then (and left `None` by the
    /// paths that intentionally skip a spec).
    pub data: Option<ResultTable>,
}

impl ChartSpec {
    pub fn new(clauses: Vec<Clause>, mark: Mark) -> Self {
        Self {
            clauses,
            mark,
            data: None,
        }
    }

    /// Clauses bound to the given channel, in spec order.
    pub fn clauses_on_channel(&self, channel: Channel) -> Vec<&Clause> {
        self.clauses
            .iter()
            .filter(|c| c.channel == Some(channel))
            .collect()
    }

    /// Filter clauses, in spec order.
    pub fn filter_clauses(&self) -> Vec<&Clause> {
        self.clauses.iter().filter(|c| c.is_filter()).collect()
    }

    /// Non-filter attribute clauses, in spec order.
    pub fn attribute_clauses(&self) -> Vec<&Clause> {
        self.clauses.iter().filter(|c| !c.is_filter()).collect()
    }

    /// The first clause with a nonzero bin count, if any.
    pub fn bin_clause(&self) -> Option<&Clause> {
        self.clauses
            .iter()
            .find(|c| c.bin_count.is_some_and(|n| n > 0))
    }
}

/// The tabular output attached to a [`ChartSpec`].
///
/// `length` is the authoritative filtered row count, which may differ from
/// `data.height()` after sampling or gap-fill. It is set exactly once by the
/// producing operation.
#[derive(Debug, Clone)]
pub struct ResultTable {
    pub data: DataFrame,
    pub length: usize,
}

impl ResultTable {
    pub fn new(data: DataFrame, length: usize) -> Self {
        Self { data, length }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_count_clause() {
        let clause = Clause::record_count();
        assert!(clause.is_record());
        assert_eq!(clause.aggregate_function(), Some(Aggregation::Count));
    }

    #[test]
    fn test_groupby_clause_has_no_aggregate_function() {
        let clause = Clause::attribute("region").groupby();
        assert_eq!(clause.aggregation, Some(Aggregation::None));
        assert_eq!(clause.aggregate_function(), None);
    }

    #[test]
    fn test_untagged_clause() {
        let clause = Clause::attribute("age");
        assert_eq!(clause.aggregation, None);
        assert_eq!(clause.aggregate_function(), None);
    }

    #[test]
    fn test_clauses_on_channel() {
        let spec = ChartSpec::new(
            vec![
                Clause::attribute("age").on_channel(Channel::X),
                Clause::record_count().on_channel(Channel::Y),
                Clause::filter("year", FilterOp::Eq, ScalarValue::Int(2024)),
            ],
            Mark::Bar,
        );
        assert_eq!(spec.clauses_on_channel(Channel::X).len(), 1);
        assert_eq!(spec.clauses_on_channel(Channel::Color).len(), 0);
        assert_eq!(spec.filter_clauses().len(), 1);
        assert_eq!(spec.attribute_clauses().len(), 2);
    }

    #[test]
    fn test_bin_clause() {
        let spec = ChartSpec::new(
            vec![Clause::attribute("age").on_channel(Channel::X).with_bins(9)],
            Mark::Histogram,
        );
        assert_eq!(spec.bin_clause().unwrap().bin_count, Some(9));
    }

    #[test]
    fn test_filter_op_display() {
        assert_eq!(FilterOp::Eq.to_string(), "=");
        assert_eq!(FilterOp::GtEq.to_string(), ">=");
    }

    #[test]
    fn test_aggregation_sql_function() {
        assert_eq!(Aggregation::Mean.sql_function(), Some("AVG"));
        assert_eq!(Aggregation::None.sql_function(), None);
    }
}
