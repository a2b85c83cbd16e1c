//! SQL construction primitives and the filter compiler.
//!
//! Every query the executor issues is composed from the same two vetted
//! quoting primitives: identifiers are double-quoted and literals are
//! single-quoted with embedded quotes doubled. This is the sole
//! injection-safety mechanism; no query site interpolates raw user text.

use crate::spec::ChartSpec;

// =============================================================================
// Quoting primitives
// =============================================================================

/// Quote a column identifier: `age` -> `"age"`.
///
/// Embedded double quotes are doubled so the identifier round-trips.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a literal value: `O'Brien` -> `'O''Brien'`.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

// =============================================================================
// Predicate builder
// =============================================================================

/// An ordered list of predicate conditions rendered as a `WHERE` fragment.
#[derive(Debug, Clone, Default)]
pub struct Predicate {
    conditions: Vec<String>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one already-quoted condition.
    pub fn push(&mut self, condition: String) {
        self.conditions.push(condition);
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Render as `WHERE c1 AND c2 ...`, or the empty string when there are
    /// no conditions (queries gracefully omit the clause).
    pub fn render(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }
}

// =============================================================================
// Filter compiler
// =============================================================================

/// Compile a chart's clauses into a predicate fragment.
///
/// Filter clauses contribute `"attr" <op> 'value'` conditions in spec order.
/// Every non-filter attribute clause referencing a real column (not the
/// synthetic record-count placeholder) then contributes `"attr" IS NOT NULL`;
/// bucket math is undefined on null inputs, so nulls are excluded
/// structurally rather than defensively.
///
/// Returns the rendered predicate (possibly empty) and the distinct filter
/// attribute names in first-use order.
pub fn compile_filter(spec: &ChartSpec) -> (String, Vec<String>) {
    let mut predicate = Predicate::new();
    let mut filter_vars: Vec<String> = Vec::new();

    for clause in spec.filter_clauses() {
        let Some(filter) = clause.filter.as_ref() else {
            continue;
        };
        predicate.push(format!(
            "{} {} {}",
            quote_ident(&clause.attribute),
            filter.op,
            quote_literal(&filter.value.to_string()),
        ));
        if !filter_vars.iter().any(|v| v == &clause.attribute) {
            filter_vars.push(clause.attribute.clone());
        }
    }

    for clause in spec.attribute_clauses() {
        if !clause.is_record() {
            predicate.push(format!("{} IS NOT NULL", quote_ident(&clause.attribute)));
        }
    }

    (predicate.render(), filter_vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ScalarValue;
    use crate::spec::{Channel, Clause, FilterOp, Mark};

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("age"), "\"age\"");
        assert_eq!(quote_ident("od\"d"), "\"od\"\"d\"");
    }

    #[test]
    fn test_quote_literal_roundtrip() {
        // Parsing the quoted form back must yield the original value.
        let original = "O'Brien's";
        let quoted = quote_literal(original);
        assert_eq!(quoted, "'O''Brien''s'");
        let inner = &quoted[1..quoted.len() - 1];
        assert_eq!(inner.replace("''", "'"), original);
    }

    #[test]
    fn test_empty_predicate_renders_empty() {
        assert_eq!(Predicate::new().render(), "");
    }

    #[test]
    fn test_filter_then_null_exclusion_order() {
        let spec = ChartSpec::new(
            vec![
                Clause::attribute("age").on_channel(Channel::X),
                Clause::filter("year", FilterOp::Eq, ScalarValue::Int(2024)),
            ],
            Mark::Histogram,
        );
        let (predicate, vars) = compile_filter(&spec);
        assert_eq!(
            predicate,
            "WHERE \"year\" = '2024' AND \"age\" IS NOT NULL"
        );
        assert_eq!(vars, vec!["year".to_string()]);
    }

    #[test]
    fn test_record_attribute_gets_no_null_exclusion() {
        let spec = ChartSpec::new(
            vec![
                Clause::attribute("region").on_channel(Channel::X).groupby(),
                Clause::record_count().on_channel(Channel::Y),
            ],
            Mark::Bar,
        );
        let (predicate, vars) = compile_filter(&spec);
        assert_eq!(predicate, "WHERE \"region\" IS NOT NULL");
        assert!(vars.is_empty());
    }

    #[test]
    fn test_multiple_filters_use_and() {
        let spec = ChartSpec::new(
            vec![
                Clause::filter("year", FilterOp::GtEq, ScalarValue::Int(2020)),
                Clause::filter("region", FilterOp::Eq, ScalarValue::String("N".into())),
            ],
            Mark::Scatter,
        );
        let (predicate, vars) = compile_filter(&spec);
        assert_eq!(
            predicate,
            "WHERE \"year\" >= '2020' AND \"region\" = 'N'"
        );
        assert_eq!(vars, vec!["year".to_string(), "region".to_string()]);
    }

    #[test]
    fn test_no_clauses_no_predicate() {
        let spec = ChartSpec::new(vec![], Mark::Empty);
        let (predicate, vars) = compile_filter(&spec);
        assert_eq!(predicate, "");
        assert!(vars.is_empty());
    }
}
