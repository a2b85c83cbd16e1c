//! Scatter fetch with the sampling cap.
//!
//! Fetches the columns a scatter plot needs under the compiled predicate.
//! When the filtered population exceeds the configured cap, the fetch
//! becomes a uniform random sample of exactly `cap` rows via the backend's
//! native random ordering; the attached `length` still reports the full
//! filtered population.

use crate::config::ExecutorConfig;
use crate::executor::with_predicate;
use crate::metadata::DataSource;
use crate::reader::{run_query, Reader};
use crate::spec::{ChartSpec, ResultTable};
use crate::sql::{compile_filter, quote_ident};
use crate::Result;

pub fn execute_scatter(
    view: &mut ChartSpec,
    source: &DataSource,
    reader: &dyn Reader,
    config: &ExecutorConfig,
    length: usize,
) -> Result<()> {
    let (predicate, filter_vars) = compile_filter(view);

    // Every referenced attribute, in clause order, filters last; the
    // synthetic record-count attribute is not a real column.
    let mut required: Vec<String> = Vec::new();
    for clause in &view.clauses {
        if clause.is_filter() || clause.is_record() || clause.attribute.is_empty() {
            continue;
        }
        if !required.contains(&clause.attribute) {
            required.push(clause.attribute.clone());
        }
    }
    for var in filter_vars {
        if !required.contains(&var) {
            required.push(var);
        }
    }

    let select_list = required
        .iter()
        .map(|name| quote_ident(name))
        .collect::<Vec<_>>()
        .join(",");

    let base = with_predicate(
        format!("SELECT {} FROM {}", select_list, source.table_name),
        &predicate,
    );
    let query = if length > config.sampling_cap {
        format!(
            "{} ORDER BY {} LIMIT {}",
            base,
            reader.random_function(),
            config.sampling_cap
        )
    } else {
        base
    };

    let df = run_query(reader, &query)?;
    view.data = Some(ResultTable::new(df, length));
    Ok(())
}
