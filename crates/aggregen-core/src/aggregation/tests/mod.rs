mod planner;
mod property;

use crate::{
    aggregation::{AggregateTerm, Aggregation, AggregationConfig, AggregationProgram},
    types::SqlType,
    value::Value,
};

// ---- helpers -----------------------------------------------------------

fn setup(terms: Vec<AggregateTerm>, is_global: bool) -> Aggregation {
    Aggregation::setup(terms, is_global, AggregationConfig::default())
        .expect("aggregate setup should succeed")
}

fn compile(terms: Vec<AggregateTerm>, is_global: bool) -> AggregationProgram {
    AggregationProgram::compile(&setup(terms, is_global)).expect("program should compile")
}

/// SUM(x), COUNT(x), AVG(x) over one INTEGER column.
fn sum_count_avg() -> Vec<AggregateTerm> {
    vec![
        AggregateTerm::sum("x", SqlType::Integer),
        AggregateTerm::count("x", SqlType::Integer),
        AggregateTerm::avg("x", SqlType::Integer),
    ]
}

fn int(v: Option<i32>) -> Value {
    v.map_or(Value::null(SqlType::Integer), Value::integer)
}

/// Rows that feed the same column value to each of `width` terms.
fn column_rows(width: usize, values: &[Option<i32>]) -> Vec<Vec<Value>> {
    values.iter().map(|v| vec![int(*v); width]).collect()
}
