use super::{column_rows, compile, setup, sum_count_avg};
use crate::{
    aggregation::{AggregateKind, AggregateTerm, SlotKind},
    types::{Decimal, SqlType},
    value::Value,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

const EXPRS: [&str; 3] = ["a", "b", "c"];

fn arb_column() -> impl Strategy<Value = Vec<Option<i32>>> {
    prop::collection::vec(prop::option::of(-1_000_000i32..1_000_000), 0..40)
}

fn arb_term() -> impl Strategy<Value = AggregateTerm> {
    let kind = prop_oneof![
        Just(AggregateKind::Count),
        Just(AggregateKind::CountStar),
        Just(AggregateKind::Sum),
        Just(AggregateKind::Min),
        Just(AggregateKind::Max),
        Just(AggregateKind::Avg),
    ];

    (kind, 0..EXPRS.len()).prop_map(|(kind, expr)| match kind {
        AggregateKind::CountStar => AggregateTerm::count_star(),
        kind => AggregateTerm::new(kind, EXPRS[expr], SqlType::Integer),
    })
}

// Plain fold used as the oracle for emitted code.
fn reference(values: &[Option<i32>]) -> Vec<Value> {
    let present: Vec<i64> = values.iter().flatten().map(|v| i64::from(*v)).collect();
    let count = present.len() as i64;
    let sum = present.iter().sum::<i64>();
    let min = present.iter().min().copied();
    let max = present.iter().max().copied();

    let avg = (count > 0).then(|| {
        Decimal::from_i64(sum)
            .checked_div(Decimal::from_i64(count))
            .expect("non-zero count")
            .round_dp(10)
    });

    vec![
        if count > 0 { Value::big_int(sum) } else { Value::null(SqlType::BigInt) },
        Value::big_int(count),
        avg.map_or(Value::null(SqlType::Decimal), Value::decimal),
        min.map_or(Value::null(SqlType::Integer), |v| {
            Value::from_i64(SqlType::Integer, v).expect("i32 range")
        }),
        max.map_or(Value::null(SqlType::Integer), |v| {
            Value::from_i64(SqlType::Integer, v).expect("i32 range")
        }),
    ]
}

fn full_terms() -> Vec<AggregateTerm> {
    let mut terms = sum_count_avg();
    terms.push(AggregateTerm::min("x", SqlType::Integer));
    terms.push(AggregateTerm::max("x", SqlType::Integer));
    terms
}

proptest! {
    #[test]
    fn emitted_code_matches_reference_fold(values in arb_column()) {
        let program = compile(full_terms(), true);
        let out = program
            .evaluate(&column_rows(5, &values))
            .expect("evaluation")
            .expect("global output");

        prop_assert_eq!(out, reference(&values));
    }

    #[test]
    fn results_are_order_independent(
        (values, shuffled) in arb_column()
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        let program = compile(full_terms(), true);
        let run = |column: &[Option<i32>]| {
            program
                .evaluate(&column_rows(5, column))
                .expect("evaluation")
                .expect("global output")
        };

        prop_assert_eq!(run(&values), run(&shuffled));
    }

    #[test]
    fn grouped_and_global_agree_on_non_empty_input(
        values in prop::collection::vec(prop::option::of(-1_000i32..1_000), 1..20)
    ) {
        let rows = column_rows(5, &values);
        let global = compile(full_terms(), true).evaluate(&rows).expect("global");
        let grouped = compile(full_terms(), false).evaluate(&rows).expect("grouped");

        prop_assert_eq!(global, grouped);
    }
}

proptest! {
    #[test]
    fn slot_table_respects_bounds(terms in prop::collection::vec(arb_term(), 1..12)) {
        let aggregation = setup(terms.clone(), true);
        let infos = aggregation.aggregate_infos();

        prop_assert!(infos.len() <= terms.len() * 2);

        let keys: BTreeSet<(SlotKind, Option<String>)> = infos
            .iter()
            .map(|info| {
                let expr = terms[info.source_index].target.as_ref().map(|t| t.expr.clone());
                (info.aggregate_type, expr)
            })
            .collect();
        prop_assert_eq!(keys.len(), infos.len());

        for term in 0..terms.len() {
            prop_assert!(infos.iter().any(|info| info.served_terms.contains(&term)));
        }

        let storage: BTreeSet<u32> = infos.iter().map(|info| info.storage_index).collect();
        prop_assert_eq!(storage.len(), infos.len());

        if !terms.iter().any(|t| t.kind == AggregateKind::Avg) {
            let distinct_terms: BTreeSet<String> = terms.iter().map(ToString::to_string).collect();
            prop_assert_eq!(infos.len(), distinct_terms.len());
        }
    }

    #[test]
    fn setup_is_deterministic(terms in prop::collection::vec(arb_term(), 1..12)) {
        let first = setup(terms.clone(), false);
        let second = setup(terms, false);

        prop_assert_eq!(first.storage_size(), second.storage_size());
        prop_assert_eq!(first.aggregate_infos(), second.aggregate_infos());
        prop_assert_eq!(first.bindings(), second.bindings());
    }
}
