use super::{setup, sum_count_avg};
use crate::{
    aggregation::{
        AggregateKind, AggregateSetupError, AggregateTarget, AggregateTerm, Aggregation,
        AggregationConfig, SlotKind, TermBinding,
    },
    obs::{MetricsEvent, MetricsSink, with_metrics_sink},
    types::SqlType,
};
use std::{cell::RefCell, collections::BTreeSet};

fn setup_err(terms: Vec<AggregateTerm>) -> AggregateSetupError {
    Aggregation::setup(terms, true, AggregationConfig::default())
        .expect_err("aggregate setup should be rejected")
}

fn slot_kinds(aggregation: &Aggregation) -> Vec<SlotKind> {
    aggregation
        .aggregate_infos()
        .iter()
        .map(|info| info.aggregate_type)
        .collect()
}

#[derive(Default)]
struct CapturingSink {
    events: RefCell<Vec<MetricsEvent>>,
}

impl MetricsSink for CapturingSink {
    fn record(&self, event: MetricsEvent) {
        self.events.borrow_mut().push(event);
    }
}

// ---- slot mapping ------------------------------------------------------

#[test]
fn distinct_simple_terms_map_one_to_one() {
    let aggregation = setup(
        vec![
            AggregateTerm::count("a", SqlType::Integer),
            AggregateTerm::sum("b", SqlType::Integer),
            AggregateTerm::min("c", SqlType::Date),
            AggregateTerm::max("a", SqlType::Integer),
            AggregateTerm::count_star(),
        ],
        true,
    );

    assert_eq!(aggregation.aggregate_infos().len(), 5);
    assert!(aggregation.aggregate_infos().iter().all(|i| !i.is_internal));
    assert_eq!(
        slot_kinds(&aggregation),
        vec![
            SlotKind::Count,
            SlotKind::Sum,
            SlotKind::Min,
            SlotKind::Max,
            SlotKind::CountStar
        ]
    );
    for (term, binding) in aggregation.bindings().iter().enumerate() {
        assert_eq!(*binding, TermBinding::Slot { slot: term });
    }
}

#[test]
fn avg_decomposes_into_two_internal_slots() {
    let aggregation = setup(vec![AggregateTerm::avg("x", SqlType::Integer)], true);
    let infos = aggregation.aggregate_infos();

    assert_eq!(slot_kinds(&aggregation), vec![SlotKind::Sum, SlotKind::Count]);
    assert!(infos.iter().all(|i| i.is_internal && i.source_index == 0));
    assert!(infos.iter().all(|i| i.served_terms == vec![0]));
    assert_eq!(
        aggregation.bindings(),
        &[TermBinding::Average {
            sum: 0,
            count: 1,
            output_type: SqlType::Decimal
        }]
    );
}

#[test]
fn sum_and_avg_over_same_input_share_the_sum_slot() {
    let aggregation = setup(
        vec![
            AggregateTerm::sum("x", SqlType::Integer),
            AggregateTerm::avg("x", SqlType::Integer),
        ],
        true,
    );
    let infos = aggregation.aggregate_infos();

    assert_eq!(infos.len(), 2);
    assert_eq!(infos[0].aggregate_type, SlotKind::Sum);
    assert!(!infos[0].is_internal);
    assert_eq!(infos[0].served_terms, vec![0, 1]);
    assert_eq!(infos[1].aggregate_type, SlotKind::Count);
    assert!(infos[1].is_internal);
}

#[test]
fn direct_request_after_avg_makes_shared_slot_visible() {
    let aggregation = setup(
        vec![
            AggregateTerm::avg("x", SqlType::Integer),
            AggregateTerm::count("x", SqlType::Integer),
        ],
        true,
    );
    let infos = aggregation.aggregate_infos();

    assert_eq!(infos.len(), 2);
    assert!(infos[0].is_internal);
    assert!(!infos[1].is_internal);
    assert_eq!(infos[1].source_index, 0);
    assert_eq!(aggregation.bindings()[1], TermBinding::Slot { slot: 1 });
}

#[test]
fn sum_count_avg_needs_two_slots() {
    let aggregation = setup(sum_count_avg(), true);

    assert_eq!(slot_kinds(&aggregation), vec![SlotKind::Sum, SlotKind::Count]);
    assert!(aggregation.aggregate_infos().iter().all(|i| !i.is_internal));
}

#[test]
fn count_star_terms_share_one_slot() {
    let aggregation = setup(
        vec![AggregateTerm::count_star(), AggregateTerm::count_star()],
        false,
    );

    assert_eq!(aggregation.aggregate_infos().len(), 1);
    assert_eq!(aggregation.aggregate_infos()[0].served_terms, vec![0, 1]);
}

#[test]
fn different_inputs_are_never_shared() {
    let aggregation = setup(
        vec![
            AggregateTerm::sum("x", SqlType::Integer),
            AggregateTerm::sum("y", SqlType::Integer),
            AggregateTerm::min("x", SqlType::Integer),
        ],
        true,
    );

    assert_eq!(aggregation.aggregate_infos().len(), 3);
}

#[test]
fn stored_types_follow_slot_kind() {
    let aggregation = setup(
        vec![
            AggregateTerm::sum("i", SqlType::TinyInt),
            AggregateTerm::sum("d", SqlType::Double),
            AggregateTerm::sum("m", SqlType::Decimal),
            AggregateTerm::min("t", SqlType::Timestamp),
            AggregateTerm::count("s", SqlType::Varchar),
        ],
        true,
    );
    let types: Vec<SqlType> = aggregation
        .aggregate_infos()
        .iter()
        .map(|i| i.sql_type)
        .collect();

    assert_eq!(
        types,
        vec![
            SqlType::BigInt,
            SqlType::Double,
            SqlType::Decimal,
            SqlType::Timestamp,
            SqlType::BigInt
        ]
    );
    assert_eq!(aggregation.output_types(), types);
}

#[test]
fn storage_indices_are_unique_and_fit_the_buffer() {
    let aggregation = setup(
        vec![
            AggregateTerm::avg("x", SqlType::Decimal),
            AggregateTerm::max("y", SqlType::Double),
            AggregateTerm::count_star(),
        ],
        false,
    );
    let storage = aggregation.storage();
    let mut seen = BTreeSet::new();

    for info in aggregation.aggregate_infos() {
        assert!(seen.insert(info.storage_index));
        let slot = storage.slot(info.storage_index).expect("slot should exist");
        assert_eq!(slot.sql_type, info.sql_type);
        assert!(slot.offset + slot.size <= aggregation.storage_size());
        assert_eq!(slot.nullable, !info.aggregate_type.is_counter());
    }
    assert_eq!(storage.slot_count(), aggregation.aggregate_infos().len());
}

#[test]
fn setup_is_idempotent() {
    let first = setup(sum_count_avg(), true);
    let second = setup(sum_count_avg(), true);

    assert_eq!(first.storage_size(), second.storage_size());
    assert_eq!(slot_kinds(&first), slot_kinds(&second));
    assert_eq!(first.aggregate_infos(), second.aggregate_infos());
}

#[test]
fn avg_output_type_falls_back_to_config() {
    let terms = vec![
        AggregateTerm::avg("x", SqlType::Integer),
        AggregateTerm::avg("x", SqlType::Integer).with_output_type(SqlType::Integer),
    ];
    let config = AggregationConfig::new().avg_output_type(SqlType::Double);
    let aggregation = Aggregation::setup(terms, true, config).expect("setup");

    assert_eq!(
        aggregation.output_types(),
        vec![SqlType::Double, SqlType::Integer]
    );
    // both AVGs read the same two slots
    assert_eq!(aggregation.aggregate_infos().len(), 2);
}

// ---- rejections --------------------------------------------------------

#[test]
fn missing_target_is_rejected() {
    let term = AggregateTerm {
        kind: AggregateKind::Sum,
        target: None,
        distinct: false,
        output_type: None,
    };

    assert_eq!(
        setup_err(vec![AggregateTerm::count_star(), term]),
        AggregateSetupError::MissingTarget {
            index: 1,
            kind: AggregateKind::Sum
        }
    );
}

#[test]
fn count_star_with_target_is_rejected() {
    let mut term = AggregateTerm::count_star();
    term.target = Some(AggregateTarget::new("x", SqlType::Integer));

    assert_eq!(
        setup_err(vec![term]),
        AggregateSetupError::CountStarWithTarget { index: 0 }
    );
}

#[test]
fn type_capability_violations_are_rejected() {
    assert!(matches!(
        setup_err(vec![AggregateTerm::sum("d", SqlType::Date)]),
        AggregateSetupError::IncompatibleType {
            kind: AggregateKind::Sum,
            ty: SqlType::Date,
            ..
        }
    ));
    assert!(matches!(
        setup_err(vec![AggregateTerm::avg("b", SqlType::Boolean)]),
        AggregateSetupError::IncompatibleType { .. }
    ));
    assert!(matches!(
        setup_err(vec![AggregateTerm::max("s", SqlType::Varchar)]),
        AggregateSetupError::UnstorableType {
            ty: SqlType::Varchar,
            ..
        }
    ));
}

#[test]
fn invalid_output_types_are_rejected() {
    assert!(matches!(
        setup_err(vec![
            AggregateTerm::avg("x", SqlType::Integer).with_output_type(SqlType::Varchar)
        ]),
        AggregateSetupError::InvalidOutputType { .. }
    ));
    assert!(matches!(
        setup_err(vec![
            AggregateTerm::count("x", SqlType::Integer).with_output_type(SqlType::Decimal)
        ]),
        AggregateSetupError::InvalidOutputType { .. }
    ));

    let config = AggregationConfig::new().avg_output_type(SqlType::Date);
    assert!(
        Aggregation::setup(vec![AggregateTerm::avg("x", SqlType::Integer)], true, config).is_err()
    );
}

#[test]
fn distinct_is_only_accepted_for_min_and_max() {
    assert!(matches!(
        setup_err(vec![AggregateTerm::sum("x", SqlType::Integer).distinct()]),
        AggregateSetupError::DistinctUnsupported {
            kind: AggregateKind::Sum,
            ..
        }
    ));

    let aggregation = setup(
        vec![
            AggregateTerm::min("x", SqlType::Integer).distinct(),
            AggregateTerm::min("x", SqlType::Integer),
        ],
        true,
    );
    assert_eq!(aggregation.aggregate_infos().len(), 1);
}

#[test]
fn storage_limit_is_enforced() {
    let terms = vec![
        AggregateTerm::sum("a", SqlType::Decimal),
        AggregateTerm::sum("b", SqlType::Decimal),
    ];
    let config = AggregationConfig::new().max_storage_bytes(16);

    assert!(matches!(
        Aggregation::setup(terms, true, config),
        Err(AggregateSetupError::StorageLimitExceeded { limit: 16, .. })
    ));
}

// ---- observability -----------------------------------------------------

#[test]
fn setup_reports_sharing_and_decomposition() {
    let sink = CapturingSink::default();

    with_metrics_sink(&sink, || {
        let _ = setup(sum_count_avg(), true);
        let _ = Aggregation::setup(
            vec![AggregateTerm::sum("d", SqlType::Date)],
            true,
            AggregationConfig::default(),
        );
    });

    let events = sink.events.borrow();
    assert!(matches!(
        events[0],
        MetricsEvent::SetupFinish {
            terms: 3,
            slots: 2,
            shared: 2,
            decomposed: 1,
            ..
        }
    ));
    assert_eq!(events[1], MetricsEvent::SetupRejected);
}

#[test]
fn explain_lists_terms_and_slots() {
    let aggregation = setup(sum_count_avg(), true);
    let explain = aggregation.explain().expect("explain");

    assert_eq!(explain.terms.len(), 3);
    assert_eq!(explain.terms[2].term, "AVG(x)");
    assert_eq!(explain.terms[2].output_type, SqlType::Decimal);
    assert_eq!(explain.slots.len(), 2);
    assert_eq!(explain.storage_size, aggregation.storage_size());

    let json = serde_json::to_value(&explain).expect("explain should serialize");
    assert_eq!(json["slots"][0]["kind"], "Sum");
    assert_eq!(json["slots"][1]["served_terms"], serde_json::json!([1, 2]));
}
