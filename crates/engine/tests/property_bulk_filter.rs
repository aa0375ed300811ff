// Property-based tests for bulk filter transitions.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::BTreeSet;

use proptest::prelude::*;
use stepgrid_engine::cell::CellValue;
use stepgrid_engine::filter::{BulkFilter, BulkFilterCondition};
use stepgrid_engine::performers::bulk_filter::{toggle_bulk_filter, BulkFilterTransition, ToggleType};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Distinct column values: small integers and short words, deduplicated in
/// first-seen order.
fn arb_distinct() -> impl Strategy<Value = Vec<CellValue>> {
    prop::collection::vec(
        prop_oneof![
            (0i64..20).prop_map(CellValue::from),
            "[a-d]{1,3}".prop_map(CellValue::text),
        ],
        1..12,
    )
    .prop_map(|values| {
        let mut distinct = Vec::new();
        for v in values {
            if !distinct.contains(&v) {
                distinct.push(v);
            }
        }
        distinct
    })
}

#[derive(Debug, Clone)]
enum Op {
    Flip,
    Specific(usize, bool),
    Matching(String, bool),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        1 => Just(Op::Flip),
        4 => (0usize..12, any::<bool>()).prop_map(|(i, remove)| Op::Specific(i, remove)),
        2 => ("[a-d0-9]{0,2}", any::<bool>()).prop_map(|(s, remove)| Op::Matching(s, remove)),
    ]
}

fn to_toggle(op: &Op, distinct: &[CellValue]) -> ToggleType {
    match op {
        Op::Flip => ToggleType::ToggleFilterType,
        Op::Specific(i, remove) => ToggleType::ToggleSpecificValue {
            value: distinct[i % distinct.len()].clone(),
            remove_from_dataframe: *remove,
        },
        Op::Matching(search, remove) => ToggleType::ToggleAllMatching {
            search_string: search.clone(),
            remove_from_dataframe: *remove,
        },
    }
}

fn as_set(values: &[CellValue]) -> BTreeSet<String> {
    values.iter().map(|v| format!("{:?}", v)).collect()
}

fn apply(
    state: &BulkFilterTransition,
    toggle: &ToggleType,
    distinct: &[CellValue],
) -> BulkFilterTransition {
    toggle_bulk_filter(&state.bulk_filter, &state.filtered_out_values, toggle, distinct).unwrap()
}

/// IS_EXACTLY with every value kept
fn all_kept(distinct: &[CellValue]) -> BulkFilterTransition {
    BulkFilterTransition {
        bulk_filter: BulkFilter {
            condition: BulkFilterCondition::IsExactly,
            value: distinct.to_vec(),
        },
        filtered_out_values: Vec::new(),
    }
}

fn check_invariant(state: &BulkFilterTransition, distinct: &[CellValue]) -> Result<(), TestCaseError> {
    let kept = as_set(&state.bulk_filter.value);
    let excluded = as_set(&state.filtered_out_values);
    match state.bulk_filter.condition {
        BulkFilterCondition::IsExactly => {
            prop_assert!(kept.is_disjoint(&excluded));
            let union: BTreeSet<String> = kept.union(&excluded).cloned().collect();
            prop_assert_eq!(union, as_set(distinct));
        }
        BulkFilterCondition::IsNotExactly => {
            prop_assert_eq!(kept, excluded);
        }
        BulkFilterCondition::Unrecognized(_) => prop_assert!(false, "unrecognized condition"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn partition_holds_for_reachable_states(
        distinct in arb_distinct(),
        ops in prop::collection::vec(arb_op(), 0..20),
    ) {
        let mut state = all_kept(&distinct);
        for op in &ops {
            state = apply(&state, &to_toggle(op, &distinct), &distinct);
            check_invariant(&state, &distinct)?;
        }
    }

    #[test]
    fn remove_then_add_back_is_identity(
        distinct in arb_distinct(),
        ops in prop::collection::vec(arb_op(), 0..10),
        pick in 0usize..12,
    ) {
        let mut state = all_kept(&distinct);
        for op in &ops {
            state = apply(&state, &to_toggle(op, &distinct), &distinct);
        }

        let value = distinct[pick % distinct.len()].clone();
        let was_excluded = state.filtered_out_values.contains(&value);
        let first = ToggleType::ToggleSpecificValue {
            value: value.clone(),
            remove_from_dataframe: !was_excluded,
        };
        let second = ToggleType::ToggleSpecificValue {
            value,
            remove_from_dataframe: was_excluded,
        };

        let round_trip = apply(&apply(&state, &first, &distinct), &second, &distinct);
        prop_assert_eq!(&round_trip.bulk_filter.condition, &state.bulk_filter.condition);
        prop_assert_eq!(as_set(&round_trip.bulk_filter.value), as_set(&state.bulk_filter.value));
        prop_assert_eq!(as_set(&round_trip.filtered_out_values), as_set(&state.filtered_out_values));
    }

    #[test]
    fn double_flip_restores_condition_and_exclusions(
        distinct in arb_distinct(),
        ops in prop::collection::vec(arb_op(), 0..10),
    ) {
        let mut state = all_kept(&distinct);
        for op in &ops {
            state = apply(&state, &to_toggle(op, &distinct), &distinct);
        }

        let flipped = apply(&apply(&state, &ToggleType::ToggleFilterType, &distinct), &ToggleType::ToggleFilterType, &distinct);
        prop_assert_eq!(&flipped.bulk_filter.condition, &state.bulk_filter.condition);
        prop_assert_eq!(&flipped.filtered_out_values, &state.filtered_out_values);
        prop_assert_eq!(as_set(&flipped.bulk_filter.value), as_set(&state.bulk_filter.value));
    }

    #[test]
    fn flip_preserves_filtered_rows(
        distinct in arb_distinct(),
        ops in prop::collection::vec(arb_op(), 0..10),
    ) {
        let mut state = all_kept(&distinct);
        for op in &ops {
            state = apply(&state, &to_toggle(op, &distinct), &distinct);
        }

        let flipped = apply(&state, &ToggleType::ToggleFilterType, &distinct);
        for v in &distinct {
            prop_assert_eq!(flipped.bulk_filter.passes(v), state.bulk_filter.passes(v));
        }
    }
}
