//! Property-based tests for the diff engine and value cloning.

use frozen_state::hydrate::is_deep_frozen;
use frozen_state::{compare, count_changes, deep_clone, freeze, merge, Value};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn leaf_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        (-1000i32..1000).prop_map(Value::from),
        "[a-z]{0,6}".prop_map(Value::from),
        (0i64..4_000_000_000_000).prop_map(Value::date_millis),
    ]
}

/// Nested arrays and objects over a small key space, so that generated
/// pairs overlap often enough to exercise merging.
fn value_strategy() -> impl Strategy<Value = Value> {
    leaf_strategy().prop_recursive(4, 48, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::array),
            prop::collection::btree_map("[a-d]", inner, 0..4).prop_map(Value::object),
        ]
    })
}

// ============================================================================
// Comparison
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_compare_is_reflexive(value in value_strategy()) {
        prop_assert!(compare(&value, &value));
        prop_assert!(compare(&value, &deep_clone(&value)));
    }

    #[test]
    fn prop_compare_is_symmetric(a in value_strategy(), b in value_strategy()) {
        prop_assert_eq!(compare(&a, &b), compare(&b, &a));
    }

    #[test]
    fn prop_change_count_agrees_with_compare(a in value_strategy(), b in value_strategy()) {
        prop_assert_eq!(count_changes(&a, &b) == 0, compare(&a, &b));
        prop_assert_eq!(count_changes(&a, &b), count_changes(&b, &a));
    }
}

// ============================================================================
// Merging
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_merge_with_self_is_identity(value in value_strategy()) {
        prop_assert!(compare(&merge(&value, &value), &value));
    }

    #[test]
    fn prop_merge_is_idempotent(a in value_strategy(), b in value_strategy()) {
        let once = merge(&a, &b);
        let twice = merge(&once, &b);
        prop_assert!(compare(&once, &twice));
    }

    #[test]
    fn prop_merge_keeps_source_keys(
        a in prop::collection::btree_map("[a-d]", leaf_strategy(), 0..4),
        b in prop::collection::btree_map("[a-d]", leaf_strategy(), 0..4),
    ) {
        let merged = merge(&Value::object(a.clone()), &Value::object(b.clone()));
        for (key, value) in &b {
            prop_assert!(compare(merged.get(key).unwrap(), value));
        }
        for (key, value) in &a {
            if !b.contains_key(key) {
                prop_assert!(compare(merged.get(key).unwrap(), value));
            }
        }
    }
}

// ============================================================================
// Cloning and Freezing
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_freeze_preserves_structure(value in value_strategy()) {
        let frozen = freeze(&value);
        prop_assert!(is_deep_frozen(&frozen));
        prop_assert!(compare(&frozen, &value));
    }

    #[test]
    fn prop_clone_of_frozen_is_mutable(value in value_strategy()) {
        let mut copy = deep_clone(&freeze(&value));
        prop_assert!(!copy.is_frozen());
        prop_assert!(compare(&copy, &value));

        if copy.as_object().is_some() {
            prop_assert!(copy.set_field("zz", Value::from(1)).is_ok());
            prop_assert!(!compare(&copy, &value));
        }
    }
}
