//! Property-based test generators using proptest.
//!
//! Strategies for the values and column types that reach the handle
//! reconciliation and the IN-list expansion.

use proptest::prelude::*;
use types::{FieldType, SqlType, Value};

/// Strategy for generating random `Value` instances.
///
/// Generates a mix of every variant, NULL included.
pub fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::Int),
        any::<u64>().prop_map(Value::UInt),
        (-1.0e20f64..1.0e20).prop_map(Value::Float),
        "[a-z0-9]{0,12}".prop_map(Value::Text),
        any::<bool>().prop_map(Value::Bool),
        Just(Value::Null),
    ]
}

/// Non-NULL constants a key comparison may carry.
pub fn arb_key_value() -> impl Strategy<Value = Value> {
    arb_value().prop_filter("NULL never matches a key", |v| !v.is_null())
}

/// Integer column types, signed or unsigned.
///
/// # Example
///
/// ```
/// use proptest::prelude::*;
/// use testsupport::proptest_generators::arb_integer_type;
///
/// proptest! {
///     #[test]
///     fn integer_types_are_integers(ft in arb_integer_type()) {
///         prop_assert!(ft.tp.is_integer());
///     }
/// }
/// ```
pub fn arb_integer_type() -> impl Strategy<Value = FieldType> {
    let tp = prop_oneof![
        Just(SqlType::TinyInt),
        Just(SqlType::SmallInt),
        Just(SqlType::MediumInt),
        Just(SqlType::Int),
        Just(SqlType::BigInt),
    ];
    (tp, any::<bool>()).prop_map(|(tp, unsigned)| FieldType {
        tp,
        unsigned,
        flen: None,
    })
}

/// Distinct handle values for an IN list, 1 to `max` entries.
pub fn arb_in_list(max: usize) -> impl Strategy<Value = Vec<i64>> {
    prop::collection::btree_set(any::<i64>(), 1..=max).prop_map(|set| set.into_iter().collect())
}

/// A random permutation of `items`.
pub fn arb_shuffled<T: Clone + std::fmt::Debug>(items: Vec<T>) -> impl Strategy<Value = Vec<T>> {
    Just(items).prop_shuffle()
}
