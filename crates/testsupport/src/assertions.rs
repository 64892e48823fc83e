//! Assertion helpers for fast-path plans.
//!
//! Each helper panics with the plan's explain line so a failing test shows
//! what was built instead.

use planner::{FastPlan, PointAccess, PointGetPlan};
use types::Value;

fn describe(plan: &FastPlan) -> String {
    let physical = plan.as_physical();
    format!("{} [{}]", physical.type_name(), physical.explain_info())
}

/// The point get a plan reads through, panicking for a batch.
pub fn lookup_of(plan: &FastPlan) -> &PointGetPlan {
    plan.lookup()
        .unwrap_or_else(|| panic!("expected a single lookup, got {}", describe(plan)))
}

/// Assert that the statement fell back to the general optimizer.
///
/// # Example
///
/// ```
/// use testsupport::prelude::*;
///
/// let harness = PlanHarness::new();
/// assert_fallback(&harness.plan("SELECT * FROM t WHERE a = 1"));
/// ```
pub fn assert_fallback(plan: &Option<FastPlan>) {
    if let Some(plan) = plan {
        panic!("expected fallback, got {}", describe(plan));
    }
}

/// Unwrap a fast plan, panicking with `sql` when there is none.
pub fn expect_plan(plan: Option<FastPlan>, sql: &str) -> FastPlan {
    plan.unwrap_or_else(|| panic!("expected a fast plan for {sql:?}"))
}

/// Assert a handle lookup on `value` (signed view).
pub fn assert_handle_lookup(plan: &FastPlan, value: i64) {
    match lookup_of(plan).access() {
        PointAccess::Handle { value: got, .. } => assert_eq!(*got, value, "handle value"),
        _ => panic!("expected a handle lookup, got {}", describe(plan)),
    }
}

/// Assert a lookup through `index` with `values` in index column order.
pub fn assert_index_lookup(plan: &FastPlan, index: &str, values: &[Value]) {
    match lookup_of(plan).access() {
        PointAccess::Index {
            index: meta,
            values: got,
            ..
        } => {
            assert_eq!(meta.name, index, "index name");
            assert_eq!(got.as_slice(), values, "index values");
        }
        _ => panic!("expected an index lookup, got {}", describe(plan)),
    }
}

/// Assert the plan is a point get that provably returns nothing.
pub fn assert_empty_result(plan: &FastPlan) {
    let lookup = lookup_of(plan);
    assert!(
        lookup.is_empty_result(),
        "expected an empty result, got {}",
        describe(plan)
    );
    assert_eq!(plan.as_physical().stats_count(), 0.0);
}

/// Assert the lock flags on the plan's lookup.
pub fn assert_lock(plan: &FastPlan, lock: bool, for_update: bool) {
    let lookup = lookup_of(plan);
    assert_eq!(
        (lookup.lock(), lookup.for_update()),
        (lock, for_update),
        "lock flags of {}",
        describe(plan)
    );
}
