//! End-to-end fast-path planning through the test harness.

use catalog::Catalog;
use std::cmp::Ordering;

use planner::{
    FastPlan, PlanContext, PointAccess, Privilege, SessionContext, reconcile_handle, try_fast_plan,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use testsupport::prelude::*;
use testsupport::proptest_generators::{
    arb_in_list, arb_integer_type, arb_key_value, arb_shuffled,
};
use types::{FieldType, SqlType, Value};

fn harness_with(privileges: RecordingPrivileges) -> PlanHarness {
    PlanHarness::new().privileges(privileges)
}

#[test]
fn select_asks_for_select_privilege_on_the_resolved_table() {
    let checker = RecordingPrivileges::allow_all();
    let session = SessionContext::builder()
        .current_db(TEST_DB)
        .active_roles(vec!["analyst".into()])
        .build();
    let catalog = point_catalog();
    let ctx = PlanContext::new(&catalog, &session).with_privileges(&checker);
    try_fast_plan(&ctx, &parse_one("SELECT * FROM other.t WHERE id = 1")).unwrap();
    assert_eq!(
        checker.requests(),
        vec![PrivilegeRequest {
            roles: vec!["analyst".into()],
            db: OTHER_DB.into(),
            table: "t".into(),
            privilege: Privilege::Select,
        }]
    );
}

fn requested(sql: &str) -> Vec<Privilege> {
    let checker = RecordingPrivileges::allow_all();
    let catalog = point_catalog();
    let session = pessimistic_session();
    let ctx = PlanContext::new(&catalog, &session).with_privileges(&checker);
    let _ = try_fast_plan(&ctx, &parse_one(sql));
    checker.requested_privileges()
}

#[test]
fn mutations_ask_for_select_and_their_own_privilege() {
    assert_eq!(
        requested("UPDATE t SET a = 1 WHERE id = 1"),
        vec![Privilege::Select, Privilege::Update]
    );
    assert_eq!(
        requested("DELETE FROM t WHERE id = 1"),
        vec![Privilege::Select, Privilege::Delete]
    );
    assert_eq!(
        requested("SELECT * FROM t WHERE id IN (1, 2)"),
        vec![Privilege::Select, Privilege::Select]
    );
}

#[test]
fn ineligible_statements_never_reach_the_checker() {
    assert!(requested("SELECT * FROM t WHERE a > 1").is_empty());
    assert!(requested("SELECT * FROM p WHERE id = 1").is_empty());
}

#[test]
fn denied_privilege_falls_back() {
    let harness = harness_with(RecordingPrivileges::allow_all().deny("t", Privilege::Update));
    assert_fallback(&harness.plan("UPDATE t SET a = 1 WHERE id = 1"));
    assert!(harness.plan("DELETE FROM t WHERE id = 1").is_some());
    assert!(harness.plan("SELECT * FROM t WHERE id = 1").is_some());

    let harness = harness_with(RecordingPrivileges::allow_all().deny("t", Privilege::Select));
    assert_fallback(&harness.plan("SELECT * FROM t WHERE id = 1"));
    assert_fallback(&harness.plan("SELECT * FROM t WHERE id = 1.5"));
    assert_fallback(&harness.plan("SELECT * FROM t WHERE id IN (1, 2)"));
    assert_fallback(&harness.plan("DELETE FROM t WHERE id = 1"));
    assert!(harness.plan("SELECT * FROM u WHERE id = 1").is_some());
}

#[test]
fn pessimistic_mutations_lock_their_lookup() {
    let harness = PlanHarness::new().session(pessimistic_session());
    let update = harness.plan("UPDATE t SET a = 1 WHERE id = 1").unwrap();
    assert!(matches!(update, FastPlan::Update(_)));
    assert_lock(&update, true, false);

    let delete = harness.plan("DELETE FROM s WHERE code = 'x'").unwrap();
    assert_lock(&delete, true, false);

    let select = harness.plan("SELECT * FROM t WHERE id = 1 FOR UPDATE").unwrap();
    assert_lock(&select, true, true);

    let optimistic = PlanHarness::new().session(
        SessionContext::builder()
            .current_db(TEST_DB)
            .in_txn(true)
            .build(),
    );
    assert_lock(
        &optimistic.plan("UPDATE t SET a = 1 WHERE id = 1").unwrap(),
        false,
        false,
    );
}

#[test]
fn empty_results_survive_every_adapter() {
    let harness = PlanHarness::new().session(pessimistic_session());
    for sql in [
        "SELECT * FROM t WHERE id = 1.5 FOR UPDATE",
        "UPDATE t SET a = 1 WHERE id = 1.5",
        "DELETE FROM u WHERE id = -3",
    ] {
        let plan = expect_plan(harness.plan(sql), sql);
        assert_empty_result(&plan);
        assert_lock(&plan, false, false);
    }
}

#[test]
fn prepared_lookup_rebinds_between_executions() {
    let harness = PlanHarness::new();
    let mut plan = harness
        .plan_with("SELECT * FROM u WHERE id = ?", &[Value::Int(1)])
        .unwrap();
    assert_handle_lookup(&plan, 1);
    plan.rebind(&[Value::UInt(u64::MAX)]).unwrap();
    assert_eq!(
        plan.as_physical().explain_info(),
        "table:u, handle:18446744073709551615"
    );
}

#[test]
fn explain_script_snapshot() {
    let harness = PlanHarness::new().session(pessimistic_session());
    let output = explain_script(
        &harness,
        r#"
        SELECT * FROM t WHERE id = 1 FOR UPDATE;
        SELECT a, b FROM t WHERE b = 'x' AND a = 1;
        SELECT * FROM u WHERE id = 18446744073709551615;
        SELECT * FROM t WHERE id = 1.5;
        SELECT * FROM t WHERE (a, b) IN ((1, 'x'), (2, 'y'));
        UPDATE s SET k = 2 WHERE code = 'x';
        DELETE FROM t WHERE id = 9;
        SELECT * FROM t WHERE id = 1 LIMIT 1 OFFSET 1;
    "#,
    );
    insta::assert_snapshot!(output, @r"
    > SELECT * FROM t WHERE id = 1 FOR UPDATE
    Point_Get_1 | 1.00 | root | table:t, handle:1, lock
    > SELECT a, b FROM t WHERE b = 'x' AND a = 1
    Point_Get_1 | 1.00 | root | table:t, index:a b
    > SELECT * FROM u WHERE id = 18446744073709551615
    Point_Get_1 | 1.00 | root | table:u, handle:18446744073709551615
    > SELECT * FROM t WHERE id = 1.5
    Point_Get_1 | 0.00 | root | table:t, dual
    > SELECT * FROM t WHERE (a, b) IN ((1, 'x'), (2, 'y'))
    Union_3 | 2.00 | root
    ├─Point_Get_1 | 1.00 | root | table:t, index:a b
    └─Point_Get_2 | 1.00 | root | table:t, index:a b
    > UPDATE s SET k = 2 WHERE code = 'x'
    Update_2 | 1.00 | root
    └─Point_Get_1 | 1.00 | root | table:s, index:code, lock
    > DELETE FROM t WHERE id = 9
    Delete_2 | 1.00 | root
    └─Point_Get_1 | 1.00 | root | table:t, handle:9, lock
    > SELECT * FROM t WHERE id = 1 LIMIT 1 OFFSET 1
    fallback: general optimizer
    ");
}

/// Whether `v` fits the integer column type `ft`.
fn fits(ft: &FieldType, v: i64) -> bool {
    let v = v as i128;
    let bits = match ft.tp {
        SqlType::TinyInt => 8,
        SqlType::SmallInt => 16,
        SqlType::MediumInt => 24,
        SqlType::Int => 32,
        _ => 64,
    };
    if ft.unsigned {
        (0..(1i128 << bits)).contains(&v)
    } else {
        (-(1i128 << (bits - 1))..(1i128 << (bits - 1))).contains(&v)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn any_bigint_literal_is_a_handle(v in any::<i64>()) {
        let harness = PlanHarness::new();
        let plan = harness.plan(&format!("SELECT * FROM t WHERE id = {v}")).unwrap();
        prop_assert_eq!(plan.as_physical().explain_info(), format!("table:t, handle:{v}"));
    }

    #[test]
    fn any_unsigned_literal_prints_unsigned(v in any::<u64>()) {
        let harness = PlanHarness::new();
        let plan = harness.plan(&format!("SELECT * FROM u WHERE id = {v}")).unwrap();
        prop_assert_eq!(plan.as_physical().explain_info(), format!("table:u, handle:{v}"));
    }

    #[test]
    fn out_of_range_handles_are_empty(ft in arb_integer_type(), v in any::<i64>()) {
        let mut catalog = Catalog::new();
        catalog
            .create_table(table_def!(TEST_DB, "k", ["id" => ft.clone(), "v" => SqlType::Int], pk: ["id"]))
            .unwrap();
        let harness = PlanHarness::with_catalog(catalog);
        let plan = harness.plan(&format!("SELECT v FROM k WHERE id = {v}")).unwrap();
        let physical = plan.as_physical();
        if fits(&ft, v) {
            prop_assert_eq!(physical.stats_count(), 1.0);
        } else {
            prop_assert_eq!(physical.explain_info(), "table:k, dual");
            prop_assert_eq!(physical.stats_count(), 0.0);
        }
    }

    #[test]
    fn in_list_yields_one_point_get_per_value(values in arb_in_list(8)) {
        let list = values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
        let harness = PlanHarness::new();
        let plan = harness.plan(&format!("SELECT a FROM t WHERE id IN ({list})")).unwrap();
        let physical = plan.as_physical();
        prop_assert_eq!(physical.type_name(), "Union");
        prop_assert_eq!(physical.children().len(), values.len());
        prop_assert_eq!(physical.stats_count(), values.len() as f64);
        prop_assert_eq!(physical.schema().len(), 1);
    }

    #[test]
    fn conjunct_order_does_not_change_the_index_lookup(
        conjuncts in arb_shuffled(vec!["k1 = 1", "k2 = 2"]),
    ) {
        let harness = PlanHarness::new();
        let sql = format!("SELECT * FROM t2 WHERE {}", conjuncts.join(" AND "));
        let plan = harness.plan(&sql).unwrap();
        assert_index_lookup(&plan, "k_live", &[Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn reconciled_handles_compare_equal_to_the_constant(v in arb_key_value()) {
        let bigint = FieldType::new(SqlType::BigInt);
        match reconcile_handle(&v, &bigint, Some(0)) {
            Some(PointAccess::Handle { value, unsigned, param }) => {
                prop_assert!(!unsigned);
                prop_assert_eq!(param, Some(0));
                prop_assert_eq!(Value::Int(value).compare(&v), Some(Ordering::Equal));
            }
            Some(PointAccess::Empty { param }) => prop_assert_eq!(param, Some(0)),
            other => prop_assert!(false, "unexpected access {:?} for {:?}", other, v),
        }
    }

    #[test]
    fn extra_conjuncts_always_fall_back(extra in 0i64..100) {
        let harness = PlanHarness::new();
        assert_fallback(&harness.plan(&format!("SELECT * FROM t WHERE id = 1 AND c = {extra}")));
    }
}
