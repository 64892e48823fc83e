//! Integration tests demonstrating testsupport usage.

use catalog::{Catalog, SchemaState};
use planner::{Privilege, PrivilegeChecker};
use pretty_assertions::assert_eq;
use testsupport::prelude::*;
use types::{SqlType, Value};

#[test]
fn fixture_catalog_registers_every_table() {
    let catalog = point_catalog();
    let names: Vec<String> = catalog
        .tables()
        .map(|t| format!("{}.{}", t.db, t.name))
        .collect();
    assert_eq!(
        names,
        [
            "test.t", "test.u", "test.small", "test.s", "test.nk", "test.t2", "test.pre",
            "test.g", "test.p", "test.w", "other.t",
        ]
    );
    let s = catalog.table(TEST_DB, "s").unwrap();
    assert_eq!(s.indexes[0].name, catalog::PRIMARY_INDEX_NAME);
}

#[test]
fn fixture_json_rebuilds_the_same_catalog() {
    let rebuilt = Catalog::from_definitions(&point_catalog_json()).unwrap();
    let original = point_catalog();
    for table in original.tables() {
        let copy = rebuilt.table(&table.db, &table.name).unwrap();
        assert_eq!(copy.columns, table.columns);
        assert_eq!(copy.indexes, table.indexes);
        assert_eq!(copy.pk_is_handle, table.pk_is_handle);
    }
}

#[test]
fn table_def_macro_marks_primary_key_columns() {
    let def = table_def!("db", "k", ["x" => SqlType::Int, "y" => SqlType::Int], pk: ["y"]);
    let flags: Vec<bool> = def.columns.iter().map(|c| c.primary_key).collect();
    assert_eq!(flags, [false, true]);

    let def = table_def!("db", "k", ["x" => SqlType::Int]);
    assert!(!def.columns[0].primary_key);
}

#[test]
fn harness_plans_and_falls_back() {
    let harness = PlanHarness::new();
    let plan = expect_plan(harness.plan("SELECT * FROM t WHERE id = 7"), "handle");
    assert_handle_lookup(&plan, 7);
    assert_fallback(&harness.plan("SELECT * FROM t WHERE c = 7"));
}

#[test]
fn harness_binds_parameters() {
    let harness = PlanHarness::new();
    let plan = harness
        .plan_with(
            "SELECT * FROM t WHERE a = ? AND b = ?",
            &[Value::Int(1), Value::Text("x".into())],
        )
        .unwrap();
    assert_index_lookup(&plan, "a_b", &[Value::Int(1), Value::Text("x".into())]);
}

#[test]
fn harness_session_can_change_between_statements() {
    let mut harness = PlanHarness::new();
    let sql = "SELECT * FROM t WHERE id = 1 FOR UPDATE";
    assert_lock(&harness.plan(sql).unwrap(), false, false);

    harness.session_mut().in_txn = true;
    assert_lock(&harness.plan(sql).unwrap(), true, true);
}

#[test]
fn harness_catalog_can_be_edited_in_place() {
    let mut harness = PlanHarness::new();
    let sql = "SELECT * FROM t WHERE a = 1 AND b = 'x'";
    assert!(harness.plan(sql).is_some());

    harness
        .catalog_mut()
        .table_mut(TEST_DB, "t")
        .unwrap()
        .index_mut("a_b")
        .unwrap()
        .state = SchemaState::WriteOnly;
    assert_fallback(&harness.plan(sql));
    assert!(!harness.catalog().table(TEST_DB, "t").unwrap().index("a_b").unwrap().is_public());
}

#[test]
fn recording_privileges_log_every_request() {
    let harness = PlanHarness::new().privileges(RecordingPrivileges::allow_all());
    assert!(harness.plan("SELECT * FROM t WHERE id = 1").is_some());

    let checker = RecordingPrivileges::allow_all().deny("T", Privilege::Select);
    assert!(!checker.request_verification(&[], TEST_DB, "t", Privilege::Select));
    assert!(checker.request_verification(&[], TEST_DB, "t", Privilege::Update));
    assert_eq!(
        checker.requested_privileges(),
        [Privilege::Select, Privilege::Update]
    );
}

#[test]
fn deny_all_blocks_the_fast_path() {
    let harness = PlanHarness::new().privileges(DenyAll);
    assert_fallback(&harness.plan("SELECT * FROM t WHERE id = 1"));
}

#[test]
fn explain_script_captures_each_statement() {
    let output = explain_script(
        &PlanHarness::new(),
        r#"
        SELECT * FROM t WHERE id = 1;
        SELECT * FROM t WHERE id IN (1, 2);
        SELECT * FROM t WHERE a > 1;
        SELEC 1;
    "#,
    );
    let mut sections = output.split("\n> ");
    assert_eq!(
        sections.next().unwrap(),
        "> SELECT * FROM t WHERE id = 1\nPoint_Get_1 | 1.00 | root | table:t, handle:1"
    );
    assert_eq!(
        sections.next().unwrap(),
        "SELECT * FROM t WHERE id IN (1, 2)\n\
         Union_3 | 2.00 | root\n\
         ├─Point_Get_1 | 1.00 | root | table:t, handle:1\n\
         └─Point_Get_2 | 1.00 | root | table:t, handle:2"
    );
    assert_eq!(
        sections.next().unwrap(),
        format!("SELECT * FROM t WHERE a > 1\n{FALLBACK}")
    );
    assert!(sections.next().unwrap().contains("Error: parse:"));
}
