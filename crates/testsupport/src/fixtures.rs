//! Catalog fixtures and statement helpers shared by the planner tests.
//!
//! [`point_catalog`] registers one table per situation the fast path has to
//! tell apart: an integer handle, an unsigned handle, a composite unique key,
//! a non-integer primary key, and the tables it must refuse outright.

use catalog::{
    Catalog, ColumnDef, IndexDef, PartitionInfo, PartitionKind, SchemaState, TableDef,
};
use parser::{Statement, parse_sql};
use planner::SessionContext;
use types::{FieldType, SqlType, Value};

use crate::table_def;

/// Database every fixture table lives in unless stated otherwise.
pub const TEST_DB: &str = "test";

/// Second database, holding a table that shadows `test.t`.
pub const OTHER_DB: &str = "other";

/// Catalog with every fixture table registered.
///
/// | table    | shape                                                                |
/// |----------|----------------------------------------------------------------------|
/// | `t`      | `id BIGINT` handle, `a INT`, `b VARCHAR(32)`, `c INT`; unique `a_b(a, b)`, plain `c_idx(c)` |
/// | `u`      | `id BIGINT UNSIGNED` handle, `v INT`                                 |
/// | `small`  | `id TINYINT` handle, `v INT`                                         |
/// | `s`      | `code VARCHAR(16)` primary key (no handle), `name`, `k INT`          |
/// | `nk`     | `a INT`, `b INT`; only a non-unique index                            |
/// | `t2`     | `k1`, `k2`; unique `k_pending(k1)` still delete-only, unique `k_live(k1, k2)` |
/// | `pre`    | `a VARCHAR(64)`, `b INT`; unique `a_prefix(a(10))`, unique `b_uk(b)` |
/// | `g`      | handle table with a generated column                                 |
/// | `p`      | hash-partitioned handle table                                        |
/// | `w`      | handle table with a write-only column                                |
/// | `other.t`| `id BIGINT` handle, `x INT`                                          |
///
/// # Example
///
/// ```
/// use testsupport::prelude::*;
///
/// let catalog = point_catalog();
/// assert!(catalog.table(TEST_DB, "t").unwrap().pk_is_handle);
/// assert!(!catalog.table(TEST_DB, "s").unwrap().pk_is_handle);
/// ```
pub fn point_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    for def in point_table_defs() {
        catalog
            .create_table(def)
            .expect("fixture table definitions are valid");
    }
    catalog
}

/// The definitions behind [`point_catalog`], in registration order.
pub fn point_table_defs() -> Vec<TableDef> {
    vec![
        table_def!(TEST_DB, "t", [
            "id" => SqlType::BigInt,
            "a" => SqlType::Int,
            "b" => FieldType::new(SqlType::Varchar).with_len(32),
            "c" => SqlType::Int,
        ], pk: ["id"])
        .index(IndexDef::unique("a_b", &["a", "b"]))
        .index(IndexDef::non_unique("c_idx", &["c"])),
        table_def!(TEST_DB, "u", [
            "id" => FieldType::unsigned(SqlType::BigInt),
            "v" => SqlType::Int,
        ], pk: ["id"]),
        table_def!(TEST_DB, "small", [
            "id" => SqlType::TinyInt,
            "v" => SqlType::Int,
        ], pk: ["id"]),
        table_def!(TEST_DB, "s", [
            "code" => FieldType::new(SqlType::Varchar).with_len(16),
            "name" => FieldType::new(SqlType::Varchar).with_len(64),
            "k" => SqlType::Int,
        ], pk: ["code"]),
        table_def!(TEST_DB, "nk", ["a" => SqlType::Int, "b" => SqlType::Int])
            .index(IndexDef::non_unique("a_idx", &["a"])),
        table_def!(TEST_DB, "t2", ["k1" => SqlType::Int, "k2" => SqlType::Int])
            .index(IndexDef {
                state: SchemaState::DeleteOnly,
                ..IndexDef::unique("k_pending", &["k1"])
            })
            .index(IndexDef::unique("k_live", &["k1", "k2"])),
        table_def!(TEST_DB, "pre", [
            "a" => FieldType::new(SqlType::Varchar).with_len(64),
            "b" => SqlType::Int,
        ])
        .index(IndexDef::unique("a_prefix", &["a"]).prefix("a", 10))
        .index(IndexDef::unique("b_uk", &["b"])),
        table_def!(TEST_DB, "g", ["id" => SqlType::BigInt, "a" => SqlType::Int], pk: ["id"])
            .column(
                ColumnDef::builder()
                    .name("a_plus_one")
                    .ft(SqlType::BigInt)
                    .generated("a + 1")
                    .build(),
            ),
        table_def!(TEST_DB, "p", ["id" => SqlType::BigInt, "v" => SqlType::Int], pk: ["id"])
            .partition(PartitionInfo {
                kind: PartitionKind::Hash,
                expr: "id".into(),
                partitions: 4,
            }),
        table_def!(TEST_DB, "w", ["id" => SqlType::BigInt, "v" => SqlType::Int], pk: ["id"])
            .column(
                ColumnDef::builder()
                    .name("added")
                    .ft(SqlType::Int)
                    .state(SchemaState::WriteOnly)
                    .build(),
            ),
        table_def!(OTHER_DB, "t", ["id" => SqlType::BigInt, "x" => SqlType::Int], pk: ["id"]),
    ]
}

/// [`point_table_defs`] as the JSON accepted by `Catalog::from_definitions`.
pub fn point_catalog_json() -> String {
    serde_json::to_string_pretty(&point_table_defs()).expect("fixture definitions serialize")
}

/// Autocommit session in [`TEST_DB`] with no explicit transaction.
pub fn autocommit_session() -> SessionContext {
    SessionContext::builder().current_db(TEST_DB).build()
}

/// Session inside an explicit pessimistic transaction.
pub fn pessimistic_session() -> SessionContext {
    SessionContext::builder()
        .current_db(TEST_DB)
        .in_txn(true)
        .pessimistic(true)
        .build()
}

/// Parse exactly one statement, panicking on anything else.
///
/// # Example
///
/// ```
/// use parser::Statement;
/// use testsupport::prelude::*;
///
/// let stmt = parse_one("SELECT * FROM t WHERE id = 1");
/// assert!(matches!(stmt, Statement::Select(_)));
/// ```
pub fn parse_one(sql: &str) -> Statement {
    let mut statements = parse_sql(sql).unwrap_or_else(|e| panic!("failed to parse {sql:?}: {e}"));
    assert_eq!(statements.len(), 1, "expected a single statement in {sql:?}");
    statements.remove(0)
}

/// Parse one statement and bind prepared-statement values to its `?` markers.
pub fn parse_bound(sql: &str, params: &[Value]) -> Statement {
    let mut stmt = parse_one(sql);
    stmt.bind_params(params)
        .unwrap_or_else(|e| panic!("failed to bind {params:?} to {sql:?}: {e}"));
    stmt
}
