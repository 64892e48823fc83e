use super::*;
use pretty_assertions::assert_eq;
use types::Value;

fn stmt(sql: &str) -> Statement {
    let sql = sql.trim();
    let mut stmts = parse_sql(sql).expect("parser should succeed");
    assert_eq!(stmts.len(), 1, "expected exactly one statement from {sql}");
    stmts.remove(0)
}

fn select(sql: &str) -> SelectStmt {
    match stmt(sql) {
        Statement::Select(s) => s,
        other => panic!("expected Select, got {other:?}"),
    }
}

fn col(name: &str) -> Expr {
    Expr::column(name)
}

#[test]
fn parse_select_fields_and_aliases() {
    let s = select("SELECT A, b AS Bee, t.* FROM t");
    assert_eq!(
        s.fields,
        vec![
            SelectField::Expr {
                expr: col("a"),
                alias: None,
            },
            SelectField::Expr {
                expr: col("b"),
                alias: Some("Bee".into()),
            },
            SelectField::Wildcard {
                table: Some("t".into()),
            },
        ]
    );
    assert_eq!(s.from, Some(TableRef::table("t")));
    assert_eq!(s.lock, SelectLock::None);
    assert!(s.limit.is_none());
}

#[test]
fn parse_schema_qualified_table_with_alias() {
    let s = select("SELECT * FROM Test.T AS tt WHERE tt.a = 1");
    assert_eq!(
        s.from,
        Some(TableRef::Table {
            name: TableName {
                schema: Some("test".into()),
                name: "t".into(),
            },
            alias: Some("tt".into()),
        })
    );
    assert_eq!(
        s.selection,
        Some(Expr::eq(
            Expr::Column(expr::ColumnName::qualified("tt", "a")),
            Expr::literal(1),
        ))
    );
    assert_eq!(s.fields, vec![SelectField::Wildcard { table: None }]);
}

#[test]
fn comma_joins_fold_into_join_tree() {
    let s = select("SELECT * FROM t1, t2 WHERE t1.a = t2.a");
    assert!(matches!(s.from, Some(TableRef::Join { .. })));

    let s = select("SELECT * FROM t1 JOIN t2 ON t1.a = t2.a");
    assert!(matches!(s.from, Some(TableRef::Join { .. })));

    let s = select("SELECT 1");
    assert_eq!(s.from, None);
}

#[test]
fn parse_limit_offset_and_locking() {
    let s = select("SELECT * FROM t WHERE a = 1 LIMIT 1 OFFSET 0 FOR UPDATE");
    assert_eq!(
        s.limit,
        Some(Limit {
            count: Expr::literal(1),
            offset: Some(Expr::literal(0)),
        })
    );
    assert_eq!(s.lock, SelectLock::ForUpdate);

    let s = select("SELECT * FROM t WHERE a = 1 FOR SHARE");
    assert_eq!(s.lock, SelectLock::ForShare);
}

#[test]
fn parse_group_by_having_order_by() {
    let s = select("SELECT a FROM t WHERE a = 1 GROUP BY a HAVING a > 0 ORDER BY a DESC");
    assert_eq!(s.group_by, vec![col("a")]);
    assert!(s.having.is_some());
    assert_eq!(
        s.order_by,
        vec![OrderByExpr {
            expr: col("a"),
            direction: SortDirection::Desc,
        }]
    );
}

#[test]
fn numeric_literals_keep_their_kind() {
    let s = select(
        "SELECT * FROM t WHERE a = -5 AND b = 18446744073709551615 AND c = 1.5 AND d = 'x'",
    );
    let text = s.selection.expect("WHERE clause").to_string();
    assert_eq!(text, "a = -5 and b = 18446744073709551615 and c = 1.5 and d = 'x'");

    let s = select("SELECT * FROM t WHERE a = -9223372036854775808");
    assert_eq!(
        s.selection,
        Some(Expr::eq(col("a"), Expr::Literal(Value::Int(i64::MIN))))
    );
}

#[test]
fn parse_in_lists_and_row_tuples() {
    let s = select("SELECT * FROM t WHERE a IN (1, 2, ?)");
    match s.selection {
        Some(Expr::InList {
            expr,
            list,
            negated,
        }) => {
            assert_eq!(*expr, col("a"));
            assert_eq!(list.len(), 3);
            assert!(matches!(list[2], Expr::Param(ParamMarker { order: 0, .. })));
            assert!(!negated);
        }
        other => panic!("expected IN list, got {other:?}"),
    }

    let s = select("SELECT * FROM t WHERE (a, b) NOT IN ((1, 2), (3, 4))");
    match s.selection {
        Some(Expr::InList {
            expr,
            list,
            negated,
        }) => {
            assert_eq!(*expr, Expr::Row(vec![col("a"), col("b")]));
            assert_eq!(
                list[1],
                Expr::Row(vec![Expr::literal(3), Expr::literal(4)])
            );
            assert!(negated);
        }
        other => panic!("expected row IN list, got {other:?}"),
    }
}

#[test]
fn unknown_expressions_stay_opaque() {
    let s = select("SELECT * FROM t WHERE abs(a) = 1 AND b IS NULL");
    match s.selection {
        Some(Expr::Binary { left, right, .. }) => {
            assert!(matches!(*left, Expr::Binary { ref left, .. } if matches!(**left, Expr::Opaque(_))));
            assert!(matches!(*right, Expr::Opaque(_)));
        }
        other => panic!("expected AND, got {other:?}"),
    }
}

#[test]
fn parse_update_assignments() {
    match stmt("UPDATE t SET b = b + 1, t.c = 'x' WHERE a = 1") {
        Statement::Update(u) => {
            assert_eq!(u.table_refs, TableRef::table("t"));
            assert_eq!(u.assignments.len(), 2);
            assert_eq!(u.assignments[0].column, expr::ColumnName::new("b"));
            assert_eq!(
                u.assignments[0].value,
                Expr::binary(col("b"), BinaryOp::Plus, Expr::literal(1))
            );
            assert_eq!(
                u.assignments[1].column,
                expr::ColumnName::qualified("t", "c")
            );
            assert!(u.selection.is_some());
        }
        other => panic!("expected Update, got {other:?}"),
    }
}

#[test]
fn parse_delete_single_and_multi_table() {
    match stmt("DELETE FROM t WHERE a = 1") {
        Statement::Delete(d) => {
            assert_eq!(d.table_refs, TableRef::table("t"));
            assert!(!d.multi_table);
            assert!(d.selection.is_some());
        }
        other => panic!("expected Delete, got {other:?}"),
    }

    match stmt("DELETE FROM t1, t2 WHERE t1.a = t2.a") {
        Statement::Delete(d) => assert!(d.multi_table),
        other => panic!("expected Delete, got {other:?}"),
    }
}

#[test]
fn placeholders_bind_by_position() {
    let mut s = stmt("SELECT * FROM t WHERE a = ? AND b = ? LIMIT ?");
    s.bind_params(&[Value::Int(7), Value::Text("x".into()), Value::Int(1)])
        .expect("binding succeeds");

    let Statement::Select(select) = s else {
        panic!("expected Select");
    };
    let mut bound = Vec::new();
    let mut selection = select.selection.clone().expect("WHERE clause");
    selection.visit_params_mut(&mut |p| bound.push((p.order, p.value.clone())));
    assert_eq!(
        bound,
        vec![(0, Value::Int(7)), (1, Value::Text("x".into()))]
    );
    assert!(matches!(
        select.limit.map(|l| l.count),
        Some(Expr::Param(ParamMarker { order: 2, value: Value::Int(1) }))
    ));
}

#[test]
fn binding_rejects_arity_mismatch() {
    let mut s = stmt("SELECT * FROM t WHERE a = ?");
    let err = s.bind_params(&[]).expect_err("one value required");
    assert!(format!("{err}").contains("1 placeholders"));
}

#[test]
fn unsupported_statements_report_errors() {
    let err = parse_sql("INSERT INTO t VALUES (1)").expect_err("insert is not mapped");
    assert!(format!("{err}").contains("unsupported statement"));

    let err = parse_sql("SELECT * FROM t UNION SELECT * FROM u").expect_err("set ops");
    assert!(format!("{err}").contains("SET operations"));
}

#[test]
fn offset_without_limit_is_rejected() {
    let err = parse_sql("SELECT * FROM t WHERE a = 1 OFFSET 2").expect_err("needs LIMIT");
    assert!(format!("{err:?}").contains("OFFSET requires LIMIT"));

    let s = select("SELECT * FROM t LIMIT 2, 1");
    assert_eq!(
        s.limit,
        Some(Limit {
            count: Expr::literal(1),
            offset: Some(Expr::literal(2)),
        })
    );
}
