use common::{DbError, DbResult};
use expr::{ColumnName, Expr, ParamMarker};
use types::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Select(SelectStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
}

/// Possibly schema-qualified table name, lower-cased.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableName {
    pub schema: Option<String>,
    pub name: String,
}

impl TableName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }
}

/// FROM clause tree. Comma-separated sources are folded into `Join`s.
#[derive(Clone, Debug, PartialEq)]
pub enum TableRef {
    Table {
        name: TableName,
        alias: Option<String>,
    },
    /// Subquery, table function or any other non-table source.
    Derived { alias: Option<String> },
    Join {
        left: Box<TableRef>,
        right: Box<TableRef>,
    },
}

impl TableRef {
    pub fn table(name: impl Into<String>) -> Self {
        TableRef::Table {
            name: TableName::new(name),
            alias: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SelectField {
    /// `*` or `t.*`
    Wildcard { table: Option<String> },
    Expr { expr: Expr, alias: Option<String> },
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expr,
    pub direction: SortDirection,
}

/// `LIMIT count [OFFSET offset]`; either side may be a placeholder.
#[derive(Clone, Debug, PartialEq)]
pub struct Limit {
    pub count: Expr,
    pub offset: Option<Expr>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SelectLock {
    #[default]
    None,
    ForUpdate,
    ForShare,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct SelectStmt {
    pub distinct: bool,
    pub fields: Vec<SelectField>,
    pub from: Option<TableRef>,
    pub selection: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    /// Names of `WINDOW w AS (...)` definitions.
    pub windows: Vec<String>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<Limit>,
    pub lock: SelectLock,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    pub column: ColumnName,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UpdateStmt {
    pub table_refs: TableRef,
    pub assignments: Vec<Assignment>,
    pub selection: Option<Expr>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<Limit>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeleteStmt {
    pub table_refs: TableRef,
    /// `DELETE t1, t2 FROM ...` or `DELETE FROM t USING ...`.
    pub multi_table: bool,
    pub selection: Option<Expr>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<Limit>,
}

impl Statement {
    /// Number of `?` placeholders in the statement.
    fn param_count(&mut self) -> usize {
        let mut count = 0;
        self.visit_params_mut(&mut |p| count = count.max(p.order + 1));
        count
    }

    /// Assign prepared-statement values to the placeholders, by position.
    pub fn bind_params(&mut self, values: &[Value]) -> DbResult<()> {
        let expected = self.param_count();
        if expected != values.len() {
            return Err(DbError::Binding(format!(
                "statement has {expected} placeholders, got {} values",
                values.len()
            )));
        }
        self.visit_params_mut(&mut |p| p.value = values[p.order].clone());
        Ok(())
    }

    fn visit_params_mut(&mut self, f: &mut impl FnMut(&mut ParamMarker)) {
        match self {
            Statement::Select(s) => {
                for field in &mut s.fields {
                    if let SelectField::Expr { expr, .. } = field {
                        expr.visit_params_mut(f);
                    }
                }
                visit_opt(&mut s.selection, f);
                for e in &mut s.group_by {
                    e.visit_params_mut(f);
                }
                visit_opt(&mut s.having, f);
                for o in &mut s.order_by {
                    o.expr.visit_params_mut(f);
                }
                visit_limit(&mut s.limit, f);
            }
            Statement::Update(u) => {
                for a in &mut u.assignments {
                    a.value.visit_params_mut(f);
                }
                visit_opt(&mut u.selection, f);
                for o in &mut u.order_by {
                    o.expr.visit_params_mut(f);
                }
                visit_limit(&mut u.limit, f);
            }
            Statement::Delete(d) => {
                visit_opt(&mut d.selection, f);
                for o in &mut d.order_by {
                    o.expr.visit_params_mut(f);
                }
                visit_limit(&mut d.limit, f);
            }
        }
    }
}

fn visit_opt(expr: &mut Option<Expr>, f: &mut impl FnMut(&mut ParamMarker)) {
    if let Some(expr) = expr {
        expr.visit_params_mut(f);
    }
}

fn visit_limit(limit: &mut Option<Limit>, f: &mut impl FnMut(&mut ParamMarker)) {
    if let Some(limit) = limit {
        limit.count.visit_params_mut(f);
        visit_opt(&mut limit.offset, f);
    }
}
