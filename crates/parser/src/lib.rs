//! SQL front-end: maps `sqlparser`'s MySQL-dialect AST onto the closed
//! statement and expression types the fast-path planner matches over.
//!
//! Only SELECT, UPDATE and DELETE are mapped. Expressions the planner never
//! needs to look inside (function calls, subqueries, CASE, ...) are kept as
//! [`Expr::Opaque`] so that a statement containing them still parses and
//! simply falls through to the general optimizer.

mod ast;
#[cfg(test)]
mod tests;

pub use ast::*;

use common::{DbError, DbResult};
use expr::{BinaryOp, ColumnName, Expr, ParamMarker, UnaryOp};
use sqlparser::ast as sqlast;
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser as SqlParser;
use types::Value;

/// Parse SQL text into the internal AST statements.
pub fn parse_sql(sql: &str) -> DbResult<Vec<Statement>> {
    let dialect = MySqlDialect {};
    let stmts = SqlParser::parse_sql(&dialect, sql)
        .map_err(|e| DbError::Parser(format!("SQL parse error: {e}")))?;

    stmts
        .into_iter()
        .map(|stmt| Mapper::default().statement(stmt))
        .collect()
}

/// Per-statement mapping state; placeholders are numbered in order of appearance.
#[derive(Default)]
struct Mapper {
    next_param: usize,
}

impl Mapper {
    fn statement(&mut self, stmt: sqlast::Statement) -> DbResult<Statement> {
        use sqlast::Statement as SqlStatement;

        match stmt {
            SqlStatement::Query(query) => self.query(*query).map(Statement::Select),
            SqlStatement::Update {
                table,
                assignments,
                from,
                selection,
                ..
            } => {
                let mut table_refs = table_ref_from_with_joins(table)?;
                if let Some(from) = from {
                    table_refs = TableRef::Join {
                        left: Box::new(table_refs),
                        right: Box::new(table_ref_from_with_joins(from)?),
                    };
                }
                let assignments = assignments
                    .into_iter()
                    .map(|assign| {
                        let column = column_name(&assign.id).ok_or_else(|| {
                            DbError::Parser("invalid assignment target".into())
                        })?;
                        Ok(Assignment {
                            column,
                            value: self.expr(assign.value)?,
                        })
                    })
                    .collect::<DbResult<Vec<_>>>()?;
                let selection = selection.map(|e| self.expr(e)).transpose()?;
                Ok(Statement::Update(UpdateStmt {
                    table_refs,
                    assignments,
                    selection,
                    order_by: Vec::new(),
                    limit: None,
                }))
            }
            SqlStatement::Delete {
                tables,
                from,
                using,
                selection,
                order_by,
                limit,
                ..
            } => {
                let multi_table = !tables.is_empty() || using.is_some() || from.len() > 1;
                let table_refs = fold_table_refs(from)?
                    .ok_or_else(|| DbError::Parser("DELETE requires FROM source".into()))?;
                let selection = selection.map(|e| self.expr(e)).transpose()?;
                let order_by = self.order_by(order_by)?;
                let limit = limit
                    .map(|count| {
                        Ok::<_, DbError>(Limit {
                            count: self.expr(count)?,
                            offset: None,
                        })
                    })
                    .transpose()?;
                Ok(Statement::Delete(DeleteStmt {
                    table_refs,
                    multi_table,
                    selection,
                    order_by,
                    limit,
                }))
            }
            _ => Err(DbError::Parser("unsupported statement".into())),
        }
    }

    fn query(&mut self, query: sqlast::Query) -> DbResult<SelectStmt> {
        use sqlast::SetExpr;

        let sqlast::Query {
            with,
            body,
            order_by,
            limit,
            offset,
            locks,
            ..
        } = query;

        if with.is_some() {
            return Err(DbError::Parser("WITH clauses not supported".into()));
        }
        let select = match *body {
            SetExpr::Select(select) => select,
            SetExpr::Values(_) => {
                return Err(DbError::Parser("standalone VALUES not supported".into()));
            }
            _ => return Err(DbError::Parser("SET operations not supported".into())),
        };

        let sqlast::Select {
            distinct,
            projection,
            from,
            selection,
            group_by,
            having,
            named_window,
            ..
        } = *select;

        let fields = projection
            .into_iter()
            .map(|item| self.select_item(item))
            .collect::<DbResult<Vec<_>>>()?;
        let from = fold_table_refs(from)?;
        let selection = selection.map(|e| self.expr(e)).transpose()?;
        let group_by = match group_by {
            sqlast::GroupByExpr::Expressions(exprs) => exprs
                .into_iter()
                .map(|e| self.expr(e))
                .collect::<DbResult<Vec<_>>>()?,
            sqlast::GroupByExpr::All => vec![Expr::Opaque("ALL".into())],
        };
        let having = having.map(|e| self.expr(e)).transpose()?;
        let windows = named_window
            .into_iter()
            .map(|w| normalize_ident(&w.0))
            .collect();
        let order_by = self.order_by(order_by)?;
        let limit = match (limit, offset) {
            (Some(count), offset) => Some(Limit {
                count: self.expr(count)?,
                offset: offset.map(|o| self.expr(o.value)).transpose()?,
            }),
            (None, Some(_)) => {
                return Err(DbError::Parser("OFFSET requires LIMIT".into()));
            }
            (None, None) => None,
        };
        let lock = match locks.first().map(|l| &l.lock_type) {
            Some(sqlast::LockType::Update) => SelectLock::ForUpdate,
            Some(sqlast::LockType::Share) => SelectLock::ForShare,
            None => SelectLock::None,
        };

        Ok(SelectStmt {
            distinct: distinct.is_some(),
            fields,
            from,
            selection,
            group_by,
            having,
            windows,
            order_by,
            limit,
            lock,
        })
    }

    fn order_by(&mut self, items: Vec<sqlast::OrderByExpr>) -> DbResult<Vec<OrderByExpr>> {
        items
            .into_iter()
            .map(|item| {
                let direction = match item.asc {
                    Some(false) => SortDirection::Desc,
                    _ => SortDirection::Asc,
                };
                Ok(OrderByExpr {
                    expr: self.expr(item.expr)?,
                    direction,
                })
            })
            .collect()
    }

    fn select_item(&mut self, item: sqlast::SelectItem) -> DbResult<SelectField> {
        match item {
            sqlast::SelectItem::Wildcard(options) => {
                ensure_plain_wildcard(&options)?;
                Ok(SelectField::Wildcard { table: None })
            }
            sqlast::SelectItem::QualifiedWildcard(name, options) => {
                ensure_plain_wildcard(&options)?;
                let table = name
                    .0
                    .last()
                    .map(normalize_ident)
                    .ok_or_else(|| DbError::Parser("invalid wildcard qualifier".into()))?;
                Ok(SelectField::Wildcard { table: Some(table) })
            }
            sqlast::SelectItem::UnnamedExpr(expr) => Ok(SelectField::Expr {
                expr: self.expr(expr)?,
                alias: None,
            }),
            sqlast::SelectItem::ExprWithAlias { expr, alias } => Ok(SelectField::Expr {
                expr: self.expr(expr)?,
                alias: Some(alias.value),
            }),
        }
    }

    fn expr(&mut self, expr: sqlast::Expr) -> DbResult<Expr> {
        use sqlast::Expr as SqlExpr;

        match expr {
            SqlExpr::Identifier(ident) => Ok(Expr::Column(ColumnName::new(normalize_ident(
                &ident,
            )))),
            SqlExpr::CompoundIdentifier(idents) => match column_name(&idents) {
                Some(column) => Ok(Expr::Column(column)),
                None => Ok(Expr::Opaque(SqlExpr::CompoundIdentifier(idents).to_string())),
            },
            SqlExpr::Value(value) => self.value(value),
            SqlExpr::BinaryOp { left, op, right } => match map_binary_op(&op) {
                Some(op) => Ok(Expr::Binary {
                    left: Box::new(self.expr(*left)?),
                    op,
                    right: Box::new(self.expr(*right)?),
                }),
                None => Ok(Expr::Opaque(
                    SqlExpr::BinaryOp { left, op, right }.to_string(),
                )),
            },
            SqlExpr::UnaryOp { op, expr } => match op {
                sqlast::UnaryOperator::Plus => self.expr(*expr),
                sqlast::UnaryOperator::Minus => Ok(negate(self.expr(*expr)?)),
                sqlast::UnaryOperator::Not => Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    expr: Box::new(self.expr(*expr)?),
                }),
                other => Ok(Expr::Opaque(
                    SqlExpr::UnaryOp { op: other, expr }.to_string(),
                )),
            },
            SqlExpr::Nested(expr) => self.expr(*expr),
            SqlExpr::Tuple(items) => Ok(Expr::Row(
                items
                    .into_iter()
                    .map(|e| self.expr(e))
                    .collect::<DbResult<Vec<_>>>()?,
            )),
            SqlExpr::InList {
                expr,
                list,
                negated,
            } => Ok(Expr::InList {
                expr: Box::new(self.expr(*expr)?),
                list: list
                    .into_iter()
                    .map(|e| self.expr(e))
                    .collect::<DbResult<Vec<_>>>()?,
                negated,
            }),
            other => Ok(Expr::Opaque(other.to_string())),
        }
    }

    fn value(&mut self, value: sqlast::Value) -> DbResult<Expr> {
        use sqlast::Value as SqlValue;

        let value = match value {
            SqlValue::Number(num, _) => Value::parse_number(&num)
                .ok_or_else(|| DbError::Parser(format!("invalid numeric literal: {num}")))?,
            SqlValue::SingleQuotedString(s) | SqlValue::DoubleQuotedString(s) => Value::Text(s),
            SqlValue::Boolean(b) => Value::Bool(b),
            SqlValue::Null => Value::Null,
            SqlValue::Placeholder(_) => {
                let order = self.next_param;
                self.next_param += 1;
                return Ok(Expr::Param(ParamMarker {
                    order,
                    value: Value::Null,
                }));
            }
            other => return Ok(Expr::Opaque(other.to_string())),
        };
        Ok(Expr::Literal(value))
    }
}

/// Fold a negation into a numeric literal so `-1` matches like a constant.
fn negate(expr: Expr) -> Expr {
    match expr {
        Expr::Literal(Value::Int(i)) => match i.checked_neg() {
            Some(n) => Expr::Literal(Value::Int(n)),
            None => Expr::Literal(Value::UInt(i64::MIN.unsigned_abs())),
        },
        Expr::Literal(Value::UInt(u)) if u == i64::MIN.unsigned_abs() => {
            Expr::Literal(Value::Int(i64::MIN))
        }
        Expr::Literal(Value::UInt(u)) => Expr::Literal(Value::Float(-(u as f64))),
        Expr::Literal(Value::Float(f)) => Expr::Literal(Value::Float(-f)),
        other => Expr::Unary {
            op: UnaryOp::Minus,
            expr: Box::new(other),
        },
    }
}

fn map_binary_op(op: &sqlast::BinaryOperator) -> Option<BinaryOp> {
    use sqlast::BinaryOperator as SqlBinary;

    Some(match op {
        SqlBinary::Eq => BinaryOp::Eq,
        SqlBinary::NotEq => BinaryOp::Ne,
        SqlBinary::Lt => BinaryOp::Lt,
        SqlBinary::LtEq => BinaryOp::Le,
        SqlBinary::Gt => BinaryOp::Gt,
        SqlBinary::GtEq => BinaryOp::Ge,
        SqlBinary::And => BinaryOp::And,
        SqlBinary::Or => BinaryOp::Or,
        SqlBinary::Plus => BinaryOp::Plus,
        SqlBinary::Minus => BinaryOp::Minus,
        SqlBinary::Multiply => BinaryOp::Multiply,
        SqlBinary::Divide => BinaryOp::Divide,
        _ => return None,
    })
}

fn normalize_ident(ident: &sqlast::Ident) -> String {
    ident.value.to_lowercase()
}

/// `col`, `t.col` or `db.t.col`; the database part is dropped.
fn column_name(idents: &[sqlast::Ident]) -> Option<ColumnName> {
    match idents {
        [name] => Some(ColumnName::new(normalize_ident(name))),
        [table, name] | [_, table, name] => Some(ColumnName::qualified(
            normalize_ident(table),
            normalize_ident(name),
        )),
        _ => None,
    }
}

fn table_name(name: &sqlast::ObjectName) -> DbResult<TableName> {
    match name.0.as_slice() {
        [table] => Ok(TableName::new(normalize_ident(table))),
        [schema, table] => Ok(TableName {
            schema: Some(normalize_ident(schema)),
            name: normalize_ident(table),
        }),
        _ => Err(DbError::Parser(format!("invalid object name: {name}"))),
    }
}

fn table_factor(factor: sqlast::TableFactor) -> DbResult<TableRef> {
    match factor {
        sqlast::TableFactor::Table { name, alias, .. } => Ok(TableRef::Table {
            name: table_name(&name)?,
            alias: alias.map(|a| normalize_ident(&a.name)),
        }),
        sqlast::TableFactor::Derived { alias, .. } => Ok(TableRef::Derived {
            alias: alias.map(|a| normalize_ident(&a.name)),
        }),
        _ => Ok(TableRef::Derived { alias: None }),
    }
}

fn table_ref_from_with_joins(table: sqlast::TableWithJoins) -> DbResult<TableRef> {
    let mut tree = table_factor(table.relation)?;
    for join in table.joins {
        tree = TableRef::Join {
            left: Box::new(tree),
            right: Box::new(table_factor(join.relation)?),
        };
    }
    Ok(tree)
}

fn fold_table_refs(from: Vec<sqlast::TableWithJoins>) -> DbResult<Option<TableRef>> {
    let mut tree: Option<TableRef> = None;
    for table in from {
        let next = table_ref_from_with_joins(table)?;
        tree = Some(match tree {
            Some(left) => TableRef::Join {
                left: Box::new(left),
                right: Box::new(next),
            },
            None => next,
        });
    }
    Ok(tree)
}

fn ensure_plain_wildcard(options: &sqlast::WildcardAdditionalOptions) -> DbResult<()> {
    let has_options = options.opt_exclude.is_some()
        || options.opt_except.is_some()
        || options.opt_rename.is_some()
        || options.opt_replace.is_some();
    if has_options {
        Err(DbError::Parser("wildcard options not supported".into()))
    } else {
        Ok(())
    }
}
