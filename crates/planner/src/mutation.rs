use common::{DbError, DbResult, TableId};
use expr::{BinaryOp, Expr, UnaryOp};
use parser::{Assignment, DeleteStmt, SelectStmt, UpdateStmt};
use tracing::trace;
use types::{FieldType, Value};

use crate::fast_path::FastPlan;
use crate::physical::{PhysicalPlan, PhysicalProperty};
use crate::point_get::{PointGetPlan, try_point_get};
use crate::projection::{ColumnOrigin, OutputColumn, Schema};
use crate::session::{PlanContext, Privilege};

/// Mutations produce no result columns.
static NO_OUTPUT: Schema = Schema::empty();

/// Expression bound to positions in the lookup schema.
#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedExpr {
    Literal(Value),
    Param {
        order: usize,
        value: Value,
    },
    /// Offset into the lookup plan's schema.
    Column(usize),
    Unary {
        op: UnaryOp,
        expr: Box<ResolvedExpr>,
    },
    Binary {
        left: Box<ResolvedExpr>,
        op: BinaryOp,
        right: Box<ResolvedExpr>,
    },
    Cast {
        expr: Box<ResolvedExpr>,
        ft: FieldType,
    },
}

impl ResolvedExpr {
    fn columns_within(&self, len: usize) -> bool {
        match self {
            ResolvedExpr::Literal(_) | ResolvedExpr::Param { .. } => true,
            ResolvedExpr::Column(idx) => *idx < len,
            ResolvedExpr::Unary { expr, .. } | ResolvedExpr::Cast { expr, .. } => {
                expr.columns_within(len)
            }
            ResolvedExpr::Binary { left, right, .. } => {
                left.columns_within(len) && right.columns_within(len)
            }
        }
    }

    fn rebind(&mut self, params: &[Value]) -> DbResult<()> {
        match self {
            ResolvedExpr::Param { order, value } => {
                *value = params.get(*order).cloned().ok_or_else(|| {
                    DbError::Binding(format!("no value for placeholder {order}"))
                })?;
                Ok(())
            }
            ResolvedExpr::Literal(_) | ResolvedExpr::Column(_) => Ok(()),
            ResolvedExpr::Unary { expr, .. } | ResolvedExpr::Cast { expr, .. } => {
                expr.rebind(params)
            }
            ResolvedExpr::Binary { left, right, .. } => {
                left.rebind(params)?;
                right.rebind(params)
            }
        }
    }
}

/// Where the target table's columns and row handle sit in the lookup schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableColPosInfo {
    pub table_id: TableId,
    pub start: usize,
    pub end: usize,
    pub handle_ordinal: usize,
}

/// `SET column = expr`, with `expr` cast to the column type.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedAssignment {
    pub column: OutputColumn,
    pub expr: ResolvedExpr,
}

#[derive(Clone, Debug)]
pub struct UpdatePlan {
    pub select: PointGetPlan,
    pub assignments: Vec<ResolvedAssignment>,
    pub col_pos: TableColPosInfo,
}

#[derive(Clone, Debug)]
pub struct DeletePlan {
    pub select: PointGetPlan,
    pub col_pos: TableColPosInfo,
}

impl UpdatePlan {
    pub fn rebind(&mut self, params: &[Value]) -> DbResult<()> {
        self.select.rebind(params)?;
        for assignment in &mut self.assignments {
            assignment.expr.rebind(params)?;
        }
        Ok(())
    }
}

impl PhysicalPlan for UpdatePlan {
    fn type_name(&self) -> &'static str {
        "Update"
    }

    fn schema(&self) -> &Schema {
        &NO_OUTPUT
    }

    fn stats_count(&self) -> f64 {
        self.select.stats_count()
    }

    fn children(&self) -> Vec<&dyn PhysicalPlan> {
        vec![&self.select as &dyn PhysicalPlan]
    }

    fn set_children(&mut self, _children: Vec<Box<dyn PhysicalPlan>>) -> DbResult<()> {
        Err(DbError::Planner("Update reads from a fixed point get".into()))
    }

    fn child_required_props(&self, _idx: usize) -> PhysicalProperty {
        PhysicalProperty::any()
    }

    fn explain_info(&self) -> String {
        String::new()
    }

    fn resolve_indices(&mut self) -> DbResult<()> {
        let len = self.select.schema().len();
        if self.assignments.iter().all(|a| a.expr.columns_within(len)) {
            Ok(())
        } else {
            Err(DbError::Planner(
                "assignment refers past the lookup schema".into(),
            ))
        }
    }
}

impl PhysicalPlan for DeletePlan {
    fn type_name(&self) -> &'static str {
        "Delete"
    }

    fn schema(&self) -> &Schema {
        &NO_OUTPUT
    }

    fn stats_count(&self) -> f64 {
        self.select.stats_count()
    }

    fn children(&self) -> Vec<&dyn PhysicalPlan> {
        vec![&self.select as &dyn PhysicalPlan]
    }

    fn set_children(&mut self, _children: Vec<Box<dyn PhysicalPlan>>) -> DbResult<()> {
        Err(DbError::Planner("Delete reads from a fixed point get".into()))
    }

    fn child_required_props(&self, _idx: usize) -> PhysicalProperty {
        PhysicalProperty::any()
    }

    fn explain_info(&self) -> String {
        String::new()
    }

    fn resolve_indices(&mut self) -> DbResult<()> {
        Ok(())
    }
}

pub(crate) fn try_update(ctx: &PlanContext<'_>, stmt: &UpdateStmt) -> Option<FastPlan> {
    let select = SelectStmt {
        from: Some(stmt.table_refs.clone()),
        selection: stmt.selection.clone(),
        order_by: stmt.order_by.clone(),
        limit: stmt.limit.clone(),
        ..SelectStmt::default()
    };
    let mut lookup = mutation_lookup(ctx, &select, Privilege::Update)?;
    if lookup.is_empty_result() {
        return Some(FastPlan::PointGet(lookup));
    }
    let Some(assignments) = resolve_assignments(lookup.schema(), &stmt.assignments) else {
        trace!(table = %lookup.table().name, "assignment cannot be resolved against the lookup");
        return None;
    };
    let col_pos = handle_position(&mut lookup);
    Some(FastPlan::Update(UpdatePlan {
        select: lookup,
        assignments,
        col_pos,
    }))
}

pub(crate) fn try_delete(ctx: &PlanContext<'_>, stmt: &DeleteStmt) -> Option<FastPlan> {
    if stmt.multi_table {
        trace!("multi-table DELETE");
        return None;
    }
    let select = SelectStmt {
        from: Some(stmt.table_refs.clone()),
        selection: stmt.selection.clone(),
        order_by: stmt.order_by.clone(),
        limit: stmt.limit.clone(),
        ..SelectStmt::default()
    };
    let mut lookup = mutation_lookup(ctx, &select, Privilege::Delete)?;
    if lookup.is_empty_result() {
        return Some(FastPlan::PointGet(lookup));
    }
    let col_pos = handle_position(&mut lookup);
    Some(FastPlan::Delete(DeletePlan {
        select: lookup,
        col_pos,
    }))
}

/// The all-columns point get a mutation reads through, privilege-checked
/// and locked when the transaction is pessimistic.
fn mutation_lookup(
    ctx: &PlanContext<'_>,
    select: &SelectStmt,
    privilege: Privilege,
) -> Option<PointGetPlan> {
    let mut lookup = try_point_get(ctx, select)?;
    if !ctx.check_privileges(
        lookup.db(),
        &lookup.table().name,
        &[Privilege::Select, privilege],
    ) {
        trace!(table = %lookup.table().name, %privilege, "privilege denied");
        return None;
    }
    if ctx.session.pessimistic {
        lookup.set_lock(false);
    }
    Some(lookup)
}

fn resolve_assignments(
    schema: &Schema,
    assignments: &[Assignment],
) -> Option<Vec<ResolvedAssignment>> {
    assignments
        .iter()
        .map(|assignment| {
            let column = schema.find_column(&assignment.column)?;
            let expr = resolve(&assignment.value, schema)?;
            Some(ResolvedAssignment {
                column: column.clone(),
                expr: ResolvedExpr::Cast {
                    expr: Box::new(expr),
                    ft: column.ft.clone(),
                },
            })
        })
        .collect()
}

/// Bind a simple scalar expression to schema positions.
fn resolve(expr: &Expr, schema: &Schema) -> Option<ResolvedExpr> {
    Some(match expr {
        Expr::Literal(value) => ResolvedExpr::Literal(value.clone()),
        Expr::Param(marker) => ResolvedExpr::Param {
            order: marker.order,
            value: marker.value.clone(),
        },
        Expr::Column(name) => ResolvedExpr::Column(schema.find_column(name)?.index),
        Expr::Unary { op, expr } => ResolvedExpr::Unary {
            op: *op,
            expr: Box::new(resolve(expr, schema)?),
        },
        Expr::Binary { left, op, right } => ResolvedExpr::Binary {
            left: Box::new(resolve(left, schema)?),
            op: *op,
            right: Box::new(resolve(right, schema)?),
        },
        Expr::InList { .. } | Expr::Row(_) | Expr::Opaque(_) => return None,
    })
}

/// Locate the row handle in the lookup schema, appending the hidden handle
/// column when the table has no integer primary key.
fn handle_position(lookup: &mut PointGetPlan) -> TableColPosInfo {
    let existing = lookup.table().handle_column().and_then(|handle| {
        let origin = ColumnOrigin::Table {
            id: handle.id,
            offset: handle.offset,
        };
        lookup
            .schema()
            .columns()
            .iter()
            .position(|c| c.origin == origin)
    });
    let handle_ordinal = match existing {
        Some(ordinal) => ordinal,
        None => {
            let (schema, ordinal) = lookup.schema().clone().with_extra_handle();
            lookup.replace_schema(schema);
            ordinal
        }
    };
    TableColPosInfo {
        table_id: lookup.table().id,
        start: 0,
        end: lookup.schema().len(),
        handle_ordinal,
    }
}
