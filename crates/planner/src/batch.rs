use common::{DbError, DbResult};
use expr::Expr;
use parser::{SelectLock, SelectStmt};
use tracing::trace;
use types::Value;

use crate::fast_path::{FastPlan, try_select};
use crate::physical::{PhysicalPlan, PhysicalProperty};
use crate::point_get::PointGetPlan;
use crate::projection::Schema;
use crate::session::PlanContext;

/// Union of point gets produced from `col IN (...)` or `(a, b) IN ((..), ..)`.
/// Every child has the same schema and yields at most one row.
#[derive(Clone, Debug)]
pub struct BatchPointGetPlan {
    schema: Schema,
    children: Vec<PointGetPlan>,
}

impl BatchPointGetPlan {
    pub fn point_gets(&self) -> &[PointGetPlan] {
        &self.children
    }
}

impl PhysicalPlan for BatchPointGetPlan {
    fn type_name(&self) -> &'static str {
        "Union"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn stats_count(&self) -> f64 {
        self.children.iter().map(|c| c.stats_count()).sum()
    }

    fn children(&self) -> Vec<&dyn PhysicalPlan> {
        self.children
            .iter()
            .map(|c| c as &dyn PhysicalPlan)
            .collect()
    }

    fn set_children(&mut self, _children: Vec<Box<dyn PhysicalPlan>>) -> DbResult<()> {
        Err(DbError::Planner(
            "point get union children are fixed at construction".into(),
        ))
    }

    fn child_required_props(&self, idx: usize) -> PhysicalProperty {
        if idx < self.children.len() {
            PhysicalProperty::expected(1.0)
        } else {
            PhysicalProperty::any()
        }
    }

    fn explain_info(&self) -> String {
        String::new()
    }

    fn resolve_indices(&mut self) -> DbResult<()> {
        Ok(())
    }
}

/// Expand a top-level positive IN predicate into one point get per
/// candidate. Any candidate that is not a real lookup sinks the whole batch.
pub(crate) fn try_batch(ctx: &PlanContext<'_>, stmt: &SelectStmt) -> Option<BatchPointGetPlan> {
    if !stmt.order_by.is_empty()
        || !stmt.group_by.is_empty()
        || stmt.limit.is_some()
        || stmt.having.is_some()
        || !stmt.windows.is_empty()
        || stmt.lock != SelectLock::None
    {
        return None;
    }
    let Some(Expr::InList {
        expr,
        list,
        negated: false,
    }) = &stmt.selection
    else {
        return None;
    };
    if list.is_empty() {
        return None;
    }

    let mut children = Vec::with_capacity(list.len());
    for candidate in list {
        let selection = match (expr.as_ref(), candidate) {
            (Expr::Column(_), _) => Expr::eq(expr.as_ref().clone(), candidate.clone()),
            (Expr::Row(left), Expr::Row(right)) if !left.is_empty() && left.len() == right.len() => {
                conjunction(left, right)
            }
            _ => return None,
        };
        let rewritten = SelectStmt {
            distinct: stmt.distinct,
            fields: stmt.fields.clone(),
            from: stmt.from.clone(),
            selection: Some(selection),
            ..SelectStmt::default()
        };
        match try_select(ctx, &rewritten) {
            Some(FastPlan::PointGet(plan)) if !plan.is_empty_result() => children.push(plan),
            _ => {
                trace!(candidates = list.len(), "IN candidate has no point get; batch abandoned");
                return None;
            }
        }
    }

    let schema = children.first()?.schema().clone();
    Some(BatchPointGetPlan { schema, children })
}

/// `l1 = r1 AND l2 = r2 AND ...`, left-deep.
fn conjunction(left: &[Expr], right: &[Expr]) -> Expr {
    let mut terms = left
        .iter()
        .zip(right)
        .map(|(l, r)| Expr::eq(l.clone(), r.clone()));
    let first = terms.next().unwrap_or(Expr::Literal(Value::Bool(true)));
    terms.fold(first, Expr::and)
}
