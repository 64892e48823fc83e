use common::{DbError, DbResult};
use parser::{SelectLock, SelectStmt, Statement};
use tracing::{debug, trace};
use types::Value;

use crate::batch::{BatchPointGetPlan, try_batch};
use crate::mutation::{DeletePlan, UpdatePlan, try_delete, try_update};
use crate::physical::PhysicalPlan;
use crate::point_get::{PointGetPlan, try_point_get};
use crate::session::{PlanContext, Privilege};

/// A plan built without the general optimizer.
#[derive(Clone, Debug)]
pub enum FastPlan {
    PointGet(PointGetPlan),
    Batch(BatchPointGetPlan),
    Update(UpdatePlan),
    Delete(DeletePlan),
}

impl FastPlan {
    pub fn as_physical(&self) -> &dyn PhysicalPlan {
        match self {
            FastPlan::PointGet(plan) => plan,
            FastPlan::Batch(plan) => plan,
            FastPlan::Update(plan) => plan,
            FastPlan::Delete(plan) => plan,
        }
    }

    pub fn as_physical_mut(&mut self) -> &mut dyn PhysicalPlan {
        match self {
            FastPlan::PointGet(plan) => plan,
            FastPlan::Batch(plan) => plan,
            FastPlan::Update(plan) => plan,
            FastPlan::Delete(plan) => plan,
        }
    }

    /// The single lookup a point get or mutation reads through.
    pub fn lookup(&self) -> Option<&PointGetPlan> {
        match self {
            FastPlan::PointGet(plan) => Some(plan),
            FastPlan::Update(plan) => Some(&plan.select),
            FastPlan::Delete(plan) => Some(&plan.select),
            FastPlan::Batch(_) => None,
        }
    }

    /// Reuse a cached plan with new prepared-statement parameters.
    pub fn rebind(&mut self, params: &[Value]) -> DbResult<()> {
        match self {
            FastPlan::PointGet(plan) => plan.rebind(params),
            FastPlan::Update(plan) => plan.rebind(params),
            FastPlan::Delete(plan) => plan.select.rebind(params),
            FastPlan::Batch(_) => Err(DbError::Planner(
                "point get unions are rebuilt per execution".into(),
            )),
        }
    }
}

/// Plan `stmt` directly when it is a point lookup (or a small batch of
/// them) on a uniquely keyed table. `None` means the statement must go to
/// the general optimizer.
pub fn try_fast_plan(ctx: &PlanContext<'_>, stmt: &Statement) -> Option<FastPlan> {
    let plan = match stmt {
        Statement::Select(select) => try_select(ctx, select),
        Statement::Update(update) => try_update(ctx, update),
        Statement::Delete(delete) => try_delete(ctx, delete),
    }?;
    let physical = plan.as_physical();
    debug!(
        plan = physical.type_name(),
        info = %physical.explain_info(),
        rows = physical.stats_count(),
        "fast plan built"
    );
    Some(plan)
}

/// SELECT entry: the IN-list batch first, then a single point get.
pub(crate) fn try_select(ctx: &PlanContext<'_>, stmt: &SelectStmt) -> Option<FastPlan> {
    if let Some(batch) = try_batch(ctx, stmt) {
        return Some(FastPlan::Batch(batch));
    }
    let mut plan = try_point_get(ctx, stmt)?;
    if !ctx.check_privileges(plan.db(), &plan.table().name, &[Privilege::Select]) {
        trace!(table = %plan.table().name, "SELECT privilege denied");
        return None;
    }
    if stmt.lock == SelectLock::ForUpdate && ctx.session.locks_for_update() {
        plan.set_lock(true);
    }
    Some(FastPlan::PointGet(plan))
}
