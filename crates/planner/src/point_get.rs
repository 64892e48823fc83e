use std::fmt::Write as _;

use catalog::TableMeta;
use common::{DbError, DbResult};
use expr::Expr;
use parser::{Limit, SelectStmt, TableName, TableRef};
use tracing::trace;
use types::Value;

use crate::access::{PointAccess, match_access, reconcile_handle, table_ineligibility};
use crate::pairs::name_value_pairs;
use crate::physical::{PhysicalPlan, PhysicalProperty};
use crate::projection::{Schema, build_schema};
use crate::session::PlanContext;

/// Single-row lookup by row handle or unique index, built without the
/// general optimizer.
#[derive(Clone, Debug)]
pub struct PointGetPlan {
    schema: Schema,
    db: String,
    table: TableMeta,
    access: PointAccess,
    lock: bool,
    for_update: bool,
}

impl PointGetPlan {
    pub(crate) fn new(schema: Schema, db: String, table: &TableMeta, access: PointAccess) -> Self {
        Self {
            schema,
            db,
            table: table.clone(),
            access,
            lock: false,
            for_update: false,
        }
    }

    pub fn db(&self) -> &str {
        &self.db
    }

    pub fn table(&self) -> &TableMeta {
        &self.table
    }

    pub fn access(&self) -> &PointAccess {
        &self.access
    }

    /// True when the lookup provably returns no row and never touches storage.
    pub fn is_empty_result(&self) -> bool {
        self.access.is_empty()
    }

    /// Rows are locked on read. Never set for an empty result.
    pub fn lock(&self) -> bool {
        self.lock && !self.is_empty_result()
    }

    pub fn for_update(&self) -> bool {
        self.for_update && !self.is_empty_result()
    }

    pub(crate) fn set_lock(&mut self, for_update: bool) {
        self.lock = true;
        self.for_update = for_update;
    }

    /// Swap in a schema derived from the current one.
    pub(crate) fn replace_schema(&mut self, schema: Schema) {
        self.schema = schema;
    }

    /// Re-derive the key values from new prepared-statement parameters so a
    /// cached plan can serve another execution. A handle that lands out of
    /// range turns the plan empty until a later value fits again; lock flags
    /// survive the round trip.
    pub fn rebind(&mut self, params: &[Value]) -> DbResult<()> {
        let lookup = |order: usize| {
            params
                .get(order)
                .ok_or_else(|| DbError::Binding(format!("no value for placeholder {order}")))
        };
        match &mut self.access {
            PointAccess::Handle { param: None, .. } | PointAccess::Empty { param: None } => Ok(()),
            PointAccess::Handle {
                param: Some(order), ..
            }
            | PointAccess::Empty { param: Some(order) } => {
                let order = *order;
                let value = lookup(order)?;
                let ft = self
                    .table
                    .handle_column()
                    .map(|c| c.ft.clone())
                    .ok_or_else(|| {
                        DbError::Planner(format!("table '{}' has no handle column", self.table.name))
                    })?;
                self.access = reconcile_handle(value, &ft, Some(order)).ok_or_else(|| {
                    DbError::Binding(format!("{value} cannot be used as a {ft} handle"))
                })?;
                Ok(())
            }
            PointAccess::Index { values, params: orders, .. } => {
                for (value, order) in values.iter_mut().zip(orders.iter()) {
                    let Some(order) = *order else { continue };
                    let bound = lookup(order)?;
                    if bound.is_null() {
                        return Err(DbError::Binding(format!(
                            "placeholder {order} is NULL in a unique key lookup"
                        )));
                    }
                    *value = bound.clone();
                }
                Ok(())
            }
        }
    }
}

impl PhysicalPlan for PointGetPlan {
    fn type_name(&self) -> &'static str {
        "Point_Get"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn stats_count(&self) -> f64 {
        if self.is_empty_result() { 0.0 } else { 1.0 }
    }

    fn children(&self) -> Vec<&dyn PhysicalPlan> {
        Vec::new()
    }

    fn set_children(&mut self, children: Vec<Box<dyn PhysicalPlan>>) -> DbResult<()> {
        if children.is_empty() {
            Ok(())
        } else {
            Err(DbError::Planner("Point_Get is a leaf and takes no children".into()))
        }
    }

    fn child_required_props(&self, _idx: usize) -> PhysicalProperty {
        PhysicalProperty::any()
    }

    fn explain_info(&self) -> String {
        let mut info = format!("table:{}", self.table.name);
        match &self.access {
            PointAccess::Handle {
                value,
                unsigned: true,
                ..
            } => {
                let _ = write!(info, ", handle:{}", *value as u64);
            }
            PointAccess::Handle { value, .. } => {
                let _ = write!(info, ", handle:{value}");
            }
            PointAccess::Index { index, .. } => {
                let columns = index.column_names().collect::<Vec<_>>().join(" ");
                let _ = write!(info, ", index:{columns}");
            }
            PointAccess::Empty { .. } => info.push_str(", dual"),
        }
        if self.lock() {
            info.push_str(", lock");
        }
        info
    }

    fn resolve_indices(&mut self) -> DbResult<()> {
        Ok(())
    }
}

/// Build a point get for a single-table SELECT, or `None` when the
/// statement needs the general optimizer. Locking and privileges are left
/// to the caller.
pub(crate) fn try_point_get(ctx: &PlanContext<'_>, stmt: &SelectStmt) -> Option<PointGetPlan> {
    if stmt.having.is_some() {
        return reject("HAVING clause");
    }
    if let Some(limit) = &stmt.limit {
        match limit_count_offset(limit) {
            Some((count, offset)) if count > 0 && offset == 0 => {}
            _ => return reject("LIMIT skips or drops rows"),
        }
    }
    let Some((name, alias)) = single_table(stmt.from.as_ref()) else {
        return reject("not a single-table source");
    };
    let db = name
        .schema
        .clone()
        .unwrap_or_else(|| ctx.session.current_db.clone());
    let Ok(table) = ctx.catalog.table(&db, &name.name) else {
        return reject("unknown table");
    };
    if let Some(reason) = table_ineligibility(table) {
        trace!(table = %table.name, reason, "point get not applicable");
        return None;
    }
    let Some(pairs) = stmt
        .selection
        .as_ref()
        .and_then(|selection| name_value_pairs(selection, &alias))
    else {
        return reject("WHERE is not a conjunction of equalities");
    };
    let Some(access) = match_access(table, &pairs) else {
        trace!(table = %table.name, pairs = pairs.len(), "no unique key matches the predicate");
        return None;
    };
    let Some(schema) = build_schema(&db, table, &alias, &stmt.fields) else {
        return reject("select list cannot be bound to table columns");
    };
    Some(PointGetPlan::new(schema, db, table, access))
}

fn reject<T>(reason: &'static str) -> Option<T> {
    trace!(reason, "point get not applicable");
    None
}

/// The only table in FROM and the name it goes by.
fn single_table(from: Option<&TableRef>) -> Option<(&TableName, String)> {
    match from? {
        TableRef::Table { name, alias } => {
            let alias = alias.clone().unwrap_or_else(|| name.name.clone());
            Some((name, alias))
        }
        TableRef::Derived { .. } | TableRef::Join { .. } => None,
    }
}

fn limit_count_offset(limit: &Limit) -> Option<(u64, u64)> {
    let count = limit_value(&limit.count)?;
    let offset = match &limit.offset {
        Some(offset) => limit_value(offset)?,
        None => 0,
    };
    Some((count, offset))
}

fn limit_value(expr: &Expr) -> Option<u64> {
    let value = match expr {
        Expr::Literal(value) => value,
        Expr::Param(marker) => &marker.value,
        _ => return None,
    };
    match value {
        Value::Int(i) => u64::try_from(*i).ok(),
        Value::UInt(u) => Some(*u),
        _ => None,
    }
}
