//! Planning harness that owns a catalog, a session and an optional
//! privilege checker.
//!
//! Every call builds a fresh [`PlanContext`] over the owned state, so tests
//! can flip session flags between statements without rebuilding the catalog.

use catalog::Catalog;
use planner::explain::{ExplainRow, explain_rows};
use planner::{FastPlan, PlanContext, PrivilegeChecker, SessionContext, try_fast_plan};
use types::Value;

use crate::fixtures::{autocommit_session, parse_bound, parse_one, point_catalog};

/// A planning environment for tests.
///
/// # Example
///
/// ```
/// use testsupport::prelude::*;
///
/// let harness = PlanHarness::new();
/// let plan = harness.plan("SELECT * FROM t WHERE id = 1").unwrap();
/// assert_eq!(plan.as_physical().explain_info(), "table:t, handle:1");
///
/// assert!(harness.plan("SELECT * FROM t WHERE id > 1").is_none());
/// ```
pub struct PlanHarness {
    catalog: Catalog,
    session: SessionContext,
    privileges: Option<Box<dyn PrivilegeChecker>>,
}

impl PlanHarness {
    /// The fixture catalog with an autocommit session in `test`.
    pub fn new() -> Self {
        Self::with_catalog(point_catalog())
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            catalog,
            session: autocommit_session(),
            privileges: None,
        }
    }

    pub fn session(mut self, session: SessionContext) -> Self {
        self.session = session;
        self
    }

    pub fn privileges(mut self, checker: impl PrivilegeChecker + 'static) -> Self {
        self.privileges = Some(Box::new(checker));
        self
    }

    pub fn session_mut(&mut self) -> &mut SessionContext {
        &mut self.session
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    /// Context borrowing the harness state.
    pub fn context(&self) -> PlanContext<'_> {
        let ctx = PlanContext::new(&self.catalog, &self.session);
        match &self.privileges {
            Some(checker) => ctx.with_privileges(checker.as_ref()),
            None => ctx,
        }
    }

    /// Try the fast path on a single SQL statement.
    pub fn plan(&self, sql: &str) -> Option<FastPlan> {
        try_fast_plan(&self.context(), &parse_one(sql))
    }

    /// Like [`plan`](Self::plan), with `?` markers bound to `params`.
    pub fn plan_with(&self, sql: &str, params: &[Value]) -> Option<FastPlan> {
        try_fast_plan(&self.context(), &parse_bound(sql, params))
    }

    /// Explain rows for `sql`, or `None` when it falls back.
    pub fn explain(&self, sql: &str) -> Option<Vec<ExplainRow>> {
        self.plan(sql).map(|plan| explain_rows(plan.as_physical()))
    }
}

impl Default for PlanHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders explain rows one per line as `id | estRows | task | operator info`,
/// the last column left out for operators without info. Stable enough for
/// inline snapshots.
pub fn format_explain(rows: &[ExplainRow]) -> String {
    rows.iter()
        .map(ExplainRow::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
