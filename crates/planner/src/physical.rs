use std::fmt;

use common::DbResult;

use crate::projection::Schema;

/// Properties a parent requires from a child.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PhysicalProperty {
    /// Expected number of rows the parent will pull from the child.
    pub expected_count: Option<f64>,
}

impl PhysicalProperty {
    /// No requirement at all.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn expected(count: f64) -> Self {
        Self {
            expected_count: Some(count),
        }
    }
}

/// Contract every executable plan node satisfies.
pub trait PhysicalPlan: fmt::Debug + Send + Sync {
    /// Operator name used in explain ids, e.g. `Point_Get`.
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> &Schema;

    /// Estimated number of output rows.
    fn stats_count(&self) -> f64;

    fn children(&self) -> Vec<&dyn PhysicalPlan>;

    /// Replace the children. Nodes with a fixed shape reject any change.
    fn set_children(&mut self, children: Vec<Box<dyn PhysicalPlan>>) -> DbResult<()>;

    /// Requirement placed on child `idx`.
    fn child_required_props(&self, idx: usize) -> PhysicalProperty;

    /// Access-path description shown by `EXPLAIN`.
    fn explain_info(&self) -> String;

    /// Bind column references to schema positions.
    fn resolve_indices(&mut self) -> DbResult<()>;
}
