use std::fmt;

use common::pretty::{TableStyleKind, render_structured_rows};
use tabled::Tabled;

use crate::physical::PhysicalPlan;

/// One line of `EXPLAIN` output.
#[derive(Clone, Debug, PartialEq, Tabled)]
pub struct ExplainRow {
    pub id: String,
    #[tabled(rename = "estRows")]
    pub count: String,
    pub task: String,
    #[tabled(rename = "operator info")]
    pub operator_info: String,
}

/// `id | estRows | task | operator info`, without the last column when the
/// operator has nothing to say.
impl fmt::Display for ExplainRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {} | {}", self.id, self.count, self.task)?;
        if !self.operator_info.is_empty() {
            write!(f, " | {}", self.operator_info)?;
        }
        Ok(())
    }
}

/// Flatten a plan tree into explain rows, parent first. Operators are
/// numbered in build order, so children get lower ids than their parent.
pub fn explain_rows(plan: &dyn PhysicalPlan) -> Vec<ExplainRow> {
    let mut rows = Vec::new();
    let mut next_id = 0;
    walk(plan, "", "", &mut next_id, &mut rows);
    rows
}

fn walk(
    plan: &dyn PhysicalPlan,
    branch: &str,
    indent: &str,
    next_id: &mut usize,
    rows: &mut Vec<ExplainRow>,
) {
    let slot = rows.len();
    rows.push(ExplainRow {
        id: String::new(),
        count: format!("{:.2}", plan.stats_count()),
        task: "root".into(),
        operator_info: plan.explain_info(),
    });

    let children = plan.children();
    let last = children.len().saturating_sub(1);
    for (i, child) in children.into_iter().enumerate() {
        let (marker, pad) = if i == last { ("└─", "  ") } else { ("├─", "│ ") };
        walk(
            child,
            &format!("{indent}{marker}"),
            &format!("{indent}{pad}"),
            next_id,
            rows,
        );
    }

    *next_id += 1;
    rows[slot].id = format!("{branch}{}_{}", plan.type_name(), next_id);
}

/// Render explain rows as a table.
pub fn render_explain(plan: &dyn PhysicalPlan, style: TableStyleKind) -> String {
    render_structured_rows(&explain_rows(plan), style)
}
