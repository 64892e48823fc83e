//! SQL script planning for snapshot testing.
//!
//! Plans every statement of a script against a [`PlanHarness`] and captures
//! the outcome as text suitable for `insta` snapshots.

use parser::parse_sql;
use planner::explain::explain_rows;
use planner::try_fast_plan;

use crate::context::{PlanHarness, format_explain};

/// Marker printed for statements the fast path declines.
pub const FALLBACK: &str = "fallback: general optimizer";

/// Plan each `;`-separated statement and return the annotated output.
///
/// Every statement is echoed after `> `, followed by its explain rows (see
/// [`format_explain`]), [`FALLBACK`], or `Error: ...` when it does not parse.
///
/// # Example
///
/// ```
/// use testsupport::prelude::*;
///
/// let output = explain_script(&PlanHarness::new(), r#"
///     SELECT * FROM t WHERE id = 1;
///     SELECT * FROM t WHERE a > 1;
/// "#);
///
/// assert!(output.contains("Point_Get_1 | 1.00 | root | table:t, handle:1"));
/// assert!(output.contains(FALLBACK));
/// ```
pub fn explain_script(harness: &PlanHarness, script: &str) -> String {
    let mut output = String::new();
    for sql in script.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        if !output.is_empty() {
            output.push('\n');
        }
        output.push_str("> ");
        output.push_str(sql);
        output.push('\n');
        output.push_str(&explain_statement(harness, sql));
    }
    output
}

fn explain_statement(harness: &PlanHarness, sql: &str) -> String {
    let statements = match parse_sql(sql) {
        Ok(statements) => statements,
        Err(e) => return format!("Error: {e}"),
    };
    let ctx = harness.context();
    statements
        .iter()
        .map(|stmt| match try_fast_plan(&ctx, stmt) {
            Some(plan) => format_explain(&explain_rows(plan.as_physical())),
            None => FALLBACK.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
