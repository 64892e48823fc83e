//! Point-get fast path: plans single-row lookups without the general optimizer.
//!
//! Statements that look up one row (or a small IN-list of rows) by the
//! integer primary key or a unique index are planned in one pass. Anything
//! else returns `None` and is left to the cost-based optimizer.
//!
//! # Architecture
//!
//! ```text
//! Statement (SELECT / UPDATE / DELETE)
//!     ↓
//! Canonical SELECT shape
//!     ↓
//! Name/value pairs from WHERE      (pairs)
//!     ↓
//! Handle or unique index match     (access)
//!     ↓
//! Output schema                    (projection)
//!     ↓
//! PointGet / Union / Update / Delete
//! ```
//!
//! # Example
//!
//! ```no_run
//! use catalog::Catalog;
//! use parser::parse_sql;
//! use planner::{PlanContext, SessionContext, try_fast_plan};
//!
//! let catalog = Catalog::new();
//! let session = SessionContext::builder().current_db("test").build();
//! let ctx = PlanContext::new(&catalog, &session);
//! let stmt = parse_sql("SELECT * FROM t WHERE id = 1").unwrap().remove(0);
//! let plan = try_fast_plan(&ctx, &stmt);
//! ```

mod access;
mod batch;
pub mod explain;
mod fast_path;
mod mutation;
mod pairs;
mod physical;
mod point_get;
mod projection;
mod session;

pub use access::{PointAccess, match_access, reconcile_handle};
pub use batch::BatchPointGetPlan;
pub use fast_path::{FastPlan, try_fast_plan};
pub use mutation::{
    DeletePlan, ResolvedAssignment, ResolvedExpr, TableColPosInfo, UpdatePlan,
};
pub use pairs::{NameValuePair, name_value_pairs};
pub use physical::{PhysicalPlan, PhysicalProperty};
pub use point_get::PointGetPlan;
pub use projection::{ColumnOrigin, EXTRA_HANDLE_NAME, OutputColumn, Schema, build_schema};
pub use session::{PlanContext, Privilege, PrivilegeChecker, SessionContext};
