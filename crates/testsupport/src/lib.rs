//! Test support utilities for the point-get fast path.
//!
//! This crate provides:
//! - A fixture catalog covering every table shape the fast path tells apart
//! - A planning harness owning catalog, session and privilege checker
//! - Script planning with plain-text explain output for snapshot testing
//! - Recording privilege checkers
//! - Property-based test generators for values and column types
//! - Assertion helpers for plan shapes
//!
//! # Example Usage
//!
//! ```no_run
//! use testsupport::prelude::*;
//!
//! #[test]
//! fn test_point_lookup() {
//!     let output = explain_script(&PlanHarness::new(), r#"
//!         SELECT * FROM t WHERE id = 1;
//!         SELECT a FROM t WHERE a = 1 AND b = 'x';
//!     "#);
//!
//!     insta::assert_snapshot!(output);
//! }
//! ```

pub mod assertions;
pub mod context;
pub mod fixtures;
pub mod macros;
pub mod privileges;
pub mod proptest_generators;
pub mod runner;

/// Convenient re-exports for common testing patterns.
pub mod prelude {
    pub use crate::assertions::*;
    pub use crate::context::*;
    pub use crate::fixtures::*;
    pub use crate::privileges::*;
    pub use crate::runner::*;
    pub use crate::table_def;
}
