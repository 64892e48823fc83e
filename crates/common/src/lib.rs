#[cfg(test)]
mod tests;

pub mod pretty;

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Stable identifier of a column within its table. Unlike the column's
/// offset it survives column reordering.
/// Examples:
/// - `let id_col: ColumnId = 1; // first declared column`
/// - `let name_col: ColumnId = 2;`
pub type ColumnId = u16;

/// Logical identifier for a table registered in the catalog.
/// Examples:
/// - `let users = TableId(7);`
/// - `let orders = TableId(11);`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId(pub u64);

/// Logical identifier for an index, unique within the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexId(pub u64);

/// Canonical error type shared across the workspace.
///
/// The fast-path planner itself never returns one of these for an ineligible
/// statement; it returns `None`. Errors are reserved for the surfaces around it.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("parse: {0}")]
    Parser(String),
    #[error("plan: {0}")]
    Planner(String),
    #[error("catalog: {0}")]
    Catalog(String),
    #[error("bind: {0}")]
    Binding(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Result alias that carries a `DbError`.
pub type DbResult<T> = Result<T, DbError>;

/// Convenient re-exports for downstream crates.
pub mod prelude {
    pub use crate::{ColumnId, DbError, DbResult, IndexId, TableId};
    pub use types::{FieldType, SqlType, Value};
}
