use std::cmp::Ordering;

use catalog::{IndexMeta, TableMeta};
use types::{Conversion, FieldType, Value};

use crate::pairs::{NameValuePair, duplicate_column};

/// How a point lookup reaches its row.
#[derive(Clone, Debug, PartialEq)]
pub enum PointAccess {
    /// Row handle taken from the integer primary key. `value` keeps the raw
    /// 64 bits; `unsigned` tells how to read them.
    Handle {
        value: i64,
        unsigned: bool,
        param: Option<usize>,
    },
    /// Unique index lookup. `values` and `params` follow the index column order.
    Index {
        index: IndexMeta,
        values: Vec<Value>,
        params: Vec<Option<usize>>,
    },
    /// The predicate can never match a row. `param` keeps the placeholder
    /// behind an out-of-range handle so the plan can be rebound.
    Empty { param: Option<usize> },
}

impl PointAccess {
    pub fn is_empty(&self) -> bool {
        matches!(self, PointAccess::Empty { .. })
    }
}

/// Table-level reasons the fast path refuses a table outright.
pub(crate) fn table_ineligibility(table: &TableMeta) -> Option<&'static str> {
    if table.is_partitioned() {
        Some("partitioned table")
    } else if table.has_generated_columns() {
        Some("table has generated columns")
    } else if !table.all_columns_public() {
        Some("table has non-public columns")
    } else {
        None
    }
}

/// Pick the access path for `pairs`: the integer handle first, then the
/// first unique public index, in declaration order, whose columns are
/// exactly the pair columns. `None` means no key identifies a single row.
pub fn match_access(table: &TableMeta, pairs: &[NameValuePair]) -> Option<PointAccess> {
    if pairs.is_empty() || duplicate_column(pairs).is_some() {
        return None;
    }
    if let (Some(handle), [pair]) = (table.handle_column(), pairs)
        && handle.name == pair.col_name
    {
        return reconcile_handle(&pair.value, &handle.ft, pair.param);
    }
    table
        .indexes
        .iter()
        .filter(|index| index.unique && index.is_public())
        .find_map(|index| index_values(index, pairs))
}

/// Convert a constant to the handle column's type. Overflow, or truncation
/// to a different value, proves the lookup empty; unsupported conversions
/// give up on the fast path.
pub fn reconcile_handle(value: &Value, ft: &FieldType, param: Option<usize>) -> Option<PointAccess> {
    let converted = match value.convert_to(ft).ok()? {
        Conversion::Overflow => return Some(PointAccess::Empty { param }),
        Conversion::Exact(v) | Conversion::Truncated(v) => v,
    };
    if converted.compare(value)? != Ordering::Equal {
        return Some(PointAccess::Empty { param });
    }
    let (value, unsigned) = match converted {
        Value::Int(i) => (i, false),
        Value::UInt(u) => (u as i64, true),
        _ => return None,
    };
    Some(PointAccess::Handle {
        value,
        unsigned: unsigned || ft.unsigned,
        param,
    })
}

fn index_values(index: &IndexMeta, pairs: &[NameValuePair]) -> Option<PointAccess> {
    if index.columns.len() != pairs.len() || index.has_prefix() {
        return None;
    }
    let mut values = Vec::with_capacity(pairs.len());
    let mut params = Vec::with_capacity(pairs.len());
    for column in &index.columns {
        let pair = pairs.iter().find(|p| p.col_name == column.name)?;
        values.push(pair.value.clone());
        params.push(pair.param);
    }
    Some(PointAccess::Index {
        index: index.clone(),
        values,
        params,
    })
}
