use expr::{BinaryOp, ColumnName, Expr};
use types::Value;

/// A `column = constant` conjunct lifted out of a WHERE clause.
#[derive(Clone, Debug, PartialEq)]
pub struct NameValuePair {
    /// Lower-cased, unqualified column name.
    pub col_name: String,
    pub value: Value,
    /// Placeholder ordinal when the value came from a bound `?`.
    pub param: Option<usize>,
}

/// Flatten a conjunction of equalities into name/value pairs.
///
/// Returns `None` as soon as anything other than `AND` of `column = value`
/// terms shows up, when a column is qualified with a different table, or
/// when a value is NULL. Duplicate columns are kept; the matcher rejects them.
pub fn name_value_pairs(expr: &Expr, table_alias: &str) -> Option<Vec<NameValuePair>> {
    let mut pairs = Vec::with_capacity(4);
    collect(expr, table_alias, &mut pairs)?;
    Some(pairs)
}

fn collect(expr: &Expr, table_alias: &str, pairs: &mut Vec<NameValuePair>) -> Option<()> {
    let Expr::Binary { left, op, right } = expr else {
        return None;
    };
    match op {
        BinaryOp::And => {
            collect(left, table_alias, pairs)?;
            collect(right, table_alias, pairs)
        }
        BinaryOp::Eq => {
            let (column, value, param) = match (left.as_ref(), right.as_ref()) {
                (Expr::Column(column), other) | (other, Expr::Column(column)) => {
                    let (value, param) = constant(other)?;
                    (column, value, param)
                }
                _ => return None,
            };
            if value.is_null() || !column.belongs_to(table_alias) {
                return None;
            }
            pairs.push(pair(column, value, param));
            Some(())
        }
        _ => None,
    }
}

fn constant(expr: &Expr) -> Option<(Value, Option<usize>)> {
    match expr {
        Expr::Literal(value) => Some((value.clone(), None)),
        Expr::Param(marker) => Some((marker.value.clone(), Some(marker.order))),
        _ => None,
    }
}

fn pair(column: &ColumnName, value: Value, param: Option<usize>) -> NameValuePair {
    NameValuePair {
        col_name: column.name.to_lowercase(),
        value,
        param,
    }
}

/// First duplicated column name, if any.
pub(crate) fn duplicate_column(pairs: &[NameValuePair]) -> Option<&str> {
    pairs.iter().enumerate().find_map(|(i, p)| {
        pairs[..i]
            .iter()
            .any(|q| q.col_name == p.col_name)
            .then_some(p.col_name.as_str())
    })
}
