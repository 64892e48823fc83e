
use std::fmt;
use types::Value;

/// Binary comparison, logical and arithmetic operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Plus,
    Minus,
    Multiply,
    Divide,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
        }
    }
}

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum UnaryOp {
    Not,
    Minus,
}

/// Column reference with optional table/alias qualifier.
///
/// Examples:
/// - `ColumnName { table: None, name: "id" }` - unqualified column
/// - `ColumnName { table: Some("u"), name: "id" }` - alias-qualified column
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ColumnName {
    /// Optional table name or alias qualifier, lower-cased.
    pub table: Option<String>,
    /// Column name, lower-cased.
    pub name: String,
}

impl ColumnName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            name: name.into(),
        }
    }

    /// True when the reference is unqualified or qualified with `alias`.
    pub fn belongs_to(&self, alias: &str) -> bool {
        self.table.as_deref().is_none_or(|t| t == alias)
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{table}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A `?` placeholder. `order` is its zero-based position in the statement;
/// `value` stays `Null` until the statement is bound.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParamMarker {
    pub order: usize,
    pub value: Value,
}

/// Expression abstract syntax tree.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Expr {
    Literal(Value),
    Param(ParamMarker),
    Column(ColumnName),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// `expr [NOT] IN (list...)`
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    /// Row constructor `(a, b, ...)`.
    Row(Vec<Expr>),
    /// Anything the front-end keeps only as text (function calls, subqueries, ...).
    Opaque(String),
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(ColumnName::new(name))
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOp::Eq, right)
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOp::And, right)
    }

    /// Visit every placeholder in the tree, left to right.
    pub fn visit_params_mut(&mut self, f: &mut impl FnMut(&mut ParamMarker)) {
        match self {
            Expr::Param(p) => f(p),
            Expr::Unary { expr, .. } => expr.visit_params_mut(f),
            Expr::Binary { left, right, .. } => {
                left.visit_params_mut(f);
                right.visit_params_mut(f);
            }
            Expr::InList { expr, list, .. } => {
                expr.visit_params_mut(f);
                for item in list {
                    item.visit_params_mut(f);
                }
            }
            Expr::Row(items) => {
                for item in items {
                    item.visit_params_mut(f);
                }
            }
            Expr::Literal(_) | Expr::Column(_) | Expr::Opaque(_) => {}
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Value::Text(s)) => write!(f, "'{s}'"),
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::Param(p) => write!(f, "?{}", p.order),
            Expr::Column(c) => write!(f, "{c}"),
            Expr::Unary { op: UnaryOp::Not, expr } => write!(f, "not({expr})"),
            Expr::Unary { op: UnaryOp::Minus, expr } => write!(f, "-{expr}"),
            Expr::Binary { left, op, right } => write!(f, "{left} {} {right}", op.symbol()),
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                let items = list.iter().map(|e| e.to_string()).collect::<Vec<_>>();
                let not = if *negated { "not " } else { "" };
                write!(f, "{expr} {not}in ({})", items.join(", "))
            }
            Expr::Row(items) => {
                let items = items.iter().map(|e| e.to_string()).collect::<Vec<_>>();
                write!(f, "({})", items.join(", "))
            }
            Expr::Opaque(text) => f.write_str(text),
        }
    }
}
