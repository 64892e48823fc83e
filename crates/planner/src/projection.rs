use catalog::{ColumnMeta, TableMeta};
use common::ColumnId;
use expr::{ColumnName, Expr};
use parser::SelectField;
use types::{FieldType, SqlType};

/// Name of the hidden row-identity column appended for mutations on tables
/// whose handle is not a declared column.
pub const EXTRA_HANDLE_NAME: &str = "_rowid";

/// Where an output column's data comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnOrigin {
    Table { id: ColumnId, offset: usize },
    /// The hidden row handle.
    ExtraHandle,
}

/// One column of a plan's output schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputColumn {
    pub db: String,
    pub orig_table: String,
    /// Alias the statement uses for the table (the table name when unaliased).
    pub table_alias: String,
    /// Display name: the `AS` name if given, else the column name.
    pub name: String,
    pub ft: FieldType,
    pub origin: ColumnOrigin,
    /// Position in the output schema.
    pub index: usize,
}

/// Ordered output columns of a plan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<OutputColumn>,
}

impl Schema {
    pub fn new(columns: Vec<OutputColumn>) -> Self {
        Self { columns }
    }

    pub const fn empty() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[OutputColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Find a column by display name, honouring an optional table qualifier.
    pub fn find_column(&self, name: &ColumnName) -> Option<&OutputColumn> {
        self.columns.iter().find(|c| {
            c.name.eq_ignore_ascii_case(&name.name)
                && name
                    .table
                    .as_deref()
                    .is_none_or(|t| t.eq_ignore_ascii_case(&c.table_alias))
        })
    }

    /// Append the hidden handle column, returning the new schema and its position.
    pub fn with_extra_handle(mut self) -> (Schema, usize) {
        let index = self.columns.len();
        let (db, orig_table, table_alias) = match self.columns.first() {
            Some(c) => (c.db.clone(), c.orig_table.clone(), c.table_alias.clone()),
            None => Default::default(),
        };
        self.columns.push(OutputColumn {
            db,
            orig_table,
            table_alias,
            name: EXTRA_HANDLE_NAME.to_string(),
            ft: FieldType::new(SqlType::BigInt),
            origin: ColumnOrigin::ExtraHandle,
            index,
        });
        (self, index)
    }
}

/// Resolve the select list into an output schema. An empty `fields` list
/// projects every column. `None` when any field cannot be statically bound
/// to a table column.
pub fn build_schema(
    db: &str,
    table: &TableMeta,
    table_alias: &str,
    fields: &[SelectField],
) -> Option<Schema> {
    let mut columns = Vec::with_capacity(table.columns.len() + 1);
    let output = |col: &ColumnMeta, name: &str, index: usize| OutputColumn {
        db: db.to_string(),
        orig_table: table.name.clone(),
        table_alias: table_alias.to_string(),
        name: name.to_string(),
        ft: col.ft.clone(),
        origin: ColumnOrigin::Table {
            id: col.id,
            offset: col.offset,
        },
        index,
    };

    if fields.is_empty() {
        for col in &table.columns {
            columns.push(output(col, &col.name, columns.len()));
        }
        return Some(Schema::new(columns));
    }

    for field in fields {
        match field {
            SelectField::Wildcard { table: qualifier } => {
                if qualifier.as_deref().is_some_and(|q| q != table_alias) {
                    return None;
                }
                for col in &table.columns {
                    columns.push(output(col, &col.name, columns.len()));
                }
            }
            SelectField::Expr {
                expr: Expr::Column(name),
                alias,
            } => {
                if !name.belongs_to(table_alias) {
                    return None;
                }
                let col = table.column(&name.name)?;
                let display = alias.as_deref().unwrap_or(&col.name);
                columns.push(output(col, display, columns.len()));
            }
            SelectField::Expr { .. } => return None,
        }
    }
    Some(Schema::new(columns))
}
