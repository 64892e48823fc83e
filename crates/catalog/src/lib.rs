use std::{fs, path::Path};

use ahash::RandomState;
use common::{ColumnId, DbError, DbResult, IndexId, TableId};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use types::FieldType;

type Map<K, V> = HashMap<K, V, RandomState>;

/// Name under which a table's non-handle primary key index is registered.
pub const PRIMARY_INDEX_NAME: &str = "primary";

/// Persistent catalog that stores table schemas and index metadata, keyed
/// by `(database, table)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Catalog {
    tables: Vec<TableMeta>,
    next_table_id: u64,
    next_index_id: u64,
    #[serde(skip)]
    #[serde(default)]
    table_name_index: Map<(String, String), usize>,
    #[serde(skip)]
    #[serde(default)]
    table_id_index: Map<TableId, usize>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        let mut catalog = Self {
            tables: Vec::new(),
            next_table_id: 1,
            next_index_id: 1,
            table_name_index: Map::default(),
            table_id_index: Map::default(),
        };
        catalog.rebuild_indexes();
        catalog
    }

    /// Load a catalog from disk, returning an empty catalog if the file does not exist.
    pub fn load(path: &Path) -> DbResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let data = fs::read_to_string(path)?;
        let mut catalog: Catalog = serde_json::from_str(&data)
            .map_err(|err| DbError::Catalog(format!("invalid catalog file: {err}")))?;
        catalog.rebuild_indexes();
        Ok(catalog)
    }

    /// Persist the catalog contents as pretty JSON.
    pub fn save(&self, path: &Path) -> DbResult<()> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|err| DbError::Catalog(format!("serialize failed: {err}")))?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Build a catalog from a JSON array of [`TableDef`]s, assigning ids in order.
    pub fn from_definitions(json: &str) -> DbResult<Self> {
        let defs: Vec<TableDef> = serde_json::from_str(json)
            .map_err(|err| DbError::Catalog(format!("invalid table definitions: {err}")))?;
        let mut catalog = Self::new();
        for def in defs {
            catalog.create_table(def)?;
        }
        Ok(catalog)
    }

    /// Returns an immutable reference to a table by database and name.
    /// Names are matched case-insensitively.
    pub fn table(&self, db: &str, name: &str) -> DbResult<&TableMeta> {
        let idx = self.position(db, name)?;
        self.tables
            .get(idx)
            .ok_or_else(|| DbError::Catalog(format!("unknown table '{db}.{name}'")))
    }

    /// Returns an immutable reference to a table by identifier.
    pub fn table_by_id(&self, id: TableId) -> DbResult<&TableMeta> {
        let idx = self
            .table_id_index
            .get(&id)
            .copied()
            .ok_or_else(|| DbError::Catalog(format!("unknown table id {}", id.0)))?;
        self.tables
            .get(idx)
            .ok_or_else(|| DbError::Catalog(format!("unknown table id {}", id.0)))
    }

    /// Mutable access, used to move columns and indexes through schema states.
    pub fn table_mut(&mut self, db: &str, name: &str) -> DbResult<&mut TableMeta> {
        let idx = self.position(db, name)?;
        self.tables
            .get_mut(idx)
            .ok_or_else(|| DbError::Catalog(format!("unknown table '{db}.{name}'")))
    }

    /// Immutable iterator over all tables.
    pub fn tables(&self) -> impl Iterator<Item = &TableMeta> {
        self.tables.iter()
    }

    /// Validate and register a table, returning its identifier.
    pub fn create_table(&mut self, def: TableDef) -> DbResult<TableId> {
        let db = def.db.to_lowercase();
        let name = def.name.to_lowercase();
        if db.is_empty() || name.is_empty() {
            return Err(DbError::Catalog(
                "table and database names must not be empty".into(),
            ));
        }
        if self
            .table_name_index
            .contains_key(&(db.clone(), name.clone()))
        {
            return Err(DbError::Catalog(format!(
                "table '{db}.{name}' already exists"
            )));
        }

        let columns = build_columns(def.columns)?;
        let pk: Vec<&ColumnMeta> = columns.iter().filter(|c| c.primary_key).collect();
        let pk_is_handle = matches!(pk.as_slice(), [col] if col.ft.tp.is_integer());

        let mut index_defs = def.indexes;
        if !pk.is_empty() && !pk_is_handle {
            let names: Vec<&str> = pk.iter().map(|c| c.name.as_str()).collect();
            index_defs.insert(0, IndexDef::primary(&names));
        }

        let mut indexes = Vec::with_capacity(index_defs.len());
        for index in index_defs {
            let id = IndexId(self.next_index_id);
            let meta = build_index(id, index, &columns)?;
            if indexes.iter().any(|i: &IndexMeta| i.name == meta.name) {
                return Err(DbError::Catalog(format!(
                    "index '{}' already exists on table '{name}'",
                    meta.name
                )));
            }
            self.next_index_id += 1;
            indexes.push(meta);
        }

        let table_id = TableId(self.next_table_id);
        self.next_table_id += 1;
        self.tables.push(TableMeta {
            id: table_id,
            db,
            name,
            columns,
            pk_is_handle,
            indexes,
            partition: def.partition,
        });
        self.rebuild_indexes();
        Ok(table_id)
    }

    fn position(&self, db: &str, name: &str) -> DbResult<usize> {
        self.table_name_index
            .get(&(db.to_lowercase(), name.to_lowercase()))
            .copied()
            .ok_or_else(|| DbError::Catalog(format!("unknown table '{db}.{name}'")))
    }

    fn rebuild_indexes(&mut self) {
        self.table_name_index.clear();
        self.table_id_index.clear();
        for (idx, table) in self.tables.iter().enumerate() {
            self.table_name_index
                .insert((table.db.clone(), table.name.clone()), idx);
            self.table_id_index.insert(table.id, idx);
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

fn build_columns(defs: Vec<ColumnDef>) -> DbResult<Vec<ColumnMeta>> {
    if defs.is_empty() {
        return Err(DbError::Catalog(
            "table must contain at least one column".into(),
        ));
    }
    if defs.len() >= ColumnId::MAX as usize {
        return Err(DbError::Catalog(
            "too many columns for a single table".into(),
        ));
    }
    let mut seen = Map::default();
    let mut columns = Vec::with_capacity(defs.len());
    for (offset, def) in defs.into_iter().enumerate() {
        let name = def.name.to_lowercase();
        if seen.insert(name.clone(), offset).is_some() {
            return Err(DbError::Catalog(format!(
                "duplicate column '{name}' found while building schema"
            )));
        }
        columns.push(ColumnMeta {
            id: offset as ColumnId + 1,
            name,
            offset,
            ft: def.ft,
            primary_key: def.primary_key,
            generated: def.generated,
            state: def.state,
        });
    }
    Ok(columns)
}

fn build_index(id: IndexId, def: IndexDef, columns: &[ColumnMeta]) -> DbResult<IndexMeta> {
    let name = def.name.to_lowercase();
    if def.columns.is_empty() {
        return Err(DbError::Catalog(format!(
            "index '{name}' must reference at least one column"
        )));
    }
    let mut resolved = Vec::with_capacity(def.columns.len());
    for part in def.columns {
        let col_name = part.name.to_lowercase();
        let column = columns
            .iter()
            .find(|c| c.name == col_name)
            .ok_or_else(|| {
                DbError::Catalog(format!("unknown column '{col_name}' in index '{name}'"))
            })?;
        if part.prefix_len.is_some() && !column.ft.tp.is_string() {
            return Err(DbError::Catalog(format!(
                "prefix length on non-string column '{col_name}' in index '{name}'"
            )));
        }
        resolved.push(IndexColumn {
            name: col_name,
            offset: column.offset,
            prefix_len: part.prefix_len,
        });
    }
    Ok(IndexMeta {
        id,
        name,
        columns: resolved,
        unique: def.unique || def.primary,
        primary: def.primary,
        state: def.state,
    })
}

/// Lifecycle state of a column or index during an online schema change.
/// Only `Public` objects are visible to reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaState {
    DeleteOnly,
    WriteOnly,
    WriteReorganization,
    DeleteReorganization,
    #[default]
    Public,
}

/// Metadata describing a registered table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableMeta {
    pub id: TableId,
    pub db: String,
    pub name: String,
    pub columns: Vec<ColumnMeta>,
    /// Row identity is the single integer primary key column.
    pub pk_is_handle: bool,
    pub indexes: Vec<IndexMeta>,
    pub partition: Option<PartitionInfo>,
}

impl TableMeta {
    /// Case-insensitive column lookup.
    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut ColumnMeta> {
        self.columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// The integer primary key column when it doubles as the row handle.
    pub fn handle_column(&self) -> Option<&ColumnMeta> {
        if !self.pk_is_handle {
            return None;
        }
        self.columns.iter().find(|c| c.primary_key)
    }

    /// Lookup an index by name.
    pub fn index(&self, name: &str) -> DbResult<&IndexMeta> {
        self.indexes
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                DbError::Catalog(format!(
                    "index '{name}' does not exist on table '{}'",
                    self.name
                ))
            })
    }

    pub fn index_mut(&mut self, name: &str) -> DbResult<&mut IndexMeta> {
        let table = self.name.clone();
        self.indexes
            .iter_mut()
            .find(|i| i.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                DbError::Catalog(format!("index '{name}' does not exist on table '{table}'"))
            })
    }

    pub fn is_partitioned(&self) -> bool {
        self.partition.is_some()
    }

    pub fn has_generated_columns(&self) -> bool {
        self.columns.iter().any(|c| c.generated.is_some())
    }

    pub fn all_columns_public(&self) -> bool {
        self.columns.iter().all(|c| c.state == SchemaState::Public)
    }
}

/// Describes a column within a table.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnMeta {
    pub id: ColumnId,
    /// Lower-cased column name.
    pub name: String,
    /// Position in declaration order.
    pub offset: usize,
    pub ft: FieldType,
    pub primary_key: bool,
    /// Expression text of a generated column.
    pub generated: Option<String>,
    pub state: SchemaState,
}

/// Metadata describing a table index.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexMeta {
    pub id: IndexId,
    pub name: String,
    pub columns: Vec<IndexColumn>,
    pub unique: bool,
    pub primary: bool,
    pub state: SchemaState,
}

impl IndexMeta {
    /// True when any key part only covers a prefix of its column.
    pub fn has_prefix(&self) -> bool {
        self.columns.iter().any(|c| c.prefix_len.is_some())
    }

    pub fn is_public(&self) -> bool {
        self.state == SchemaState::Public
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexColumn {
    pub name: String,
    /// Offset of the column in the table.
    pub offset: usize,
    pub prefix_len: Option<u32>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PartitionKind {
    Range,
    Hash,
    List,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartitionInfo {
    pub kind: PartitionKind,
    pub expr: String,
    pub partitions: u32,
}

/// Table definition as accepted by [`Catalog::create_table`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableDef {
    pub db: String,
    pub name: String,
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub indexes: Vec<IndexDef>,
    #[serde(default)]
    pub partition: Option<PartitionInfo>,
}

impl TableDef {
    pub fn new(db: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            partition: None,
        }
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn partition(mut self, partition: PartitionInfo) -> Self {
        self.partition = Some(partition);
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub ft: FieldType,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub generated: Option<String>,
    #[serde(default)]
    pub state: SchemaState,
}

#[bon::bon]
impl ColumnDef {
    /// Column definition built with a builder.
    ///
    /// # Example
    /// ```ignore
    /// let id = ColumnDef::builder()
    ///     .name("id")
    ///     .ft(FieldType::new(SqlType::BigInt))
    ///     .primary_key(true)
    ///     .build();
    /// ```
    #[builder]
    pub fn new(
        #[builder(into)] name: String,
        #[builder(into)] ft: FieldType,
        #[builder(default)] primary_key: bool,
        #[builder(into)] generated: Option<String>,
        #[builder(default)] state: SchemaState,
    ) -> Self {
        Self {
            name,
            ft,
            primary_key,
            generated,
            state,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<IndexPartDef>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub state: SchemaState,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexPartDef {
    pub name: String,
    #[serde(default)]
    pub prefix_len: Option<u32>,
}

impl IndexDef {
    fn with_columns(name: &str, columns: &[&str], unique: bool) -> Self {
        Self {
            name: name.to_string(),
            columns: columns
                .iter()
                .map(|c| IndexPartDef {
                    name: c.to_string(),
                    prefix_len: None,
                })
                .collect(),
            unique,
            primary: false,
            state: SchemaState::Public,
        }
    }

    pub fn unique(name: &str, columns: &[&str]) -> Self {
        Self::with_columns(name, columns, true)
    }

    pub fn non_unique(name: &str, columns: &[&str]) -> Self {
        Self::with_columns(name, columns, false)
    }

    pub fn primary(columns: &[&str]) -> Self {
        Self {
            primary: true,
            ..Self::with_columns(PRIMARY_INDEX_NAME, columns, true)
        }
    }

    /// Index only the first `len` characters of `column`.
    pub fn prefix(mut self, column: &str, len: u32) -> Self {
        for part in &mut self.columns {
            if part.name.eq_ignore_ascii_case(column) {
                part.prefix_len = Some(len);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use types::SqlType;

    fn col(name: &str, tp: SqlType) -> ColumnDef {
        ColumnDef::builder().name(name).ft(tp).build()
    }

    fn users() -> TableDef {
        TableDef::new("test", "Users")
            .column(
                ColumnDef::builder()
                    .name("id")
                    .ft(FieldType::new(SqlType::BigInt))
                    .primary_key(true)
                    .build(),
            )
            .column(col("Name", SqlType::Varchar))
            .column(col("age", SqlType::Int))
            .index(IndexDef::unique("uk_name_age", &["name", "age"]))
    }

    #[test]
    fn create_and_lookup_table() {
        let mut catalog = Catalog::new();
        let table_id = catalog.create_table(users()).unwrap();

        assert_eq!(table_id, TableId(1));

        let table = catalog.table("TEST", "users").unwrap();
        assert!(table.pk_is_handle);
        assert_eq!(table.handle_column().map(|c| c.name.as_str()), Some("id"));
        assert_eq!(table.column("NAME").map(|c| c.offset), Some(1));
        assert_eq!(table.column("age").map(|c| c.id), Some(3));

        let index = table.index("uk_name_age").unwrap();
        assert!(index.unique && index.is_public() && !index.has_prefix());
        assert_eq!(index.columns[1].offset, 2);

        let same_table = catalog.table_by_id(table_id).unwrap();
        assert_eq!(same_table.name, "users");
    }

    #[test]
    fn non_integer_primary_key_becomes_index() {
        let mut catalog = Catalog::new();
        catalog
            .create_table(
                TableDef::new("test", "kv").column(
                    ColumnDef::builder()
                        .name("k")
                        .ft(SqlType::Varchar)
                        .primary_key(true)
                        .build(),
                ),
            )
            .unwrap();

        let table = catalog.table("test", "kv").unwrap();
        assert!(!table.pk_is_handle);
        assert!(table.handle_column().is_none());
        let primary = table.index(PRIMARY_INDEX_NAME).unwrap();
        assert!(primary.primary && primary.unique);
    }

    #[test]
    fn composite_primary_key_is_not_a_handle() {
        let mut catalog = Catalog::new();
        let pk = |name: &str| {
            ColumnDef::builder()
                .name(name)
                .ft(SqlType::Int)
                .primary_key(true)
                .build()
        };
        catalog
            .create_table(TableDef::new("test", "t").column(pk("a")).column(pk("b")))
            .unwrap();
        let table = catalog.table("test", "t").unwrap();
        assert!(!table.pk_is_handle);
        assert_eq!(
            table.index(PRIMARY_INDEX_NAME).unwrap().column_names().collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn rejects_duplicate_tables() {
        let mut catalog = Catalog::new();
        catalog.create_table(users()).unwrap();
        let err = catalog.create_table(users()).unwrap_err();

        assert!(matches!(err, DbError::Catalog(_)));
        assert!(format!("{err}").contains("already exists"));
    }

    #[test]
    fn same_table_name_in_other_database() {
        let mut catalog = Catalog::new();
        catalog.create_table(users()).unwrap();
        let mut other = users();
        other.db = "prod".into();
        assert_eq!(catalog.create_table(other).unwrap(), TableId(2));
        assert_eq!(catalog.table("prod", "users").unwrap().id, TableId(2));
    }

    #[test]
    fn rejects_duplicate_columns() {
        let mut catalog = Catalog::new();
        let err = catalog
            .create_table(
                TableDef::new("test", "bad")
                    .column(col("id", SqlType::Int))
                    .column(col("ID", SqlType::Int)),
            )
            .unwrap_err();
        assert!(format!("{err}").contains("duplicate column"));
    }

    #[test]
    fn index_creation_validates_columns() {
        let mut catalog = Catalog::new();
        let err = catalog
            .create_table(users().index(IndexDef::unique("idx_missing", &["missing"])))
            .unwrap_err();
        assert!(format!("{err}").contains("unknown column"));

        let err = catalog
            .create_table(users().index(IndexDef::unique("idx_age", &["age"]).prefix("age", 2)))
            .unwrap_err();
        assert!(format!("{err}").contains("prefix length"));
    }

    #[test]
    fn prefix_and_state_metadata() {
        let mut catalog = Catalog::new();
        catalog
            .create_table(users().index(IndexDef::unique("uk_name", &["name"]).prefix("name", 4)))
            .unwrap();
        let table = catalog.table_mut("test", "users").unwrap();
        assert!(table.index("uk_name").unwrap().has_prefix());

        table.index_mut("uk_name_age").unwrap().state = SchemaState::WriteOnly;
        assert!(!table.index("uk_name_age").unwrap().is_public());

        assert!(table.all_columns_public());
        if let Some(column) = table.column_mut("age") {
            column.state = SchemaState::DeleteOnly;
        }
        assert!(!table.all_columns_public());
    }

    #[test]
    fn definitions_from_json() {
        let json = r#"[
            {
                "db": "test",
                "name": "t",
                "columns": [
                    {"name": "id", "ft": {"tp": "BigInt", "unsigned": true}, "primary_key": true},
                    {"name": "b", "ft": {"tp": "Varchar", "flen": 20}},
                    {"name": "c", "ft": {"tp": "Int"}, "generated": "id + 1"}
                ],
                "indexes": [{"name": "uk_b", "columns": [{"name": "b"}], "unique": true}],
                "partition": {"kind": "hash", "expr": "id", "partitions": 4}
            }
        ]"#;
        let catalog = Catalog::from_definitions(json).unwrap();
        let table = catalog.table("test", "t").unwrap();
        assert!(table.pk_is_handle);
        assert!(table.columns[0].ft.unsigned);
        assert!(table.has_generated_columns());
        assert!(table.is_partitioned());
        assert!(table.index("uk_b").unwrap().unique);
    }

    #[test]
    fn persistence_round_trip() {
        let mut catalog = Catalog::new();
        catalog.create_table(users()).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        catalog.save(&path).unwrap();

        let loaded = Catalog::load(&path).unwrap();
        let table = loaded.table("test", "users").unwrap();
        assert_eq!(
            table.index("uk_name_age").unwrap().column_names().collect::<Vec<_>>(),
            vec!["name", "age"]
        );
        assert_eq!(loaded.table_by_id(TableId(1)).unwrap().name, "users");

        let missing = Catalog::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(missing.tables().count(), 0);
    }
}
