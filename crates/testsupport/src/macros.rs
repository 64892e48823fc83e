//! Declarative shorthand for catalog fixtures.

/// Builds a [`catalog::TableDef`] from a column list.
///
/// # Syntax
///
/// ```text
/// table_def!("db", "table", ["col" => FieldTypeExpr, ...])
/// table_def!("db", "table", ["col" => FieldTypeExpr, ...], pk: ["col", ...])
/// ```
///
/// Column types accept anything that converts into a `FieldType`, so plain
/// `SqlType` variants work. Indexes and partitioning are chained onto the
/// returned definition.
///
/// # Examples
///
/// ```
/// use testsupport::table_def;
/// use types::SqlType;
///
/// let def = table_def!("test", "t", ["id" => SqlType::BigInt, "a" => SqlType::Int], pk: ["id"]);
/// assert_eq!(def.columns.len(), 2);
/// assert!(def.columns[0].primary_key);
/// ```
#[macro_export]
macro_rules! table_def {
    ($db:expr, $table:expr, [$($col:expr => $ft:expr),* $(,)?]) => {
        $crate::table_def!($db, $table, [$($col => $ft),*], pk: [])
    };
    ($db:expr, $table:expr, [$($col:expr => $ft:expr),* $(,)?], pk: [$($pk:expr),* $(,)?]) => {{
        let pk: &[&str] = &[$($pk),*];
        let mut def = ::catalog::TableDef::new($db, $table);
        $(
            def = def.column(
                ::catalog::ColumnDef::builder()
                    .name($col)
                    .ft($ft)
                    .primary_key(pk.contains(&$col))
                    .build(),
            );
        )*
        def
    }};
}
