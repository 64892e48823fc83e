use super::*;

#[test]
fn db_error_formats_cleanly() {
    let err = DbError::Catalog("unknown table 't'".into());
    assert_eq!(format!("{err}"), "catalog: unknown table 't'");
}

#[test]
fn io_error_converts() {
    let e = io::Error::other("oops");
    let err: DbError = e.into();
    assert!(matches!(err, DbError::Io(_)));
}

#[test]
fn ids_order_by_value() {
    assert!(TableId(1) < TableId(2));
    assert_eq!(IndexId(3), IndexId(3));
}
