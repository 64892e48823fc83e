use tabled::{Table, Tabled, builder::Builder, settings};
use types::Value;

/// Predefined output styles that map to `tabled` styles.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TableStyleKind {
    #[default]
    Modern,
    Ascii,
    Plain,
}

impl TableStyleKind {
    fn apply(self, table: &mut Table) {
        match self {
            Self::Modern => table.with(settings::Style::modern()),
            Self::Ascii => table.with(settings::Style::ascii()),
            Self::Plain => table.with(settings::Style::empty()),
        };
    }
}

/// Render arbitrary string rows with the provided style.
pub fn render_string_table(
    headers: &[&str],
    rows: Vec<Vec<String>>,
    style: TableStyleKind,
) -> String {
    if headers.is_empty() && rows.is_empty() {
        return "<empty>".into();
    }

    let mut builder = Builder::default();

    if !headers.is_empty() {
        builder.push_record(headers.iter().copied());
    }

    for row in rows {
        builder.push_record(row);
    }

    let mut table = builder.build();
    style.apply(&mut table);
    table.to_string()
}

/// Render any `Tabled` rows with the provided style.
pub fn render_structured_rows<T>(rows: &[T], style: TableStyleKind) -> String
where
    T: Tabled + Clone,
{
    if rows.is_empty() {
        return "<empty>".into();
    }

    let mut table = Table::new(rows.to_vec());
    style.apply(&mut table);
    table.to_string()
}

/// Format a list of values into a comma-separated string.
pub fn format_row(values: &[Value]) -> String {
    values
        .iter()
        .map(format_value)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format a single value for display, quoting strings.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Text(text) => format!("'{}'", text),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Tabled)]
    struct Pair {
        key: String,
        value: String,
    }

    #[test]
    fn string_table_renders_headers() {
        let rendered = render_string_table(
            &["id", "name"],
            vec![vec!["1".into(), "'Ada'".into()]],
            TableStyleKind::Ascii,
        );
        assert!(rendered.contains("id"));
        assert!(rendered.contains("'Ada'"));
    }

    #[test]
    fn empty_tables_render_placeholder() {
        assert_eq!(
            render_string_table(&[], vec![], TableStyleKind::Plain),
            "<empty>"
        );
        assert_eq!(
            render_structured_rows::<Pair>(&[], TableStyleKind::Plain),
            "<empty>"
        );
    }

    #[test]
    fn values_format_with_quoted_text() {
        let row = vec![Value::Int(1), Value::Text("a".into()), Value::Null];
        assert_eq!(format_row(&row), "1, 'a', NULL");
    }
}
