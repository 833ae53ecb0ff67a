//! Plain-text rendering of an inferred schema for the terminal.

use std::fmt::Write as _;

use crate::schema::TableSchema;

const HEADERS: [&str; 4] = ["#", "column", "type", "sql type"];

/// One line per column: position, name, inferred type and store type.
pub fn render_schema(schema: &TableSchema) -> String {
    let rows = schema
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            [
                (idx + 1).to_string(),
                printable(&column.name),
                column.data_type.to_string(),
                column.data_type.sql_type().to_string(),
            ]
        })
        .collect::<Vec<_>>();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "Table: {}", schema.name);
    let _ = writeln!(output, "{}", format_line(HEADERS.map(str::to_string).as_slice(), &widths));
    let rule = widths.map(|w| "-".repeat(w));
    let _ = writeln!(output, "{}", format_line(&rule, &widths));
    for row in &rows {
        let _ = writeln!(output, "{}", format_line(row, &widths));
    }
    output
}

pub fn print_schema(schema: &TableSchema) {
    print!("{}", render_schema(schema));
}

fn format_line(cells: &[String], widths: &[usize]) -> String {
    let mut line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    line.truncate(line.trim_end().len());
    line
}

/// Header cells can carry line breaks or tabs; keep each column on one line.
fn printable(name: &str) -> String {
    name.replace(['\n', '\r', '\t'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, DataType};

    #[test]
    fn renders_aligned_columns() {
        let schema = TableSchema::new(
            "people",
            vec![
                Column::new("id", DataType::Integer),
                Column::new("full\nname", DataType::String),
            ],
        );
        let rendered = render_schema(&schema);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "Table: people");
        assert_eq!(lines[1], "#  column     type     sql type");
        assert_eq!(lines[2], "-  ---------  -------  --------");
        assert_eq!(lines[3], "1  id         Integer  BIGINT");
        assert_eq!(lines[4], "2  full name  String   TEXT");
    }
}
