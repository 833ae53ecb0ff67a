//! SQL text generation for a [`TableSchema`].
//!
//! Every identifier is quoted, even when it would be legal bare, so keywords
//! and mixed-case names survive unchanged.

use std::fmt::Write as _;

use crate::schema::TableSchema;

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `CREATE TABLE IF NOT EXISTS "t" ("a" BIGINT, "b" TEXT);`
pub fn create_table_statement(schema: &TableSchema) -> String {
    let mut sql = String::from("CREATE TABLE IF NOT EXISTS ");
    sql.push_str(&quote_identifier(&schema.name));
    sql.push_str(" (");
    for (idx, column) in schema.columns.iter().enumerate() {
        if idx > 0 {
            sql.push_str(", ");
        }
        sql.push_str(&quote_identifier(&column.name));
        sql.push(' ');
        sql.push_str(column.data_type.sql_type());
    }
    sql.push_str(");");
    sql
}

/// `INSERT INTO "t" ("a", "b") VALUES ($1, $2);`
pub fn insert_statement(schema: &TableSchema) -> String {
    let mut sql = String::from("INSERT INTO ");
    sql.push_str(&quote_identifier(&schema.name));
    sql.push_str(" (");
    let columns = schema
        .column_names()
        .map(quote_identifier)
        .collect::<Vec<_>>();
    sql.push_str(&columns.join(", "));
    sql.push_str(") VALUES (");
    for idx in 0..schema.column_count() {
        if idx > 0 {
            sql.push_str(", ");
        }
        let _ = write!(sql, "${}", idx + 1);
    }
    sql.push_str(");");
    sql
}
