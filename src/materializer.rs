//! Turns a [`TableSchema`] and its data rows into a table in the store.

use crate::{
    error::ImportError,
    logger::Logger,
    schema::{DataType, TableSchema},
    sql,
    store::{Connection, Transaction},
};

const OP_CREATE: &str = "materializer.create";
const OP_SAVE: &str = "materializer.save_data";

#[derive(Debug, Clone)]
pub struct TableMaterializer {
    log: Logger,
}

impl TableMaterializer {
    pub fn new(log: Logger) -> Self {
        Self { log }
    }

    /// Issue `CREATE TABLE IF NOT EXISTS` for the schema. An existing table
    /// with the same name is left as is, whatever its columns.
    pub fn create<C: Connection>(
        &self,
        conn: &mut C,
        schema: &TableSchema,
    ) -> Result<(), ImportError> {
        let statement = sql::create_table_statement(schema);
        self.log.debug(format_args!("{OP_CREATE}: CREATE query is ready: {statement}"));
        conn.execute(&statement).map_err(|err| {
            ImportError::store(
                OP_CREATE,
                format!("failed to create table {}", schema.name),
                err,
            )
        })
    }

    /// Insert every row in one transaction. Either all rows become visible or
    /// none do.
    pub fn save_data<C: Connection>(
        &self,
        conn: &mut C,
        schema: &TableSchema,
        rows: &[Vec<String>],
    ) -> Result<(), ImportError> {
        if rows.is_empty() {
            return Ok(());
        }

        let booleans = conn.boolean_literals();
        let mut tx = conn
            .begin()
            .map_err(|err| ImportError::store(OP_SAVE, "failed to begin transaction", err))?;

        let statement = sql::insert_statement(schema);
        self.log.debug(format_args!("{OP_SAVE}: INSERT query is ready: {statement}"));
        let insert = match tx.prepare(&statement) {
            Ok(prepared) => prepared,
            Err(err) => {
                self.rollback(tx);
                return Err(ImportError::store(OP_SAVE, "failed to prepare statement", err));
            }
        };

        for (idx, row) in rows.iter().enumerate() {
            let params = bind_row(schema, row, booleans);
            if let Err(err) = tx.exec(&insert, &params) {
                self.rollback(tx);
                return Err(ImportError::store(
                    OP_SAVE,
                    format!("failed to insert row {}", idx + 1),
                    err,
                ));
            }
        }

        tx.commit()
            .map_err(|err| ImportError::store(OP_SAVE, "failed to commit transaction", err))?;
        self.log.debug(format_args!(
            "{OP_SAVE}: inserted {} row(s) into '{}'",
            rows.len(),
            schema.name
        ));
        Ok(())
    }

    /// The primary error is already on its way to the caller; a failed
    /// rollback is only worth a log line.
    fn rollback<T: Transaction>(&self, tx: T) {
        if let Err(err) = tx.rollback() {
            self.log.warn(format_args!("{OP_SAVE}: rollback failed: {err}"));
        }
    }
}

/// Parameters for one row, exactly one per schema column.
///
/// Cells past the schema are dropped and missing cells bind NULL. A blank
/// cell bound to a typed column also binds NULL, since the store cannot cast
/// an empty string to a number or boolean. Boolean cells bind the store's
/// `(true, false)` literals whatever their case.
pub fn bind_row<'a>(
    schema: &TableSchema,
    row: &'a [String],
    (truthy, falsy): (&'a str, &'a str),
) -> Vec<Option<&'a str>> {
    schema
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let cell = row.get(idx)?;
            let value = cell.trim();
            match column.data_type {
                DataType::String | DataType::Unknown => Some(cell.as_str()),
                _ if value.is_empty() => None,
                DataType::Boolean if value.eq_ignore_ascii_case("true") => Some(truthy),
                DataType::Boolean if value.eq_ignore_ascii_case("false") => Some(falsy),
                _ => Some(cell.as_str()),
            }
        })
        .collect()
}
