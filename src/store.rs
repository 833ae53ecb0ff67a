//! Relational store seam.
//!
//! The materializer only needs two things from a database: run a statement,
//! and run a prepared statement repeatedly inside a transaction. [`Connection`]
//! and [`Transaction`] describe exactly that; [`SqliteConnection`] implements
//! them over `rusqlite`.

use std::path::Path;

use rusqlite::{OpenFlags, params_from_iter};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0}")]
    Backend(String),
}

/// A statement prepared inside a transaction, executed with positional
/// `$n` parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    sql: String,
}

impl Prepared {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

pub trait Connection {
    type Tx<'c>: Transaction
    where
        Self: 'c;

    fn execute(&mut self, sql: &str) -> Result<(), StoreError>;

    fn begin(&mut self) -> Result<Self::Tx<'_>, StoreError>;

    /// Text bound for `true` and `false` cells of a BOOLEAN column.
    fn boolean_literals(&self) -> (&'static str, &'static str) {
        ("true", "false")
    }
}

/// Dropping a transaction without calling [`Transaction::commit`] must
/// discard its work.
pub trait Transaction {
    fn prepare(&mut self, sql: &str) -> Result<Prepared, StoreError>;

    /// Run a prepared statement. `None` binds SQL NULL.
    fn exec(
        &mut self,
        statement: &Prepared,
        params: &[Option<&str>],
    ) -> Result<usize, StoreError>;

    fn commit(self) -> Result<(), StoreError>;

    fn rollback(self) -> Result<(), StoreError>;
}

pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = rusqlite::Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: rusqlite::Connection::open_in_memory()?,
        })
    }

    /// Underlying handle, for callers that want to query what was loaded.
    pub fn raw(&self) -> &rusqlite::Connection {
        &self.conn
    }
}

impl Connection for SqliteConnection {
    type Tx<'c> = SqliteTransaction<'c>;

    fn execute(&mut self, sql: &str) -> Result<(), StoreError> {
        self.conn.execute(sql, [])?;
        Ok(())
    }

    fn begin(&mut self) -> Result<SqliteTransaction<'_>, StoreError> {
        Ok(SqliteTransaction {
            tx: self.conn.transaction()?,
        })
    }

    /// SQLite keeps bound text as text even in a BOOLEAN column, so booleans
    /// are bound as the integers it uses for them.
    fn boolean_literals(&self) -> (&'static str, &'static str) {
        ("1", "0")
    }
}

pub struct SqliteTransaction<'c> {
    tx: rusqlite::Transaction<'c>,
}

impl Transaction for SqliteTransaction<'_> {
    fn prepare(&mut self, sql: &str) -> Result<Prepared, StoreError> {
        self.tx.prepare_cached(sql)?;
        Ok(Prepared::new(sql))
    }

    fn exec(
        &mut self,
        statement: &Prepared,
        params: &[Option<&str>],
    ) -> Result<usize, StoreError> {
        let mut stmt = self.tx.prepare_cached(statement.sql())?;
        let changed = stmt.execute(params_from_iter(params.iter()))?;
        Ok(changed)
    }

    fn commit(self) -> Result<(), StoreError> {
        self.tx.commit()?;
        Ok(())
    }

    fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback()?;
        Ok(())
    }
}
