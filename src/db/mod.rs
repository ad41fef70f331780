//! Relational storage
//!
//! [`Store`] is the capability the rest of the crate consumes: run a
//! statement, probe for existence, create a table. [`SqliteStore`] is the
//! engine behind it.

pub mod download_info;
pub mod gateway;
pub mod rows;
pub mod schema;
pub mod statement;

pub use gateway::PersistenceGateway;
pub use rows::ToInsert;
pub use schema::{get_or_create_table, Catalog, Column, ColumnType, TableDef, TableHandle};
pub use statement::{Insert, Statement};

use crate::error::Result;
use parking_lot::Mutex;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;

/// Outcome of a write statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: usize,
    pub last_insert_rowid: i64,
}

/// Storage capability
pub trait Store: Send + Sync {
    /// Run a write statement
    fn execute(&self, statement: &Statement) -> Result<ExecResult>;

    /// Run a query returning a single boolean (e.g. `SELECT EXISTS(...)`)
    fn exists(&self, statement: &Statement) -> Result<bool>;

    fn table_exists(&self, name: &str) -> Result<bool>;

    fn create_table(&self, table: &TableDef) -> Result<()>;
}

/// SQLite database wrapper
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        tracing::debug!("Opened SQLite store at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Count rows in `table`
    pub fn count_rows(&self, table: &str) -> Result<i64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM \"{}\"", table),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Run `f` against the raw connection (queries outside the `Store` surface)
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        f(&conn)
    }
}

impl Store for SqliteStore {
    fn execute(&self, statement: &Statement) -> Result<ExecResult> {
        let conn = self.conn.lock();
        let rows_affected =
            conn.execute(statement.sql(), params_from_iter(statement.params().iter()))?;

        Ok(ExecResult {
            rows_affected,
            last_insert_rowid: conn.last_insert_rowid(),
        })
    }

    fn exists(&self, statement: &Statement) -> Result<bool> {
        let conn = self.conn.lock();
        let found: bool = conn.query_row(
            statement.sql(),
            params_from_iter(statement.params().iter()),
            |row| row.get(0),
        )?;
        Ok(found)
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [name],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn create_table(&self, table: &TableDef) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(&table.create_sql())?;
        Ok(())
    }
}
