//! SQLite Query Gateway
//!
//! File-based persistent storage using SQLite (bundled).
//! One connection behind an async mutex; a transaction holds the lock
//! until it commits, rolls back or is dropped.
use async_trait::async_trait;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{Connection, ToSql};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::domain::{GatewayTransaction, QueryGateway, Row, SqlValue, StatementExecutor};
use crate::error::{CatalogError, Result};

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS molecule (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        formula TEXT NOT NULL,
        mass REAL NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_molecule_name ON molecule(name);

    CREATE TABLE IF NOT EXISTS equivalent (
        id_mol_0 INTEGER NOT NULL,
        id_mol_1 INTEGER NOT NULL,
        PRIMARY KEY (id_mol_0, id_mol_1),
        FOREIGN KEY (id_mol_0) REFERENCES molecule(id) ON DELETE CASCADE,
        FOREIGN KEY (id_mol_1) REFERENCES molecule(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS synonym (
        id_mol INTEGER NOT NULL,
        name TEXT NOT NULL,
        PRIMARY KEY (id_mol, name),
        FOREIGN KEY (id_mol) REFERENCES molecule(id) ON DELETE CASCADE
    );
";

/// SQLite-based QueryGateway implementation
#[derive(Clone)]
pub struct SqliteGateway {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteGateway {
    /// Open (or create) a database file and ensure the schema exists
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    /// Create an in-memory SQLite gateway (for testing)
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// `:memory:` selects an in-memory database, anything else is a file path
    pub fn from_location(location: &str) -> Result<Self> {
        if location == ":memory:" {
            Self::in_memory()
        } else {
            Self::open(location)
        }
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            SqlValue::Real(v) => ToSqlOutput::Owned(Value::Real(*v)),
            SqlValue::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
        })
    }
}

/// Run one statement and collect every row by column name
fn run(conn: &Connection, statement: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(statement)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Row::new();
        for (idx, name) in columns.iter().enumerate() {
            let value = match row.get_ref(idx)? {
                ValueRef::Null => SqlValue::Null,
                ValueRef::Integer(v) => SqlValue::Integer(v),
                ValueRef::Real(v) => SqlValue::Real(v),
                ValueRef::Text(t) => match std::str::from_utf8(t) {
                    Ok(text) => SqlValue::Text(text.to_string()),
                    Err(e) => {
                        return Err(CatalogError::serialization(format!(
                            "column '{}': invalid UTF-8 text",
                            name
                        ))
                        .with_source(e))
                    }
                },
                ValueRef::Blob(_) => {
                    return Err(CatalogError::serialization(format!(
                        "column '{}': BLOB values are not supported",
                        name
                    )))
                }
            };
            record.insert(name.clone(), value);
        }
        out.push(record);
    }
    Ok(out)
}

fn control(conn: &Connection, command: &str) -> Result<()> {
    conn.execute_batch(command).map_err(|e| {
        CatalogError::transaction(format!("{} failed: {}", command, e)).with_source(e)
    })
}

#[async_trait]
impl QueryGateway for SqliteGateway {
    async fn execute(&self, statement: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let conn = self.conn.lock().await;
        run(&conn, statement, params)
    }

    async fn begin<'a>(&'a self) -> Result<Box<dyn GatewayTransaction + 'a>> {
        let conn = self.conn.lock().await;
        control(&conn, "BEGIN")?;
        debug!("sqlite transaction opened");
        Ok(Box::new(SqliteTransaction {
            conn,
            finished: false,
        }))
    }
}

/// Open SQLite transaction, owns the connection lock
pub struct SqliteTransaction<'a> {
    conn: MutexGuard<'a, Connection>,
    finished: bool,
}

impl SqliteTransaction<'_> {
    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            return Err(CatalogError::transaction("transaction already finished"));
        }
        Ok(())
    }
}

#[async_trait]
impl StatementExecutor for SqliteTransaction<'_> {
    async fn execute(&mut self, statement: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        self.ensure_open()?;
        run(&self.conn, statement, params)
    }
}

#[async_trait]
impl GatewayTransaction for SqliteTransaction<'_> {
    async fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.finished = true;
        if let Err(e) = control(&self.conn, "COMMIT") {
            // A failed COMMIT leaves SQLite inside the transaction
            let _ = self.conn.execute_batch("ROLLBACK");
            return Err(e);
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        control(&self.conn, "ROLLBACK")
    }
}

impl Drop for SqliteTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("sqlite transaction dropped without commit, rolling back");
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!(error = %e, "rollback on drop failed");
            }
        }
    }
}
