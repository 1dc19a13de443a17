//! Query Gateway Port (Trait Interface)
//!
//! The catalog never manages connections. Every statement goes through a
//! `QueryGateway`, either directly (single reads) or through a scoped
//! `GatewayTransaction` (multi-statement writes).
//!
//! - Production/CLI: `SqliteGateway`
//! - Testing: `RecordingGateway` (scripted responses, statement log)
//!
//! Statements use `?N` positional placeholders.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CatalogError, Result};

/// Statement parameter / column value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<&i64> for SqlValue {
    fn from(v: &i64) -> Self {
        SqlValue::Integer(*v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self {
        SqlValue::Text(v.clone())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// One result row: column name -> value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row(BTreeMap<String, SqlValue>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column insert (mostly for scripted gateways)
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: SqlValue) {
        self.0.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.0.get(column)
    }

    fn require(&self, column: &str) -> Result<&SqlValue> {
        self.get(column)
            .ok_or_else(|| CatalogError::serialization(format!("missing column '{}'", column)))
    }

    pub fn get_i64(&self, column: &str) -> Result<i64> {
        match self.require(column)? {
            SqlValue::Integer(v) => Ok(*v),
            other => Err(type_mismatch(column, "integer", other)),
        }
    }

    /// Integer columns are widened, since some drivers return whole masses as integers
    pub fn get_f64(&self, column: &str) -> Result<f64> {
        match self.require(column)? {
            SqlValue::Real(v) => Ok(*v),
            SqlValue::Integer(v) => Ok(*v as f64),
            other => Err(type_mismatch(column, "real", other)),
        }
    }

    pub fn get_str(&self, column: &str) -> Result<&str> {
        match self.require(column)? {
            SqlValue::Text(v) => Ok(v),
            other => Err(type_mismatch(column, "text", other)),
        }
    }
}

fn type_mismatch(column: &str, expected: &str, found: &SqlValue) -> CatalogError {
    CatalogError::serialization(format!(
        "column '{}': expected {}, found {:?}",
        column, expected, found
    ))
}

/// Query Gateway Port (Primary Interface)
#[async_trait]
pub trait QueryGateway: Send + Sync {
    /// Execute one statement outside any explicit transaction (autocommit)
    async fn execute(&self, statement: &str, params: &[SqlValue]) -> Result<Vec<Row>>;

    /// Open a transaction
    ///
    /// The handle rolls back when dropped without `commit`.
    async fn begin<'a>(&'a self) -> Result<Box<dyn GatewayTransaction + 'a>>;
}

/// Anything statements can be sent through: a transaction, or the
/// gateway itself in autocommit mode (see `AutoCommit`)
#[async_trait]
pub trait StatementExecutor: Send {
    async fn execute(&mut self, statement: &str, params: &[SqlValue]) -> Result<Vec<Row>>;
}

/// Scoped transaction handle
#[async_trait]
pub trait GatewayTransaction: StatementExecutor {
    /// Commit. Further calls on the handle fail with a transaction error.
    async fn commit(&mut self) -> Result<()>;

    /// Roll back explicitly. Idempotent.
    async fn rollback(&mut self) -> Result<()>;
}

/// Runs each statement directly on the gateway (one implicit commit per statement)
pub struct AutoCommit<'a>(pub &'a dyn QueryGateway);

#[async_trait]
impl StatementExecutor for AutoCommit<'_> {
    async fn execute(&mut self, statement: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        self.0.execute(statement, params).await
    }
}
