///! Recording Query Gateway (for testing)
///!
///! Replays scripted responses in call order and records every statement
///! with its parameters, plus BEGIN / COMMIT / ROLLBACK markers.
///! NOT for production use.
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::{GatewayTransaction, QueryGateway, Row, SqlValue, StatementExecutor};
use crate::error::{CatalogError, Result};

pub const BEGIN: &str = "BEGIN";
pub const COMMIT: &str = "COMMIT";
pub const ROLLBACK: &str = "ROLLBACK";

/// Statement as seen by the gateway
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub statement: String,
    pub params: Vec<SqlValue>,
}

impl RecordedStatement {
    pub fn is_insert_into(&self, table: &str) -> bool {
        self.statement.starts_with(&format!("INSERT INTO {} ", table))
    }

    pub fn is_delete_from(&self, table: &str) -> bool {
        self.statement.starts_with(&format!("DELETE FROM {} ", table))
    }

    pub fn is_marker(&self) -> bool {
        matches!(self.statement.as_str(), BEGIN | COMMIT | ROLLBACK)
    }
}

#[derive(Debug, Clone)]
enum Scripted {
    Rows(Vec<Row>),
    Fail(String),
}

#[derive(Default)]
struct State {
    responses: VecDeque<Scripted>,
    log: Vec<RecordedStatement>,
}

#[derive(Clone, Default)]
pub struct RecordingGateway {
    state: Arc<Mutex<State>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the rows returned by the next statement
    pub fn push_rows(&self, rows: Vec<Row>) -> &Self {
        self.state().responses.push_back(Scripted::Rows(rows));
        self
    }

    /// Queue an empty result set
    pub fn push_empty(&self) -> &Self {
        self.push_rows(Vec::new())
    }

    /// Queue a raised database fault
    pub fn push_failure(&self, message: impl Into<String>) -> &Self {
        self.state()
            .responses
            .push_back(Scripted::Fail(message.into()));
        self
    }

    /// Every statement so far, markers included
    pub fn log(&self) -> Vec<RecordedStatement> {
        self.state().log.clone()
    }

    /// Statements so far, markers excluded
    pub fn statements(&self) -> Vec<RecordedStatement> {
        self.state()
            .log
            .iter()
            .filter(|s| !s.is_marker())
            .cloned()
            .collect()
    }

    fn mark(&self, marker: &str) {
        self.state().log.push(RecordedStatement {
            statement: marker.to_string(),
            params: Vec::new(),
        });
    }

    /// Unscripted statements succeed with no rows
    fn respond(&self, statement: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let mut state = self.state();
        state.log.push(RecordedStatement {
            statement: statement.to_string(),
            params: params.to_vec(),
        });
        match state.responses.pop_front() {
            Some(Scripted::Rows(rows)) => Ok(rows),
            Some(Scripted::Fail(message)) => Err(CatalogError::database(message)),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl QueryGateway for RecordingGateway {
    async fn execute(&self, statement: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        self.respond(statement, params)
    }

    async fn begin<'a>(&'a self) -> Result<Box<dyn GatewayTransaction + 'a>> {
        self.mark(BEGIN);
        Ok(Box::new(RecordingTransaction {
            gateway: self,
            finished: false,
        }))
    }
}

pub struct RecordingTransaction<'a> {
    gateway: &'a RecordingGateway,
    finished: bool,
}

#[async_trait]
impl StatementExecutor for RecordingTransaction<'_> {
    async fn execute(&mut self, statement: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        if self.finished {
            return Err(CatalogError::transaction("transaction already finished"));
        }
        self.gateway.respond(statement, params)
    }
}

#[async_trait]
impl GatewayTransaction for RecordingTransaction<'_> {
    async fn commit(&mut self) -> Result<()> {
        if self.finished {
            return Err(CatalogError::transaction("transaction already finished"));
        }
        self.finished = true;
        self.gateway.mark(COMMIT);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if !self.finished {
            self.finished = true;
            self.gateway.mark(ROLLBACK);
        }
        Ok(())
    }
}

impl Drop for RecordingTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.gateway.mark(ROLLBACK);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let gateway = RecordingGateway::new();
        gateway
            .push_rows(vec![Row::new().with("id", 1i64)])
            .push_failure("boom");

        let first = gateway.execute("SELECT 1", &[]).await.unwrap();
        assert_eq!(first[0].get_i64("id").unwrap(), 1);

        let err = gateway.execute("SELECT 2", &[]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Database);

        let third = gateway.execute("SELECT 3", &[]).await.unwrap();
        assert!(third.is_empty());
        assert_eq!(gateway.statements().len(), 3);
    }

    #[tokio::test]
    async fn test_markers_are_recorded() {
        let gateway = RecordingGateway::new();
        {
            let mut tx = gateway.begin().await.unwrap();
            tx.execute("DELETE FROM synonym WHERE id_mol = ?1", &[1i64.into()])
                .await
                .unwrap();
        }
        let mut tx = gateway.begin().await.unwrap();
        tx.commit().await.unwrap();
        drop(tx);

        let log: Vec<String> = gateway.log().into_iter().map(|s| s.statement).collect();
        assert_eq!(
            log,
            vec![
                "BEGIN",
                "DELETE FROM synonym WHERE id_mol = ?1",
                "ROLLBACK",
                "BEGIN",
                "COMMIT"
            ]
        );
    }

    #[test]
    fn test_statement_classification() {
        let stmt = RecordedStatement {
            statement: "INSERT INTO synonym (id_mol, name) VALUES (?1, ?2)".into(),
            params: vec![],
        };
        assert!(stmt.is_insert_into("synonym"));
        assert!(!stmt.is_insert_into("molecule"));
        assert!(!stmt.is_delete_from("synonym"));
    }
}
