//! Error types for molecule-catalog

use std::fmt;
use thiserror::Error;

/// Catalog error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Gateway raised (connectivity, constraint violation, malformed statement)
    Database,
    /// Lookup yielded zero rows
    NotFound,
    /// Malformed input (update without id, self-equivalence)
    Validation,
    /// Row decoding errors (missing column, type mismatch, bad JSON aggregate)
    Serialization,
    /// BEGIN / COMMIT / ROLLBACK failures
    Transaction,
    /// Configuration errors
    Config,
    /// I/O errors
    IO,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Database => "database",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Validation => "validation",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Transaction => "transaction",
            ErrorKind::Config => "config",
            ErrorKind::IO => "io",
        }
    }

    /// Legacy integer result code. Callers of the old contract only
    /// distinguish `0` (success) from non-zero, so every kind maps to `1`.
    pub fn status_code(&self) -> i32 {
        1
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Catalog error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct CatalogError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl CatalogError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // Convenience constructors
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, format!("Not found: {}", what.into()))
    }

    pub fn molecule_not_found(id: i64) -> Self {
        Self::not_found(format!("molecule {}", id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transaction, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub fn status_code(&self) -> i32 {
        self.kind.status_code()
    }
}

// SQLite error conversions
#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for CatalogError {
    fn from(err: rusqlite::Error) -> Self {
        CatalogError::database(format!("SQLite error: {}", err)).with_source(err)
    }
}

// JSON error conversions
impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::serialization(format!("JSON error: {}", err)).with_source(err)
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::new(ErrorKind::IO, format!("IO error: {}", err)).with_source(err)
    }
}

impl From<crate::config::ConfigError> for CatalogError {
    fn from(err: crate::config::ConfigError) -> Self {
        CatalogError::config(err.to_string()).with_source(err)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    // ═══════════════════════════════════════════════════════════════════════
    // Error Construction Tests
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_error_display() {
        let err = CatalogError::molecule_not_found(42);
        let msg = format!("{}", err);
        assert_eq!(msg, "[not_found] Not found: molecule 42");
    }

    #[test]
    fn test_database_error() {
        let err = CatalogError::database("Connection refused");
        assert_eq!(err.kind, ErrorKind::Database);
        assert_eq!(err.message, "Connection refused");
        assert!(err.source.is_none());
        assert_eq!(format!("{}", err), "[database] Connection refused");
    }

    #[test]
    fn test_validation_error() {
        let err = CatalogError::validation("update requires an id");
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(!err.is_not_found());
        assert_eq!(format!("{}", err), "[validation] update requires an id");
    }

    #[test]
    fn test_with_source() {
        use std::io;

        let io_err = io::Error::new(io::ErrorKind::NotFound, "catalog.db missing");
        let err = CatalogError::database("DB file missing").with_source(io_err);

        let source = err.source().unwrap();
        assert!(source.to_string().contains("catalog.db missing"));
    }

    #[test]
    fn test_every_failure_maps_to_nonzero_code() {
        for kind in [
            ErrorKind::Database,
            ErrorKind::NotFound,
            ErrorKind::Validation,
            ErrorKind::Serialization,
            ErrorKind::Transaction,
            ErrorKind::Config,
            ErrorKind::IO,
        ] {
            assert_ne!(kind.status_code(), 0, "{kind} must not look like success");
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Conversion Tests
    // ═══════════════════════════════════════════════════════════════════════

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_from_rusqlite_error() {
        let err: CatalogError = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(err.kind, ErrorKind::Database);
        assert!(err.message.contains("SQLite error"));
        assert!(err.source.is_some());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<Vec<i64>>("[1, 2").err().unwrap();
        let err: CatalogError = json_err.into();

        assert_eq!(err.kind, ErrorKind::Serialization);
        assert!(err.message.contains("JSON error"));
    }

    #[test]
    fn test_result_propagation() {
        fn inner() -> Result<()> {
            Err(CatalogError::molecule_not_found(7))
        }

        fn outer() -> Result<()> {
            inner()?;
            Ok(())
        }

        let err = outer().unwrap_err();
        assert!(err.is_not_found());
    }
}
