//! Application error types

use rusqlite::ffi;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid type: {0}")]
    InvalidType(String),

    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    #[error("No catalog: table operations need a catalog handle")]
    NoMetadata,

    #[error("No database engine bound")]
    NoEngine,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// True for `UNIQUE` and `PRIMARY KEY` violations reported by SQLite.
    ///
    /// Other constraint failures (`CHECK`, `NOT NULL`) are bad data, not
    /// duplicates, and do not match.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            AppError::Database(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.extended_code,
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            ),
            _ => false,
        }
    }

    /// Short tag stored in the `error_type` column of the download table
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DB_ERR",
            AppError::Http(_) => "DLOAD_ERR",
            AppError::Serialization(_) => "SERDE_ERR",
            AppError::Io(_) => "IO_ERR",
            AppError::Validation(_) => "VALIDATION_ERR",
            AppError::InvalidType(_) => "TYPE_ERR",
            AppError::MalformedRow { .. } => "PARSE_ERR",
            AppError::NoMetadata => "NO_METADATA",
            AppError::NoEngine => "NO_ENGINE",
            AppError::Config(_) => "CONFIG_ERR",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn violation(sql: &str) -> AppError {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (
                id INTEGER PRIMARY KEY,
                name TEXT UNIQUE,
                kind TEXT CHECK (kind IN ('D', 'B', 'S'))
            );
            INSERT INTO t (id, name, kind) VALUES (1, 'a', 'D');",
        )
        .unwrap();
        conn.execute(sql, []).unwrap_err().into()
    }

    #[test]
    fn test_unique_violation_detected() {
        let err = violation("INSERT INTO t (id, name) VALUES (2, 'a')");
        assert!(err.is_unique_violation());
    }

    #[test]
    fn test_primary_key_violation_detected() {
        let err = violation("INSERT INTO t (id, name) VALUES (1, 'b')");
        assert!(err.is_unique_violation());
    }

    #[test]
    fn test_check_violation_is_not_duplicate() {
        let err = violation("INSERT INTO t (id, name, kind) VALUES (3, 'c', 'X')");
        assert!(matches!(err, AppError::Database(_)));
        assert!(!err.is_unique_violation());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::NoEngine.code(), "NO_ENGINE");
        assert_eq!(AppError::Validation("x".into()).code(), "VALIDATION_ERR");
        assert_eq!(
            AppError::MalformedRow { line: 1, reason: "x".into() }.code(),
            "PARSE_ERR"
        );
    }
}
