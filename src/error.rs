//! Error types for the database facade.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Driver errors are classified into connection, statement and validation kinds so
//! callers can tell a broken pool apart from a bad statement.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Statement failed: {message}")]
    Statement {
        message: String,
        /// e.g., "42S22" for unknown column
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Invalid input: {message}")]
    Validation { message: String },

    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a statement error with optional SQL state.
    pub fn statement(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Statement {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create the error raised when a placeholder has no bound value.
    pub fn missing_param(name: &str) -> Self {
        Self::statement(
            format!("A value is required for bind parameter '{}'", name),
            None,
            "Add the parameter to the params mapping",
        )
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Statement { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Short kind label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection",
            Self::Statement { .. } => "statement",
            Self::Validation { .. } => "validation",
            Self::Cache { .. } => "cache",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::statement(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => DbError::statement(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => DbError::connection(
                "Timed out waiting for a pooled connection",
                "The pool is exhausted; raise max_connections or reduce concurrency",
            ),
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::TypeNotFound { type_name } => DbError::statement(
                format!("Type not found: {}", type_name),
                None,
                "Check the types used in the statement",
            ),
            sqlx::Error::ColumnNotFound(col) => DbError::statement(
                format!("Column not found: {}", col),
                None,
                "Check the column names in the statement",
            ),
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::statement(
                format!("Column index {} out of bounds (len: {})", index, len),
                None,
                "Check the projection of the statement",
            ),
            sqlx::Error::ColumnDecode { index, source } => DbError::statement(
                format!("Failed to decode column {}: {}", index, source),
                None,
                "Check the column type of the projection",
            ),
            sqlx::Error::Decode(source) => DbError::statement(
                format!("Decode error: {}", source),
                None,
                "Check the column types of the projection",
            ),
            sqlx::Error::AnyDriverError(err) => DbError::connection(
                format!("Driver error: {}", err),
                "Check database driver configuration",
            ),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

impl From<redis::RedisError> for DbError {
    fn from(err: redis::RedisError) -> Self {
        DbError::cache(err.to_string())
    }
}

/// Result type alias for facade operations.
pub type DbResult<T> = Result<T, DbError>;
