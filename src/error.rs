//! Error types for the database access layer.
//!
//! Driver errors never leave this crate untranslated: [`translate`] maps the
//! SQLSTATE codes callers branch on to dedicated variants and wraps everything
//! else together with the name of the operation that failed.

use crate::db::context::ContextError;
use thiserror::Error;

/// SQLSTATE for `unique_violation`.
pub const UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATE for `undefined_table`.
pub const UNDEFINED_TABLE: &str = "42P01";

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("not found")]
    NotFound,

    #[error("duplicated entry")]
    DuplicatedEntry,

    #[error("undefined table")]
    UndefinedTable,

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("could not find name '{name}' in query arguments")]
    MissingArgument { name: String },

    #[error("{operation}: {cause}")]
    Cancelled {
        operation: String,
        cause: ContextError,
    },

    /// The status check gave up: `cause` ended the retry loop, `source` is the
    /// last ping failure.
    #[error("{cause} : database: {source}")]
    StatusCheck {
        cause: ContextError,
        #[source]
        source: Box<DbError>,
    },

    #[error("{operation}: {source}")]
    Other {
        operation: String,
        #[source]
        source: BoxError,
    },
}

impl DbError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a missing named argument error.
    pub fn missing_argument(name: impl Into<String>) -> Self {
        Self::MissingArgument { name: name.into() }
    }

    /// Create a cancellation error for an operation.
    pub fn cancelled(operation: impl Into<String>, cause: ContextError) -> Self {
        Self::Cancelled {
            operation: operation.into(),
            cause,
        }
    }

    /// Combine the context cause with the last ping error.
    pub fn status_check(cause: ContextError, last_error: DbError) -> Self {
        Self::StatusCheck {
            cause,
            source: Box::new(last_error),
        }
    }

    /// Wrap an arbitrary failure with the operation it came from.
    pub fn other(operation: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Other {
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// Check if this error is retryable.
    ///
    /// Only connectivity failures qualify: a status check that gave up, an
    /// expired deadline, or a transport-level driver error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::StatusCheck { .. } => true,
            Self::Cancelled { cause, .. } => *cause == ContextError::DeadlineExceeded,
            Self::Other { source, .. } => matches!(
                source.downcast_ref::<sqlx::Error>(),
                Some(
                    sqlx::Error::Io(_)
                        | sqlx::Error::PoolTimedOut
                        | sqlx::Error::Tls(_)
                        | sqlx::Error::Protocol(_)
                )
            ),
            _ => false,
        }
    }

    /// SQLSTATE of the wrapped driver error, if any.
    pub fn sql_state(&self) -> Option<String> {
        match self {
            Self::DuplicatedEntry => Some(UNIQUE_VIOLATION.to_string()),
            Self::UndefinedTable => Some(UNDEFINED_TABLE.to_string()),
            Self::Other { source, .. } => match source.downcast_ref::<sqlx::Error>() {
                Some(sqlx::Error::Database(db_err)) => db_err.code().map(|c| c.to_string()),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Map a driver error onto the stable taxonomy.
///
/// Classification uses the SQLSTATE code only; server messages are locale and
/// version dependent.
pub fn translate(operation: &str, err: sqlx::Error) -> DbError {
    match err {
        sqlx::Error::RowNotFound => DbError::NotFound,
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.into_owned());
            match code.as_deref() {
                Some(UNIQUE_VIOLATION) => DbError::DuplicatedEntry,
                Some(UNDEFINED_TABLE) => DbError::UndefinedTable,
                _ => DbError::other(operation, sqlx::Error::Database(db_err)),
            }
        }
        other => DbError::other(operation, other),
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        translate("database", err)
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;
