//! Error type shared by every joinery crate.

use thiserror::Error;

/// Errors raised while building, rendering, executing or mapping statements.
#[derive(Debug, Error)]
pub enum Error {
    /// A reference does not match the schema: unknown table, column or
    /// navigation, a broken foreign key, a table that is not in scope.
    #[error("metadata error: {0}")]
    Metadata(String),

    /// More than one foreign key leads from `table` to `target`.
    #[error(
        "ambiguous navigation from `{table}` to `{target}`: candidate foreign keys {candidates:?}"
    )]
    Ambiguous {
        table: String,
        target: String,
        candidates: Vec<String>,
    },

    /// A runtime value does not fit the declared column type.
    #[error("type mismatch on `{column}`: expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    /// The database rejected a statement.
    #[error("execution failed: {source} (sql: {sql})")]
    Execution {
        sql: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A result row could not be turned into the requested shape.
    #[error("mapping error: {0}")]
    Mapping(String),

    /// A fetch expected a different number of rows.
    #[error("expected {expected} row(s), found {actual}")]
    Cardinality { expected: String, actual: usize },

    /// An UPDATE or DELETE on behalf of a record matched no row.
    #[error("no row of `{table}` matched (sql: {sql})")]
    NotFound { table: String, sql: String },

    /// The connection's dialect cannot express the statement.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl Error {
    pub(crate) fn metadata(message: impl Into<String>) -> Self {
        Self::Metadata(message.into())
    }

    /// Builds a [`Error::Mapping`] from any message.
    pub fn mapping(message: impl Into<String>) -> Self {
        Self::Mapping(message.into())
    }

    /// Wraps a driver error together with the SQL that caused it.
    pub fn execution(
        sql: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Execution {
            sql: sql.into(),
            source: Box::new(source),
        }
    }

    /// Prefixes a mapping error with the column it happened on.
    #[must_use]
    pub fn in_column(self, column: &str) -> Self {
        match self {
            Self::Mapping(message) => Self::Mapping(format!("column `{column}`: {message}")),
            other => other,
        }
    }
}

/// Result alias used across joinery.
pub type Result<T> = std::result::Result<T, Error>;
