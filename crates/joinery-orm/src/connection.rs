//! The seam between rendered statements and a database driver.

use joinery_core::{Dialect, Result, RowSet, SqlValue};

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Executed {
    pub rows_affected: u64,
    /// Key the database generated for the last inserted row, when it reports one.
    pub last_insert_id: Option<i64>,
}

/// Something that runs SQL text with positional parameters.
///
/// Implemented for the SQLite pool, connection and transaction types, and
/// for `&mut C` so a borrowed connection can back a [`crate::Dsl`].
#[allow(async_fn_in_trait)]
pub trait Connection {
    /// Dialect statements must be rendered in for this connection.
    fn dialect(&self) -> &dyn Dialect;

    /// Runs a statement and returns every row it produced.
    ///
    /// # Errors
    ///
    /// Returns [`joinery_core::Error::Execution`] when the driver fails and
    /// [`joinery_core::Error::Mapping`] when a value has no SQL counterpart.
    async fn fetch_rows(&mut self, sql: &str, params: &[SqlValue]) -> Result<RowSet>;

    /// Runs a statement that returns no rows.
    ///
    /// # Errors
    ///
    /// Returns [`joinery_core::Error::Execution`] when the driver fails.
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<Executed>;
}

impl<C: Connection> Connection for &mut C {
    fn dialect(&self) -> &dyn Dialect {
        (**self).dialect()
    }

    async fn fetch_rows(&mut self, sql: &str, params: &[SqlValue]) -> Result<RowSet> {
        (**self).fetch_rows(sql, params).await
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<Executed> {
        (**self).execute(sql, params).await
    }
}
