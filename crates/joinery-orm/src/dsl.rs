//! The execution context: a connection, the schema statements resolve
//! against and the settings they run with.

use std::sync::Arc;

use joinery_core::builder::{select, BuildStatement, Query};
use joinery_core::expr::{count_all, IntoExpr};
use joinery_core::row::ResultRow;
use joinery_core::statement::{InsertStatement, Statement};
use joinery_core::{Error, Record, Rendered, Result, Schema, SelectList, SqlValue, Table};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::connection::Connection;
use crate::de::from_row;
use crate::fetched::Fetched;
use crate::materialize::materialize;
use crate::settings::Settings;

/// Row type of a query's select list.
pub type RowOf<Q> = <<Q as Query>::List as SelectList>::Row;

/// Builds, renders and runs statements over one connection.
///
/// ```rust,ignore
/// let mut dsl = Dsl::new(pool, schema);
/// let names: Vec<(String, String)> = dsl
///     .fetch_all(&select((a.first_name(), a.club().name())).from(&a))
///     .await?;
/// ```
#[derive(Debug)]
pub struct Dsl<C> {
    conn: C,
    schema: Arc<Schema>,
    settings: Settings,
}

impl<C: Connection> Dsl<C> {
    pub fn new(conn: C, schema: impl Into<Arc<Schema>>) -> Self {
        Self {
            conn,
            schema: schema.into(),
            settings: Settings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn connection(&mut self) -> &mut C {
        &mut self.conn
    }

    pub fn into_connection(self) -> C {
        self.conn
    }

    /// An empty, unsaved record of `table`.
    pub fn new_record<Tb: Table>(&self, _table: &Tb) -> Record<Tb> {
        Record::new()
    }

    /// SQL and parameters for `statement` in this connection's dialect.
    ///
    /// # Errors
    ///
    /// Returns the error [`BuildStatement::build`] raises.
    pub fn render(&self, statement: &impl BuildStatement) -> Result<Rendered> {
        statement.to_sql(&self.schema, self.conn.dialect())
    }

    /// Runs a statement for its effect and returns the affected row count.
    /// A RETURNING list is dropped.
    ///
    /// # Errors
    ///
    /// Returns build errors and [`Error::Execution`].
    pub async fn execute(&mut self, statement: &impl BuildStatement) -> Result<u64> {
        let statement = match statement.build(&self.schema)? {
            Statement::Insert(insert) => Statement::Insert(insert.without_returning()),
            other => other,
        };
        let rendered = statement.render(self.conn.dialect());
        let done = self.conn.execute(&rendered.sql, &rendered.params).await?;
        Ok(done.rows_affected)
    }

    /// Runs a query and returns its rows for lazy decoding.
    ///
    /// # Errors
    ///
    /// Returns build, execution and materialisation errors. Decoding errors
    /// surface per row while iterating.
    pub async fn fetch<Q: Query>(&mut self, query: &Q) -> Result<Fetched<Q::List>> {
        let rows = self.fetch_rows(query).await?;
        Ok(Fetched::new(query.select_list(), rows))
    }

    /// Runs a query and decodes every row.
    ///
    /// # Errors
    ///
    /// Same as [`Dsl::fetch`], plus the first decoding error.
    pub async fn fetch_all<Q: Query>(&mut self, query: &Q) -> Result<Vec<RowOf<Q>>> {
        self.fetch(query).await?.collect()
    }

    /// Runs a query that must produce exactly one row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cardinality`] for zero rows or more than one.
    pub async fn fetch_one<Q: Query>(&mut self, query: &Q) -> Result<RowOf<Q>> {
        let mut fetched = self.fetch(query).await?;
        match (fetched.next(), fetched.remaining()) {
            (Some(row), 0) => row,
            (first, rest) => Err(Error::Cardinality {
                expected: "exactly one".into(),
                actual: usize::from(first.is_some()) + rest,
            }),
        }
    }

    /// Runs a query that produces at most one row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cardinality`] for more than one row.
    pub async fn fetch_optional<Q: Query>(&mut self, query: &Q) -> Result<Option<RowOf<Q>>> {
        let mut fetched = self.fetch(query).await?;
        match (fetched.next(), fetched.remaining()) {
            (row, 0) => row.transpose(),
            (_, rest) => Err(Error::Cardinality {
                expected: "at most one".into(),
                actual: rest + 1,
            }),
        }
    }

    /// Runs a query and passes each decoded row through `mapper`.
    ///
    /// # Errors
    ///
    /// Same as [`Dsl::fetch_all`].
    pub async fn fetch_map<Q, R, F>(&mut self, query: &Q, mut mapper: F) -> Result<Vec<R>>
    where
        Q: Query,
        F: FnMut(RowOf<Q>) -> R,
    {
        self.fetch(query)
            .await?
            .map(|row| row.map(&mut mapper))
            .collect()
    }

    /// Runs a query and deserializes each row into `T` by label.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Mapping`] when a row does not fit `T`.
    pub async fn fetch_into<T: DeserializeOwned>(&mut self, query: &impl Query) -> Result<Vec<T>> {
        self.fetch_rows(query)
            .await?
            .into_iter()
            .map(from_row)
            .collect()
    }

    /// Runs a query and returns the materialised rows without decoding.
    ///
    /// # Errors
    ///
    /// Returns build, execution and materialisation errors, and
    /// [`Error::Unsupported`] for an INSERT the dialect cannot return rows
    /// from.
    pub async fn fetch_rows(&mut self, query: &impl Query) -> Result<Vec<ResultRow>> {
        let statement = query.build(&self.schema)?;
        match &statement {
            Statement::Insert(insert)
                if !self.settings.returning.uses_native(self.conn.dialect()) =>
            {
                self.read_back(insert).await
            }
            _ => self.run(&statement).await,
        }
    }

    /// `SELECT COUNT(*)` over `table`.
    ///
    /// # Errors
    ///
    /// Same as [`Dsl::fetch_one`].
    pub async fn count<Tb: Table>(&mut self, table: &Tb) -> Result<i64> {
        self.fetch_one(&select(count_all()).from(table)).await
    }

    /// `SELECT COUNT(*)` over the rows of `table` matching `condition`.
    ///
    /// # Errors
    ///
    /// Same as [`Dsl::fetch_one`].
    pub async fn count_where<Tb: Table>(
        &mut self,
        table: &Tb,
        condition: impl IntoExpr<bool>,
    ) -> Result<i64> {
        self.fetch_one(&select(count_all()).from(table).where_clause(condition))
            .await
    }

    async fn run(&mut self, statement: &Statement) -> Result<Vec<ResultRow>> {
        let Some(layout) = statement.layout() else {
            return Err(Error::Unsupported(format!(
                "statement on `{}` returns no rows",
                statement.table()
            )));
        };
        let dialect = self.conn.dialect();
        if matches!(statement, Statement::Insert(_)) && !dialect.supports_returning() {
            return Err(Error::Unsupported(format!(
                "{} has no RETURNING",
                dialect.name()
            )));
        }
        let rendered = statement.render(dialect);
        let rows = self.conn.fetch_rows(&rendered.sql, &rendered.params).await?;
        materialize(&mut self.conn, &self.settings, &layout.slots, rows).await
    }

    async fn read_back(&mut self, insert: &InsertStatement) -> Result<Vec<ResultRow>> {
        if insert.row_count() != 1 {
            return Err(Error::Unsupported(format!(
                "reading back {} inserted rows of `{}`",
                insert.row_count(),
                insert.table().table
            )));
        }
        insert.read_back_key()?;
        let rendered = Statement::Insert(insert.without_returning()).render(self.conn.dialect());
        let done = self.conn.execute(&rendered.sql, &rendered.params).await?;
        let Some(key) = done.last_insert_id else {
            return Err(Error::Unsupported(format!(
                "no generated key reported for `{}`",
                insert.table().table
            )));
        };
        debug!(table = insert.table().table, key, "Reading back inserted row");
        let select = insert.read_back(SqlValue::Int(key))?;
        self.run(&Statement::Select(select)).await
    }
}
