//! Persisting [`Record`]s.

use joinery_core::{Error, Record, Result, Table};
use tracing::debug;

use crate::connection::Connection;
use crate::dsl::Dsl;

/// Store, delete and refresh for records of tables with a primary key.
#[allow(async_fn_in_trait)]
pub trait UpdatableRecord {
    /// Inserts a new record or updates the changed columns of a stored one.
    ///
    /// After an insert the record holds the row as stored, generated
    /// columns included. Returns whether a statement was run: storing an
    /// unchanged record does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the UPDATE matched no row.
    async fn store<C: Connection>(&mut self, dsl: &mut Dsl<C>) -> Result<bool>;

    /// Deletes the stored row. The record becomes new again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no row was deleted.
    async fn delete<C: Connection>(&mut self, dsl: &mut Dsl<C>) -> Result<()>;

    /// Reloads every column from the database, discarding local changes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the row no longer exists.
    async fn refresh<C: Connection>(&mut self, dsl: &mut Dsl<C>) -> Result<()>;
}

impl<T: Table> UpdatableRecord for Record<T> {
    async fn store<C: Connection>(&mut self, dsl: &mut Dsl<C>) -> Result<bool> {
        if self.is_new() {
            let stored = dsl.fetch_one(&self.insert_statement()).await?;
            debug!(table = T::DEF.name, "Stored new record");
            *self = stored;
            return Ok(true);
        }

        let Some(update) = self.update_statement()? else {
            return Ok(false);
        };
        if dsl.execute(&update).await? == 0 {
            return Err(not_found::<T, _>(dsl, &update));
        }
        debug!(table = T::DEF.name, columns = ?self.changed_columns(), "Updated record");
        self.reset_changes();
        Ok(true)
    }

    async fn delete<C: Connection>(&mut self, dsl: &mut Dsl<C>) -> Result<()> {
        let delete = self.delete_statement()?;
        if dsl.execute(&delete).await? == 0 {
            return Err(not_found::<T, _>(dsl, &delete));
        }
        self.mark_new();
        Ok(())
    }

    async fn refresh<C: Connection>(&mut self, dsl: &mut Dsl<C>) -> Result<()> {
        let select = self.select_statement()?;
        match dsl.fetch_optional(&select).await? {
            Some(stored) => {
                *self = stored;
                Ok(())
            }
            None => Err(not_found::<T, _>(dsl, &select)),
        }
    }
}

fn not_found<T: Table, C: Connection>(
    dsl: &Dsl<C>,
    statement: &impl joinery_core::BuildStatement,
) -> Error {
    Error::NotFound {
        table: T::DEF.name.to_owned(),
        sql: dsl
            .render(statement)
            .map(|rendered| rendered.sql)
            .unwrap_or_default(),
    }
}
