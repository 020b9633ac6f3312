//! Typed statement builders.
//!
//! Builders only record what the caller asked for. Nothing is checked
//! against the schema until [`BuildStatement::build`] resolves the
//! statement, adds the implicit joins and validates every reference.

mod delete;
mod insert;
mod select;
mod update;

use std::sync::Arc;

pub use delete::{delete_from, Delete, DeleteQuery};
pub use insert::{
    insert_into, ColumnList, Insert, InsertColumns, InsertQuery, InsertReturning, ValueList,
};
pub use select::{
    select, select_from, HasFrom, JoinKind, JoinSpec, NoFrom, OrderSpec, PendingJoin, Select,
    SelectQuery, SortOrder,
};
pub use update::{update, HasSet, NoSet, Update, UpdateQuery};

use crate::error::Result;
use crate::projection::SelectList;
use crate::render::Rendered;
use crate::schema::Schema;
use crate::statement::Statement;
use crate::dialect::Dialect;

/// A statement that can be resolved against a schema.
pub trait BuildStatement {
    /// Resolves the statement: validates every reference, adds implicit
    /// joins and fixes the result layout.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Metadata`] or [`crate::Error::Ambiguous`] when
    /// a reference cannot be resolved.
    fn build(&self, schema: &Schema) -> Result<Statement>;

    /// Builds and renders in one step.
    ///
    /// # Errors
    ///
    /// Same as [`BuildStatement::build`].
    fn to_sql(&self, schema: &Schema, dialect: &dyn Dialect) -> Result<Rendered> {
        Ok(self.build(schema)?.render(dialect))
    }
}

/// A statement that produces rows.
pub trait Query: BuildStatement {
    type List: SelectList;

    fn select_list(&self) -> Arc<Self::List>;
}
