//! # joinery-core
//!
//! Typed schema metadata, expressions and SQL statements with implicit
//! joins.
//!
//! This crate provides:
//! - An immutable [`Schema`] of tables, columns and foreign keys
//! - Typed expressions whose operators only accept matching value types
//! - Immutable statement builders, resolved against the schema by
//!   [`BuildStatement::build`] and rendered through a [`Dialect`]
//! - Select lists that decode rows into tuples, closures, nested rows,
//!   multisets and [`Record`]s
//!
//! It performs no I/O; `joinery-orm` executes statements.
//!
//! ## Navigation instead of joins
//!
//! Every foreign key is a navigation method on the table handle. Using a
//! column reached through navigation adds exactly one INNER JOIN for that
//! edge, however often it is used:
//!
//! ```rust,ignore
//! use joinery_core::prelude::*;
//!
//! let a = Athlete::table();
//! let query = select((a.first_name(), a.club().name()))
//!     .from(&a)
//!     .where_clause(a.club().name().eq("Louisiana State University"));
//!
//! let rendered = query.to_sql(&schema, &GenericDialect)?;
//! // SELECT "athlete"."first_name", "athlete__club"."name" FROM "athlete"
//! // INNER JOIN "club" AS "athlete__club" ON "athlete__club"."id" = "athlete"."club_id"
//! // WHERE "athlete__club"."name" = ?
//! ```
//!
//! ## No values in SQL text
//!
//! Literals, LIMIT and OFFSET are always bound parameters and come back in
//! [`Rendered::params`].

pub mod builder;
pub mod dialect;
mod error;
pub mod expr;
pub mod projection;
pub mod record;
mod render;
mod resolve;
pub mod row;
pub mod schema;
pub mod statement;
mod types;
pub mod value;

#[cfg(test)]
mod testing;

pub use builder::{
    delete_from, insert_into, select, select_from, update, BuildStatement, Query,
};
pub use dialect::{Dialect, GenericDialect, PostgresDialect};
pub use error::{Error, Result};
pub use expr::{Condition, Expr, Field};
pub use projection::{multiset, row, Asterisk, SelectList, Selectable};
pub use record::Record;
pub use render::Rendered;
pub use row::{ResultRow, RowSet, Value};
pub use schema::{ColumnDef, ForeignKeyDef, Schema, Table, TableDef, TablePath, TableRow};
pub use statement::Statement;
pub use types::DataType;
pub use value::{FromSqlValue, IntoValue, SqlType, SqlValue, ToSqlValue};

/// Everything needed to write queries.
pub mod prelude {
    pub use crate::builder::{
        delete_from, insert_into, select, select_from, update, BuildStatement, Query,
    };
    pub use crate::dialect::{Dialect, GenericDialect, PostgresDialect};
    pub use crate::expr::{
        avg, coalesce, count, count_all, lower, max, min, sum, upper, val, Condition, Expr,
        Field, IntoExpr,
    };
    pub use crate::projection::{asterisk, multiset, row};
    pub use crate::record::Record;
    pub use crate::row::ResultRow;
    pub use crate::schema::{Schema, Table, TableRow};
    pub use crate::value::SqlValue;
    pub use crate::{Error, Result};
}
