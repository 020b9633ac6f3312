//! UPDATE statements.
//!
//! Uses the typestate pattern so that an UPDATE without any SET cannot be
//! built.

use std::fmt;
use std::marker::PhantomData;

use super::BuildStatement;
use crate::error::Result;
use crate::expr::{ExprNode, Field, IntoExpr};
use crate::resolve;
use crate::schema::{ColumnDef, Schema, Table, TablePath};
use crate::statement::Statement;
use crate::value::SqlValue;

/// Marker: no SET clause yet.
#[derive(Debug, Clone, Copy)]
pub struct NoSet;
/// Marker: at least one SET clause.
#[derive(Debug, Clone, Copy)]
pub struct HasSet;

/// The untyped content of an UPDATE, before resolution.
#[derive(Debug, Clone)]
pub struct UpdateQuery {
    pub(crate) table: TablePath,
    pub(crate) sets: Vec<(&'static ColumnDef, ExprNode)>,
    pub(crate) filter: Option<ExprNode>,
}

/// An UPDATE of table `Tb`.
pub struct Update<Tb, S = HasSet> {
    query: UpdateQuery,
    _state: PhantomData<fn() -> (Tb, S)>,
}

/// Starts an UPDATE of `table`.
#[must_use]
pub fn update<Tb: Table>(table: &Tb) -> Update<Tb, NoSet> {
    Update {
        query: UpdateQuery {
            table: table.path().clone(),
            sets: Vec::new(),
            filter: None,
        },
        _state: PhantomData,
    }
}

impl<Tb: Table, S> Update<Tb, S> {
    /// Assigns a column. Only the assigned columns appear in SET.
    #[must_use]
    pub fn set<T>(&self, field: Field<Tb, T>, value: impl IntoExpr<T>) -> Update<Tb, HasSet> {
        let mut query = self.query.clone();
        query
            .sets
            .push((field.column(), value.into_expr().into_node()));
        Update {
            query,
            _state: PhantomData,
        }
    }

    pub(crate) fn set_value(&self, column: &'static ColumnDef, value: SqlValue) -> Update<Tb, HasSet> {
        let mut query = self.query.clone();
        query.sets.push((column, ExprNode::Param(value)));
        Update {
            query,
            _state: PhantomData,
        }
    }
}

impl<Tb: Table> Update<Tb, HasSet> {
    /// Adds a WHERE condition, AND-ed with any existing one.
    ///
    /// Conditions may navigate to other tables; the statement is then
    /// rewritten to filter on the primary key through a sub-select.
    #[must_use]
    pub fn where_clause(&self, condition: impl IntoExpr<bool>) -> Self {
        let mut query = self.query.clone();
        let condition = condition.into_expr().into_node();
        query.filter = ExprNode::and_all(query.filter.take().into_iter().chain([condition]));
        Self {
            query,
            _state: PhantomData,
        }
    }
}

impl<Tb, S> Clone for Update<Tb, S> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            _state: PhantomData,
        }
    }
}

impl<Tb, S> fmt::Debug for Update<Tb, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Update").field("query", &self.query).finish()
    }
}

impl<Tb: Table> BuildStatement for Update<Tb, HasSet> {
    fn build(&self, schema: &Schema) -> Result<Statement> {
        resolve::update(schema, &self.query).map(Statement::Update)
    }
}
