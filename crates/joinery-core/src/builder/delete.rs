//! DELETE statements.

use std::fmt;
use std::marker::PhantomData;

use super::BuildStatement;
use crate::error::Result;
use crate::expr::{ExprNode, IntoExpr};
use crate::resolve;
use crate::schema::{Schema, Table, TablePath};
use crate::statement::Statement;

/// The untyped content of a DELETE, before resolution.
#[derive(Debug, Clone)]
pub struct DeleteQuery {
    pub(crate) table: TablePath,
    pub(crate) filter: Option<ExprNode>,
}

/// A DELETE from table `Tb`.
///
/// **Warning**: without a WHERE clause every row is deleted.
pub struct Delete<Tb> {
    query: DeleteQuery,
    _table: PhantomData<fn() -> Tb>,
}

/// Starts a DELETE from `table`.
#[must_use]
pub fn delete_from<Tb: Table>(table: &Tb) -> Delete<Tb> {
    Delete {
        query: DeleteQuery {
            table: table.path().clone(),
            filter: None,
        },
        _table: PhantomData,
    }
}

impl<Tb: Table> Delete<Tb> {
    /// Adds a WHERE condition, AND-ed with any existing one.
    ///
    /// Conditions may navigate to other tables, as for UPDATE.
    #[must_use]
    pub fn where_clause(&self, condition: impl IntoExpr<bool>) -> Self {
        let mut query = self.query.clone();
        let condition = condition.into_expr().into_node();
        query.filter = ExprNode::and_all(query.filter.take().into_iter().chain([condition]));
        Self {
            query,
            _table: PhantomData,
        }
    }
}

impl<Tb> Clone for Delete<Tb> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            _table: PhantomData,
        }
    }
}

impl<Tb> fmt::Debug for Delete<Tb> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delete").field("query", &self.query).finish()
    }
}

impl<Tb: Table> BuildStatement for Delete<Tb> {
    fn build(&self, schema: &Schema) -> Result<Statement> {
        resolve::delete(schema, &self.query).map(Statement::Delete)
    }
}
