//! INSERT statements.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::{BuildStatement, Query};
use crate::error::Result;
use crate::expr::{ExprNode, Field, IntoExpr};
use crate::projection::{ProjectionItem, SelectList};
use crate::resolve;
use crate::schema::{ColumnDef, Schema, Table, TablePath};
use crate::statement::Statement;
use crate::value::SqlValue;

/// The untyped content of an INSERT, before resolution.
#[derive(Debug, Clone)]
pub struct InsertQuery {
    pub(crate) table: TablePath,
    pub(crate) columns: Vec<&'static ColumnDef>,
    pub(crate) rows: Vec<Vec<ExprNode>>,
    pub(crate) returning: Vec<ProjectionItem>,
}

impl InsertQuery {
    fn push_single(&mut self, column: &'static ColumnDef, value: ExprNode) {
        self.columns.push(column);
        match self.rows.first_mut() {
            Some(row) => row.push(value),
            None => self.rows.push(vec![value]),
        }
    }
}

/// An INSERT into table `Tb`.
pub struct Insert<Tb> {
    query: InsertQuery,
    _table: PhantomData<fn() -> Tb>,
}

/// Starts an INSERT into `table`.
#[must_use]
pub fn insert_into<Tb: Table>(table: &Tb) -> Insert<Tb> {
    Insert {
        query: InsertQuery {
            table: table.path().clone(),
            columns: Vec::new(),
            rows: Vec::new(),
            returning: Vec::new(),
        },
        _table: PhantomData,
    }
}

impl<Tb: Table> Insert<Tb> {
    /// Assigns one column of a single-row insert.
    ///
    /// Columns left out take their database default.
    #[must_use]
    pub fn set<T>(&self, field: Field<Tb, T>, value: impl IntoExpr<T>) -> Self {
        let mut query = self.query.clone();
        query.push_single(field.column(), value.into_expr().into_node());
        Self {
            query,
            _table: PhantomData,
        }
    }

    pub(crate) fn push_value(&mut self, column: &'static ColumnDef, value: SqlValue) {
        self.query.push_single(column, ExprNode::Param(value));
    }

    /// Names the columns of a multi-row insert; add rows with
    /// [`InsertColumns::values`].
    #[must_use]
    pub fn columns<C: ColumnList<Tb>>(&self, columns: C) -> InsertColumns<Tb, C> {
        let mut query = self.query.clone();
        query.columns = columns.columns();
        query.rows.clear();
        InsertColumns {
            query,
            _marker: PhantomData,
        }
    }

    /// Returns the given select list from the inserted rows.
    #[must_use]
    pub fn returning<L: SelectList>(&self, list: L) -> InsertReturning<L> {
        returning(&self.query, list)
    }
}

fn returning<L: SelectList>(query: &InsertQuery, list: L) -> InsertReturning<L> {
    let mut query = query.clone();
    query.returning = list.items();
    InsertReturning {
        list: Arc::new(list),
        query,
    }
}

impl<Tb> Clone for Insert<Tb> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            _table: PhantomData,
        }
    }
}

impl<Tb> fmt::Debug for Insert<Tb> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Insert").field("query", &self.query).finish()
    }
}

impl<Tb: Table> BuildStatement for Insert<Tb> {
    fn build(&self, schema: &Schema) -> Result<Statement> {
        resolve::insert(schema, &self.query).map(Statement::Insert)
    }
}

/// An INSERT with an explicit column list.
pub struct InsertColumns<Tb, C> {
    query: InsertQuery,
    _marker: PhantomData<fn() -> (Tb, C)>,
}

impl<Tb: Table, C: ColumnList<Tb>> InsertColumns<Tb, C> {
    /// Appends one row of values, typed against the column list.
    #[must_use]
    pub fn values<V: ValueList<C::Types>>(&self, values: V) -> Self {
        let mut query = self.query.clone();
        query.rows.push(values.into_nodes());
        Self {
            query,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn returning<L: SelectList>(&self, list: L) -> InsertReturning<L> {
        returning(&self.query, list)
    }
}

impl<Tb, C> Clone for InsertColumns<Tb, C> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            _marker: PhantomData,
        }
    }
}

impl<Tb, C> fmt::Debug for InsertColumns<Tb, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertColumns")
            .field("query", &self.query)
            .finish()
    }
}

impl<Tb: Table, C: ColumnList<Tb>> BuildStatement for InsertColumns<Tb, C> {
    fn build(&self, schema: &Schema) -> Result<Statement> {
        resolve::insert(schema, &self.query).map(Statement::Insert)
    }
}

/// An INSERT whose rows come back through RETURNING.
pub struct InsertReturning<L> {
    list: Arc<L>,
    query: InsertQuery,
}

impl<L> Clone for InsertReturning<L> {
    fn clone(&self) -> Self {
        Self {
            list: Arc::clone(&self.list),
            query: self.query.clone(),
        }
    }
}

impl<L> fmt::Debug for InsertReturning<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertReturning")
            .field("query", &self.query)
            .finish()
    }
}

impl<L: SelectList> BuildStatement for InsertReturning<L> {
    fn build(&self, schema: &Schema) -> Result<Statement> {
        resolve::insert(schema, &self.query).map(Statement::Insert)
    }
}

impl<L: SelectList> Query for InsertReturning<L> {
    type List = L;

    fn select_list(&self) -> Arc<L> {
        Arc::clone(&self.list)
    }
}

/// A tuple of fields of one table, naming insert columns.
pub trait ColumnList<Tb> {
    /// The value types, as a tuple.
    type Types;

    fn columns(&self) -> Vec<&'static ColumnDef>;
}

/// A tuple of values matching a [`ColumnList`].
pub trait ValueList<Types> {
    fn into_nodes(self) -> Vec<ExprNode>;
}

macro_rules! insert_tuples {
    ($(($ty:ident, $value:ident, $idx:tt)),+) => {
        impl<Tb, $($ty),+> ColumnList<Tb> for ($(Field<Tb, $ty>,)+) {
            type Types = ($($ty,)+);

            fn columns(&self) -> Vec<&'static ColumnDef> {
                vec![$(self.$idx.column()),+]
            }
        }

        impl<$($ty, $value: IntoExpr<$ty>),+> ValueList<($($ty,)+)> for ($($value,)+) {
            fn into_nodes(self) -> Vec<ExprNode> {
                vec![$(self.$idx.into_expr().into_node()),+]
            }
        }
    };
}

insert_tuples!((A, VA, 0));
insert_tuples!((A, VA, 0), (B, VB, 1));
insert_tuples!((A, VA, 0), (B, VB, 1), (C, VC, 2));
insert_tuples!((A, VA, 0), (B, VB, 1), (C, VC, 2), (D, VD, 3));
insert_tuples!((A, VA, 0), (B, VB, 1), (C, VC, 2), (D, VD, 3), (E, VE, 4));
insert_tuples!((A, VA, 0), (B, VB, 1), (C, VC, 2), (D, VD, 3), (E, VE, 4), (F, VF, 5));
insert_tuples!(
    (A, VA, 0), (B, VB, 1), (C, VC, 2), (D, VD, 3), (E, VE, 4), (F, VF, 5), (G, VG, 6)
);
insert_tuples!(
    (A, VA, 0), (B, VB, 1), (C, VC, 2), (D, VD, 3), (E, VE, 4), (F, VF, 5), (G, VG, 6),
    (H, VH, 7)
);
