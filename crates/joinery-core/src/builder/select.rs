//! SELECT statements.
//!
//! Builder calls take `&self` and return a new statement, so a partially
//! built query can be reused as the base of several others.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::{BuildStatement, Query};
use crate::error::Result;
use crate::expr::{ExprNode, IntoExpr};
use crate::projection::{AllColumns, ProjectionItem, SelectList};
use crate::resolve;
use crate::schema::{Schema, Table, TablePath};
use crate::statement::Statement;

/// Marker: no FROM clause yet.
#[derive(Debug, Clone, Copy)]
pub struct NoFrom;
/// Marker: FROM clause present.
#[derive(Debug, Clone, Copy)]
pub struct HasFrom;

/// Join types for explicit joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct JoinSpec {
    pub(crate) kind: JoinKind,
    pub(crate) path: TablePath,
    pub(crate) on: ExprNode,
}

#[derive(Debug, Clone)]
pub struct OrderSpec {
    pub(crate) expr: ExprNode,
    pub(crate) order: SortOrder,
}

/// The untyped content of a SELECT, before resolution.
#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    pub(crate) items: Vec<ProjectionItem>,
    pub(crate) from: Option<TablePath>,
    pub(crate) joins: Vec<JoinSpec>,
    pub(crate) filter: Option<ExprNode>,
    pub(crate) group_by: Vec<ExprNode>,
    pub(crate) having: Option<ExprNode>,
    pub(crate) order_by: Vec<OrderSpec>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) distinct: bool,
}

fn and_into(slot: &mut Option<ExprNode>, condition: ExprNode) {
    *slot = ExprNode::and_all(slot.take().into_iter().chain([condition]));
}

/// A typed SELECT whose rows decode into `L::Row`.
pub struct Select<L, S = HasFrom> {
    list: Arc<L>,
    query: SelectQuery,
    _state: PhantomData<S>,
}

/// Starts a SELECT with the given select list.
///
/// The list is a single selectable or a tuple of up to twelve.
#[must_use]
pub fn select<L: SelectList>(list: L) -> Select<L, NoFrom> {
    let items = list.items();
    Select {
        list: Arc::new(list),
        query: SelectQuery {
            items,
            ..SelectQuery::default()
        },
        _state: PhantomData,
    }
}

/// `SELECT <all columns> FROM table`, yielding updatable records.
#[must_use]
pub fn select_from<Tb: Table>(table: &Tb) -> Select<AllColumns<Tb>, HasFrom> {
    select(AllColumns::of(table)).from(table)
}

impl<L, S> Select<L, S> {
    fn with(&self, change: impl FnOnce(&mut SelectQuery)) -> Self {
        let mut query = self.query.clone();
        change(&mut query);
        Self {
            list: Arc::clone(&self.list),
            query,
            _state: PhantomData,
        }
    }

    #[must_use]
    pub const fn query(&self) -> &SelectQuery {
        &self.query
    }

    #[must_use]
    pub fn list(&self) -> &L {
        &self.list
    }

    /// Adds DISTINCT.
    #[must_use]
    pub fn distinct(&self) -> Self {
        self.with(|q| q.distinct = true)
    }
}

impl<L> Select<L, NoFrom> {
    /// Specifies the root table.
    #[must_use]
    pub fn from(&self, table: &impl Table) -> Select<L, HasFrom> {
        let mut query = self.query.clone();
        query.from = Some(table.path().clone());
        Select {
            list: Arc::clone(&self.list),
            query,
            _state: PhantomData,
        }
    }
}

impl<L> Select<L, HasFrom> {
    /// Starts an explicit INNER JOIN; finish it with [`PendingJoin::on`].
    #[must_use]
    pub fn join(&self, table: &impl Table) -> PendingJoin<L> {
        self.pending(JoinKind::Inner, table.path().clone())
    }

    /// Starts an explicit LEFT JOIN; finish it with [`PendingJoin::on`].
    #[must_use]
    pub fn left_join(&self, table: &impl Table) -> PendingJoin<L> {
        self.pending(JoinKind::Left, table.path().clone())
    }

    fn pending(&self, kind: JoinKind, path: TablePath) -> PendingJoin<L> {
        PendingJoin {
            select: self.clone(),
            kind,
            path,
        }
    }

    /// Adds a WHERE condition, AND-ed with any existing one.
    #[must_use]
    pub fn where_clause(&self, condition: impl IntoExpr<bool>) -> Self {
        let condition = condition.into_expr().into_node();
        self.with(|q| and_into(&mut q.filter, condition))
    }

    #[must_use]
    pub fn group_by<T>(&self, expr: impl IntoExpr<T>) -> Self {
        let expr = expr.into_expr().into_node();
        self.with(|q| q.group_by.push(expr))
    }

    /// Adds a HAVING condition, AND-ed with any existing one.
    #[must_use]
    pub fn having(&self, condition: impl IntoExpr<bool>) -> Self {
        let condition = condition.into_expr().into_node();
        self.with(|q| and_into(&mut q.having, condition))
    }

    /// Orders ascending by `expr`, after any existing ordering.
    #[must_use]
    pub fn order_by<T>(&self, expr: impl IntoExpr<T>) -> Self {
        self.order(expr.into_expr().into_node(), SortOrder::Asc)
    }

    /// Orders descending by `expr`, after any existing ordering.
    #[must_use]
    pub fn order_by_desc<T>(&self, expr: impl IntoExpr<T>) -> Self {
        self.order(expr.into_expr().into_node(), SortOrder::Desc)
    }

    fn order(&self, expr: ExprNode, order: SortOrder) -> Self {
        self.with(|q| q.order_by.push(OrderSpec { expr, order }))
    }

    /// Sets LIMIT. The value is bound as a parameter.
    #[must_use]
    pub fn limit(&self, limit: u64) -> Self {
        self.with(|q| q.limit = Some(limit))
    }

    /// Sets OFFSET. The value is bound as a parameter.
    #[must_use]
    pub fn offset(&self, offset: u64) -> Self {
        self.with(|q| q.offset = Some(offset))
    }

    #[must_use]
    pub fn into_parts(self) -> (Arc<L>, SelectQuery) {
        (self.list, self.query)
    }
}

impl<L, S> Clone for Select<L, S> {
    fn clone(&self) -> Self {
        Self {
            list: Arc::clone(&self.list),
            query: self.query.clone(),
            _state: PhantomData,
        }
    }
}

impl<L, S> fmt::Debug for Select<L, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Select").field("query", &self.query).finish()
    }
}

impl<L: SelectList> BuildStatement for Select<L, HasFrom> {
    fn build(&self, schema: &Schema) -> Result<Statement> {
        resolve::select(schema, &self.query).map(Statement::Select)
    }
}

impl<L: SelectList> Query for Select<L, HasFrom> {
    type List = L;

    fn select_list(&self) -> Arc<L> {
        Arc::clone(&self.list)
    }
}

/// An explicit join waiting for its ON condition.
#[derive(Debug, Clone)]
pub struct PendingJoin<L> {
    select: Select<L, HasFrom>,
    kind: JoinKind,
    path: TablePath,
}

impl<L> PendingJoin<L> {
    #[must_use]
    pub fn on(self, condition: impl IntoExpr<bool>) -> Select<L, HasFrom> {
        let spec = JoinSpec {
            kind: self.kind,
            path: self.path,
            on: condition.into_expr().into_node(),
        };
        self.select.with(|q| q.joins.push(spec))
    }
}
