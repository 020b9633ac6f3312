//! Resolved statements.
//!
//! A [`Statement`] is the output of `build`: every reference is checked,
//! every implicit join is explicit, and the result [`Layout`] records how the
//! flat SQL columns fold back into nested rows and multisets.

use std::sync::Arc;

use crate::builder::{JoinKind, SortOrder};
use crate::error::{Error, Result};
use crate::expr::{BinaryOp, ColumnRef, ExprNode};
use crate::row::Label;
use crate::schema::{ColumnDef, TablePath};
use crate::value::SqlValue;

/// A table in a FROM or JOIN clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub table: &'static str,
    pub alias: String,
}

impl TableRef {
    pub(crate) fn new(table: &'static str, alias: impl Into<String>) -> Self {
        Self {
            table,
            alias: alias.into(),
        }
    }
}

/// A resolved join.
#[derive(Debug, Clone)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableRef,
    pub on: ExprNode,
    /// Added by navigation rather than by `.join`.
    pub implicit: bool,
}

/// One SQL column of a select list.
#[derive(Debug, Clone)]
pub struct SelectColumn {
    pub expr: ExprNode,
    /// Rendered as `AS "alias"` when the caller labelled the item.
    pub alias: Option<String>,
}

/// How a flat SQL row folds into a result row.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub slots: Vec<Slot>,
}

/// One slot of a [`Layout`].
#[derive(Debug, Clone)]
pub enum Slot {
    /// The value of the SQL column at `index`.
    Column { index: usize, label: Label },
    Nested { label: String, slots: Vec<Slot> },
    /// A sub-select run once per outer row. `bindings` are the indexes of
    /// the hidden outer columns bound to its `Outer(k)` parameters.
    Multiset {
        label: String,
        query: Box<SelectStatement>,
        bindings: Vec<usize>,
    },
}

impl Slot {
    fn label(&self) -> Label {
        match self {
            Self::Column { label, .. } => label.clone(),
            Self::Nested { label, .. } | Self::Multiset { label, .. } => Label {
                name: label.clone(),
                origin: None,
            },
        }
    }
}

impl Layout {
    /// Labels of the top-level slots.
    #[must_use]
    pub fn labels(&self) -> Arc<[Label]> {
        labels_of(&self.slots)
    }
}

/// Labels of a list of slots.
#[must_use]
pub fn labels_of(slots: &[Slot]) -> Arc<[Label]> {
    slots.iter().map(Slot::label).collect()
}

/// A resolved SELECT.
#[derive(Debug, Clone)]
pub struct SelectStatement {
    pub(crate) distinct: bool,
    pub(crate) columns: Vec<SelectColumn>,
    pub(crate) from: TableRef,
    pub(crate) joins: Vec<Join>,
    pub(crate) filter: Option<ExprNode>,
    pub(crate) group_by: Vec<ExprNode>,
    pub(crate) having: Option<ExprNode>,
    pub(crate) order_by: Vec<(ExprNode, SortOrder)>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) layout: Layout,
}

impl SelectStatement {
    #[must_use]
    pub const fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Number of SQL columns, hidden correlation columns included.
    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub const fn from(&self) -> &TableRef {
        &self.from
    }

    #[must_use]
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }
}

/// A resolved INSERT.
#[derive(Debug, Clone)]
pub struct InsertStatement {
    pub(crate) table: TableRef,
    pub(crate) primary_key: Vec<&'static ColumnDef>,
    pub(crate) columns: Vec<&'static str>,
    pub(crate) rows: Vec<Vec<ExprNode>>,
    pub(crate) returning: Vec<ExprNode>,
    pub(crate) layout: Option<Layout>,
}

impl InsertStatement {
    #[must_use]
    pub const fn table(&self) -> &TableRef {
        &self.table
    }

    #[must_use]
    pub fn has_returning(&self) -> bool {
        !self.returning.is_empty()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len().max(1)
    }

    /// Whether the statement assigns `column` explicitly.
    #[must_use]
    pub fn assigns(&self, column: &str) -> bool {
        self.columns.iter().any(|c| *c == column)
    }

    #[must_use]
    pub fn without_returning(&self) -> Self {
        Self {
            returning: Vec::new(),
            layout: None,
            ..self.clone()
        }
    }

    /// The key column a read-back selects by.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unsupported`] when the statement has no RETURNING
    /// list or the table has no single-column integer key.
    pub fn read_back_key(&self) -> Result<&'static ColumnDef> {
        if self.layout.is_none() {
            return Err(Error::Unsupported(format!(
                "INSERT into `{}` has nothing to read back",
                self.table.table
            )));
        }
        let [key_column] = self.primary_key.as_slice() else {
            return Err(Error::Unsupported(format!(
                "reading back needs a single-column key on `{}`",
                self.table.table
            )));
        };
        if !key_column.data_type.is_integer() {
            return Err(Error::Unsupported(format!(
                "reading back needs an integer key; `{}.{}` is {}",
                self.table.table, key_column.name, key_column.data_type
            )));
        }
        Ok(*key_column)
    }

    /// The SELECT that reads the RETURNING list back for the row whose
    /// primary key is `key`.
    ///
    /// # Errors
    ///
    /// Fails like [`InsertStatement::read_back_key`].
    pub fn read_back(&self, key: SqlValue) -> Result<SelectStatement> {
        let key_column = self.read_back_key()?;
        let layout = self.layout.clone().unwrap_or_default();
        let filter = ExprNode::binary(
            ExprNode::Column(ColumnRef {
                path: TablePath::root(self.table.table),
                column: key_column,
            }),
            BinaryOp::Eq,
            ExprNode::Param(key),
        );
        Ok(SelectStatement {
            distinct: false,
            columns: self
                .returning
                .iter()
                .map(|expr| SelectColumn {
                    expr: expr.clone(),
                    alias: None,
                })
                .collect(),
            from: self.table.clone(),
            joins: Vec::new(),
            filter: Some(filter),
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            layout,
        })
    }
}

/// A resolved UPDATE.
#[derive(Debug, Clone)]
pub struct UpdateStatement {
    pub(crate) table: TableRef,
    pub(crate) sets: Vec<(&'static str, ExprNode)>,
    pub(crate) filter: Option<ExprNode>,
}

impl UpdateStatement {
    #[must_use]
    pub const fn table(&self) -> &TableRef {
        &self.table
    }

    /// Names of the assigned columns, in SET order.
    pub fn assigned(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.sets.iter().map(|(column, _)| *column)
    }
}

/// A resolved DELETE.
#[derive(Debug, Clone)]
pub struct DeleteStatement {
    pub(crate) table: TableRef,
    pub(crate) filter: Option<ExprNode>,
}

impl DeleteStatement {
    #[must_use]
    pub const fn table(&self) -> &TableRef {
        &self.table
    }
}

/// Any resolved statement.
#[derive(Debug, Clone)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

impl Statement {
    /// The layout of the rows this statement produces, if any.
    #[must_use]
    pub const fn layout(&self) -> Option<&Layout> {
        match self {
            Self::Select(select) => Some(&select.layout),
            Self::Insert(insert) => insert.layout.as_ref(),
            Self::Update(_) | Self::Delete(_) => None,
        }
    }

    /// The table the statement is rooted at.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::Select(s) => s.from.table,
            Self::Insert(s) => s.table.table,
            Self::Update(s) => s.table.table,
            Self::Delete(s) => s.table.table,
        }
    }
}
