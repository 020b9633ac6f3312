//! Typed expressions and predicates.
//!
//! [`Field`] and [`Expr`] carry the Rust type of the value they produce as a
//! phantom parameter, so comparing a text column with an integer does not
//! compile. Underneath, both wrap an untyped [`ExprNode`] tree which the
//! statement engine resolves and renders.

mod functions;
mod typed;

pub use functions::{avg, coalesce, count, count_all, lower, max, min, sum, upper, val};
pub use typed::{Condition, Expr, Field, IntoExpr, Labeled};

use crate::schema::{ColumnDef, TablePath};
use crate::statement::SelectStatement;
use crate::types::DataType;
use crate::value::SqlValue;

/// A column reached through a table path.
#[derive(Debug, Clone)]
pub struct ColumnRef {
    pub path: TablePath,
    pub column: &'static ColumnDef,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    Like,
    NotLike,
    Concat,
}

impl BinaryOp {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::Concat => "||",
        }
    }

    /// AND and OR group their operands.
    #[must_use]
    pub const fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    IsNull,
    IsNotNull,
}

/// An untyped expression tree.
#[derive(Debug, Clone)]
pub enum ExprNode {
    Column(ColumnRef),
    /// A bound parameter.
    Param(SqlValue),
    /// The k-th correlated value of the enclosing row, bound when a
    /// multiset sub-select runs.
    Outer(usize),
    Binary {
        op: BinaryOp,
        left: Box<ExprNode>,
        right: Box<ExprNode>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<ExprNode>,
    },
    Function {
        name: &'static str,
        args: Vec<ExprNode>,
    },
    CountAll,
    Cast {
        expr: Box<ExprNode>,
        data_type: DataType,
    },
    Between {
        expr: Box<ExprNode>,
        low: Box<ExprNode>,
        high: Box<ExprNode>,
        negated: bool,
    },
    InList {
        expr: Box<ExprNode>,
        list: Vec<ExprNode>,
        negated: bool,
    },
    /// A row constructor such as `(a, b)`.
    Row(Vec<ExprNode>),
    InSubquery {
        expr: Box<ExprNode>,
        query: Box<SelectStatement>,
    },
}

impl ExprNode {
    #[must_use]
    pub fn binary(left: Self, op: BinaryOp, right: Self) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[must_use]
    pub fn unary(op: UnaryOp, operand: Self) -> Self {
        Self::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Joins conditions with AND; `None` for an empty input.
    #[must_use]
    pub fn and_all(conditions: impl IntoIterator<Item = Self>) -> Option<Self> {
        conditions
            .into_iter()
            .reduce(|acc, next| Self::binary(acc, BinaryOp::And, next))
    }

    /// Visits every column reference in the tree.
    pub fn for_each_column(&self, f: &mut impl FnMut(&ColumnRef)) {
        match self {
            Self::Column(column) => f(column),
            Self::Param(_) | Self::Outer(_) | Self::CountAll | Self::InSubquery { .. } => {}
            Self::Binary { left, right, .. } => {
                left.for_each_column(f);
                right.for_each_column(f);
            }
            Self::Unary { operand, .. } => operand.for_each_column(f),
            Self::Cast { expr, .. } => expr.for_each_column(f),
            Self::Function { args, .. } | Self::Row(args) => {
                args.iter().for_each(|arg| arg.for_each_column(f));
            }
            Self::Between {
                expr, low, high, ..
            } => {
                expr.for_each_column(f);
                low.for_each_column(f);
                high.for_each_column(f);
            }
            Self::InList { expr, list, .. } => {
                expr.for_each_column(f);
                list.iter().for_each(|item| item.for_each_column(f));
            }
        }
    }
}
