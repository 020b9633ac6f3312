use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, BitAnd, BitOr, Div, Mul, Neg, Not, Sub};

use chrono::{NaiveDate, NaiveDateTime};

use super::{BinaryOp, ColumnRef, ExprNode, UnaryOp};
use crate::schema::{ColumnDef, TablePath};
use crate::value::{Numeric, SqlType, SqlValue, ToSqlValue};

/// A typed column of table `Tb` holding values of type `T`.
///
/// `T` is the non-null base type; a nullable `club_id` is still a
/// `Field<_, i64>` and its nullability lives in the [`ColumnDef`].
pub struct Field<Tb, T> {
    path: TablePath,
    column: &'static ColumnDef,
    _marker: PhantomData<fn() -> (Tb, T)>,
}

impl<Tb, T> Field<Tb, T> {
    #[must_use]
    pub const fn new(path: TablePath, column: &'static ColumnDef) -> Self {
        Self {
            path,
            column,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn column(&self) -> &'static ColumnDef {
        self.column
    }

    /// The SQL column name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.column.name
    }

    #[must_use]
    pub const fn path(&self) -> &TablePath {
        &self.path
    }

    #[must_use]
    pub fn expr(&self) -> Expr<T> {
        Expr::from_node(self.node())
    }

    pub(crate) fn node(&self) -> ExprNode {
        ExprNode::Column(ColumnRef {
            path: self.path.clone(),
            column: self.column,
        })
    }
}

impl<Tb, T> Clone for Field<Tb, T> {
    fn clone(&self) -> Self {
        Self::new(self.path.clone(), self.column)
    }
}

impl<Tb, T> fmt::Debug for Field<Tb, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Field({}.{})", self.path, self.column.name)
    }
}

/// A typed expression producing values of type `T`.
pub struct Expr<T> {
    node: ExprNode,
    _type: PhantomData<fn() -> T>,
}

/// A boolean expression, usable in WHERE, HAVING and ON.
pub type Condition = Expr<bool>;

impl<T> Expr<T> {
    /// Wraps an untyped node. The caller vouches for the type.
    #[must_use]
    pub const fn from_node(node: ExprNode) -> Self {
        Self {
            node,
            _type: PhantomData,
        }
    }

    #[must_use]
    pub const fn node(&self) -> &ExprNode {
        &self.node
    }

    #[must_use]
    pub fn into_node(self) -> ExprNode {
        self.node
    }
}

impl<T> Clone for Expr<T> {
    fn clone(&self) -> Self {
        Self::from_node(self.node.clone())
    }
}

impl<T> fmt::Debug for Expr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Expr").field(&self.node).finish()
    }
}

/// Anything usable where an expression of type `T` is expected: fields,
/// expressions and plain Rust literals (bound as parameters).
pub trait IntoExpr<T> {
    fn into_expr(self) -> Expr<T>;
}

impl<T> IntoExpr<T> for Expr<T> {
    fn into_expr(self) -> Expr<T> {
        self
    }
}

impl<T> IntoExpr<T> for &Expr<T> {
    fn into_expr(self) -> Expr<T> {
        self.clone()
    }
}

impl<Tb, T> IntoExpr<T> for Field<Tb, T> {
    fn into_expr(self) -> Expr<T> {
        self.expr()
    }
}

impl<Tb, T> IntoExpr<T> for &Field<Tb, T> {
    fn into_expr(self) -> Expr<T> {
        self.expr()
    }
}

macro_rules! literal_exprs {
    ($($source:ty => $target:ty),+ $(,)?) => {
        $(
            impl IntoExpr<$target> for $source {
                fn into_expr(self) -> Expr<$target> {
                    Expr::from_node(ExprNode::Param(self.to_sql_value()))
                }
            }
        )+
    };
}

literal_exprs! {
    bool => bool,
    i16 => i16,
    i32 => i32,
    i64 => i64,
    f32 => f32,
    f64 => f64,
    String => String,
    &str => String,
    Vec<u8> => Vec<u8>,
    NaiveDate => NaiveDate,
    NaiveDateTime => NaiveDateTime,
}

impl IntoExpr<String> for &String {
    fn into_expr(self) -> Expr<String> {
        Expr::from_node(ExprNode::Param(SqlValue::Text(self.clone())))
    }
}

impl<T: SqlType> IntoExpr<T> for Option<T> {
    fn into_expr(self) -> Expr<T> {
        Expr::from_node(ExprNode::Param(self.to_sql_value()))
    }
}

fn compare<T>(left: impl IntoExpr<T>, op: BinaryOp, right: impl IntoExpr<T>) -> Condition {
    Expr::from_node(ExprNode::binary(
        left.into_expr().node,
        op,
        right.into_expr().node,
    ))
}

fn arithmetic<T>(left: impl IntoExpr<T>, op: BinaryOp, right: impl IntoExpr<T>) -> Expr<T> {
    Expr::from_node(compare(left, op, right).node)
}

/// Comparison methods shared by fields and expressions.
macro_rules! operand_methods {
    () => {
        #[must_use]
        pub fn eq(self, rhs: impl IntoExpr<T>) -> Condition {
            compare(self, BinaryOp::Eq, rhs)
        }

        #[must_use]
        pub fn not_eq(self, rhs: impl IntoExpr<T>) -> Condition {
            compare(self, BinaryOp::NotEq, rhs)
        }

        #[must_use]
        pub fn lt(self, rhs: impl IntoExpr<T>) -> Condition {
            compare(self, BinaryOp::Lt, rhs)
        }

        #[must_use]
        pub fn lt_eq(self, rhs: impl IntoExpr<T>) -> Condition {
            compare(self, BinaryOp::LtEq, rhs)
        }

        #[must_use]
        pub fn gt(self, rhs: impl IntoExpr<T>) -> Condition {
            compare(self, BinaryOp::Gt, rhs)
        }

        #[must_use]
        pub fn gt_eq(self, rhs: impl IntoExpr<T>) -> Condition {
            compare(self, BinaryOp::GtEq, rhs)
        }

        #[must_use]
        pub fn is_null(self) -> Condition {
            Expr::from_node(ExprNode::unary(
                UnaryOp::IsNull,
                IntoExpr::<T>::into_expr(self).node,
            ))
        }

        #[must_use]
        pub fn is_not_null(self) -> Condition {
            Expr::from_node(ExprNode::unary(
                UnaryOp::IsNotNull,
                IntoExpr::<T>::into_expr(self).node,
            ))
        }

        #[must_use]
        pub fn between(self, low: impl IntoExpr<T>, high: impl IntoExpr<T>) -> Condition {
            self.between_impl(low, high, false)
        }

        #[must_use]
        pub fn not_between(self, low: impl IntoExpr<T>, high: impl IntoExpr<T>) -> Condition {
            self.between_impl(low, high, true)
        }

        fn between_impl(
            self,
            low: impl IntoExpr<T>,
            high: impl IntoExpr<T>,
            negated: bool,
        ) -> Condition {
            Expr::from_node(ExprNode::Between {
                expr: Box::new(IntoExpr::<T>::into_expr(self).node),
                low: Box::new(low.into_expr().node),
                high: Box::new(high.into_expr().node),
                negated,
            })
        }

        /// `IN (...)`. An empty list is always false.
        #[must_use]
        pub fn in_list<V: IntoExpr<T>>(self, values: impl IntoIterator<Item = V>) -> Condition {
            self.in_list_impl(values, false)
        }

        /// `NOT IN (...)`. An empty list is always true.
        #[must_use]
        pub fn not_in_list<V: IntoExpr<T>>(
            self,
            values: impl IntoIterator<Item = V>,
        ) -> Condition {
            self.in_list_impl(values, true)
        }

        fn in_list_impl<V: IntoExpr<T>>(
            self,
            values: impl IntoIterator<Item = V>,
            negated: bool,
        ) -> Condition {
            Expr::from_node(ExprNode::InList {
                expr: Box::new(IntoExpr::<T>::into_expr(self).node),
                list: values.into_iter().map(|v| v.into_expr().node).collect(),
                negated,
            })
        }

        /// Casts to another SQL type.
        #[must_use]
        pub fn cast<U: SqlType>(self) -> Expr<U> {
            Expr::from_node(ExprNode::Cast {
                expr: Box::new(IntoExpr::<T>::into_expr(self).node),
                data_type: U::DATA_TYPE,
            })
        }

        /// Gives the expression a label in the select list.
        #[must_use]
        pub fn as_(self, label: impl Into<String>) -> Labeled<T> {
            Labeled::new(IntoExpr::<T>::into_expr(self), label.into())
        }
    };
}

macro_rules! numeric_methods {
    () => {
        #[must_use]
        pub fn add(self, rhs: impl IntoExpr<T>) -> Expr<T> {
            arithmetic(self, BinaryOp::Add, rhs)
        }

        #[must_use]
        pub fn sub(self, rhs: impl IntoExpr<T>) -> Expr<T> {
            arithmetic(self, BinaryOp::Sub, rhs)
        }

        #[must_use]
        pub fn mul(self, rhs: impl IntoExpr<T>) -> Expr<T> {
            arithmetic(self, BinaryOp::Mul, rhs)
        }

        #[must_use]
        pub fn div(self, rhs: impl IntoExpr<T>) -> Expr<T> {
            arithmetic(self, BinaryOp::Div, rhs)
        }

        #[must_use]
        pub fn neg(self) -> Expr<T> {
            Expr::from_node(ExprNode::unary(
                UnaryOp::Neg,
                IntoExpr::<T>::into_expr(self).node,
            ))
        }
    };
}

macro_rules! text_methods {
    () => {
        #[must_use]
        pub fn like(self, pattern: impl IntoExpr<String>) -> Condition {
            compare(self, BinaryOp::Like, pattern)
        }

        #[must_use]
        pub fn not_like(self, pattern: impl IntoExpr<String>) -> Condition {
            compare(self, BinaryOp::NotLike, pattern)
        }

        /// String concatenation (`||`).
        #[must_use]
        pub fn concat(self, rhs: impl IntoExpr<String>) -> Expr<String> {
            arithmetic(self, BinaryOp::Concat, rhs)
        }

        #[must_use]
        pub fn lower(self) -> Expr<String> {
            super::lower(self)
        }

        #[must_use]
        pub fn upper(self) -> Expr<String> {
            super::upper(self)
        }
    };
}

#[allow(clippy::should_implement_trait)]
impl<T> Expr<T> {
    operand_methods!();
}

#[allow(clippy::should_implement_trait)]
impl<Tb, T> Field<Tb, T> {
    operand_methods!();
}

#[allow(clippy::should_implement_trait)]
impl<T: Numeric> Expr<T> {
    numeric_methods!();
}

#[allow(clippy::should_implement_trait)]
impl<Tb, T: Numeric> Field<Tb, T> {
    numeric_methods!();
}

impl Expr<String> {
    text_methods!();
}

impl<Tb> Field<Tb, String> {
    text_methods!();
}

#[allow(clippy::should_implement_trait)]
impl Condition {
    #[must_use]
    pub fn and(self, rhs: impl IntoExpr<bool>) -> Self {
        compare(self, BinaryOp::And, rhs)
    }

    #[must_use]
    pub fn or(self, rhs: impl IntoExpr<bool>) -> Self {
        compare(self, BinaryOp::Or, rhs)
    }

    #[must_use]
    pub fn not(self) -> Self {
        Self::from_node(ExprNode::unary(UnaryOp::Not, self.node))
    }
}

impl<R: IntoExpr<bool>> BitAnd<R> for Condition {
    type Output = Self;

    fn bitand(self, rhs: R) -> Self {
        self.and(rhs)
    }
}

impl<R: IntoExpr<bool>> BitOr<R> for Condition {
    type Output = Self;

    fn bitor(self, rhs: R) -> Self {
        self.or(rhs)
    }
}

impl Not for Condition {
    type Output = Self;

    fn not(self) -> Self {
        Self::not(self)
    }
}

macro_rules! arithmetic_ops {
    ($($trait:ident :: $method:ident => $op:ident),+) => {
        $(
            impl<T: Numeric, R: IntoExpr<T>> $trait<R> for Expr<T> {
                type Output = Self;

                fn $method(self, rhs: R) -> Self {
                    arithmetic(self, BinaryOp::$op, rhs)
                }
            }

            impl<Tb, T: Numeric, R: IntoExpr<T>> $trait<R> for Field<Tb, T> {
                type Output = Expr<T>;

                fn $method(self, rhs: R) -> Expr<T> {
                    arithmetic(self, BinaryOp::$op, rhs)
                }
            }
        )+
    };
}

arithmetic_ops!(Add::add => Add, Sub::sub => Sub, Mul::mul => Mul, Div::div => Div);

impl<T: Numeric> Neg for Expr<T> {
    type Output = Self;

    fn neg(self) -> Self {
        Self::from_node(ExprNode::unary(UnaryOp::Neg, self.node))
    }
}

/// An expression with an explicit label in the select list.
pub struct Labeled<T> {
    pub(crate) expr: Expr<T>,
    pub(crate) label: String,
}

impl<T> Labeled<T> {
    const fn new(expr: Expr<T>, label: String) -> Self {
        Self { expr, label }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl<T> Clone for Labeled<T> {
    fn clone(&self) -> Self {
        Self::new(self.expr.clone(), self.label.clone())
    }
}

impl<T> fmt::Debug for Labeled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Labeled")
            .field("expr", &self.expr)
            .field("label", &self.label)
            .finish()
    }
}
