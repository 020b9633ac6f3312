//! SQL functions and aggregates.
//!
//! Aggregates over an empty group yield NULL; select them with
//! `.optional()` when that can happen.

use super::{Expr, ExprNode, IntoExpr};
use crate::value::Numeric;

fn call<T, R>(name: &'static str, arg: impl IntoExpr<T>) -> Expr<R> {
    Expr::from_node(ExprNode::Function {
        name,
        args: vec![arg.into_expr().into_node()],
    })
}

/// A literal bound as a parameter, usable anywhere an expression is.
#[must_use]
pub fn val<T>(value: impl IntoExpr<T>) -> Expr<T> {
    value.into_expr()
}

/// `COUNT(*)`.
#[must_use]
pub const fn count_all() -> Expr<i64> {
    Expr::from_node(ExprNode::CountAll)
}

/// `COUNT(expr)`: non-null values.
#[must_use]
pub fn count<T>(expr: impl IntoExpr<T>) -> Expr<i64> {
    call::<T, i64>("COUNT", expr)
}

#[must_use]
pub fn sum<T: Numeric>(expr: impl IntoExpr<T>) -> Expr<T> {
    call::<T, T>("SUM", expr)
}

#[must_use]
pub fn avg<T: Numeric>(expr: impl IntoExpr<T>) -> Expr<f64> {
    call::<T, f64>("AVG", expr)
}

#[must_use]
pub fn min<T>(expr: impl IntoExpr<T>) -> Expr<T> {
    call::<T, T>("MIN", expr)
}

#[must_use]
pub fn max<T>(expr: impl IntoExpr<T>) -> Expr<T> {
    call::<T, T>("MAX", expr)
}

#[must_use]
pub fn lower(expr: impl IntoExpr<String>) -> Expr<String> {
    call::<String, String>("LOWER", expr)
}

#[must_use]
pub fn upper(expr: impl IntoExpr<String>) -> Expr<String> {
    call::<String, String>("UPPER", expr)
}

/// `COALESCE(expr, fallback)`.
#[must_use]
pub fn coalesce<T>(expr: impl IntoExpr<T>, fallback: impl IntoExpr<T>) -> Expr<T> {
    Expr::from_node(ExprNode::Function {
        name: "COALESCE",
        args: vec![expr.into_expr().into_node(), fallback.into_expr().into_node()],
    })
}
