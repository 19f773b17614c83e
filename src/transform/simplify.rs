//! Zero propagation.
//!
//! Given a set of accesses known to be zero everywhere, remove the parts of
//! an expression they annihilate:
//!
//! ```text
//! x * 0 -> 0      x + 0 -> x      0 - x -> -x
//! 0 / x -> 0      x - 0 -> x      -0    -> 0
//! sum(i, 0) -> 0
//! ```
//!
//! `x / 0` is left alone. Only accesses in the zero set start a
//! propagation; literal zeros already in the expression are kept.

use crate::ir::expr::{Access, BinaryOp, ExprKind, IndexExpr, Literal};
use crate::ir::stmt::IndexStmt;
use crate::ir::visit::{ExprRewriter, StmtRewriter};
use crate::transform::Transform;
use crate::utils::errors::NotationResult;
use log::debug;
use std::collections::HashSet;

/// Simplify `expr` assuming every access in `zeroed` is zero.
///
/// An expression that simplifies away entirely becomes a zero literal of
/// its datatype.
pub fn simplify(expr: &IndexExpr, zeroed: &HashSet<Access>) -> IndexExpr {
    match propagate(expr, zeroed) {
        Some(simplified) => simplified,
        None => {
            debug!("{} is zero", expr);
            IndexExpr::literal(Literal::zero(expr.datatype()))
        }
    }
}

/// `None` means the expression is known to be zero.
fn propagate(expr: &IndexExpr, zeroed: &HashSet<Access>) -> Option<IndexExpr> {
    match expr.kind() {
        ExprKind::Access(access) => {
            if zeroed.contains(access) {
                None
            } else {
                Some(expr.clone())
            }
        }
        ExprKind::Literal(_) => Some(expr.clone()),
        ExprKind::Neg(operand) => {
            let operand2 = propagate(operand, zeroed)?;
            Some(if operand2.ptr_eq(operand) {
                expr.clone()
            } else {
                expr.rebuild(ExprKind::Neg(operand2))
            })
        }
        ExprKind::Binary { op, left, right } => {
            let (l, r) = (propagate(left, zeroed), propagate(right, zeroed));
            let rebuild = |a: IndexExpr, b: IndexExpr| {
                if a.ptr_eq(left) && b.ptr_eq(right) {
                    expr.clone()
                } else {
                    expr.rebuild(ExprKind::Binary { op: *op, left: a, right: b })
                }
            };
            match (*op, l, r) {
                (_, Some(a), Some(b)) => Some(rebuild(a, b)),
                (BinaryOp::Mul, _, _) => None,
                (BinaryOp::Div, None, _) => None,
                (BinaryOp::Div, Some(a), None) => Some(rebuild(a, right.clone())),
                (BinaryOp::Add | BinaryOp::Sub, Some(a), None) => Some(a),
                (BinaryOp::Add, None, Some(b)) => Some(b),
                (BinaryOp::Sub, None, Some(b)) => Some(IndexExpr::neg(b)),
                (BinaryOp::Add | BinaryOp::Sub, None, None) => None,
            }
        }
        ExprKind::Reduction { op, var, body } => {
            let body2 = propagate(body, zeroed)?;
            Some(if body2.ptr_eq(body) {
                expr.clone()
            } else {
                expr.rebuild(ExprKind::Reduction { op: *op, var: *var, body: body2 })
            })
        }
    }
}

struct ZeroPropagation<'a> {
    zeroed: &'a HashSet<Access>,
}

impl ExprRewriter for ZeroPropagation<'_> {
    fn rewrite_expr(&mut self, expr: &IndexExpr) -> IndexExpr {
        simplify(expr, self.zeroed)
    }
}

impl StmtRewriter for ZeroPropagation<'_> {}

/// Simplify the right-hand side of every assignment in `stmt`.
pub fn simplify_stmt(stmt: &IndexStmt, zeroed: &HashSet<Access>) -> IndexStmt {
    ZeroPropagation { zeroed }.rewrite_stmt(stmt)
}

/// Zero propagation as a pipeline pass.
#[derive(Debug, Clone, Default)]
pub struct Simplify {
    pub zeroed: HashSet<Access>,
}

impl Simplify {
    pub fn new(zeroed: impl IntoIterator<Item = Access>) -> Self {
        Self { zeroed: zeroed.into_iter().collect() }
    }
}

impl Transform for Simplify {
    fn apply(&self, stmt: &IndexStmt) -> NotationResult<IndexStmt> {
        Ok(simplify_stmt(stmt, &self.zeroed))
    }

    fn is_applicable(&self, _stmt: &IndexStmt) -> bool {
        !self.zeroed.is_empty()
    }

    fn name(&self) -> &str {
        "simplify"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::expr::sum;
    use crate::ir::types::{Datatype, Type};
    use crate::ir::var::{IndexVar, TensorVar};

    fn vector(name: &str) -> TensorVar {
        TensorVar::new(name, Type::fixed(Datatype::Float64, &[8]))
    }

    #[test]
    fn test_product_with_zero_vanishes() {
        let i = IndexVar::new("i");
        let (b, c, d) = (vector("b"), vector("c"), vector("d"));
        let zeroed: HashSet<Access> = [c.access(&[i])].into_iter().collect();
        let expr = b.access(&[i]) * c.access(&[i]) + d.access(&[i]);
        assert_eq!(simplify(&expr, &zeroed), IndexExpr::from(d.access(&[i])));
    }

    #[test]
    fn test_zero_minus_x_negates() {
        let i = IndexVar::new("i");
        let (b, c) = (vector("b"), vector("c"));
        let zeroed: HashSet<Access> = [b.access(&[i])].into_iter().collect();
        let expr = b.access(&[i]) - c.access(&[i]);
        assert_eq!(simplify(&expr, &zeroed), -c.access(&[i]));
    }

    #[test]
    fn test_division_by_zero_left_alone() {
        let i = IndexVar::new("i");
        let (b, c) = (vector("b"), vector("c"));
        let zeroed: HashSet<Access> = [c.access(&[i])].into_iter().collect();
        let expr = b.access(&[i]) / c.access(&[i]);
        assert!(simplify(&expr, &zeroed).ptr_eq(&expr));

        let numerator_zero = c.access(&[i]) / b.access(&[i]);
        let zero = simplify(&numerator_zero, &zeroed);
        assert!(zero.to_literal().unwrap().is_zero());
    }

    #[test]
    fn test_reduction_of_zero() {
        let (i, j) = (IndexVar::new("i"), IndexVar::new("j"));
        let b = TensorVar::new("B", Type::fixed(Datatype::Int32, &[8, 8]));
        let zeroed: HashSet<Access> = [b.access(&[i, j])].into_iter().collect();
        let simplified = simplify(&sum(j, b.access(&[i, j])), &zeroed);
        assert_eq!(simplified, IndexExpr::literal(Literal::zero(Datatype::Int32)));
    }

    #[test]
    fn test_empty_zero_set_is_identity() {
        let i = IndexVar::new("i");
        let (b, c) = (vector("b"), vector("c"));
        let expr = b.access(&[i]) * 0i64 + c.access(&[i]);
        let simplified = simplify(&expr, &HashSet::new());
        assert!(simplified.ptr_eq(&expr));
    }
}
