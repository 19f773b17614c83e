//! Einsum to reduction notation.
//!
//! Every variable that does not index the result is summed. The `sum` for
//! a variable is placed at the lowest node of the additive tree that
//! covers all uses of the variable, so `B(i,j)*c(j) + d(i)` becomes
//! `sum(j, B(i,j)*c(j)) + d(i)` rather than a sum over the whole
//! right-hand side.

use crate::analysis::dialect::{
    is_concrete_notation, is_einsum_assignment, is_reduction_assignment, is_reduction_notation,
};
use crate::ir::expr::{sum, ExprKind, IndexExpr};
use crate::ir::stmt::{Assignment, IndexStmt, StmtKind};
use crate::ir::var::IndexVar;
use crate::transform::Transform;
use crate::utils::errors::{DialectError, DialectErrorKind, NotationResult};
use log::debug;

/// Lower an einsum assignment to reduction notation.
pub fn make_reduction_notation(assignment: &Assignment) -> NotationResult<Assignment> {
    lower_assignment(assignment, &[])
}

/// Lower every einsum assignment in `stmt` to reduction notation.
/// Variables bound by enclosing `forall`s are not summed. Assignments
/// already in reduction notation are kept.
pub fn make_reduction_notation_stmt(stmt: &IndexStmt) -> NotationResult<IndexStmt> {
    lower_stmt(stmt, &mut Vec::new())
}

/// `bound` lists variables fixed by the context the assignment runs in.
pub(crate) fn lower_assignment(assignment: &Assignment, bound: &[IndexVar]) -> NotationResult<Assignment> {
    if !is_einsum_assignment(assignment) {
        return Err(DialectError::new(
            DialectErrorKind::NotEinsum,
            "expected an assignment in einsum notation",
            assignment,
        )
        .into());
    }

    let pending: Vec<IndexVar> = assignment
        .reduction_vars()
        .into_iter()
        .filter(|var| !bound.contains(var))
        .collect();
    if pending.is_empty() {
        return Ok(assignment.clone());
    }

    debug!("summing {:?} in {}", pending, assignment);
    let rhs = sum_at_lowest_cover(assignment.rhs(), &pending);
    Ok(assignment.with_rhs(rhs))
}

fn lower_stmt(stmt: &IndexStmt, bound: &mut Vec<IndexVar>) -> NotationResult<IndexStmt> {
    match stmt.kind() {
        StmtKind::Assignment(assignment) => {
            if is_einsum_assignment(assignment) {
                let lowered = lower_assignment(assignment, bound)?;
                if lowered.rhs().ptr_eq(assignment.rhs()) {
                    Ok(stmt.clone())
                } else {
                    Ok(lowered.into())
                }
            } else if is_reduction_assignment(assignment, bound) {
                Ok(stmt.clone())
            } else {
                Err(DialectError::new(
                    DialectErrorKind::NotEinsum,
                    "expected einsum or reduction notation",
                    assignment,
                )
                .into())
            }
        }
        StmtKind::Forall { var, body } => {
            bound.push(*var);
            let lowered = lower_stmt(body, bound);
            bound.pop();
            let lowered = lowered?;
            if lowered.ptr_eq(body) {
                Ok(stmt.clone())
            } else {
                Ok(IndexStmt::new(StmtKind::Forall { var: *var, body: lowered }))
            }
        }
        StmtKind::Where { consumer, producer } => {
            let (c, p) = (lower_stmt(consumer, bound)?, lower_stmt(producer, bound)?);
            Ok(IndexStmt::new(StmtKind::Where { consumer: c, producer: p }))
        }
        StmtKind::Multi { first, second } => {
            let (a, b) = (lower_stmt(first, bound)?, lower_stmt(second, bound)?);
            Ok(IndexStmt::new(StmtKind::Multi { first: a, second: b }))
        }
        StmtKind::Sequence { definition, mutation } => {
            let (d, m) = (lower_stmt(definition, bound)?, lower_stmt(mutation, bound)?);
            Ok(IndexStmt::new(StmtKind::Sequence { definition: d, mutation: m }))
        }
    }
}

/// Wrap sums over `pending` (first-use order) around the lowest additive
/// node covering each variable's uses.
fn sum_at_lowest_cover(expr: &IndexExpr, pending: &[IndexVar]) -> IndexExpr {
    if pending.is_empty() {
        return expr.clone();
    }
    match expr.kind() {
        ExprKind::Binary { op, left, right } if op.is_additive() => {
            let (left_vars, right_vars) = (left.index_vars(), right.index_vars());
            let mut shared = Vec::new();
            let mut left_pending = Vec::new();
            let mut right_pending = Vec::new();
            for var in pending {
                match (left_vars.contains(var), right_vars.contains(var)) {
                    (true, true) => shared.push(*var),
                    (true, false) => left_pending.push(*var),
                    (false, true) => right_pending.push(*var),
                    (false, false) => {}
                }
            }
            let new_left = sum_at_lowest_cover(left, &left_pending);
            let new_right = sum_at_lowest_cover(right, &right_pending);
            let rebuilt = if new_left.ptr_eq(left) && new_right.ptr_eq(right) {
                expr.clone()
            } else {
                expr.rebuild(ExprKind::Binary { op: *op, left: new_left, right: new_right })
            };
            wrap_sums(rebuilt, &shared)
        }
        ExprKind::Neg(operand) => expr.rebuild(ExprKind::Neg(sum_at_lowest_cover(operand, pending))),
        _ => wrap_sums(expr.clone(), pending),
    }
}

/// The first variable becomes the outermost sum.
fn wrap_sums(expr: IndexExpr, vars: &[IndexVar]) -> IndexExpr {
    vars.iter().rev().fold(expr, |body, var| sum(*var, body))
}

/// Lowers einsum to reduction notation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReductionNotation;

impl Transform for ReductionNotation {
    fn apply(&self, stmt: &IndexStmt) -> NotationResult<IndexStmt> {
        make_reduction_notation_stmt(stmt)
    }

    fn is_applicable(&self, stmt: &IndexStmt) -> bool {
        !is_reduction_notation(stmt) && !is_concrete_notation(stmt)
    }

    fn name(&self) -> &str {
        "reduction-notation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::{Datatype, Type};
    use crate::ir::var::TensorVar;
    use crate::ir::stmt::forall;

    fn tensor(name: &str, order: usize) -> TensorVar {
        TensorVar::new(name, Type::fixed(Datatype::Float64, &vec![8; order]))
    }

    #[test]
    fn test_matmul() {
        let (i, j, k) = (IndexVar::new("i"), IndexVar::new("j"), IndexVar::new("k"));
        let (a, b, c) = (tensor("A", 2), tensor("B", 2), tensor("C", 2));
        let einsum = a.access(&[i, j]).assign(b.access(&[i, k]) * c.access(&[k, j]));
        let lowered = make_reduction_notation(&einsum).unwrap();
        let expected = a.access(&[i, j]).assign(sum(k, b.access(&[i, k]) * c.access(&[k, j])));
        assert_eq!(lowered, expected);
        assert!(is_reduction_notation(&lowered.into()));
    }

    #[test]
    fn test_sum_placed_at_lowest_cover() {
        let (i, j) = (IndexVar::new("i"), IndexVar::new("j"));
        let (a, b, c, d) = (tensor("a", 1), tensor("B", 2), tensor("c", 1), tensor("d", 1));
        let einsum = a.access(&[i]).assign(b.access(&[i, j]) * c.access(&[j]) + d.access(&[i]));
        let lowered = make_reduction_notation(&einsum).unwrap();
        let expected = a
            .access(&[i])
            .assign(sum(j, b.access(&[i, j]) * c.access(&[j])) + d.access(&[i]));
        assert_eq!(lowered, expected);
    }

    #[test]
    fn test_shared_variable_sums_whole_addition() {
        let (i, j) = (IndexVar::new("i"), IndexVar::new("j"));
        let (a, b, c) = (tensor("a", 1), tensor("B", 2), tensor("C", 2));
        let einsum = a.access(&[i]).assign(b.access(&[i, j]) + c.access(&[i, j]));
        let lowered = make_reduction_notation(&einsum).unwrap();
        let expected = a.access(&[i]).assign(sum(j, b.access(&[i, j]) + c.access(&[i, j])));
        assert_eq!(lowered, expected);
    }

    #[test]
    fn test_first_used_variable_is_outermost() {
        let (i, j, k, l) = (IndexVar::new("i"), IndexVar::new("j"), IndexVar::new("k"), IndexVar::new("l"));
        let (a, b, c, d) = (tensor("A", 2), tensor("B", 3), tensor("C", 2), tensor("D", 2));
        let mttkrp = a
            .access(&[i, j])
            .assign(b.access(&[i, k, l]) * c.access(&[k, j]) * d.access(&[l, j]));
        let lowered = make_reduction_notation(&mttkrp).unwrap();
        let expected = a.access(&[i, j]).assign(sum(
            k,
            sum(l, b.access(&[i, k, l]) * c.access(&[k, j]) * d.access(&[l, j])),
        ));
        assert_eq!(lowered, expected);
    }

    #[test]
    fn test_rejects_non_einsum() {
        let (i, j) = (IndexVar::new("i"), IndexVar::new("j"));
        let (a, b) = (tensor("a", 1), tensor("B", 2));
        let compound = a.access(&[i]).accumulate(b.access(&[i, j]));
        let err = make_reduction_notation(&compound).unwrap_err();
        assert!(err.to_string().contains("einsum"));
    }

    #[test]
    fn test_stmt_respects_enclosing_loops() {
        let (i, j) = (IndexVar::new("i"), IndexVar::new("j"));
        let (a, b) = (tensor("a", 1), tensor("B", 2));
        let stmt = forall(j, a.access(&[i]).assign(b.access(&[i, j])));
        let lowered = make_reduction_notation_stmt(&stmt).unwrap();
        assert!(lowered.ptr_eq(&stmt));
    }
}
