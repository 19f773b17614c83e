//! Dialect classification.
//!
//! Index notation comes in three dialects of increasing explicitness:
//!
//! - einsum: a single plain assignment whose right-hand side is a sum of
//!   products; every variable missing from the result is implicitly summed.
//! - reduction: a single plain assignment where every summation is an
//!   explicit `sum`/`product` node.
//! - concrete: every variable is bound by a `forall`, reductions are
//!   spelled as compound assignments, and temporaries appear through
//!   `where` clauses.
//!
//! The predicates here are pure; none of them fail.

use crate::ir::expr::{BinaryOp, ExprKind, IndexExpr};
use crate::ir::stmt::{Assignment, IndexStmt, StmtKind};
use crate::ir::var::IndexVar;
use log::trace;
use serde::{Serialize, Deserialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    Einsum,
    Reduction,
    Concrete,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Einsum => write!(f, "einsum"),
            Dialect::Reduction => write!(f, "reduction"),
            Dialect::Concrete => write!(f, "concrete"),
        }
    }
}

/// Whether `stmt` is a plain assignment whose right-hand side is a sum of
/// products without explicit reductions.
pub fn is_einsum_notation(stmt: &IndexStmt) -> bool {
    match stmt.as_assignment() {
        Some(assignment) => is_einsum_assignment(assignment),
        None => {
            trace!("not einsum: {} is not an assignment", stmt.kind().variant_name());
            false
        }
    }
}

pub(crate) fn is_einsum_assignment(assignment: &Assignment) -> bool {
    if assignment.is_compound() {
        trace!("not einsum: compound assignment {}", assignment);
        return false;
    }
    let ok = is_sum_of_products(assignment.rhs(), false);
    if !ok {
        trace!("not einsum: {} is not a sum of products", assignment.rhs());
    }
    ok
}

fn is_sum_of_products(expr: &IndexExpr, under_product: bool) -> bool {
    match expr.kind() {
        ExprKind::Access(_) | ExprKind::Literal(_) => true,
        ExprKind::Neg(operand) => is_sum_of_products(operand, under_product),
        ExprKind::Binary { op, left, right } if op.is_additive() => {
            !under_product && is_sum_of_products(left, false) && is_sum_of_products(right, false)
        }
        ExprKind::Binary { left, right, .. } => {
            is_sum_of_products(left, true) && is_sum_of_products(right, true)
        }
        ExprKind::Reduction { .. } => false,
    }
}

/// Whether `stmt` is a plain assignment in which every index variable is
/// either free or bound by exactly one enclosing reduction.
pub fn is_reduction_notation(stmt: &IndexStmt) -> bool {
    match stmt.as_assignment() {
        Some(assignment) => is_reduction_assignment(assignment, &[]),
        None => {
            trace!("not reduction: {} is not an assignment", stmt.kind().variant_name());
            false
        }
    }
}

/// Reduction-notation check for an assignment nested under loops over
/// `bound`.
pub(crate) fn is_reduction_assignment(assignment: &Assignment, bound: &[IndexVar]) -> bool {
    if assignment.is_compound() {
        trace!("not reduction: compound assignment {}", assignment);
        return false;
    }
    let mut scope: Vec<IndexVar> = bound.to_vec();
    scope.extend_from_slice(assignment.free_vars());
    let ok = reductions_bind_all(assignment.rhs(), &mut scope);
    if !ok {
        trace!("not reduction: {} has unbound or rebound variables", assignment.rhs());
    }
    ok
}

fn reductions_bind_all(expr: &IndexExpr, scope: &mut Vec<IndexVar>) -> bool {
    match expr.kind() {
        ExprKind::Access(access) => access.indices().iter().all(|var| scope.contains(var)),
        ExprKind::Literal(_) => true,
        ExprKind::Neg(operand) => reductions_bind_all(operand, scope),
        ExprKind::Binary { left, right, .. } => {
            reductions_bind_all(left, scope) && reductions_bind_all(right, scope)
        }
        ExprKind::Reduction { var, body, .. } => {
            if scope.contains(var) {
                return false;
            }
            scope.push(*var);
            let ok = reductions_bind_all(body, scope);
            scope.pop();
            ok
        }
    }
}

/// Whether every index variable in `stmt` is bound by exactly one
/// enclosing `forall`, no reduction nodes remain, and every assignment
/// that iterates over a variable missing from its result accumulates
/// with a compound operator.
pub fn is_concrete_notation(stmt: &IndexStmt) -> bool {
    let ok = is_concrete_in(stmt, &mut Vec::new(), 0);
    if !ok {
        trace!("not concrete: {}", stmt);
    }
    ok
}

/// `bound[scope_start..]` are the loops entered since the innermost
/// enclosing `where` producer began; variables bound before that are
/// fixed for the whole producer.
fn is_concrete_in(stmt: &IndexStmt, bound: &mut Vec<IndexVar>, scope_start: usize) -> bool {
    match stmt.kind() {
        StmtKind::Assignment(assignment) => {
            let lhs_bound = assignment.lhs().indices().iter().all(|var| bound.contains(var));
            if !lhs_bound || !loop_bound(assignment.rhs(), bound) {
                return false;
            }
            let loops = &bound[scope_start..];
            let accumulates = assignment.reduction_vars().iter().any(|var| loops.contains(var));
            !accumulates || assignment.is_compound()
        }
        StmtKind::Forall { var, body } => {
            if bound.contains(var) {
                return false;
            }
            bound.push(*var);
            let ok = is_concrete_in(body, bound, scope_start);
            bound.pop();
            ok
        }
        StmtKind::Where { consumer, producer } => {
            let producer_start = bound.len();
            is_concrete_in(consumer, bound, scope_start) && is_concrete_in(producer, bound, producer_start)
        }
        StmtKind::Multi { first, second } => {
            is_concrete_in(first, bound, scope_start) && is_concrete_in(second, bound, scope_start)
        }
        StmtKind::Sequence { definition, mutation } => {
            is_concrete_in(definition, bound, scope_start) && is_concrete_in(mutation, bound, scope_start)
        }
    }
}

fn loop_bound(expr: &IndexExpr, bound: &[IndexVar]) -> bool {
    match expr.kind() {
        ExprKind::Access(access) => access.indices().iter().all(|var| bound.contains(var)),
        ExprKind::Literal(_) => true,
        ExprKind::Neg(operand) => loop_bound(operand, bound),
        ExprKind::Binary { left, right, .. } => loop_bound(left, bound) && loop_bound(right, bound),
        ExprKind::Reduction { .. } => false,
    }
}

/// The most explicit dialect `stmt` belongs to, if any.
pub fn classify(stmt: &IndexStmt) -> Option<Dialect> {
    if is_concrete_notation(stmt) {
        Some(Dialect::Concrete)
    } else if is_reduction_notation(stmt) {
        Some(Dialect::Reduction)
    } else if is_einsum_notation(stmt) {
        Some(Dialect::Einsum)
    } else {
        None
    }
}

/// Whether `expr` contains an explicit reduction with operator `op`.
pub fn has_reduction(expr: &IndexExpr, op: Option<BinaryOp>) -> bool {
    match expr.kind() {
        ExprKind::Access(_) | ExprKind::Literal(_) => false,
        ExprKind::Neg(operand) => has_reduction(operand, op),
        ExprKind::Binary { left, right, .. } => has_reduction(left, op) || has_reduction(right, op),
        ExprKind::Reduction { op: found, body, .. } => {
            op.map_or(true, |op| op == *found) || has_reduction(body, op)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::expr::sum;
    use crate::ir::stmt::{forall, where_};
    use crate::ir::types::{Datatype, Type};
    use crate::ir::var::TensorVar;

    fn tensor(name: &str, order: usize) -> TensorVar {
        TensorVar::new(name, Type::fixed(Datatype::Float64, &vec![8; order]))
    }

    #[test]
    fn test_einsum() {
        let (i, j) = (IndexVar::new("i"), IndexVar::new("j"));
        let (a, b, c) = (tensor("a", 1), tensor("B", 2), tensor("c", 1));
        let matvec: IndexStmt = a.access(&[i]).assign(b.access(&[i, j]) * c.access(&[j])).into();
        assert!(is_einsum_notation(&matvec));
        assert!(!is_reduction_notation(&matvec));
        assert_eq!(classify(&matvec), Some(Dialect::Einsum));

        let distributed: IndexStmt = a
            .access(&[i])
            .assign(b.access(&[i, j]) * (c.access(&[j]) + c.access(&[j])))
            .into();
        assert!(!is_einsum_notation(&distributed));

        let compound: IndexStmt = a.access(&[i]).accumulate(c.access(&[i])).into();
        assert!(!is_einsum_notation(&compound));
    }

    #[test]
    fn test_reduction() {
        let (i, j) = (IndexVar::new("i"), IndexVar::new("j"));
        let (a, b, c) = (tensor("a", 1), tensor("B", 2), tensor("c", 1));
        let matvec: IndexStmt = a
            .access(&[i])
            .assign(sum(j, b.access(&[i, j]) * c.access(&[j])))
            .into();
        assert!(is_reduction_notation(&matvec));
        assert!(!is_einsum_notation(&matvec));
        assert_eq!(classify(&matvec), Some(Dialect::Reduction));

        let rebound: IndexStmt = a.access(&[i]).assign(sum(i, c.access(&[i]))).into();
        assert!(!is_reduction_notation(&rebound));

        let twice: IndexStmt = a
            .access(&[i])
            .assign(sum(j, sum(j, b.access(&[i, j]))))
            .into();
        assert!(!is_reduction_notation(&twice));
    }

    #[test]
    fn test_concrete() {
        let (i, k) = (IndexVar::new("i"), IndexVar::new("k"));
        let (a, b, t) = (tensor("a", 1), tensor("B", 2), tensor("t", 0));
        let accumulate = forall(i, forall(k, a.access(&[i]).accumulate(b.access(&[i, k]))));
        assert!(is_concrete_notation(&accumulate));
        assert_eq!(classify(&accumulate), Some(Dialect::Concrete));

        let overwrite = forall(i, forall(k, a.access(&[i]).assign(b.access(&[i, k]))));
        assert!(!is_concrete_notation(&overwrite));

        let unbound: IndexStmt = forall(i, a.access(&[i]).accumulate(b.access(&[i, k])));
        assert!(!is_concrete_notation(&unbound));

        let rebound = forall(i, forall(i, a.access(&[i]).assign(b.access(&[i, i]))));
        assert!(!is_concrete_notation(&rebound));

        let temporary = forall(
            i,
            where_(
                a.access(&[i]).assign(t.scalar()),
                forall(k, t.scalar().accumulate(b.access(&[i, k]))),
            ),
        );
        assert!(is_concrete_notation(&temporary));
    }

    #[test]
    fn test_unclassifiable() {
        let i = IndexVar::new("i");
        let (a, b) = (tensor("a", 1), tensor("b", 1));
        let stmt: IndexStmt = a.access(&[i]).accumulate(sum(i, b.access(&[i]))).into();
        assert_eq!(classify(&stmt), None);
    }
}
