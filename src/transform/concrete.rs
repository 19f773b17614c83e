//! Reduction (or einsum) to concrete notation.
//!
//! Free variables become the outermost loops, in result order. Reductions
//! at the top of the right-hand side that share one operator become inner
//! loops around a compound assignment:
//!
//! ```text
//! A(i,j) = sum(k, B(i,k) * C(k,j))
//!   => forall(i, forall(j, forall(k, A(i,j) += B(i,k) * C(k,j))))
//! ```
//!
//! Any reduction left inside the right-hand side is computed into a fresh
//! scalar temporary by a `where` producer:
//!
//! ```text
//! a(i) = sum(k, B(i,k)) * c(i)
//!   => forall(i, where(a(i) = tk * c(i), forall(k, tk += B(i,k))))
//! ```

use crate::analysis::dialect::{is_concrete_notation, is_einsum_assignment, is_reduction_assignment};
use crate::ir::expr::{Access, BinaryOp, IndexExpr};
use crate::ir::stmt::{forall, where_, Assignment, IndexStmt, StmtKind};
use crate::ir::types::Type;
use crate::ir::var::{IndexVar, TensorVar};
use crate::ir::visit::{rewrite_expr_children, ExprRewriter};
use crate::transform::reduction;
use crate::transform::Transform;
use crate::utils::errors::{DialectError, DialectErrorKind, NotationResult};
use log::{debug, trace};
use std::collections::BTreeSet;

/// Lower an assignment in einsum or reduction notation to concrete
/// notation.
pub fn make_concrete_notation(assignment: &Assignment) -> NotationResult<IndexStmt> {
    concretize_assignment(assignment, &[])
}

/// Lower every assignment in `stmt` that is not yet loop-bound.
/// A statement already in concrete notation is returned unchanged.
///
/// Fails with `NotLowerable` when an assignment sits under a loop it
/// cannot accumulate over, as in `forall(j, a(i) = B(i,j))`.
pub fn make_concrete_notation_stmt(stmt: &IndexStmt) -> NotationResult<IndexStmt> {
    if is_concrete_notation(stmt) {
        return Ok(stmt.clone());
    }
    let lowered = concretize_stmt(stmt, &mut Vec::new())?;
    if !is_concrete_notation(&lowered) {
        return Err(DialectError::new(
            DialectErrorKind::NotLowerable,
            "plain assignment under a loop over a reduction variable",
            stmt,
        )
        .into());
    }
    Ok(lowered)
}

fn concretize_assignment(assignment: &Assignment, bound: &[IndexVar]) -> NotationResult<IndexStmt> {
    let reduced = if is_reduction_assignment(assignment, bound) {
        assignment.clone()
    } else if is_einsum_assignment(assignment) {
        reduction::lower_assignment(assignment, bound)?
    } else {
        return Err(DialectError::new(
            DialectErrorKind::NotLowerable,
            "expected einsum or reduction notation",
            assignment,
        )
        .into());
    };

    let body = lower_reductions(reduced.lhs(), reduced.rhs(), reduced.op(), &mut BTreeSet::new());

    let mut free: Vec<IndexVar> = Vec::new();
    for var in assignment.free_vars() {
        if !bound.contains(var) && !free.contains(var) {
            free.push(*var);
        }
    }
    debug!("free loops {:?} around {}", free, body);
    Ok(free.iter().rev().fold(body, |stmt, var| forall(*var, stmt)))
}

/// Concrete statement computing `lhs op= rhs` for a fixed point of the
/// free variables.
/// `names` holds the temporaries already introduced for this assignment.
fn lower_reductions(
    lhs: &Access,
    rhs: &IndexExpr,
    op: Option<BinaryOp>,
    names: &mut BTreeSet<String>,
) -> IndexStmt {
    let mut op = op;
    let mut loops = Vec::new();
    let mut rhs = rhs.clone();
    while let Some((reduction_op, var, body)) = rhs.as_reduction() {
        if op.is_some_and(|op| op != reduction_op) {
            break;
        }
        op = Some(reduction_op);
        loops.push(var);
        rhs = body.clone();
    }

    let mut temporaries = Temporaries { producers: Vec::new(), names };
    let rhs = temporaries.rewrite_expr(&rhs);

    let mut stmt: IndexStmt = Assignment::new(lhs.clone(), rhs, op).into();
    // The first producer must run first, so it wraps outermost.
    for producer in temporaries.producers.into_iter().rev() {
        stmt = where_(stmt, producer);
    }
    loops.iter().rev().fold(stmt, |stmt, var| forall(*var, stmt))
}

/// Replaces each outermost reduction with a scalar temporary, collecting
/// the statements that compute them.
struct Temporaries<'a> {
    producers: Vec<IndexStmt>,
    names: &'a mut BTreeSet<String>,
}

impl Temporaries<'_> {
    /// `t<var>`, then `t<var>_1`, `t<var>_2`, ... for later reductions over
    /// the same variable.
    fn fresh_name(&mut self, var: IndexVar) -> String {
        let base = format!("t{}", var);
        let mut name = base.clone();
        let mut suffix = 1;
        while self.names.contains(&name) {
            name = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        self.names.insert(name.clone());
        name
    }
}

impl ExprRewriter for Temporaries<'_> {
    fn rewrite_expr(&mut self, expr: &IndexExpr) -> IndexExpr {
        match expr.as_reduction() {
            Some((_, var, _)) => {
                let name = self.fresh_name(var);
                let temporary = TensorVar::new(&name, Type::scalar(expr.datatype()));
                trace!("temporary {} for {}", temporary.name(), expr);
                let access = temporary.scalar();
                let producer = lower_reductions(&access, expr, None, self.names);
                self.producers.push(producer);
                access.into()
            }
            None => rewrite_expr_children(self, expr),
        }
    }
}

fn concretize_stmt(stmt: &IndexStmt, bound: &mut Vec<IndexVar>) -> NotationResult<IndexStmt> {
    match stmt.kind() {
        StmtKind::Assignment(assignment) => {
            let loop_bound = assignment.lhs().indices().iter().all(|var| bound.contains(var))
                && assignment.rhs().index_vars().iter().all(|var| bound.contains(var))
                && !crate::analysis::has_reduction(assignment.rhs(), None);
            if loop_bound {
                Ok(stmt.clone())
            } else {
                concretize_assignment(assignment, bound)
            }
        }
        StmtKind::Forall { var, body } => {
            bound.push(*var);
            let lowered = concretize_stmt(body, bound);
            bound.pop();
            let lowered = lowered?;
            if lowered.ptr_eq(body) {
                Ok(stmt.clone())
            } else {
                Ok(forall(*var, lowered))
            }
        }
        StmtKind::Where { consumer, producer } => {
            Ok(where_(concretize_stmt(consumer, bound)?, concretize_stmt(producer, bound)?))
        }
        StmtKind::Multi { first, second } => Ok(IndexStmt::new(StmtKind::Multi {
            first: concretize_stmt(first, bound)?,
            second: concretize_stmt(second, bound)?,
        })),
        StmtKind::Sequence { definition, mutation } => Ok(IndexStmt::new(StmtKind::Sequence {
            definition: concretize_stmt(definition, bound)?,
            mutation: concretize_stmt(mutation, bound)?,
        })),
    }
}

/// Lowers einsum or reduction notation to concrete notation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcreteNotation;

impl Transform for ConcreteNotation {
    fn apply(&self, stmt: &IndexStmt) -> NotationResult<IndexStmt> {
        make_concrete_notation_stmt(stmt)
    }

    fn is_applicable(&self, stmt: &IndexStmt) -> bool {
        !is_concrete_notation(stmt)
    }

    fn name(&self) -> &str {
        "concrete-notation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::expr::{product, sum};
    use crate::ir::types::Datatype;
    use crate::utils::errors::NotationError;

    fn tensor(name: &str, order: usize) -> TensorVar {
        TensorVar::new(name, Type::fixed(Datatype::Float64, &vec![8; order]))
    }

    #[test]
    fn test_matmul_from_einsum() {
        let (i, j, k) = (IndexVar::new("i"), IndexVar::new("j"), IndexVar::new("k"));
        let (a, b, c) = (tensor("A", 2), tensor("B", 2), tensor("C", 2));
        let einsum = a.access(&[i, j]).assign(b.access(&[i, k]) * c.access(&[k, j]));
        let concrete = make_concrete_notation(&einsum).unwrap();
        let expected = forall(
            i,
            forall(j, forall(k, a.access(&[i, j]).accumulate(b.access(&[i, k]) * c.access(&[k, j])))),
        );
        assert_eq!(concrete, expected);
        assert!(is_concrete_notation(&concrete));
    }

    #[test]
    fn test_elementwise_stays_plain() {
        let (i, j) = (IndexVar::new("i"), IndexVar::new("j"));
        let (a, b, c) = (tensor("A", 2), tensor("B", 2), tensor("C", 2));
        let add = a.access(&[i, j]).assign(b.access(&[i, j]) + c.access(&[i, j]));
        let concrete = make_concrete_notation(&add).unwrap();
        assert_eq!(concrete, forall(i, forall(j, add.clone())));
    }

    #[test]
    fn test_nested_reduction_uses_temporary() {
        let (i, k) = (IndexVar::new("i"), IndexVar::new("k"));
        let (a, b, c) = (tensor("a", 1), tensor("B", 2), tensor("c", 1));
        let stmt = a.access(&[i]).assign(sum(k, b.access(&[i, k])) * c.access(&[i]));
        let concrete = make_concrete_notation(&stmt).unwrap();
        assert!(is_concrete_notation(&concrete));

        let (var, body) = concrete.to_forall().unwrap();
        assert_eq!(var, i);
        let (consumer, producer) = body.to_where().unwrap();
        let consumer = consumer.to_assignment().unwrap();
        assert!(!consumer.is_compound());
        let temporary = consumer.rhs().to_binary().unwrap().1.to_access().unwrap().tensor().clone();
        assert_eq!(temporary.name(), "tk");
        assert_eq!(temporary.order(), 0);
        assert_eq!(
            *producer,
            forall(k, temporary.scalar().accumulate(b.access(&[i, k])))
        );
    }

    #[test]
    fn test_temporaries_get_distinct_names() {
        let (i, k) = (IndexVar::new("i"), IndexVar::new("k"));
        let (a, b, c) = (tensor("a", 1), tensor("B", 2), tensor("C", 2));
        let stmt = a.access(&[i]).assign(sum(k, b.access(&[i, k])) * sum(k, c.access(&[i, k])));
        let concrete = make_concrete_notation(&stmt).unwrap();
        assert!(is_concrete_notation(&concrete));
        assert_eq!(
            concrete.to_string(),
            "forall(i, where(where(a(i) = tk * tk_1, forall(k, tk_1 += C(i,k))), forall(k, tk += B(i,k))))"
        );
    }

    #[test]
    fn test_mixed_operators_split_into_producer() {
        let (i, j, k) = (IndexVar::new("i"), IndexVar::new("j"), IndexVar::new("k"));
        let (a, b) = (tensor("a", 1), tensor("B", 3));
        let stmt = a.access(&[i]).assign(sum(j, product(k, b.access(&[i, j, k]))));
        let concrete = make_concrete_notation(&stmt).unwrap();
        assert!(is_concrete_notation(&concrete));

        let (_, body) = concrete.to_forall().unwrap();
        let (var, inner) = body.to_forall().unwrap();
        assert_eq!(var, j);
        let (consumer, producer) = inner.to_where().unwrap();
        assert_eq!(consumer.to_assignment().unwrap().op(), Some(BinaryOp::Add));
        let (var, update) = producer.to_forall().unwrap();
        assert_eq!(var, k);
        assert_eq!(update.to_assignment().unwrap().op(), Some(BinaryOp::Mul));
    }

    #[test]
    fn test_already_concrete_is_unchanged() {
        let (i, k) = (IndexVar::new("i"), IndexVar::new("k"));
        let (a, b) = (tensor("a", 1), tensor("B", 2));
        let stmt = forall(i, forall(k, a.access(&[i]).accumulate(b.access(&[i, k]))));
        assert!(make_concrete_notation_stmt(&stmt).unwrap().ptr_eq(&stmt));
    }

    #[test]
    fn test_rejects_plain_assignment_under_reduction_loop() {
        let (i, j) = (IndexVar::new("i"), IndexVar::new("j"));
        let (a, b) = (tensor("a", 1), tensor("B", 2));
        let stmt = forall(j, a.access(&[i]).assign(b.access(&[i, j])));
        match make_concrete_notation_stmt(&stmt) {
            Err(NotationError::Dialect(err)) => assert_eq!(err.kind, DialectErrorKind::NotLowerable),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rejects_compound_input() {
        let (i, k) = (IndexVar::new("i"), IndexVar::new("k"));
        let (a, b) = (tensor("a", 1), tensor("B", 2));
        let stmt = a.access(&[i]).accumulate(b.access(&[i, k]));
        assert!(make_concrete_notation(&stmt).is_err());
    }
}
