//! Traversal and rewriting of index notation.
//!
//! Visitors override the hooks they care about and fall back to the
//! `walk_*` defaults for everything else. Rewriters return a new tree; a
//! node is only rebuilt when one of its children changed, so unchanged
//! sub-trees stay shared with the input.

use crate::ir::expr::{Access, BinaryOp, ExprKind, IndexExpr, Literal};
use crate::ir::stmt::{Assignment, IndexStmt, StmtKind};
use crate::ir::var::IndexVar;

pub trait ExprVisitor {
    fn visit_expr(&mut self, expr: &IndexExpr) {
        walk_expr(self, expr)
    }

    fn visit_access(&mut self, _access: &Access) {}

    fn visit_literal(&mut self, _literal: &Literal) {}

    fn visit_neg(&mut self, operand: &IndexExpr) {
        self.visit_expr(operand)
    }

    fn visit_binary(&mut self, _op: BinaryOp, left: &IndexExpr, right: &IndexExpr) {
        self.visit_expr(left);
        self.visit_expr(right);
    }

    fn visit_reduction(&mut self, _op: BinaryOp, _var: IndexVar, body: &IndexExpr) {
        self.visit_expr(body)
    }
}

/// Dispatch `expr` to the matching hook of `visitor`.
pub fn walk_expr<V: ExprVisitor + ?Sized>(visitor: &mut V, expr: &IndexExpr) {
    match expr.kind() {
        ExprKind::Access(access) => visitor.visit_access(access),
        ExprKind::Literal(literal) => visitor.visit_literal(literal),
        ExprKind::Neg(operand) => visitor.visit_neg(operand),
        ExprKind::Binary { op, left, right } => visitor.visit_binary(*op, left, right),
        ExprKind::Reduction { op, var, body } => visitor.visit_reduction(*op, *var, body),
    }
}

pub trait StmtVisitor: ExprVisitor {
    fn visit_stmt(&mut self, stmt: &IndexStmt) {
        walk_stmt(self, stmt)
    }

    fn visit_assignment(&mut self, assignment: &Assignment) {
        self.visit_access(assignment.lhs());
        self.visit_expr(assignment.rhs());
    }

    fn visit_forall(&mut self, _var: IndexVar, body: &IndexStmt) {
        self.visit_stmt(body)
    }

    fn visit_where(&mut self, consumer: &IndexStmt, producer: &IndexStmt) {
        self.visit_stmt(consumer);
        self.visit_stmt(producer);
    }

    fn visit_multi(&mut self, first: &IndexStmt, second: &IndexStmt) {
        self.visit_stmt(first);
        self.visit_stmt(second);
    }

    fn visit_sequence(&mut self, definition: &IndexStmt, mutation: &IndexStmt) {
        self.visit_stmt(definition);
        self.visit_stmt(mutation);
    }
}

pub fn walk_stmt<V: StmtVisitor + ?Sized>(visitor: &mut V, stmt: &IndexStmt) {
    match stmt.kind() {
        StmtKind::Assignment(assignment) => visitor.visit_assignment(assignment),
        StmtKind::Forall { var, body } => visitor.visit_forall(*var, body),
        StmtKind::Where { consumer, producer } => visitor.visit_where(consumer, producer),
        StmtKind::Multi { first, second } => visitor.visit_multi(first, second),
        StmtKind::Sequence { definition, mutation } => visitor.visit_sequence(definition, mutation),
    }
}

pub trait ExprRewriter {
    fn rewrite_expr(&mut self, expr: &IndexExpr) -> IndexExpr {
        rewrite_expr_children(self, expr)
    }

    fn rewrite_access(&mut self, access: &Access) -> Access {
        let indices = access.indices().iter().map(|var| self.rewrite_index_var(*var)).collect();
        Access::new(access.tensor().clone(), indices)
    }

    fn rewrite_index_var(&mut self, var: IndexVar) -> IndexVar {
        var
    }
}

/// Rewrite the children of `expr`, rebuilding it only if one changed.
pub fn rewrite_expr_children<R: ExprRewriter + ?Sized>(rewriter: &mut R, expr: &IndexExpr) -> IndexExpr {
    match expr.kind() {
        ExprKind::Access(access) => {
            let rewritten = rewriter.rewrite_access(access);
            if rewritten == *access {
                expr.clone()
            } else {
                expr.rebuild(ExprKind::Access(rewritten))
            }
        }
        ExprKind::Literal(_) => expr.clone(),
        ExprKind::Neg(operand) => {
            let rewritten = rewriter.rewrite_expr(operand);
            if rewritten.ptr_eq(operand) {
                expr.clone()
            } else {
                expr.rebuild(ExprKind::Neg(rewritten))
            }
        }
        ExprKind::Binary { op, left, right } => {
            let new_left = rewriter.rewrite_expr(left);
            let new_right = rewriter.rewrite_expr(right);
            if new_left.ptr_eq(left) && new_right.ptr_eq(right) {
                expr.clone()
            } else {
                expr.rebuild(ExprKind::Binary { op: *op, left: new_left, right: new_right })
            }
        }
        ExprKind::Reduction { op, var, body } => {
            let new_var = rewriter.rewrite_index_var(*var);
            let new_body = rewriter.rewrite_expr(body);
            if new_var == *var && new_body.ptr_eq(body) {
                expr.clone()
            } else {
                expr.rebuild(ExprKind::Reduction { op: *op, var: new_var, body: new_body })
            }
        }
    }
}

pub trait StmtRewriter: ExprRewriter {
    fn rewrite_stmt(&mut self, stmt: &IndexStmt) -> IndexStmt {
        rewrite_stmt_children(self, stmt)
    }
}

pub fn rewrite_stmt_children<R: StmtRewriter + ?Sized>(rewriter: &mut R, stmt: &IndexStmt) -> IndexStmt {
    match stmt.kind() {
        StmtKind::Assignment(assignment) => {
            let lhs = rewriter.rewrite_access(assignment.lhs());
            let rhs = rewriter.rewrite_expr(assignment.rhs());
            if lhs == *assignment.lhs() && rhs.ptr_eq(assignment.rhs()) {
                stmt.clone()
            } else {
                Assignment::new(lhs, rhs, assignment.op()).into()
            }
        }
        StmtKind::Forall { var, body } => {
            let new_var = rewriter.rewrite_index_var(*var);
            let new_body = rewriter.rewrite_stmt(body);
            if new_var == *var && new_body.ptr_eq(body) {
                stmt.clone()
            } else {
                IndexStmt::new(StmtKind::Forall { var: new_var, body: new_body })
            }
        }
        StmtKind::Where { consumer, producer } => {
            let (c, p) = (rewriter.rewrite_stmt(consumer), rewriter.rewrite_stmt(producer));
            if c.ptr_eq(consumer) && p.ptr_eq(producer) {
                stmt.clone()
            } else {
                IndexStmt::new(StmtKind::Where { consumer: c, producer: p })
            }
        }
        StmtKind::Multi { first, second } => {
            let (a, b) = (rewriter.rewrite_stmt(first), rewriter.rewrite_stmt(second));
            if a.ptr_eq(first) && b.ptr_eq(second) {
                stmt.clone()
            } else {
                IndexStmt::new(StmtKind::Multi { first: a, second: b })
            }
        }
        StmtKind::Sequence { definition, mutation } => {
            let (d, m) = (rewriter.rewrite_stmt(definition), rewriter.rewrite_stmt(mutation));
            if d.ptr_eq(definition) && m.ptr_eq(mutation) {
                stmt.clone()
            } else {
                IndexStmt::new(StmtKind::Sequence { definition: d, mutation: m })
            }
        }
    }
}

/// Replaces every occurrence of one index variable with another.
pub struct RenameIndexVar {
    pub from: IndexVar,
    pub to: IndexVar,
}

impl ExprRewriter for RenameIndexVar {
    fn rewrite_index_var(&mut self, var: IndexVar) -> IndexVar {
        if var == self.from { self.to } else { var }
    }
}

impl StmtRewriter for RenameIndexVar {}

/// Replaces structural occurrences of `target` with `replacement`.
pub struct ReplaceExpr<'a> {
    pub target: &'a IndexExpr,
    pub replacement: &'a IndexExpr,
    /// Stop after the first (leftmost) occurrence.
    pub first_only: bool,
    pub replaced: usize,
}

impl<'a> ReplaceExpr<'a> {
    pub fn new(target: &'a IndexExpr, replacement: &'a IndexExpr) -> Self {
        Self { target, replacement, first_only: false, replaced: 0 }
    }
}

impl ExprRewriter for ReplaceExpr<'_> {
    fn rewrite_expr(&mut self, expr: &IndexExpr) -> IndexExpr {
        if self.first_only && self.replaced > 0 {
            return expr.clone();
        }
        if expr == self.target {
            self.replaced += 1;
            return self.replacement.clone();
        }
        rewrite_expr_children(self, expr)
    }
}

impl StmtRewriter for ReplaceExpr<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::expr::sum;
    use crate::ir::stmt::forall;
    use crate::ir::types::{Datatype, Type};
    use crate::ir::var::TensorVar;

    struct AccessCounter(usize);

    impl ExprVisitor for AccessCounter {
        fn visit_access(&mut self, _access: &Access) {
            self.0 += 1;
        }
    }

    impl StmtVisitor for AccessCounter {}

    #[test]
    fn test_visitor_counts_accesses() {
        let (i, j) = (IndexVar::new("i"), IndexVar::new("j"));
        let a = TensorVar::new("a", Type::fixed(Datatype::Float64, &[3]));
        let b = TensorVar::new("B", Type::fixed(Datatype::Float64, &[3, 3]));
        let c = TensorVar::new("c", Type::fixed(Datatype::Float64, &[3]));
        let stmt = forall(i, a.access(&[i]).assign(sum(j, b.access(&[i, j]) * c.access(&[j]))));
        let mut counter = AccessCounter(0);
        counter.visit_stmt(&stmt);
        assert_eq!(counter.0, 3);
    }

    #[test]
    fn test_rename_shares_untouched_subtrees() {
        let (i, j, k) = (IndexVar::new("i"), IndexVar::new("j"), IndexVar::new("k"));
        let b = TensorVar::new("b", Type::fixed(Datatype::Float64, &[3]));
        let c = TensorVar::new("c", Type::fixed(Datatype::Float64, &[3]));
        let untouched = IndexExpr::from(c.access(&[j]));
        let expr = b.access(&[i]) * &untouched;

        let renamed = RenameIndexVar { from: i, to: k }.rewrite_expr(&expr);
        assert_eq!(renamed, b.access(&[k]) * c.access(&[j]));
        let (_, _, right) = renamed.to_binary().unwrap();
        assert!(right.ptr_eq(&untouched));

        let same = RenameIndexVar { from: k, to: i }.rewrite_expr(&expr);
        assert!(same.ptr_eq(&expr));
    }

    #[test]
    fn test_replace_first_only() {
        let i = IndexVar::new("i");
        let b = TensorVar::new("b", Type::fixed(Datatype::Float64, &[3]));
        let target = IndexExpr::from(b.access(&[i]));
        let replacement = IndexExpr::from(1i64);
        let expr = &target + &target;

        let mut replace = ReplaceExpr::new(&target, &replacement);
        replace.first_only = true;
        let rewritten = replace.rewrite_expr(&expr);
        assert_eq!(replace.replaced, 1);
        assert_eq!(rewritten, IndexExpr::from(1i64) + b.access(&[i]));
    }
}
