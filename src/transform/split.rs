//! Operator splitting.
//!
//! `split_operator(S, l op r, j, jl, jr)` splits the loop over `j` that
//! contains `l op r` in two: a producer loop over `jl` stores `l` in a
//! workspace, and the original loop, now over `jr`, reads the workspace in
//! place of `l`:
//!
//! ```text
//! forall(j, A(j) = B(j) * C(j))
//!   => where(forall(jr, A(jr) = w(jr) * C(jr)),
//!            forall(jl, w(jl) = B(jl)))
//! ```
//!
//! The workspace keeps one mode per loop between `j` and the assignment
//! that the left operand depends on. The rewritten binary node records
//! the split in its schedule.

use crate::ir::expr::{BinaryOp, IndexExpr};
use crate::ir::query::get_index_var_domains;
use crate::ir::schedule::OperatorSplit;
use crate::ir::stmt::{forall, where_, IndexStmt, StmtKind};
use crate::ir::types::{Dimension, Format, Type};
use crate::ir::var::{IndexVar, TensorVar};
use crate::ir::visit::{RenameIndexVar, ReplaceExpr, StmtRewriter};
use crate::transform::Transform;
use crate::utils::errors::{NotationResult, TransformError, TransformErrorKind};
use log::debug;
use std::collections::BTreeMap;

const NAME: &str = "split-operator";

/// Split the loop over `old` around the first occurrence of `expr`.
///
/// A non-binary `expr` has no operator to split; the statement is
/// returned unchanged.
pub fn split_operator(
    stmt: &IndexStmt,
    expr: &IndexExpr,
    old: IndexVar,
    left: IndexVar,
    right: IndexVar,
) -> NotationResult<IndexStmt> {
    let Some((op, operand, rest)) = expr.as_binary() else {
        debug!("{} is not a binary expression; nothing to split", expr);
        return Ok(stmt.clone());
    };
    let target = Target {
        expr,
        op,
        operand,
        rest,
        split: OperatorSplit { old, left, right },
        domains: get_index_var_domains(stmt)?,
    };
    match target.split_first(stmt)? {
        Some(rewritten) => Ok(rewritten),
        None => Err(TransformError::new(
            TransformErrorKind::UnboundVariable,
            NAME,
            format!("no forall over {} in {}", old, stmt),
        )
        .into()),
    }
}

struct Target<'a> {
    expr: &'a IndexExpr,
    op: BinaryOp,
    operand: &'a IndexExpr,
    rest: &'a IndexExpr,
    split: OperatorSplit,
    domains: BTreeMap<IndexVar, Dimension>,
}

impl Target<'_> {
    /// `None` if `stmt` contains no loop over the split variable.
    fn split_first(&self, stmt: &IndexStmt) -> NotationResult<Option<IndexStmt>> {
        let rebuilt = match stmt.kind() {
            StmtKind::Assignment(_) => None,
            StmtKind::Forall { var, body } if *var == self.split.old => Some(self.split_loop(body)?),
            StmtKind::Forall { var, body } => self.split_first(body)?.map(|body| forall(*var, body)),
            StmtKind::Where { consumer, producer } => match self.split_first(consumer)? {
                Some(c) => Some(IndexStmt::new(StmtKind::Where { consumer: c, producer: producer.clone() })),
                None => self
                    .split_first(producer)?
                    .map(|p| IndexStmt::new(StmtKind::Where { consumer: consumer.clone(), producer: p })),
            },
            StmtKind::Multi { first, second } => match self.split_first(first)? {
                Some(a) => Some(IndexStmt::new(StmtKind::Multi { first: a, second: second.clone() })),
                None => self
                    .split_first(second)?
                    .map(|b| IndexStmt::new(StmtKind::Multi { first: first.clone(), second: b })),
            },
            StmtKind::Sequence { definition, mutation } => match self.split_first(definition)? {
                Some(d) => Some(IndexStmt::new(StmtKind::Sequence { definition: d, mutation: mutation.clone() })),
                None => self
                    .split_first(mutation)?
                    .map(|m| IndexStmt::new(StmtKind::Sequence { definition: definition.clone(), mutation: m })),
            },
        };
        Ok(rebuilt)
    }

    fn split_loop(&self, body: &IndexStmt) -> NotationResult<IndexStmt> {
        let split = self.split;
        let Some(path) = path_to(body, self.expr) else {
            return Err(TransformError::new(
                TransformErrorKind::ExpressionNotFound,
                NAME,
                format!("{} does not occur under forall({}, ...)", self.expr, split.old),
            )
            .into());
        };

        let operand_vars = self.operand.index_vars();
        let mut modes = vec![split.old];
        modes.extend(path.iter().copied().filter(|var| operand_vars.contains(var)));
        let shape = modes
            .iter()
            .map(|var| self.domains.get(var).copied().unwrap_or(Dimension::Variable))
            .collect();
        let workspace = TensorVar::with_format(
            &format!("w{}", split.old),
            Type::new(self.operand.datatype(), shape),
            Format::dense(modes.len()),
        );
        debug!("{} workspace {} for {}", split, workspace, self.operand);

        // Consumer: the full expression reads the workspace, over `right`.
        let replacement = IndexExpr::binary(self.op, workspace.access(&modes).into(), self.rest.clone())
            .with_schedule(self.expr.schedule().with_operator_split(split));
        let mut replace = ReplaceExpr::new(self.expr, &replacement);
        replace.first_only = true;
        let consumer = replace.rewrite_stmt(body);
        let consumer = RenameIndexVar { from: split.old, to: split.right }.rewrite_stmt(&consumer);

        // Producer: the left operand into the workspace, over `left`.
        let fill = workspace.access(&modes).assign(self.operand.clone());
        let producer = modes[1..].iter().rev().fold(IndexStmt::from(fill), |stmt, var| forall(*var, stmt));
        let producer = RenameIndexVar { from: split.old, to: split.left }.rewrite_stmt(&producer);

        Ok(where_(forall(split.right, consumer), forall(split.left, producer)))
    }
}

/// Loops from `stmt` down to the first assignment containing `expr`.
fn path_to(stmt: &IndexStmt, expr: &IndexExpr) -> Option<Vec<IndexVar>> {
    match stmt.kind() {
        StmtKind::Assignment(assignment) => assignment.rhs().contains(expr).then(Vec::new),
        StmtKind::Forall { var, body } => path_to(body, expr).map(|mut path| {
            path.insert(0, *var);
            path
        }),
        StmtKind::Where { consumer: a, producer: b }
        | StmtKind::Multi { first: a, second: b }
        | StmtKind::Sequence { definition: a, mutation: b } => path_to(a, expr).or_else(|| path_to(b, expr)),
    }
}

/// Operator splitting as a pipeline pass.
#[derive(Debug, Clone)]
pub struct SplitOperator {
    pub expr: IndexExpr,
    pub old: IndexVar,
    pub left: IndexVar,
    pub right: IndexVar,
}

impl Transform for SplitOperator {
    fn apply(&self, stmt: &IndexStmt) -> NotationResult<IndexStmt> {
        split_operator(stmt, &self.expr, self.old, self.left, self.right)
    }

    /// A missing target is left to `apply`, which reports it.
    fn is_applicable(&self, _stmt: &IndexStmt) -> bool {
        self.expr.is_binary()
    }

    fn name(&self) -> &str {
        NAME
    }
}
