//! Index statements.
//!
//! Statements give an index expression a destination and, in concrete
//! notation, an explicit loop structure:
//!
//! ```text
//! A(i,j) = B(i,j,k) * C(k,j)                        // einsum
//! A(i,j) = sum(k, B(i,j,k) * C(k,j))                // reduction
//! forall(i, forall(j, forall(k,
//!     A(i,j) += B(i,j,k) * C(k,j))))                // concrete
//! ```

use crate::ir::expr::{Access, BinaryOp, IndexExpr};
use crate::ir::var::IndexVar;
use crate::utils::errors::CastError;
use std::sync::Arc;

/// `lhs = rhs`, or `lhs op= rhs` when `op` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    lhs: Access,
    rhs: IndexExpr,
    op: Option<BinaryOp>,
}

impl Assignment {
    pub fn new(lhs: Access, rhs: IndexExpr, op: Option<BinaryOp>) -> Self {
        Self { lhs, rhs, op }
    }

    pub fn lhs(&self) -> &Access { &self.lhs }

    pub fn rhs(&self) -> &IndexExpr { &self.rhs }

    pub fn op(&self) -> Option<BinaryOp> { self.op }

    pub fn is_compound(&self) -> bool { self.op.is_some() }

    /// Same destination and operator, different right-hand side.
    pub fn with_rhs(&self, rhs: IndexExpr) -> Self {
        Self { lhs: self.lhs.clone(), rhs, op: self.op }
    }

    /// The variables indexing the result.
    pub fn free_vars(&self) -> &[IndexVar] {
        self.lhs.indices()
    }

    /// Variables used on the right-hand side but not indexing the result,
    /// in first-use order.
    pub fn reduction_vars(&self) -> Vec<IndexVar> {
        let free = self.free_vars();
        self.rhs
            .index_vars()
            .into_iter()
            .filter(|var| !free.contains(var))
            .collect()
    }
}

/// The node variants of an index statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    Assignment(Assignment),
    /// Execute `body` once per value of `var`.
    Forall { var: IndexVar, body: IndexStmt },
    /// Run `producer` to completion, then `consumer`.
    Where { consumer: IndexStmt, producer: IndexStmt },
    /// Two independent computations sharing one iteration space.
    Multi { first: IndexStmt, second: IndexStmt },
    /// `definition`, then `mutation` which updates the same result.
    Sequence { definition: IndexStmt, mutation: IndexStmt },
}

impl StmtKind {
    pub fn variant_name(&self) -> &'static str {
        match self {
            StmtKind::Assignment(_) => "Assignment",
            StmtKind::Forall { .. } => "Forall",
            StmtKind::Where { .. } => "Where",
            StmtKind::Multi { .. } => "Multi",
            StmtKind::Sequence { .. } => "Sequence",
        }
    }
}

/// A handle to a shared, immutable statement node.
#[derive(Debug, Clone)]
pub struct IndexStmt(Arc<StmtKind>);

impl IndexStmt {
    pub fn new(kind: StmtKind) -> Self {
        Self(Arc::new(kind))
    }

    pub fn kind(&self) -> &StmtKind { &self.0 }

    pub fn ptr_eq(&self, other: &IndexStmt) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn as_assignment(&self) -> Option<&Assignment> {
        match self.kind() {
            StmtKind::Assignment(assignment) => Some(assignment),
            _ => None,
        }
    }

    pub fn as_forall(&self) -> Option<(IndexVar, &IndexStmt)> {
        match self.kind() {
            StmtKind::Forall { var, body } => Some((*var, body)),
            _ => None,
        }
    }

    pub fn as_where(&self) -> Option<(&IndexStmt, &IndexStmt)> {
        match self.kind() {
            StmtKind::Where { consumer, producer } => Some((consumer, producer)),
            _ => None,
        }
    }

    pub fn as_multi(&self) -> Option<(&IndexStmt, &IndexStmt)> {
        match self.kind() {
            StmtKind::Multi { first, second } => Some((first, second)),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<(&IndexStmt, &IndexStmt)> {
        match self.kind() {
            StmtKind::Sequence { definition, mutation } => Some((definition, mutation)),
            _ => None,
        }
    }

    pub fn to_assignment(&self) -> Result<&Assignment, CastError> {
        self.as_assignment().ok_or_else(|| self.cast_error("Assignment"))
    }

    pub fn to_forall(&self) -> Result<(IndexVar, &IndexStmt), CastError> {
        self.as_forall().ok_or_else(|| self.cast_error("Forall"))
    }

    pub fn to_where(&self) -> Result<(&IndexStmt, &IndexStmt), CastError> {
        self.as_where().ok_or_else(|| self.cast_error("Where"))
    }

    pub fn to_multi(&self) -> Result<(&IndexStmt, &IndexStmt), CastError> {
        self.as_multi().ok_or_else(|| self.cast_error("Multi"))
    }

    pub fn to_sequence(&self) -> Result<(&IndexStmt, &IndexStmt), CastError> {
        self.as_sequence().ok_or_else(|| self.cast_error("Sequence"))
    }

    fn cast_error(&self, expected: &'static str) -> CastError {
        CastError { expected, found: self.kind().variant_name() }
    }
}

impl PartialEq for IndexStmt {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.kind() == other.kind()
    }
}

impl Eq for IndexStmt {}

impl From<Assignment> for IndexStmt {
    fn from(assignment: Assignment) -> Self {
        IndexStmt::new(StmtKind::Assignment(assignment))
    }
}

/// `forall(var, body)`
pub fn forall(var: IndexVar, body: impl Into<IndexStmt>) -> IndexStmt {
    IndexStmt::new(StmtKind::Forall { var, body: body.into() })
}

/// `where(consumer, producer)`
pub fn where_(consumer: impl Into<IndexStmt>, producer: impl Into<IndexStmt>) -> IndexStmt {
    IndexStmt::new(StmtKind::Where { consumer: consumer.into(), producer: producer.into() })
}

/// `multi(first, second)`
pub fn multi(first: impl Into<IndexStmt>, second: impl Into<IndexStmt>) -> IndexStmt {
    IndexStmt::new(StmtKind::Multi { first: first.into(), second: second.into() })
}

/// `sequence(definition, mutation)`
pub fn sequence(definition: impl Into<IndexStmt>, mutation: impl Into<IndexStmt>) -> IndexStmt {
    IndexStmt::new(StmtKind::Sequence { definition: definition.into(), mutation: mutation.into() })
}
