//! Queries over index notation: which index variables occur, and what
//! ranges they take.

use crate::ir::expr::{Access, BinaryOp, IndexExpr};
use crate::ir::stmt::IndexStmt;
use crate::ir::types::Dimension;
use crate::ir::var::IndexVar;
use crate::ir::visit::{ExprVisitor, StmtVisitor};
use crate::utils::errors::{NotationResult, ShapeError, ShapeErrorKind};
use std::collections::{BTreeMap, HashSet};

#[derive(Default)]
struct IndexVarCollector {
    seen: HashSet<IndexVar>,
    vars: Vec<IndexVar>,
}

impl IndexVarCollector {
    fn add(&mut self, var: IndexVar) {
        if self.seen.insert(var) {
            self.vars.push(var);
        }
    }
}

impl ExprVisitor for IndexVarCollector {
    fn visit_access(&mut self, access: &Access) {
        for var in access.indices() {
            self.add(*var);
        }
    }

    fn visit_reduction(&mut self, _op: BinaryOp, var: IndexVar, body: &IndexExpr) {
        self.add(var);
        self.visit_expr(body);
    }
}

impl StmtVisitor for IndexVarCollector {
    fn visit_forall(&mut self, var: IndexVar, body: &IndexStmt) {
        self.add(var);
        self.visit_stmt(body);
    }
}

/// Every index variable in `expr`, once each, in first-use order.
pub fn get_index_vars(expr: &IndexExpr) -> Vec<IndexVar> {
    let mut collector = IndexVarCollector::default();
    collector.visit_expr(expr);
    collector.vars
}

/// Every index variable in `stmt`, including loop variables, in first-use
/// order.
pub fn get_stmt_index_vars(stmt: &IndexStmt) -> Vec<IndexVar> {
    let mut collector = IndexVarCollector::default();
    collector.visit_stmt(stmt);
    collector.vars
}

#[derive(Default)]
struct DomainCollector {
    domains: BTreeMap<IndexVar, Dimension>,
    error: Option<ShapeError>,
}

impl DomainCollector {
    fn record(&mut self, access: &Access) {
        let tensor = access.tensor();
        if access.indices().len() != tensor.order() {
            self.fail(
                ShapeErrorKind::OrderMismatch,
                format!(
                    "tensor {} of order {} accessed with {} indices",
                    tensor.name(),
                    tensor.order(),
                    access.indices().len()
                ),
                Vec::new(),
            );
            return;
        }

        for (mode, var) in access.indices().iter().enumerate() {
            let dimension = tensor.ty().dimension(mode).unwrap_or(Dimension::Variable);
            match self.domains.get(var).copied() {
                None | Some(Dimension::Variable) => {
                    self.domains.insert(*var, dimension);
                }
                Some(known) => {
                    if dimension.is_fixed() && dimension != known {
                        self.fail(
                            ShapeErrorKind::ConflictingDomains,
                            format!(
                                "index variable {} ranges over both {} and {} (mode {} of {})",
                                var, known, dimension, mode, tensor.name()
                            ),
                            vec![known.to_string(), dimension.to_string()],
                        );
                    }
                }
            }
        }
    }

    fn fail(&mut self, kind: ShapeErrorKind, message: String, domains: Vec<String>) {
        if self.error.is_none() {
            self.error = Some(ShapeError { message, kind, domains });
        }
    }

    fn finish(self) -> NotationResult<BTreeMap<IndexVar, Dimension>> {
        match self.error {
            Some(error) => Err(error.into()),
            None => Ok(self.domains),
        }
    }
}

impl ExprVisitor for DomainCollector {
    fn visit_access(&mut self, access: &Access) {
        self.record(access);
    }
}

impl StmtVisitor for DomainCollector {}

/// The range of every index variable used to access a tensor in `stmt`.
///
/// A variable indexing a mode of unknown size stays `Variable` until some
/// other access pins it. Two different fixed sizes are an error.
pub fn get_index_var_domains(stmt: &IndexStmt) -> NotationResult<BTreeMap<IndexVar, Dimension>> {
    let mut collector = DomainCollector::default();
    collector.visit_stmt(stmt);
    collector.finish()
}

impl IndexExpr {
    pub fn index_vars(&self) -> Vec<IndexVar> {
        get_index_vars(self)
    }
}

impl IndexStmt {
    pub fn index_vars(&self) -> Vec<IndexVar> {
        get_stmt_index_vars(self)
    }

    pub fn index_var_domains(&self) -> NotationResult<BTreeMap<IndexVar, Dimension>> {
        get_index_var_domains(self)
    }
}
