//! Lowering pipeline for index notation.
//!
//! This module provides a high-level interface for taking an einsum (or
//! reduction) statement down to a target dialect, with optional zero
//! propagation beforehand, operator splits afterwards, and a dialect check
//! after every pass.

use crate::analysis::{classify, is_concrete_notation, is_reduction_notation, Dialect};
use crate::ir::expr::Access;
use crate::ir::stmt::IndexStmt;
use crate::transform::{ConcreteNotation, ReductionNotation, Simplify, SplitOperator, Transform};
use crate::utils::errors::{TransformError, TransformErrorKind};
use anyhow::{Context, Result};
use log::{debug, info};

/// Lowering pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Dialect to lower to
    pub target: Dialect,
    /// Accesses known to be zero
    pub zeroed: Vec<Access>,
    /// Operator splits applied once the statement is concrete
    pub splits: Vec<SplitOperator>,
    /// Check the dialect of the output after every pass
    pub verify: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target: Dialect::Concrete,
            zeroed: Vec::new(),
            splits: Vec::new(),
            verify: true,
        }
    }
}

impl PipelineConfig {
    /// Stop at reduction notation.
    pub fn to_reduction() -> Self {
        Self {
            target: Dialect::Reduction,
            ..Default::default()
        }
    }

    /// Lower all the way to concrete notation.
    pub fn to_concrete() -> Self {
        Self::default()
    }

    /// Add accesses known to be zero.
    pub fn with_zeroed(mut self, zeroed: impl IntoIterator<Item = Access>) -> Self {
        self.zeroed.extend(zeroed);
        self
    }

    /// Add an operator split.
    pub fn with_split(mut self, split: SplitOperator) -> Self {
        self.splits.push(split);
        self
    }
}

/// Result of the lowering pipeline.
#[derive(Debug)]
pub struct LoweringResult {
    /// The lowered statement
    pub stmt: IndexStmt,
    /// Transformations that were applied
    pub applied_transforms: Vec<String>,
    /// Whether the statement was modified
    pub modified: bool,
    /// Dialect of the output
    pub dialect: Option<Dialect>,
}

/// Lowering pipeline.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration.
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Create a pipeline with default configuration.
    pub fn default_pipeline() -> Self {
        Self::new(PipelineConfig::default())
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the lowering pipeline.
    pub fn run(&self, stmt: &IndexStmt) -> Result<LoweringResult> {
        info!("lowering {} to {} notation", stmt, self.config.target);
        let mut result = LoweringResult {
            stmt: stmt.clone(),
            applied_transforms: Vec::new(),
            modified: false,
            dialect: None,
        };

        if !self.config.zeroed.is_empty() {
            let simplify = Simplify::new(self.config.zeroed.iter().cloned());
            self.apply_pass(&simplify, &mut result, None)?;
        }

        match self.config.target {
            Dialect::Einsum => {}
            Dialect::Reduction => {
                self.apply_pass(&ReductionNotation, &mut result, Some(Dialect::Reduction))?;
            }
            Dialect::Concrete => {
                self.apply_pass(&ConcreteNotation, &mut result, Some(Dialect::Concrete))?;
                for split in &self.config.splits {
                    self.apply_pass(split, &mut result, Some(Dialect::Concrete))?;
                }
            }
        }

        result.dialect = classify(&result.stmt);
        debug!("lowered to {}", result.stmt);
        Ok(result)
    }

    fn apply_pass(
        &self,
        pass: &dyn Transform,
        result: &mut LoweringResult,
        postcondition: Option<Dialect>,
    ) -> Result<()> {
        if !pass.is_applicable(&result.stmt) {
            debug!("{}: not applicable", pass.name());
        } else {
            let lowered = pass
                .apply(&result.stmt)
                .with_context(|| format!("{} failed on {}", pass.name(), result.stmt))?;
            debug!("{}: {}", pass.name(), lowered);
            if !lowered.ptr_eq(&result.stmt) {
                result.modified = true;
            }
            result.stmt = lowered;
            result.applied_transforms.push(pass.name().to_string());
        }

        if self.config.verify {
            if let Some(dialect) = postcondition {
                self.verify(pass, &result.stmt, dialect)?;
            }
        }
        Ok(())
    }

    fn verify(&self, pass: &dyn Transform, stmt: &IndexStmt, dialect: Dialect) -> Result<()> {
        let holds = match dialect {
            Dialect::Einsum => true,
            // Statements with loops are checked leaf by leaf during lowering.
            Dialect::Reduction => stmt.as_assignment().is_none() || is_reduction_notation(stmt),
            Dialect::Concrete => is_concrete_notation(stmt),
        };
        if holds {
            Ok(())
        } else {
            Err(TransformError::new(
                TransformErrorKind::PostconditionFailed,
                pass.name(),
                format!("{} is not in {} notation", stmt, dialect),
            )
            .into())
        }
    }
}

/// Lower to reduction notation with default settings.
pub fn lower_to_reduction(stmt: &IndexStmt) -> Result<LoweringResult> {
    Pipeline::new(PipelineConfig::to_reduction()).run(stmt)
}

/// Lower to concrete notation with default settings.
pub fn lower_to_concrete(stmt: &IndexStmt) -> Result<LoweringResult> {
    Pipeline::default_pipeline().run(stmt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::expr::IndexExpr;
    use crate::ir::types::{Datatype, Type};
    use crate::ir::var::{IndexVar, TensorVar};
    use crate::utils::errors::NotationError;

    fn tensor(name: &str, order: usize) -> TensorVar {
        TensorVar::new(name, Type::fixed(Datatype::Float64, &vec![8; order]))
    }

    #[test]
    fn test_pipeline_to_reduction() {
        let (i, j, k) = (IndexVar::new("i"), IndexVar::new("j"), IndexVar::new("k"));
        let (a, b, c) = (tensor("A", 2), tensor("B", 2), tensor("C", 2));
        let stmt = a.access(&[i, j]).assign(b.access(&[i, k]) * c.access(&[k, j])).into();
        let result = lower_to_reduction(&stmt).unwrap();
        assert_eq!(result.dialect, Some(Dialect::Reduction));
        assert_eq!(result.applied_transforms, vec!["reduction-notation".to_string()]);
        assert!(result.modified);
    }

    #[test]
    fn test_pipeline_to_concrete() {
        let (i, j, k) = (IndexVar::new("i"), IndexVar::new("j"), IndexVar::new("k"));
        let (a, b, c) = (tensor("A", 2), tensor("B", 2), tensor("C", 2));
        let stmt = a.access(&[i, j]).assign(b.access(&[i, k]) * c.access(&[k, j])).into();
        let result = lower_to_concrete(&stmt).unwrap();
        assert_eq!(result.dialect, Some(Dialect::Concrete));
        assert_eq!(result.applied_transforms, vec!["concrete-notation".to_string()]);
    }

    #[test]
    fn test_pipeline_zero_then_split() {
        let j = IndexVar::new("j");
        let (a, b, c, d) = (tensor("a", 1), tensor("b", 1), tensor("c", 1), tensor("d", 1));
        let product = b.access(&[j]) * c.access(&[j]);
        let stmt = a.access(&[j]).assign(product.clone() + d.access(&[j])).into();
        let config = PipelineConfig::to_concrete()
            .with_zeroed([d.access(&[j])])
            .with_split(SplitOperator {
                expr: product,
                old: j,
                left: IndexVar::new("jl"),
                right: IndexVar::new("jr"),
            });
        let result = Pipeline::new(config).run(&stmt).unwrap();
        assert_eq!(
            result.applied_transforms,
            vec!["simplify".to_string(), "concrete-notation".to_string(), "split-operator".to_string()]
        );
        assert!(result.stmt.as_where().is_some());
        assert_eq!(result.dialect, Some(Dialect::Concrete));
    }

    #[test]
    fn test_pipeline_reports_missing_split_target() {
        let i = IndexVar::new("i");
        let (a, b, c) = (tensor("a", 1), tensor("b", 1), tensor("c", 1));
        let stmt = a.access(&[i]).assign(b.access(&[i]) * c.access(&[i])).into();
        let config = PipelineConfig::to_concrete().with_split(SplitOperator {
            expr: b.access(&[i]) + c.access(&[i]),
            old: i,
            left: IndexVar::new("il"),
            right: IndexVar::new("ir"),
        });
        let err = Pipeline::new(config).run(&stmt).unwrap_err();
        assert!(err.to_string().contains("split-operator failed"));
        match err.downcast_ref::<NotationError>() {
            Some(NotationError::Transform(e)) => assert_eq!(e.kind, TransformErrorKind::ExpressionNotFound),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_pipeline_rejects_unlowerable() {
        let i = IndexVar::new("i");
        let (a, b) = (tensor("a", 1), tensor("b", 1));
        let stmt: IndexStmt = a.access(&[i]).accumulate(IndexExpr::from(b.access(&[i]))).into();
        let err = lower_to_concrete(&stmt).unwrap_err();
        assert!(err.to_string().contains("concrete-notation failed"));
    }
}
