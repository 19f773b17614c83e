//! Rewrites of index notation: dialect lowering, zero propagation and
//! operator splitting.

pub mod reduction;
pub mod concrete;
pub mod simplify;
pub mod split;
pub mod pipeline;

pub use reduction::{make_reduction_notation, make_reduction_notation_stmt, ReductionNotation};
pub use concrete::{make_concrete_notation, make_concrete_notation_stmt, ConcreteNotation};
pub use simplify::{simplify, simplify_stmt, Simplify};
pub use split::{split_operator, SplitOperator};
pub use pipeline::{Pipeline, PipelineConfig, LoweringResult};

use crate::ir::stmt::IndexStmt;
use crate::utils::errors::NotationResult;

/// Transformation pass trait.
pub trait Transform {
    /// Apply the transformation, returning the rewritten statement.
    fn apply(&self, stmt: &IndexStmt) -> NotationResult<IndexStmt>;

    /// Check whether applying the transformation would change `stmt`.
    fn is_applicable(&self, stmt: &IndexStmt) -> bool;

    /// Get transformation name.
    fn name(&self) -> &str;
}
