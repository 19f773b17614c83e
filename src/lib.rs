//! # index-notation - Tensor Index Notation IR
//!
//! An intermediate representation for tensor algebra written in index
//! notation, including:
//! - Index and tensor variables with types and storage formats
//! - Expression and statement trees with visitors and rewriters
//! - Dialect classification (einsum, reduction, concrete)
//! - Lowering from einsum to reduction and concrete notation
//! - Zero propagation and operator splitting
//!
//! ## Architecture
//!
//! ```text
//! Text → Frontend → IR (einsum) → Reduction notation → Concrete notation
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use index_notation::prelude::*;
//!
//! let mut env = TensorEnv::new();
//! let stmt = index_notation::parse("A(i,j) = B(i,k) * C(k,j)", &mut env)?;
//! let concrete = index_notation::lower(&stmt, PipelineConfig::to_concrete())?;
//! println!("{}", concrete.stmt.pretty());
//! ```

#![warn(clippy::all)]

pub mod frontend;
pub mod ir;
pub mod analysis;
pub mod transform;
pub mod utils;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::frontend::{parse, parse_access, ParseError, TensorEnv};
    pub use crate::ir::*;
    pub use crate::analysis::{
        classify, is_concrete_notation, is_einsum_notation, is_reduction_notation, Dialect,
    };
    pub use crate::transform::{
        make_concrete_notation, make_reduction_notation, simplify, split_operator,
        LoweringResult, Pipeline, PipelineConfig, Transform,
    };
    pub use crate::utils::errors::*;
    pub use crate::utils::PrettyPrint;
}

use anyhow::Result;

/// Main entry point for parsing index notation.
pub fn parse(source: &str, env: &mut frontend::TensorEnv) -> Result<ir::IndexStmt> {
    Ok(frontend::parse(source, env)?)
}

/// Lower a statement with the given pipeline configuration.
pub fn lower(
    stmt: &ir::IndexStmt,
    config: transform::PipelineConfig,
) -> Result<transform::LoweringResult> {
    transform::Pipeline::new(config).run(stmt)
}

/// Full pipeline: parse source and lower it to concrete notation.
pub fn parse_and_lower(source: &str, env: &mut frontend::TensorEnv) -> Result<ir::IndexStmt> {
    let stmt = parse(source, env)?;
    Ok(lower(&stmt, transform::PipelineConfig::to_concrete())?.stmt)
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
