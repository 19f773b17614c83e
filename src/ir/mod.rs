//! Index notation IR.
//!
//! - `var`: index and tensor variables
//! - `types`: datatypes, dimensions and formats of tensors
//! - `expr` / `stmt`: the expression and statement trees
//! - `visit`: visitors and rewriters over both trees
//! - `query`: index variable and domain queries
//! - `schedule`: scheduling directives carried by expressions and tensors

pub mod types;
pub mod schedule;
pub mod var;
pub mod expr;
pub mod stmt;
pub mod visit;
pub mod query;
mod display;

pub use types::{Datatype, Dimension, Format, ModeFormat, Type};
pub use schedule::{OperatorSplit, Schedule};
pub use var::{IndexVar, TensorVar};
pub use expr::{product, sum, Access, BinaryOp, ExprKind, IndexExpr, Literal, LiteralValue};
pub use stmt::{forall, multi, sequence, where_, Assignment, IndexStmt, StmtKind};
pub use visit::{ExprRewriter, ExprVisitor, StmtRewriter, StmtVisitor};
pub use query::{get_index_var_domains, get_index_vars, get_stmt_index_vars};

/// Structural equality of two expressions or two statements.
pub fn equals<T: PartialEq + ?Sized>(a: &T, b: &T) -> bool {
    a == b
}
