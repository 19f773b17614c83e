//! Frontend: lexer and parser for textual index notation.
//!
//! Statements are written the way they print:
//!
//! ```text
//! A(i,j) = B(i,k) * C(k,j)
//! a(i) += sum(j, B(i,j) * c(j))
//! ```

pub mod token;
pub mod lexer;
pub mod parser;
pub mod env;

// Re-exports
pub use lexer::Lexer;
pub use parser::Parser;
pub use env::TensorEnv;
pub use token::{Token, TokenKind};
pub use crate::utils::errors::ParseError;

use crate::ir::expr::Access;
use crate::ir::stmt::IndexStmt;
use crate::utils::errors::NotationResult;

/// Parse one assignment, resolving names in `env`.
pub fn parse(source: &str, env: &mut TensorEnv) -> NotationResult<IndexStmt> {
    let lexer = Lexer::new(source);
    let mut parser = Parser::new(lexer, env)?;
    parser.parse_statement()
}

/// Parse a single tensor access, resolving names in `env`.
pub fn parse_access(source: &str, env: &mut TensorEnv) -> NotationResult<Access> {
    let lexer = Lexer::new(source);
    let mut parser = Parser::new(lexer, env)?;
    parser.parse_access_only()
}
