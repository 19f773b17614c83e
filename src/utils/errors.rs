//! Error types for index notation construction, classification and lowering.
//!
//! This module defines all error types used throughout the crate,
//! organized by the phase that produces them.

use thiserror::Error;
use crate::utils::location::Span;
use std::fmt;

/// Top-level error type for the crate.
#[derive(Error, Debug)]
pub enum NotationError {
    /// Error during lexing/tokenization
    #[error("Lexer error: {0}")]
    Lexer(#[from] LexerError),

    /// Error during parsing
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// A lowering pass was handed a statement outside its input dialect
    #[error("Dialect error: {0}")]
    Dialect(#[from] DialectError),

    /// A handle was cast to the wrong node variant
    #[error("Cast error: {0}")]
    Cast(#[from] CastError),

    /// A handle was queried for state it does not carry
    #[error("Undefined: {0}")]
    Undefined(#[from] UndefinedError),

    /// Inconsistent index variable domains
    #[error("Shape error: {0}")]
    Shape(#[from] ShapeError),

    /// Error during transformation
    #[error("Transformation error: {0}")]
    Transform(#[from] TransformError),
}

/// Error during lexical analysis.
#[derive(Error, Debug, Clone)]
pub struct LexerError {
    /// The error message
    pub message: String,
    /// Location in source
    pub span: Span,
    /// The kind of lexer error
    pub kind: LexerErrorKind,
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexerErrorKind {
    /// Unexpected character
    UnexpectedChar,
    /// Invalid number literal
    InvalidNumber,
}

/// Error during parsing.
#[derive(Error, Debug, Clone)]
pub struct ParseError {
    /// The error message
    pub message: String,
    /// Location in source
    pub span: Span,
    /// The kind of parse error
    pub kind: ParseErrorKind,
    /// Expected tokens (if applicable)
    pub expected: Vec<String>,
    /// What was found
    pub found: Option<String>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)?;
        if !self.expected.is_empty() {
            write!(f, " (expected: {})", self.expected.join(", "))?;
        }
        if let Some(ref found) = self.found {
            write!(f, " (found: {})", found)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Unexpected token
    UnexpectedToken,
    /// Expected a specific token
    ExpectedToken,
    /// Expected an expression
    ExpectedExpression,
    /// Expected an identifier
    ExpectedIdentifier,
    /// Tensor used with a different number of indices than before
    OrderMismatch,
    /// Trailing input after a complete statement
    TrailingInput,
}

/// A lowering pass was given a statement it cannot accept.
#[derive(Error, Debug, Clone)]
pub struct DialectError {
    /// The error message
    pub message: String,
    /// The kind of dialect error
    pub kind: DialectErrorKind,
    /// Rendering of the offending statement
    pub stmt: String,
}

impl fmt::Display for DialectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.message, self.stmt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectErrorKind {
    /// Input is not in einsum notation
    NotEinsum,
    /// Input is in no dialect the pass can lower from
    NotLowerable,
}

/// A checked cast found a different node variant than requested.
#[derive(Error, Debug, Clone)]
#[error("expected {expected}, found {found}")]
pub struct CastError {
    /// Requested variant
    pub expected: &'static str,
    /// Actual variant
    pub found: &'static str,
}

/// Queried state that was never set.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct UndefinedError {
    /// The error message
    pub message: String,
}

/// Inconsistent shape information for index variables.
#[derive(Error, Debug, Clone)]
pub struct ShapeError {
    /// The error message
    pub message: String,
    /// The kind of shape error
    pub kind: ShapeErrorKind,
    /// Conflicting domains, rendered
    pub domains: Vec<String>,
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if !self.domains.is_empty() {
            write!(f, " (domains: {})", self.domains.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeErrorKind {
    /// One variable indexes modes of different sizes
    ConflictingDomains,
    /// Access index count differs from tensor order
    OrderMismatch,
}

/// Error during transformation.
#[derive(Error, Debug, Clone)]
pub struct TransformError {
    /// The error message
    pub message: String,
    /// The kind of transformation error
    pub kind: TransformErrorKind,
    /// The transformation that failed
    pub transform: String,
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.message, self.transform)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformErrorKind {
    /// Split variable is not bound by a forall
    UnboundVariable,
    /// Target expression does not occur in the statement
    ExpressionNotFound,
    /// Output failed its dialect postcondition
    PostconditionFailed,
}

impl DialectError {
    pub(crate) fn new(kind: DialectErrorKind, message: impl Into<String>, stmt: impl fmt::Display) -> Self {
        Self { message: message.into(), kind, stmt: stmt.to_string() }
    }
}

impl TransformError {
    pub(crate) fn new(kind: TransformErrorKind, transform: &str, message: impl Into<String>) -> Self {
        Self { message: message.into(), kind, transform: transform.to_string() }
    }
}

/// Result type using NotationError.
pub type NotationResult<T> = Result<T, NotationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ParseError {
            message: "Unexpected token".to_string(),
            span: Span::default(),
            kind: ParseErrorKind::UnexpectedToken,
            expected: vec!["identifier".to_string()],
            found: Some("number".to_string()),
        };
        let s = format!("{}", err);
        assert!(s.contains("Unexpected token"));
        assert!(s.contains("identifier"));
    }

    #[test]
    fn test_dialect_error_wraps() {
        let err: NotationError = DialectError::new(
            DialectErrorKind::NotEinsum,
            "expected einsum notation",
            "A(i) += B(i)",
        ).into();
        let s = err.to_string();
        assert!(s.starts_with("Dialect error"));
        assert!(s.contains("A(i) += B(i)"));
    }

    #[test]
    fn test_cast_error_display() {
        let err = CastError { expected: "Access", found: "Literal" };
        assert_eq!(err.to_string(), "expected Access, found Literal");
    }
}
