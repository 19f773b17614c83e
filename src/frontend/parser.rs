//! Parser for textual index notation.
//!
//! This module implements a recursive descent parser over the grammar
//!
//! ```text
//! statement := access ('=' | '+=' | '-=' | '*=' | '/=') expr
//! expr      := term (('+' | '-') term)*
//! term      := unary (('*' | '/') unary)*
//! unary     := '-' unary | primary
//! primary   := INTEGER | FLOAT | access | '(' expr ')'
//!            | ('sum' | 'product') '(' IDENT ',' expr ')'
//! access    := IDENT ('(' IDENT (',' IDENT)* ')')?
//! ```
//!
//! Tensor and index variable names are resolved in a `TensorEnv`.

use crate::frontend::env::TensorEnv;
use crate::frontend::lexer::Lexer;
use crate::frontend::token::{Token, TokenKind};
use crate::ir::expr::{Access, BinaryOp, IndexExpr, Literal};
use crate::ir::stmt::{Assignment, IndexStmt};
use crate::utils::errors::{NotationError, NotationResult, ParseError, ParseErrorKind};

/// A parser for one index notation statement.
pub struct Parser<'a, 'e> {
    lexer: Lexer<'a>,
    current: Token,
    previous: Token,
    env: &'e mut TensorEnv,
}

impl<'a, 'e> Parser<'a, 'e> {
    /// Create a new parser from a lexer.
    pub fn new(mut lexer: Lexer<'a>, env: &'e mut TensorEnv) -> NotationResult<Self> {
        let first_token = lexer.next_token()?;
        Ok(Self {
            lexer,
            current: first_token.clone(),
            previous: first_token,
            env,
        })
    }

    /// Parse a complete assignment.
    pub fn parse_statement(&mut self) -> NotationResult<IndexStmt> {
        let lhs = self.parse_access()?;
        if !self.current.kind.is_assignment() {
            return Err(self.error(
                ParseErrorKind::ExpectedToken,
                "Expected assignment operator",
                &["'='", "'+='", "'-='", "'*='", "'/='"],
            ));
        }
        let op = match self.current.kind {
            TokenKind::PlusEqual => Some(BinaryOp::Add),
            TokenKind::MinusEqual => Some(BinaryOp::Sub),
            TokenKind::StarEqual => Some(BinaryOp::Mul),
            TokenKind::SlashEqual => Some(BinaryOp::Div),
            _ => None,
        };
        self.advance()?;
        let rhs = self.parse_expression()?;
        self.expect_end()?;
        Ok(Assignment::new(lhs, rhs, op).into())
    }

    /// Parse a lone access, such as `B(i,j)`.
    pub fn parse_access_only(&mut self) -> NotationResult<Access> {
        let access = self.parse_access()?;
        self.expect_end()?;
        Ok(access)
    }

    fn expect_end(&self) -> NotationResult<()> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(self.error(ParseErrorKind::TrailingInput, "Unexpected input after statement", &[]))
        }
    }

    fn parse_access(&mut self) -> NotationResult<Access> {
        let start = self.current.span;
        let name = self.consume_identifier("Expected tensor name")?;
        let mut indices = Vec::new();
        if self.match_token(TokenKind::LeftParen)? {
            loop {
                indices.push(self.consume_identifier("Expected index variable")?);
                if !self.match_token(TokenKind::Comma)? {
                    break;
                }
            }
            self.consume(TokenKind::RightParen, "Expected ')' after indices")?;
        }
        let span = start.merge(&self.previous.span);
        let tensor = self.env.resolve_tensor(&name, &indices, span)?;
        let vars = indices.iter().map(|index| self.env.index_var(index)).collect();
        Ok(Access::new(tensor, vars))
    }

    fn parse_expression(&mut self) -> NotationResult<IndexExpr> {
        let mut expr = self.parse_term()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(expr),
            };
            self.advance()?;
            let right = self.parse_term()?;
            expr = IndexExpr::binary(op, expr, right);
        }
    }

    fn parse_term(&mut self) -> NotationResult<IndexExpr> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => return Ok(expr),
            };
            self.advance()?;
            let right = self.parse_unary()?;
            expr = IndexExpr::binary(op, expr, right);
        }
    }

    fn parse_unary(&mut self) -> NotationResult<IndexExpr> {
        if self.match_token(TokenKind::Minus)? {
            Ok(IndexExpr::neg(self.parse_unary()?))
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> NotationResult<IndexExpr> {
        match self.current.kind {
            TokenKind::Integer => {
                let value: i64 = self.current.lexeme.parse().map_err(|_| {
                    self.error(ParseErrorKind::UnexpectedToken, "Integer literal out of range", &[])
                })?;
                self.advance()?;
                Ok(IndexExpr::literal(Literal::int(value)))
            }
            TokenKind::Float => {
                let value: f64 = self.current.lexeme.parse().map_err(|_| {
                    self.error(ParseErrorKind::UnexpectedToken, "Invalid float literal", &[])
                })?;
                self.advance()?;
                Ok(IndexExpr::literal(Literal::float(value)))
            }
            TokenKind::Sum | TokenKind::Product => {
                let op = if self.check(TokenKind::Sum) { BinaryOp::Add } else { BinaryOp::Mul };
                self.advance()?;
                self.consume(TokenKind::LeftParen, "Expected '(' after reduction")?;
                let name = self.consume_identifier("Expected reduction variable")?;
                let var = self.env.index_var(&name);
                self.consume(TokenKind::Comma, "Expected ',' after reduction variable")?;
                let body = self.parse_expression()?;
                self.consume(TokenKind::RightParen, "Expected ')' after reduction body")?;
                Ok(IndexExpr::reduction(op, var, body))
            }
            TokenKind::Identifier => Ok(self.parse_access()?.into()),
            TokenKind::LeftParen => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.consume(TokenKind::RightParen, "Expected ')' after expression")?;
                Ok(expr)
            }
            _ => Err(self.error(ParseErrorKind::ExpectedExpression, "Expected expression", &[])),
        }
    }

    // Helper methods

    fn check(&self, kind: TokenKind) -> bool { self.current.kind == kind }
    fn is_at_end(&self) -> bool { self.current.kind == TokenKind::Eof }

    fn advance(&mut self) -> NotationResult<&Token> {
        self.previous = self.current.clone();
        self.current = self.lexer.next_token()?;
        Ok(&self.previous)
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> NotationResult<&Token> {
        if self.check(kind) {
            self.advance()
        } else {
            Err(self.error(ParseErrorKind::ExpectedToken, message, &[kind.describe()]))
        }
    }

    fn consume_identifier(&mut self, message: &str) -> NotationResult<String> {
        if self.check(TokenKind::Identifier) {
            let name = self.current.lexeme.clone();
            self.advance()?;
            Ok(name)
        } else {
            Err(self.error(ParseErrorKind::ExpectedIdentifier, message, &["identifier"]))
        }
    }

    fn match_token(&mut self, kind: TokenKind) -> NotationResult<bool> {
        if self.check(kind) { self.advance()?; Ok(true) } else { Ok(false) }
    }

    fn error(&self, kind: ParseErrorKind, message: &str, expected: &[&str]) -> NotationError {
        let found = if self.is_at_end() {
            TokenKind::Eof.describe().to_string()
        } else {
            format!("'{}'", self.current.lexeme)
        };
        ParseError {
            message: message.to_string(),
            span: self.current.span,
            kind,
            expected: expected.iter().map(|s| s.to_string()).collect(),
            found: Some(found),
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::{Dimension, Format};

    fn parse(source: &str, env: &mut TensorEnv) -> NotationResult<IndexStmt> {
        let mut parser = Parser::new(Lexer::new(source), env)?;
        parser.parse_statement()
    }

    #[test]
    fn test_parse_matmul() {
        let mut env = TensorEnv::new();
        let stmt = parse("A(i,j) = B(i,k) * C(k,j)", &mut env).unwrap();
        assert_eq!(stmt.to_string(), "A(i,j) = B(i,k) * C(k,j)");
        let assignment = stmt.to_assignment().unwrap();
        assert_eq!(assignment.reduction_vars().len(), 1);
        assert_eq!(env.tensor("B").unwrap().order(), 2);
    }

    #[test]
    fn test_shared_names_share_variables() {
        let mut env = TensorEnv::new();
        let stmt = parse("a(i) = b(i) + b(i)", &mut env).unwrap();
        let assignment = stmt.to_assignment().unwrap();
        let (_, left, right) = assignment.rhs().to_binary().unwrap();
        assert_eq!(left, right);
        assert_eq!(assignment.lhs().indices()[0], env.index_var("i"));
    }

    #[test]
    fn test_precedence_and_reductions() {
        let mut env = TensorEnv::new();
        let stmt = parse("a(i) += -(b(i) - c(i)) * sum(j, D(i,j)) / 2.5", &mut env).unwrap();
        assert_eq!(stmt.to_string(), "a(i) += -(b(i) - c(i)) * sum(j, D(i,j)) / 2.5");
        assert_eq!(stmt.to_assignment().unwrap().op(), Some(BinaryOp::Add));
    }

    #[test]
    fn test_dimensions_and_formats_from_env() {
        let mut env = TensorEnv::new();
        env.set_dimension("i", Dimension::Fixed(10));
        env.set_format("B", Format::from_letters("ds").unwrap());
        parse("a(i) = B(i,j) * c(j)", &mut env).unwrap();
        let b = env.tensor("B").unwrap();
        assert_eq!(b.ty().shape, vec![Dimension::Fixed(10), Dimension::Variable]);
        assert_eq!(b.format().to_string(), "ds");
    }

    #[test]
    fn test_parse_errors() {
        let mut env = TensorEnv::new();
        match parse("A(i) B(i)", &mut env) {
            Err(NotationError::Parse(err)) => assert_eq!(err.kind, ParseErrorKind::ExpectedToken),
            other => panic!("unexpected {:?}", other),
        }
        match parse("A(i) = B(i) )", &mut env) {
            Err(NotationError::Parse(err)) => assert_eq!(err.kind, ParseErrorKind::TrailingInput),
            other => panic!("unexpected {:?}", other),
        }
        match parse("A(i) = B(i,j)", &mut env) {
            Err(NotationError::Parse(err)) => assert_eq!(err.kind, ParseErrorKind::OrderMismatch),
            other => panic!("unexpected {:?}", other),
        }
        match parse("A(i) = * B(i)", &mut env) {
            Err(NotationError::Parse(err)) => assert_eq!(err.kind, ParseErrorKind::ExpectedExpression),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(parse("A(i) = B(i) ; C(i)", &mut env), Err(NotationError::Lexer(_))));
    }
}
