//! Textual rendering of index notation.
//!
//! ```text
//! A(i,j) = sum(k, B(i,j,k) * C(k,j))
//! forall(i, where(a(i) = tk * c(i), forall(k, tk += B(i,k))))
//! ```
//!
//! Parentheses appear only where precedence requires them, so printing a
//! parsed statement yields the canonical form of its source.

use crate::ir::expr::{Access, BinaryOp, ExprKind, IndexExpr, Literal, LiteralValue};
use crate::ir::stmt::{Assignment, IndexStmt, StmtKind};
use crate::utils::pretty::{format_list, PrettyPrint};
use pretty::{DocAllocator, DocBuilder};
use std::fmt;

const NEG_PRECEDENCE: u8 = 3;
const ATOM_PRECEDENCE: u8 = 4;

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            LiteralValue::Bool(b) => write!(f, "{}", b),
            LiteralValue::UInt(n) => write!(f, "{}", n),
            LiteralValue::Int(n) => write!(f, "{}", n),
            LiteralValue::Float(x) => write!(f, "{:?}", x),
            LiteralValue::Complex(re, im) => write!(f, "({:?}+{:?}i)", re, im),
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tensor().name())?;
        if !self.indices().is_empty() {
            write!(f, "({})", format_list(self.indices(), ","))?;
        }
        Ok(())
    }
}

fn precedence(expr: &IndexExpr) -> u8 {
    match expr.kind() {
        ExprKind::Binary { op, .. } => op.precedence(),
        ExprKind::Neg(_) => NEG_PRECEDENCE,
        _ => ATOM_PRECEDENCE,
    }
}

/// A negative literal reads back as a negation, so as an operand it is
/// always grouped.
fn is_negative_literal(expr: &IndexExpr) -> bool {
    match expr.kind() {
        ExprKind::Literal(literal) => match literal.value() {
            LiteralValue::Int(n) => n < 0,
            LiteralValue::Float(x) => x.is_sign_negative(),
            _ => false,
        },
        _ => false,
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &IndexExpr, parenthesize: bool) -> fmt::Result {
    if parenthesize || is_negative_literal(expr) {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

impl fmt::Display for IndexExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ExprKind::Access(access) => write!(f, "{}", access),
            ExprKind::Literal(literal) => write!(f, "{}", literal),
            ExprKind::Neg(operand) => {
                write!(f, "-")?;
                write_operand(f, operand, precedence(operand) < ATOM_PRECEDENCE)
            }
            ExprKind::Binary { op, left, right } => {
                let p = op.precedence();
                write_operand(f, left, precedence(left) < p)?;
                write!(f, " {} ", op)?;
                // Same-precedence right operands keep their grouping.
                write_operand(f, right, precedence(right) <= p)
            }
            ExprKind::Reduction { op, var, body } => match op {
                BinaryOp::Add => write!(f, "sum({}, {})", var, body),
                BinaryOp::Mul => write!(f, "product({}, {})", var, body),
                _ => write!(f, "reduce({}, {}, {})", op, var, body),
            },
        }
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op() {
            Some(op) => write!(f, "{} {}= {}", self.lhs(), op, self.rhs()),
            None => write!(f, "{} = {}", self.lhs(), self.rhs()),
        }
    }
}

impl fmt::Display for IndexStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            StmtKind::Assignment(assignment) => write!(f, "{}", assignment),
            StmtKind::Forall { var, body } => write!(f, "forall({}, {})", var, body),
            StmtKind::Where { consumer, producer } => write!(f, "where({}, {})", consumer, producer),
            StmtKind::Multi { first, second } => write!(f, "multi({}, {})", first, second),
            StmtKind::Sequence { definition, mutation } => {
                write!(f, "sequence({}, {})", definition, mutation)
            }
        }
    }
}

fn pair_doc<'a, D: DocAllocator<'a>>(
    allocator: &'a D,
    keyword: &str,
    first: &IndexStmt,
    second: &IndexStmt,
) -> DocBuilder<'a, D> {
    allocator
        .text(format!("{}(", keyword))
        .append(
            allocator
                .hardline()
                .append(first.to_doc(allocator))
                .append(allocator.text(","))
                .append(allocator.hardline())
                .append(second.to_doc(allocator))
                .nest(2),
        )
        .append(allocator.hardline())
        .append(allocator.text(")"))
}

impl PrettyPrint for IndexStmt {
    fn to_doc<'a, D: DocAllocator<'a>>(&self, allocator: &'a D) -> DocBuilder<'a, D> {
        match self.kind() {
            StmtKind::Assignment(assignment) => allocator.text(assignment.to_string()),
            StmtKind::Forall { var, body } => allocator
                .text(format!("forall({},", var))
                .append(allocator.hardline().append(body.to_doc(allocator)).nest(2))
                .append(allocator.text(")")),
            StmtKind::Where { consumer, producer } => pair_doc(allocator, "where", consumer, producer),
            StmtKind::Multi { first, second } => pair_doc(allocator, "multi", first, second),
            StmtKind::Sequence { definition, mutation } => {
                pair_doc(allocator, "sequence", definition, mutation)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::expr::{product, sum};
    use crate::ir::stmt::{forall, where_};
    use crate::ir::types::{Datatype, Type};
    use crate::ir::var::{IndexVar, TensorVar};

    fn tensor(name: &str, order: usize) -> TensorVar {
        TensorVar::new(name, Type::fixed(Datatype::Float64, &vec![4; order]))
    }

    #[test]
    fn test_reduction_display() {
        let (i, j, k) = (IndexVar::new("i"), IndexVar::new("j"), IndexVar::new("k"));
        let (a, b, c) = (tensor("A", 2), tensor("B", 3), tensor("C", 2));
        let stmt = a.access(&[i, j]).assign(sum(k, b.access(&[i, j, k]) * c.access(&[k, j])));
        assert_eq!(stmt.to_string(), "A(i,j) = sum(k, B(i,j,k) * C(k,j))");
    }

    #[test]
    fn test_precedence_parentheses() {
        let i = IndexVar::new("i");
        let (b, c, d) = (tensor("b", 1), tensor("c", 1), tensor("d", 1));
        let grouped = (b.access(&[i]) + c.access(&[i])) * d.access(&[i]);
        assert_eq!(grouped.to_string(), "(b(i) + c(i)) * d(i)");
        let flat = b.access(&[i]) * c.access(&[i]) + d.access(&[i]);
        assert_eq!(flat.to_string(), "b(i) * c(i) + d(i)");
        let right = IndexExpr::from(b.access(&[i])) - (c.access(&[i]) - d.access(&[i]));
        assert_eq!(right.to_string(), "b(i) - (c(i) - d(i))");
        let negated = -(b.access(&[i]) + c.access(&[i]));
        assert_eq!(negated.to_string(), "-(b(i) + c(i))");
        assert_eq!(product(i, b.access(&[i])).to_string(), "product(i, b(i))");
    }

    #[test]
    fn test_negative_literal_operands() {
        let i = IndexVar::new("i");
        let (a, b) = (tensor("a", 1), tensor("b", 1));
        let stmt = a.access(&[i]).assign(b.access(&[i]) - IndexExpr::from(-3i64));
        assert_eq!(stmt.to_string(), "a(i) = b(i) - (-3)");
        assert_eq!((-IndexExpr::from(-3i64)).to_string(), "-(-3)");
        assert_eq!((IndexExpr::from(-0.5) * b.access(&[i])).to_string(), "(-0.5) * b(i)");
        assert_eq!(IndexExpr::from(-3i64).to_string(), "-3");
    }

    #[test]
    fn test_scalar_and_compound() {
        let i = IndexVar::new("i");
        let (t, b) = (tensor("t", 0), tensor("b", 1));
        let stmt = forall(i, t.scalar().accumulate(b.access(&[i]) * 2.0));
        assert_eq!(stmt.to_string(), "forall(i, t += b(i) * 2.0)");
    }

    #[test]
    fn test_pretty_layout() {
        let (i, k) = (IndexVar::new("i"), IndexVar::new("k"));
        let (a, t, b) = (tensor("a", 1), tensor("tk", 0), tensor("B", 2));
        let stmt = forall(
            i,
            where_(a.access(&[i]).assign(t.scalar()), forall(k, t.scalar().accumulate(b.access(&[i, k])))),
        );
        let expected = "forall(i,\n  where(\n    a(i) = tk,\n    forall(k,\n      tk += B(i,k))\n  ))";
        assert_eq!(stmt.pretty(), expected);
    }
}
