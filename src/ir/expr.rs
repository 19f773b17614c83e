//! Index expressions.
//!
//! An `IndexExpr` is a shared, immutable tree describing the scalar value
//! computed at every point of an iteration space. Index variables that do
//! not index the result are summation variables. Some examples:
//!
//! ```text
//! A(i,j) = B(i,j) + C(i,j)             // matrix addition
//! a(i)   = B(i,j) * c(j)               // matrix-vector multiplication
//! A(i,j) = B(i,k,l) * C(k,j) * D(l,j)  // MTTKRP
//! ```
//!
//! Nodes are never mutated. Every rewrite builds new nodes and points at
//! the unchanged sub-trees of the original.

use crate::ir::schedule::Schedule;
use crate::ir::stmt::Assignment;
use crate::ir::types::Datatype;
use crate::ir::var::{IndexVar, TensorVar};
use crate::utils::errors::CastError;
use serde::{Serialize, Deserialize};
use std::hash::{Hash, Hasher};
use std::ops;
use std::sync::Arc;

/// Arithmetic operator of a binary node, reduction or compound assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    /// Binding strength when printed infix.
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div => 2,
        }
    }

    pub fn is_additive(&self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Sub)
    }
}

/// Payload of a literal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum LiteralValue {
    Bool(bool),
    UInt(u64),
    Int(i64),
    Float(f64),
    Complex(f64, f64),
}

/// A scalar constant embedded in an expression.
///
/// Equality is by value; floating-point payloads compare bitwise so a
/// literal always equals itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Literal {
    datatype: Datatype,
    value: LiteralValue,
}

impl Literal {
    pub fn boolean(value: bool) -> Self {
        Self { datatype: Datatype::Bool, value: LiteralValue::Bool(value) }
    }

    pub fn uint(value: u64) -> Self {
        Self { datatype: Datatype::UInt64, value: LiteralValue::UInt(value) }
    }

    pub fn int(value: i64) -> Self {
        Self { datatype: Datatype::Int64, value: LiteralValue::Int(value) }
    }

    pub fn float(value: f64) -> Self {
        Self { datatype: Datatype::Float64, value: LiteralValue::Float(value) }
    }

    pub fn complex(re: f64, im: f64) -> Self {
        Self { datatype: Datatype::Complex128, value: LiteralValue::Complex(re, im) }
    }

    /// The additive identity of `datatype`.
    pub fn zero(datatype: Datatype) -> Self {
        let value = if datatype.is_bool() {
            LiteralValue::Bool(false)
        } else if datatype.is_uint() {
            LiteralValue::UInt(0)
        } else if datatype.is_int() {
            LiteralValue::Int(0)
        } else if datatype.is_float() {
            LiteralValue::Float(0.0)
        } else {
            LiteralValue::Complex(0.0, 0.0)
        };
        Self { datatype, value }
    }

    pub fn datatype(&self) -> Datatype { self.datatype }

    pub fn value(&self) -> LiteralValue { self.value }

    pub fn is_zero(&self) -> bool {
        match self.value {
            LiteralValue::Bool(b) => !b,
            LiteralValue::UInt(n) => n == 0,
            LiteralValue::Int(n) => n == 0,
            LiteralValue::Float(x) => x == 0.0,
            LiteralValue::Complex(re, im) => re == 0.0 && im == 0.0,
        }
    }

    fn key(&self) -> (u8, u64, u64) {
        match self.value {
            LiteralValue::Bool(b) => (0, b as u64, 0),
            LiteralValue::UInt(n) => (1, n, 0),
            LiteralValue::Int(n) => (2, n as u64, 0),
            LiteralValue::Float(x) => (3, x.to_bits(), 0),
            LiteralValue::Complex(re, im) => (4, re.to_bits(), im.to_bits()),
        }
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        self.datatype == other.datatype && self.key() == other.key()
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.datatype.hash(state);
        self.key().hash(state);
    }
}

/// A read (or, on an assignment's left-hand side, a write) of a tensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Access {
    tensor: TensorVar,
    indices: Vec<IndexVar>,
}

impl Access {
    pub fn new(tensor: TensorVar, indices: Vec<IndexVar>) -> Self {
        Self { tensor, indices }
    }

    pub fn tensor(&self) -> &TensorVar { &self.tensor }

    pub fn indices(&self) -> &[IndexVar] { &self.indices }

    /// `self = rhs`
    pub fn assign(&self, rhs: impl Into<IndexExpr>) -> Assignment {
        Assignment::new(self.clone(), rhs.into(), None)
    }

    /// `self += rhs`
    pub fn accumulate(&self, rhs: impl Into<IndexExpr>) -> Assignment {
        Assignment::new(self.clone(), rhs.into(), Some(BinaryOp::Add))
    }

    /// `self op= rhs`
    pub fn compound(&self, op: BinaryOp, rhs: impl Into<IndexExpr>) -> Assignment {
        Assignment::new(self.clone(), rhs.into(), Some(op))
    }
}

/// The node variants of an index expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    Access(Access),
    Literal(Literal),
    Neg(IndexExpr),
    Binary {
        op: BinaryOp,
        left: IndexExpr,
        right: IndexExpr,
    },
    /// Combine `body` with `op` over every value of `var`.
    Reduction {
        op: BinaryOp,
        var: IndexVar,
        body: IndexExpr,
    },
}

impl ExprKind {
    pub fn variant_name(&self) -> &'static str {
        match self {
            ExprKind::Access(_) => "Access",
            ExprKind::Literal(_) => "Literal",
            ExprKind::Neg(_) => "Neg",
            ExprKind::Binary { .. } => "Binary",
            ExprKind::Reduction { .. } => "Reduction",
        }
    }
}

#[derive(Debug)]
struct ExprNode {
    kind: ExprKind,
    schedule: Schedule,
}

/// A handle to a shared, immutable expression node.
#[derive(Debug, Clone)]
pub struct IndexExpr(Arc<ExprNode>);

impl IndexExpr {
    pub fn new(kind: ExprKind) -> Self {
        Self(Arc::new(ExprNode { kind, schedule: Schedule::new() }))
    }

    pub fn access(access: Access) -> Self {
        Self::new(ExprKind::Access(access))
    }

    pub fn literal(literal: Literal) -> Self {
        Self::new(ExprKind::Literal(literal))
    }

    pub fn neg(operand: IndexExpr) -> Self {
        Self::new(ExprKind::Neg(operand))
    }

    pub fn binary(op: BinaryOp, left: IndexExpr, right: IndexExpr) -> Self {
        Self::new(ExprKind::Binary { op, left, right })
    }

    pub fn reduction(op: BinaryOp, var: IndexVar, body: IndexExpr) -> Self {
        Self::new(ExprKind::Reduction { op, var, body })
    }

    pub fn kind(&self) -> &ExprKind { &self.0.kind }

    pub fn schedule(&self) -> &Schedule { &self.0.schedule }

    /// This node with a different schedule. Children are shared.
    pub fn with_schedule(&self, schedule: Schedule) -> Self {
        Self(Arc::new(ExprNode { kind: self.0.kind.clone(), schedule }))
    }

    /// A node of `kind` that keeps this node's schedule.
    pub(crate) fn rebuild(&self, kind: ExprKind) -> Self {
        Self(Arc::new(ExprNode { kind, schedule: self.0.schedule.clone() }))
    }

    /// Whether both handles point at the same node.
    pub fn ptr_eq(&self, other: &IndexExpr) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn as_access(&self) -> Option<&Access> {
        match self.kind() {
            ExprKind::Access(access) => Some(access),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self.kind() {
            ExprKind::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    pub fn as_neg(&self) -> Option<&IndexExpr> {
        match self.kind() {
            ExprKind::Neg(operand) => Some(operand),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<(BinaryOp, &IndexExpr, &IndexExpr)> {
        match self.kind() {
            ExprKind::Binary { op, left, right } => Some((*op, left, right)),
            _ => None,
        }
    }

    pub fn as_reduction(&self) -> Option<(BinaryOp, IndexVar, &IndexExpr)> {
        match self.kind() {
            ExprKind::Reduction { op, var, body } => Some((*op, *var, body)),
            _ => None,
        }
    }

    pub fn is_binary(&self) -> bool { self.as_binary().is_some() }

    pub fn is_reduction(&self) -> bool { self.as_reduction().is_some() }

    pub fn to_access(&self) -> Result<&Access, CastError> {
        self.as_access().ok_or_else(|| self.cast_error("Access"))
    }

    pub fn to_literal(&self) -> Result<&Literal, CastError> {
        self.as_literal().ok_or_else(|| self.cast_error("Literal"))
    }

    pub fn to_binary(&self) -> Result<(BinaryOp, &IndexExpr, &IndexExpr), CastError> {
        self.as_binary().ok_or_else(|| self.cast_error("Binary"))
    }

    pub fn to_reduction(&self) -> Result<(BinaryOp, IndexVar, &IndexExpr), CastError> {
        self.as_reduction().ok_or_else(|| self.cast_error("Reduction"))
    }

    fn cast_error(&self, expected: &'static str) -> CastError {
        CastError { expected, found: self.kind().variant_name() }
    }

    /// Component type of the value this expression computes.
    pub fn datatype(&self) -> Datatype {
        match self.kind() {
            ExprKind::Access(access) => access.tensor().datatype(),
            ExprKind::Literal(literal) => literal.datatype(),
            ExprKind::Neg(operand) => operand.datatype(),
            ExprKind::Binary { left, right, .. } => {
                Datatype::max_type(left.datatype(), right.datatype())
            }
            ExprKind::Reduction { body, .. } => body.datatype(),
        }
    }

    /// Whether `needle` occurs (structurally) anywhere in this tree.
    pub fn contains(&self, needle: &IndexExpr) -> bool {
        if self == needle {
            return true;
        }
        match self.kind() {
            ExprKind::Access(_) | ExprKind::Literal(_) => false,
            ExprKind::Neg(operand) => operand.contains(needle),
            ExprKind::Binary { left, right, .. } => left.contains(needle) || right.contains(needle),
            ExprKind::Reduction { body, .. } => body.contains(needle),
        }
    }
}

/// Structural equality: same variants, same variables by identity, same
/// literal values. Schedules are not compared.
impl PartialEq for IndexExpr {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.kind() == other.kind()
    }
}

impl Eq for IndexExpr {}

/// `sum(var, body)`
pub fn sum(var: IndexVar, body: impl Into<IndexExpr>) -> IndexExpr {
    IndexExpr::reduction(BinaryOp::Add, var, body.into())
}

/// `product(var, body)`
pub fn product(var: IndexVar, body: impl Into<IndexExpr>) -> IndexExpr {
    IndexExpr::reduction(BinaryOp::Mul, var, body.into())
}

impl From<Access> for IndexExpr {
    fn from(access: Access) -> Self { IndexExpr::access(access) }
}

impl From<&Access> for IndexExpr {
    fn from(access: &Access) -> Self { IndexExpr::access(access.clone()) }
}

impl From<&IndexExpr> for IndexExpr {
    fn from(expr: &IndexExpr) -> Self { expr.clone() }
}

impl From<TensorVar> for IndexExpr {
    fn from(tensor: TensorVar) -> Self { IndexExpr::access(tensor.scalar()) }
}

impl From<Literal> for IndexExpr {
    fn from(literal: Literal) -> Self { IndexExpr::literal(literal) }
}

impl From<i64> for IndexExpr {
    fn from(value: i64) -> Self { IndexExpr::literal(Literal::int(value)) }
}

impl From<u64> for IndexExpr {
    fn from(value: u64) -> Self { IndexExpr::literal(Literal::uint(value)) }
}

impl From<f64> for IndexExpr {
    fn from(value: f64) -> Self { IndexExpr::literal(Literal::float(value)) }
}

impl From<bool> for IndexExpr {
    fn from(value: bool) -> Self { IndexExpr::literal(Literal::boolean(value)) }
}

macro_rules! binary_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<T: Into<IndexExpr>> ops::$trait<T> for IndexExpr {
            type Output = IndexExpr;
            fn $method(self, rhs: T) -> IndexExpr {
                IndexExpr::binary($op, self, rhs.into())
            }
        }

        impl<T: Into<IndexExpr>> ops::$trait<T> for &IndexExpr {
            type Output = IndexExpr;
            fn $method(self, rhs: T) -> IndexExpr {
                IndexExpr::binary($op, self.clone(), rhs.into())
            }
        }

        impl<T: Into<IndexExpr>> ops::$trait<T> for Access {
            type Output = IndexExpr;
            fn $method(self, rhs: T) -> IndexExpr {
                IndexExpr::binary($op, self.into(), rhs.into())
            }
        }
    };
}

binary_operator!(Add, add, BinaryOp::Add);
binary_operator!(Sub, sub, BinaryOp::Sub);
binary_operator!(Mul, mul, BinaryOp::Mul);
binary_operator!(Div, div, BinaryOp::Div);

impl ops::Neg for IndexExpr {
    type Output = IndexExpr;
    fn neg(self) -> IndexExpr { IndexExpr::neg(self) }
}

impl ops::Neg for &IndexExpr {
    type Output = IndexExpr;
    fn neg(self) -> IndexExpr { IndexExpr::neg(self.clone()) }
}

impl ops::Neg for Access {
    type Output = IndexExpr;
    fn neg(self) -> IndexExpr { IndexExpr::neg(self.into()) }
}
