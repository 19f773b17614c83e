//! Index variables and tensor variables.
//!
//! Both are identity-compared handles: two variables created with the same
//! name are still distinct. An `IndexVar` is a `Copy` pair of a unique id and
//! an interned name. A `TensorVar` is an `Arc` to shared metadata; its name
//! and defining assignment are the only mutable state in the IR and live in
//! their own cells.

use crate::ir::expr::Access;
use crate::ir::schedule::Schedule;
use crate::ir::stmt::Assignment;
use crate::ir::types::{Datatype, Format, Type};
use crate::utils::errors::{NotationResult, UndefinedError};
use crate::utils::intern::Symbol;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, PoisonError, RwLock};

static NEXT_INDEX_VAR: AtomicU64 = AtomicU64::new(0);
static NEXT_TENSOR_VAR: AtomicU64 = AtomicU64::new(0);

/// A symbolic index ranging over the modes it indexes.
#[derive(Clone, Copy)]
pub struct IndexVar {
    id: u64,
    name: Symbol,
}

impl IndexVar {
    /// Create a fresh index variable. The name is for diagnostics only.
    pub fn new(name: &str) -> Self {
        Self {
            id: NEXT_INDEX_VAR.fetch_add(1, AtomicOrdering::Relaxed),
            name: Symbol::intern(name),
        }
    }

    pub fn id(&self) -> u64 { self.id }

    pub fn name(&self) -> String {
        self.name.resolve().unwrap_or_else(|| format!("i{}", self.id))
    }
}

impl PartialEq for IndexVar {
    fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

impl Eq for IndexVar {}

impl Hash for IndexVar {
    fn hash<H: Hasher>(&self, state: &mut H) { self.id.hash(state) }
}

impl PartialOrd for IndexVar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for IndexVar {
    fn cmp(&self, other: &Self) -> Ordering { self.id.cmp(&other.id) }
}

impl fmt::Debug for IndexVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name(), self.id)
    }
}

impl fmt::Display for IndexVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

struct TensorVarContent {
    id: u64,
    ty: Type,
    format: Format,
    schedule: Schedule,
    name: RwLock<String>,
    assignment: RwLock<Option<Assignment>>,
}

/// An operand or result of an index expression.
///
/// Setting a tensor's defining assignment makes the tensor reachable from
/// its own assignment (through the lhs access), so the two keep each other
/// alive until `clear_assignment` is called.
#[derive(Clone)]
pub struct TensorVar(Arc<TensorVarContent>);

impl TensorVar {
    /// Create a dense tensor variable.
    pub fn new(name: &str, ty: Type) -> Self {
        let format = Format::dense(ty.order());
        Self::with_format(name, ty, format)
    }

    /// Create a tensor variable with an explicit storage format.
    pub fn with_format(name: &str, ty: Type, format: Format) -> Self {
        Self::with_schedule(name, ty, format, Schedule::new())
    }

    /// Create a tensor variable carrying scheduling directives.
    pub fn with_schedule(name: &str, ty: Type, format: Format, schedule: Schedule) -> Self {
        let id = NEXT_TENSOR_VAR.fetch_add(1, AtomicOrdering::Relaxed);
        Self(Arc::new(TensorVarContent {
            id,
            ty,
            format,
            schedule,
            name: RwLock::new(name.to_string()),
            assignment: RwLock::new(None),
        }))
    }

    /// Create a dense tensor variable with a generated unique name.
    pub fn anonymous(ty: Type) -> Self {
        let tensor = Self::new("", ty);
        tensor.set_name(format!("A{}", tensor.id()));
        tensor
    }

    pub fn id(&self) -> u64 { self.0.id }

    pub fn name(&self) -> String {
        self.0.name.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn order(&self) -> usize { self.0.ty.order() }

    pub fn ty(&self) -> &Type { &self.0.ty }

    pub fn datatype(&self) -> Datatype { self.0.ty.datatype }

    pub fn format(&self) -> &Format { &self.0.format }

    pub fn schedule(&self) -> &Schedule { &self.0.schedule }

    /// The last assignment set on this tensor, if any.
    pub fn assignment(&self) -> Option<Assignment> {
        self.0.assignment.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The defining assignment, or an error naming the tensor.
    pub fn require_assignment(&self) -> NotationResult<Assignment> {
        self.assignment().ok_or_else(|| {
            UndefinedError {
                message: format!("tensor {} has no defining assignment", self.name()),
            }
            .into()
        })
    }

    /// Rename the tensor. Not synchronized against concurrent writers.
    pub fn set_name(&self, name: impl Into<String>) {
        *self.0.name.write().unwrap_or_else(PoisonError::into_inner) = name.into();
    }

    /// Set the statement that computes this tensor, replacing any previous one.
    pub fn set_assignment(&self, assignment: Assignment) {
        *self.0.assignment.write().unwrap_or_else(PoisonError::into_inner) = Some(assignment);
    }

    /// Drop the defining assignment, returning it.
    pub fn clear_assignment(&self) -> Option<Assignment> {
        self.0.assignment.write().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// An access of this tensor at the given indices.
    pub fn access(&self, indices: &[IndexVar]) -> Access {
        Access::new(self.clone(), indices.to_vec())
    }

    /// A zero-index access, for scalar tensors.
    pub fn scalar(&self) -> Access {
        Access::new(self.clone(), Vec::new())
    }
}

impl PartialEq for TensorVar {
    fn eq(&self, other: &Self) -> bool { self.0.id == other.0.id }
}

impl Eq for TensorVar {}

impl Hash for TensorVar {
    fn hash<H: Hasher>(&self, state: &mut H) { self.0.id.hash(state) }
}

impl PartialOrd for TensorVar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for TensorVar {
    fn cmp(&self, other: &Self) -> Ordering { self.0.id.cmp(&other.0.id) }
}

impl fmt::Debug for TensorVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{} : {}", self.name(), self.0.id, self.0.ty)
    }
}

impl fmt::Display for TensorVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.name(), self.0.ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::Dimension;

    #[test]
    fn test_index_var_identity() {
        let i1 = IndexVar::new("i");
        let i2 = IndexVar::new("i");
        assert_ne!(i1, i2);
        assert_eq!(i1, i1);
        assert_eq!(i1.name(), "i");
        assert!(i1 < i2);
    }

    #[test]
    fn test_tensor_var_identity() {
        let ty = Type::fixed(Datatype::Float64, &[3, 3]);
        let a = TensorVar::new("A", ty.clone());
        let b = TensorVar::new("A", ty);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(a.order(), 2);
        assert!(a.format().is_dense());
    }

    #[test]
    fn test_anonymous_name() {
        let t = TensorVar::anonymous(Type::scalar(Datatype::Int32));
        assert_eq!(t.name(), format!("A{}", t.id()));
    }

    #[test]
    fn test_assignment_cell() {
        let i = IndexVar::new("i");
        let ty = Type::new(Datatype::Float64, vec![Dimension::Variable]);
        let a = TensorVar::new("a", ty.clone());
        let b = TensorVar::new("b", ty);
        assert!(a.assignment().is_none());
        assert!(a.require_assignment().is_err());

        let def = a.access(&[i]).assign(b.access(&[i]));
        a.set_assignment(def.clone());
        assert_eq!(a.require_assignment().unwrap(), def);

        let shared = a.clone();
        assert_eq!(shared.assignment(), Some(def.clone()));
        assert_eq!(a.clear_assignment(), Some(def));
        assert!(shared.assignment().is_none());
    }

    #[test]
    fn test_set_name_visible_through_clones() {
        let a = TensorVar::new("a", Type::scalar(Datatype::Float64));
        let alias = a.clone();
        a.set_name("alpha");
        assert_eq!(alias.name(), "alpha");
    }
}
