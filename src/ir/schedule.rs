//! Scheduling directives attached to expressions and tensors.
//!
//! A `Schedule` only records directives; iteration-space construction and
//! code generation decide what to do with them.

use crate::ir::var::IndexVar;
use std::fmt;

/// Record of a `split_operator` application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperatorSplit {
    /// Loop variable that was split
    pub old: IndexVar,
    /// Loop computing the left operand into the workspace
    pub left: IndexVar,
    /// Loop computing the full expression from the workspace
    pub right: IndexVar,
}

impl fmt::Display for OperatorSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "split({} -> {}, {})", self.old, self.left, self.right)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    operator_splits: Vec<OperatorSplit>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.operator_splits.is_empty()
    }

    pub fn operator_splits(&self) -> &[OperatorSplit] {
        &self.operator_splits
    }

    /// Copy of this schedule with one more operator split.
    pub fn with_operator_split(&self, split: OperatorSplit) -> Self {
        let mut operator_splits = self.operator_splits.clone();
        operator_splits.push(split);
        Self { operator_splits }
    }
}
