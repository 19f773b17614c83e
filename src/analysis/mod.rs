//! Analysis passes over index notation.

pub mod dialect;

pub use dialect::{
    classify, has_reduction, is_concrete_notation, is_einsum_notation, is_reduction_notation, Dialect,
};
