//! Utility modules for the index notation crate.
//!
//! This module contains common utilities used throughout the codebase:
//! - Error types
//! - Source location tracking
//! - Name interning
//! - Pretty printing

pub mod errors;
pub mod location;
pub mod intern;
pub mod pretty;

// Re-exports
pub use errors::*;
pub use location::{SourceLocation, Span};
pub use intern::Symbol;
pub use pretty::PrettyPrint;
