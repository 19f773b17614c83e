//! Interning of index variable names.
//!
//! `IndexVar` is a `Copy` handle; its name lives here so the handle stays
//! two words wide. Names carry no identity: interning the same string twice
//! yields the same symbol, while every `IndexVar::new` still gets a fresh id.

use once_cell::sync::Lazy;
use std::fmt;
use std::sync::{PoisonError, RwLock};
use string_interner::{backend::StringBackend, DefaultSymbol, StringInterner, Symbol as _};

static NAMES: Lazy<RwLock<StringInterner<StringBackend<DefaultSymbol>>>> =
    Lazy::new(|| RwLock::new(StringInterner::new()));

/// Handle to an interned name.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(DefaultSymbol);

impl Symbol {
    pub fn intern(name: &str) -> Self {
        let mut names = NAMES.write().unwrap_or_else(PoisonError::into_inner);
        Symbol(names.get_or_intern(name))
    }

    /// The interned string. Symbols only come from `intern`, so this is
    /// `None` only if the table was never written.
    pub fn resolve(self) -> Option<String> {
        let names = NAMES.read().unwrap_or_else(PoisonError::into_inner);
        names.resolve(self.0).map(str::to_string)
    }

    pub fn as_raw(&self) -> usize {
        self.0.to_usize()
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.as_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning() {
        let first = Symbol::intern("test_index");
        let again = Symbol::intern("test_index");
        let other = Symbol::intern("other_index");
        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(first.resolve().as_deref(), Some("test_index"));
    }
}
