//! Interned symbols (section 3, `sym_t`).
//!
//! The specification treats symbol interning as an external collaborator
//! ("`sym_t` is assumed a canonicalised interned string with pointer
//! identity") — the real package loader's interner is not part of this
//! subsystem. This module provides the minimal stand-in every crate in
//! the workspace needs to compile and test against: a process-global
//! interner handing out `Symbol`s whose equality is pointer identity,
//! matching the contract the checker relies on.

use std::fmt;
use std::sync::Arc;
use std::sync::RwLock;

use rustc_hash::FxHashMap;

/// A canonicalised interned string. Two `Symbol`s compare equal iff they
/// were interned from equal text, and in that case they also share the
/// same backing allocation (pointer identity), matching `sym_t`.
#[derive(Clone)]
pub struct Symbol(Arc<str>);

impl Symbol {
    /// Intern `text`, returning the canonical `Symbol` for it.
    #[must_use]
    pub fn intern(text: &str) -> Self {
        SYMBOLS.intern(text)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Symbol {}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const ()).hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct SymbolInterner {
    table: RwLock<FxHashMap<Arc<str>, ()>>,
}

impl SymbolInterner {
    fn new() -> Self {
        Self {
            table: RwLock::new(FxHashMap::default()),
        }
    }

    fn intern(&self, text: &str) -> Symbol {
        if let Some((key, _)) = self.table.read().unwrap().get_key_value(text) {
            return Symbol(key.clone());
        }
        let mut table = self.table.write().unwrap();
        if let Some((key, _)) = table.get_key_value(text) {
            return Symbol(key.clone());
        }
        let key: Arc<str> = Arc::from(text);
        table.insert(key.clone(), ());
        Symbol(key)
    }
}

static SYMBOLS: once_cell_symbols::Lazy<SymbolInterner> =
    once_cell_symbols::Lazy::new(SymbolInterner::new);

// A tiny private shim so this module only needs `std::sync` directly and
// keeps its one `once_cell` use localized and obvious at a glance.
mod once_cell_symbols {
    pub use once_cell::sync::Lazy;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_text_interns_to_pointer_identity() {
        let a = Symbol::intern("print");
        let b = Symbol::intern("print");
        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&a.0, &b.0));
    }

    #[test]
    fn distinct_text_is_distinct() {
        let a = Symbol::intern("foo");
        let b = Symbol::intern("bar");
        assert_ne!(a, b);
    }
}
