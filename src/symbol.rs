use lasso::{Spur, ThreadedRodeo};
use std::fmt;
use std::sync::OnceLock;

/// Process-wide interner for functor and variable names.
///
/// Terms are shared freely between threads and solve requests, so the
/// interner is global rather than threaded through every constructor.
static SYMBOLS: OnceLock<ThreadedRodeo> = OnceLock::new();

fn symbols() -> &'static ThreadedRodeo {
    SYMBOLS.get_or_init(ThreadedRodeo::new)
}

/// An interned name.
///
/// Guarantees:
/// - Same string always produces the same Symbol
/// - Different strings always produce different Symbols
/// - A Symbol resolves back to its string for the lifetime of the process
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(Spur);

impl Symbol {
    /// Intern a name, returning its Symbol.
    pub fn intern(name: &str) -> Self {
        Symbol(symbols().get_or_intern(name))
    }

    /// Get the Symbol for a name if it was already interned.
    pub fn get(name: &str) -> Option<Self> {
        symbols().get(name).map(Symbol)
    }

    /// Resolve the Symbol back to its string.
    pub fn as_str(self) -> &'static str {
        symbols().resolve(&self.0)
    }

    /// Compare against a plain string without interning it.
    pub fn is(self, name: &str) -> bool {
        self.as_str() == name
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::intern(name)
    }
}

#[cfg(test)]
#[path = "tests/symbol.rs"]
mod tests;
