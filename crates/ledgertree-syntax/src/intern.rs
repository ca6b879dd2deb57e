//! String interning for account names and currency codes.
//!
//! Account and currency strings repeat constantly across a ledger file;
//! interning stores each unique spelling once and hands out clones of a
//! shared `Arc<str>` for every further occurrence.
//!
//! # Example
//!
//! ```
//! use ledgertree_syntax::intern::StringInterner;
//!
//! let mut interner = StringInterner::new();
//!
//! let s1 = interner.intern("Expenses:Food");
//! let s2 = interner.intern("Expenses:Food");
//! let s3 = interner.intern("Assets:Bank");
//!
//! assert!(std::sync::Arc::ptr_eq(&s1, &s2));
//! assert!(!std::sync::Arc::ptr_eq(&s1, &s3));
//! ```

use std::collections::HashSet;
use std::sync::Arc;

/// A string interner that deduplicates account and currency spellings seen
/// while parsing a file.
#[derive(Debug, Default)]
pub struct StringInterner {
    strings: HashSet<Arc<str>>,
}

impl StringInterner {
    /// Create a new empty interner.
    #[must_use]
    pub fn new() -> Self {
        Self {
            strings: HashSet::new(),
        }
    }

    /// Create an interner with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            strings: HashSet::with_capacity(capacity),
        }
    }

    /// Intern a string, returning the shared copy if one already exists.
    pub fn intern(&mut self, s: &str) -> Arc<str> {
        if let Some(existing) = self.strings.get(s) {
            existing.clone()
        } else {
            let arc: Arc<str> = s.into();
            self.strings.insert(arc.clone());
            arc
        }
    }

    /// Check if a string is already interned.
    #[must_use]
    pub fn contains(&self, s: &str) -> bool {
        self.strings.contains(s)
    }

    /// The number of unique strings interned so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether nothing has been interned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Iterate over every unique interned string.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(std::convert::AsRef::as_ref)
    }

    /// Discard every interned string.
    pub fn clear(&mut self) {
        self.strings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_deduplicates() {
        let mut interner = StringInterner::new();

        let s1 = interner.intern("Expenses:Food");
        let s2 = interner.intern("Expenses:Food");
        let s3 = interner.intern("Assets:Bank");

        assert!(Arc::ptr_eq(&s1, &s2));
        assert!(!Arc::ptr_eq(&s1, &s3));
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn contains_reflects_interned_strings() {
        let mut interner = StringInterner::new();
        interner.intern("hello");

        assert!(interner.contains("hello"));
        assert!(!interner.contains("world"));
    }

    #[test]
    fn clear_empties_the_interner() {
        let mut interner = StringInterner::new();
        interner.intern("USD");
        interner.clear();

        assert!(interner.is_empty());
    }
}
