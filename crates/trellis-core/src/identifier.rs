//! Stable node identities backed by a global string interner.
//!
//! Every syntax node carries an [`Id`] supplied by the editor (or derived
//! from its position by the parser). Layout results are keyed by the same
//! value, which is what keeps a node recognisable across relayouts.

use std::{
    fmt,
    sync::{Mutex, MutexGuard, OnceLock, PoisonError},
};

use string_interner::{DefaultStringInterner, DefaultSymbol};

static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

fn interner() -> MutexGuard<'static, DefaultStringInterner> {
    INTERNER
        .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Interned identifier of a syntax node.
///
/// Comparing and hashing an `Id` is a single integer operation.
///
/// # Examples
///
/// ```
/// use trellis_core::identifier::Id;
///
/// let func = Id::new("main");
/// let body = func.child("body");
/// assert_eq!(body, "main/body");
/// assert_eq!(Id::new("main"), func);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(DefaultSymbol);

impl Id {
    pub fn new(name: &str) -> Self {
        Self(interner().get_or_intern(name))
    }

    /// Derives a child identity by appending `segment` with a `/` separator.
    pub fn child(&self, segment: &str) -> Self {
        let mut interner = interner();
        let nested = match interner.resolve(self.0) {
            Some(parent) => format!("{parent}/{segment}"),
            None => segment.to_string(),
        };
        Self(interner.get_or_intern(nested))
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interner = interner();
        f.write_str(interner.resolve(self.0).unwrap_or("<unknown>"))
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl PartialEq<str> for Id {
    fn eq(&self, other: &str) -> bool {
        interner().get(other).is_some_and(|symbol| symbol == self.0)
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_same_name_same_id() {
        assert_eq!(Id::new("loop"), Id::new("loop"));
        assert_ne!(Id::new("loop"), Id::new("loop2"));
    }

    #[test]
    fn test_display_round_trips_name() {
        let id = Id::new("service/hello");
        assert_eq!(id.to_string(), "service/hello");
    }

    #[test]
    fn test_child_segments() {
        let root = Id::new("module");
        let nested = root.child("0").child("then");
        assert_eq!(nested, "module/0/then");
        assert_eq!(nested, Id::new("module/0/then"));
    }

    #[test]
    fn test_str_comparison_does_not_intern() {
        let id = Id::new("known");
        assert!(id != "never-interned-before-this-test");
        assert!(id == "known");
    }

    #[test]
    fn test_hash_set_membership() {
        let set: HashSet<Id> = ["a", "b", "a"].into_iter().map(Id::from).collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&Id::new("b")));
    }
}
