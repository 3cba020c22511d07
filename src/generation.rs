// src/generation.rs

//! Monotonic generation counters and version-stamped caches.
//!
//! A rasterstyle bumps its [`Generation`] on every colorant add, remove or
//! remap. Derived state (such as the equivalent-colorant table of a backdrop)
//! is stored in a [`Versioned`] cell stamped with the generation it was
//! derived from, so staleness is a single integer comparison.

use std::fmt;

/// A monotonically increasing change counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    /// The generation of a freshly created rasterstyle.
    pub const INITIAL: Generation = Generation(1);

    /// Advances to the next generation.
    pub fn bump(&mut self) {
        self.0 = self.0.wrapping_add(1).max(1);
    }

    /// Raw counter value, for diagnostics.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// A cached value tagged with the generation it was computed against.
#[derive(Debug, Clone, Default)]
pub struct Versioned<T> {
    stamp: Option<Generation>,
    value: T,
}

impl<T: Default> Versioned<T> {
    /// Creates an empty, never-valid cache.
    pub fn new() -> Self {
        Versioned {
            stamp: None,
            value: T::default(),
        }
    }

    /// True when the cache was last filled against `current`.
    pub fn is_current(&self, current: Generation) -> bool {
        self.stamp == Some(current)
    }

    /// The cached value if it is still valid for `current`.
    pub fn get(&self, current: Generation) -> Option<&T> {
        self.is_current(current).then_some(&self.value)
    }

    /// Discards stale contents and re-stamps the cache for `current`.
    ///
    /// Returns `true` when the cache was stale (and has been reset).
    pub fn revalidate(&mut self, current: Generation) -> bool {
        if self.is_current(current) {
            return false;
        }
        self.value = T::default();
        self.stamp = Some(current);
        true
    }

    /// Mutable access to the value; callers must `revalidate` first.
    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    /// Read access regardless of freshness.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Forgets the stamp so the next `revalidate` recomputes.
    pub fn invalidate(&mut self) {
        self.stamp = None;
    }
}
