// src/directory.rs

//! Name to index directories.
//!
//! Every rasterstyle owns two: the *fully-fledged* directory, naming
//! colorants with a genuine rendering presence, and the *reserved* directory,
//! naming colorants that are known but not currently rendered (recipe base
//! inks, names pre-declared by halftone setup, process colorants that are not
//! being separated).

use crate::colorant::ColorantIndex;
use std::collections::BTreeMap;

/// One name to index directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorantDirectory {
    names: BTreeMap<String, ColorantIndex>,
}

impl ColorantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The index bound to `name`, or `UNKNOWN`.
    pub fn lookup(&self, name: &str) -> ColorantIndex {
        match self.names.get(name) {
            Some(&index) if index.is_real() => index,
            Some(&index) => {
                // A sentinel stored as a value means the directory is corrupt.
                crate::error::check_invariant(
                    false,
                    &format!("directory entry '{}' holds sentinel {}", name, index),
                );
                ColorantIndex::UNKNOWN
            }
            None => ColorantIndex::UNKNOWN,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Binds `name` to `index`, replacing any previous binding.
    pub fn insert(&mut self, name: impl Into<String>, index: ColorantIndex) {
        self.names.insert(name.into(), index);
    }

    /// Removes `name`, returning the index it was bound to.
    pub fn remove(&mut self, name: &str) -> Option<ColorantIndex> {
        self.names.remove(name)
    }

    /// Every name bound to `index`, in name order.
    pub fn names_for(&self, index: ColorantIndex) -> impl Iterator<Item = &str> {
        self.names
            .iter()
            .filter(move |(_, &ci)| ci == index)
            .map(|(name, _)| name.as_str())
    }

    /// First name bound to `index`.
    pub fn name_of(&self, index: ColorantIndex) -> Option<&str> {
        self.names_for(index).next()
    }

    pub fn has_index(&self, index: ColorantIndex) -> bool {
        self.names.values().any(|&ci| ci == index)
    }

    /// Highest index present, if any.
    pub fn highest(&self) -> Option<ColorantIndex> {
        self.names.values().copied().filter(|ci| ci.is_real()).max()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ColorantIndex)> {
        self.names.iter().map(|(name, &ci)| (name.as_str(), ci))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Lazy allocator of fresh colorant indices.
///
/// The highest index used by either directory is found once, on the first
/// allocation, and cached. Later allocations increment the cached value.
#[derive(Debug, Clone, Default)]
pub(crate) struct IndexAllocator {
    highest: Option<ColorantIndex>,
}

impl IndexAllocator {
    /// Allocates the next free index, scanning the directories if needed.
    pub(crate) fn allocate(
        &mut self,
        fully_fledged: &ColorantDirectory,
        reserved: &ColorantDirectory,
    ) -> Option<ColorantIndex> {
        let highest = match self.highest {
            Some(h) => h,
            None => fully_fledged
                .highest()
                .max(reserved.highest())
                .unwrap_or(ColorantIndex::UNKNOWN),
        };
        let next = highest.next()?;
        self.highest = Some(next);
        Some(next)
    }

    /// Records an index inserted from outside the allocator.
    pub(crate) fn note_used(&mut self, index: ColorantIndex) {
        if let Some(h) = self.highest {
            if index > h {
                self.highest = Some(index);
            }
        }
    }
}
