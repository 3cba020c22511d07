// src/rasterstyle/equivalent.rs

//! Equivalent real colorants for backdrop rasterstyles.
//!
//! A backdrop's colorants are virtual; rendering needs to know which real
//! device colorant(s) each one stands for. Answers are derived lazily, one
//! index at a time, and cached in a [`Versioned`](crate::generation::Versioned)
//! list stamped with the parent's generation. When the parent moves on, the
//! whole list is discarded and this rasterstyle's own generation is bumped so
//! that backdrops chained further down notice as well.
//!
//! Updates run bottom-up: a backdrop first brings its parent up to date, so
//! the device rasterstyle, the only one whose generation reliably changes on
//! colorant edits, is always consulted first.
//!
//! A backdrop asks its parent by colorant name, not by index: every
//! rasterstyle allocates its own index space, so equal indices in parent and
//! child need not denote the same colorant.

use log::{debug, trace};

use super::RasterStyle;
use crate::colorant::ColorantIndex;

/// What a colorant index of one rasterstyle means on the real device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equivalence {
    /// Index in the rasterstyle holding this record.
    pub index: ColorantIndex,
    pub name: String,
    /// Device colorant indices, or `None` when the colorant has no device
    /// equivalent. The `None` answer is cached like any other.
    pub real: Option<Vec<ColorantIndex>>,
    /// The device produces this colorant from several others.
    pub recipe: bool,
}

impl Equivalence {
    pub fn has_equivalent(&self) -> bool {
        self.real.is_some()
    }
}

impl RasterStyle {
    /// Discards cached equivalents if the parent chain changed.
    ///
    /// Returns `true` when the cache was reset. Ancestors are updated first.
    pub fn update_equivalents(&mut self) -> bool {
        let parent_generation = match &self.parent {
            None => self.generation,
            Some(parent) => {
                let mut p = parent.write();
                if p.parent.is_some() {
                    p.update_equivalents();
                }
                p.generation
            }
        };
        if !self.equivalents.revalidate(parent_generation) {
            return false;
        }

        let ids: Vec<_> = self.tree.all_colorants().map(|(id, _)| id).collect();
        for id in ids {
            if let Some(c) = self.tree.colorant_mut(id) {
                c.equivalent = None;
            }
        }
        if self.parent.is_some() {
            // Not bump_generation: that would drop the cache just stamped.
            self.generation.bump();
            debug!(
                "{}: equivalents reset against parent {}, now {}",
                self.id, parent_generation, self.generation
            );
        }
        true
    }

    /// Device colorants equivalent to `index`, or `None` if there are none.
    pub fn equivalent_real(&mut self, index: ColorantIndex) -> Option<Vec<ColorantIndex>> {
        self.equivalent_entry(index).and_then(|e| e.real)
    }

    /// True when the device makes `index` from a recipe of colorants.
    pub fn equivalent_is_recipe(&mut self, index: ColorantIndex) -> bool {
        self.equivalent_entry(index).is_some_and(|e| e.recipe)
    }

    /// Equivalents resolved so far, valid until the parent chain changes.
    pub fn cached_equivalents(&self) -> &[Equivalence] {
        self.equivalents.value()
    }

    /// The full equivalence record for `index`, resolving it on a miss.
    ///
    /// Returns `None` for sentinels and indices this rasterstyle has no name
    /// for.
    pub(crate) fn equivalent_entry(&mut self, index: ColorantIndex) -> Option<Equivalence> {
        if !index.is_real() {
            return None;
        }
        self.update_equivalents();
        if let Some(hit) = self.equivalents.value().iter().find(|e| e.index == index) {
            return Some(hit.clone());
        }

        let name = self.colorant_name(index)?.to_string();
        self.resolver_invocations += 1;
        let (real, recipe) = match self.parent.clone() {
            None => self.resolve_on_device(index, &name),
            Some(parent) => {
                let mut p = parent.write();
                let parent_index = p.colorant_index_reserved(&name);
                match p.equivalent_entry(parent_index) {
                    Some(e) => (e.real, e.recipe),
                    None => (None, false),
                }
            }
        };
        let entry = Equivalence {
            index,
            name,
            real,
            recipe,
        };
        trace!("{}: equivalent of {} is {:?}", self.id, index, entry.real);

        self.equivalents.value_mut().push(entry.clone());
        for id in self.tree.colorants_with_index(index) {
            if let Some(c) = self.tree.colorant_mut(id) {
                c.equivalent = Some(entry.clone());
            }
        }
        Some(entry)
    }

    /// Resolution on the rasterstyle that is the real device.
    fn resolve_on_device(&self, index: ColorantIndex, name: &str) -> (Option<Vec<ColorantIndex>>, bool) {
        let ff = self.fully_fledged.lookup(name);
        if ff.is_real() {
            return (Some(vec![ff]), false);
        }
        if self.reserved.lookup(name) != index {
            return (None, false);
        }
        match self.colorant_maps.get(index) {
            Some(subs) if !subs.is_empty() && subs.iter().all(|&s| self.is_fully_fledged(s)) => {
                (Some(subs.to_vec()), true)
            }
            _ => (None, false),
        }
    }
}
