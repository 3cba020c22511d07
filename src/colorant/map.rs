// src/colorant/map.rs

//! Association list from a colorant to the colorants that substitute for it.
//!
//! Used for recipe (photoink) colorants, which are produced by a blend of
//! other colorants, and for explicit re-routing of one colorant to another.

use super::ColorantIndex;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorantMap {
    entries: Vec<(ColorantIndex, Vec<ColorantIndex>)>,
}

impl ColorantMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the substitutes for `index`. An empty list removes the entry.
    pub fn set(&mut self, index: ColorantIndex, substitutes: &[ColorantIndex]) {
        let pos = self.entries.iter().position(|(ci, _)| *ci == index);
        match (pos, substitutes.is_empty()) {
            (Some(p), true) => {
                self.entries.remove(p);
            }
            (Some(p), false) => self.entries[p].1 = substitutes.to_vec(),
            (None, true) => {}
            (None, false) => self.entries.push((index, substitutes.to_vec())),
        }
    }

    pub fn get(&self, index: ColorantIndex) -> Option<&[ColorantIndex]> {
        self.entries
            .iter()
            .find(|(ci, _)| *ci == index)
            .map(|(_, subs)| subs.as_slice())
    }

    /// The colorant that is re-routed exactly onto `index`, if any.
    pub fn inverse(&self, index: ColorantIndex) -> Option<ColorantIndex> {
        self.entries
            .iter()
            .find(|(_, subs)| subs.as_slice() == [index])
            .map(|(ci, _)| *ci)
    }

    pub fn remove(&mut self, index: ColorantIndex) {
        self.entries.retain(|(ci, _)| *ci != index);
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColorantIndex, &[ColorantIndex])> {
        self.entries.iter().map(|(ci, subs)| (*ci, subs.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replace_and_remove() {
        let (a, b, c) = (ColorantIndex::new(4), ColorantIndex::new(0), ColorantIndex::new(1));
        let mut map = ColorantMap::new();
        map.set(a, &[b, c]);
        assert_eq!(map.get(a), Some(&[b, c][..]));
        assert_eq!(map.inverse(b), None, "recipes are not inverses");

        map.set(a, &[b]);
        assert_eq!(map.inverse(b), Some(a));

        map.set(a, &[]);
        assert!(map.get(a).is_none());
        assert!(map.is_empty());
    }
}
