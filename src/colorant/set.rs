// src/colorant/set.rs

//! Growable bitset over colorant indices.

use super::ColorantIndex;

const WORD_BITS: usize = u64::BITS as usize;

/// A set of real colorant indices.
///
/// Sentinel indices are silently ignored by every operation, so callers can
/// pass whatever index a lookup produced without pre-filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorantSet {
    words: Vec<u64>,
}

impl ColorantSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `index`. Returns `true` if it was not present.
    pub fn insert(&mut self, index: ColorantIndex) -> bool {
        let Some(i) = index.get() else {
            return false;
        };
        let (word, bit) = (i / WORD_BITS, i % WORD_BITS);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let was_clear = self.words[word] & (1 << bit) == 0;
        self.words[word] |= 1 << bit;
        was_clear
    }

    /// Removes `index`. Returns `true` if it was present.
    pub fn remove(&mut self, index: ColorantIndex) -> bool {
        let Some(i) = index.get() else {
            return false;
        };
        let (word, bit) = (i / WORD_BITS, i % WORD_BITS);
        match self.words.get_mut(word) {
            Some(w) if *w & (1 << bit) != 0 => {
                *w &= !(1 << bit);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, index: ColorantIndex) -> bool {
        index.get().is_some_and(|i| {
            self.words
                .get(i / WORD_BITS)
                .is_some_and(|w| w & (1 << (i % WORD_BITS)) != 0)
        })
    }

    pub fn clear(&mut self) {
        self.words.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Keeps only indices also present in `other`.
    pub fn intersect_with(&mut self, other: &ColorantSet) {
        for (i, w) in self.words.iter_mut().enumerate() {
            *w &= other.words.get(i).copied().unwrap_or(0);
        }
    }

    /// Removes every index present in `other`.
    pub fn difference_with(&mut self, other: &ColorantSet) {
        for (w, o) in self.words.iter_mut().zip(other.words.iter()) {
            *w &= !o;
        }
    }

    /// Adds every index present in `other`.
    pub fn union_with(&mut self, other: &ColorantSet) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (w, o) in self.words.iter_mut().zip(other.words.iter()) {
            *w |= o;
        }
    }

    /// Iterates the members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ColorantIndex> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &w)| {
            (0..WORD_BITS)
                .filter(move |bit| w & (1 << bit) != 0)
                .map(move |bit| ColorantIndex::new((wi * WORD_BITS + bit) as u32))
        })
    }
}

impl FromIterator<ColorantIndex> for ColorantSet {
    fn from_iter<I: IntoIterator<Item = ColorantIndex>>(iter: I) -> Self {
        let mut set = ColorantSet::new();
        for index in iter {
            set.insert(index);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ci(i: u32) -> ColorantIndex {
        ColorantIndex::new(i)
    }

    #[test]
    fn grows_on_demand_and_ignores_sentinels() {
        let mut set = ColorantSet::new();
        assert!(set.insert(ci(130)));
        assert!(!set.insert(ci(130)));
        assert!(!set.insert(ColorantIndex::NONE));
        assert!(set.contains(ci(130)));
        assert!(!set.contains(ci(2)));
        assert!(!set.contains(ColorantIndex::ALL));
        assert_eq!(set.len(), 1);
        assert!(set.remove(ci(130)));
        assert!(set.is_empty());
    }

    #[test]
    fn set_algebra() {
        let mut a: ColorantSet = [ci(0), ci(1), ci(70)].into_iter().collect();
        let b: ColorantSet = [ci(1), ci(2)].into_iter().collect();

        let mut union = a.clone();
        union.union_with(&b);
        assert_eq!(union.iter().collect::<Vec<_>>(), vec![ci(0), ci(1), ci(2), ci(70)]);

        let mut inter = a.clone();
        inter.intersect_with(&b);
        assert_eq!(inter.iter().collect::<Vec<_>>(), vec![ci(1)]);

        a.difference_with(&b);
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![ci(0), ci(70)]);
    }
}
