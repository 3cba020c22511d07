// src/rasterstyle/mapping.rs

//! Colorant index allocation, promotion/demotion, synonyms and recipes.
//!
//! Every mutating operation here bumps the rasterstyle generation, which is
//! what invalidates the equivalent-colorant caches of any backdrops chained
//! onto this rasterstyle.

use log::{debug, trace, warn};

use super::{RasterStyle, SheetId};
use crate::colorant::{ColorantIndex, ColorantInfo, ALL_NAME, NONE_NAME};
use crate::config::SeparationStyle;
use crate::error::{RasterStyleError, Result};
use crate::setup;

impl RasterStyle {
    // --- Lookup ---

    /// Index of a fully-fledged colorant, or `UNKNOWN`.
    pub fn colorant_index(&self, name: &str) -> ColorantIndex {
        self.fully_fledged.lookup(name)
    }

    /// Index of a fully-fledged or reserved colorant, or `UNKNOWN`.
    pub fn colorant_index_reserved(&self, name: &str) -> ColorantIndex {
        match self.fully_fledged.lookup(name) {
            ColorantIndex::UNKNOWN => self.reserved.lookup(name),
            index => index,
        }
    }

    /// A name for `index`: fully-fledged names first, then reserved ones.
    ///
    /// With synonyms there may be several names; the first in name order is
    /// returned.
    pub fn colorant_name(&self, index: ColorantIndex) -> Option<&str> {
        match index {
            ColorantIndex::NONE => Some(NONE_NAME),
            ColorantIndex::ALL => Some(ALL_NAME),
            ColorantIndex::UNKNOWN => None,
            _ => self
                .fully_fledged
                .name_of(index)
                .or_else(|| self.reserved.name_of(index)),
        }
    }

    /// True if `index` is fully-fledged.
    pub fn is_fully_fledged(&self, index: ColorantIndex) -> bool {
        index.is_real() && self.fully_fledged.has_index(index)
    }

    // --- Allocation ---

    fn allocate_index(&mut self) -> Result<ColorantIndex> {
        self.allocator
            .allocate(&self.fully_fledged, &self.reserved)
            .ok_or(RasterStyleError::Allocation("allocating a colorant index"))
    }

    /// Inserts a pre-assigned index into a directory.
    pub(crate) fn declare_colorant(&mut self, name: &str, index: ColorantIndex, fully_fledged: bool) {
        if fully_fledged {
            self.reserved.remove(name);
            self.fully_fledged.insert(name, index);
        } else if !self.fully_fledged.contains(name) {
            self.reserved.insert(name, index);
        }
        self.allocator.note_used(index);
    }

    /// Index for `name`, reserving a new one if the name is unknown.
    pub fn possibly_new_name(&mut self, name: &str) -> Result<ColorantIndex> {
        let known = self.colorant_index_reserved(name);
        if known.is_real() {
            return Ok(known);
        }
        let index = self.allocate_index()?;
        self.reserved.insert(name, index);
        trace!("{}: reserved '{}' as {}", self.id, name, index);
        self.bump_generation();
        Ok(index)
    }

    /// Fully-fledged index for `name`.
    ///
    /// A reserved colorant of the same name is promoted, together with every
    /// synonym sharing its index; otherwise a new fully-fledged index is
    /// allocated.
    pub fn possibly_new_separation(&mut self, name: &str) -> Result<ColorantIndex> {
        let ff = self.fully_fledged.lookup(name);
        if ff.is_real() {
            return Ok(ff);
        }
        let reserved = self.reserved.lookup(name);
        let index = if reserved.is_real() {
            self.promote(reserved);
            reserved
        } else {
            let index = self.allocate_index()?;
            self.fully_fledged.insert(name, index);
            index
        };
        debug!("{}: '{}' is now fully-fledged as {}", self.id, name, index);
        self.bump_generation();
        Ok(index)
    }

    /// Moves every reserved name bound to `index` into the fully-fledged
    /// directory.
    fn promote(&mut self, index: ColorantIndex) {
        let names: Vec<String> = self.reserved.names_for(index).map(str::to_string).collect();
        for name in names {
            self.reserved.remove(&name);
            self.fully_fledged.insert(name, index);
        }
    }

    /// Moves every fully-fledged name bound to `index` back to reserved.
    fn demote(&mut self, index: ColorantIndex) {
        let names: Vec<String> = self
            .fully_fledged
            .names_for(index)
            .map(str::to_string)
            .collect();
        for name in names {
            self.fully_fledged.remove(&name);
            self.reserved.insert(name, index);
        }
    }

    // --- Colorant Maps ---

    /// Sets the colorants that substitute for `index`. An empty list
    /// removes the mapping.
    pub fn set_colorant_mapping(&mut self, index: ColorantIndex, substitutes: &[ColorantIndex]) -> Result<()> {
        if !index.is_real() {
            return Err(RasterStyleError::range(
                "colorant mapping",
                format!("cannot map sentinel colorant {}", index),
            ));
        }
        if let Some(bad) = substitutes.iter().find(|s| !s.is_real()) {
            return Err(RasterStyleError::range(
                "colorant mapping",
                format!("substitute {} is not a real colorant", bad),
            ));
        }
        self.colorant_maps.set(index, substitutes);
        trace!("{}: mapping {} -> {:?}", self.id, index, substitutes);
        self.bump_generation();
        Ok(())
    }

    pub fn get_colorant_mapping(&self, index: ColorantIndex) -> Option<&[ColorantIndex]> {
        self.colorant_maps.get(index)
    }

    /// The colorant re-routed exactly onto `index`, or `UNKNOWN`.
    pub fn get_inverse_colorant(&self, index: ColorantIndex) -> ColorantIndex {
        self.colorant_maps
            .inverse(index)
            .unwrap_or(ColorantIndex::UNKNOWN)
    }

    // --- Synonyms and Overrides ---

    /// Makes `new_name` an alias of `existing_name`, reserving the existing
    /// name first if it is unknown.
    pub fn synonym(&mut self, new_name: &str, existing_name: &str) -> Result<ColorantIndex> {
        let mut index = self.colorant_index_reserved(existing_name);
        if !index.is_real() {
            index = self.possibly_new_name(existing_name)?;
        }
        if new_name == existing_name {
            return Ok(index);
        }
        let fully_fledged = self.fully_fledged.lookup(existing_name) == index;
        self.fully_fledged.remove(new_name);
        self.reserved.remove(new_name);
        if fully_fledged {
            self.fully_fledged.insert(new_name, index);
        } else {
            self.reserved.insert(new_name, index);
        }
        debug!("{}: '{}' is a synonym of '{}' ({})", self.id, new_name, existing_name, index);
        self.bump_generation();
        Ok(index)
    }

    /// Renames the colorant `index` throughout the tree, remembering the
    /// previous name as the colorant's original name.
    pub fn override_colorant_name(&mut self, index: ColorantIndex, new_name: &str) -> Result<()> {
        if !index.is_real() {
            return Err(RasterStyleError::range(
                "colorant name override",
                format!("cannot rename sentinel colorant {}", index),
            ));
        }
        let Some(old_name) = self.colorant_name(index).map(str::to_string) else {
            return Err(RasterStyleError::range(
                "colorant name override",
                format!("colorant {} is not known", index),
            ));
        };
        for id in self.tree.colorants_with_index(index) {
            if let Some(c) = self.tree.colorant_mut(id) {
                if c.info.original_name.is_none() {
                    c.info.original_name = Some(c.info.name.clone());
                }
                c.info.name = new_name.to_string();
            }
        }
        self.synonym(new_name, &old_name)?;
        self.bump_generation();
        Ok(())
    }

    // --- Automatic Separations ---

    /// Adds a separation for `name` at interpretation time.
    ///
    /// Returns the colorant's index, or `NONE` when the device refuses new
    /// separations (`SeparationDetails /Add false`, or monochrome output).
    /// With `/Abort true` the refusal is an error instead.
    pub fn add_automatic_separation(&mut self, name: &str) -> Result<ColorantIndex> {
        let existing = self.colorant_index(name);
        if existing.is_real() && self.tree.contains_index(existing) {
            return Ok(existing);
        }
        let details = &self.config.separation_details;
        let monochrome = self.separation_style == SeparationStyle::Monochrome;
        if !details.add || monochrome {
            let reason = if monochrome {
                "monochrome output has a single separation"
            } else {
                "SeparationDetails Add is false"
            };
            if details.abort {
                return Err(RasterStyleError::config(format!(
                    "separation '{}' cannot be added ({}, Abort is true)",
                    name, reason
                )));
            }
            debug!("{}: refusing automatic separation '{}': {}", self.id, name, reason);
            return Ok(ColorantIndex::NONE);
        }

        let index = self.possibly_new_separation(name)?;
        if self.separation_style == SeparationStyle::Composite {
            setup::bind_composite_colorant(self, name, index)?;
        } else {
            setup::add_separation_sheet(self, name, index)?;
        }
        self.automatic.insert(index);
        let ty = self.colorant_type_for(name);
        self.apply_omit_policy(index, name, ty);
        self.tree.renumber();
        self.bump_generation();
        debug!("{}: automatic separation '{}' as {}", self.id, name, index);
        Ok(index)
    }

    // --- Removal ---

    /// Demotes `index` to reserved and removes it from the rendering tree.
    ///
    /// A required channel whose sole colorant is removed keeps an anonymous
    /// placeholder instead of being deleted. Channels and sheets left empty
    /// are deleted, except the sheet of a composite page. Returns `false`
    /// when nothing was cleared.
    pub fn clear_colorant(&mut self, index: ColorantIndex) -> Result<bool> {
        if !index.is_real() {
            return Ok(false);
        }
        if !self.config.separation_details.remove && !self.automatic.contains(index) {
            debug!("{}: separation removal disabled, keeping {}", self.id, index);
            return Ok(false);
        }
        if !self.fully_fledged.has_index(index) && !self.tree.contains_index(index) {
            return Ok(false);
        }

        self.demote(index);
        for id in self.tree.colorants_with_index(index) {
            let Some(channel_id) = self.tree.colorant(id).map(|c| c.channel) else {
                continue;
            };
            let (required, sole) = match self.tree.channel(channel_id) {
                Some(ch) => (ch.required, ch.colorants.len() == 1),
                None => continue,
            };
            if required && sole {
                if let Some(c) = self.tree.colorant_mut(id) {
                    let (x, y, band) = (c.info.offset_x, c.info.offset_y, c.info.offset_band);
                    c.info = ColorantInfo::none();
                    c.info.offset_x = x;
                    c.info.offset_y = y;
                    c.info.offset_band = band;
                    c.render_omit = false;
                    c.equivalent = None;
                }
                self.tree.refresh_blank(channel_id);
                trace!("{}: channel {:?} kept anonymous", self.id, channel_id);
                continue;
            }
            let sheet = self.tree.channel(channel_id).map(|ch| ch.sheet);
            self.tree.remove_colorant(id);
            let empty = self
                .tree
                .channel(channel_id)
                .is_some_and(|ch| ch.colorants.is_empty());
            if empty && !required {
                self.tree.remove_channel(channel_id);
            }
            if let Some(sheet) = sheet {
                self.remove_sheet_if_empty(sheet);
            }
        }

        self.current_omits.remove(index);
        self.kept.remove(index);
        self.automatic.remove(index);
        self.tree.renumber();
        self.bump_generation();
        debug!("{}: cleared colorant {}", self.id, index);
        Ok(true)
    }

    /// Deletes `sheet` once nothing on it can render: every channel left
    /// holds only placeholders and none is required.
    fn remove_sheet_if_empty(&mut self, sheet: SheetId) {
        let tree = &self.tree;
        let empty = tree.sheet(sheet).is_some_and(|s| {
            s.channels.iter().all(|&ch| {
                tree.channel(ch).is_some_and(|c| !c.required)
                    && tree.colorants_of(ch).all(|(_, col)| !col.info.index.is_real())
            })
        });
        if !empty {
            return;
        }
        if self.separation_style == SeparationStyle::Composite && self.tree.sheet_count() == 1 {
            trace!("{}: keeping the composite sheet", self.id);
            return;
        }
        self.tree.remove_sheet(sheet);
    }

    /// Clears every colorant added by automatic separation.
    pub fn clear_automatic(&mut self) -> Result<usize> {
        let automatic: Vec<ColorantIndex> = self.automatic.iter().collect();
        let mut cleared = 0;
        for index in automatic {
            if self.clear_colorant(index)? {
                cleared += 1;
            } else {
                warn!("{}: automatic colorant {} was already gone", self.id, index);
                self.automatic.remove(index);
            }
        }
        Ok(cleared)
    }
}
