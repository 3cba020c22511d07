// src/rasterstyle/tree.rs

//! Sheet / channel / colorant hierarchy.
//!
//! Entities live in per-kind arenas addressed by dense ids. Back-references
//! (a channel's sheet, a colorant's channel) are plain id fields. Removal
//! tombstones the slot, so ids handed out earlier never alias a different
//! entity.

use crate::colorant::{ColorantIndex, ColorantInfo};
use crate::error::{check_invariant, try_reserve, Result};
use crate::rasterstyle::equivalent::Equivalence;
use log::trace;

/// Handle to a sheet (one rendering pass).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SheetId(u32);

/// Handle to a channel (one output plane of a sheet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u32);

/// Handle to a colorant placed in a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColorantId(u32);

// --- Entities ---

/// One physical rendering pass.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub(crate) sequence: u32,
    /// Number of channels that must be present.
    pub(crate) n_required: u32,
    pub(crate) render_omit: bool,
    pub(crate) channels: Vec<ChannelId>,
}

impl Sheet {
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn required_channels(&self) -> u32 {
        self.n_required
    }

    pub fn is_omitted(&self) -> bool {
        self.render_omit
    }

    pub fn channels(&self) -> &[ChannelId] {
        &self.channels
    }
}

/// One output plane within a sheet.
#[derive(Debug, Clone)]
pub struct Channel {
    pub(crate) sheet: SheetId,
    /// Declared channel name (`ColorChannels` entry); may be empty.
    pub(crate) name: String,
    pub(crate) required: bool,
    /// Earlier partial paints already committed pixels to this channel.
    pub(crate) required_by_partial_paint: bool,
    pub(crate) render_omit: bool,
    /// No colorant bound, only the "none" placeholder.
    pub(crate) blank_colorants: bool,
    pub(crate) render_index: u32,
    pub(crate) colorants: Vec<ColorantId>,
}

impl Channel {
    pub fn sheet(&self) -> SheetId {
        self.sheet
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_required_by_partial_paint(&self) -> bool {
        self.required_by_partial_paint
    }

    pub fn is_omitted(&self) -> bool {
        self.render_omit
    }

    pub fn has_blank_colorants(&self) -> bool {
        self.blank_colorants
    }

    pub fn render_index(&self) -> u32 {
        self.render_index
    }

    pub fn colorants(&self) -> &[ColorantId] {
        &self.colorants
    }
}

/// One named ink assigned to a channel.
#[derive(Debug, Clone)]
pub struct Colorant {
    pub(crate) channel: ChannelId,
    pub(crate) info: ColorantInfo,
    pub(crate) equivalent: Option<Equivalence>,
    pub(crate) render_omit: bool,
}

impl Colorant {
    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn info(&self) -> &ColorantInfo {
        &self.info
    }

    pub fn index(&self) -> ColorantIndex {
        self.info.index
    }

    pub fn equivalent(&self) -> Option<&Equivalence> {
        self.equivalent.as_ref()
    }

    pub fn is_omitted(&self) -> bool {
        self.render_omit
    }
}

// --- Arena ---

/// The arena holding every sheet, channel and colorant of a rasterstyle.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    sheets: Vec<Option<Sheet>>,
    channels: Vec<Option<Channel>>,
    colorants: Vec<Option<Colorant>>,
    /// Live sheets in output order.
    order: Vec<SheetId>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Lookup ---

    pub fn sheet(&self, id: SheetId) -> Option<&Sheet> {
        self.sheets.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn colorant(&self, id: ColorantId) -> Option<&Colorant> {
        self.colorants.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub(crate) fn sheet_mut(&mut self, id: SheetId) -> Option<&mut Sheet> {
        self.sheets.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub(crate) fn channel_mut(&mut self, id: ChannelId) -> Option<&mut Channel> {
        self.channels.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub(crate) fn colorant_mut(&mut self, id: ColorantId) -> Option<&mut Colorant> {
        self.colorants.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    /// Live sheets in output order.
    pub fn sheets(&self) -> &[SheetId] {
        &self.order
    }

    pub fn sheet_count(&self) -> usize {
        self.order.len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.iter().flatten().count()
    }

    /// Channels of `sheet`, in order.
    pub fn channels_of(&self, sheet: SheetId) -> impl Iterator<Item = (ChannelId, &Channel)> {
        self.sheet(sheet)
            .map(|s| s.channels.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(move |&id| self.channel(id).map(|c| (id, c)))
    }

    /// Colorants of `channel`, in placement order.
    pub fn colorants_of(&self, channel: ChannelId) -> impl Iterator<Item = (ColorantId, &Colorant)> {
        self.channel(channel)
            .map(|c| c.colorants.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(move |&id| self.colorant(id).map(|c| (id, c)))
    }

    /// Every live channel, sheet by sheet.
    pub fn all_channels(&self) -> impl Iterator<Item = (ChannelId, &Channel)> {
        self.order.iter().flat_map(move |&s| self.channels_of(s))
    }

    /// Every live colorant, sheet by sheet and channel by channel.
    pub fn all_colorants(&self) -> impl Iterator<Item = (ColorantId, &Colorant)> {
        self.all_channels().flat_map(move |(ch, _)| self.colorants_of(ch))
    }

    /// Ids of every live colorant carrying `index`.
    pub fn colorants_with_index(&self, index: ColorantIndex) -> Vec<ColorantId> {
        self.all_colorants()
            .filter(|(_, c)| c.info.index == index)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn contains_index(&self, index: ColorantIndex) -> bool {
        self.all_colorants().any(|(_, c)| c.info.index == index)
    }

    // --- Construction ---

    /// Appends a new empty sheet.
    pub(crate) fn add_sheet(&mut self) -> Result<SheetId> {
        try_reserve(&mut self.sheets, 1, "adding a sheet")?;
        try_reserve(&mut self.order, 1, "adding a sheet")?;
        let id = SheetId(self.sheets.len() as u32);
        self.sheets.push(Some(Sheet {
            sequence: self.order.len() as u32,
            n_required: 0,
            render_omit: false,
            channels: Vec::new(),
        }));
        self.order.push(id);
        trace!("tree: added sheet {:?}", id);
        Ok(id)
    }

    /// Appends a channel named `name` to `sheet`.
    pub(crate) fn add_channel(&mut self, sheet: SheetId, name: &str) -> Result<ChannelId> {
        try_reserve(&mut self.channels, 1, "adding a channel")?;
        let id = ChannelId(self.channels.len() as u32);
        let Some(s) = self.sheet_mut(sheet) else {
            return Err(crate::error::RasterStyleError::Invariant(format!(
                "channel added to missing sheet {:?}",
                sheet
            )));
        };
        try_reserve(&mut s.channels, 1, "adding a channel")?;
        s.channels.push(id);
        self.channels.push(Some(Channel {
            sheet,
            name: name.to_string(),
            required: false,
            required_by_partial_paint: false,
            render_omit: false,
            blank_colorants: true,
            render_index: 0,
            colorants: Vec::new(),
        }));
        trace!("tree: added channel {:?} '{}' to sheet {:?}", id, name, sheet);
        Ok(id)
    }

    /// Places a colorant in `channel`, keeping placement order.
    pub(crate) fn add_colorant(&mut self, channel: ChannelId, info: ColorantInfo) -> Result<ColorantId> {
        check_invariant(info.is_consistent(), "colorant sentinel/type pairing");
        try_reserve(&mut self.colorants, 1, "adding a colorant")?;
        let id = ColorantId(self.colorants.len() as u32);
        let key = info.placement_key();
        let position = {
            let Some(ch) = self.channel(channel) else {
                return Err(crate::error::RasterStyleError::Invariant(format!(
                    "colorant added to missing channel {:?}",
                    channel
                )));
            };
            ch.colorants
                .iter()
                .position(|&c| self.colorant(c).is_some_and(|c| c.info.placement_key() > key))
                .unwrap_or(ch.colorants.len())
        };
        trace!("tree: colorant {:?} '{}' ({}) -> channel {:?}", id, info.name, info.index, channel);
        self.colorants.push(Some(Colorant {
            channel,
            info,
            equivalent: None,
            render_omit: false,
        }));
        if let Some(ch) = self.channel_mut(channel) {
            ch.colorants.insert(position, id);
        }
        self.refresh_blank(channel);
        Ok(id)
    }

    /// Repositions a colorant after its placement offsets changed.
    pub(crate) fn reorder_colorant(&mut self, id: ColorantId) {
        let Some(channel) = self.colorant(id).map(|c| c.channel) else {
            return;
        };
        let mut ids = match self.channel(channel) {
            Some(ch) => ch.colorants.clone(),
            None => return,
        };
        ids.sort_by_key(|&c| self.colorant(c).map(|c| c.info.placement_key()));
        if let Some(ch) = self.channel_mut(channel) {
            ch.colorants = ids;
        }
    }

    // --- Removal ---

    /// Removes a colorant from its channel.
    pub(crate) fn remove_colorant(&mut self, id: ColorantId) -> Option<Colorant> {
        let colorant = self.colorants.get_mut(id.0 as usize)?.take()?;
        if let Some(ch) = self.channel_mut(colorant.channel) {
            ch.colorants.retain(|&c| c != id);
        }
        self.refresh_blank(colorant.channel);
        trace!("tree: removed colorant {:?} '{}'", id, colorant.info.name);
        Some(colorant)
    }

    /// Removes a channel and every colorant in it.
    pub(crate) fn remove_channel(&mut self, id: ChannelId) -> Option<Channel> {
        let channel = self.channels.get_mut(id.0 as usize)?.take()?;
        for &c in &channel.colorants {
            if let Some(slot) = self.colorants.get_mut(c.0 as usize) {
                *slot = None;
            }
        }
        if let Some(sheet) = self.sheet_mut(channel.sheet) {
            sheet.channels.retain(|&c| c != id);
            if channel.required {
                sheet.n_required = sheet.n_required.saturating_sub(1);
            }
        }
        trace!("tree: removed channel {:?} '{}'", id, channel.name);
        Some(channel)
    }

    /// Removes a sheet and everything in it.
    pub(crate) fn remove_sheet(&mut self, id: SheetId) -> Option<Sheet> {
        let channels = self.sheet(id)?.channels.clone();
        for ch in channels {
            self.remove_channel(ch);
        }
        let sheet = self.sheets.get_mut(id.0 as usize)?.take()?;
        self.order.retain(|&s| s != id);
        trace!("tree: removed sheet {:?}", id);
        self.renumber();
        Some(sheet)
    }

    // --- Bookkeeping ---

    /// Recomputes a channel's blank-colorants flag.
    pub(crate) fn refresh_blank(&mut self, channel: ChannelId) {
        let blank = self
            .colorants_of(channel)
            .all(|(_, c)| !c.info.index.is_real());
        if let Some(ch) = self.channel_mut(channel) {
            ch.blank_colorants = blank;
        }
    }

    /// Reassigns sheet sequence numbers and channel render indices in output
    /// order.
    pub(crate) fn renumber(&mut self) {
        let order = self.order.clone();
        let mut render_index = 0;
        for (seq, sheet_id) in order.iter().enumerate() {
            let channels = match self.sheet_mut(*sheet_id) {
                Some(sheet) => {
                    sheet.sequence = seq as u32;
                    sheet.channels.clone()
                }
                None => continue,
            };
            for ch in channels {
                if let Some(channel) = self.channel_mut(ch) {
                    channel.render_index = render_index;
                    render_index += 1;
                }
            }
        }
    }

    /// Marks a channel required, keeping the sheet's count in step.
    pub(crate) fn set_required(&mut self, channel: ChannelId, required: bool) {
        let Some(ch) = self.channel_mut(channel) else {
            return;
        };
        if ch.required == required {
            return;
        }
        ch.required = required;
        let sheet = ch.sheet;
        if let Some(s) = self.sheet_mut(sheet) {
            if required {
                s.n_required += 1;
            } else {
                s.n_required = s.n_required.saturating_sub(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colorant::ColorantType;

    fn info(index: u32, name: &str, x: i32, y: i32) -> ColorantInfo {
        let mut info = ColorantInfo::new(ColorantIndex::new(index), ColorantType::Spot, name);
        info.offset_x = x;
        info.offset_y = y;
        info
    }

    #[test]
    fn colorants_are_kept_in_placement_order() {
        let mut tree = Tree::new();
        let sheet = tree.add_sheet().unwrap();
        let ch = tree.add_channel(sheet, "Band").unwrap();
        tree.add_colorant(ch, info(0, "Low", 10, 0)).unwrap();
        tree.add_colorant(ch, info(1, "HighRight", 20, 100)).unwrap();
        tree.add_colorant(ch, info(2, "HighLeft", 5, 100)).unwrap();

        let names: Vec<_> = tree
            .colorants_of(ch)
            .map(|(_, c)| c.info.name.clone())
            .collect();
        assert_eq!(names, vec!["HighLeft", "HighRight", "Low"]);
    }

    #[test]
    fn blank_flag_follows_colorants() {
        let mut tree = Tree::new();
        let sheet = tree.add_sheet().unwrap();
        let ch = tree.add_channel(sheet, "").unwrap();
        assert!(tree.channel(ch).unwrap().has_blank_colorants());
        let none = tree.add_colorant(ch, ColorantInfo::none()).unwrap();
        assert!(tree.channel(ch).unwrap().has_blank_colorants());
        tree.remove_colorant(none);
        let real = tree.add_colorant(ch, info(3, "Orange", 0, 0)).unwrap();
        assert!(!tree.channel(ch).unwrap().has_blank_colorants());
        tree.remove_colorant(real);
        assert!(tree.channel(ch).unwrap().has_blank_colorants());
    }

    #[test]
    fn removing_a_sheet_tombstones_and_renumbers() {
        let mut tree = Tree::new();
        let s0 = tree.add_sheet().unwrap();
        let s1 = tree.add_sheet().unwrap();
        let c0 = tree.add_channel(s0, "Gray").unwrap();
        let c1 = tree.add_channel(s1, "Gray").unwrap();
        let col = tree.add_colorant(c0, info(0, "Cyan", 0, 0)).unwrap();
        tree.set_required(c0, true);
        assert_eq!(tree.sheet(s0).unwrap().required_channels(), 1);
        tree.renumber();
        assert_eq!(tree.channel(c1).unwrap().render_index(), 1);

        tree.remove_sheet(s0);
        assert!(tree.sheet(s0).is_none());
        assert!(tree.channel(c0).is_none());
        assert!(tree.colorant(col).is_none());
        assert_eq!(tree.sheets(), &[s1]);
        assert_eq!(tree.sheet(s1).unwrap().sequence(), 0);
        assert_eq!(tree.channel(c1).unwrap().render_index(), 0);
    }
}
