// src/rasterstyle/omission.rs

//! Blank separation omission.
//!
//! Two colorant sets drive omission: the static *colorant omits* (colorants
//! that may be dropped when blank, fixed at setup from the omit policy) and
//! the dynamic *current omits* (colorants detected blank by the last render
//! pass). Per-entity `render_omit` flags on the tree are derived from them.
//!
//! A channel is omitted only when every colorant in it is blank. Required
//! channels are all-or-nothing per sheet: if any required channel on a sheet
//! carries marks, every required channel on that sheet is rendered. A channel
//! that earlier partial paints already committed pixels to is never omitted.

use bitflags::bitflags;
use log::{debug, trace};

use super::{ColorantId, RasterStyle, SheetId};
use crate::colorant::{ColorantIndex, ColorantSet, ColorantType};
use crate::config::{IgnoreDetails, ProcessColorModel, SeparationStyle};

bitflags! {
    /// Mark kinds excluded from blank detection.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OmitIgnore: u8 {
        const BEGIN_PAGE     = 1 << 0;
        const END_PAGE       = 1 << 1;
        const IMAGE_CONTENTS = 1 << 2;
        const SUPER_BLACKS   = 1 << 3;
        const REGISTER_MARKS = 1 << 4;
    }
}

impl OmitIgnore {
    pub fn from_details(details: &IgnoreDetails) -> Self {
        let mut ignore = OmitIgnore::empty();
        ignore.set(OmitIgnore::BEGIN_PAGE, details.begin_page);
        ignore.set(OmitIgnore::END_PAGE, details.end_page);
        ignore.set(OmitIgnore::IMAGE_CONTENTS, details.image_contents);
        ignore.set(OmitIgnore::SUPER_BLACKS, details.super_blacks);
        ignore.set(OmitIgnore::REGISTER_MARKS, details.register_marks);
        ignore
    }
}

/// Where a mark came from, for deciding whether it makes a separation
/// non-blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkKind {
    Normal,
    BeginPage,
    EndPage,
    ImageContents,
    SuperBlack,
    RegisterMark,
    Background,
}

/// Where a colorant stands in the omission state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OmissionState {
    /// The policy never allows this colorant to be dropped.
    NotOmittable,
    /// May be dropped if blank; not evaluated yet this page.
    StaticallyOmittable,
    /// Detected blank and dropped.
    CurrentlyOmitted,
    /// Evaluated and rendered.
    Rendered,
}

/// Saved dynamic omission state, for graphics-state save/restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OmitSnapshot {
    current: ColorantSet,
    kept: ColorantSet,
}

impl RasterStyle {
    // --- Static Policy ---

    /// True if the omit policy lets a colorant of this name and type be
    /// dropped when blank.
    pub(crate) fn is_statically_omittable(&self, name: &str, ty: ColorantType) -> bool {
        let omit = &self.config.separation_details.omit;
        if omit.colorants.iter().any(|n| n == name) {
            return true;
        }
        let monochrome_output = self.separation_style == SeparationStyle::Monochrome
            || self.process_color_model == ProcessColorModel::Gray;
        let blanket = (omit.separations && self.separation_style.is_separating())
            || (omit.monochrome && monochrome_output);
        blanket
            || match ty {
                ColorantType::Process => omit.process,
                ColorantType::Spot => omit.spot,
                ColorantType::ExtraSpot => omit.extra_spot,
                ColorantType::Unknown => false,
            }
    }

    /// Adds `index` to the static omission set if the policy allows it.
    pub(crate) fn apply_omit_policy(&mut self, index: ColorantIndex, name: &str, ty: ColorantType) {
        if index.is_real() && self.is_statically_omittable(name, ty) {
            trace!("{}: {} '{}' may be omitted when blank", self.id, index, name);
            self.colorant_omits.insert(index);
        }
    }

    /// Mark kinds that count towards making `index` non-blank.
    pub fn marks_count(&self, kind: MarkKind, index: ColorantIndex) -> bool {
        match kind {
            MarkKind::Normal => true,
            MarkKind::BeginPage => !self.ignore.contains(OmitIgnore::BEGIN_PAGE),
            MarkKind::EndPage => !self.ignore.contains(OmitIgnore::END_PAGE),
            MarkKind::ImageContents => !self.ignore.contains(OmitIgnore::IMAGE_CONTENTS),
            MarkKind::SuperBlack => !self.ignore.contains(OmitIgnore::SUPER_BLACKS),
            MarkKind::RegisterMark => !self.ignore.contains(OmitIgnore::REGISTER_MARKS),
            MarkKind::Background => !self.background_separations.contains(index),
        }
    }

    /// Adds `index` to `marked` if a mark of `kind` counts.
    pub fn record_mark(&self, marked: &mut ColorantSet, index: ColorantIndex, kind: MarkKind) {
        if self.marks_count(kind, index) {
            marked.insert(index);
        }
    }

    pub fn omit_ignore(&self) -> OmitIgnore {
        self.ignore
    }

    /// Marks `index` as a separation that only carries background.
    pub fn mark_background_separation(&mut self, index: ColorantIndex) {
        self.background_separations.insert(index);
    }

    pub fn is_background_separation(&self, index: ColorantIndex) -> bool {
        self.background_separations.contains(index)
    }

    // --- Dynamic State ---

    /// Records the outcome of a render pass.
    ///
    /// `marked` holds the colorants that received marks. `partial_painted`
    /// holds colorants that partial paints already committed pixels for;
    /// their channels can no longer be omitted. Returns the number of sheets
    /// left to render.
    pub fn mark_blank_separations(&mut self, marked: &ColorantSet, partial_painted: &ColorantSet) -> usize {
        let mut blank = self.colorant_omits.clone();
        blank.difference_with(marked);
        blank.difference_with(&self.kept);
        self.current_omits = blank;
        self.omits_evaluated = true;

        let channels: Vec<_> = self.tree.all_channels().map(|(id, _)| id).collect();
        for ch in channels {
            let painted = self
                .tree
                .colorants_of(ch)
                .any(|(_, c)| partial_painted.contains(c.info.index));
            if painted {
                if let Some(channel) = self.tree.channel_mut(ch) {
                    channel.required_by_partial_paint = true;
                }
            }
        }

        self.derive_omit_flags();
        let remaining = self.sheets_to_render();
        debug!(
            "{}: {} colorant(s) blank, {} of {} sheet(s) to render",
            self.id,
            self.current_omits.len(),
            remaining,
            self.tree.sheet_count()
        );
        remaining
    }

    /// Forces `index` to render even if it turns out blank.
    pub fn dont_omit_separation(&mut self, index: ColorantIndex) {
        if !index.is_real() {
            return;
        }
        self.current_omits.remove(index);
        self.kept.insert(index);
        self.derive_omit_flags();
    }

    /// Forgets all dynamic omission state, e.g. at the start of a page.
    pub fn reset_omit_separations(&mut self) {
        self.current_omits.clear();
        self.kept.clear();
        self.omits_evaluated = false;
        let channels: Vec<_> = self.tree.all_channels().map(|(id, _)| id).collect();
        for ch in channels {
            if let Some(channel) = self.tree.channel_mut(ch) {
                channel.required_by_partial_paint = false;
            }
        }
        self.derive_omit_flags();
    }

    /// True if `index` is currently being omitted.
    pub fn omitting_separation(&self, index: ColorantIndex) -> bool {
        self.current_omits.contains(index)
    }

    /// Where one tree colorant stands in the omission state machine.
    pub fn omission_state(&self, colorant: ColorantId) -> OmissionState {
        let Some(c) = self.tree.colorant(colorant) else {
            return OmissionState::NotOmittable;
        };
        let index = c.info.index;
        if !self.colorant_omits.contains(index) {
            OmissionState::NotOmittable
        } else if c.render_omit {
            OmissionState::CurrentlyOmitted
        } else if !self.omits_evaluated {
            OmissionState::StaticallyOmittable
        } else {
            OmissionState::Rendered
        }
    }

    pub fn save_omits(&self) -> OmitSnapshot {
        OmitSnapshot {
            current: self.current_omits.clone(),
            kept: self.kept.clone(),
        }
    }

    pub fn restore_omits(&mut self, snapshot: OmitSnapshot) {
        self.current_omits = snapshot.current;
        self.kept = snapshot.kept;
        self.derive_omit_flags();
    }

    /// Sheets that will be rendered.
    pub fn sheets_to_render(&self) -> usize {
        self.tree
            .sheets()
            .iter()
            .filter(|&&s| self.tree.sheet(s).is_some_and(|s| !s.render_omit))
            .count()
    }

    /// Re-derives every `render_omit` flag from the current omission set.
    fn derive_omit_flags(&mut self) {
        let sheets: Vec<SheetId> = self.tree.sheets().to_vec();
        for sheet in sheets {
            self.derive_sheet_flags(sheet);
        }
    }

    fn derive_sheet_flags(&mut self, sheet: SheetId) {
        struct ChannelState {
            id: super::ChannelId,
            blank: bool,
            has_real: bool,
            any_omitted_real: bool,
            required: bool,
            painted: bool,
            colorants: Vec<ColorantId>,
        }

        let states: Vec<ChannelState> = self
            .tree
            .channels_of(sheet)
            .map(|(id, ch)| {
                let mut blank = true;
                let mut has_real = false;
                let mut any_omitted_real = false;
                for (_, c) in self.tree.colorants_of(id) {
                    if !c.info.index.is_real() {
                        continue;
                    }
                    has_real = true;
                    if self.current_omits.contains(c.info.index) {
                        any_omitted_real = true;
                    } else {
                        blank = false;
                    }
                }
                ChannelState {
                    id,
                    blank,
                    has_real,
                    any_omitted_real,
                    required: ch.required,
                    painted: ch.required_by_partial_paint,
                    colorants: ch.colorants.clone(),
                }
            })
            .collect();

        let required_marked = states.iter().any(|s| s.required && !s.blank);
        let omits: Vec<bool> = states
            .iter()
            .map(|s| s.blank && !s.painted && !(s.required && required_marked))
            .collect();
        // Placeholder-only channels never decide omission on their own; they
        // go with the sheet.
        let sheet_omit = !states.is_empty()
            && omits.iter().all(|&o| o)
            && states.iter().any(|s| s.any_omitted_real);

        for (state, &omit) in states.iter().zip(&omits) {
            let omit = if state.has_real { omit } else { sheet_omit };
            let force_render = !omit && (state.required || state.painted);
            for &c in &state.colorants {
                let omitted = self
                    .tree
                    .colorant(c)
                    .is_some_and(|c| self.current_omits.contains(c.info.index));
                if let Some(col) = self.tree.colorant_mut(c) {
                    col.render_omit = omitted && !force_render;
                }
            }
            if let Some(ch) = self.tree.channel_mut(state.id) {
                ch.render_omit = omit;
            }
        }

        if let Some(s) = self.tree.sheet_mut(sheet) {
            s.render_omit = sheet_omit;
        }
        if sheet_omit {
            trace!("{}: sheet {:?} omitted", self.id, sheet);
        }
    }
}
