// src/rasterstyle/iterate.rs

//! Renderer-facing walk over frames and colorants.
//!
//! A frame is what the back end renders in one go. With frame interleaving
//! every channel is its own frame; otherwise a sheet is rendered as a unit
//! and its first channel stands for the frame.

use super::{ChannelId, ColorantId, RasterStyle, SheetId};
use crate::colorant::{ColorantIndex, ColorantType, ScreenAngle, SpecialHandling};
use crate::config::InterleavingStyle;

/// How to step through the colorants of a pixel-interleaved frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorantWalk {
    /// Every colorant of every channel packed into the frame.
    #[default]
    Individual,
    /// The frame's own channel only; the interleaved planes are one step.
    Grouped,
}

/// Iterator over the frames of a rasterstyle, in render order.
pub struct FrameIter<'a> {
    rasterstyle: &'a RasterStyle,
    sheets: std::slice::Iter<'a, SheetId>,
    channels: std::slice::Iter<'a, ChannelId>,
    skip_omitted: bool,
}

impl<'a> FrameIter<'a> {
    fn next_candidate(&mut self) -> Option<ChannelId> {
        let tree = &self.rasterstyle.tree;
        if self.rasterstyle.interleaving == InterleavingStyle::Frame {
            loop {
                if let Some(&ch) = self.channels.next() {
                    return Some(ch);
                }
                let &sheet = self.sheets.next()?;
                self.channels = tree.sheet(sheet).map(|s| s.channels.iter()).unwrap_or_default();
            }
        }
        loop {
            let &sheet = self.sheets.next()?;
            if let Some(&first) = tree.sheet(sheet).and_then(|s| s.channels.first()) {
                return Some(first);
            }
        }
    }
}

impl<'a> Iterator for FrameIter<'a> {
    type Item = ChannelId;

    fn next(&mut self) -> Option<ChannelId> {
        loop {
            let ch = self.next_candidate()?;
            if !self.skip_omitted || !self.rasterstyle.frame_omitted(ch) {
                return Some(ch);
            }
        }
    }
}

/// Iterator over the colorants of one frame.
pub struct ColorantIter<'a> {
    rasterstyle: &'a RasterStyle,
    channels: Vec<ChannelId>,
    channel_pos: usize,
    colorant_pos: usize,
}

impl<'a> Iterator for ColorantIter<'a> {
    type Item = ColorantId;

    fn next(&mut self) -> Option<ColorantId> {
        let tree = &self.rasterstyle.tree;
        while let Some(&ch) = self.channels.get(self.channel_pos) {
            let colorants = tree.channel(ch).map(|c| c.colorants.as_slice()).unwrap_or_default();
            if let Some(&id) = colorants.get(self.colorant_pos) {
                self.colorant_pos += 1;
                return Some(id);
            }
            self.channel_pos += 1;
            self.colorant_pos = 0;
        }
        None
    }
}

/// Everything the renderer needs to know about one colorant.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorantDescription {
    pub name: String,
    pub index: ColorantIndex,
    pub colorant_type: ColorantType,
    pub offset_x: i32,
    pub offset_y: i32,
    pub offset_band: i32,
    pub screen_angle: ScreenAngle,
    pub special_handling: SpecialHandling,
    pub srgb: Option<[f32; 3]>,
    pub cmyk: Option<[f32; 4]>,
    /// Real, and neither it nor its channel or sheet is omitted.
    pub renderable: bool,
}

impl RasterStyle {
    /// Every frame, omitted or not.
    pub fn frames(&self) -> FrameIter<'_> {
        FrameIter {
            rasterstyle: self,
            sheets: self.tree.sheets().iter(),
            channels: [].iter(),
            skip_omitted: false,
        }
    }

    /// Frames that survive blank omission.
    pub fn frames_to_render(&self) -> FrameIter<'_> {
        FrameIter {
            skip_omitted: true,
            ..self.frames()
        }
    }

    /// Channels whose colorants make up `frame`.
    pub fn frame_channels(&self, frame: ChannelId, walk: ColorantWalk) -> Vec<ChannelId> {
        let Some(channel) = self.tree.channel(frame) else {
            return Vec::new();
        };
        let whole_sheet = match self.interleaving {
            InterleavingStyle::Band => true,
            InterleavingStyle::Pixel => walk == ColorantWalk::Individual,
            InterleavingStyle::Mono | InterleavingStyle::Frame => false,
        };
        if whole_sheet {
            self.tree
                .channels_of(channel.sheet)
                .map(|(id, _)| id)
                .collect()
        } else {
            vec![frame]
        }
    }

    /// Colorants of `frame`, in channel then placement order.
    pub fn colorants(&self, frame: ChannelId, walk: ColorantWalk) -> ColorantIter<'_> {
        ColorantIter {
            rasterstyle: self,
            channels: self.frame_channels(frame, walk),
            channel_pos: 0,
            colorant_pos: 0,
        }
    }

    pub fn colorant_description(&self, id: ColorantId) -> Option<ColorantDescription> {
        let colorant = self.tree.colorant(id)?;
        let channel = self.tree.channel(colorant.channel)?;
        let sheet_omitted = self.tree.sheet(channel.sheet).is_some_and(|s| s.render_omit);
        let info = &colorant.info;
        Some(ColorantDescription {
            name: info.name.clone(),
            index: info.index,
            colorant_type: info.colorant_type,
            offset_x: info.offset_x,
            offset_y: info.offset_y,
            offset_band: info.offset_band,
            screen_angle: info.screen_angle,
            special_handling: info.special_handling,
            srgb: info.srgb,
            cmyk: info.cmyk,
            renderable: info.index.is_real()
                && !colorant.render_omit
                && !channel.render_omit
                && !sheet_omitted,
        })
    }

    /// A frame is omitted when its sheet is, or, for frame interleaving,
    /// when its own channel is.
    fn frame_omitted(&self, frame: ChannelId) -> bool {
        let Some(channel) = self.tree.channel(frame) else {
            return true;
        };
        let sheet_omitted = self.tree.sheet(channel.sheet).is_some_and(|s| s.render_omit);
        sheet_omitted || (self.interleaving == InterleavingStyle::Frame && channel.render_omit)
    }
}
