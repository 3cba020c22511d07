// src/blit.rs

//! Blit colormaps: the packed pixel layout handed to the renderer.
//!
//! A colormap is built for one frame (or one colorant) of a rasterstyle after
//! omission has run. Each colorant to be rendered gets a bit field of
//! `ceil(log2(values_per_component))` bits. Omitted and placeholder colorants
//! keep their field but carry the `NONE` index so the renderer can skip
//! them without re-checking the tree.

use log::{debug, trace};

use crate::colorant::{ColorantIndex, RenderingProperties};
use crate::config::VALID_VALUES_PER_COMPONENT;
use crate::error::{RasterStyleError, Result};
use crate::rasterstyle::{ChannelId, ColorantId, ColorantWalk, RasterStyle};

/// Hard limit on colorant fields in one colormap.
pub const MAX_BLIT_CHANNELS: usize = 32;

/// What the colormap is being built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlitSource {
    /// A frame as returned by [`RasterStyle::frames`].
    Frame(ChannelId),
    /// A single colorant, e.g. for `/Separation` painting into one plane.
    Colorant(ColorantId),
}

/// Caller adjustments to the layout derived from the rasterstyle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlitOverrides {
    pub values_per_component: Option<u32>,
    /// Rendering into a compositing backdrop: gather every channel of the
    /// sheet and pack additively.
    pub compositing: bool,
    /// Add an alpha field. Only honoured when compositing.
    pub alpha: bool,
    /// Carry object-type tags with the pixel data.
    pub object_type: bool,
}

/// How color values are stored in their fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packing {
    /// Stored as-is; 0 is no light.
    Additive,
    /// Stored inverted; 0 is full ink.
    SubtractiveInverted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Colorant,
    /// The `/All` pseudo-colorant. Occupies no bits.
    All,
    Alpha,
    ObjectType,
}

/// One bit field of a packed pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlitSlot {
    pub kind: SlotKind,
    pub colorant: ColorantIndex,
    pub bit_offset: u32,
    pub bit_size: u32,
    pub rendering_properties: RenderingProperties,
}

/// Packed pixel layout for one rendering pass.
#[derive(Debug, Clone, PartialEq)]
pub struct BlitColorMap {
    slots: Vec<BlitSlot>,
    bits_per_pixel: u32,
    values_per_component: u32,
    packing: Packing,
    object_type_map: Option<Vec<u32>>,
}

impl BlitColorMap {
    pub fn build(rs: &RasterStyle, source: BlitSource, overrides: &BlitOverrides) -> Result<Self> {
        let vpc = overrides
            .values_per_component
            .unwrap_or(rs.values_per_component());
        if !VALID_VALUES_PER_COMPONENT.contains(&vpc) {
            return Err(RasterStyleError::range(
                "ValuesPerComponent",
                format!("blit override {} is not one of {:?}", vpc, VALID_VALUES_PER_COMPONENT),
            ));
        }
        let bits = component_bits(vpc);
        let packing = if overrides.compositing || rs.process_color_model().is_additive() {
            Packing::Additive
        } else {
            Packing::SubtractiveInverted
        };

        let colorants = gather(rs, source, overrides.compositing);
        let mut slots: Vec<BlitSlot> = Vec::with_capacity(colorants.len() + 3);
        let mut offset = 0;
        for id in colorants {
            let Some(colorant) = rs.tree().colorant(id) else {
                continue;
            };
            let channel_omitted = rs
                .tree()
                .channel(colorant.channel())
                .map_or(true, |ch| ch.is_omitted());
            let info = colorant.info();
            let live = info.index.is_real() && !colorant.is_omitted() && !channel_omitted;
            let index = if live { info.index } else { ColorantIndex::NONE };
            let props = info.rendering_properties;
            if live
                && slots
                    .iter()
                    .any(|s| s.colorant == index && s.rendering_properties == props)
            {
                trace!("blit: {} already packed, skipping duplicate", index);
                continue;
            }
            slots.push(BlitSlot {
                kind: SlotKind::Colorant,
                colorant: index,
                bit_offset: offset,
                bit_size: bits,
                rendering_properties: props,
            });
            offset += bits;
        }

        let alpha = overrides.compositing && overrides.alpha;
        let needed = slots.len() + usize::from(alpha) + usize::from(overrides.object_type);
        if needed > MAX_BLIT_CHANNELS {
            return Err(RasterStyleError::config(format!(
                "{} channels needed, at most {} can be blitted together",
                needed, MAX_BLIT_CHANNELS
            )));
        }

        if alpha {
            slots.push(extra_slot(SlotKind::Alpha, ColorantIndex::NONE, offset, bits));
            offset += bits;
        }
        if !overrides.compositing {
            slots.push(extra_slot(SlotKind::All, ColorantIndex::ALL, offset, 0));
        }
        if overrides.object_type {
            slots.push(extra_slot(SlotKind::ObjectType, ColorantIndex::NONE, offset, bits));
            offset += bits;
        }

        debug!(
            "{}: blit colormap for {:?}: {} slot(s), {} bit(s) per pixel, {:?}",
            rs.id(),
            source,
            slots.len(),
            offset,
            packing
        );
        Ok(BlitColorMap {
            slots,
            bits_per_pixel: offset,
            values_per_component: vpc,
            packing,
            object_type_map: overrides
                .object_type
                .then(|| rs.object_type_map().map(<[u32]>::to_vec))
                .flatten(),
        })
    }

    pub fn slots(&self) -> &[BlitSlot] {
        &self.slots
    }

    /// Colorant fields only, in packing order.
    pub fn colorant_slots(&self) -> impl Iterator<Item = &BlitSlot> {
        self.slots.iter().filter(|s| s.kind == SlotKind::Colorant)
    }

    /// Every field rendering `index`.
    pub fn slots_for(&self, index: ColorantIndex) -> impl Iterator<Item = &BlitSlot> {
        self.slots.iter().filter(move |s| s.colorant == index)
    }

    pub fn slot_of_kind(&self, kind: SlotKind) -> Option<&BlitSlot> {
        self.slots.iter().find(|s| s.kind == kind)
    }

    pub fn bits_per_pixel(&self) -> u32 {
        self.bits_per_pixel
    }

    pub fn values_per_component(&self) -> u32 {
        self.values_per_component
    }

    pub fn packing(&self) -> Packing {
        self.packing
    }

    pub fn object_type_map(&self) -> Option<&[u32]> {
        self.object_type_map.as_deref()
    }

    /// Converts a color value (0 = no color) to its stored form.
    pub fn encode(&self, value: u32) -> u32 {
        let max = self.values_per_component - 1;
        let value = value.min(max);
        match self.packing {
            Packing::Additive => value,
            Packing::SubtractiveInverted => max - value,
        }
    }
}

/// Bits needed to store `values` distinct levels.
pub fn component_bits(values: u32) -> u32 {
    match values {
        0 | 1 => 0,
        v => u32::BITS - (v - 1).leading_zeros(),
    }
}

fn extra_slot(kind: SlotKind, colorant: ColorantIndex, bit_offset: u32, bit_size: u32) -> BlitSlot {
    BlitSlot {
        kind,
        colorant,
        bit_offset,
        bit_size,
        rendering_properties: RenderingProperties::RENDER_ALL,
    }
}

/// Colorants packed together for `source`.
fn gather(rs: &RasterStyle, source: BlitSource, compositing: bool) -> Vec<ColorantId> {
    match source {
        BlitSource::Colorant(id) => vec![id],
        BlitSource::Frame(frame) => {
            let channels = if compositing || rs.is_backdrop() {
                match rs.tree().channel(frame) {
                    Some(ch) => rs.tree().channels_of(ch.sheet()).map(|(id, _)| id).collect(),
                    None => Vec::new(),
                }
            } else {
                rs.frame_channels(frame, ColorantWalk::Individual)
            };
            channels
                .into_iter()
                .flat_map(|ch| rs.tree().colorants_of(ch).map(|(id, _)| id))
                .collect()
        }
    }
}
