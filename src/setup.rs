// src/setup.rs

//! Setup compiler: configuration in, populated rasterstyle out.
//!
//! Building runs in a fixed sequence. It validates the configuration and
//! declares the configured colorant indices. It creates one sheet per
//! separation (or a single composite sheet) with one channel per declared
//! channel name, then binds each separation to the channel(s) the mapping
//! heuristic prefers. Finally it fills in per-name attributes, required
//! flags, the static omission policy, and the black/photoink indices.
//!
//! Nothing is mutated before validation succeeds, and a failure part-way
//! drops the partially built rasterstyle before the error is returned.

use std::sync::Arc;

use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};

use crate::colorant::{ColorantIndex, ColorantInfo};
use crate::config::{
    InterleavingStyle, Presence, ProcessColorModel, RasterStyleConfig, SeparationStyle,
};
use crate::error::{RasterStyleError, Result};
use crate::rasterstyle::{ChannelId, RasterStyle, RasterStyleHandle, SheetId, StyleKind};

/// Compiles a device rasterstyle from its configuration.
pub fn build(config: &RasterStyleConfig) -> Result<RasterStyle> {
    config.validate(false)?;
    let mut rs = RasterStyle::new(StyleKind::Device, None, config)?;

    declare_colorants(&mut rs, config)?;
    if config.separation_style.is_separating() {
        for name in &config.separation_order {
            let index = rs.possibly_new_separation(name)?;
            add_separation_sheet(&mut rs, name, index)?;
        }
    } else {
        build_composite_sheet(&mut rs, config)?;
    }
    apply_static_omits(&mut rs, config);
    resolve_device_indices(&mut rs, config);
    rs.tree.renumber();

    info!(
        "{}: built {:?}/{:?} with {} sheet(s), {} channel(s), {} colorant(s)",
        rs.id(),
        config.separation_style,
        config.interleaving_style,
        rs.tree.sheet_count(),
        rs.tree.channel_count(),
        rs.colorant_count()
    );
    Ok(rs)
}

/// Pre-declared indices, process colorants, recipes and photoinks.
fn declare_colorants(rs: &mut RasterStyle, config: &RasterStyleConfig) -> Result<()> {
    for (fully_fledged, table, field) in [
        (true, &config.fully_fledged_colorants, "FullyFledgedColorants"),
        (false, &config.reserved_colorants, "ReservedColorants"),
    ] {
        for (name, &raw) in table {
            let index = ColorantIndex::new(raw);
            if !index.is_real() {
                return Err(RasterStyleError::range(
                    field,
                    format!("index {} for '{}' is out of range", raw, name),
                ));
            }
            rs.declare_colorant(name, index, fully_fledged);
        }
    }

    for name in config.effective_process_colorants() {
        rs.possibly_new_name(&name)?;
    }
    for name in &config.photoink {
        rs.possibly_new_name(name)?;
    }
    for (name, substitutes) in &config.colorant_mappings {
        let index = rs.possibly_new_name(name)?;
        let subs = substitutes
            .iter()
            .map(|s| rs.possibly_new_name(s))
            .collect::<Result<Vec<_>>>()?;
        rs.set_colorant_mapping(index, &subs)?;
    }
    debug!(
        "{}: declared {} fully-fledged and {} reserved name(s)",
        rs.id(),
        rs.fully_fledged().len(),
        rs.reserved().len()
    );
    Ok(())
}

fn build_composite_sheet(rs: &mut RasterStyle, config: &RasterStyleConfig) -> Result<()> {
    let sheet = rs.tree.add_sheet()?;
    for name in config.effective_color_channels() {
        let channel = rs.tree.add_channel(sheet, &name)?;
        let binds = !name.is_empty()
            && (config.separation_order.is_empty() || config.separation_order.contains(&name));
        let info = if binds {
            let index = rs.possibly_new_separation(&name)?;
            rs.colorant_info_for(index, &name)
        } else {
            ColorantInfo::none()
        };
        place(rs, channel, info)?;
    }
    Ok(())
}

/// Binds a new separation into a composite page.
///
/// The first channel of the last sheet that holds only placeholders and is
/// not required is reused; otherwise a channel named after the colorant is
/// appended.
pub(crate) fn bind_composite_colorant(rs: &mut RasterStyle, name: &str, index: ColorantIndex) -> Result<()> {
    let last = rs.tree.sheets().last().copied();
    let sheet = match last {
        Some(sheet) => sheet,
        None => rs.tree.add_sheet()?,
    };
    let reusable = rs
        .tree
        .channels_of(sheet)
        .find(|(_, ch)| ch.blank_colorants && !ch.required)
        .map(|(id, _)| id);

    let channel = match reusable {
        Some(channel) => {
            let placeholders: Vec<_> = rs.tree.colorants_of(channel).map(|(id, _)| id).collect();
            for id in placeholders {
                rs.tree.remove_colorant(id);
            }
            trace!("{}: reusing blank channel {:?} for '{}'", rs.id(), channel, name);
            channel
        }
        None => rs.tree.add_channel(sheet, name)?,
    };
    let info = rs.colorant_info_for(index, name);
    place(rs, channel, info)
}

/// Appends a sheet for one separation, binding it to the preferred
/// channel(s).
pub(crate) fn add_separation_sheet(rs: &mut RasterStyle, name: &str, index: ColorantIndex) -> Result<SheetId> {
    let config = Arc::clone(&rs.config);
    let sheet = rs.tree.add_sheet()?;
    let mut channels = Vec::new();
    for channel_name in config.effective_color_channels() {
        channels.push((rs.tree.add_channel(sheet, &channel_name)?, channel_name));
    }

    let scores: Vec<Option<u32>> = channels
        .iter()
        .enumerate()
        .map(|(position, (_, channel_name))| channel_score(&config, name, channel_name, position))
        .collect();
    let best = scores.iter().flatten().min().copied();
    if best.is_none() {
        warn!("{}: no channel accepts separation '{}'", rs.id(), name);
    }

    for ((channel, _), score) in channels.into_iter().zip(scores) {
        let info = if score.is_some() && score == best {
            rs.colorant_info_for(index, name)
        } else {
            ColorantInfo::none()
        };
        place(rs, channel, info)?;
    }
    debug!("{}: separation '{}' on sheet {:?} (best score {:?})", rs.id(), name, sheet, best);
    Ok(sheet)
}

/// Preference of one channel for a separation; lower is better, `None`
/// means the channel does not qualify.
fn channel_score(config: &RasterStyleConfig, separation: &str, channel: &str, position: usize) -> Option<u32> {
    let policy = &config.channel_mapping;
    let declared_black_applies = matches!(
        config.separation_style,
        SeparationStyle::Monochrome | SeparationStyle::Separations
    );
    let declared_black = config.process_colorant_black.as_deref();

    [
        policy.exact_match.filter(|_| channel == separation),
        policy.black.filter(|_| channel == "Black"),
        policy.gray.filter(|_| channel == "Gray"),
        policy
            .declared_black
            .filter(|_| declared_black_applies && declared_black == Some(channel)),
        policy.first_channel.filter(|_| position == 0),
    ]
    .into_iter()
    .flatten()
    .min()
}

/// Adds `info` to `channel` and applies the presence and omission policy
/// for the bound name.
fn place(rs: &mut RasterStyle, channel: ChannelId, info: ColorantInfo) -> Result<()> {
    let channel_name = rs
        .tree
        .channel(channel)
        .map(|ch| ch.name.clone())
        .unwrap_or_default();
    let required = rs.presence_of(&channel_name) == Presence::MustBePresent
        || (info.index.is_real() && rs.presence_of(&info.name) == Presence::MustBePresent);
    if required {
        rs.tree.set_required(channel, true);
    }

    let (index, name, ty) = (info.index, info.name.clone(), info.colorant_type);
    rs.tree.add_colorant(channel, info)?;
    rs.apply_omit_policy(index, &name, ty);
    Ok(())
}

/// Explicitly listed omit colorants that are not bound in the tree still
/// join the static set, so they drop out if added later.
fn apply_static_omits(rs: &mut RasterStyle, config: &RasterStyleConfig) {
    for name in &config.separation_details.omit.colorants {
        let index = rs.colorant_index_reserved(name);
        if index.is_real() {
            rs.colorant_omits.insert(index);
        }
    }
}

fn resolve_device_indices(rs: &mut RasterStyle, config: &RasterStyleConfig) {
    let black = config.process_colorant_black.as_deref().unwrap_or("Black");
    rs.black_index = rs.colorant_index_reserved(black);
    rs.photoink = config
        .photoink
        .iter()
        .map(|name| rs.colorant_index_reserved(name))
        .filter(|index| index.is_real())
        .collect();
    debug!("{}: black is {}, {} photoink(s)", rs.id(), rs.black_index, rs.photoink.len());
}

// --- Backdrops ---

/// Describes the blend space of a transparency group or soft mask.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct BackdropConfig {
    /// Colorant names of the group's blend space; empty means the process
    /// colorants of `process_color_model`.
    pub colorants: Vec<String>,
    pub process_color_model: ProcessColorModel,
    pub values_per_component: u32,
}

impl Default for BackdropConfig {
    fn default() -> Self {
        BackdropConfig {
            colorants: Vec::new(),
            process_color_model: ProcessColorModel::default(),
            values_per_component: 65536,
        }
    }
}

/// Builds a backdrop rasterstyle chained onto `parent`.
///
/// Backdrops are pixel-interleaved composite pages with one channel per
/// blend-space colorant. The new rasterstyle holds a reference to `parent`
/// for as long as it lives.
pub fn build_backdrop(parent: &RasterStyleHandle, backdrop: &BackdropConfig) -> Result<RasterStyle> {
    let process_colorants = if backdrop.process_color_model == ProcessColorModel::DeviceN {
        backdrop.colorants.clone()
    } else {
        Vec::new()
    };
    let config = RasterStyleConfig {
        process_color_model: backdrop.process_color_model,
        interleaving_style: InterleavingStyle::Pixel,
        values_per_component: backdrop.values_per_component,
        separation_style: SeparationStyle::Composite,
        color_channels: backdrop.colorants.clone(),
        process_colorants,
        ..RasterStyleConfig::default()
    };
    config.validate(true)?;

    let mut rs = RasterStyle::new(StyleKind::Backdrop, Some(parent.clone()), &config)?;
    for name in config.effective_process_colorants() {
        rs.possibly_new_name(&name)?;
    }
    build_composite_sheet(&mut rs, &config)?;
    rs.tree.renumber();
    debug!(
        "{}: backdrop over {} with {} channel(s)",
        rs.id(),
        parent.read().id(),
        rs.tree.channel_count()
    );
    Ok(rs)
}

#[cfg(test)]
mod tests;
