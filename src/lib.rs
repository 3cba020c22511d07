// src/lib.rs

//! Colorant and raster-style management for a raster image processor.
//!
//! A [`RasterStyle`] describes one output color configuration: which named
//! colorants exist, how they are laid out on sheets and channels, which of
//! them may be dropped when blank, and how the renderer packs their values.
//! Device rasterstyles are compiled from a [`RasterStyleConfig`] by
//! [`setup::build`]; backdrops for transparency groups are chained onto a
//! parent with [`setup::build_backdrop`].

pub mod blit;
pub mod colorant;
pub mod config;
pub mod describe;
pub mod directory;
pub mod error;
pub mod generation;
pub mod rasterstyle;
pub mod setup;

pub use crate::{
    blit::{BlitColorMap, BlitOverrides, BlitSource},
    colorant::{ColorantIndex, ColorantInfo, ColorantSet, ColorantType},
    config::RasterStyleConfig,
    error::{RasterStyleError, Result},
    rasterstyle::{RasterStyle, RasterStyleHandle, StyleKind},
};
