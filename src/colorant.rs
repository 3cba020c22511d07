// src/colorant.rs

//! Colorant identity and per-colorant rendering attributes.
//!
//! A colorant is a named ink. Its identity inside a rasterstyle is a
//! [`ColorantIndex`], a small non-negative integer, or one of three sentinels
//! (`UNKNOWN`, `NONE`, `ALL`). [`ColorantInfo`] carries everything the
//! renderer needs to know about one colorant placed in a channel.

mod map;
mod set;

pub use map::ColorantMap;
pub use set::ColorantSet;

use bitflags::bitflags;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Name carried by the "no colorant" sentinel.
pub const NONE_NAME: &str = "None";
/// Name carried by the "all colorants" sentinel (`/Separation /All`).
pub const ALL_NAME: &str = "All";

// --- Colorant Index ---

/// Index of a colorant within one rasterstyle.
///
/// Real indices are dense and non-negative. The negative values are sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColorantIndex(i32);

impl ColorantIndex {
    /// The name is not known to the rasterstyle.
    pub const UNKNOWN: ColorantIndex = ColorantIndex(-1);
    /// Placeholder for a channel with no colorant bound to it.
    pub const NONE: ColorantIndex = ColorantIndex(-2);
    /// Every colorant at once.
    pub const ALL: ColorantIndex = ColorantIndex(-3);
    /// Largest real index that can be allocated.
    pub const MAX: ColorantIndex = ColorantIndex(i32::MAX - 1);

    /// Wraps a real index. Values beyond [`ColorantIndex::MAX`] saturate to
    /// `UNKNOWN`.
    pub fn new(index: u32) -> Self {
        match i32::try_from(index) {
            Ok(i) if i <= Self::MAX.0 => ColorantIndex(i),
            _ => Self::UNKNOWN,
        }
    }

    /// True for a real (non-sentinel) index.
    pub fn is_real(self) -> bool {
        self.0 >= 0
    }

    /// The index as a usize, `None` for sentinels.
    pub fn get(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }

    /// The index following this one, if any.
    pub(crate) fn next(self) -> Option<ColorantIndex> {
        if self.0 < Self::MAX.0 {
            Some(ColorantIndex(self.0.max(-1) + 1))
        } else {
            None
        }
    }
}

impl fmt::Display for ColorantIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::UNKNOWN => write!(f, "unknown"),
            Self::NONE => write!(f, "none"),
            Self::ALL => write!(f, "all"),
            ColorantIndex(i) => write!(f, "{}", i),
        }
    }
}

// --- Colorant Type ---

/// Kind of ink a colorant represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ColorantType {
    /// Sentinel type for anonymous ("none") and unresolved colorants.
    #[default]
    Unknown,
    /// One of the process colorants of the process color model.
    Process,
    /// A named spot ink.
    Spot,
    /// A spot ink added outside the device's declared set.
    ExtraSpot,
}

impl ColorantType {
    /// True for process, spot and extra-spot.
    pub fn is_real(self) -> bool {
        !matches!(self, ColorantType::Unknown)
    }
}

// --- Special Handling ---

/// Special rendering treatment requested for a colorant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SpecialHandling {
    #[default]
    None,
    Opaque,
    OpaqueIgnore,
    Transparent,
    TrapZones,
    TrapHighlights,
}

// --- Rendering Properties ---

/// Object dispositions that carry separate rendering properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    Vector,
    Text,
    Image,
    Shading,
}

impl Disposition {
    pub const ALL: [Disposition; 4] = [
        Disposition::Vector,
        Disposition::Text,
        Disposition::Image,
        Disposition::Shading,
    ];

    fn shift(self) -> u32 {
        match self {
            Disposition::Vector => 0,
            Disposition::Text => 4,
            Disposition::Image => 8,
            Disposition::Shading => 12,
        }
    }
}

bitflags! {
    /// Per-disposition render/mask/knockout/ignore bits.
    ///
    /// Each disposition owns one nibble: render, mask, knockout, ignore.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RenderingProperties: u32 {
        const RENDER_VECTOR   = 1 << 0;
        const MASK_VECTOR     = 1 << 1;
        const KNOCKOUT_VECTOR = 1 << 2;
        const IGNORE_VECTOR   = 1 << 3;
        const RENDER_TEXT     = 1 << 4;
        const MASK_TEXT       = 1 << 5;
        const KNOCKOUT_TEXT   = 1 << 6;
        const IGNORE_TEXT     = 1 << 7;
        const RENDER_IMAGE    = 1 << 8;
        const MASK_IMAGE      = 1 << 9;
        const KNOCKOUT_IMAGE  = 1 << 10;
        const IGNORE_IMAGE    = 1 << 11;
        const RENDER_SHADING  = 1 << 12;
        const MASK_SHADING    = 1 << 13;
        const KNOCKOUT_SHADING = 1 << 14;
        const IGNORE_SHADING  = 1 << 15;

        const RENDER_ALL = Self::RENDER_VECTOR.bits() | Self::RENDER_TEXT.bits()
            | Self::RENDER_IMAGE.bits() | Self::RENDER_SHADING.bits();
        const MASK_ALL = Self::MASK_VECTOR.bits() | Self::MASK_TEXT.bits()
            | Self::MASK_IMAGE.bits() | Self::MASK_SHADING.bits();
        const KNOCKOUT_ALL = Self::KNOCKOUT_VECTOR.bits() | Self::KNOCKOUT_TEXT.bits()
            | Self::KNOCKOUT_IMAGE.bits() | Self::KNOCKOUT_SHADING.bits();
        const IGNORE_ALL = Self::IGNORE_VECTOR.bits() | Self::IGNORE_TEXT.bits()
            | Self::IGNORE_IMAGE.bits() | Self::IGNORE_SHADING.bits();
    }
}

impl Default for RenderingProperties {
    fn default() -> Self {
        RenderingProperties::RENDER_ALL
    }
}

impl RenderingProperties {
    /// The nibble of properties for one disposition, shifted down to bits 0-3.
    pub fn for_disposition(self, disposition: Disposition) -> RenderingProperties {
        RenderingProperties::from_bits_truncate((self.bits() >> disposition.shift()) & 0xF)
    }

    /// True if objects of `disposition` are rendered into this colorant.
    pub fn renders(self, disposition: Disposition) -> bool {
        self.for_disposition(disposition)
            .contains(RenderingProperties::RENDER_VECTOR)
    }
}

// --- Colorant Info ---

/// Screen angle assigned to a colorant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenAngle {
    pub angle: f32,
    /// When set, the angle overrides any angle from the halftone itself.
    pub overrides: bool,
}

impl Default for ScreenAngle {
    fn default() -> Self {
        ScreenAngle {
            angle: 45.0,
            overrides: false,
        }
    }
}

/// Everything known about one colorant placed in a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorantInfo {
    pub index: ColorantIndex,
    pub colorant_type: ColorantType,
    pub name: String,
    /// Name the colorant had before a name override, if any.
    pub original_name: Option<String>,
    pub offset_x: i32,
    pub offset_y: i32,
    /// Band the colorant starts in, derived from `offset_y`.
    pub offset_band: i32,
    pub rendering_properties: RenderingProperties,
    pub special_handling: SpecialHandling,
    pub screen_angle: ScreenAngle,
    pub neutral_density: Option<f32>,
    /// sRGB equivalent; `None` until computed.
    pub srgb: Option<[f32; 3]>,
    /// CMYK equivalent; `None` until computed.
    pub cmyk: Option<[f32; 4]>,
}

impl ColorantInfo {
    /// A real colorant with default placement and properties.
    pub fn new(index: ColorantIndex, colorant_type: ColorantType, name: impl Into<String>) -> Self {
        ColorantInfo {
            index,
            colorant_type,
            name: name.into(),
            original_name: None,
            offset_x: 0,
            offset_y: 0,
            offset_band: 0,
            rendering_properties: RenderingProperties::default(),
            special_handling: SpecialHandling::None,
            screen_angle: ScreenAngle::default(),
            neutral_density: None,
            srgb: None,
            cmyk: None,
        }
    }

    /// The anonymous "no colorant" placeholder.
    pub fn none() -> Self {
        ColorantInfo::new(ColorantIndex::NONE, ColorantType::Unknown, NONE_NAME)
    }

    /// Checks the sentinel/type pairing rules.
    ///
    /// `UNKNOWN` never carries a real type, and `NONE` always uses the base
    /// "no colorant" name.
    pub fn is_consistent(&self) -> bool {
        if self.index == ColorantIndex::UNKNOWN && self.colorant_type.is_real() {
            return false;
        }
        if self.index == ColorantIndex::NONE && self.name != NONE_NAME {
            return false;
        }
        if self.index.is_real() && !self.colorant_type.is_real() {
            return false;
        }
        true
    }

    /// Placement order within a channel: y descending, then x ascending.
    pub(crate) fn placement_key(&self) -> (std::cmp::Reverse<i32>, i32) {
        (std::cmp::Reverse(self.offset_y), self.offset_x)
    }
}

// --- Default Tables ---

/// Conventional screen angles for process colorant names.
pub(crate) static DEFAULT_SCREEN_ANGLES: Lazy<HashMap<&'static str, f32>> = Lazy::new(|| {
    HashMap::from([
        ("Cyan", 15.0),
        ("Magenta", 75.0),
        ("Yellow", 0.0),
        ("Black", 45.0),
        ("Gray", 45.0),
        ("Red", 15.0),
        ("Green", 75.0),
        ("Blue", 0.0),
    ])
});

/// sRGB appearance of process colorant names at full strength.
pub(crate) static DEFAULT_SRGB: Lazy<HashMap<&'static str, [f32; 3]>> = Lazy::new(|| {
    HashMap::from([
        ("Cyan", [0.0, 1.0, 1.0]),
        ("Magenta", [1.0, 0.0, 1.0]),
        ("Yellow", [1.0, 1.0, 0.0]),
        ("Black", [0.0, 0.0, 0.0]),
        ("Red", [1.0, 0.0, 0.0]),
        ("Green", [0.0, 1.0, 0.0]),
        ("Blue", [0.0, 0.0, 1.0]),
    ])
});

/// CMYK appearance of process colorant names at full strength.
pub(crate) static DEFAULT_CMYK: Lazy<HashMap<&'static str, [f32; 4]>> = Lazy::new(|| {
    HashMap::from([
        ("Cyan", [1.0, 0.0, 0.0, 0.0]),
        ("Magenta", [0.0, 1.0, 0.0, 0.0]),
        ("Yellow", [0.0, 0.0, 1.0, 0.0]),
        ("Black", [0.0, 0.0, 0.0, 1.0]),
        ("Red", [0.0, 1.0, 1.0, 0.0]),
        ("Green", [1.0, 0.0, 1.0, 0.0]),
        ("Blue", [1.0, 1.0, 0.0, 0.0]),
    ])
});
