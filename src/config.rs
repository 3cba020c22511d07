// src/config.rs

//! Declarative device configuration consumed by the setup compiler.
//!
//! The structures here mirror the flat record handed over by the page-device
//! layer. They deserialize from JSON (field names are PascalCase, as the
//! page device spells them) and every record carries `#[serde(default)]`, so
//! a configuration only needs to name what it changes.
//!
//! [`RasterStyleConfig::validate`] enforces the cross-field constraints
//! before any tree is built.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::colorant::{ColorantType, SpecialHandling};
use crate::error::{RasterStyleError, Result};

/// Values-per-component settings a device may ask for.
pub const VALID_VALUES_PER_COMPONENT: [u32; 6] = [2, 4, 16, 256, 1024, 65536];

/// Below this many values per component the output is halftoned.
pub const CONTONE_THRESHOLD: u32 = 256;

// --- Enumerations ---

/// The device's native color model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProcessColorModel {
    #[serde(rename = "DeviceGray")]
    Gray,
    #[serde(rename = "DeviceRGB")]
    Rgb,
    #[default]
    #[serde(rename = "DeviceCMYK")]
    Cmyk,
    #[serde(rename = "DeviceCMY")]
    Cmy,
    #[serde(rename = "DeviceRGBK")]
    Rgbk,
    #[serde(rename = "DeviceLab", alias = "Lab")]
    Lab,
    #[serde(rename = "DeviceN")]
    DeviceN,
}

impl ProcessColorModel {
    /// Names of the model's process colorants, in canonical order.
    pub fn process_colorants(self) -> &'static [&'static str] {
        match self {
            ProcessColorModel::Gray => &["Gray"],
            ProcessColorModel::Rgb => &["Red", "Green", "Blue"],
            ProcessColorModel::Cmyk => &["Cyan", "Magenta", "Yellow", "Black"],
            ProcessColorModel::Cmy => &["Cyan", "Magenta", "Yellow"],
            ProcessColorModel::Rgbk => &["Red", "Green", "Blue", "Black"],
            ProcessColorModel::Lab => &["L", "a", "b"],
            ProcessColorModel::DeviceN => &[],
        }
    }

    /// Fixed process colorant count, `None` for DeviceN.
    pub fn colorant_count(self) -> Option<u32> {
        match self {
            ProcessColorModel::DeviceN => None,
            model => Some(model.process_colorants().len() as u32),
        }
    }

    /// True if pixel values increase with light rather than ink.
    pub fn is_additive(self) -> bool {
        matches!(self, ProcessColorModel::Rgb)
    }
}

/// How channels are interleaved in memory while rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "i32", into = "i32")]
pub enum InterleavingStyle {
    Mono,
    Pixel,
    #[default]
    Band,
    Frame,
}

impl TryFrom<i32> for InterleavingStyle {
    type Error = RasterStyleError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            1 => Ok(InterleavingStyle::Mono),
            2 => Ok(InterleavingStyle::Pixel),
            3 => Ok(InterleavingStyle::Band),
            4 => Ok(InterleavingStyle::Frame),
            _ => Err(RasterStyleError::range(
                "InterleavingStyle",
                format!("{} is not 1 (mono), 2 (pixel), 3 (band) or 4 (frame)", code),
            )),
        }
    }
}

impl From<InterleavingStyle> for i32 {
    fn from(style: InterleavingStyle) -> i32 {
        match style {
            InterleavingStyle::Mono => 1,
            InterleavingStyle::Pixel => 2,
            InterleavingStyle::Band => 3,
            InterleavingStyle::Frame => 4,
        }
    }
}

/// How many sheets exist and how colors are split across them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "i32", into = "i32")]
pub enum SeparationStyle {
    Monochrome,
    Separations,
    ColoredSeparations,
    Progressives,
    #[default]
    Composite,
}

impl SeparationStyle {
    /// True for the styles that produce one sheet per separation.
    pub fn is_separating(self) -> bool {
        !matches!(self, SeparationStyle::Composite)
    }
}

impl TryFrom<i32> for SeparationStyle {
    type Error = RasterStyleError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            0 => Ok(SeparationStyle::Monochrome),
            1 => Ok(SeparationStyle::Separations),
            2 => Ok(SeparationStyle::ColoredSeparations),
            3 => Ok(SeparationStyle::Progressives),
            4 => Ok(SeparationStyle::Composite),
            _ => Err(RasterStyleError::range(
                "SeparationStyle",
                format!("{} is not a separation style code (0-4)", code),
            )),
        }
    }
}

impl From<SeparationStyle> for i32 {
    fn from(style: SeparationStyle) -> i32 {
        match style {
            SeparationStyle::Monochrome => 0,
            SeparationStyle::Separations => 1,
            SeparationStyle::ColoredSeparations => 2,
            SeparationStyle::Progressives => 3,
            SeparationStyle::Composite => 4,
        }
    }
}

/// Whether the device must always receive a colorant's channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Presence {
    #[serde(alias = "must-be-present")]
    MustBePresent,
    #[default]
    #[serde(alias = "can-be-omitted")]
    CanBeOmitted,
}

// --- Separation Details ---

/// `SeparationDetails` sub-record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct SeparationDetails {
    /// Refusing an automatic separation aborts the job instead of dropping it.
    pub abort: bool,
    pub omit: OmitDetails,
    pub ignore: IgnoreDetails,
    /// Automatic separations may be added at interpretation time.
    pub add: bool,
    /// Separations may be removed at interpretation time.
    pub remove: bool,
}

impl Default for SeparationDetails {
    fn default() -> Self {
        SeparationDetails {
            abort: false,
            omit: OmitDetails::default(),
            ignore: IgnoreDetails::default(),
            add: true,
            remove: true,
        }
    }
}

/// Which blank separations may be dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct OmitDetails {
    /// Omit blank pages of monochrome output.
    pub monochrome: bool,
    /// Omit blank separations of separated output.
    pub separations: bool,
    pub process: bool,
    pub spot: bool,
    /// Named colorants that may always be omitted when blank.
    pub colorants: Vec<String>,
    pub extra_spot: bool,
}

/// Mark kinds that do not count as marks for blank detection.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct IgnoreDetails {
    pub begin_page: bool,
    pub end_page: bool,
    pub image_contents: bool,
    pub super_blacks: bool,
    pub register_marks: bool,
}

// --- Per-Colorant Tables ---

/// One `DefaultScreenAngles` entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ScreenAngleConfig {
    pub angle: f32,
    #[serde(default, rename = "Override")]
    pub override_: bool,
}

/// One `ColorantDetails` entry.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct ColorantDetailConfig {
    pub colorant_type: Option<ColorantType>,
    pub neutral_density: Option<f32>,
    pub special_handling: Option<SpecialHandling>,
}

/// `sRGB` entry: a per-name table, or a boolean meaning "no equivalents".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SrgbConfig {
    NoEquivalents(bool),
    Table(BTreeMap<String, [f32; 3]>),
}

impl Default for SrgbConfig {
    fn default() -> Self {
        SrgbConfig::Table(BTreeMap::new())
    }
}

/// Procedures replacing the default conversions from the three simple
/// input spaces. They are opaque to this crate and only carried through.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CustomConversions {
    #[serde(rename = "DeviceGray")]
    pub gray: Option<String>,
    #[serde(rename = "DeviceRGB")]
    pub rgb: Option<String>,
    #[serde(rename = "DeviceCMYK")]
    pub cmyk: Option<String>,
}

/// Preference ranks used when binding a separation to one of a sheet's
/// channels. Lower wins; `None` disables a rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct ChannelMappingPolicy {
    pub exact_match: Option<u32>,
    pub black: Option<u32>,
    pub gray: Option<u32>,
    pub declared_black: Option<u32>,
    pub first_channel: Option<u32>,
}

impl Default for ChannelMappingPolicy {
    fn default() -> Self {
        ChannelMappingPolicy {
            exact_match: Some(0),
            black: Some(1),
            gray: Some(2),
            declared_black: Some(3),
            first_channel: Some(4),
        }
    }
}

// --- Top-Level Configuration Structure ---

/// The complete rasterstyle configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct RasterStyleConfig {
    pub process_color_model: ProcessColorModel,
    pub calibration_color_model: Option<ProcessColorModel>,
    pub interleaving_style: InterleavingStyle,
    pub values_per_component: u32,
    pub separation_style: SeparationStyle,
    /// Number of process colorants; 0 means "the model's own count".
    pub num_process_colorants: u32,
    pub separation_details: SeparationDetails,
    pub separation_order: Vec<String>,
    /// Declared channel names. An empty name declares an anonymous channel.
    pub color_channels: Vec<String>,
    pub fully_fledged_colorants: BTreeMap<String, u32>,
    pub reserved_colorants: BTreeMap<String, u32>,
    pub default_screen_angles: BTreeMap<String, ScreenAngleConfig>,
    pub custom_conversions: CustomConversions,
    #[serde(rename = "sRGB")]
    pub srgb: SrgbConfig,
    /// Process colorant names; empty means "the model's own names".
    pub process_colorants: Vec<String>,
    pub colorant_presence: BTreeMap<String, Presence>,
    #[serde(rename = "ProcessColorant_Black")]
    pub process_colorant_black: Option<String>,
    pub colorant_details: BTreeMap<String, ColorantDetailConfig>,
    pub object_type_map: Option<Vec<u32>>,
    /// Recipe colorants and the colorants they are made from.
    pub colorant_mappings: BTreeMap<String, Vec<String>>,
    /// Names of the device's photoink colorants.
    pub photoink: Vec<String>,
    /// Band height in device lines; 0 when the device is not banded.
    pub band_height: u32,
    pub channel_mapping: ChannelMappingPolicy,
}

impl Default for RasterStyleConfig {
    fn default() -> Self {
        RasterStyleConfig {
            process_color_model: ProcessColorModel::default(),
            calibration_color_model: None,
            interleaving_style: InterleavingStyle::default(),
            values_per_component: 2,
            separation_style: SeparationStyle::default(),
            num_process_colorants: 0,
            separation_details: SeparationDetails::default(),
            separation_order: Vec::new(),
            color_channels: Vec::new(),
            fully_fledged_colorants: BTreeMap::new(),
            reserved_colorants: BTreeMap::new(),
            default_screen_angles: BTreeMap::new(),
            custom_conversions: CustomConversions::default(),
            srgb: SrgbConfig::default(),
            process_colorants: Vec::new(),
            colorant_presence: BTreeMap::new(),
            process_colorant_black: None,
            colorant_details: BTreeMap::new(),
            object_type_map: None,
            colorant_mappings: BTreeMap::new(),
            photoink: Vec::new(),
            band_height: 0,
            channel_mapping: ChannelMappingPolicy::default(),
        }
    }
}

impl RasterStyleConfig {
    /// Parses a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| RasterStyleError::config(format!("malformed JSON: {}", e)))?;
        if !value.is_object() {
            return Err(RasterStyleError::Type {
                field: "configuration",
                expected: "a dictionary of setup fields",
            });
        }
        serde_json::from_value(value)
            .map_err(|e| RasterStyleError::config(format!("malformed configuration: {}", e)))
    }

    /// Process colorant names, falling back to the model's defaults.
    pub fn effective_process_colorants(&self) -> Vec<String> {
        if self.process_colorants.is_empty() {
            self.process_color_model
                .process_colorants()
                .iter()
                .map(|s| s.to_string())
                .collect()
        } else {
            self.process_colorants.clone()
        }
    }

    /// Declared channel names, falling back to one channel per process
    /// colorant for composite output and a single "Gray" channel otherwise.
    pub fn effective_color_channels(&self) -> Vec<String> {
        if !self.color_channels.is_empty() {
            return self.color_channels.clone();
        }
        if self.separation_style.is_separating() {
            vec!["Gray".to_string()]
        } else {
            self.effective_process_colorants()
        }
    }

    /// Number of sheets the setup compiler will create.
    pub fn sheet_count(&self) -> usize {
        if self.separation_style.is_separating() {
            self.separation_order.len()
        } else {
            1
        }
    }

    /// Checks every cross-field constraint.
    ///
    /// `backdrop` relaxes the multi-channel requirement of band and pixel
    /// interleaving, which backdrop rasterstyles are exempt from.
    pub fn validate(&self, backdrop: bool) -> Result<()> {
        let vpc = self.values_per_component;
        if !VALID_VALUES_PER_COMPONENT.contains(&vpc) {
            return Err(RasterStyleError::range(
                "ValuesPerComponent",
                format!("{} is not one of {:?}", vpc, VALID_VALUES_PER_COMPONENT),
            ));
        }

        if let Some(expected) = self.process_color_model.colorant_count() {
            if self.num_process_colorants != 0 && self.num_process_colorants != expected {
                return Err(RasterStyleError::config(format!(
                    "NumProcessColorants {} does not match {:?} ({} colorants)",
                    self.num_process_colorants, self.process_color_model, expected
                )));
            }
        } else if self.num_process_colorants == 0 && self.process_colorants.is_empty() {
            return Err(RasterStyleError::config(
                "DeviceN requires NumProcessColorants or ProcessColorants",
            ));
        }
        if !self.process_colorants.is_empty()
            && self.num_process_colorants != 0
            && self.process_colorants.len() != self.num_process_colorants as usize
        {
            return Err(RasterStyleError::config(format!(
                "ProcessColorants lists {} names but NumProcessColorants is {}",
                self.process_colorants.len(),
                self.num_process_colorants
            )));
        }

        let channels = self.effective_color_channels();
        if channels.is_empty() {
            return Err(RasterStyleError::config("ColorChannels must not be empty"));
        }

        if self.separation_style == SeparationStyle::Monochrome
            && (channels.len() != 1 || self.separation_order.len() != 1)
        {
            return Err(RasterStyleError::config(
                "monochrome separation style requires exactly one channel and one SeparationOrder entry",
            ));
        }
        if self.separation_style.is_separating() && self.separation_order.is_empty() {
            return Err(RasterStyleError::config(
                "separating styles require a non-empty SeparationOrder",
            ));
        }

        match self.interleaving_style {
            InterleavingStyle::Mono if channels.len() != 1 => {
                return Err(RasterStyleError::config(
                    "monochrome interleaving requires exactly one channel",
                ));
            }
            InterleavingStyle::Pixel if vpc < CONTONE_THRESHOLD => {
                return Err(RasterStyleError::config(
                    "pixel interleaving is incompatible with halftoned output",
                ));
            }
            InterleavingStyle::Pixel | InterleavingStyle::Band
                if channels.len() < 2 && !backdrop =>
            {
                return Err(RasterStyleError::config(
                    "band and pixel interleaving require more than one channel",
                ));
            }
            _ => {}
        }

        if let Some(map) = &self.object_type_map {
            if map.len() != 256 {
                return Err(RasterStyleError::range(
                    "ObjectTypeMap",
                    format!("has {} entries, expected 256", map.len()),
                ));
            }
            if let Some(bad) = map.iter().find(|&&v| v >= vpc) {
                return Err(RasterStyleError::range(
                    "ObjectTypeMap",
                    format!("value {} is not below ValuesPerComponent {}", bad, vpc),
                ));
            }
        }

        for (name, angle) in &self.default_screen_angles {
            if !angle.angle.is_finite() {
                return Err(RasterStyleError::range(
                    "DefaultScreenAngles",
                    format!("angle for '{}' is not finite", name),
                ));
            }
        }

        Ok(())
    }
}
