// src/rasterstyle.rs

//! The rasterstyle: root descriptor of an output color configuration.
//!
//! A rasterstyle owns the sheet/channel/colorant [`Tree`], the two colorant
//! directories, the colorant maps and the omission sets. Device rasterstyles
//! are compiled from configuration by [`crate::setup`]; backdrop rasterstyles
//! (transparency groups, soft masks) are chained onto a parent and resolve
//! their colorants to the real device's through [`Equivalence`] records.
//!
//! Sharing between graphics-state save levels goes through
//! [`RasterStyleHandle`]. Mutation is a caller discipline: only the current
//! graphics state's rasterstyle is ever mutated, and never from two threads.
//! Rendering works on a [`RasterStyle::deep_copy`] so interpretation of the
//! next page can carry on.

mod equivalent;
mod iterate;
mod mapping;
mod omission;
pub mod tree;

pub use equivalent::Equivalence;
pub use iterate::{ColorantDescription, ColorantIter, ColorantWalk, FrameIter};
pub use omission::{MarkKind, OmissionState, OmitIgnore, OmitSnapshot};
pub use tree::{Channel, ChannelId, Colorant, ColorantId, Sheet, SheetId, Tree};

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, trace};

use crate::colorant::{
    ColorantIndex, ColorantInfo, ColorantMap, ColorantSet, ColorantType, ScreenAngle,
    DEFAULT_CMYK, DEFAULT_SCREEN_ANGLES, DEFAULT_SRGB,
};
use crate::config::{
    InterleavingStyle, Presence, ProcessColorModel, RasterStyleConfig, SeparationStyle,
    SrgbConfig,
};
use crate::directory::{ColorantDirectory, IndexAllocator};
use crate::error::{RasterStyleError, Result};
use crate::generation::{Generation, Versioned};

// --- Identity ---

/// Process-local rasterstyle identity. Not stable across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RasterStyleId(u32);

static NEXT_ID: AtomicU32 = AtomicU32::new(1);

impl RasterStyleId {
    /// Takes the next id, failing once the id space is exhausted.
    pub(crate) fn allocate() -> Result<Self> {
        NEXT_ID
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| id.checked_add(1))
            .map(RasterStyleId)
            .map_err(|_| RasterStyleError::Limit("rasterstyle id space exhausted"))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RasterStyleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rs#{}", self.0)
    }
}

/// Whether a rasterstyle describes the real device or a compositing backdrop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleKind {
    Device,
    Backdrop,
}

// --- The Rasterstyle ---

/// Root descriptor of one output color configuration.
#[derive(Debug)]
pub struct RasterStyle {
    pub(crate) id: RasterStyleId,
    pub(crate) kind: StyleKind,
    /// Owning reference to the parent; only backdrops have one.
    pub(crate) parent: Option<RasterStyleHandle>,
    pub(crate) config: Arc<RasterStyleConfig>,

    pub(crate) process_color_model: ProcessColorModel,
    pub(crate) n_process_colorants: u32,
    pub(crate) calibration_color_model: Option<ProcessColorModel>,
    pub(crate) interleaving: InterleavingStyle,
    pub(crate) separation_style: SeparationStyle,
    pub(crate) values_per_component: u32,
    pub(crate) band_height: u32,

    pub(crate) fully_fledged: ColorantDirectory,
    pub(crate) reserved: ColorantDirectory,
    pub(crate) allocator: IndexAllocator,
    pub(crate) colorant_maps: ColorantMap,
    pub(crate) equivalents: Versioned<Vec<Equivalence>>,
    pub(crate) resolver_invocations: u64,

    /// Static policy: colorants that may be omitted when blank.
    pub(crate) colorant_omits: ColorantSet,
    /// Dynamic state: colorants currently detected blank.
    pub(crate) current_omits: ColorantSet,
    /// Colorants that must render regardless of blankness until the next reset.
    pub(crate) kept: ColorantSet,
    /// A render pass has reported marks since the last reset.
    pub(crate) omits_evaluated: bool,
    pub(crate) background_separations: ColorantSet,
    /// Colorants added by automatic separation.
    pub(crate) automatic: ColorantSet,
    pub(crate) ignore: OmitIgnore,

    pub(crate) black_index: ColorantIndex,
    pub(crate) photoink: Vec<ColorantIndex>,

    pub(crate) generation: Generation,
    pub(crate) tree: Tree,
}

impl RasterStyle {
    /// Allocates a rasterstyle header and copies in the scalar configuration.
    ///
    /// The tree is left empty; the setup compiler populates it.
    pub(crate) fn new(
        kind: StyleKind,
        parent: Option<RasterStyleHandle>,
        config: &RasterStyleConfig,
    ) -> Result<Self> {
        let id = RasterStyleId::allocate()?;
        let n_process_colorants = match config.num_process_colorants {
            0 => config.effective_process_colorants().len() as u32,
            n => n,
        };
        trace!("{}: new {:?} rasterstyle", id, kind);
        Ok(RasterStyle {
            id,
            kind,
            parent,
            config: Arc::new(config.clone()),
            process_color_model: config.process_color_model,
            n_process_colorants,
            calibration_color_model: config.calibration_color_model,
            interleaving: config.interleaving_style,
            separation_style: config.separation_style,
            values_per_component: config.values_per_component,
            band_height: config.band_height,
            fully_fledged: ColorantDirectory::new(),
            reserved: ColorantDirectory::new(),
            allocator: IndexAllocator::default(),
            colorant_maps: ColorantMap::new(),
            equivalents: Versioned::new(),
            resolver_invocations: 0,
            colorant_omits: ColorantSet::new(),
            current_omits: ColorantSet::new(),
            kept: ColorantSet::new(),
            omits_evaluated: false,
            background_separations: ColorantSet::new(),
            automatic: ColorantSet::new(),
            ignore: OmitIgnore::from_details(&config.separation_details.ignore),
            black_index: ColorantIndex::UNKNOWN,
            photoink: Vec::new(),
            generation: Generation::INITIAL,
            tree: Tree::new(),
        })
    }

    // --- Accessors ---

    pub fn id(&self) -> RasterStyleId {
        self.id
    }

    pub fn kind(&self) -> StyleKind {
        self.kind
    }

    pub fn is_backdrop(&self) -> bool {
        self.kind == StyleKind::Backdrop
    }

    pub fn parent(&self) -> Option<&RasterStyleHandle> {
        self.parent.as_ref()
    }

    pub fn process_color_model(&self) -> ProcessColorModel {
        self.process_color_model
    }

    /// The calibration model if overridden, else the process model.
    pub fn calibration_color_model(&self) -> ProcessColorModel {
        self.calibration_color_model
            .unwrap_or(self.process_color_model)
    }

    pub fn process_colorant_count(&self) -> u32 {
        self.n_process_colorants
    }

    pub fn interleaving_style(&self) -> InterleavingStyle {
        self.interleaving
    }

    pub fn separation_style(&self) -> SeparationStyle {
        self.separation_style
    }

    pub fn values_per_component(&self) -> u32 {
        self.values_per_component
    }

    pub fn band_height(&self) -> u32 {
        self.band_height
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn fully_fledged(&self) -> &ColorantDirectory {
        &self.fully_fledged
    }

    pub fn reserved(&self) -> &ColorantDirectory {
        &self.reserved
    }

    pub fn black_index(&self) -> ColorantIndex {
        self.black_index
    }

    pub fn photoink_indices(&self) -> &[ColorantIndex] {
        &self.photoink
    }

    pub fn object_type_map(&self) -> Option<&[u32]> {
        self.config.object_type_map.as_deref()
    }

    pub fn custom_conversions(&self) -> &crate::config::CustomConversions {
        &self.config.custom_conversions
    }

    pub fn colorant_omits(&self) -> &ColorantSet {
        &self.colorant_omits
    }

    pub fn current_omits(&self) -> &ColorantSet {
        &self.current_omits
    }

    /// Number of times an equivalent colorant had to be derived.
    pub fn equivalent_resolutions(&self) -> u64 {
        self.resolver_invocations
    }

    /// Number of distinct real colorants bound into the tree.
    pub fn colorant_count(&self) -> usize {
        let set: ColorantSet = self
            .tree
            .all_colorants()
            .map(|(_, c)| c.info.index)
            .collect();
        set.len()
    }

    /// Records a change to colorants; derived caches become stale.
    pub(crate) fn bump_generation(&mut self) {
        self.generation.bump();
        self.equivalents.invalidate();
        trace!("{}: generation now {}", self.id, self.generation);
    }

    /// Sets the band height and re-derives every colorant's band.
    pub fn set_band_height(&mut self, band_height: u32) {
        self.band_height = band_height;
        let ids: Vec<ColorantId> = self.tree.all_colorants().map(|(id, _)| id).collect();
        for id in ids {
            if let Some(c) = self.tree.colorant_mut(id) {
                c.info.offset_band = band_of(c.info.offset_y, band_height);
            }
        }
    }

    /// Moves a colorant within its channel.
    pub fn set_colorant_offset(&mut self, colorant: ColorantId, x: i32, y: i32) {
        let band_height = self.band_height;
        if let Some(c) = self.tree.colorant_mut(colorant) {
            c.info.offset_x = x;
            c.info.offset_y = y;
            c.info.offset_band = band_of(y, band_height);
        }
        self.tree.reorder_colorant(colorant);
    }

    /// Fills in the sRGB equivalent of every colorant carrying `index`.
    pub fn set_colorant_srgb(&mut self, index: ColorantIndex, rgb: [f32; 3]) {
        for id in self.tree.colorants_with_index(index) {
            if let Some(c) = self.tree.colorant_mut(id) {
                c.info.srgb = Some(rgb);
            }
        }
    }

    /// Fills in the CMYK equivalent of every colorant carrying `index`.
    pub fn set_colorant_cmyk(&mut self, index: ColorantIndex, cmyk: [f32; 4]) {
        for id in self.tree.colorants_with_index(index) {
            if let Some(c) = self.tree.colorant_mut(id) {
                c.info.cmyk = Some(cmyk);
            }
        }
    }

    // --- Per-Name Attribute Resolution ---

    /// Builds the full description of a newly bound colorant from the
    /// per-name lookup tables.
    pub(crate) fn colorant_info_for(&self, index: ColorantIndex, name: &str) -> ColorantInfo {
        if !index.is_real() {
            return ColorantInfo::none();
        }
        let details = self.config.colorant_details.get(name);
        let mut info = ColorantInfo::new(index, self.colorant_type_for(name), name);

        info.screen_angle = match self.config.default_screen_angles.get(name) {
            Some(sa) => ScreenAngle {
                angle: sa.angle,
                overrides: sa.override_,
            },
            None => ScreenAngle {
                angle: DEFAULT_SCREEN_ANGLES
                    .get(name)
                    .copied()
                    .unwrap_or(ScreenAngle::default().angle),
                overrides: false,
            },
        };
        if let Some(d) = details {
            info.neutral_density = d.neutral_density;
            info.special_handling = d.special_handling.unwrap_or_default();
        }
        info.srgb = match &self.config.srgb {
            SrgbConfig::NoEquivalents(_) => None,
            SrgbConfig::Table(table) => table
                .get(name)
                .copied()
                .or_else(|| DEFAULT_SRGB.get(name).copied()),
        };
        info.cmyk = DEFAULT_CMYK.get(name).copied();
        info
    }

    /// Colorant type from `ColorantDetails`, else process/spot by name.
    pub(crate) fn colorant_type_for(&self, name: &str) -> ColorantType {
        if let Some(ty) = self
            .config
            .colorant_details
            .get(name)
            .and_then(|d| d.colorant_type)
            .filter(|ty| ty.is_real())
        {
            return ty;
        }
        if self.is_process_name(name) {
            ColorantType::Process
        } else {
            ColorantType::Spot
        }
    }

    pub(crate) fn is_process_name(&self, name: &str) -> bool {
        self.config
            .effective_process_colorants()
            .iter()
            .any(|p| p == name)
    }

    pub(crate) fn presence_of(&self, name: &str) -> Presence {
        self.config
            .colorant_presence
            .get(name)
            .copied()
            .unwrap_or_default()
    }

    // --- Copying ---

    /// Deep copy for rendering.
    ///
    /// The copy gets a new id but keeps the generation, so version-stamped
    /// caches stay valid. The parent chain is copied as well.
    pub fn deep_copy(&self) -> Result<RasterStyle> {
        let parent = match &self.parent {
            Some(p) => Some(RasterStyleHandle::new(p.read().deep_copy()?)),
            None => None,
        };
        let id = RasterStyleId::allocate()?;
        debug!("{}: deep copy as {}", self.id, id);
        Ok(RasterStyle {
            id,
            kind: self.kind,
            parent,
            config: Arc::new((*self.config).clone()),
            process_color_model: self.process_color_model,
            n_process_colorants: self.n_process_colorants,
            calibration_color_model: self.calibration_color_model,
            interleaving: self.interleaving,
            separation_style: self.separation_style,
            values_per_component: self.values_per_component,
            band_height: self.band_height,
            fully_fledged: self.fully_fledged.clone(),
            reserved: self.reserved.clone(),
            allocator: self.allocator.clone(),
            colorant_maps: self.colorant_maps.clone(),
            equivalents: self.equivalents.clone(),
            resolver_invocations: 0,
            colorant_omits: self.colorant_omits.clone(),
            current_omits: self.current_omits.clone(),
            kept: self.kept.clone(),
            omits_evaluated: self.omits_evaluated,
            background_separations: self.background_separations.clone(),
            automatic: self.automatic.clone(),
            ignore: self.ignore,
            black_index: self.black_index,
            photoink: self.photoink.clone(),
            generation: self.generation,
            tree: self.tree.clone(),
        })
    }
}

fn band_of(offset_y: i32, band_height: u32) -> i32 {
    match i32::try_from(band_height) {
        Ok(h) if h > 0 => offset_y.div_euclid(h),
        _ => 0,
    }
}

// --- Shared Handle ---

/// Shared-ownership handle to a rasterstyle.
///
/// Cloning the handle adds a reference; dropping the last handle releases
/// the rasterstyle and, through its parent handle, one reference to the
/// parent.
#[derive(Debug, Clone)]
pub struct RasterStyleHandle(Arc<RwLock<RasterStyle>>);

impl RasterStyleHandle {
    pub fn new(rasterstyle: RasterStyle) -> Self {
        RasterStyleHandle(Arc::new(RwLock::new(rasterstyle)))
    }

    /// Shared access. Must not be held across a call that resolves
    /// equivalents on a descendant backdrop.
    pub fn read(&self) -> RwLockReadGuard<'_, RasterStyle> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access for mutation.
    pub fn write(&self) -> RwLockWriteGuard<'_, RasterStyle> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of live handles to this rasterstyle.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    pub fn ptr_eq(&self, other: &RasterStyleHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Deep copy into an independent handle for rendering.
    pub fn deep_copy(&self) -> Result<RasterStyleHandle> {
        Ok(RasterStyleHandle::new(self.read().deep_copy()?))
    }
}

#[cfg(test)]
mod tests;
