//! # Undo
//!
//! Every reversible mutation pushes an [`Undo`] record onto its image's history *before* it
//! mutates anything. A record holds just enough state to swap the live state back: popping it
//! exchanges the stored payload with the current state, so the same record is immediately valid
//! for popping in the opposite direction. Undo and redo are therefore the same operation with a
//! different [`UndoMode`].
//!
//! Grouped records ([`UndoType::is_group`]) contain a nested [`UndoStack`] and pop as one unit.
//! Side effects that only need to happen once per pop cycle are collected in an
//! [`UndoAccumulator`] and applied by the image when the whole pop is done.

pub mod stack;

use std::sync::Arc;

pub use stack::UndoStack;

use crate::blend::LayerMode;
use crate::buffer::{BaseType, Buffer, Format, Precision};
use crate::channel::Channel;
use crate::color::Color;
use crate::dirty::DirtyMask;
use crate::guide::{Grid, Orientation};
use crate::id::{GuideId, ItemId, SamplePointId};
use crate::item::{ItemKind, Parasite};
use crate::util::Rect;
use crate::vectors::Stroke;

#[derive(strum::AsRefStr, Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum UndoMode {
    Undo,
    Redo,
}

/// Every kind of undo step. Group types bracket a sequence of leaf steps.
#[derive(strum::AsRefStr, strum::EnumIter, Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum UndoType {
    GroupImageResize,
    GroupImageConvert,
    GroupImageLayersMerge,
    GroupImageVectorsMerge,
    GroupImageGrid,
    GroupGuide,
    GroupDrawableMod,
    GroupMask,
    GroupItemVisibility,
    GroupItemLinked,
    GroupItemProperties,
    GroupItemDisplace,
    GroupLayerAddMask,
    GroupLayerApplyMask,
    GroupPaint,
    GroupParasiteAttach,
    GroupParasiteRemove,
    GroupMisc,

    ImageType,
    ImagePrecision,
    ImageSize,
    ImageResolution,
    ImageGrid,
    Guide,
    SamplePoint,
    Drawable,
    DrawableMod,
    Mask,
    ItemReorder,
    ItemRename,
    ItemDisplace,
    ItemVisibility,
    ItemLinked,
    ItemLockContent,
    ItemLockPosition,
    LayerAdd,
    LayerRemove,
    LayerMode,
    LayerOpacity,
    LayerLockAlpha,
    GroupLayerSuspend,
    GroupLayerResume,
    GroupLayerConvert,
    LayerMaskAdd,
    LayerMaskRemove,
    LayerMaskApply,
    LayerMaskShow,
    ChannelAdd,
    ChannelRemove,
    ChannelColor,
    VectorsAdd,
    VectorsRemove,
    VectorsMod,
    ParasiteAttach,
    ParasiteRemove,
    Cant,
}
impl UndoType {
    #[must_use]
    pub fn is_group(self) -> bool {
        matches!(
            self,
            Self::GroupImageResize
                | Self::GroupImageConvert
                | Self::GroupImageLayersMerge
                | Self::GroupImageVectorsMerge
                | Self::GroupImageGrid
                | Self::GroupGuide
                | Self::GroupDrawableMod
                | Self::GroupMask
                | Self::GroupItemVisibility
                | Self::GroupItemLinked
                | Self::GroupItemProperties
                | Self::GroupItemDisplace
                | Self::GroupLayerAddMask
                | Self::GroupLayerApplyMask
                | Self::GroupPaint
                | Self::GroupParasiteAttach
                | Self::GroupParasiteRemove
                | Self::GroupMisc
        )
    }
    /// Weak steps are undone along with the step below them by a strong undo.
    #[must_use]
    pub fn is_weak(self) -> bool {
        matches!(
            self,
            Self::GroupItemVisibility
                | Self::GroupItemProperties
                | Self::GroupLayerApplyMask
                | Self::ItemVisibility
                | Self::LayerMode
                | Self::LayerOpacity
                | Self::LayerMaskApply
                | Self::LayerMaskShow
        )
    }
    /// Default human readable name of a step.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::GroupImageResize => "Resize image",
            Self::GroupImageConvert => "Convert image",
            Self::GroupImageLayersMerge => "Merge layers",
            Self::GroupImageVectorsMerge => "Merge paths",
            Self::GroupImageGrid => "Grid",
            Self::GroupGuide => "Guide",
            Self::GroupDrawableMod => "Layer/Channel modification",
            Self::GroupMask => "Selection mask",
            Self::GroupItemVisibility => "Item visibility",
            Self::GroupItemLinked => "Link/Unlink item",
            Self::GroupItemProperties => "Item properties",
            Self::GroupItemDisplace => "Move item",
            Self::GroupLayerAddMask => "Add layer mask",
            Self::GroupLayerApplyMask => "Apply layer mask",
            Self::GroupPaint => "Paint",
            Self::GroupParasiteAttach => "Attach parasite",
            Self::GroupParasiteRemove => "Remove parasite",
            Self::GroupMisc => "Miscellaneous",
            Self::ImageType => "Image type",
            Self::ImagePrecision => "Image precision",
            Self::ImageSize => "Image size",
            Self::ImageResolution => "Image resolution change",
            Self::ImageGrid => "Grid",
            Self::Guide => "Guide",
            Self::SamplePoint => "Sample Point",
            Self::Drawable => "Layer/Channel",
            Self::DrawableMod => "Layer/Channel modification",
            Self::Mask => "Selection mask",
            Self::ItemReorder => "Reorder item",
            Self::ItemRename => "Rename item",
            Self::ItemDisplace => "Move item",
            Self::ItemVisibility => "Item visibility",
            Self::ItemLinked => "Link/Unlink item",
            Self::ItemLockContent => "Lock/Unlock content",
            Self::ItemLockPosition => "Lock/Unlock position",
            Self::LayerAdd => "New layer",
            Self::LayerRemove => "Delete layer",
            Self::LayerMode => "Set layer mode",
            Self::LayerOpacity => "Set layer opacity",
            Self::LayerLockAlpha => "Lock/Unlock alpha channel",
            Self::GroupLayerSuspend => "Suspend group layer resize",
            Self::GroupLayerResume => "Resume group layer resize",
            Self::GroupLayerConvert => "Convert group layer",
            Self::LayerMaskAdd => "Add layer mask",
            Self::LayerMaskRemove => "Delete layer mask",
            Self::LayerMaskApply => "Apply layer mask",
            Self::LayerMaskShow => "Show layer mask",
            Self::ChannelAdd => "New channel",
            Self::ChannelRemove => "Delete channel",
            Self::ChannelColor => "Channel color",
            Self::VectorsAdd => "New path",
            Self::VectorsRemove => "Delete path",
            Self::VectorsMod => "Path modification",
            Self::ParasiteAttach => "Attach parasite",
            Self::ParasiteRemove => "Remove parasite",
            Self::Cant => "Not undoable",
        }
    }
    /// What a step of this type invalidates, unless the push says otherwise.
    #[must_use]
    pub fn dirty_mask(self) -> DirtyMask {
        use DirtyMask as D;
        match self {
            Self::GroupImageResize => D::IMAGE | D::IMAGE_SIZE,
            Self::GroupImageConvert => D::IMAGE | D::DRAWABLE,
            Self::GroupImageLayersMerge => D::IMAGE_STRUCTURE | D::DRAWABLE,
            Self::GroupImageVectorsMerge => D::IMAGE_STRUCTURE | D::VECTORS,
            Self::GroupImageGrid | Self::GroupGuide => D::IMAGE_META,
            Self::GroupDrawableMod | Self::GroupPaint => D::ITEM | D::DRAWABLE,
            Self::GroupMask => D::SELECTION,
            Self::GroupItemVisibility | Self::GroupItemLinked | Self::GroupItemProperties => {
                D::ITEM_META
            }
            Self::GroupItemDisplace => D::ITEM | D::DRAWABLE | D::VECTORS,
            Self::GroupLayerAddMask | Self::GroupLayerApplyMask => D::IMAGE_STRUCTURE,
            Self::GroupParasiteAttach | Self::GroupParasiteRemove => D::IMAGE_META | D::ITEM_META,
            Self::GroupMisc | Self::Cant => D::ALL,

            Self::ImageType | Self::ImagePrecision => D::IMAGE,
            Self::ImageSize => D::IMAGE | D::IMAGE_SIZE,
            Self::ImageResolution
            | Self::ImageGrid
            | Self::Guide
            | Self::SamplePoint
            | Self::ParasiteAttach
            | Self::ParasiteRemove => D::IMAGE_META,
            Self::Drawable
            | Self::DrawableMod
            | Self::GroupLayerSuspend
            | Self::GroupLayerResume
            | Self::GroupLayerConvert
            | Self::LayerMaskApply => D::ITEM | D::DRAWABLE,
            Self::Mask => D::SELECTION,
            Self::ItemReorder
            | Self::LayerAdd
            | Self::LayerRemove
            | Self::LayerMaskAdd
            | Self::LayerMaskRemove
            | Self::ChannelAdd
            | Self::ChannelRemove
            | Self::VectorsAdd
            | Self::VectorsRemove => D::IMAGE_STRUCTURE,
            Self::ItemRename
            | Self::ItemVisibility
            | Self::ItemLinked
            | Self::ItemLockContent
            | Self::ItemLockPosition
            | Self::LayerMode
            | Self::LayerOpacity
            | Self::LayerLockAlpha
            | Self::LayerMaskShow
            | Self::ChannelColor => D::ITEM_META,
            Self::ItemDisplace => D::ITEM,
            Self::VectorsMod => D::ITEM | D::VECTORS,
        }
    }
    /// For add/remove pairs, whether this is the adding half.
    pub(crate) fn is_add(self) -> bool {
        matches!(
            self,
            Self::LayerAdd | Self::ChannelAdd | Self::VectorsAdd | Self::LayerMaskAdd
        )
    }
}

/// Payload of a step. Each variant holds the state to swap back in.
#[derive(Debug)]
pub(crate) enum UndoKind {
    Group(UndoStack),
    Cant,

    ImageType {
        base_type: BaseType,
    },
    ImagePrecision {
        precision: Precision,
    },
    ImageSize {
        width: i32,
        height: i32,
        /// Where the other size's origin lies in this size's coordinates.
        previous_origin: [i32; 2],
    },
    ImageResolution {
        resolution: [f64; 2],
    },
    ImageGrid {
        grid: Option<Grid>,
    },
    Guide {
        guide: GuideId,
        orientation: Orientation,
        /// `None` while the guide is not on the image.
        position: Option<i32>,
    },
    SamplePoint {
        point: SamplePointId,
        position: Option<[i32; 2]>,
    },

    /// A region of a drawable's pixels, in drawable coordinates.
    Drawable {
        drawable: ItemId,
        pixels: Buffer,
        origin: [i32; 2],
    },
    /// A drawable's whole buffer and offset.
    DrawableMod {
        drawable: ItemId,
        buffer: Arc<Buffer>,
        offset: [i32; 2],
    },
    /// The nonzero part of a mask, in image coordinates.
    Mask {
        channel: ItemId,
        bounds: Option<Rect>,
        pixels: Option<Buffer>,
        /// Set when the step also swaps the mask's format.
        format: Option<Format>,
    },

    ItemReorder {
        item: ItemId,
        parent: Option<ItemId>,
        index: usize,
    },
    ItemRename {
        item: ItemId,
        name: String,
    },
    ItemDisplace {
        item: ItemId,
        offset: [i32; 2],
    },
    /// Visibility, linked and lock flags, by undo type.
    ItemFlag {
        item: ItemId,
        value: bool,
    },
    /// Layer, channel and path add/remove, by undo type.
    ItemAddRemove {
        kind: ItemKind,
        item: ItemId,
        parent: Option<ItemId>,
        index: usize,
        prev_active: Option<ItemId>,
    },

    LayerMode {
        layer: ItemId,
        mode: LayerMode,
    },
    LayerOpacity {
        layer: ItemId,
        opacity: f32,
    },
    /// Alpha lock, apply-mask and show-mask flags, by undo type.
    LayerFlag {
        layer: ItemId,
        value: bool,
    },
    GroupResize {
        group: ItemId,
    },
    GroupConvert {
        group: ItemId,
        format: Format,
    },
    LayerMask {
        layer: ItemId,
        /// Held while the mask is not on the layer.
        mask: Option<Channel>,
    },

    ChannelColor {
        channel: ItemId,
        color: Color,
    },
    VectorsMod {
        vectors: ItemId,
        strokes: Vec<Stroke>,
    },
    Parasite {
        /// `None` for image parasites.
        item: Option<ItemId>,
        name: String,
        parasite: Option<Parasite>,
    },
}

/// One step of history.
#[derive(Debug)]
pub struct Undo {
    pub(crate) ty: UndoType,
    pub(crate) name: String,
    pub(crate) dirty_mask: DirtyMask,
    time: chrono::DateTime<chrono::Utc>,
    pub(crate) kind: UndoKind,
}
impl Undo {
    pub(crate) fn new(ty: UndoType, name: Option<&str>, kind: UndoKind) -> Self {
        Self {
            ty,
            name: name.unwrap_or(ty.description()).to_owned(),
            dirty_mask: ty.dirty_mask(),
            time: chrono::Utc::now(),
            kind,
        }
    }
    pub(crate) fn group(ty: UndoType, name: Option<&str>) -> Self {
        Self::new(ty, name, UndoKind::Group(UndoStack::default()))
    }
    #[must_use]
    pub(crate) fn with_dirty_mask(self, dirty_mask: DirtyMask) -> Self {
        Self { dirty_mask, ..self }
    }
    #[must_use]
    pub fn ty(&self) -> UndoType {
        self.ty
    }
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    #[must_use]
    pub fn dirty_mask(&self) -> DirtyMask {
        self.dirty_mask
    }
    /// When the step was recorded.
    #[must_use]
    pub fn time(&self) -> chrono::DateTime<chrono::Utc> {
        self.time
    }
    #[must_use]
    pub fn is_weak(&self) -> bool {
        self.ty.is_weak()
    }
    /// Steps inside a group, oldest first.
    #[must_use]
    pub fn children(&self) -> Option<&UndoStack> {
        match &self.kind {
            UndoKind::Group(stack) => Some(stack),
            _ => None,
        }
    }
    pub(crate) fn children_mut(&mut self) -> Option<&mut UndoStack> {
        match &mut self.kind {
            UndoKind::Group(stack) => Some(stack),
            _ => None,
        }
    }
    /// The item this step is about, if any.
    #[must_use]
    pub fn target(&self) -> Option<ItemId> {
        match &self.kind {
            UndoKind::Drawable { drawable, .. } | UndoKind::DrawableMod { drawable, .. } => {
                Some(*drawable)
            }
            UndoKind::Mask { channel, .. } | UndoKind::ChannelColor { channel, .. } => {
                Some(*channel)
            }
            UndoKind::ItemReorder { item, .. }
            | UndoKind::ItemRename { item, .. }
            | UndoKind::ItemDisplace { item, .. }
            | UndoKind::ItemFlag { item, .. }
            | UndoKind::ItemAddRemove { item, .. } => Some(*item),
            UndoKind::LayerMode { layer, .. }
            | UndoKind::LayerOpacity { layer, .. }
            | UndoKind::LayerFlag { layer, .. }
            | UndoKind::LayerMask { layer, .. } => Some(*layer),
            UndoKind::GroupResize { group } | UndoKind::GroupConvert { group, .. } => Some(*group),
            UndoKind::VectorsMod { vectors, .. } => Some(*vectors),
            UndoKind::Parasite { item, .. } => *item,
            UndoKind::Group(_)
            | UndoKind::Cant
            | UndoKind::ImageType { .. }
            | UndoKind::ImagePrecision { .. }
            | UndoKind::ImageSize { .. }
            | UndoKind::ImageResolution { .. }
            | UndoKind::ImageGrid { .. }
            | UndoKind::Guide { .. }
            | UndoKind::SamplePoint { .. } => None,
        }
    }
    /// Bytes held by this step. `detached` reports the size of an item kept alive only by
    /// history.
    pub(crate) fn memsize(&self, detached: &dyn Fn(ItemKind, ItemId) -> u64) -> u64 {
        let payload = match &self.kind {
            UndoKind::Group(stack) => stack.iter().map(|undo| undo.memsize(detached)).sum(),
            UndoKind::Drawable { pixels, .. } => pixels.memsize(),
            UndoKind::DrawableMod { buffer, .. } => buffer.memsize(),
            UndoKind::Mask { pixels, .. } => pixels.as_ref().map_or(0, Buffer::memsize),
            UndoKind::ItemRename { name, .. } => name.len() as u64,
            UndoKind::ItemAddRemove { kind, item, .. } => detached(*kind, *item),
            UndoKind::LayerMask { mask, .. } => mask.as_ref().map_or(0, |m| m.buffer().memsize()),
            UndoKind::VectorsMod { strokes, .. } => strokes
                .iter()
                .map(|s| (s.anchors.len() * std::mem::size_of::<[f64; 2]>()) as u64)
                .sum(),
            UndoKind::Parasite { name, parasite, .. } => {
                (name.len() + parasite.as_ref().map_or(0, |p| p.data().len())) as u64
            }
            _ => 0,
        };
        std::mem::size_of::<Self>() as u64 + self.name.len() as u64 + payload
    }
}

/// Size change collected during a pop.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct SizeChange {
    pub previous_origin: [i32; 2],
    pub previous_size: [i32; 2],
}

/// Effects of a pop that are applied once it is complete.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct UndoAccumulator {
    pub mode_changed: bool,
    pub precision_changed: bool,
    pub size_changed: Option<SizeChange>,
    pub resolution_changed: bool,
    /// The drawable a fadeable paint step just restored.
    pub fadeable: Option<ItemId>,
}
