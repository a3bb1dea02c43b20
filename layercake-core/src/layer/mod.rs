//! # Layers
//!
//! A layer is an item with pixels, a blend mode and opacity, and optionally a mask. Group layers
//! are layers whose pixels are the projection of their children, see [`group`].

pub mod group;

use std::sync::Arc;

pub use group::GroupLayer;

use crate::blend::{clamp_opacity, Blend, LayerMode};
use crate::buffer::{Buffer, BufferError, Format};
use crate::channel::Channel;
use crate::color::Color;
use crate::id::ItemId;
use crate::item::{Item, ItemKind, ItemTree, TreeItem};
use crate::util::Rect;

/// Initial contents of a new layer mask.
#[derive(
    strum::AsRefStr,
    strum::EnumString,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Debug,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum MaskInit {
    /// Everything shows.
    White,
    /// Everything hidden.
    Black,
    /// Copy of the layer's alpha.
    Alpha,
}

#[derive(Clone, Debug)]
pub struct Layer {
    pub(crate) item: Item,
    pub(crate) buffer: Arc<Buffer>,
    blend: Blend,
    lock_alpha: bool,
    pub(crate) mask: Option<Channel>,
    apply_mask: bool,
    show_mask: bool,
    pub(crate) group: Option<GroupLayer>,
}
impl Layer {
    /// A transparent layer covering the item's rectangle.
    pub fn new(item: Item, format: Format) -> Result<Self, BufferError> {
        let buffer = Buffer::new(item.width(), item.height(), format)?;
        Ok(Self::from_parts(item, Arc::new(buffer), None))
    }
    /// A layer showing `buffer`, resized to match it.
    #[must_use]
    pub fn from_buffer(mut item: Item, buffer: Arc<Buffer>) -> Self {
        let [x, y] = item.offset();
        item.set_rect(Rect::new(x, y, buffer.width(), buffer.height()));
        Self::from_parts(item, buffer, None)
    }
    /// An empty group. Its pixels are sized by its children once it has some.
    pub fn new_group(mut item: Item, format: Format) -> Result<Self, BufferError> {
        item.set_rect(Rect::new(0, 0, 1, 1));
        let buffer = Buffer::new(1, 1, format.with_alpha())?;
        Ok(Self::from_parts(
            item,
            Arc::new(buffer),
            Some(GroupLayer::default()),
        ))
    }
    fn from_parts(item: Item, buffer: Arc<Buffer>, group: Option<GroupLayer>) -> Self {
        Self {
            item,
            buffer,
            blend: Blend::default(),
            lock_alpha: false,
            mask: None,
            apply_mask: true,
            show_mask: false,
            group,
        }
    }
    /// A copy of a leaf layer under a new identity, sharing pixels until either side writes.
    /// Groups keep their state but not their children; duplicating those is the image's job.
    #[must_use]
    pub fn duplicate(&self, item: Item, mask_item: Option<Item>) -> Self {
        Self {
            item,
            buffer: self.buffer.clone(),
            blend: self.blend,
            lock_alpha: self.lock_alpha,
            mask: self
                .mask
                .as_ref()
                .zip(mask_item)
                .map(|(mask, item)| mask.duplicate(item)),
            apply_mask: self.apply_mask,
            show_mask: self.show_mask,
            group: self.group.as_ref().map(GroupLayer::duplicate),
        }
    }

    #[must_use]
    pub fn buffer(&self) -> &Arc<Buffer> {
        &self.buffer
    }
    #[must_use]
    pub fn format(&self) -> Format {
        self.buffer.format()
    }
    #[must_use]
    pub fn has_alpha(&self) -> bool {
        self.buffer.format().has_alpha
    }
    #[must_use]
    pub fn blend(&self) -> Blend {
        self.blend
    }
    #[must_use]
    pub fn mode(&self) -> LayerMode {
        self.blend.mode
    }
    #[must_use]
    pub fn opacity(&self) -> f32 {
        self.blend.opacity
    }
    #[must_use]
    pub fn lock_alpha(&self) -> bool {
        self.lock_alpha
    }
    #[must_use]
    pub fn mask(&self) -> Option<&Channel> {
        self.mask.as_ref()
    }
    #[must_use]
    pub fn apply_mask(&self) -> bool {
        self.apply_mask
    }
    #[must_use]
    pub fn show_mask(&self) -> bool {
        self.show_mask
    }
    #[must_use]
    pub fn group(&self) -> Option<&GroupLayer> {
        self.group.as_ref()
    }
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.group.is_some()
    }

    pub(crate) fn set_mode(&mut self, mode: LayerMode) {
        self.blend.mode = mode;
    }
    pub(crate) fn set_opacity(&mut self, opacity: f32) {
        self.blend.opacity = clamp_opacity(opacity);
    }
    pub(crate) fn set_lock_alpha(&mut self, lock: bool) {
        self.lock_alpha = lock;
    }
    pub(crate) fn set_apply_mask(&mut self, apply: bool) {
        self.apply_mask = apply;
    }
    pub(crate) fn set_show_mask(&mut self, show: bool) {
        self.show_mask = show;
    }
    pub(crate) fn buffer_mut(&mut self) -> &mut Buffer {
        Arc::make_mut(&mut self.buffer)
    }
    /// Replace the pixels wholesale, moving and resizing the item to match.
    pub(crate) fn set_buffer(&mut self, buffer: Arc<Buffer>, offset: [i32; 2]) {
        self.item
            .set_rect(Rect::new(offset[0], offset[1], buffer.width(), buffer.height()));
        self.buffer = buffer;
    }
    /// Swap in a mask, handing back the previous one. The mask is moved onto the layer.
    pub(crate) fn replace_mask(&mut self, mut mask: Option<Channel>) -> Option<Channel> {
        if let Some(mask) = &mut mask {
            let rect = self.item.rect();
            mask.item.set_offset(rect.offset());
            mask.item.set_attached(self.item.is_attached());
        }
        if let Some(old) = &mut self.mask {
            old.item.set_attached(false);
        }
        std::mem::replace(&mut self.mask, mask)
    }

    /// Pixels for a new mask for this layer.
    pub fn mask_pixels(&self, init: MaskInit) -> Result<Buffer, BufferError> {
        let format = Format::mask(self.format().precision);
        let mut pixels = Buffer::new(self.item.width(), self.item.height(), format)?;
        match init {
            MaskInit::White => pixels.set_color(pixels.extent(), Color::WHITE),
            MaskInit::Black => (),
            MaskInit::Alpha => {
                for y in 0..pixels.height() {
                    for x in 0..pixels.width() {
                        let alpha = self.buffer.get(x, y).map_or(0.0, |[.., a]| a);
                        pixels.put(x, y, [alpha, alpha, alpha, 1.0]);
                    }
                }
            }
        }
        Ok(pixels)
    }
    /// Effective pixels with the mask multiplied into them.
    pub(crate) fn masked_pixels(&self) -> Buffer {
        let mut pixels = (*self.buffer).clone();
        if let Some(mask) = &self.mask {
            for y in 0..pixels.height() {
                for x in 0..pixels.width() {
                    let [ox, oy] = self.item.offset();
                    let coverage = mask.value(x + ox, y + oy);
                    if let Some(pixel) = pixels.get(x, y) {
                        pixels.put(x, y, pixel.map(|c| c * coverage));
                    }
                }
            }
        }
        pixels
    }
}

impl TreeItem for Layer {
    const KIND: ItemKind = ItemKind::Layer;
    fn item(&self) -> &Item {
        &self.item
    }
    fn item_mut(&mut self) -> &mut Item {
        &mut self.item
    }
    fn is_container(&self) -> bool {
        self.group.is_some()
    }
    fn children_changed(tree: &mut ItemTree<Self>, parent: ItemId) {
        tree.update_group(parent);
    }
}
