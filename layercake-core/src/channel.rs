//! # Channels
//!
//! Single component pixel masks. The same type serves as a free-standing channel in the channel
//! tree, as the image's selection mask, and as a layer mask. Mask values live in the first color
//! component of a gray, alpha-less buffer.

use std::cell::Cell;
use std::sync::Arc;

use crate::buffer::{Buffer, BufferError, Format, Precision};
use crate::color::Color;
use crate::item::{Item, ItemKind, TreeItem};
use crate::util::Rect;

/// Cached bounds of the nonzero area, in image coordinates.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum BoundsCache {
    #[default]
    Unknown,
    Empty,
    Known(Rect),
}
impl From<Option<Rect>> for BoundsCache {
    fn from(value: Option<Rect>) -> Self {
        value.map_or(Self::Empty, Self::Known)
    }
}

/// How a new shape combines with the existing mask.
#[derive(
    strum::AsRefStr,
    strum::EnumString,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Debug,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum ChannelOp {
    #[default]
    Replace,
    Add,
    Subtract,
    Intersect,
}

#[derive(Clone, Debug)]
pub struct Channel {
    pub(crate) item: Item,
    pub(crate) buffer: Arc<Buffer>,
    color: Color,
    show_masked: bool,
    bounds: Cell<BoundsCache>,
}
impl Channel {
    /// An empty channel covering the item's rectangle.
    pub fn new(item: Item, precision: Precision, color: Color) -> Result<Self, BufferError> {
        let buffer = Buffer::new(item.width(), item.height(), Format::mask(precision))?;
        Ok(Self {
            item,
            buffer: Arc::new(buffer),
            color,
            show_masked: false,
            bounds: Cell::new(BoundsCache::Empty),
        })
    }
    /// Wrap existing pixels. The buffer is converted to a mask format if needed.
    pub fn from_buffer(mut item: Item, buffer: &Buffer, color: Color) -> Result<Self, BufferError> {
        let buffer = buffer.convert(Format::mask(buffer.format().precision))?;
        item.set_rect(Rect::new(
            item.offset()[0],
            item.offset()[1],
            buffer.width(),
            buffer.height(),
        ));
        Ok(Self {
            item,
            buffer: Arc::new(buffer),
            color,
            show_masked: false,
            bounds: Cell::new(BoundsCache::Unknown),
        })
    }
    /// A copy with a new identity.
    #[must_use]
    pub fn duplicate(&self, item: Item) -> Self {
        Self {
            item,
            buffer: self.buffer.clone(),
            color: self.color,
            show_masked: self.show_masked,
            bounds: self.bounds.clone(),
        }
    }
    #[must_use]
    pub fn buffer(&self) -> &Arc<Buffer> {
        &self.buffer
    }
    /// Mutable access to the pixels. Forgets the cached bounds.
    pub(crate) fn buffer_mut(&mut self) -> &mut Buffer {
        self.bounds.set(BoundsCache::Unknown);
        Arc::make_mut(&mut self.buffer)
    }
    /// Replace the pixels wholesale, resizing the item to match.
    pub(crate) fn set_buffer(&mut self, buffer: Arc<Buffer>, offset: [i32; 2]) {
        self.item
            .set_rect(Rect::new(offset[0], offset[1], buffer.width(), buffer.height()));
        self.buffer = buffer;
        self.bounds.set(BoundsCache::Unknown);
    }
    #[must_use]
    pub fn color(&self) -> Color {
        self.color
    }
    pub(crate) fn set_color(&mut self, color: Color) {
        self.color = color;
    }
    #[must_use]
    pub fn show_masked(&self) -> bool {
        self.show_masked
    }
    pub(crate) fn set_show_masked(&mut self, show: bool) {
        self.show_masked = show;
    }
    #[must_use]
    pub fn bounds_cache(&self) -> BoundsCache {
        self.bounds.get()
    }
    pub(crate) fn set_bounds_cache(&self, bounds: BoundsCache) {
        self.bounds.set(bounds);
    }
    /// Bounds of the nonzero area in image coordinates, computed on first use.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        match self.bounds.get() {
            BoundsCache::Known(rect) => Some(rect),
            BoundsCache::Empty => None,
            BoundsCache::Unknown => {
                let [x, y] = self.item.offset();
                let bounds = self.buffer.mask_bounds().map(|b| b.translate(x, y));
                self.bounds.set(bounds.into());
                bounds
            }
        }
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bounds().is_none()
    }
    /// Mask value at an image-space position. Outside the channel is zero.
    #[must_use]
    pub fn value(&self, x: i32, y: i32) -> f32 {
        let [ox, oy] = self.item.offset();
        self.buffer.mask_value(x - ox, y - oy)
    }

    /// Combine an image-space rectangle of `value` into the mask.
    pub(crate) fn combine_rect(&mut self, op: ChannelOp, rect: Rect) {
        let [ox, oy] = self.item.offset();
        let local = rect.translate(-ox, -oy);
        let buffer = self.buffer_mut();
        let inside = local.intersect(&buffer.extent());
        match op {
            ChannelOp::Replace => {
                buffer.clear(None);
                if let Some(inside) = inside {
                    buffer.set_color(inside, Color::WHITE);
                }
            }
            ChannelOp::Add => {
                if let Some(inside) = inside {
                    buffer.set_color(inside, Color::WHITE);
                }
            }
            ChannelOp::Subtract => {
                if let Some(inside) = inside {
                    buffer.clear(Some(inside));
                }
            }
            ChannelOp::Intersect => {
                let extent = buffer.extent();
                for y in 0..extent.height {
                    for x in 0..extent.width {
                        if !inside.is_some_and(|r| r.contains(x, y)) {
                            buffer.put(x, y, [0.0; 4]);
                        }
                    }
                }
            }
        }
        // Cheap to know exactly for the common cases.
        let bounds = match (op, inside) {
            (ChannelOp::Replace, Some(inside)) => {
                BoundsCache::Known(inside.translate(ox, oy))
            }
            (ChannelOp::Replace, None) => BoundsCache::Empty,
            _ => BoundsCache::Unknown,
        };
        self.bounds.set(bounds);
    }
    pub(crate) fn fill_all(&mut self) {
        let buffer = self.buffer_mut();
        let extent = buffer.extent();
        buffer.set_color(extent, Color::WHITE);
        self.bounds
            .set(BoundsCache::Known(self.item.rect()));
    }
    pub(crate) fn clear(&mut self) {
        self.buffer_mut().clear(None);
        self.bounds.set(BoundsCache::Empty);
    }
    pub(crate) fn invert(&mut self) {
        let buffer = self.buffer_mut();
        let extent = buffer.extent();
        for y in 0..extent.height {
            for x in 0..extent.width {
                let v = 1.0 - buffer.mask_value(x, y);
                buffer.put(x, y, [v, v, v, 1.0]);
            }
        }
    }
}
impl TreeItem for Channel {
    const KIND: ItemKind = ItemKind::Channel;
    fn item(&self) -> &Item {
        &self.item
    }
    fn item_mut(&mut self) -> &mut Item {
        &mut self.item
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::id::{ImageId, Tattoo};

    fn channel(rect: Rect) -> Channel {
        let item = Item::new(ImageId::next(), Tattoo(1), "mask", rect);
        Channel::new(item, Precision::U8, Color::BLACK).unwrap()
    }
    #[test]
    fn combine_ops() {
        let mut mask = channel(Rect::new(0, 0, 10, 10));
        assert!(mask.is_empty());
        mask.combine_rect(ChannelOp::Replace, Rect::new(2, 2, 4, 4));
        assert_eq!(mask.bounds_cache(), BoundsCache::Known(Rect::new(2, 2, 4, 4)));
        mask.combine_rect(ChannelOp::Add, Rect::new(8, 8, 5, 5));
        assert_eq!(mask.bounds_cache(), BoundsCache::Unknown);
        assert_eq!(mask.bounds(), Some(Rect::new(2, 2, 8, 8)));
        mask.combine_rect(ChannelOp::Subtract, Rect::new(0, 0, 10, 4));
        assert_eq!(mask.bounds(), Some(Rect::new(2, 4, 8, 6)));
        mask.combine_rect(ChannelOp::Intersect, Rect::new(0, 0, 7, 7));
        assert_eq!(mask.bounds(), Some(Rect::new(2, 4, 4, 2)));
        assert_eq!(mask.value(3, 5), 1.0);
        assert_eq!(mask.value(9, 9), 0.0);
    }
    #[test]
    fn offset_channel_bounds_in_image_space() {
        let mut mask = channel(Rect::new(100, 50, 10, 10));
        mask.fill_all();
        assert_eq!(mask.bounds(), Some(Rect::new(100, 50, 10, 10)));
        mask.set_bounds_cache(BoundsCache::Unknown);
        assert_eq!(mask.bounds(), Some(Rect::new(100, 50, 10, 10)));
        mask.invert();
        assert!(mask.is_empty());
    }
}
