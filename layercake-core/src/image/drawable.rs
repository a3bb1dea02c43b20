//! Pixel-holding items: leaf layers, channels, layer masks and the selection.

use std::sync::Arc;

use super::Image;
use crate::buffer::Buffer;
use crate::channel::Channel;
use crate::color::Color;
use crate::error::ImageError;
use crate::id::ItemId;
use crate::item::Item;
use crate::layer::Layer;
use crate::undo::{Undo, UndoKind, UndoType};
use crate::util::Rect;

pub(crate) trait Drawable {
    fn drawable_item(&self) -> &Item;
    fn pixels(&self) -> &Arc<Buffer>;
    fn pixels_mut(&mut self) -> &mut Buffer;
    /// Swap in a whole new buffer at `offset`, returning the old buffer and offset.
    fn swap_pixels(&mut self, buffer: Arc<Buffer>, offset: [i32; 2]) -> (Arc<Buffer>, [i32; 2]);
}
impl Drawable for Layer {
    fn drawable_item(&self) -> &Item {
        &self.item
    }
    fn pixels(&self) -> &Arc<Buffer> {
        &self.buffer
    }
    fn pixels_mut(&mut self) -> &mut Buffer {
        self.buffer_mut()
    }
    fn swap_pixels(&mut self, buffer: Arc<Buffer>, offset: [i32; 2]) -> (Arc<Buffer>, [i32; 2]) {
        let old = (self.buffer.clone(), self.item.offset());
        self.set_buffer(buffer, offset);
        if let Some(mask) = &mut self.mask {
            mask.item.set_offset(offset);
        }
        old
    }
}
impl Drawable for Channel {
    fn drawable_item(&self) -> &Item {
        &self.item
    }
    fn pixels(&self) -> &Arc<Buffer> {
        &self.buffer
    }
    fn pixels_mut(&mut self) -> &mut Buffer {
        self.buffer_mut()
    }
    fn swap_pixels(&mut self, buffer: Arc<Buffer>, offset: [i32; 2]) -> (Arc<Buffer>, [i32; 2]) {
        let old = (self.buffer.clone(), self.item.offset());
        self.set_buffer(buffer, offset);
        old
    }
}

impl Image {
    pub(crate) fn drawable(&self, id: ItemId) -> Option<&dyn Drawable> {
        if self.layers.contains(id) {
            return self
                .layers
                .get(id)
                .filter(|l| !l.is_group())
                .map(|l| l as &dyn Drawable);
        }
        self.channel(id).map(|c| c as &dyn Drawable)
    }
    pub(crate) fn drawable_mut(&mut self, id: ItemId) -> Option<&mut dyn Drawable> {
        if self.layers.contains(id) {
            return self
                .layers
                .get_mut(id)
                .filter(|l| !l.is_group())
                .map(|l| l as &mut dyn Drawable);
        }
        self.channel_mut(id).map(|c| c as &mut dyn Drawable)
    }
    #[must_use]
    pub fn is_drawable(&self, id: ItemId) -> bool {
        self.drawable(id).is_some()
    }
    /// Drawables must be attached (masks through their layer) to be edited with undo.
    fn check_drawable(&self, id: ItemId) -> Result<&dyn Drawable, ImageError> {
        let drawable = self
            .drawable(id)
            .ok_or_else(|| ImageError::contract(format!("{id} is not a drawable")))?;
        let attached = if self.is_selection(id) {
            true
        } else if let Some(owner) = self.mask_owner(id) {
            self.layers.is_attached(owner)
        } else {
            drawable.drawable_item().is_attached()
        };
        if !attached {
            return Err(ImageError::contract(format!("drawable {id} is not attached")));
        }
        Ok(drawable)
    }

    /// Record a region of a drawable's pixels, in drawable coordinates. The region is copied.
    pub fn push_drawable_undo(
        &mut self,
        name: Option<&str>,
        id: ItemId,
        region: Rect,
    ) -> Result<bool, ImageError> {
        let drawable = self.check_drawable(id)?;
        let region = region
            .intersect(&drawable.pixels().extent())
            .ok_or_else(|| ImageError::contract("drawable undo of an empty region"))?;
        let pixels = drawable.pixels().copy_region(region)?;
        Ok(self.push_undo(Undo::new(
            UndoType::Drawable,
            name,
            UndoKind::Drawable {
                drawable: id,
                pixels,
                origin: region.offset(),
            },
        )))
    }
    /// Record a drawable's whole buffer. With `copy_buffer` the pixels are copied, for callers
    /// about to write into the live buffer. Without it the buffer is shared, which is enough
    /// when it is about to be replaced wholesale.
    pub fn push_drawable_mod_undo(
        &mut self,
        name: Option<&str>,
        id: ItemId,
        copy_buffer: bool,
    ) -> Result<bool, ImageError> {
        let drawable = self.check_drawable(id)?;
        let buffer = if copy_buffer {
            Arc::new(Buffer::clone(drawable.pixels()))
        } else {
            drawable.pixels().clone()
        };
        let offset = drawable.drawable_item().offset();
        Ok(self.push_undo(Undo::new(
            UndoType::DrawableMod,
            name,
            UndoKind::DrawableMod {
                drawable: id,
                buffer,
                offset,
            },
        )))
    }

    /// Fill a drawable-space region with a color. `None` fills everything.
    pub fn fill_drawable(
        &mut self,
        id: ItemId,
        region: Option<Rect>,
        color: Color,
        push_undo: bool,
    ) -> Result<(), ImageError> {
        self.edit_region(id, region, push_undo, "Fill", |pixels, rect| {
            pixels.set_color(rect, color);
        })
    }
    /// Clear a drawable-space region to transparent. `None` clears everything.
    pub fn clear_drawable(
        &mut self,
        id: ItemId,
        region: Option<Rect>,
        push_undo: bool,
    ) -> Result<(), ImageError> {
        self.edit_region(id, region, push_undo, "Clear", |pixels, rect| {
            pixels.clear(Some(rect));
        })
    }
    fn edit_region(
        &mut self,
        id: ItemId,
        region: Option<Rect>,
        push_undo: bool,
        name: &str,
        edit: impl FnOnce(&mut Buffer, Rect),
    ) -> Result<(), ImageError> {
        let drawable = self.check_drawable(id)?;
        if drawable.drawable_item().is_content_locked() {
            return Err(ImageError::contract(format!("{id} has its content locked")));
        }
        let extent = drawable.pixels().extent();
        let Some(region) = region.unwrap_or(extent).intersect(&extent) else {
            return Ok(());
        };
        if push_undo {
            self.push_drawable_undo(Some(name), id, region)?;
        }
        let Some(drawable) = self.drawable_mut(id) else {
            return Ok(());
        };
        edit(drawable.pixels_mut(), region);
        let [x, y] = drawable.drawable_item().offset();
        self.update_item(id, region.translate(x, y));
        Ok(())
    }
    /// Write into a drawable's pixels in place. The undo step keeps a full copy.
    pub fn modify_drawable(
        &mut self,
        id: ItemId,
        push_undo: bool,
        modify: impl FnOnce(&mut Buffer),
    ) -> Result<(), ImageError> {
        self.check_drawable(id)?;
        if push_undo {
            self.push_drawable_mod_undo(None, id, true)?;
        }
        let Some(drawable) = self.drawable_mut(id) else {
            return Ok(());
        };
        modify(drawable.pixels_mut());
        let rect = drawable.drawable_item().rect();
        self.update_item(id, rect);
        Ok(())
    }
    /// Swap in new pixels, moving and resizing the drawable to match. The undo step shares the
    /// old buffer.
    pub fn replace_drawable_buffer(
        &mut self,
        id: ItemId,
        buffer: Buffer,
        offset: [i32; 2],
        push_undo: bool,
    ) -> Result<(), ImageError> {
        self.check_drawable(id)?;
        if push_undo {
            self.push_drawable_mod_undo(None, id, false)?;
        }
        self.swap_drawable_buffer(id, Arc::new(buffer), offset);
        Ok(())
    }
    /// Swap a drawable's buffer and offset without recording anything, returning the old ones.
    pub(crate) fn swap_drawable_buffer(
        &mut self,
        id: ItemId,
        buffer: Arc<Buffer>,
        offset: [i32; 2],
    ) -> Option<(Arc<Buffer>, [i32; 2])> {
        let drawable = self.drawable_mut(id)?;
        let old_rect = drawable.drawable_item().rect();
        let old = drawable.swap_pixels(buffer, offset);
        if self.layers.contains(id) {
            self.layer_geometry_changed(id, old_rect);
        } else {
            let new_rect = self.item(id).map_or(old_rect, Item::rect);
            self.update_item(id, old_rect.union(&new_rect));
        }
        Some(old)
    }
}

#[cfg(test)]
mod test {
    use super::super::test_util::*;
    use crate::color::Color;
    use crate::util::Rect;

    #[test]
    fn fill_undo_redo() {
        let mut image = image(8, 8);
        let layer = filled_layer(&mut image, "a", Rect::new(0, 0, 4, 4), Color::BLACK);
        image
            .fill_drawable(layer, Some(Rect::new(1, 1, 2, 2)), Color::WHITE, true)
            .unwrap();
        let pixel = |image: &crate::Image, x, y| image.layer(layer).unwrap().buffer().get(x, y);
        assert_eq!(pixel(&image, 1, 1), Some([1.0; 4]));
        assert_eq!(pixel(&image, 0, 0), Some([0.0, 0.0, 0.0, 1.0]));
        image.undo().unwrap();
        assert_eq!(pixel(&image, 1, 1), Some([0.0, 0.0, 0.0, 1.0]));
        image.redo().unwrap();
        assert_eq!(pixel(&image, 1, 1), Some([1.0; 4]));
    }
    #[test]
    fn modify_in_place_keeps_history() {
        let mut image = image(4, 4);
        let layer = filled_layer(&mut image, "a", Rect::new(0, 0, 2, 2), Color::BLACK);
        image
            .modify_drawable(layer, true, |pixels| {
                pixels.set_color(pixels.extent(), Color::WHITE);
            })
            .unwrap();
        image.undo().unwrap();
        let buffer = image.layer(layer).unwrap().buffer().clone();
        assert_eq!(buffer.get(0, 0), Some([0.0, 0.0, 0.0, 1.0]));
    }
    #[test]
    fn replace_buffer_resizes() {
        let mut image = image(16, 16);
        let layer = filled_layer(&mut image, "a", Rect::new(0, 0, 2, 2), Color::BLACK);
        let format = image.layer(layer).unwrap().format();
        let bigger = crate::buffer::Buffer::new(5, 3, format).unwrap();
        image.replace_drawable_buffer(layer, bigger, [4, 4], true).unwrap();
        assert_eq!(
            image.item(layer).unwrap().rect(),
            Rect::new(4, 4, 5, 3)
        );
        image.undo().unwrap();
        assert_eq!(image.item(layer).unwrap().rect(), Rect::new(0, 0, 2, 2));
    }
    #[test]
    fn content_lock_refused() {
        let mut image = image(4, 4);
        let layer = filled_layer(&mut image, "a", Rect::new(0, 0, 2, 2), Color::BLACK);
        image.set_item_lock_content(layer, true, true).unwrap();
        let err = image.clear_drawable(layer, None, true).unwrap_err();
        assert!(err.is_contract_violation());
    }
}
