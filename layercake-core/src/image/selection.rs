//! The selection mask and mask-style channel edits.

use std::sync::Arc;

use super::Image;
use crate::buffer::Buffer;
use crate::channel::ChannelOp;
use crate::dirty::DirtyMask;
use crate::error::{ImageError, TreeError};
use crate::id::ItemId;
use crate::item::TreeItem;
use crate::signal::ImageEvent;
use crate::undo::{Undo, UndoKind, UndoType};
use crate::util::Rect;

impl Image {
    /// Record the nonzero part of a channel. With `convert` the step also restores the
    /// channel's current format, for callers about to change it.
    pub(crate) fn push_mask_undo(
        &mut self,
        id: ItemId,
        name: Option<&str>,
        convert: bool,
    ) -> Result<bool, ImageError> {
        let channel = self.channel(id).ok_or(TreeError::NotFound(id))?;
        let [ox, oy] = channel.item().offset();
        let bounds = channel.bounds();
        let pixels = bounds
            .map(|b| channel.buffer().copy_region(b.translate(-ox, -oy)))
            .transpose()?;
        let format = convert.then(|| channel.buffer().format());
        let dirty = if self.is_selection(id) {
            DirtyMask::SELECTION
        } else {
            DirtyMask::ITEM | DirtyMask::DRAWABLE
        };
        let undo = Undo::new(
            UndoType::Mask,
            name,
            UndoKind::Mask {
                channel: id,
                bounds,
                pixels,
                format,
            },
        );
        Ok(self.push_undo(undo.with_dirty_mask(dirty)))
    }

    /// Area of the image that is selected, clipped to the canvas.
    #[must_use]
    pub fn selection_bounds(&self) -> Option<Rect> {
        self.selection.bounds()?.intersect(&self.canvas())
    }

    /// Combine an image-space rectangle into the selection.
    pub fn select_rect(&mut self, op: ChannelOp, rect: Rect, push_undo: bool) -> Result<(), ImageError> {
        let id = self.selection.item.id();
        if push_undo {
            self.push_mask_undo(id, Some("Rectangle Select"), false)?;
        }
        self.selection.combine_rect(op, rect);
        self.update_item(id, rect);
        Ok(())
    }
    pub fn select_all(&mut self, push_undo: bool) -> Result<(), ImageError> {
        let id = self.selection.item.id();
        if push_undo {
            self.push_mask_undo(id, Some("Select All"), false)?;
        }
        self.selection.fill_all();
        self.update_item(id, self.canvas());
        Ok(())
    }
    /// Deselect everything. Nothing is recorded when nothing was selected.
    pub fn select_none(&mut self, push_undo: bool) -> Result<(), ImageError> {
        if self.selection.is_empty() {
            return Ok(());
        }
        let id = self.selection.item.id();
        if push_undo {
            self.push_mask_undo(id, Some("Select None"), false)?;
        }
        self.selection.clear();
        self.update_item(id, self.canvas());
        Ok(())
    }
    pub fn select_invert(&mut self, push_undo: bool) -> Result<(), ImageError> {
        let id = self.selection.item.id();
        if push_undo {
            self.push_mask_undo(id, Some("Invert Selection"), false)?;
        }
        self.selection.invert();
        self.update_item(id, self.canvas());
        Ok(())
    }
    /// Combine another channel (or layer mask) into the selection, value by value.
    pub fn select_channel(&mut self, op: ChannelOp, source: ItemId, push_undo: bool) -> Result<(), ImageError> {
        let id = self.selection.item.id();
        if source == id {
            return Err(ImageError::contract("the selection cannot select itself"));
        }
        let source = self.channel(source).ok_or(TreeError::NotFound(source))?;
        let canvas = self.canvas();
        let values: Vec<f32> = (0..canvas.height)
            .flat_map(|y| (0..canvas.width).map(move |x| (x, y)))
            .map(|(x, y)| source.value(x, y))
            .collect();
        if push_undo {
            self.push_mask_undo(id, Some("Channel to Selection"), false)?;
        }
        let [ox, oy] = self.selection.item.offset();
        let pixels = self.selection.buffer_mut();
        let mut values = values.into_iter();
        for y in 0..canvas.height {
            for x in 0..canvas.width {
                let value = values.next().unwrap_or(0.0);
                let current = pixels.mask_value(x - ox, y - oy);
                let combined = match op {
                    ChannelOp::Replace => value,
                    ChannelOp::Add => current.max(value),
                    ChannelOp::Subtract => current * (1.0 - value),
                    ChannelOp::Intersect => current.min(value),
                };
                pixels.put(x - ox, y - oy, [combined, combined, combined, 1.0]);
            }
        }
        self.update_item(id, canvas);
        Ok(())
    }

    /// Move a channel's contents within its fixed extent. Whatever leaves the extent is lost.
    pub(crate) fn shift_channel(&mut self, id: ItemId, dx: i32, dy: i32, push_undo: bool) -> Result<(), ImageError> {
        let channel = self.channel(id).ok_or(TreeError::NotFound(id))?;
        let old = channel.buffer().clone();
        let offset = channel.item().offset();
        let mut shifted = Buffer::new(old.width(), old.height(), old.format())?;
        shifted.copy_from(&old, old.extent(), [dx, dy]);
        if push_undo {
            self.push_mask_undo(id, Some(UndoType::ItemDisplace.description()), false)?;
        }
        if let Some(channel) = self.channel_mut(id) {
            channel.set_buffer(Arc::new(shifted), offset);
        }
        let rect = Rect::new(offset[0], offset[1], old.width(), old.height());
        self.update_item(id, rect);
        self.emit(ImageEvent::ItemMoved(id));
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::super::test_util::*;
    use super::*;
    use crate::color::Color;

    #[test]
    fn select_none_on_empty_records_nothing() {
        let mut image = image(8, 8);
        image.select_none(true).unwrap();
        assert!(image.undo_stack().is_empty());
        image.select_all(true).unwrap();
        assert_eq!(image.selection_bounds(), Some(image.canvas()));
        image.select_none(true).unwrap();
        assert_eq!(image.undo_stack().depth(), 2);
        image.undo().unwrap();
        assert_eq!(image.selection_bounds(), Some(image.canvas()));
    }
    #[test]
    fn rect_ops_combine() {
        let mut image = image(10, 10);
        image.select_rect(ChannelOp::Replace, Rect::new(0, 0, 4, 4), true).unwrap();
        image.select_rect(ChannelOp::Add, Rect::new(4, 0, 2, 4), true).unwrap();
        assert_eq!(image.selection_bounds(), Some(Rect::new(0, 0, 6, 4)));
        image.select_rect(ChannelOp::Subtract, Rect::new(0, 0, 6, 2), true).unwrap();
        assert_eq!(image.selection_bounds(), Some(Rect::new(0, 2, 6, 2)));
        image.select_rect(ChannelOp::Intersect, Rect::new(1, 0, 2, 10), true).unwrap();
        assert_eq!(image.selection_bounds(), Some(Rect::new(1, 2, 2, 2)));
        image.undo().unwrap();
        assert_eq!(image.selection_bounds(), Some(Rect::new(0, 2, 6, 2)));
    }
    #[test]
    fn invert_selection() {
        let mut image = image(4, 4);
        image.select_rect(ChannelOp::Replace, Rect::new(0, 0, 2, 4), true).unwrap();
        image.select_invert(true).unwrap();
        assert_eq!(image.selection_bounds(), Some(Rect::new(2, 0, 2, 4)));
        assert_eq!(image.selection().value(0, 0), 0.0);
    }
    #[test]
    fn selection_from_mask() {
        let mut image = image(8, 8);
        let layer = filled_layer(&mut image, "a", Rect::new(2, 2, 4, 4), Color::WHITE);
        let mask = image
            .add_layer_mask(layer, crate::layer::MaskInit::White, true)
            .unwrap();
        image.select_channel(ChannelOp::Replace, mask, true).unwrap();
        assert_eq!(image.selection_bounds(), Some(Rect::new(2, 2, 4, 4)));
        image.undo().unwrap();
        assert!(image.selection_bounds().is_none());
    }
    #[test]
    fn shifted_selection_clips() {
        let mut image = image(8, 8);
        image.select_rect(ChannelOp::Replace, Rect::new(4, 4, 4, 4), true).unwrap();
        let selection = image.selection().item().id();
        image.translate_item(selection, 2, 2, true).unwrap();
        assert_eq!(image.selection_bounds(), Some(Rect::new(6, 6, 2, 2)));
        image.undo().unwrap();
        assert_eq!(image.selection_bounds(), Some(Rect::new(4, 4, 4, 4)));
    }
}
