//! Layer, mask, channel and path properties.

use super::Image;
use crate::blend::{clamp_opacity, LayerMode};
use crate::buffer::Format;
use crate::channel::Channel;
use crate::color::Color;
use crate::error::{ImageError, TreeError};
use crate::id::ItemId;
use crate::item::{Item, TreeItem};
use crate::layer::{Layer, MaskInit};
use crate::signal::ImageEvent;
use crate::undo::{Undo, UndoKind, UndoType};
use crate::vectors::Stroke;

impl Image {
    fn layer_or_err(&self, id: ItemId) -> Result<&Layer, ImageError> {
        Ok(self.layers.get(id).ok_or(TreeError::NotFound(id))?)
    }
    fn group_or_err(&self, id: ItemId) -> Result<&Layer, ImageError> {
        let layer = self.layer_or_err(id)?;
        if !layer.is_group() {
            return Err(ImageError::contract(format!("layer {id} is not a group")));
        }
        Ok(layer)
    }
    /// Tell listeners a layer's rendering parameters changed, and redraw it.
    pub(crate) fn layer_properties_changed(&mut self, id: ItemId) {
        self.emit(ImageEvent::LayerProperties(id));
        if let Some(rect) = self.layers.get(id).map(|l| l.item().rect()) {
            self.update_item(id, rect);
        }
    }

    pub fn set_layer_mode(&mut self, id: ItemId, mode: LayerMode, push_undo: bool) -> Result<(), ImageError> {
        let current = self.layer_or_err(id)?.mode();
        if current == mode {
            return Ok(());
        }
        if push_undo {
            self.push_undo(Undo::new(
                UndoType::LayerMode,
                None,
                UndoKind::LayerMode {
                    layer: id,
                    mode: current,
                },
            ));
        }
        if let Some(layer) = self.layers.get_mut(id) {
            layer.set_mode(mode);
        }
        self.layer_properties_changed(id);
        Ok(())
    }
    /// Consecutive opacity changes of the same layer share one undo step.
    pub fn set_layer_opacity(&mut self, id: ItemId, opacity: f32, push_undo: bool) -> Result<(), ImageError> {
        let current = self.layer_or_err(id)?.opacity();
        let opacity = clamp_opacity(opacity);
        if current == opacity {
            return Ok(());
        }
        let compress = self
            .undo_can_compress(UndoType::LayerOpacity)
            .is_some_and(|top| top.target() == Some(id));
        if push_undo && !compress {
            self.push_undo(Undo::new(
                UndoType::LayerOpacity,
                None,
                UndoKind::LayerOpacity {
                    layer: id,
                    opacity: current,
                },
            ));
        }
        if let Some(layer) = self.layers.get_mut(id) {
            layer.set_opacity(opacity);
        }
        self.layer_properties_changed(id);
        Ok(())
    }
    pub fn set_layer_lock_alpha(&mut self, id: ItemId, lock: bool, push_undo: bool) -> Result<(), ImageError> {
        let current = self.layer_or_err(id)?.lock_alpha();
        self.set_layer_flag(UndoType::LayerLockAlpha, id, current, lock, push_undo)?;
        if let Some(layer) = self.layers.get_mut(id) {
            layer.set_lock_alpha(lock);
        }
        self.emit(ImageEvent::LayerProperties(id));
        Ok(())
    }
    /// Whether the mask takes part in rendering.
    pub fn set_layer_apply_mask(&mut self, id: ItemId, apply: bool, push_undo: bool) -> Result<(), ImageError> {
        let current = self.masked_layer(id)?.apply_mask();
        self.set_layer_flag(UndoType::LayerMaskApply, id, current, apply, push_undo)?;
        if let Some(layer) = self.layers.get_mut(id) {
            layer.set_apply_mask(apply);
        }
        self.layer_properties_changed(id);
        Ok(())
    }
    /// Whether the mask is rendered in place of the layer.
    pub fn set_layer_show_mask(&mut self, id: ItemId, show: bool, push_undo: bool) -> Result<(), ImageError> {
        let current = self.masked_layer(id)?.show_mask();
        self.set_layer_flag(UndoType::LayerMaskShow, id, current, show, push_undo)?;
        if let Some(layer) = self.layers.get_mut(id) {
            layer.set_show_mask(show);
        }
        self.layer_properties_changed(id);
        Ok(())
    }
    fn set_layer_flag(
        &mut self,
        ty: UndoType,
        id: ItemId,
        current: bool,
        value: bool,
        push_undo: bool,
    ) -> Result<(), ImageError> {
        if push_undo && current != value {
            self.push_undo(Undo::new(
                ty,
                None,
                UndoKind::LayerFlag {
                    layer: id,
                    value: current,
                },
            ));
        }
        Ok(())
    }
    fn masked_layer(&self, id: ItemId) -> Result<&Layer, ImageError> {
        let layer = self.layer_or_err(id)?;
        if layer.mask().is_none() {
            return Err(ImageError::contract(format!("layer {id} has no mask")));
        }
        Ok(layer)
    }

    /// Give a layer a new mask. Returns the mask's id.
    pub fn add_layer_mask(&mut self, id: ItemId, init: MaskInit, push_undo: bool) -> Result<ItemId, ImageError> {
        let tattoo = self.ids.tattoo();
        let layer = self.layer_or_err(id)?;
        if layer.mask().is_some() {
            return Err(ImageError::contract(format!("layer {id} already has a mask")));
        }
        let pixels = layer.mask_pixels(init)?;
        let name = format!("{} mask", layer.item().name());
        let item = Item::new(self.id, tattoo, name, layer.item().rect());
        let mask = Channel::from_buffer(item, &pixels, Color::BLACK.opaque())?;
        let mask_id = mask.item().id();
        if push_undo {
            self.push_undo(Undo::new(
                UndoType::LayerMaskAdd,
                None,
                UndoKind::LayerMask {
                    layer: id,
                    mask: None,
                },
            ));
        }
        if let Some(layer) = self.layers.get_mut(id) {
            layer.replace_mask(Some(mask));
        }
        log::debug!("added mask {mask_id} to {id}");
        self.layer_properties_changed(id);
        Ok(mask_id)
    }
    pub fn remove_layer_mask(&mut self, id: ItemId, push_undo: bool) -> Result<(), ImageError> {
        self.masked_layer(id)?;
        let mask = self.layers.get_mut(id).and_then(|l| l.replace_mask(None));
        if push_undo {
            self.push_undo(Undo::new(
                UndoType::LayerMaskRemove,
                None,
                UndoKind::LayerMask { layer: id, mask },
            ));
        }
        self.layer_properties_changed(id);
        Ok(())
    }
    /// Drop the mask. With `apply` its effect is first multiplied into the layer's pixels.
    pub fn apply_layer_mask(&mut self, id: ItemId, apply: bool, push_undo: bool) -> Result<(), ImageError> {
        let layer = self.masked_layer(id)?;
        if apply && layer.is_group() {
            return Err(ImageError::contract(format!(
                "mask of group {id} can only be discarded"
            )));
        }
        let run = move |image: &mut Self| -> Result<(), ImageError> {
            if apply {
                let (pixels, offset) = image
                    .layers
                    .get(id)
                    .map(|l| (l.masked_pixels(), l.item().offset()))
                    .ok_or(TreeError::NotFound(id))?;
                image.replace_drawable_buffer(id, pixels, offset, push_undo)?;
            }
            image.remove_layer_mask(id, push_undo)
        };
        if push_undo {
            self.undo_group(UndoType::GroupLayerApplyMask, None, run)
        } else {
            run(self)
        }
    }

    /// Stop a group from following its children's bounds until resumed.
    pub fn suspend_group_resize(&mut self, id: ItemId, push_undo: bool) -> Result<(), ImageError> {
        self.group_or_err(id)?;
        if push_undo && self.layers.is_attached(id) {
            self.push_undo(Undo::new(
                UndoType::GroupLayerSuspend,
                None,
                UndoKind::GroupResize { group: id },
            ));
        }
        self.layers.suspend_resize(id)
    }
    pub fn resume_group_resize(&mut self, id: ItemId, push_undo: bool) -> Result<(), ImageError> {
        let old = self.group_or_err(id)?.item().rect();
        if !self
            .layers
            .get(id)
            .and_then(Layer::group)
            .is_some_and(|g| g.is_suspended())
        {
            return Err(ImageError::contract(format!(
                "group {id} resumed more often than suspended"
            )));
        }
        if push_undo && self.layers.is_attached(id) {
            self.push_undo(Undo::new(
                UndoType::GroupLayerResume,
                None,
                UndoKind::GroupResize { group: id },
            ));
        }
        self.layers.resume_resize(id)?;
        self.layer_geometry_changed(id, old);
        Ok(())
    }
    /// Re-render a group at another format. Its mask follows to the new precision.
    pub fn convert_group_layer(&mut self, id: ItemId, format: Format, push_undo: bool) -> Result<(), ImageError> {
        let current = self.group_or_err(id)?.format();
        if push_undo {
            self.push_undo(Undo::new(
                UndoType::GroupLayerConvert,
                None,
                UndoKind::GroupConvert {
                    group: id,
                    format: current,
                },
            ));
        }
        self.layers.convert_group(id, format, &*self.applicator)?;
        let mask = self
            .layers
            .get(id)
            .and_then(Layer::mask)
            .filter(|m| m.buffer().format().precision != format.precision)
            .map(|m| (m.item().id(), m.buffer().convert(Format::mask(format.precision)), m.item().offset()));
        if let Some((mask, converted, offset)) = mask {
            self.replace_drawable_buffer(mask, converted?, offset, push_undo)?;
        }
        self.layer_properties_changed(id);
        Ok(())
    }
    /// Whether a group's children are shown in a layer list. Not recorded.
    pub fn set_group_expanded(&mut self, id: ItemId, expanded: bool) -> Result<(), ImageError> {
        self.group_or_err(id)?;
        if let Some(group) = self.layers.get_mut(id).and_then(|l| l.group.as_mut()) {
            group.set_expanded(expanded);
        }
        self.emit(ImageEvent::LayerProperties(id));
        Ok(())
    }

    pub fn set_channel_color(&mut self, id: ItemId, color: Color, push_undo: bool) -> Result<(), ImageError> {
        let current = self.channel(id).ok_or(TreeError::NotFound(id))?.color();
        if current == color {
            return Ok(());
        }
        if push_undo {
            self.push_undo(Undo::new(
                UndoType::ChannelColor,
                None,
                UndoKind::ChannelColor {
                    channel: id,
                    color: current,
                },
            ));
        }
        if let Some(channel) = self.channel_mut(id) {
            channel.set_color(color);
        }
        self.emit(ImageEvent::ChannelColor(id));
        Ok(())
    }
    /// Not recorded.
    pub fn set_channel_show_masked(&mut self, id: ItemId, show: bool) -> Result<(), ImageError> {
        let channel = self.channel_mut(id).ok_or(TreeError::NotFound(id))?;
        channel.set_show_masked(show);
        self.emit(ImageEvent::ChannelColor(id));
        Ok(())
    }
    /// Replace a path's strokes.
    pub fn set_vectors_strokes(
        &mut self,
        id: ItemId,
        strokes: Vec<Stroke>,
        push_undo: bool,
    ) -> Result<(), ImageError> {
        let current = self.vectors.get(id).ok_or(TreeError::NotFound(id))?;
        if push_undo {
            let previous = current.strokes.clone();
            self.push_undo(Undo::new(
                UndoType::VectorsMod,
                None,
                UndoKind::VectorsMod {
                    vectors: id,
                    strokes: previous,
                },
            ));
        }
        if let Some(vectors) = self.vectors.get_mut(id) {
            vectors.strokes = strokes;
        }
        self.emit(ImageEvent::VectorsChanged(id));
        Ok(())
    }
}
