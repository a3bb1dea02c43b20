//! # Merging
//!
//! Collapsing several layers into one, and several paths into one. User-facing refusals are
//! reported as [`MergeError`] before anything changes. Each merge is a single undo step.

use std::sync::Arc;

use super::Image;
use crate::blend::LayerMode;
use crate::buffer::{BaseType, Buffer};
use crate::context::Context;
use crate::error::{ImageError, MergeError, TreeError};
use crate::id::ItemId;
use crate::item::{InsertParent, Item, TreeItem};
use crate::layer::Layer;
use crate::projection;
use crate::signal::ImageEvent;
use crate::undo::UndoType;
use crate::util::Rect;

/// How big the merged layer is.
#[derive(
    strum::AsRefStr,
    strum::EnumIter,
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
pub enum MergeType {
    /// Large enough for every merged layer.
    #[default]
    ExpandAsNecessary,
    /// Every merged layer, but no larger than the canvas.
    ClipToImage,
    /// Exactly the bottom layer.
    ClipToBottomLayer,
    /// The canvas, on an opaque background. Everything else is removed.
    Flatten,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct MergeOptions {
    /// Merge within the active layer's container instead of the top level.
    pub merge_active_group: bool,
    /// Also remove the invisible layers of that container.
    pub discard_invisible: bool,
}

impl Image {
    /// Merge all visible layers of a container. Returns the merged layer, or the active layer
    /// when nothing was visible.
    pub fn merge_visible_layers(
        &mut self,
        context: &Context,
        merge_type: MergeType,
        options: MergeOptions,
    ) -> Result<Option<ItemId>, ImageError> {
        let active = self.layers.active();
        let container = if options.merge_active_group {
            active.and_then(|a| self.layers.parent(a))
        } else {
            None
        };
        let (visible, invisible): (Vec<ItemId>, Vec<ItemId>) = self
            .layers
            .children(container)
            .into_iter()
            .partition(|id| self.item(*id).is_some_and(Item::is_visible));
        if visible.is_empty() {
            return Ok(active);
        }
        self.undo_group(
            UndoType::GroupImageLayersMerge,
            Some("Merge Visible Layers"),
            |image| {
                let merged = image.merge_layers(container, &visible, context, merge_type)?;
                if options.discard_invisible {
                    for id in invisible {
                        image.remove_layer(id, None, true)?;
                    }
                }
                Ok(merged)
            },
        )
    }
    /// Merge every visible layer onto the background color, and remove the rest.
    pub fn flatten(&mut self, context: &Context) -> Result<Option<ItemId>, ImageError> {
        let visible: Vec<ItemId> = self
            .layers
            .children(None)
            .into_iter()
            .filter(|id| self.item(*id).is_some_and(Item::is_visible))
            .collect();
        self.undo_group(
            UndoType::GroupImageLayersMerge,
            Some("Flatten Image"),
            |image| image.merge_layers(None, &visible, context, MergeType::Flatten),
        )
    }
    /// Merge a layer into the nearest visible layer below it.
    pub fn merge_down(
        &mut self,
        layer: ItemId,
        context: &Context,
        merge_type: MergeType,
    ) -> Result<Option<ItemId>, ImageError> {
        if !self.layers.is_attached(layer) {
            return Err(TreeError::NotAttached(layer).into());
        }
        let container = self.layers.parent(layer);
        let siblings = self.layers.children(container);
        let below = siblings
            .iter()
            .skip_while(|id| **id != layer)
            .skip(1)
            .copied()
            .find(|id| self.item(*id).is_some_and(Item::is_visible))
            .ok_or(MergeError::NoVisibleLayerBelow)?;
        let target = self.layers.get(below).ok_or(TreeError::NotFound(below))?;
        if target.is_group() {
            return Err(MergeError::TargetIsGroup.into());
        }
        if target.item().is_content_locked() {
            return Err(MergeError::TargetLocked.into());
        }
        self.undo_group(UndoType::GroupImageLayersMerge, Some("Merge Down"), |image| {
            image.merge_layers(container, &[layer, below], context, merge_type)
        })
    }
    /// Replace a group by a plain layer holding its rendered pixels.
    pub fn merge_group_layer(&mut self, group: ItemId) -> Result<ItemId, ImageError> {
        let source = self.layers.get(group).ok_or(TreeError::NotFound(group))?;
        if !source.is_group() {
            return Err(ImageError::contract(format!("layer {group} is not a group")));
        }
        if !self.layers.is_attached(group) {
            return Err(TreeError::NotAttached(group).into());
        }
        self.flush_groups();
        let item_tattoo = self.ids.tattoo();
        let mask_tattoo = self.ids.tattoo();
        let source = self.layers.get(group).ok_or(TreeError::NotFound(group))?;
        let name = source.item().name().to_owned();
        let item = source.item().duplicate(item_tattoo, name);
        let mask_item = source
            .mask()
            .map(|mask| mask.item().duplicate(mask_tattoo, mask.item().name()));
        let mut layer = source.duplicate(item, mask_item);
        layer.group = None;
        let parent = self.layers.parent(group);
        let index = self.layers.index(group);
        self.undo_group(
            UndoType::GroupImageLayersMerge,
            Some("Merge Layer Group"),
            |image| {
                image.remove_layer(group, None, true)?;
                image.add_layer(layer, parent.into(), index, true)
            },
        )
    }

    /// Composite `layers` (top first, all in `container`) into a new layer that takes the
    /// bottom layer's place. The new layer is complete before any source is removed.
    fn merge_layers(
        &mut self,
        container: Option<ItemId>,
        layers: &[ItemId],
        context: &Context,
        merge_type: MergeType,
    ) -> Result<Option<ItemId>, ImageError> {
        let Some(&bottom_id) = layers.last() else {
            return Ok(None);
        };
        let rects: Vec<Rect> = layers
            .iter()
            .map(|id| self.item(*id).map(Item::rect).ok_or(TreeError::NotFound(*id)))
            .collect::<Result<_, _>>()?;
        let union = rects.iter().copied().reduce(|a, b| a.union(&b));
        let bounds = match merge_type {
            MergeType::ExpandAsNecessary => union,
            MergeType::ClipToImage => union.and_then(|u| u.intersect(&self.canvas())),
            MergeType::ClipToBottomLayer => rects.last().copied(),
            MergeType::Flatten => Some(self.canvas()),
        };
        let Some(bounds) = bounds.filter(|b| !b.is_empty()) else {
            return Ok(None);
        };

        self.flush_groups();
        let bottom = self.layers.get(bottom_id).ok_or(TreeError::NotFound(bottom_id))?;
        let bottom_format = bottom.format();
        let opaque = merge_type == MergeType::Flatten
            || (bottom_format.base_type == BaseType::Indexed && !bottom_format.has_alpha);
        let format = if opaque {
            self.layer_format(false)
        } else {
            bottom_format.with_alpha()
        };
        let mut pixels = match Buffer::new(bounds.width, bounds.height, format) {
            Ok(pixels) => pixels,
            Err(err) => {
                let message = format!("could not allocate merge layer: {err}");
                log::warn!("{message}");
                self.emit(ImageEvent::Warning(message));
                return Ok(None);
            }
        };
        if opaque {
            pixels.set_color(pixels.extent(), context.background());
        }
        for &id in layers.iter().rev() {
            let Some(layer) = self.layers.get(id) else {
                continue;
            };
            // Dissolve stays local to the layer's own alpha, anything else has nothing below.
            let mode = if id == bottom_id && layer.mode() != LayerMode::Dissolve {
                LayerMode::Normal
            } else {
                layer.mode()
            };
            projection::composite_layer(
                layer,
                mode,
                &mut pixels,
                bounds.offset(),
                bounds,
                &*self.applicator,
            );
        }

        let bottom_item = bottom.item();
        let mut item = Item::new(self.id, bottom_item.tattoo(), bottom_item.name(), bounds);
        *item.parasites_mut() = bottom_item.parasites().clone();
        let merged = Layer::from_buffer(item, Arc::new(pixels));
        log::debug!(
            "merging {} layers into {bounds:?} ({})",
            layers.len(),
            merge_type.as_ref()
        );

        let siblings = self.layers.children(container);
        let bottom_index = self.layers.index(bottom_id).unwrap_or(0);
        let removed_above = siblings[..bottom_index.min(siblings.len())]
            .iter()
            .filter(|id| layers.contains(id))
            .count();
        for &id in layers {
            self.remove_layer(id, None, true)?;
        }
        let position = if merge_type == MergeType::Flatten {
            for id in self.layers.children(None) {
                self.remove_layer(id, None, true)?;
            }
            0
        } else {
            bottom_index - removed_above
        };
        let parent = if merge_type == MergeType::Flatten {
            InsertParent::Toplevel
        } else {
            container.into()
        };
        let id = self.add_layer(merged, parent, Some(position), true)?;
        Ok(Some(id))
    }

    /// Merge all visible paths into the topmost one.
    pub fn merge_visible_vectors(&mut self) -> Result<ItemId, ImageError> {
        let visible: Vec<ItemId> = self
            .vectors
            .children(None)
            .into_iter()
            .filter(|id| self.item(*id).is_some_and(Item::is_visible))
            .collect();
        let [target_id, rest @ ..] = visible.as_slice() else {
            return Err(MergeError::NotEnoughPaths.into());
        };
        if rest.is_empty() {
            return Err(MergeError::NotEnoughPaths.into());
        }
        let tattoo = self.ids.tattoo();
        let source = self.vectors.get(*target_id).ok_or(TreeError::NotFound(*target_id))?;
        let mut target = source.clone();
        target.item = source.item().duplicate(tattoo, source.item().name());
        let position = self.vectors.index(*target_id);
        for id in rest {
            if let Some(vectors) = self.vectors.get(*id) {
                target.strokes.extend_from_slice(vectors.strokes());
            }
        }
        self.undo_group(
            UndoType::GroupImageVectorsMerge,
            Some("Merge Visible Paths"),
            |image| {
                for id in &visible {
                    image.remove_vectors(*id, None, true)?;
                }
                image.add_vectors(target, position, true)
            },
        )
    }
}

#[cfg(test)]
mod test {
    use super::super::test_util::*;
    use super::*;
    use crate::color::Color;
    use crate::vectors::Stroke;

    fn context() -> Context {
        Context::default()
    }

    #[test]
    fn single_layer_clip_to_bottom_is_identity() {
        let mut image = image(8, 8);
        let layer = filled_layer(&mut image, "a", Rect::new(1, 2, 3, 3), Color::WHITE);
        let red = Color::from_straight_lossy([1.0, 0.0, 0.0, 0.5]);
        image
            .fill_drawable(layer, Some(Rect::new(0, 0, 1, 1)), red, true)
            .unwrap();
        let before = image.layer(layer).unwrap().buffer().clone();
        let tattoo = image.item(layer).unwrap().tattoo();
        let merged = image
            .merge_visible_layers(&context(), MergeType::ClipToBottomLayer, MergeOptions::default())
            .unwrap()
            .unwrap();
        let after = image.layer(merged).unwrap();
        assert_eq!(**after.buffer(), *before);
        assert_eq!(after.item().rect(), Rect::new(1, 2, 3, 3));
        assert_eq!(after.item().tattoo(), tattoo);
        assert_eq!(after.item().name(), "a");
    }
    #[test]
    fn merge_down_takes_bottom_place() {
        let mut image = image(8, 8);
        let bottom = filled_layer(&mut image, "bottom", Rect::new(0, 0, 4, 4), Color::BLACK);
        filled_layer(&mut image, "middle", Rect::new(0, 0, 2, 2), Color::BLACK);
        let top = filled_layer(&mut image, "top", Rect::new(4, 4, 4, 4), Color::WHITE);
        let middle = image.layers().children(None)[1];
        image.set_item_visible(middle, false, true).unwrap();
        let merged = image
            .merge_down(top, &context(), MergeType::ExpandAsNecessary)
            .unwrap()
            .unwrap();
        assert_eq!(names(&image), ["middle", "bottom"]);
        assert_eq!(image.item(merged).unwrap().rect(), Rect::new(0, 0, 8, 8));
        let pixels = image.layer(merged).unwrap().buffer().clone();
        assert_eq!(pixels.get(5, 5), Some([1.0; 4]));
        assert_eq!(pixels.get(1, 1), Some([0.0, 0.0, 0.0, 1.0]));
        assert_eq!(pixels.get(6, 1), Some([0.0; 4]));
        image.undo().unwrap();
        assert_eq!(names(&image), ["top", "middle", "bottom"]);
        assert!(image.layer(bottom).is_some());
    }
    #[test]
    fn merge_down_refusals() {
        let mut image = image(8, 8);
        let lone = filled_layer(&mut image, "a", Rect::new(0, 0, 4, 4), Color::BLACK);
        let err = image
            .merge_down(lone, &context(), MergeType::ExpandAsNecessary)
            .unwrap_err();
        assert_eq!(err, ImageError::Merge(MergeError::NoVisibleLayerBelow));
        image.set_item_lock_content(lone, true, true).unwrap();
        let top = filled_layer(&mut image, "b", Rect::new(0, 0, 4, 4), Color::WHITE);
        let depth = image.undo_stack().depth();
        let err = image
            .merge_down(top, &context(), MergeType::ExpandAsNecessary)
            .unwrap_err();
        assert_eq!(err, ImageError::Merge(MergeError::TargetLocked));
        assert_eq!(image.undo_stack().depth(), depth);
        assert_eq!(names(&image), ["b", "a"]);
    }
    #[test]
    fn flatten_fills_background() {
        let mut image = image(4, 4);
        filled_layer(&mut image, "a", Rect::new(0, 0, 2, 2), Color::BLACK);
        let hidden = filled_layer(&mut image, "b", Rect::new(2, 2, 2, 2), Color::BLACK);
        image.set_item_visible(hidden, false, true).unwrap();
        let flat = image.flatten(&context()).unwrap().unwrap();
        assert_eq!(image.layers().len(), 1);
        let layer = image.layer(flat).unwrap();
        assert!(!layer.has_alpha());
        assert_eq!(layer.item().rect(), image.canvas());
        assert_eq!(layer.buffer().get(3, 3), Some([1.0; 4]));
        assert_eq!(layer.buffer().get(0, 0), Some([0.0, 0.0, 0.0, 1.0]));
    }
    #[test]
    fn merge_visible_discards_invisible() {
        let mut image = image(4, 4);
        filled_layer(&mut image, "a", Rect::new(0, 0, 2, 2), Color::BLACK);
        let hidden = filled_layer(&mut image, "b", Rect::new(0, 0, 2, 2), Color::BLACK);
        filled_layer(&mut image, "c", Rect::new(2, 2, 2, 2), Color::WHITE);
        image.set_item_visible(hidden, false, true).unwrap();
        let options = MergeOptions {
            discard_invisible: true,
            ..MergeOptions::default()
        };
        image
            .merge_visible_layers(&context(), MergeType::ClipToImage, options)
            .unwrap();
        assert_eq!(names(&image), ["a"]);
    }
    #[test]
    fn group_becomes_plain_layer() {
        let mut image = image(8, 8);
        let group = image.new_group_layer(Some("g")).unwrap();
        let group = image.add_layer(group, InsertParent::Toplevel, None, true).unwrap();
        let mut child = image.new_layer("x", Rect::new(2, 2, 2, 2), true).unwrap();
        child.buffer_mut().set_color(Rect::new(0, 0, 2, 2), Color::WHITE);
        image.add_layer(child, InsertParent::Group(group), None, true).unwrap();
        let merged = image.merge_group_layer(group).unwrap();
        let layer = image.layer(merged).unwrap();
        assert!(!layer.is_group());
        assert_eq!(layer.item().name(), "g");
        assert_eq!(layer.item().rect(), Rect::new(2, 2, 2, 2));
        assert_eq!(layer.buffer().get(0, 0), Some([1.0; 4]));
        assert_eq!(image.layers().len(), 1);
    }
    #[test]
    fn paths_merge_into_top() {
        let mut image = image(8, 8);
        let stroke = |x: f64| Stroke::new(vec![[x, 0.0], [x, 4.0]], false);
        let mut ids = Vec::new();
        for x in [1.0, 2.0] {
            let mut path = image.new_vectors(None);
            path.strokes.push(stroke(x));
            ids.push(image.add_vectors(path, None, true).unwrap());
        }
        let hidden_path = image.new_vectors(Some("hidden"));
        let hidden = image.add_vectors(hidden_path, Some(2), true).unwrap();
        image.set_item_visible(hidden, false, true).unwrap();
        let merged = image.merge_visible_vectors().unwrap();
        assert_eq!(image.path(merged).unwrap().strokes().len(), 2);
        assert_eq!(image.vectors().len(), 2);
        assert_eq!(image.item(merged).unwrap().name(), "Path #1");
        image.undo().unwrap();
        assert_eq!(image.vectors().len(), 3);
        image.remove_vectors(ids[0], None, true).unwrap();
        assert_eq!(
            image.merge_visible_vectors().unwrap_err(),
            ImageError::Merge(MergeError::NotEnoughPaths)
        );
    }
}
