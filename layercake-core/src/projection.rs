//! # Projections
//!
//! Flattening a layer stack into pixels. Group layers and the image both keep a projection that
//! is invalidated synchronously by mutations and recomposited on the next read.

use std::sync::Arc;

use crate::blend::LayerMode;
use crate::buffer::{Applicator, Buffer, BufferError, Composite, Format};
use crate::id::ItemId;
use crate::item::{ItemTree, TreeItem};
use crate::layer::Layer;
use crate::util::Rect;

/// Composite one layer onto `dest`, whose origin sits at `dest_origin` in image space.
/// Only the image-space `region` of `dest` is touched.
pub(crate) fn composite_layer(
    layer: &Layer,
    mode: LayerMode,
    dest: &mut Buffer,
    dest_origin: [i32; 2],
    region: Rect,
    applicator: &dyn Applicator,
) {
    let [dx, dy] = dest_origin;
    let [lx, ly] = layer.item().offset();
    let mask = layer.mask();
    let apply = match mask {
        Some(mask) if layer.show_mask() => mask.buffer(),
        _ => layer.buffer(),
    };
    let mut params = Composite::new(apply, [lx - dx, ly - dy], region.translate(-dx, -dy));
    params.opacity = layer.opacity();
    params.mode = mode;
    if let Some(mask) = mask.filter(|_| layer.apply_mask() && !layer.show_mask()) {
        let [mx, my] = mask.item().offset();
        params.mask = Some(mask.buffer());
        params.mask_offset = [mx - dx, my - dy];
    }
    applicator.composite(dest, &params);
}

/// Composite the visible children of `parent` (or the top level), bottom first.
pub(crate) fn composite_children(
    tree: &ItemTree<Layer>,
    parent: Option<ItemId>,
    dest: &mut Buffer,
    dest_origin: [i32; 2],
    region: Rect,
    applicator: &dyn Applicator,
) {
    for child in tree.children(parent).into_iter().rev() {
        let Some(layer) = tree.get(child) else {
            continue;
        };
        if !layer.item().is_visible() {
            continue;
        }
        composite_layer(layer, layer.mode(), dest, dest_origin, region, applicator);
    }
}

/// The image's flattened view, recomposited lazily.
#[derive(Debug, Default)]
pub struct Projection {
    buffer: Option<Arc<Buffer>>,
    invalid: Option<Rect>,
}
impl Projection {
    pub(crate) fn invalidate(&mut self, rect: Rect) {
        self.invalid = Some(self.invalid.map_or(rect, |r| r.union(&rect)));
    }
    /// Drop the pixels, forcing a full re-render at the next flush.
    pub(crate) fn reset(&mut self) {
        self.buffer = None;
        self.invalid = None;
    }
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.buffer.is_some() && self.invalid.is_none()
    }
    /// Bring the pixels up to date with the top level of `layers`. Group projections must
    /// already be flushed.
    pub(crate) fn flush(
        &mut self,
        layers: &ItemTree<Layer>,
        size: [i32; 2],
        format: Format,
        applicator: &dyn Applicator,
    ) -> Result<Arc<Buffer>, BufferError> {
        let canvas = Rect::new(0, 0, size[0], size[1]);
        let current = self
            .buffer
            .take()
            .filter(|b| b.extent() == canvas && b.format() == format);
        let (mut pixels, invalid) = match current {
            Some(buffer) => match self.invalid.take() {
                None => {
                    self.buffer = Some(buffer.clone());
                    return Ok(buffer);
                }
                Some(invalid) => (Arc::unwrap_or_clone(buffer), invalid),
            },
            None => match Buffer::new(size[0], size[1], format) {
                Ok(pixels) => {
                    self.invalid = None;
                    (pixels, canvas)
                }
                Err(err) => {
                    self.invalid = Some(canvas);
                    return Err(err);
                }
            },
        };
        if let Some(region) = invalid.intersect(&canvas) {
            pixels.clear(Some(region));
            composite_children(layers, None, &mut pixels, [0, 0], region, applicator);
        }
        let pixels = Arc::new(pixels);
        self.buffer = Some(pixels.clone());
        Ok(pixels)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::buffer::{BaseType, Precision, ReferenceApplicator};
    use crate::color::Color;
    use crate::id::{ImageId, Tattoo};
    use crate::item::Item;

    const RGBA: Format = Format::new(BaseType::Rgb, Precision::Float, true);

    #[test]
    fn hidden_layers_skipped() {
        let mut tree = ItemTree::new(ImageId::next());
        let mut layer =
            Layer::new(Item::new(tree.image(), Tattoo(1), "a", Rect::new(0, 0, 2, 2)), RGBA)
                .unwrap();
        layer.buffer_mut().set_color(Rect::new(0, 0, 2, 2), Color::WHITE);
        let id = tree.insert_detached(layer).unwrap();
        tree.attach(id, None, 0).unwrap();

        let mut projection = Projection::default();
        let pixels = projection.flush(&tree, [2, 2], RGBA, &ReferenceApplicator).unwrap();
        assert_eq!(pixels.get(0, 0), Some([1.0; 4]));
        assert!(projection.is_valid());

        tree.get_mut(id).unwrap().item_mut().set_visible(false);
        projection.invalidate(Rect::new(0, 0, 1, 1));
        let pixels = projection.flush(&tree, [2, 2], RGBA, &ReferenceApplicator).unwrap();
        assert_eq!(pixels.get(0, 0), Some([0.0; 4]));
        // Outside the invalid area, old pixels are kept.
        assert_eq!(pixels.get(1, 1), Some([1.0; 4]));
    }
    #[test]
    fn layer_mask_applied() {
        let mut tree = ItemTree::new(ImageId::next());
        let mut layer =
            Layer::new(Item::new(tree.image(), Tattoo(1), "a", Rect::new(0, 0, 2, 1)), RGBA)
                .unwrap();
        layer.buffer_mut().set_color(Rect::new(0, 0, 2, 1), Color::WHITE);
        let mask_pixels = {
            let mut pixels = layer.mask_pixels(crate::layer::MaskInit::Black).unwrap();
            pixels.set_color(Rect::new(1, 0, 1, 1), Color::WHITE);
            pixels
        };
        let mask = crate::channel::Channel::from_buffer(
            Item::new(tree.image(), Tattoo(2), "mask", Rect::new(0, 0, 2, 1)),
            &mask_pixels,
            Color::BLACK,
        )
        .unwrap();
        layer.replace_mask(Some(mask));
        let id = tree.insert_detached(layer).unwrap();
        tree.attach(id, None, 0).unwrap();

        let mut dest = Buffer::new(2, 1, RGBA).unwrap();
        let extent = dest.extent();
        composite_children(&tree, None, &mut dest, [0, 0], extent, &ReferenceApplicator);
        assert_eq!(dest.get(0, 0), Some([0.0; 4]));
        assert_eq!(dest.get(1, 0), Some([1.0; 4]));
    }
}
