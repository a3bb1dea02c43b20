//! Guides, sample points and image-wide attributes: grid, resolution, base type, precision and
//! canvas size.

use super::Image;
use crate::buffer::{BaseType, Buffer, Format, Precision};
use crate::error::ImageError;
use crate::guide::{Grid, Guide, Orientation, SamplePoint};
use crate::id::{GuideId, ItemId, SamplePointId};
use crate::item::TreeItem;
use crate::layer::Layer;
use crate::signal::ImageEvent;
use crate::undo::{Undo, UndoKind, UndoType};

impl Image {
    fn guide_extent(&self, orientation: Orientation) -> i32 {
        match orientation {
            Orientation::Horizontal => self.height,
            Orientation::Vertical => self.width,
        }
    }
    #[must_use]
    pub fn guide(&self, id: GuideId) -> Option<&Guide> {
        self.guides.iter().find(|g| g.id == id)
    }
    /// Guides may sit anywhere from the canvas's start edge to its end edge, inclusive.
    pub fn add_guide(
        &mut self,
        orientation: Orientation,
        position: i32,
        push_undo: bool,
    ) -> Result<GuideId, ImageError> {
        if !(0..=self.guide_extent(orientation)).contains(&position) {
            return Err(ImageError::contract(format!(
                "guide position {position} outside the canvas"
            )));
        }
        let guide = self.ids.guide();
        if push_undo {
            self.push_undo(Undo::new(
                UndoType::Guide,
                Some("Add Guide"),
                UndoKind::Guide {
                    guide,
                    orientation,
                    position: None,
                },
            ));
        }
        self.guides.push(Guide {
            id: guide,
            orientation,
            position,
        });
        self.emit(ImageEvent::GuideAdded(guide));
        Ok(guide)
    }
    pub fn move_guide(&mut self, id: GuideId, position: i32, push_undo: bool) -> Result<(), ImageError> {
        let current = *self
            .guide(id)
            .ok_or_else(|| ImageError::contract(format!("no guide {id}")))?;
        if !(0..=self.guide_extent(current.orientation)).contains(&position) {
            return Err(ImageError::contract(format!(
                "guide position {position} outside the canvas"
            )));
        }
        if push_undo {
            self.push_undo(Undo::new(
                UndoType::Guide,
                Some("Move Guide"),
                UndoKind::Guide {
                    guide: id,
                    orientation: current.orientation,
                    position: Some(current.position),
                },
            ));
        }
        self.set_guide_position(id, position);
        Ok(())
    }
    fn set_guide_position(&mut self, id: GuideId, position: i32) {
        let Some(guide) = self.guides.iter_mut().find(|g| g.id == id) else {
            return;
        };
        guide.position = position;
        let orientation = guide.orientation;
        self.emit(ImageEvent::GuideMoved {
            guide: id,
            orientation,
            position,
        });
    }
    pub fn remove_guide(&mut self, id: GuideId, push_undo: bool) -> Result<(), ImageError> {
        let index = self
            .guides
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| ImageError::contract(format!("no guide {id}")))?;
        let guide = self.guides[index];
        if push_undo {
            self.push_undo(Undo::new(
                UndoType::Guide,
                Some("Remove Guide"),
                UndoKind::Guide {
                    guide: id,
                    orientation: guide.orientation,
                    position: Some(guide.position),
                },
            ));
        }
        self.guides.remove(index);
        self.emit(ImageEvent::GuideRemoved(id));
        Ok(())
    }

    #[must_use]
    pub fn sample_point(&self, id: SamplePointId) -> Option<&SamplePoint> {
        self.sample_points.iter().find(|p| p.id == id)
    }
    fn check_on_canvas(&self, x: i32, y: i32) -> Result<(), ImageError> {
        if self.canvas().contains(x, y) {
            Ok(())
        } else {
            Err(ImageError::contract(format!(
                "sample point ({x}, {y}) outside the canvas"
            )))
        }
    }
    pub fn add_sample_point(&mut self, x: i32, y: i32, push_undo: bool) -> Result<SamplePointId, ImageError> {
        self.check_on_canvas(x, y)?;
        let point = self.ids.sample_point();
        if push_undo {
            self.push_undo(Undo::new(
                UndoType::SamplePoint,
                None,
                UndoKind::SamplePoint {
                    point,
                    position: None,
                },
            ));
        }
        self.sample_points.push(SamplePoint { id: point, x, y });
        self.emit(ImageEvent::SamplePointAdded(point));
        Ok(point)
    }
    pub fn move_sample_point(
        &mut self,
        id: SamplePointId,
        x: i32,
        y: i32,
        push_undo: bool,
    ) -> Result<(), ImageError> {
        self.check_on_canvas(x, y)?;
        let current = *self
            .sample_point(id)
            .ok_or_else(|| ImageError::contract(format!("no sample point {id}")))?;
        if push_undo {
            self.push_undo(Undo::new(
                UndoType::SamplePoint,
                None,
                UndoKind::SamplePoint {
                    point: id,
                    position: Some([current.x, current.y]),
                },
            ));
        }
        self.set_sample_point_position(id, x, y);
        Ok(())
    }
    fn set_sample_point_position(&mut self, id: SamplePointId, x: i32, y: i32) {
        if let Some(point) = self.sample_points.iter_mut().find(|p| p.id == id) {
            point.x = x;
            point.y = y;
            self.emit(ImageEvent::SamplePointMoved(id));
        }
    }
    pub fn remove_sample_point(&mut self, id: SamplePointId, push_undo: bool) -> Result<(), ImageError> {
        let index = self
            .sample_points
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| ImageError::contract(format!("no sample point {id}")))?;
        let point = self.sample_points.remove(index);
        if push_undo {
            self.push_undo(Undo::new(
                UndoType::SamplePoint,
                None,
                UndoKind::SamplePoint {
                    point: id,
                    position: Some([point.x, point.y]),
                },
            ));
        }
        self.emit(ImageEvent::SamplePointRemoved(id));
        Ok(())
    }

    /// Replace or remove the grid.
    pub fn set_grid(&mut self, grid: Option<Grid>, push_undo: bool) -> Result<(), ImageError> {
        if let Some(grid) = &grid {
            if !(grid.xspacing > 0.0 && grid.yspacing > 0.0) {
                return Err(ImageError::contract("grid spacing must be positive"));
            }
        }
        if grid == self.grid {
            return Ok(());
        }
        if push_undo {
            self.push_undo(Undo::new(
                UndoType::ImageGrid,
                None,
                UndoKind::ImageGrid { grid: self.grid },
            ));
        }
        self.grid = grid;
        self.emit(ImageEvent::GridChanged);
        Ok(())
    }
    /// Pixels per inch, horizontal and vertical.
    pub fn set_resolution(&mut self, resolution: [f64; 2], push_undo: bool) -> Result<(), ImageError> {
        if !resolution.iter().all(|r| r.is_finite() && *r > 0.0) {
            return Err(ImageError::contract(format!(
                "resolution {resolution:?} must be positive"
            )));
        }
        if resolution == self.resolution {
            return Ok(());
        }
        if push_undo {
            self.push_undo(Undo::new(
                UndoType::ImageResolution,
                None,
                UndoKind::ImageResolution {
                    resolution: self.resolution,
                },
            ));
        }
        self.resolution = resolution;
        self.emit(ImageEvent::ResolutionChanged);
        Ok(())
    }

    /// Convert every layer to another base type.
    pub fn convert_base_type(&mut self, base_type: BaseType, push_undo: bool) -> Result<(), ImageError> {
        if base_type == self.base_type {
            return Ok(());
        }
        log::debug!("image {} to {base_type:?}", self.id);
        let run = move |image: &mut Self| -> Result<(), ImageError> {
            if push_undo {
                image.push_undo(Undo::new(
                    UndoType::ImageType,
                    None,
                    UndoKind::ImageType {
                        base_type: image.base_type,
                    },
                ));
            }
            image.base_type = base_type;
            image.convert_layers(push_undo, |format| Format { base_type, ..format })?;
            image.emit(ImageEvent::ModeChanged);
            Ok(())
        };
        if push_undo {
            self.undo_group(UndoType::GroupImageConvert, None, run)
        } else {
            run(self)
        }
    }
    /// Convert every layer, channel, mask and the selection to another precision.
    pub fn convert_precision(&mut self, precision: Precision, push_undo: bool) -> Result<(), ImageError> {
        if precision == self.precision {
            return Ok(());
        }
        log::debug!("image {} to {precision:?}", self.id);
        let run = move |image: &mut Self| -> Result<(), ImageError> {
            if push_undo {
                image.push_undo(Undo::new(
                    UndoType::ImagePrecision,
                    None,
                    UndoKind::ImagePrecision {
                        precision: image.precision,
                    },
                ));
            }
            image.precision = precision;
            image.convert_layers(push_undo, |format| Format { precision, ..format })?;
            let mut channels: Vec<ItemId> = image.channels.ids_all();
            channels.push(image.selection.item.id());
            channels.extend(
                image
                    .layers
                    .iter_all()
                    .filter_map(Layer::mask)
                    .map(|m| m.item().id()),
            );
            for id in channels {
                image.convert_drawable(id, Format::mask(precision), push_undo)?;
            }
            image.emit(ImageEvent::PrecisionChanged);
            Ok(())
        };
        if push_undo {
            self.undo_group(UndoType::GroupImageConvert, None, run)
        } else {
            run(self)
        }
    }
    /// Convert every leaf layer's pixels. Groups follow on their own.
    fn convert_layers(
        &mut self,
        push_undo: bool,
        target: impl Fn(Format) -> Format,
    ) -> Result<(), ImageError> {
        let leaves: Vec<(ItemId, Format)> = self
            .layers
            .iter_all()
            .filter(|l| !l.is_group())
            .map(|l| (l.item().id(), l.format()))
            .collect();
        for (id, format) in leaves {
            self.convert_drawable(id, target(format), push_undo)?;
        }
        self.projection.reset();
        let canvas = self.canvas();
        self.update(canvas);
        Ok(())
    }
    fn convert_drawable(&mut self, id: ItemId, format: Format, push_undo: bool) -> Result<(), ImageError> {
        let Some(drawable) = self.drawable(id) else {
            return Ok(());
        };
        let pixels = drawable.pixels();
        if pixels.format() == format {
            return Ok(());
        }
        let converted = pixels.convert(format)?;
        let offset = drawable.drawable_item().offset();
        self.replace_drawable_buffer(id, converted, offset, push_undo)
    }

    /// Change the canvas size. The old canvas's origin lands at `offset` in the new one, and
    /// everything on the image moves along with it. Guides and sample points that end up off
    /// the canvas are removed.
    pub fn resize_canvas(
        &mut self,
        width: i32,
        height: i32,
        offset: [i32; 2],
        push_undo: bool,
    ) -> Result<(), ImageError> {
        if width <= 0 || height <= 0 {
            return Err(ImageError::contract(format!(
                "image size {width}x{height} is not positive"
            )));
        }
        let [dx, dy] = offset;
        let previous_size = [self.width, self.height];
        log::debug!(
            "image {} resized {previous_size:?} -> [{width}, {height}] at {offset:?}",
            self.id
        );
        let run = move |image: &mut Self| -> Result<(), ImageError> {
            if push_undo {
                image.push_undo(Undo::new(
                    UndoType::ImageSize,
                    None,
                    UndoKind::ImageSize {
                        width: image.width,
                        height: image.height,
                        previous_origin: [-dx, -dy],
                    },
                ));
            }
            image.width = width;
            image.height = height;

            let leaves: Vec<(ItemId, [i32; 2])> = image
                .layers
                .iter_all()
                .filter(|l| !l.is_group())
                .map(|l| (l.item().id(), l.item().offset()))
                .collect();
            for (id, [x, y]) in leaves {
                if push_undo {
                    image.push_undo(Undo::new(
                        UndoType::ItemDisplace,
                        None,
                        UndoKind::ItemDisplace {
                            item: id,
                            offset: [x, y],
                        },
                    ));
                }
                image.set_item_offset(id, [x + dx, y + dy]);
            }

            let mut channels: Vec<ItemId> = image.channels.ids_all();
            channels.push(image.selection.item.id());
            for id in channels {
                let Some(channel) = image.channel(id) else {
                    continue;
                };
                let old = channel.buffer().clone();
                let mut resized = Buffer::new(width, height, old.format())?;
                resized.copy_from(&old, old.extent(), offset);
                image.replace_drawable_buffer(id, resized, [0, 0], push_undo)?;
            }

            for id in image.vectors.ids_all() {
                let Some(strokes) = image.vectors.get(id).map(|v| v.strokes.clone()) else {
                    continue;
                };
                if push_undo {
                    image.push_undo(Undo::new(
                        UndoType::VectorsMod,
                        None,
                        UndoKind::VectorsMod { vectors: id, strokes },
                    ));
                }
                if let Some(vectors) = image.vectors.get_mut(id) {
                    vectors.translate(f64::from(dx), f64::from(dy));
                }
                image.emit(ImageEvent::VectorsChanged(id));
            }

            let guides = image.guides.clone();
            for guide in guides {
                let shift = match guide.orientation {
                    Orientation::Horizontal => dy,
                    Orientation::Vertical => dx,
                };
                let position = guide.position + shift;
                if (0..=image.guide_extent(guide.orientation)).contains(&position) {
                    if shift != 0 {
                        image.move_guide(guide.id, position, push_undo)?;
                    }
                } else {
                    image.remove_guide(guide.id, push_undo)?;
                }
            }
            let points = image.sample_points.clone();
            for point in points {
                let (x, y) = (point.x + dx, point.y + dy);
                if image.canvas().contains(x, y) {
                    if offset != [0, 0] {
                        image.move_sample_point(point.id, x, y, push_undo)?;
                    }
                } else {
                    image.remove_sample_point(point.id, push_undo)?;
                }
            }

            image.projection.reset();
            image.emit(ImageEvent::SizeChanged {
                previous_origin: offset,
                previous_size,
            });
            let canvas = image.canvas();
            image.update(canvas);
            Ok(())
        };
        if push_undo {
            self.undo_group(UndoType::GroupImageResize, None, run)
        } else {
            run(self)
        }
    }
}

#[cfg(test)]
mod test {
    use super::super::test_util::*;
    use super::*;
    use crate::channel::ChannelOp;
    use crate::color::Color;
    use crate::util::Rect;

    #[test]
    fn guide_bounds_checked() {
        let mut image = image(100, 50);
        assert!(image.add_guide(Orientation::Horizontal, 50, true).is_ok());
        assert!(image
            .add_guide(Orientation::Horizontal, 51, true)
            .unwrap_err()
            .is_contract_violation());
        let vertical = image.add_guide(Orientation::Vertical, 0, true).unwrap();
        assert!(image.move_guide(vertical, 101, true).is_err());
        image.remove_guide(vertical, true).unwrap();
        assert!(image.guide(vertical).is_none());
        image.undo().unwrap();
        assert_eq!(image.guide(vertical).unwrap().position, 0);
    }
    #[test]
    fn sample_points_undo() {
        let mut image = image(16, 16);
        let point = image.add_sample_point(3, 4, true).unwrap();
        image.move_sample_point(point, 10, 10, true).unwrap();
        image.remove_sample_point(point, true).unwrap();
        assert!(image.sample_points().is_empty());
        image.undo().unwrap();
        image.undo().unwrap();
        let restored = image.sample_point(point).unwrap();
        assert_eq!([restored.x, restored.y], [3, 4]);
        assert!(image.add_sample_point(16, 0, true).is_err());
    }
    #[test]
    fn grid_and_resolution_undo() {
        let mut image = image(8, 8);
        let events = record(&mut image);
        image.set_grid(Some(Grid::new(4.0, 4.0)), true).unwrap();
        image.set_resolution([300.0, 300.0], true).unwrap();
        assert!(image.set_resolution([0.0, 300.0], true).is_err());
        image.undo().unwrap();
        image.undo().unwrap();
        assert_eq!(image.resolution(), [72.0, 72.0]);
        assert_eq!(image.grid(), None);
        assert!(events.borrow().contains(&ImageEvent::ResolutionChanged));
    }
    #[test]
    fn precision_converts_everything() {
        let mut image = image(8, 8);
        let layer = filled_layer(&mut image, "a", Rect::new(0, 0, 4, 4), Color::WHITE);
        let mask = image
            .add_layer_mask(layer, crate::layer::MaskInit::White, true)
            .unwrap();
        image.convert_precision(Precision::U8, true).unwrap();
        assert_eq!(image.precision(), Precision::U8);
        assert_eq!(image.layer(layer).unwrap().format().precision, Precision::U8);
        assert_eq!(image.channel(mask).unwrap().buffer().format().precision, Precision::U8);
        assert_eq!(image.selection().buffer().format().precision, Precision::U8);
        let events = record(&mut image);
        image.undo().unwrap();
        assert_eq!(image.precision(), Precision::Float);
        assert_eq!(image.layer(layer).unwrap().format().precision, Precision::Float);
        assert!(events.borrow().contains(&ImageEvent::PrecisionChanged));
    }
    #[test]
    fn base_type_converts_layers() {
        let mut image = image(8, 8);
        let layer = filled_layer(&mut image, "a", Rect::new(0, 0, 4, 4), Color::WHITE);
        image.convert_base_type(BaseType::Gray, true).unwrap();
        assert_eq!(image.layer(layer).unwrap().format().base_type, BaseType::Gray);
        image.undo().unwrap();
        assert_eq!(image.base_type(), BaseType::Rgb);
        assert_eq!(image.layer(layer).unwrap().format().base_type, BaseType::Rgb);
    }
    #[test]
    fn resize_moves_content() {
        let mut image = image(10, 10);
        let layer = filled_layer(&mut image, "a", Rect::new(1, 1, 2, 2), Color::WHITE);
        image.select_rect(ChannelOp::Replace, Rect::new(0, 2, 2, 2), true).unwrap();
        let near = image.add_guide(Orientation::Vertical, 8, true).unwrap();
        let far = image.add_guide(Orientation::Horizontal, 3, true).unwrap();
        let events = record(&mut image);
        image.resize_canvas(12, 12, [3, -2], true).unwrap();
        assert_eq!(image.canvas(), Rect::new(0, 0, 12, 12));
        assert_eq!(image.item(layer).unwrap().rect(), Rect::new(4, -1, 2, 2));
        assert_eq!(image.selection_bounds(), Some(Rect::new(3, 0, 2, 2)));
        assert_eq!(image.guide(near).unwrap().position, 11);
        assert_eq!(image.guide(far).unwrap().position, 1);
        assert!(events.borrow().contains(&ImageEvent::SizeChanged {
            previous_origin: [3, -2],
            previous_size: [10, 10],
        }));
        image.undo().unwrap();
        assert_eq!(image.canvas(), Rect::new(0, 0, 10, 10));
        assert_eq!(image.item(layer).unwrap().rect(), Rect::new(1, 1, 2, 2));
        assert_eq!(image.selection_bounds(), Some(Rect::new(0, 2, 2, 2)));
        assert_eq!(image.guide(near).unwrap().position, 8);
        assert_eq!(image.guide(far).unwrap().position, 3);
    }
    #[test]
    fn resize_drops_guides_off_canvas() {
        let mut image = image(10, 10);
        let guide = image.add_guide(Orientation::Vertical, 9, true).unwrap();
        image.resize_canvas(5, 10, [0, 0], true).unwrap();
        assert!(image.guide(guide).is_none());
        image.undo().unwrap();
        assert!(image.guide(guide).is_some());
    }
}
