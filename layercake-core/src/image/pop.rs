//! Popping a record: swap its payload with the live state.
//!
//! Every arm leaves the record holding what it just replaced, so popping it again in the other
//! direction puts everything back. Failures here mean history and image disagree; they are
//! logged and the arm does nothing.

use std::sync::Arc;

use super::Image;
use crate::channel::BoundsCache;
use crate::guide::{Guide, SamplePoint};
use crate::signal::ImageEvent;
use crate::undo::{SizeChange, Undo, UndoAccumulator, UndoKind, UndoMode, UndoType};
use crate::util::Rect;

impl Undo {
    pub(crate) fn pop(&mut self, image: &mut Image, mode: UndoMode, accum: &mut UndoAccumulator) {
        self.swap_state(image, mode, accum);
        match mode {
            UndoMode::Undo => image.mark_clean(self.dirty_mask),
            UndoMode::Redo => image.mark_dirty(self.dirty_mask),
        }
    }
    fn swap_state(&mut self, image: &mut Image, mode: UndoMode, accum: &mut UndoAccumulator) {
        let ty = self.ty;
        match &mut self.kind {
            UndoKind::Group(children) => {
                let children: Vec<&mut Undo> = match mode {
                    UndoMode::Undo => children.iter_mut().rev().collect(),
                    UndoMode::Redo => children.iter_mut().collect(),
                };
                for child in children {
                    child.pop(image, mode, accum);
                }
            }
            UndoKind::Cant => {
                if mode == UndoMode::Undo {
                    let message = format!("Can't undo {}", self.name);
                    log::warn!("{message}");
                    image.emit(ImageEvent::Warning(message));
                }
            }

            UndoKind::ImageType { base_type } => {
                std::mem::swap(base_type, &mut image.base_type);
                accum.mode_changed = true;
            }
            UndoKind::ImagePrecision { precision } => {
                std::mem::swap(precision, &mut image.precision);
                accum.precision_changed = true;
            }
            UndoKind::ImageSize {
                width,
                height,
                previous_origin,
            } => {
                let previous_size = [image.width, image.height];
                std::mem::swap(width, &mut image.width);
                std::mem::swap(height, &mut image.height);
                accum.size_changed = Some(SizeChange {
                    previous_origin: *previous_origin,
                    previous_size,
                });
                *previous_origin = previous_origin.map(|c| -c);
                image.projection.reset();
                let canvas = image.canvas();
                image.update(canvas);
            }
            UndoKind::ImageResolution { resolution } => {
                std::mem::swap(resolution, &mut image.resolution);
                accum.resolution_changed = true;
            }
            UndoKind::ImageGrid { grid } => {
                std::mem::swap(grid, &mut image.grid);
                image.emit(ImageEvent::GridChanged);
            }
            UndoKind::Guide {
                guide,
                orientation,
                position,
            } => {
                let live = image.guides.iter().position(|g| g.id == *guide);
                match (live, *position) {
                    (None, Some(recorded)) => {
                        let at = image.guides.partition_point(|g| g.id < *guide);
                        image.guides.insert(
                            at,
                            Guide {
                                id: *guide,
                                orientation: *orientation,
                                position: recorded,
                            },
                        );
                        *position = None;
                        image.emit(ImageEvent::GuideAdded(*guide));
                    }
                    (Some(index), None) => {
                        let removed = image.guides.remove(index);
                        *orientation = removed.orientation;
                        *position = Some(removed.position);
                        image.emit(ImageEvent::GuideRemoved(*guide));
                    }
                    (Some(index), Some(recorded)) => {
                        let live = &mut image.guides[index];
                        let previous = *live;
                        live.orientation = *orientation;
                        live.position = recorded;
                        *orientation = previous.orientation;
                        *position = Some(previous.position);
                        if previous.orientation != live.orientation || previous.position != recorded
                        {
                            let event = ImageEvent::GuideMoved {
                                guide: live.id,
                                orientation: live.orientation,
                                position: live.position,
                            };
                            image.emit(event);
                        }
                    }
                    (None, None) => (),
                }
            }
            UndoKind::SamplePoint { point, position } => {
                let live = image.sample_points.iter().position(|p| p.id == *point);
                match (live, *position) {
                    (None, Some([x, y])) => {
                        let at = image.sample_points.partition_point(|p| p.id < *point);
                        image
                            .sample_points
                            .insert(at, SamplePoint { id: *point, x, y });
                        *position = None;
                        image.emit(ImageEvent::SamplePointAdded(*point));
                    }
                    (Some(index), None) => {
                        let removed = image.sample_points.remove(index);
                        *position = Some([removed.x, removed.y]);
                        image.emit(ImageEvent::SamplePointRemoved(*point));
                    }
                    (Some(index), Some([x, y])) => {
                        let live = &mut image.sample_points[index];
                        *position = Some([live.x, live.y]);
                        live.x = x;
                        live.y = y;
                        image.emit(ImageEvent::SamplePointMoved(*point));
                    }
                    (None, None) => (),
                }
            }

            UndoKind::Drawable {
                drawable,
                pixels,
                origin,
            } => {
                let Some(target) = image.drawable_mut(*drawable) else {
                    log::error!("drawable undo for missing drawable {drawable}");
                    return;
                };
                let region = Rect::new(origin[0], origin[1], pixels.width(), pixels.height());
                let current = match target.pixels().copy_region(region) {
                    Ok(current) => current,
                    Err(err) => {
                        log::error!("drawable undo for {drawable} skipped: {err}");
                        return;
                    }
                };
                target
                    .pixels_mut()
                    .copy_from(pixels, pixels.extent(), *origin);
                *pixels = current;
                let [x, y] = target.drawable_item().offset();
                image.update_item(*drawable, region.translate(x, y));
                accum.fadeable = Some(*drawable);
            }
            UndoKind::DrawableMod {
                drawable,
                buffer,
                offset,
            } => {
                match image.swap_drawable_buffer(*drawable, buffer.clone(), *offset) {
                    Some((old, old_offset)) => {
                        *buffer = old;
                        *offset = old_offset;
                    }
                    None => log::error!("drawable undo for missing drawable {drawable}"),
                }
            }
            UndoKind::Mask {
                channel,
                bounds,
                pixels,
                format,
            } => {
                let Some(live) = image.channel_mut(*channel) else {
                    log::error!("mask undo for missing channel {channel}");
                    return;
                };
                let [ox, oy] = live.item.offset();
                let live_bounds = live.bounds();
                let live_pixels = live_bounds
                    .and_then(|b| live.buffer.copy_region(b.translate(-ox, -oy)).ok());
                if let Some(target) = format.as_mut() {
                    let previous = live.buffer.format();
                    match live.buffer.convert(*target) {
                        Ok(converted) => {
                            live.set_buffer(Arc::new(converted), [ox, oy]);
                            *target = previous;
                        }
                        Err(err) => log::error!("mask undo could not convert {channel}: {err}"),
                    }
                }
                live.clear();
                let restored = match (*bounds, pixels.as_ref()) {
                    (Some(rect), Some(stored)) => {
                        live.buffer_mut()
                            .copy_from(stored, stored.extent(), [rect.x - ox, rect.y - oy]);
                        BoundsCache::Known(rect)
                    }
                    _ => BoundsCache::Empty,
                };
                live.set_bounds_cache(restored);
                let changed = match (live_bounds, *bounds) {
                    (Some(a), Some(b)) => Some(a.union(&b)),
                    (a, b) => a.or(b),
                };
                *bounds = live_bounds;
                *pixels = live_pixels;
                let rect = changed.unwrap_or_else(|| image.canvas());
                image.update_item(*channel, rect);
            }

            UndoKind::ItemReorder {
                item,
                parent,
                index,
            } => {
                let Some(kind) = image.item_kind(*item) else {
                    log::error!("reorder undo for unknown item {item}");
                    return;
                };
                let (current_parent, current_index) = image.item_position(kind, *item);
                match image.move_item(kind, *item, *parent, *index) {
                    Ok(_) => {
                        *parent = current_parent;
                        *index = current_index;
                    }
                    Err(err) => log::error!("reorder undo of {item} failed: {err}"),
                }
            }
            UndoKind::ItemRename { item, name } => {
                let Some(current) = image.item(*item).map(|i| i.name().to_owned()) else {
                    log::error!("rename undo for unknown item {item}");
                    return;
                };
                if let Err(err) = image.set_item_name(*item, name) {
                    log::error!("rename undo of {item} failed: {err}");
                    return;
                }
                *name = current;
            }
            UndoKind::ItemDisplace { item, offset } => {
                match image.item(*item).map(|i| i.offset()) {
                    Some(current) => {
                        image.set_item_offset(*item, *offset);
                        *offset = current;
                    }
                    None => log::error!("displace undo for unknown item {item}"),
                }
            }
            UndoKind::ItemFlag { item, value } => {
                let Some(live) = image.item_mut(*item) else {
                    log::error!("flag undo for unknown item {item}");
                    return;
                };
                let previous = match ty {
                    UndoType::ItemVisibility => live.is_visible(),
                    UndoType::ItemLinked => live.is_linked(),
                    UndoType::ItemLockContent => live.is_content_locked(),
                    _ => live.is_position_locked(),
                };
                match ty {
                    UndoType::ItemVisibility => live.set_visible(*value),
                    UndoType::ItemLinked => live.set_linked(*value),
                    UndoType::ItemLockContent => live.set_lock_content(*value),
                    _ => live.set_lock_position(*value),
                }
                let rect = live.rect();
                *value = previous;
                image.emit(ImageEvent::ItemFlags(*item));
                if ty == UndoType::ItemVisibility {
                    image.update_item(*item, rect);
                }
            }
            UndoKind::ItemAddRemove {
                kind,
                item,
                parent,
                index,
                prev_active,
            } => {
                let remove = match mode {
                    UndoMode::Undo => ty.is_add(),
                    UndoMode::Redo => !ty.is_add(),
                };
                if remove {
                    let (current_parent, current_index) = image.item_position(*kind, *item);
                    let fallback = prev_active
                        .filter(|a| *a != *item && image.item_is_attached(*kind, *a));
                    match image.detach_item(*kind, *item, fallback) {
                        Ok(suggestion) => {
                            *parent = current_parent;
                            *index = current_index;
                            if image.active_item(*kind).is_none() {
                                image.set_active_item(*kind, suggestion);
                            }
                        }
                        Err(err) => log::error!("removing {item} on {} failed: {err}", mode.as_ref()),
                    }
                } else {
                    let current_active = image.active_item(*kind);
                    match image.attach_item(*kind, *item, *parent, *index) {
                        Ok(()) => {
                            *prev_active = current_active;
                            image.set_active_item(*kind, Some(*item));
                        }
                        Err(err) => log::error!("restoring {item} on {} failed: {err}", mode.as_ref()),
                    }
                }
            }

            UndoKind::LayerMode { layer, mode: blend } => {
                let Some(live) = image.layers.get_mut(*layer) else {
                    log::error!("mode undo for unknown layer {layer}");
                    return;
                };
                let previous = live.mode();
                live.set_mode(*blend);
                *blend = previous;
                image.layer_properties_changed(*layer);
            }
            UndoKind::LayerOpacity { layer, opacity } => {
                let Some(live) = image.layers.get_mut(*layer) else {
                    log::error!("opacity undo for unknown layer {layer}");
                    return;
                };
                let previous = live.opacity();
                live.set_opacity(*opacity);
                *opacity = previous;
                image.layer_properties_changed(*layer);
            }
            UndoKind::LayerFlag { layer, value } => {
                let Some(live) = image.layers.get_mut(*layer) else {
                    log::error!("flag undo for unknown layer {layer}");
                    return;
                };
                let previous = match ty {
                    UndoType::LayerLockAlpha => live.lock_alpha(),
                    UndoType::LayerMaskApply => live.apply_mask(),
                    _ => live.show_mask(),
                };
                match ty {
                    UndoType::LayerLockAlpha => live.set_lock_alpha(*value),
                    UndoType::LayerMaskApply => live.set_apply_mask(*value),
                    _ => live.set_show_mask(*value),
                }
                *value = previous;
                image.layer_properties_changed(*layer);
            }
            UndoKind::GroupResize { group } => {
                let resume = matches!(
                    (mode, ty),
                    (UndoMode::Undo, UndoType::GroupLayerSuspend)
                        | (UndoMode::Redo, UndoType::GroupLayerResume)
                );
                let result = if resume {
                    image.layers.resume_resize(*group)
                } else {
                    image.layers.suspend_resize(*group)
                };
                if let Err(err) = result {
                    log::error!("group resize undo of {group} failed: {err}");
                }
            }
            UndoKind::GroupConvert { group, format } => {
                let Some(previous) = image.layers.get(*group).map(|l| l.format()) else {
                    log::error!("convert undo for unknown group {group}");
                    return;
                };
                match image.layers.convert_group(*group, *format, &*image.applicator) {
                    Ok(()) => *format = previous,
                    Err(err) => log::error!("convert undo of {group} failed: {err}"),
                }
                image.layer_properties_changed(*group);
            }
            UndoKind::LayerMask { layer, mask } => {
                let remove = matches!(
                    (mode, ty),
                    (UndoMode::Undo, UndoType::LayerMaskAdd)
                        | (UndoMode::Redo, UndoType::LayerMaskRemove)
                );
                let Some(live) = image.layers.get_mut(*layer) else {
                    log::error!("mask undo for unknown layer {layer}");
                    return;
                };
                if remove {
                    *mask = live.replace_mask(None);
                } else {
                    live.replace_mask(mask.take());
                }
                image.layer_properties_changed(*layer);
            }

            UndoKind::ChannelColor { channel, color } => {
                let Some(live) = image.channel_mut(*channel) else {
                    log::error!("color undo for unknown channel {channel}");
                    return;
                };
                let previous = live.color();
                live.set_color(*color);
                *color = previous;
                image.emit(ImageEvent::ChannelColor(*channel));
            }
            UndoKind::VectorsMod { vectors, strokes } => {
                let Some(live) = image.vectors.get_mut(*vectors) else {
                    log::error!("path undo for unknown path {vectors}");
                    return;
                };
                std::mem::swap(strokes, &mut live.strokes);
                image.emit(ImageEvent::VectorsChanged(*vectors));
            }
            UndoKind::Parasite {
                item,
                name,
                parasite,
            } => {
                let list = match item {
                    Some(id) => match image.item_mut(*id) {
                        Some(live) => live.parasites_mut(),
                        None => {
                            log::error!("parasite undo for unknown item {id}");
                            return;
                        }
                    },
                    None => &mut image.parasites,
                };
                let current = list.detach(name);
                if let Some(restored) = parasite.take() {
                    list.attach(restored);
                }
                *parasite = current;
                image.emit(ImageEvent::ParasiteChanged {
                    item: *item,
                    name: name.clone(),
                });
            }
        }
    }
}

/// Sanity check used by tests: every item referenced by a history record still exists.
#[cfg(test)]
pub(super) fn targets_alive(image: &Image) -> bool {
    image
        .undo_stack()
        .iter()
        .chain(image.redo_stack().iter())
        .filter_map(Undo::target)
        .all(|id| image.item(id).is_some())
}
