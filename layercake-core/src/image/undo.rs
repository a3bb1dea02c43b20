//! Undo history of an image: pushing, grouping, popping and trimming.

use super::{Image, PERMANENTLY_DIRTY};
use crate::error::ImageError;
use crate::id::ItemId;
use crate::item::{ItemKind, TreeItem};
use crate::signal::{ImageEvent, UndoEvent};
use crate::undo::{Undo, UndoAccumulator, UndoKind, UndoMode, UndoStack, UndoType};

#[derive(Debug, Default)]
pub(super) struct UndoState {
    undo_stack: UndoStack,
    redo_stack: UndoStack,
    /// Nesting depth of open groups. The outermost group sits on top of `undo_stack`.
    group_count: u32,
    pushing_group: Option<UndoType>,
    freeze_count: u32,
}

impl Image {
    #[must_use]
    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo.undo_stack
    }
    #[must_use]
    pub fn redo_stack(&self) -> &UndoStack {
        &self.undo.redo_stack
    }
    /// The type of the outermost open group, if any.
    #[must_use]
    pub fn pushing_undo_group(&self) -> Option<UndoType> {
        self.undo.pushing_group
    }
    #[must_use]
    pub fn undo_group_count(&self) -> u32 {
        self.undo.group_count
    }
    #[must_use]
    pub fn undo_is_enabled(&self) -> bool {
        self.undo.freeze_count == 0
    }

    fn undo_event(&mut self, event: UndoEvent, name: &str) {
        self.emit(ImageEvent::Undo {
            event,
            name: name.to_owned(),
        });
    }

    /// Stop recording. Mutations still happen and still dirty the image.
    pub fn undo_freeze(&mut self) {
        self.undo.freeze_count += 1;
        if self.undo.freeze_count == 1 {
            self.undo_event(UndoEvent::Freeze, "");
        }
    }
    pub fn undo_thaw(&mut self) -> Result<(), ImageError> {
        if self.undo.freeze_count == 0 {
            return Err(ImageError::contract("undo thawed more often than frozen"));
        }
        self.undo.freeze_count -= 1;
        if self.undo.freeze_count == 0 {
            self.undo_event(UndoEvent::Thaw, "");
        }
        Ok(())
    }
    pub fn undo_disable(&mut self) {
        self.undo_freeze();
    }
    /// Thaw recording, dropping the history that no longer matches the image.
    pub fn undo_enable(&mut self) -> Result<(), ImageError> {
        self.undo_free();
        self.undo_thaw()
    }

    /// Open a group. Everything pushed until the matching [`Image::undo_group_end`] pops as one
    /// step. Nested groups fold into the outermost one. Returns whether anything is recorded.
    pub fn undo_group_start(
        &mut self,
        ty: UndoType,
        name: Option<&str>,
    ) -> Result<bool, ImageError> {
        if !ty.is_group() {
            return Err(ImageError::contract(format!("{ty:?} is not a group type")));
        }
        if self.undo.group_count == 0 {
            self.mark_dirty(ty.dirty_mask());
        }
        if self.undo.freeze_count > 0 {
            return Ok(false);
        }
        self.undo.group_count += 1;
        if self.undo.group_count > 1 {
            return Ok(true);
        }
        self.free_redo();
        log::trace!("undo group start {ty:?}");
        self.undo.undo_stack.push(Undo::group(ty, name));
        self.undo.pushing_group = Some(ty);
        Ok(true)
    }
    pub fn undo_group_end(&mut self) -> Result<bool, ImageError> {
        if self.undo.freeze_count > 0 {
            return Ok(false);
        }
        if self.undo.group_count == 0 {
            return Err(ImageError::contract("undo group ended without being started"));
        }
        self.undo.group_count -= 1;
        if self.undo.group_count == 0 {
            self.undo.pushing_group = None;
            let name = self
                .undo
                .undo_stack
                .peek()
                .map(|u| u.name().to_owned())
                .unwrap_or_default();
            log::trace!("undo group end {name:?}");
            self.undo_event(UndoEvent::Pushed, &name);
            self.free_space();
        }
        Ok(true)
    }
    /// Run `f` inside an undo group. The group is closed whether or not `f` succeeds.
    pub fn undo_group<R>(
        &mut self,
        ty: UndoType,
        name: Option<&str>,
        f: impl FnOnce(&mut Self) -> Result<R, ImageError>,
    ) -> Result<R, ImageError> {
        self.undo_group_start(ty, name)?;
        let result = f(self);
        self.undo_group_end()?;
        result
    }

    /// Record a step. Marks the image dirty even when recording is frozen. Returns whether the
    /// step is in history.
    pub(crate) fn push_undo(&mut self, undo: Undo) -> bool {
        if undo.ty().is_group() {
            log::error!("{:?} pushed as a leaf step", undo.ty());
            return false;
        }
        if !undo.dirty_mask().is_empty() {
            self.mark_dirty(undo.dirty_mask());
        }
        if self.undo.freeze_count > 0 {
            return false;
        }
        log::trace!("undo push {:?} {:?}", undo.ty(), undo.name());
        self.free_redo();
        if self.undo.pushing_group.is_none() {
            let name = undo.name().to_owned();
            self.undo.undo_stack.push(undo);
            self.undo_event(UndoEvent::Pushed, &name);
            self.free_space();
            // Trimming only frees from the bottom, so the new step survives unless it was the
            // only one left.
            !self.undo.undo_stack.is_empty()
        } else if let Some(group) = self
            .undo
            .undo_stack
            .peek_mut()
            .and_then(Undo::children_mut)
        {
            group.push(undo);
            true
        } else {
            log::error!("open undo group missing from history");
            false
        }
    }
    /// Record a step that cannot be reversed. Undoing it only warns.
    pub fn push_cant_undo(&mut self, name: &str) -> bool {
        self.push_undo(Undo::new(UndoType::Cant, Some(name), UndoKind::Cant))
    }

    /// Undo the most recent step. Returns whether there was one.
    pub fn undo(&mut self) -> Result<bool, ImageError> {
        self.check_no_group()?;
        Ok(self.pop_stack(UndoMode::Undo))
    }
    pub fn redo(&mut self) -> Result<bool, ImageError> {
        self.check_no_group()?;
        Ok(self.pop_stack(UndoMode::Redo))
    }
    /// Undo, then keep undoing while the next step is a weak one such as a visibility change.
    pub fn strong_undo(&mut self) -> Result<bool, ImageError> {
        self.strong_pop(UndoMode::Undo)
    }
    /// The exact reverse of [`Image::strong_undo`].
    pub fn strong_redo(&mut self) -> Result<bool, ImageError> {
        self.strong_pop(UndoMode::Redo)
    }
    fn strong_pop(&mut self, mode: UndoMode) -> Result<bool, ImageError> {
        self.check_no_group()?;
        let peek_weak = |image: &Self| {
            let stack = match mode {
                UndoMode::Undo => &image.undo.undo_stack,
                UndoMode::Redo => &image.undo.redo_stack,
            };
            stack.peek().is_some_and(Undo::is_weak)
        };
        let mut weak = peek_weak(self);
        let popped = self.pop_stack(mode);
        while weak {
            weak = peek_weak(self);
            if weak {
                self.pop_stack(mode);
            }
        }
        Ok(popped)
    }
    fn check_no_group(&self) -> Result<(), ImageError> {
        if self.undo.pushing_group.is_some() {
            return Err(ImageError::contract("undo or redo inside an open undo group"));
        }
        Ok(())
    }
    fn pop_stack(&mut self, mode: UndoMode) -> bool {
        let popped = match mode {
            UndoMode::Undo => self.undo.undo_stack.pop(),
            UndoMode::Redo => self.undo.redo_stack.pop(),
        };
        let Some(mut undo) = popped else {
            return false;
        };
        log::trace!("{} {:?}", mode.as_ref(), undo.name());
        let mut accum = UndoAccumulator::default();
        undo.pop(self, mode, &mut accum);
        let name = undo.name().to_owned();
        match mode {
            UndoMode::Undo => self.undo.redo_stack.push(undo),
            UndoMode::Redo => self.undo.undo_stack.push(undo),
        }

        if accum.mode_changed {
            self.emit(ImageEvent::ModeChanged);
        }
        if accum.precision_changed {
            self.emit(ImageEvent::PrecisionChanged);
        }
        if let Some(size) = accum.size_changed {
            self.emit(ImageEvent::SizeChanged {
                previous_origin: size.previous_origin,
                previous_size: size.previous_size,
            });
        }
        if accum.resolution_changed {
            self.emit(ImageEvent::ResolutionChanged);
        }
        if let Some(drawable) = accum.fadeable {
            self.emit(ImageEvent::DrawableRestored(drawable));
        }
        let event = match mode {
            UndoMode::Undo => UndoEvent::Undo,
            UndoMode::Redo => UndoEvent::Redo,
        };
        self.undo_event(event, &name);
        true
    }

    /// Drop all history, undo and redo alike.
    pub fn undo_free(&mut self) {
        self.undo_event(UndoEvent::Free, "");
        for undo in self.undo.undo_stack.take_all() {
            self.free_undo(undo, UndoMode::Undo);
        }
        for undo in self.undo.redo_stack.take_all() {
            self.free_undo(undo, UndoMode::Redo);
        }
        // Nothing can refer to detached items anymore.
        self.layers.purge_detached();
        self.channels.purge_detached();
        self.vectors.purge_detached();
        if self.dirty < 0 {
            self.dirty = PERMANENTLY_DIRTY;
        }
    }
    fn free_redo(&mut self) {
        if self.undo.redo_stack.is_empty() {
            return;
        }
        while let Some(freed) = self.undo.redo_stack.free_bottom() {
            self.undo_event(UndoEvent::RedoExpired, freed.name());
            self.free_undo(freed, UndoMode::Redo);
        }
        // The steps that could have made the image clean again are gone. The counter was
        // already bumped by the push that got us here.
        if self.dirty <= 0 {
            self.dirty = PERMANENTLY_DIRTY;
        }
    }
    /// Trim history: keep at least `levels_of_undo` steps, at most `max_levels`, and otherwise
    /// stay within the byte budget.
    fn free_space(&mut self) {
        let min_levels = self.config.undo.levels_of_undo;
        let max_levels = self.config.undo.max_levels;
        let budget = self.config.undo.undo_size;
        if self.undo.undo_stack.depth() <= min_levels {
            return;
        }
        while self.undo_memsize() > budget || self.undo.undo_stack.depth() > max_levels {
            let Some(freed) = self.undo.undo_stack.free_bottom() else {
                return;
            };
            log::debug!("undo step {:?} expired", freed.name());
            self.undo_event(UndoEvent::Expired, freed.name());
            self.free_undo(freed, UndoMode::Undo);
            if self.undo.undo_stack.depth() <= min_levels {
                return;
            }
        }
    }
    /// Release what a step owns. Detached items die with the step that keeps them: removals in
    /// the undo history, additions in the redo history.
    fn free_undo(&mut self, mut undo: Undo, mode: UndoMode) {
        let ty = undo.ty();
        if let Some(children) = undo.children_mut() {
            for child in children.take_all() {
                self.free_undo(child, mode);
            }
            return;
        }
        if let UndoKind::ItemAddRemove { kind, item, .. } = undo.kind {
            let owned = match mode {
                UndoMode::Undo => !ty.is_add(),
                UndoMode::Redo => ty.is_add(),
            };
            if owned {
                self.purge_detached_item(kind, item);
            }
        }
    }
    pub(super) fn purge_detached_item(&mut self, kind: ItemKind, item: ItemId) {
        let purged = match kind {
            ItemKind::Layer => self.layers.purge(item),
            ItemKind::Channel => self.channels.purge(item),
            ItemKind::Vectors => self.vectors.purge(item),
        };
        if purged {
            log::trace!("released detached {kind:?} {item}");
        }
    }
    /// Whether any step in history is about this item.
    pub(super) fn history_refers_to(&self, id: ItemId) -> bool {
        fn refers(stack: &UndoStack, id: ItemId) -> bool {
            stack
                .iter()
                .any(|u| u.target() == Some(id) || u.children().is_some_and(|c| refers(c, id)))
        }
        refers(&self.undo.undo_stack, id) || refers(&self.undo.redo_stack, id)
    }
    /// Bytes held by the undo history.
    #[must_use]
    pub fn undo_memsize(&self) -> u64 {
        let detached = |kind: ItemKind, id: ItemId| -> u64 {
            match kind {
                ItemKind::Layer => self
                    .layers
                    .get(id)
                    .filter(|l| !l.item().is_attached())
                    .map_or(0, |l| {
                        l.buffer().memsize() + l.mask().map_or(0, |m| m.buffer().memsize())
                    }),
                ItemKind::Channel => self
                    .channels
                    .get(id)
                    .filter(|c| !c.item().is_attached())
                    .map_or(0, |c| c.buffer().memsize()),
                ItemKind::Vectors => 0,
            }
        };
        self.undo
            .undo_stack
            .iter()
            .map(|undo| undo.memsize(&detached))
            .sum()
    }

    /// The top step, if it has type `ty` and may be folded into: the image must be dirty and
    /// there must be nothing to redo.
    #[must_use]
    pub fn undo_can_compress(&self, ty: UndoType) -> Option<&Undo> {
        if !self.is_dirty() || !self.undo.redo_stack.is_empty() {
            return None;
        }
        self.undo.undo_stack.peek().filter(|undo| undo.ty() == ty)
    }
    /// The most recent pixel-region step, possibly inside a paint group holding exactly one.
    #[must_use]
    pub fn undo_get_fadeable(&self) -> Option<&Undo> {
        let top = self.undo.undo_stack.peek()?;
        let candidate = match top.children() {
            Some(children) if top.ty() == UndoType::GroupPaint => {
                let mut drawables = children
                    .iter()
                    .filter(|u| matches!(u.kind, UndoKind::Drawable { .. }));
                match (drawables.next(), drawables.next()) {
                    (Some(only), None) => only,
                    _ => return None,
                }
            }
            _ => top,
        };
        matches!(candidate.kind, UndoKind::Drawable { .. }).then_some(candidate)
    }
}

#[cfg(test)]
mod test {
    use super::super::test_util::*;
    use super::*;
    use crate::color::Color;
    use crate::config::CoreConfig;
    use crate::item::InsertParent;
    use crate::util::Rect;

    #[test]
    fn push_clears_redo_and_dirties() {
        let mut image = image(8, 8);
        filled_layer(&mut image, "a", Rect::new(0, 0, 2, 2), Color::WHITE);
        assert!(image.is_dirty());
        image.clean_all();
        image.undo().unwrap();
        assert_eq!(image.dirty_count(), -1);
        assert_eq!(image.redo_stack().depth(), 1);
        filled_layer(&mut image, "b", Rect::new(0, 0, 2, 2), Color::WHITE);
        assert!(image.redo_stack().is_empty());
        // Redo history that led back to clean is gone for good.
        assert_eq!(image.dirty_count(), PERMANENTLY_DIRTY);
    }
    #[test]
    fn groups_pop_as_one() {
        let mut image = image(8, 8);
        let events = record(&mut image);
        image
            .undo_group(UndoType::GroupMisc, Some("Two layers"), |image| {
                for name in ["a", "b"] {
                    let layer = image.new_layer(name, Rect::new(0, 0, 2, 2), true)?;
                    image.add_layer(layer, InsertParent::Toplevel, None, true)?;
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(image.undo_stack().depth(), 1);
        assert_eq!(image.undo_stack().peek().unwrap().children().unwrap().depth(), 2);
        let pushed = events
            .borrow()
            .iter()
            .filter(|e| matches!(e, ImageEvent::Undo { event: UndoEvent::Pushed, .. }))
            .count();
        assert_eq!(pushed, 1);

        image.undo().unwrap();
        assert!(image.layers().is_empty());
        image.redo().unwrap();
        assert_eq!(names(&image), vec!["b", "a"]);
    }
    #[test]
    fn nested_groups_fold() {
        let mut image = image(8, 8);
        image.undo_group_start(UndoType::GroupMisc, None).unwrap();
        image.undo_group_start(UndoType::GroupPaint, None).unwrap();
        image.push_cant_undo("inner");
        assert!(image.undo().unwrap_err().is_contract_violation());
        image.undo_group_end().unwrap();
        image.undo_group_end().unwrap();
        assert!(image.undo_group_end().unwrap_err().is_contract_violation());
        assert_eq!(image.undo_stack().depth(), 1);
        assert_eq!(image.undo_stack().peek().unwrap().ty(), UndoType::GroupMisc);
        assert!(image
            .undo_group_start(UndoType::LayerAdd, None)
            .unwrap_err()
            .is_contract_violation());
    }
    #[test]
    fn frozen_records_nothing() {
        let mut image = image(8, 8);
        image.undo_freeze();
        filled_layer(&mut image, "a", Rect::new(0, 0, 2, 2), Color::WHITE);
        assert!(image.undo_stack().is_empty());
        assert!(image.is_dirty());
        image.undo_thaw().unwrap();
        assert!(image.undo_thaw().unwrap_err().is_contract_violation());
    }
    #[test]
    fn levels_trimmed() {
        let mut config = CoreConfig::default();
        config.undo.levels_of_undo = 2;
        config.undo.max_levels = 3;
        let mut image = Image::new(
            8,
            8,
            crate::buffer::BaseType::Rgb,
            crate::buffer::Precision::U8,
            config,
        )
        .unwrap();
        for i in 0..5 {
            image.push_cant_undo(&format!("step {i}"));
        }
        assert_eq!(image.undo_stack().depth(), 3);
        assert_eq!(image.undo_stack().iter().next().unwrap().name(), "step 2");
    }
    #[test]
    fn byte_budget_keeps_minimum() {
        let mut config = CoreConfig::default();
        config.undo.levels_of_undo = 2;
        config.undo.undo_size = 0;
        let mut image = Image::new(
            8,
            8,
            crate::buffer::BaseType::Rgb,
            crate::buffer::Precision::U8,
            config,
        )
        .unwrap();
        for i in 0..5 {
            image.push_cant_undo(&format!("step {i}"));
        }
        assert_eq!(image.undo_stack().depth(), 2);
    }
    #[test]
    fn expired_removal_releases_layer() {
        let mut config = CoreConfig::default();
        config.undo.levels_of_undo = 0;
        config.undo.max_levels = 1;
        let mut image = Image::new(
            8,
            8,
            crate::buffer::BaseType::Rgb,
            crate::buffer::Precision::U8,
            config,
        )
        .unwrap();
        let layer = filled_layer(&mut image, "a", Rect::new(0, 0, 2, 2), Color::WHITE);
        image.remove_layer(layer, None, true).unwrap();
        // The removal is still undoable, the layer lives on in limbo.
        assert!(image.layers().contains(layer));
        image.push_cant_undo("something else");
        assert!(!image.layers().contains(layer));
    }
    #[test]
    fn cant_undo_warns() {
        let mut image = image(8, 8);
        let events = record(&mut image);
        image.push_cant_undo("Magic");
        image.undo().unwrap();
        assert!(events
            .borrow()
            .contains(&ImageEvent::Warning("Can't undo Magic".to_owned())));
        // Still occupies a slot in history.
        assert_eq!(image.redo_stack().depth(), 1);
    }
    #[test]
    fn strong_undo_takes_weak_steps() {
        let mut image = image(8, 8);
        let layer = filled_layer(&mut image, "a", Rect::new(0, 0, 2, 2), Color::WHITE);
        image.rename_item(layer, "renamed", true).unwrap();
        image.set_item_visible(layer, false, true).unwrap();
        image.set_layer_opacity(layer, 0.5, true).unwrap();
        image.strong_undo().unwrap();
        let item = image.item(layer).unwrap();
        assert!(item.is_visible());
        assert_eq!(item.name(), "renamed");
        assert_eq!(image.undo_stack().depth(), 2);
        image.strong_redo().unwrap();
        assert!(!image.item(layer).unwrap().is_visible());
        assert_eq!(image.layer(layer).unwrap().opacity(), 0.5);
    }
    #[test]
    fn compress_and_fadeable() {
        let mut image = image(8, 8);
        let layer = filled_layer(&mut image, "a", Rect::new(0, 0, 2, 2), Color::WHITE);
        assert!(image.undo_can_compress(UndoType::LayerAdd).is_some());
        assert!(image.undo_can_compress(UndoType::LayerOpacity).is_none());
        image
            .undo_group(UndoType::GroupPaint, None, |image| {
                image.fill_drawable(layer, None, Color::BLACK, true)
            })
            .unwrap();
        assert_eq!(image.undo_get_fadeable().and_then(Undo::target), Some(layer));
        let events = record(&mut image);
        image.undo().unwrap();
        assert!(events
            .borrow()
            .contains(&ImageEvent::DrawableRestored(layer)));
        assert!(image.undo_can_compress(UndoType::LayerAdd).is_none());
    }
    #[test]
    fn free_drops_history() {
        let mut image = image(8, 8);
        let layer = filled_layer(&mut image, "a", Rect::new(0, 0, 2, 2), Color::WHITE);
        image.remove_layer(layer, None, true).unwrap();
        image.undo_free();
        assert!(image.undo_stack().is_empty());
        assert!(!image.layers().contains(layer));
        assert!(!image.undo().unwrap());
    }
}
