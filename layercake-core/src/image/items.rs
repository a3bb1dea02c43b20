//! Creating, adding, removing and rearranging items, and their shared properties.

use std::sync::Arc;

use super::Image;
use crate::buffer::Buffer;
use crate::channel::Channel;
use crate::color::Color;
use crate::error::{ImageError, TreeError};
use crate::id::ItemId;
use crate::item::{InsertParent, Item, ItemKind, Parasite, ParasiteList, TreeItem};
use crate::layer::Layer;
use crate::signal::ImageEvent;
use crate::undo::{Undo, UndoKind, UndoType};
use crate::util::Rect;
use crate::vectors::Vectors;

fn add_type(kind: ItemKind) -> UndoType {
    match kind {
        ItemKind::Layer => UndoType::LayerAdd,
        ItemKind::Channel => UndoType::ChannelAdd,
        ItemKind::Vectors => UndoType::VectorsAdd,
    }
}
fn remove_type(kind: ItemKind) -> UndoType {
    match kind {
        ItemKind::Layer => UndoType::LayerRemove,
        ItemKind::Channel => UndoType::ChannelRemove,
        ItemKind::Vectors => UndoType::VectorsRemove,
    }
}

impl Image {
    /// A transparent, detached layer of this image's type.
    pub fn new_layer(&mut self, name: &str, rect: Rect, with_alpha: bool) -> Result<Layer, ImageError> {
        let item = Item::new(self.id, self.ids.tattoo(), name, rect);
        Ok(Layer::new(item, self.layer_format(with_alpha))?)
    }
    /// A detached layer showing `buffer` at `offset`.
    pub fn new_layer_from_buffer(
        &mut self,
        name: &str,
        buffer: Buffer,
        offset: [i32; 2],
    ) -> Layer {
        let rect = Rect::new(offset[0], offset[1], buffer.width(), buffer.height());
        let item = Item::new(self.id, self.ids.tattoo(), name, rect);
        Layer::from_buffer(item, Arc::new(buffer))
    }
    pub fn new_group_layer(&mut self, name: Option<&str>) -> Result<Layer, ImageError> {
        let name = name.unwrap_or(&self.config.names.group).to_owned();
        let item = Item::new(self.id, self.ids.tattoo(), name, Rect::new(0, 0, 1, 1));
        Ok(Layer::new_group(item, self.layer_format(true))?)
    }
    /// A canvas-sized, empty channel.
    pub fn new_channel(&mut self, name: Option<&str>, color: Color) -> Result<Channel, ImageError> {
        let name = name.unwrap_or(&self.config.names.channel).to_owned();
        let item = Item::new(self.id, self.ids.tattoo(), name, self.canvas());
        Ok(Channel::new(item, self.precision, color)?)
    }
    pub fn new_vectors(&mut self, name: Option<&str>) -> Vectors {
        let name = name.unwrap_or(&self.config.names.vectors).to_owned();
        Vectors::new(Item::new(self.id, self.ids.tattoo(), name, self.canvas()))
    }

    pub(crate) fn item_is_attached(&self, kind: ItemKind, id: ItemId) -> bool {
        match kind {
            ItemKind::Layer => self.layers.is_attached(id),
            ItemKind::Channel => self.channels.is_attached(id),
            ItemKind::Vectors => self.vectors.is_attached(id),
        }
    }
    /// Parent and index within it.
    pub(crate) fn item_position(&self, kind: ItemKind, id: ItemId) -> (Option<ItemId>, usize) {
        match kind {
            ItemKind::Layer => (self.layers.parent(id), self.layers.index(id).unwrap_or(0)),
            ItemKind::Channel => (self.channels.parent(id), self.channels.index(id).unwrap_or(0)),
            ItemKind::Vectors => (self.vectors.parent(id), self.vectors.index(id).unwrap_or(0)),
        }
    }
    #[must_use]
    pub fn active_item(&self, kind: ItemKind) -> Option<ItemId> {
        match kind {
            ItemKind::Layer => self.layers.active(),
            ItemKind::Channel => self.channels.active(),
            ItemKind::Vectors => self.vectors.active(),
        }
    }
    /// Set the active item of a kind. Unattached items are refused and leave it unchanged.
    pub(crate) fn set_active_item(&mut self, kind: ItemKind, id: Option<ItemId>) {
        if let Err(err) = self.try_set_active(kind, id) {
            log::warn!("{err}, active {} unchanged", kind.as_ref());
        }
    }
    fn try_set_active(&mut self, kind: ItemKind, id: Option<ItemId>) -> Result<(), TreeError> {
        let changed = match kind {
            ItemKind::Layer => self.layers.set_active(id)?,
            ItemKind::Channel => self.channels.set_active(id)?,
            ItemKind::Vectors => self.vectors.set_active(id)?,
        };
        if changed {
            self.emit(ImageEvent::ActiveChanged { kind, item: id });
        }
        Ok(())
    }
    pub fn set_active_layer(&mut self, id: Option<ItemId>) -> Result<(), ImageError> {
        Ok(self.try_set_active(ItemKind::Layer, id)?)
    }
    pub fn set_active_channel(&mut self, id: Option<ItemId>) -> Result<(), ImageError> {
        Ok(self.try_set_active(ItemKind::Channel, id)?)
    }
    pub fn set_active_vectors(&mut self, id: Option<ItemId>) -> Result<(), ImageError> {
        Ok(self.try_set_active(ItemKind::Vectors, id)?)
    }

    /// Attach a detached item without recording anything.
    pub(crate) fn attach_item(
        &mut self,
        kind: ItemKind,
        id: ItemId,
        parent: Option<ItemId>,
        index: usize,
    ) -> Result<(), ImageError> {
        match kind {
            ItemKind::Layer => self.layers.attach(id, parent, index)?,
            ItemKind::Channel => self.channels.attach(id, parent, index)?,
            ItemKind::Vectors => self.vectors.attach(id, parent, index)?,
        }
        self.emit(ImageEvent::ItemAdded { kind, item: id });
        self.structure_changed(kind, id);
        Ok(())
    }
    /// Detach an item without recording anything. Returns the item suggested as the new active.
    pub(crate) fn detach_item(
        &mut self,
        kind: ItemKind,
        id: ItemId,
        fallback: Option<ItemId>,
    ) -> Result<Option<ItemId>, ImageError> {
        let suggestion = match kind {
            ItemKind::Layer => self.layers.detach(id, fallback)?,
            ItemKind::Channel => self.channels.detach(id, fallback)?,
            ItemKind::Vectors => self.vectors.detach(id, fallback)?,
        };
        self.emit(ImageEvent::ItemRemoved { kind, item: id });
        self.structure_changed(kind, id);
        Ok(suggestion)
    }
    /// Redraw what an attached, detached or moved item covers.
    fn structure_changed(&mut self, kind: ItemKind, id: ItemId) {
        if let Some(rect) = self.item(id).map(Item::rect) {
            match kind {
                ItemKind::Layer => {
                    self.layers.invalidate(id, rect);
                    self.update(rect);
                }
                ItemKind::Channel => self.emit(ImageEvent::Updated(rect)),
                ItemKind::Vectors => (),
            }
        }
    }

    /// Take a new item into its tree, then attach it with undo. The item is dropped again if it
    /// can't be attached.
    fn add_item(
        &mut self,
        kind: ItemKind,
        id: ItemId,
        parent: InsertParent,
        position: Option<usize>,
        push_undo: bool,
    ) -> Result<ItemId, ImageError> {
        let result = self.attach_new_item(kind, id, parent, position, push_undo);
        if result.is_err() {
            self.purge_detached_item(kind, id);
        }
        result.map(|()| id)
    }
    fn attach_new_item(
        &mut self,
        kind: ItemKind,
        id: ItemId,
        parent: InsertParent,
        position: Option<usize>,
        push_undo: bool,
    ) -> Result<(), ImageError> {
        let (parent, index) = match kind {
            ItemKind::Layer => self.layers.insert_position(parent, position)?,
            ItemKind::Channel => self.channels.insert_position(parent, position)?,
            ItemKind::Vectors => self.vectors.insert_position(parent, position)?,
        };
        if let Some(parent) = parent {
            if !self.item_is_attached(kind, parent) {
                return Err(TreeError::NotAttached(parent).into());
            }
        }
        if push_undo {
            let prev_active = self.active_item(kind);
            self.push_undo(Undo::new(
                add_type(kind),
                None,
                UndoKind::ItemAddRemove {
                    kind,
                    item: id,
                    parent,
                    index,
                    prev_active,
                },
            ));
        }
        self.attach_item(kind, id, parent, index)?;
        self.set_active_item(kind, Some(id));
        log::debug!("added {} {id}", kind.as_ref());
        Ok(())
    }
    fn remove_item(
        &mut self,
        kind: ItemKind,
        id: ItemId,
        new_active: Option<ItemId>,
        push_undo: bool,
    ) -> Result<(), ImageError> {
        if !self.item_is_attached(kind, id) {
            return Err(TreeError::NotAttached(id).into());
        }
        if push_undo {
            let (parent, index) = self.item_position(kind, id);
            let prev_active = self.active_item(kind);
            self.push_undo(Undo::new(
                remove_type(kind),
                None,
                UndoKind::ItemAddRemove {
                    kind,
                    item: id,
                    parent,
                    index,
                    prev_active,
                },
            ));
        }
        let suggestion = self.detach_item(kind, id, new_active)?;
        if self.active_item(kind).is_none() {
            self.set_active_item(kind, suggestion);
        }
        log::debug!("removed {} {id}", kind.as_ref());
        if !push_undo && !self.history_refers_to(id) {
            self.purge_detached_item(kind, id);
        }
        Ok(())
    }

    /// Add a new layer. `position == None` puts it directly above the active layer when that
    /// lives in the chosen container. The layer becomes active.
    pub fn add_layer(
        &mut self,
        layer: Layer,
        parent: InsertParent,
        position: Option<usize>,
        push_undo: bool,
    ) -> Result<ItemId, ImageError> {
        let id = self.layers.insert_detached(layer)?;
        self.add_item(ItemKind::Layer, id, parent, position, push_undo)
    }
    /// Remove a layer and everything in it. The next active layer is `new_active` if given,
    /// otherwise a neighbour.
    pub fn remove_layer(
        &mut self,
        id: ItemId,
        new_active: Option<ItemId>,
        push_undo: bool,
    ) -> Result<(), ImageError> {
        self.remove_item(ItemKind::Layer, id, new_active, push_undo)
    }
    pub fn add_channel(
        &mut self,
        channel: Channel,
        position: Option<usize>,
        push_undo: bool,
    ) -> Result<ItemId, ImageError> {
        let id = self.channels.insert_detached(channel)?;
        self.add_item(ItemKind::Channel, id, InsertParent::Toplevel, position, push_undo)
    }
    pub fn remove_channel(
        &mut self,
        id: ItemId,
        new_active: Option<ItemId>,
        push_undo: bool,
    ) -> Result<(), ImageError> {
        self.remove_item(ItemKind::Channel, id, new_active, push_undo)
    }
    pub fn add_vectors(
        &mut self,
        vectors: Vectors,
        position: Option<usize>,
        push_undo: bool,
    ) -> Result<ItemId, ImageError> {
        let id = self.vectors.insert_detached(vectors)?;
        self.add_item(ItemKind::Vectors, id, InsertParent::Toplevel, position, push_undo)
    }
    pub fn remove_vectors(
        &mut self,
        id: ItemId,
        new_active: Option<ItemId>,
        push_undo: bool,
    ) -> Result<(), ImageError> {
        self.remove_item(ItemKind::Vectors, id, new_active, push_undo)
    }

    /// Move an item within its tree. Moving an item into itself or below itself is refused.
    /// Returns whether it moved.
    pub fn reorder_item(
        &mut self,
        id: ItemId,
        new_parent: Option<ItemId>,
        new_index: usize,
        push_undo: bool,
    ) -> Result<bool, ImageError> {
        let kind = self.tree_kind(id)?;
        let plan = match kind {
            ItemKind::Layer => self.layers.plan_reorder(id, new_parent, new_index)?,
            ItemKind::Channel => self.channels.plan_reorder(id, new_parent, new_index)?,
            ItemKind::Vectors => self.vectors.plan_reorder(id, new_parent, new_index)?,
        };
        let Some((new_parent, new_index)) = plan else {
            return Ok(false);
        };
        if push_undo {
            let (parent, index) = self.item_position(kind, id);
            self.push_undo(Undo::new(
                UndoType::ItemReorder,
                None,
                UndoKind::ItemReorder {
                    item: id,
                    parent,
                    index,
                },
            ));
        }
        self.move_item(kind, id, new_parent, new_index)
    }
    /// Move an attached item without recording anything.
    pub(crate) fn move_item(
        &mut self,
        kind: ItemKind,
        id: ItemId,
        parent: Option<ItemId>,
        index: usize,
    ) -> Result<bool, ImageError> {
        let moved = match kind {
            ItemKind::Layer => self.layers.reorder(id, parent, index)?,
            ItemKind::Channel => self.channels.reorder(id, parent, index)?,
            ItemKind::Vectors => self.vectors.reorder(id, parent, index)?,
        };
        if moved {
            self.emit(ImageEvent::ItemReordered { kind, item: id });
            self.structure_changed(kind, id);
        }
        Ok(moved)
    }
    fn tree_kind(&self, id: ItemId) -> Result<ItemKind, ImageError> {
        self.item_kind(id)
            .ok_or_else(|| TreeError::NotFound(id).into())
    }

    /// Rename any item. Names are kept unique within each tree. Returns whether it changed.
    pub fn rename_item(&mut self, id: ItemId, name: &str, push_undo: bool) -> Result<bool, ImageError> {
        let current = self.item(id).ok_or(TreeError::NotFound(id))?.name();
        if current == name {
            return Ok(false);
        }
        if push_undo {
            let previous = current.to_owned();
            self.push_undo(Undo::new(
                UndoType::ItemRename,
                None,
                UndoKind::ItemRename {
                    item: id,
                    name: previous,
                },
            ));
        }
        self.set_item_name(id, name)
    }
    pub(crate) fn set_item_name(&mut self, id: ItemId, name: &str) -> Result<bool, ImageError> {
        let changed = match self.item_kind(id) {
            Some(ItemKind::Layer) => self.layers.rename(id, name)?,
            Some(ItemKind::Channel) => self.channels.rename(id, name)?,
            Some(ItemKind::Vectors) => self.vectors.rename(id, name)?,
            None => {
                let item = self.item_mut(id).ok_or(TreeError::NotFound(id))?;
                let changed = item.name() != name;
                item.set_name(name.to_owned());
                changed
            }
        };
        if changed {
            self.emit(ImageEvent::ItemRenamed(id));
        }
        Ok(changed)
    }

    /// A copy of a layer, placed directly above it and made active. Group layers are copied
    /// with all their children.
    pub fn duplicate_layer(&mut self, id: ItemId, push_undo: bool) -> Result<ItemId, ImageError> {
        if !self.layers.is_attached(id) {
            return Err(TreeError::NotAttached(id).into());
        }
        let name = format!("{} copy", self.layers.get(id).ok_or(TreeError::NotFound(id))?.item().name());
        let copy = self.copy_layer_detached(id, Some(name), None)?;
        let (parent, index) = self.item_position(ItemKind::Layer, id);
        let position = match parent {
            Some(group) => InsertParent::Group(group),
            None => InsertParent::Toplevel,
        };
        self.add_item(ItemKind::Layer, copy, position, Some(index), push_undo)
    }
    /// Copy a layer, and for groups its subtree, into limbo. Children keep their names.
    fn copy_layer_detached(
        &mut self,
        id: ItemId,
        name: Option<String>,
        parent: Option<ItemId>,
    ) -> Result<ItemId, ImageError> {
        let item_tattoo = self.ids.tattoo();
        let mask_tattoo = self.ids.tattoo();
        let source = self.layers.get(id).ok_or(TreeError::NotFound(id))?;
        let name = name.unwrap_or_else(|| source.item().name().to_owned());
        let item = source.item().duplicate(item_tattoo, name);
        let mask_item = source
            .mask()
            .map(|mask| mask.item().duplicate(mask_tattoo, mask.item().name()));
        let copy = source.duplicate(item, mask_item);
        let is_group = copy.is_group();
        let children = self.layers.children(Some(id));

        let copy = match parent {
            Some(parent) => self.layers.insert_detached_child(parent, usize::MAX, copy)?,
            None => self.layers.insert_detached(copy)?,
        };
        if is_group {
            self.layers.suspend_resize(copy)?;
            for child in children {
                self.copy_layer_detached(child, None, Some(copy))?;
            }
            self.layers.resume_resize(copy)?;
        }
        Ok(copy)
    }

    pub fn set_item_visible(&mut self, id: ItemId, visible: bool, push_undo: bool) -> Result<(), ImageError> {
        self.set_item_flag(UndoType::ItemVisibility, id, visible, push_undo)
    }
    pub fn set_item_linked(&mut self, id: ItemId, linked: bool, push_undo: bool) -> Result<(), ImageError> {
        self.set_item_flag(UndoType::ItemLinked, id, linked, push_undo)
    }
    pub fn set_item_lock_content(&mut self, id: ItemId, lock: bool, push_undo: bool) -> Result<(), ImageError> {
        self.set_item_flag(UndoType::ItemLockContent, id, lock, push_undo)
    }
    pub fn set_item_lock_position(&mut self, id: ItemId, lock: bool, push_undo: bool) -> Result<(), ImageError> {
        self.set_item_flag(UndoType::ItemLockPosition, id, lock, push_undo)
    }
    fn set_item_flag(
        &mut self,
        ty: UndoType,
        id: ItemId,
        value: bool,
        push_undo: bool,
    ) -> Result<(), ImageError> {
        let item = self.item(id).ok_or(TreeError::NotFound(id))?;
        let current = match ty {
            UndoType::ItemVisibility => item.is_visible(),
            UndoType::ItemLinked => item.is_linked(),
            UndoType::ItemLockContent => item.is_content_locked(),
            _ => item.is_position_locked(),
        };
        if current == value {
            return Ok(());
        }
        if push_undo {
            self.push_undo(Undo::new(
                ty,
                None,
                UndoKind::ItemFlag {
                    item: id,
                    value: current,
                },
            ));
        }
        let Some(item) = self.item_mut(id) else {
            return Ok(());
        };
        match ty {
            UndoType::ItemVisibility => item.set_visible(value),
            UndoType::ItemLinked => item.set_linked(value),
            UndoType::ItemLockContent => item.set_lock_content(value),
            _ => item.set_lock_position(value),
        }
        let rect = item.rect();
        self.emit(ImageEvent::ItemFlags(id));
        if ty == UndoType::ItemVisibility {
            self.update_item(id, rect);
        }
        Ok(())
    }

    /// Whether an item, or for groups anything inside it, has its position locked.
    #[must_use]
    pub fn is_position_locked(&self, id: ItemId) -> bool {
        if self.layers.contains(id) {
            self.layers.is_position_locked(id)
        } else {
            self.item(id).is_some_and(Item::is_position_locked)
        }
    }
    /// Move an item by whole pixels. Groups move their children, paths their strokes, and
    /// channels shift their contents.
    pub fn translate_item(&mut self, id: ItemId, dx: i32, dy: i32, push_undo: bool) -> Result<(), ImageError> {
        if dx == 0 && dy == 0 {
            return Ok(());
        }
        if self.is_position_locked(id) {
            return Err(ImageError::contract(format!("{id} has its position locked")));
        }
        if self.layers.get(id).is_some_and(Layer::is_group) {
            let run = move |image: &mut Self| -> Result<(), ImageError> {
                image.suspend_group_resize(id, push_undo)?;
                for child in image.layers.children(Some(id)) {
                    image.translate_item(child, dx, dy, push_undo)?;
                }
                image.resume_group_resize(id, push_undo)
            };
            return if push_undo {
                self.undo_group(UndoType::GroupItemDisplace, None, run)
            } else {
                run(self)
            };
        }
        if self.vectors.contains(id) {
            let strokes = self
                .vectors
                .get(id)
                .map(|v| v.strokes.clone())
                .unwrap_or_default();
            if push_undo {
                self.push_undo(Undo::new(
                    UndoType::VectorsMod,
                    Some(UndoType::ItemDisplace.description()),
                    UndoKind::VectorsMod { vectors: id, strokes },
                ));
            }
            if let Some(vectors) = self.vectors.get_mut(id) {
                vectors.translate(f64::from(dx), f64::from(dy));
            }
            self.emit(ImageEvent::VectorsChanged(id));
            return Ok(());
        }
        if self.layers.contains(id) {
            let [x, y] = self.item(id).ok_or(TreeError::NotFound(id))?.offset();
            if push_undo {
                self.push_undo(Undo::new(
                    UndoType::ItemDisplace,
                    None,
                    UndoKind::ItemDisplace {
                        item: id,
                        offset: [x, y],
                    },
                ));
            }
            self.set_item_offset(id, [x + dx, y + dy]);
            return Ok(());
        }
        if self.channel(id).is_some() {
            return self.shift_channel(id, dx, dy, push_undo);
        }
        Err(TreeError::NotFound(id).into())
    }
    /// Place an item without recording anything. Layer masks follow their layer.
    pub(crate) fn set_item_offset(&mut self, id: ItemId, offset: [i32; 2]) {
        let Some(item) = self.item_mut(id) else {
            return;
        };
        let old = item.rect();
        item.set_offset(offset);
        if let Some(mask) = self.layers.get_mut(id).and_then(|l| l.mask.as_mut()) {
            mask.item.set_offset(offset);
        }
        if self.layers.contains(id) {
            self.layer_geometry_changed(id, old);
        } else {
            let new = old.translate(offset[0] - old.x, offset[1] - old.y);
            self.update_item(id, old.union(&new));
        }
        self.emit(ImageEvent::ItemMoved(id));
    }

    /// Attach a parasite to an item, or to the image with `None`. Replaces any of the same name.
    pub fn attach_parasite(
        &mut self,
        item: Option<ItemId>,
        parasite: Parasite,
        push_undo: bool,
    ) -> Result<(), ImageError> {
        let name = parasite.name().to_owned();
        let previous = self.parasite_list(item)?.find(&name).cloned();
        if push_undo && parasite.is_undoable() {
            self.push_undo(Undo::new(
                UndoType::ParasiteAttach,
                None,
                UndoKind::Parasite {
                    item,
                    name: name.clone(),
                    parasite: previous,
                },
            ));
        }
        self.parasite_list_mut(item)?.attach(parasite);
        self.emit(ImageEvent::ParasiteChanged { item, name });
        Ok(())
    }
    /// Returns whether a parasite of that name was there.
    pub fn detach_parasite(
        &mut self,
        item: Option<ItemId>,
        name: &str,
        push_undo: bool,
    ) -> Result<bool, ImageError> {
        let Some(previous) = self.parasite_list(item)?.find(name).cloned() else {
            return Ok(false);
        };
        if push_undo && previous.is_undoable() {
            self.push_undo(Undo::new(
                UndoType::ParasiteRemove,
                None,
                UndoKind::Parasite {
                    item,
                    name: name.to_owned(),
                    parasite: Some(previous),
                },
            ));
        }
        self.parasite_list_mut(item)?.detach(name);
        self.emit(ImageEvent::ParasiteChanged {
            item,
            name: name.to_owned(),
        });
        Ok(true)
    }
    fn parasite_list(&self, item: Option<ItemId>) -> Result<&ParasiteList, ImageError> {
        match item {
            Some(id) => Ok(self.item(id).ok_or(TreeError::NotFound(id))?.parasites()),
            None => Ok(&self.parasites),
        }
    }
    fn parasite_list_mut(
        &mut self,
        item: Option<ItemId>,
    ) -> Result<&mut ParasiteList, ImageError> {
        match item {
            Some(id) => Ok(self
                .item_mut(id)
                .ok_or(TreeError::NotFound(id))?
                .parasites_mut()),
            None => Ok(&mut self.parasites),
        }
    }
}

#[cfg(test)]
mod test {
    use super::super::test_util::*;
    use super::*;
    use crate::item::ParasiteFlags;

    #[test]
    fn names_stay_unique() {
        let mut image = image(8, 8);
        let ids: Vec<_> = (0..3)
            .map(|_| filled_layer(&mut image, "Layer", Rect::new(0, 0, 1, 1), Color::WHITE))
            .collect();
        let names: Vec<_> = ids
            .iter()
            .map(|id| image.item(*id).unwrap().name().to_owned())
            .collect();
        assert_eq!(names, vec!["Layer", "Layer #1", "Layer #2"]);
        assert!(image.rename_item(ids[0], "Layer #1", true).unwrap());
        assert_eq!(image.item(ids[0]).unwrap().name(), "Layer #3");
        image.undo().unwrap();
        assert_eq!(image.item(ids[0]).unwrap().name(), "Layer");
        assert!(!image.rename_item(ids[1], "Layer #1", true).unwrap());
    }
    #[test]
    fn reorder_refuses_cycles() {
        let mut image = image(8, 8);
        let outer = image.new_group_layer(None).unwrap();
        let outer = image.add_layer(outer, InsertParent::Toplevel, None, true).unwrap();
        let inner = image.new_group_layer(None).unwrap();
        let inner = image
            .add_layer(inner, InsertParent::Group(outer), None, true)
            .unwrap();
        let depth = image.undo_stack().depth();
        for parent in [outer, inner] {
            let err = image.reorder_item(outer, Some(parent), 0, true).unwrap_err();
            assert_eq!(err, ImageError::Tree(TreeError::WouldCycle(outer)));
        }
        assert_eq!(image.undo_stack().depth(), depth);
        assert_eq!(image.layers().parent(inner), Some(outer));
    }
    #[test]
    fn reorder_undo() {
        let mut image = image(8, 8);
        let a = filled_layer(&mut image, "a", Rect::new(0, 0, 1, 1), Color::WHITE);
        filled_layer(&mut image, "b", Rect::new(0, 0, 1, 1), Color::WHITE);
        filled_layer(&mut image, "c", Rect::new(0, 0, 1, 1), Color::WHITE);
        assert_eq!(names(&image), vec!["c", "b", "a"]);
        assert!(image.reorder_item(a, None, 0, true).unwrap());
        assert_eq!(names(&image), vec!["a", "c", "b"]);
        assert!(!image.reorder_item(a, None, 0, true).unwrap());
        image.undo().unwrap();
        assert_eq!(names(&image), vec!["c", "b", "a"]);
    }
    #[test]
    fn group_bounds_follow_children() {
        let mut image = image(64, 64);
        let group = image.new_group_layer(None).unwrap();
        let group = image.add_layer(group, InsertParent::Toplevel, None, true).unwrap();
        assert_eq!(image.item(group).unwrap().rect(), Rect::new(0, 0, 1, 1));
        for rect in [Rect::new(5, 5, 10, 10), Rect::new(20, 8, 4, 30)] {
            let layer = image.new_layer("child", rect, true).unwrap();
            image
                .add_layer(layer, InsertParent::Group(group), None, true)
                .unwrap();
        }
        assert_eq!(
            image.item(group).unwrap().rect(),
            Rect::from_corners(5, 5, 24, 38)
        );
        let child = image.layers().children(Some(group))[0];
        image.translate_item(child, 10, 0, true).unwrap();
        assert_eq!(
            image.item(group).unwrap().rect(),
            Rect::from_corners(5, 5, 34, 38)
        );
        image.translate_item(group, -5, -5, true).unwrap();
        assert_eq!(
            image.item(group).unwrap().rect(),
            Rect::from_corners(0, 0, 29, 33)
        );
        image.undo().unwrap();
        image.undo().unwrap();
        assert_eq!(
            image.item(group).unwrap().rect(),
            Rect::from_corners(5, 5, 24, 38)
        );
        image.remove_layer(child, None, true).unwrap();
        assert_eq!(image.item(group).unwrap().rect(), Rect::new(5, 5, 10, 10));
    }
    #[test]
    fn duplicate_group_copies_children() {
        let mut image = image(32, 32);
        let group = image.new_group_layer(Some("Group")).unwrap();
        let group = image.add_layer(group, InsertParent::Toplevel, None, true).unwrap();
        let child = image.new_layer("child", Rect::new(2, 2, 4, 4), true).unwrap();
        let child = image
            .add_layer(child, InsertParent::Group(group), None, true)
            .unwrap();
        let copy = image.duplicate_layer(group, true).unwrap();
        assert_eq!(image.layers().children(None), vec![copy, group]);
        assert_eq!(image.item(copy).unwrap().name(), "Group copy");
        let children = image.layers().children(Some(copy));
        assert_eq!(children.len(), 1);
        assert_eq!(image.item(children[0]).unwrap().name(), "child #1");
        assert_eq!(image.item(copy).unwrap().rect(), Rect::new(2, 2, 4, 4));
        assert_eq!(image.layers().active(), Some(copy));
        image.undo().unwrap();
        assert_eq!(image.layers().children(None), vec![group]);
        assert_eq!(image.layers().active(), Some(child));
    }
    #[test]
    fn position_lock_blocks_translate() {
        let mut image = image(8, 8);
        let group = image.new_group_layer(None).unwrap();
        let group = image.add_layer(group, InsertParent::Toplevel, None, true).unwrap();
        let layer = image.new_layer("x", Rect::new(0, 0, 2, 2), true).unwrap();
        let layer = image
            .add_layer(layer, InsertParent::Group(group), None, true)
            .unwrap();
        image.set_item_lock_position(layer, true, true).unwrap();
        assert!(image.is_position_locked(group));
        assert!(image
            .translate_item(group, 1, 1, true)
            .unwrap_err()
            .is_contract_violation());
    }
    #[test]
    fn channels_and_paths() {
        let mut image = image(8, 8);
        let channel = image.new_channel(None, Color::BLACK).unwrap();
        let channel = image.add_channel(channel, None, true).unwrap();
        let path = image.new_vectors(None);
        let path = image.add_vectors(path, None, true).unwrap();
        assert_eq!(image.item(channel).unwrap().name(), "Channel");
        assert_eq!(image.item(path).unwrap().name(), "Path");
        assert_eq!(image.channels().active(), Some(channel));
        image.remove_channel(channel, None, true).unwrap();
        assert!(image.channels().is_empty());
        assert_eq!(image.channels().active(), None);
        image.undo().unwrap();
        image.undo().unwrap();
        assert!(image.vectors().is_empty());
        assert_eq!(image.channels().active(), Some(channel));
    }
    #[test]
    fn unrecorded_removal_drops_item() {
        let mut image = image(8, 8);
        let layer = image.new_layer("a", Rect::new(0, 0, 1, 1), true).unwrap();
        let layer = image
            .add_layer(layer, InsertParent::Toplevel, None, false)
            .unwrap();
        image.remove_layer(layer, None, false).unwrap();
        assert!(!image.layers().contains(layer));
        assert!(image
            .remove_layer(layer, None, true)
            .unwrap_err()
            .is_contract_violation());
    }
    #[test]
    fn parasites_undo() {
        let mut image = image(8, 8);
        let layer = filled_layer(&mut image, "a", Rect::new(0, 0, 1, 1), Color::WHITE);
        let parasite = Parasite::new("note", ParasiteFlags::UNDOABLE, *b"hi");
        image.attach_parasite(Some(layer), parasite, true).unwrap();
        image
            .attach_parasite(None, Parasite::new("gamma", ParasiteFlags::UNDOABLE, [1u8]), true)
            .unwrap();
        assert!(image.detach_parasite(Some(layer), "note", true).unwrap());
        image.undo().unwrap();
        assert_eq!(
            image.item(layer).unwrap().parasites().find("note").map(Parasite::data),
            Some(&b"hi"[..])
        );
        image.undo().unwrap();
        assert!(image.parasites().is_empty());
        image.undo().unwrap();
        assert!(image.item(layer).unwrap().parasites().is_empty());
    }
}
