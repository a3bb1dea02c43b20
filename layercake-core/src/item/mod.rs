//! # Items
//!
//! Anything placed in an image: layers, channels, paths and masks. Every item shares the
//! [`Item`] core (identity, name, geometry, flags, parasites). Kinds that live in an
//! [`ItemTree`] implement [`TreeItem`].

pub mod parasite;
pub mod tree;

pub use parasite::{Parasite, ParasiteFlags, ParasiteList};
pub use tree::{InsertParent, ItemTree};

use crate::id::{ImageId, ItemId, Tattoo};
use crate::util::Rect;

#[derive(strum::AsRefStr, Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ItemKind {
    Layer,
    Channel,
    Vectors,
}

#[derive(Clone, Debug)]
pub struct Item {
    id: ItemId,
    image: ImageId,
    tattoo: Tattoo,
    name: String,
    offset: [i32; 2],
    width: i32,
    height: i32,
    visible: bool,
    linked: bool,
    lock_content: bool,
    lock_position: bool,
    parasites: ParasiteList,
    attached: bool,
    /// Set by a detach, cleared by the next attach.
    removed: bool,
}
impl Item {
    /// A fresh, detached item. Sizes are clamped to at least one pixel.
    #[must_use]
    pub fn new(image: ImageId, tattoo: Tattoo, name: impl Into<String>, rect: Rect) -> Self {
        Self {
            id: ItemId::next(),
            image,
            tattoo,
            name: name.into(),
            offset: rect.offset(),
            width: rect.width.max(1),
            height: rect.height.max(1),
            visible: true,
            linked: false,
            lock_content: false,
            lock_position: false,
            parasites: ParasiteList::default(),
            attached: false,
            removed: false,
        }
    }
    /// A detached copy with a new identity. Flags and parasites carry over.
    #[must_use]
    pub fn duplicate(&self, tattoo: Tattoo, name: impl Into<String>) -> Self {
        Self {
            id: ItemId::next(),
            tattoo,
            name: name.into(),
            attached: false,
            removed: false,
            ..self.clone()
        }
    }
    /// A detached copy belonging to another image. The tattoo and name carry over.
    #[must_use]
    pub(crate) fn copy_to(&self, image: ImageId) -> Self {
        Self {
            image,
            ..self.duplicate(self.tattoo, self.name.clone())
        }
    }
    #[must_use]
    pub fn id(&self) -> ItemId {
        self.id
    }
    #[must_use]
    pub fn image(&self) -> ImageId {
        self.image
    }
    #[must_use]
    pub fn tattoo(&self) -> Tattoo {
        self.tattoo
    }
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    #[must_use]
    pub fn offset(&self) -> [i32; 2] {
        self.offset
    }
    #[must_use]
    pub fn width(&self) -> i32 {
        self.width
    }
    #[must_use]
    pub fn height(&self) -> i32 {
        self.height
    }
    /// Offset and size, in image coordinates.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::new(self.offset[0], self.offset[1], self.width, self.height)
    }
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.linked
    }
    #[must_use]
    pub fn is_content_locked(&self) -> bool {
        self.lock_content
    }
    #[must_use]
    pub fn is_position_locked(&self) -> bool {
        self.lock_position
    }
    #[must_use]
    pub fn parasites(&self) -> &ParasiteList {
        &self.parasites
    }
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }
    pub(crate) fn set_offset(&mut self, offset: [i32; 2]) {
        self.offset = offset;
    }
    pub(crate) fn set_rect(&mut self, rect: Rect) {
        self.offset = rect.offset();
        self.width = rect.width.max(1);
        self.height = rect.height.max(1);
    }
    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
    pub(crate) fn set_linked(&mut self, linked: bool) {
        self.linked = linked;
    }
    pub(crate) fn set_lock_content(&mut self, lock: bool) {
        self.lock_content = lock;
    }
    pub(crate) fn set_lock_position(&mut self, lock: bool) {
        self.lock_position = lock;
    }
    pub(crate) fn parasites_mut(&mut self) -> &mut ParasiteList {
        &mut self.parasites
    }
    pub(crate) fn set_attached(&mut self, attached: bool) {
        self.attached = attached;
    }
    pub(crate) fn set_removed(&mut self, removed: bool) {
        self.removed = removed;
    }
}

/// An item kind that can be arranged in an [`ItemTree`].
pub trait TreeItem: Sized {
    const KIND: ItemKind;
    fn item(&self) -> &Item;
    fn item_mut(&mut self) -> &mut Item;
    /// Whether this item owns a child container.
    fn is_container(&self) -> bool {
        false
    }
    /// Called after the direct children of `parent` were added, removed, moved or resized.
    fn children_changed(_tree: &mut ItemTree<Self>, _parent: ItemId) {}
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn duplicate_new_identity() {
        let image = ImageId::next();
        let mut item = Item::new(image, Tattoo(1), "Layer", Rect::new(3, 4, 10, 20));
        item.set_visible(false);
        item.set_attached(true);
        let copy = item.duplicate(Tattoo(2), "Layer copy");
        assert_ne!(copy.id(), item.id());
        assert_eq!(copy.tattoo(), Tattoo(2));
        assert_eq!(copy.rect(), item.rect());
        assert!(!copy.is_visible());
        // Copies always start out detached.
        assert!(!copy.is_attached());
    }
    #[test]
    fn copy_keeps_tattoo() {
        let item = Item::new(ImageId::next(), Tattoo(7), "Ink", Rect::new(1, 1, 2, 2));
        let other = ImageId::next();
        let copy = item.copy_to(other);
        assert_eq!(copy.image(), other);
        assert_eq!(copy.tattoo(), Tattoo(7));
        assert_eq!(copy.name(), "Ink");
        assert_ne!(copy.id(), item.id());
    }
    #[test]
    fn size_clamped() {
        let item = Item::new(ImageId::next(), Tattoo(1), "x", Rect::new(0, 0, 0, -4));
        assert_eq!((item.width(), item.height()), (1, 1));
    }
}
