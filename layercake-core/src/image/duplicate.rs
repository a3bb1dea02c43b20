//! Copying a whole image.

use super::Image;
use crate::error::{ImageError, TreeError};
use crate::id::ItemId;
use crate::item::TreeItem;
use crate::vectors::Vectors;

impl Image {
    /// A new image with the same trees, guides, sample points and attributes. Items keep their
    /// names and tattoos but get new ids. Pixels are shared until either image writes them.
    ///
    /// The copy starts clean, with no undo history and no listeners, compositing through the
    /// default applicator.
    pub fn duplicate(&self) -> Result<Image, ImageError> {
        let mut image = Image::new(
            self.width,
            self.height,
            self.base_type,
            self.precision,
            self.config.clone(),
        )?;
        image.resolution = self.resolution;
        image.grid = self.grid;
        image.guides = self.guides.clone();
        image.sample_points = self.sample_points.clone();
        image.parasites = self.parasites.clone();
        image.ids = self.ids.clone();
        image.selection = self
            .selection
            .duplicate(self.selection.item().copy_to(image.id));

        let mut copies = hashbrown::HashMap::new();
        for (index, id) in self.layers.children(None).into_iter().enumerate() {
            let copy = self.copy_layer_into(&mut image, id, None, &mut copies)?;
            image.layers.attach(copy, None, index)?;
        }
        for (index, id) in self.channels.children(None).into_iter().enumerate() {
            let source = self.channels.get(id).ok_or(TreeError::NotFound(id))?;
            let copy = source.duplicate(source.item().copy_to(image.id));
            let copy = image.channels.insert_detached(copy)?;
            image.channels.attach(copy, None, index)?;
            copies.insert(id, copy);
        }
        for (index, id) in self.vectors.children(None).into_iter().enumerate() {
            let source = self.vectors.get(id).ok_or(TreeError::NotFound(id))?;
            let copy = Vectors {
                item: source.item().copy_to(image.id),
                strokes: source.strokes.clone(),
            };
            let copy = image.vectors.insert_detached(copy)?;
            image.vectors.attach(copy, None, index)?;
            copies.insert(id, copy);
        }

        let copied = |active: Option<ItemId>| active.and_then(|id| copies.get(&id).copied());
        image.layers.set_active(copied(self.layers.active()))?;
        image.channels.set_active(copied(self.channels.active()))?;
        image.vectors.set_active(copied(self.vectors.active()))?;
        image.clean_all();
        log::debug!("duplicated image {} as {}", self.id, image.id);
        Ok(image)
    }

    /// Copy a layer, and for groups its subtree, into `image`'s limbo.
    fn copy_layer_into(
        &self,
        image: &mut Image,
        id: ItemId,
        parent: Option<ItemId>,
        copies: &mut hashbrown::HashMap<ItemId, ItemId>,
    ) -> Result<ItemId, ImageError> {
        let source = self.layers.get(id).ok_or(TreeError::NotFound(id))?;
        let mask_item = source.mask().map(|mask| mask.item().copy_to(image.id));
        let copy = source.duplicate(source.item().copy_to(image.id), mask_item);
        let copy = match parent {
            Some(parent) => image.layers.insert_detached_child(parent, usize::MAX, copy)?,
            None => image.layers.insert_detached(copy)?,
        };
        copies.insert(id, copy);
        if source.is_group() {
            image.layers.suspend_resize(copy)?;
            for child in self.layers.children(Some(id)) {
                self.copy_layer_into(image, child, Some(copy), copies)?;
            }
            image.layers.resume_resize(copy)?;
        }
        Ok(copy)
    }
}
