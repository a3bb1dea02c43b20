//! # Images
//!
//! The image owns everything placed in it: the layer, channel and path trees, the selection
//! mask, guides and sample points, parasites, and its undo history. It is the unit of
//! transactional mutation; every mutator takes a `push_undo` flag and records its inverse
//! before touching anything.
//!
//! Operations are split over submodules by subject, all as inherent methods of [`Image`].

pub mod arrange;
mod drawable;
mod duplicate;
mod items;
mod layers;
pub mod merge;
mod meta;
mod pop;
mod selection;
pub mod snap;
mod undo;

use std::sync::Arc;

pub use arrange::{AlignTarget, Alignment};
pub(crate) use drawable::Drawable;
pub use merge::{MergeOptions, MergeType};
pub use snap::SnapOptions;

use crate::buffer::{Applicator, BaseType, Buffer, BufferError, Format, Precision, ReferenceApplicator};
use crate::channel::Channel;
use crate::color::Color;
use crate::config::CoreConfig;
use crate::dirty::DirtyMask;
use crate::error::ImageError;
use crate::guide::{Grid, Guide, SamplePoint};
use crate::id::{IdCounters, ImageId, ItemId};
use crate::item::{Item, ItemKind, ItemTree, ParasiteList, TreeItem};
use crate::layer::Layer;
use crate::projection::Projection;
use crate::signal::{ImageEvent, ListenerId, Listeners};
use crate::util::Rect;
use crate::vectors::Vectors;

/// Dirty count of an image that can never become clean again through undo or redo.
const PERMANENTLY_DIRTY: i32 = 100_000;

pub struct Image {
    id: ImageId,
    width: i32,
    height: i32,
    base_type: BaseType,
    precision: Precision,
    /// Pixels per inch, horizontal and vertical.
    resolution: [f64; 2],
    layers: ItemTree<Layer>,
    channels: ItemTree<Channel>,
    vectors: ItemTree<Vectors>,
    selection: Channel,
    guides: Vec<Guide>,
    sample_points: Vec<SamplePoint>,
    grid: Option<Grid>,
    parasites: ParasiteList,
    ids: IdCounters,
    /// Number of changes since the last save. Negative when behind it in history.
    dirty: i32,
    dirty_mask: DirtyMask,
    undo: undo::UndoState,
    config: CoreConfig,
    projection: Projection,
    applicator: Box<dyn Applicator>,
    listeners: Listeners<ImageEvent>,
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("id", &self.id)
            .field("size", &[self.width, self.height])
            .field("base_type", &self.base_type)
            .field("precision", &self.precision)
            .field("layers", &self.layers.len())
            .field("channels", &self.channels.len())
            .field("vectors", &self.vectors.len())
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl Image {
    /// An empty image. Sizes must be positive.
    pub fn new(
        width: i32,
        height: i32,
        base_type: BaseType,
        precision: Precision,
        config: CoreConfig,
    ) -> Result<Self, ImageError> {
        if width <= 0 || height <= 0 {
            return Err(ImageError::contract(format!(
                "image size {width}x{height} is not positive"
            )));
        }
        let id = ImageId::next();
        let mut ids = IdCounters::default();
        let selection = Channel::new(
            Item::new(id, ids.tattoo(), "Selection Mask", Rect::new(0, 0, width, height)),
            precision,
            Color::from_straight_lossy([0.0, 0.0, 0.0, 0.5]),
        )?;
        log::debug!("new image {id} {width}x{height} {base_type:?} {precision:?}");
        Ok(Self {
            id,
            width,
            height,
            base_type,
            precision,
            resolution: [72.0, 72.0],
            layers: ItemTree::new(id),
            channels: ItemTree::new(id),
            vectors: ItemTree::new(id),
            selection,
            guides: Vec::new(),
            sample_points: Vec::new(),
            grid: config.default_grid,
            parasites: ParasiteList::default(),
            ids,
            dirty: 0,
            dirty_mask: DirtyMask::empty(),
            undo: undo::UndoState::default(),
            config,
            projection: Projection::default(),
            applicator: Box::new(ReferenceApplicator),
            listeners: Listeners::default(),
        })
    }
    /// Replace the compositing engine.
    #[must_use]
    pub fn with_applicator(mut self, applicator: Box<dyn Applicator>) -> Self {
        self.applicator = applicator;
        self.projection.reset();
        self
    }

    #[must_use]
    pub fn id(&self) -> ImageId {
        self.id
    }
    #[must_use]
    pub fn width(&self) -> i32 {
        self.width
    }
    #[must_use]
    pub fn height(&self) -> i32 {
        self.height
    }
    #[must_use]
    pub fn canvas(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }
    #[must_use]
    pub fn base_type(&self) -> BaseType {
        self.base_type
    }
    #[must_use]
    pub fn precision(&self) -> Precision {
        self.precision
    }
    /// Format of new layers in this image.
    #[must_use]
    pub fn layer_format(&self, with_alpha: bool) -> Format {
        let format = Format::new(self.base_type, self.precision, true);
        if with_alpha {
            format
        } else {
            format.without_alpha()
        }
    }
    #[must_use]
    pub fn resolution(&self) -> [f64; 2] {
        self.resolution
    }
    #[must_use]
    pub fn layers(&self) -> &ItemTree<Layer> {
        &self.layers
    }
    #[must_use]
    pub fn channels(&self) -> &ItemTree<Channel> {
        &self.channels
    }
    #[must_use]
    pub fn vectors(&self) -> &ItemTree<Vectors> {
        &self.vectors
    }
    #[must_use]
    pub fn selection(&self) -> &Channel {
        &self.selection
    }
    #[must_use]
    pub fn guides(&self) -> &[Guide] {
        &self.guides
    }
    #[must_use]
    pub fn sample_points(&self) -> &[SamplePoint] {
        &self.sample_points
    }
    #[must_use]
    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }
    #[must_use]
    pub fn parasites(&self) -> &ParasiteList {
        &self.parasites
    }
    #[must_use]
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }
    #[must_use]
    pub fn applicator(&self) -> &dyn Applicator {
        &*self.applicator
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&ImageEvent) + 'static) -> ListenerId {
        self.listeners.add(listener)
    }
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
    pub(crate) fn emit(&mut self, event: ImageEvent) {
        self.listeners.emit(&event);
    }

    /// Which tree an item lives in, if any. Layer masks and the selection live in none.
    #[must_use]
    pub fn item_kind(&self, id: ItemId) -> Option<ItemKind> {
        if self.layers.contains(id) {
            Some(ItemKind::Layer)
        } else if self.channels.contains(id) {
            Some(ItemKind::Channel)
        } else if self.vectors.contains(id) {
            Some(ItemKind::Vectors)
        } else {
            None
        }
    }
    /// Any item of this image: tree items, layer masks and the selection.
    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        match self.item_kind(id) {
            Some(ItemKind::Layer) => self.layers.get(id).map(TreeItem::item),
            Some(ItemKind::Channel) => self.channels.get(id).map(TreeItem::item),
            Some(ItemKind::Vectors) => self.vectors.get(id).map(TreeItem::item),
            None => self.channel(id).map(TreeItem::item),
        }
    }
    pub(crate) fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        match self.item_kind(id) {
            Some(ItemKind::Layer) => self.layers.get_mut(id).map(TreeItem::item_mut),
            Some(ItemKind::Channel) => self.channels.get_mut(id).map(TreeItem::item_mut),
            Some(ItemKind::Vectors) => self.vectors.get_mut(id).map(TreeItem::item_mut),
            None => self.channel_mut(id).map(TreeItem::item_mut),
        }
    }
    #[must_use]
    pub fn layer(&self, id: ItemId) -> Option<&Layer> {
        self.layers.get(id)
    }
    /// A channel from the channel tree, the selection, or a layer mask.
    #[must_use]
    pub fn channel(&self, id: ItemId) -> Option<&Channel> {
        if self.selection.item.id() == id {
            return Some(&self.selection);
        }
        if self.channels.contains(id) {
            return self.channels.get(id);
        }
        let owner = self.mask_owner(id)?;
        self.layers.get(owner)?.mask()
    }
    pub(crate) fn channel_mut(&mut self, id: ItemId) -> Option<&mut Channel> {
        if self.selection.item.id() == id {
            return Some(&mut self.selection);
        }
        if self.channels.contains(id) {
            return self.channels.get_mut(id);
        }
        let owner = self.mask_owner(id)?;
        self.layers.get_mut(owner)?.mask.as_mut()
    }
    #[must_use]
    pub fn path(&self, id: ItemId) -> Option<&Vectors> {
        self.vectors.get(id)
    }
    /// The layer whose mask this is.
    #[must_use]
    pub fn mask_owner(&self, mask: ItemId) -> Option<ItemId> {
        self.layers
            .iter_all()
            .find(|layer| layer.mask().is_some_and(|m| m.item().id() == mask))
            .map(|layer| layer.item().id())
    }
    #[must_use]
    pub fn is_selection(&self, id: ItemId) -> bool {
        self.selection.item.id() == id
    }

    /// Number of changes since the image was last clean. Zero means clean.
    #[must_use]
    pub fn dirty_count(&self) -> i32 {
        self.dirty
    }
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty != 0
    }
    /// Everything that changed since the image was last clean.
    #[must_use]
    pub fn dirty_mask(&self) -> DirtyMask {
        self.dirty_mask
    }
    pub(crate) fn mark_dirty(&mut self, mask: DirtyMask) {
        self.dirty = self.dirty.saturating_add(1);
        self.dirty_mask |= mask;
        self.emit(ImageEvent::Dirty(self.dirty));
    }
    pub(crate) fn mark_clean(&mut self, _mask: DirtyMask) {
        self.dirty = self.dirty.saturating_sub(1);
        self.emit(ImageEvent::Dirty(self.dirty));
    }
    /// Mark the current state as saved.
    pub fn clean_all(&mut self) {
        self.dirty = 0;
        self.dirty_mask = DirtyMask::empty();
        self.emit(ImageEvent::Dirty(0));
    }

    /// An image-space area needs redrawing.
    pub(crate) fn update(&mut self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        self.projection.invalidate(rect);
        self.emit(ImageEvent::Updated(rect));
    }
    /// An item's pixels changed in an image-space area. Groups above it go stale.
    pub(crate) fn update_item(&mut self, id: ItemId, rect: Rect) {
        let layer = if self.layers.contains(id) {
            Some(id)
        } else {
            self.mask_owner(id)
        };
        match layer {
            Some(layer) => {
                self.layers.invalidate(layer, rect);
                self.update(rect);
            }
            None if self.is_selection(id) => self.emit(ImageEvent::MaskChanged),
            None => self.emit(ImageEvent::Updated(rect)),
        }
    }
    /// The layer with this id changed size or moved: lay out the groups above it again.
    pub(crate) fn layer_geometry_changed(&mut self, id: ItemId, old: Rect) {
        if let Some(parent) = self.layers.parent(id) {
            self.layers.update_group(parent);
        }
        let new = self.layers.get(id).map_or(old, |l| l.item().rect());
        self.layers.invalidate(id, old.union(&new));
        self.update(old.union(&new));
    }

    /// The composite of all visible layers, recomputed where stale.
    pub fn projection(&mut self) -> Result<Arc<Buffer>, BufferError> {
        self.layers.flush_groups(&*self.applicator);
        let format = self.layer_format(true);
        self.projection.flush(
            &self.layers,
            [self.width, self.height],
            format,
            &*self.applicator,
        )
    }
    /// Bring every group layer's pixels up to date.
    pub fn flush_groups(&mut self) {
        self.layers.flush_groups(&*self.applicator);
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use crate::item::InsertParent;

    pub fn image(width: i32, height: i32) -> Image {
        Image::new(width, height, BaseType::Rgb, Precision::Float, CoreConfig::default()).unwrap()
    }
    /// Add a layer filled with `color` at `rect`.
    pub fn filled_layer(image: &mut Image, name: &str, rect: Rect, color: Color) -> ItemId {
        let mut layer = image.new_layer(name, rect, true).unwrap();
        layer.buffer_mut().set_color(Rect::new(0, 0, rect.width, rect.height), color);
        image.add_layer(layer, InsertParent::Toplevel, None, true).unwrap()
    }
    pub fn names(image: &Image) -> Vec<String> {
        image
            .layers()
            .iter()
            .map(|l| l.item().name().to_owned())
            .collect()
    }
    /// Record every event.
    pub fn record(image: &mut Image) -> std::rc::Rc<std::cell::RefCell<Vec<ImageEvent>>> {
        let events = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = events.clone();
        image.add_listener(move |event| sink.borrow_mut().push(event.clone()));
        events
    }
}

#[cfg(test)]
mod test {
    use super::test_util::*;
    use super::*;
    #[test]
    fn new_image() {
        let image = image(64, 32);
        assert_eq!(image.canvas(), Rect::new(0, 0, 64, 32));
        assert!(image.layers().is_empty());
        assert!(image.selection().is_empty());
        assert!(!image.is_dirty());
        assert!(Image::new(0, 5, BaseType::Rgb, Precision::U8, CoreConfig::default())
            .unwrap_err()
            .is_contract_violation());
    }
    #[test]
    fn projection_composites_layers() {
        let mut image = image(4, 4);
        filled_layer(&mut image, "a", Rect::new(0, 0, 2, 2), Color::WHITE);
        let pixels = image.projection().unwrap();
        assert_eq!(pixels.get(1, 1), Some([1.0; 4]));
        assert_eq!(pixels.get(3, 3), Some([0.0; 4]));
    }
    #[test]
    fn item_lookup_covers_masks_and_selection() {
        let mut image = image(4, 4);
        let selection = image.selection().item().id();
        assert!(image.item(selection).is_some());
        assert!(image.is_selection(selection));
        assert_eq!(image.item_kind(selection), None);
        let layer = filled_layer(&mut image, "a", Rect::new(0, 0, 2, 2), Color::WHITE);
        assert_eq!(image.item_kind(layer), Some(ItemKind::Layer));
        let mask = image
            .add_layer_mask(layer, crate::layer::MaskInit::White, true)
            .unwrap();
        assert_eq!(image.mask_owner(mask), Some(layer));
        assert!(image.channel(mask).is_some());
    }
}
