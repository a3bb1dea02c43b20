//! # Group layers
//!
//! A group's pixels are the composite of its children, recomputed lazily. While its resize
//! counter is zero, the group's rectangle tracks the union of its children's rectangles and its
//! format follows from theirs. Bulk edits bracket themselves in suspend/resume pairs so the
//! group is laid out once at the end instead of after every child.

use std::sync::Arc;

use super::Layer;
use crate::buffer::{Applicator, BaseType, Buffer, Format};
use crate::error::ImageError;
use crate::id::ItemId;
use crate::item::{ItemTree, TreeItem};
use crate::projection;
use crate::util::Rect;

#[derive(Clone, Debug, Default)]
pub struct GroupLayer {
    expanded: bool,
    suspend_resize: u32,
    /// Forces the projection format while converting.
    format_override: Option<Format>,
    /// Area of the pixels that no longer matches the children, in image coordinates.
    invalid: Option<Rect>,
}
impl GroupLayer {
    pub(crate) fn duplicate(&self) -> Self {
        Self {
            expanded: self.expanded,
            suspend_resize: 0,
            format_override: None,
            invalid: None,
        }
    }
    #[must_use]
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }
    pub(crate) fn set_expanded(&mut self, expanded: bool) {
        self.expanded = expanded;
    }
    #[must_use]
    pub fn suspend_count(&self) -> u32 {
        self.suspend_resize
    }
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspend_resize > 0
    }
    #[must_use]
    pub fn invalid(&self) -> Option<Rect> {
        self.invalid
    }
    fn invalidate(&mut self, rect: Rect) {
        self.invalid = Some(self.invalid.map_or(rect, |r| r.union(&rect)));
    }
}

impl ItemTree<Layer> {
    fn group_state(&self, group: ItemId) -> Result<&GroupLayer, ImageError> {
        self.get(group)
            .ok_or_else(|| ImageError::contract(format!("no layer {group}")))?
            .group
            .as_ref()
            .ok_or_else(|| ImageError::contract(format!("layer {group} is not a group")))
    }
    fn group_state_mut(&mut self, group: ItemId) -> Option<&mut GroupLayer> {
        self.get_mut(group)?.group.as_mut()
    }

    pub(crate) fn suspend_resize(&mut self, group: ItemId) -> Result<(), ImageError> {
        self.group_state(group)?;
        if let Some(state) = self.group_state_mut(group) {
            state.suspend_resize += 1;
        }
        Ok(())
    }
    /// Decrement the resize counter, laying the group out again once it reaches zero.
    pub(crate) fn resume_resize(&mut self, group: ItemId) -> Result<(), ImageError> {
        if self.group_state(group)?.suspend_resize == 0 {
            return Err(ImageError::contract(format!(
                "group {group} resumed more often than suspended"
            )));
        }
        let resumed = self.group_state_mut(group).is_some_and(|state| {
            state.suspend_resize -= 1;
            state.suspend_resize == 0
        });
        if resumed {
            self.update_group(group);
        }
        Ok(())
    }

    /// Format the group's pixels should have: the common base type of the children (RGB when
    /// they differ) at the highest precision among them, always with alpha.
    #[must_use]
    pub fn projection_format(&self, group: ItemId) -> Option<Format> {
        let layer = self.get(group)?;
        if let Some(format) = layer.group.as_ref()?.format_override {
            return Some(format.with_alpha());
        }
        let children = self.children(Some(group));
        let formats = children.iter().filter_map(|c| self.get(*c)).map(Layer::format);
        let derived = formats.reduce(|a, b| {
            let base_type = if a.base_type == b.base_type {
                a.base_type
            } else {
                BaseType::Rgb
            };
            Format::new(base_type, a.precision.max(b.precision), true)
        });
        Some(derived.unwrap_or_else(|| layer.format()).with_alpha())
    }

    /// Re-derive the group's rectangle and format from its children, then do the same for
    /// its parent. Nothing happens while resizing is suspended.
    pub(crate) fn update_group(&mut self, group: ItemId) {
        match self.group_state(group) {
            Ok(state) if state.is_suspended() => return,
            Ok(_) => (),
            Err(_) => return,
        }
        self.relayout(group, false);
        if let Some(parent) = self.parent(group) {
            self.update_group(parent);
        }
    }
    fn relayout(&mut self, group: ItemId, force: bool) {
        let bounds = self
            .children(Some(group))
            .iter()
            .filter_map(|c| self.get(*c))
            .map(|c| c.item().rect())
            .reduce(|a, b| a.union(&b))
            .unwrap_or(Rect::new(0, 0, 1, 1));
        let Some(format) = self.projection_format(group) else {
            return;
        };
        let Some(layer) = self.get_mut(group) else {
            return;
        };
        let old = layer.item.rect();
        if force
            || bounds.width != old.width
            || bounds.height != old.height
            || format != layer.format()
        {
            match Buffer::new(bounds.width, bounds.height, format) {
                Ok(buffer) => {
                    log::trace!("group {group} reallocated to {bounds:?}");
                    layer.set_buffer(Arc::new(buffer), bounds.offset());
                }
                Err(err) => {
                    log::error!("group {group} keeps stale pixels: {err}");
                    return;
                }
            }
        } else if bounds.offset() != old.offset() {
            layer.item.set_offset(bounds.offset());
        }
        if let Some(state) = layer.group.as_mut() {
            // Children changed one way or another, the whole projection is stale.
            state.invalid = Some(bounds);
        }
    }

    /// Mark an image-space area of `item` as changed, so every group above it recomposites.
    pub(crate) fn invalidate(&mut self, item: ItemId, rect: Rect) {
        let mut current = self.parent(item);
        while let Some(group) = current {
            if let Some(state) = self.group_state_mut(group) {
                state.invalidate(rect);
            }
            current = self.parent(group);
        }
    }

    /// Bring every stale group projection up to date, children before parents.
    pub(crate) fn flush_groups(&mut self, applicator: &dyn Applicator) {
        let mut ids = self.ids_all();
        // Reversed pre-order visits descendants before their ancestors.
        ids.reverse();
        for group in ids {
            let Some(region) = self.group_state(group).ok().and_then(|s| s.invalid) else {
                continue;
            };
            let Some(pixels) = self.render_group(group, region, applicator) else {
                continue;
            };
            if let Some(layer) = self.get_mut(group) {
                layer.buffer = Arc::new(pixels);
                if let Some(state) = layer.group.as_mut() {
                    state.invalid = None;
                }
            }
        }
    }
    fn render_group(
        &self,
        group: ItemId,
        region: Rect,
        applicator: &dyn Applicator,
    ) -> Option<Buffer> {
        let layer = self.get(group)?;
        let rect = layer.item.rect();
        let mut pixels = (*layer.buffer).clone();
        if let Some(region) = region.intersect(&rect) {
            pixels.clear(Some(region.translate(-rect.x, -rect.y)));
            projection::composite_children(
                self,
                Some(group),
                &mut pixels,
                rect.offset(),
                region,
                applicator,
            );
        }
        Some(pixels)
    }

    /// Re-render the group at another format. The override only lasts for this call; the next
    /// layout derives the format from the children again.
    pub(crate) fn convert_group(
        &mut self,
        group: ItemId,
        format: Format,
        applicator: &dyn Applicator,
    ) -> Result<(), ImageError> {
        self.group_state(group)?;
        if let Some(state) = self.group_state_mut(group) {
            state.format_override = Some(format);
        }
        self.relayout(group, true);
        self.flush_groups(applicator);
        if let Some(state) = self.group_state_mut(group) {
            state.format_override = None;
        }
        Ok(())
    }

    /// Groups count as position locked when any of their descendants is.
    #[must_use]
    pub fn is_position_locked(&self, id: ItemId) -> bool {
        let locked = |id: &ItemId| self.get(*id).is_some_and(|l| l.item().is_position_locked());
        locked(&id) || self.descendants(id).iter().any(locked)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::buffer::{Precision, ReferenceApplicator};
    use crate::color::Color;
    use crate::id::{ImageId, Tattoo};
    use crate::item::Item;

    const RGBA: Format = Format::new(BaseType::Rgb, Precision::U8, true);

    struct Fixture {
        tree: ItemTree<Layer>,
        group: ItemId,
    }
    impl Fixture {
        fn new() -> Self {
            let mut tree = ItemTree::new(ImageId::next());
            let group = Layer::new_group(
                Item::new(tree.image(), Tattoo(1), "Group", Rect::default()),
                RGBA,
            )
            .unwrap();
            let group = tree.insert_detached(group).unwrap();
            tree.attach(group, None, 0).unwrap();
            Self { tree, group }
        }
        fn leaf(&mut self, rect: Rect, format: Format) -> ItemId {
            let layer = Layer::new(Item::new(self.tree.image(), Tattoo(2), "Layer", rect), format)
                .unwrap();
            self.tree.insert_detached(layer).unwrap()
        }
        fn group_rect(&self) -> Rect {
            self.tree.get(self.group).unwrap().item().rect()
        }
    }

    #[test]
    fn tracks_children_bounds() {
        let mut f = Fixture::new();
        assert_eq!(f.group_rect(), Rect::new(0, 0, 1, 1));
        let a = f.leaf(Rect::new(10, 10, 5, 5), RGBA);
        let b = f.leaf(Rect::new(-2, 12, 4, 20), RGBA);
        f.tree.attach(a, Some(f.group), 0).unwrap();
        assert_eq!(f.group_rect(), Rect::new(10, 10, 5, 5));
        f.tree.attach(b, Some(f.group), 0).unwrap();
        assert_eq!(f.group_rect(), Rect::new(-2, 10, 17, 22));
        f.tree.detach(b, None).unwrap();
        assert_eq!(f.group_rect(), Rect::new(10, 10, 5, 5));
        f.tree.detach(a, None).unwrap();
        assert_eq!(f.group_rect(), Rect::new(0, 0, 1, 1));
    }
    #[test]
    fn suspended_until_resumed() {
        let mut f = Fixture::new();
        f.tree.suspend_resize(f.group).unwrap();
        f.tree.suspend_resize(f.group).unwrap();
        let a = f.leaf(Rect::new(3, 4, 5, 6), RGBA);
        f.tree.attach(a, Some(f.group), 0).unwrap();
        assert_eq!(f.group_rect(), Rect::new(0, 0, 1, 1));
        f.tree.resume_resize(f.group).unwrap();
        assert_eq!(f.group_rect(), Rect::new(0, 0, 1, 1));
        f.tree.resume_resize(f.group).unwrap();
        assert_eq!(f.group_rect(), Rect::new(3, 4, 5, 6));
        assert!(f.tree.resume_resize(f.group).unwrap_err().is_contract_violation());
    }
    #[test]
    fn nested_groups_bubble() {
        let mut f = Fixture::new();
        let inner = Layer::new_group(
            Item::new(f.tree.image(), Tattoo(3), "Inner", Rect::default()),
            RGBA,
        )
        .unwrap();
        let inner = f.tree.insert_detached(inner).unwrap();
        f.tree.attach(inner, Some(f.group), 0).unwrap();
        let a = f.leaf(Rect::new(20, 30, 2, 2), RGBA);
        f.tree.attach(a, Some(inner), 0).unwrap();
        assert_eq!(f.group_rect(), Rect::new(20, 30, 2, 2));
    }
    #[test]
    fn format_follows_children() {
        let mut f = Fixture::new();
        let gray = Format::new(BaseType::Gray, Precision::U16, true);
        let a = f.leaf(Rect::new(0, 0, 2, 2), gray);
        f.tree.attach(a, Some(f.group), 0).unwrap();
        assert_eq!(f.tree.projection_format(f.group), Some(gray));
        let b = f.leaf(Rect::new(0, 0, 2, 2), RGBA);
        f.tree.attach(b, Some(f.group), 0).unwrap();
        assert_eq!(
            f.tree.projection_format(f.group),
            Some(Format::new(BaseType::Rgb, Precision::U16, true))
        );
        assert_eq!(f.tree.get(f.group).unwrap().format().precision, Precision::U16);
    }
    #[test]
    fn converted_format_lasts_until_relayout() {
        let mut f = Fixture::new();
        let a = f.leaf(Rect::new(0, 0, 2, 2), RGBA);
        f.tree.attach(a, Some(f.group), 0).unwrap();
        let float = Format::new(BaseType::Rgb, Precision::Float, true);
        f.tree.convert_group(f.group, float, &ReferenceApplicator).unwrap();
        assert_eq!(f.tree.get(f.group).unwrap().format(), float);
        // Nothing forces the format anymore.
        assert_eq!(f.tree.projection_format(f.group), Some(RGBA));

        let b = f.leaf(Rect::new(4, 4, 2, 2), RGBA);
        f.tree.attach(b, Some(f.group), 0).unwrap();
        assert_eq!(f.tree.get(f.group).unwrap().format(), RGBA);
        assert_eq!(f.group_rect(), Rect::new(0, 0, 6, 6));
    }
    #[test]
    fn flush_composites_children() {
        let mut f = Fixture::new();
        let a = f.leaf(Rect::new(1, 1, 2, 2), RGBA);
        f.tree
            .get_mut(a)
            .unwrap()
            .buffer_mut()
            .set_color(Rect::new(0, 0, 2, 2), Color::WHITE);
        f.tree.attach(a, Some(f.group), 0).unwrap();
        f.tree.flush_groups(&ReferenceApplicator);
        let group = f.tree.get(f.group).unwrap();
        assert!(group.group().unwrap().invalid().is_none());
        assert_eq!(group.buffer().get(1, 1), Some([1.0; 4]));
    }
}
