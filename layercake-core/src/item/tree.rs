//! # Item trees
//!
//! An ordered forest of one kind of item, plus the name table that keeps names unique and the
//! active item of that kind. Index 0 of any container is the top of the stack.
//!
//! Items live in an `id_tree` arena for their entire life. Attached items hang below a hidden
//! top-level node; detached ones (freshly created, or removed and kept alive by an undo record)
//! hang below a hidden limbo node, subtree intact. Detaching never loses a group's children, and
//! re-attaching is a single move. Limbo items are dropped with [`ItemTree::purge`] once nothing
//! refers to them anymore.

use id_tree::{InsertBehavior, MoveBehavior, Node, NodeId, RemoveBehavior, Tree, TreeBuilder};

use super::TreeItem;
use crate::error::TreeError;
use crate::id::{ImageId, ItemId, Tattoo};

enum Slot<T> {
    Root,
    Toplevel,
    Limbo,
    Item(T),
}
impl<T> Slot<T> {
    fn item(&self) -> Option<&T> {
        match self {
            Self::Item(t) => Some(t),
            Self::Root | Self::Toplevel | Self::Limbo => None,
        }
    }
    fn item_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Item(t) => Some(t),
            Self::Root | Self::Toplevel | Self::Limbo => None,
        }
    }
}

/// Which container a new item should go into.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InsertParent {
    Toplevel,
    Group(ItemId),
    /// The active item's parent. If the active item is itself a container, its own top.
    ActiveParent,
}
impl From<Option<ItemId>> for InsertParent {
    fn from(value: Option<ItemId>) -> Self {
        value.map_or(Self::Toplevel, Self::Group)
    }
}

pub struct ItemTree<T: TreeItem> {
    image: ImageId,
    tree: Tree<Slot<T>>,
    toplevel: NodeId,
    limbo: NodeId,
    nodes: hashbrown::HashMap<ItemId, NodeId>,
    names: hashbrown::HashMap<String, ItemId>,
    active: Option<ItemId>,
}

impl<T: TreeItem> ItemTree<T> {
    #[must_use]
    pub fn new(image: ImageId) -> Self {
        let mut tree = TreeBuilder::new()
            .with_root(Node::new(Slot::Root))
            .build();
        let root = tree
            .root_node_id()
            .cloned()
            .expect("tree was built with a root");
        let toplevel = tree
            .insert(Node::new(Slot::Toplevel), InsertBehavior::UnderNode(&root))
            .expect("root exists");
        let limbo = tree
            .insert(Node::new(Slot::Limbo), InsertBehavior::UnderNode(&root))
            .expect("root exists");
        Self {
            image,
            tree,
            toplevel,
            limbo,
            nodes: hashbrown::HashMap::new(),
            names: hashbrown::HashMap::new(),
            active: None,
        }
    }
    #[must_use]
    pub fn image(&self) -> ImageId {
        self.image
    }

    fn node_of(&self, id: ItemId) -> Result<&NodeId, TreeError> {
        self.nodes.get(&id).ok_or(TreeError::NotFound(id))
    }
    fn item_at(&self, node: &NodeId) -> Option<&T> {
        self.tree.get(node).ok()?.data().item()
    }
    fn item_at_mut(&mut self, node: &NodeId) -> Option<&mut T> {
        self.tree.get_mut(node).ok()?.data_mut().item_mut()
    }
    fn id_at(&self, node: &NodeId) -> Option<ItemId> {
        self.item_at(node).map(|t| t.item().id())
    }
    fn parent_node(&self, node: &NodeId) -> Option<&NodeId> {
        self.tree.get(node).ok()?.parent()
    }
    fn child_ids_of(&self, node: &NodeId) -> Vec<ItemId> {
        self.tree
            .children_ids(node)
            .map(|children| children.filter_map(|n| self.id_at(n)).collect())
            .unwrap_or_default()
    }
    /// The node itself followed by all of its descendants, pre-order.
    fn subtree_nodes(&self, node: &NodeId) -> Vec<NodeId> {
        self.tree
            .traverse_pre_order_ids(node)
            .map(Iterator::collect)
            .unwrap_or_default()
    }
    /// The node holding the children of `parent`, or the top-level node.
    fn container(&self, parent: Option<ItemId>) -> Result<NodeId, TreeError> {
        let Some(parent) = parent else {
            return Ok(self.toplevel.clone());
        };
        let node = self.node_of(parent)?;
        match self.item_at(node) {
            Some(item) if item.is_container() => Ok(node.clone()),
            Some(_) => Err(TreeError::NotAContainer(parent)),
            None => Err(TreeError::NotFound(parent)),
        }
    }

    /// Whether the item is known to this tree at all, attached or not.
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.nodes.contains_key(&id)
    }
    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<&T> {
        self.item_at(self.nodes.get(&id)?)
    }
    pub(crate) fn get_mut(&mut self, id: ItemId) -> Option<&mut T> {
        let node = self.nodes.get(&id)?;
        self.tree.get_mut(node).ok()?.data_mut().item_mut()
    }
    #[must_use]
    pub fn is_attached(&self, id: ItemId) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        self.tree
            .ancestor_ids(node)
            .map(|mut ancestors| ancestors.any(|n| n == &self.toplevel))
            .unwrap_or(false)
    }
    /// The containing item. `None` for top-level items and for detached roots.
    #[must_use]
    pub fn parent(&self, id: ItemId) -> Option<ItemId> {
        let node = self.nodes.get(&id)?;
        self.id_at(self.parent_node(node)?)
    }
    /// Position within the parent container, top being 0.
    #[must_use]
    pub fn index(&self, id: ItemId) -> Option<usize> {
        let node = self.nodes.get(&id)?;
        let parent = self.parent_node(node)?;
        self.tree.children_ids(parent).ok()?.position(|n| n == node)
    }
    /// Children of a container, top first. `None` is the top-level container.
    #[must_use]
    pub fn children(&self, parent: Option<ItemId>) -> Vec<ItemId> {
        self.container(parent)
            .map(|node| self.child_ids_of(&node))
            .unwrap_or_default()
    }
    #[must_use]
    pub fn n_children(&self, parent: Option<ItemId>) -> usize {
        self.container(parent)
            .ok()
            .and_then(|node| self.tree.children_ids(&node).ok().map(Iterator::count))
            .unwrap_or(0)
    }
    /// Top-level attached items, top first.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.tree
            .children_ids(&self.toplevel)
            .into_iter()
            .flatten()
            .filter_map(|n| self.item_at(n))
    }
    /// Every attached item, parents before their children.
    pub fn iter_all(&self) -> impl Iterator<Item = &T> + '_ {
        self.tree
            .traverse_pre_order_ids(&self.toplevel)
            .into_iter()
            .flatten()
            .filter_map(|n| self.tree.get(&n).ok()?.data().item())
    }
    /// IDs of every attached item, parents before their children.
    #[must_use]
    pub fn ids_all(&self) -> Vec<ItemId> {
        self.iter_all().map(|t| t.item().id()).collect()
    }
    /// Everything below `id`, attached or not, parents before children.
    #[must_use]
    pub fn descendants(&self, id: ItemId) -> Vec<ItemId> {
        let Some(node) = self.nodes.get(&id) else {
            return Vec::new();
        };
        self.subtree_nodes(node)
            .iter()
            .skip(1)
            .filter_map(|n| self.id_at(n))
            .collect()
    }
    /// Whether `ancestor` is a strict ancestor of `id`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: ItemId, id: ItemId) -> bool {
        let (Some(ancestor), Some(node)) = (self.nodes.get(&ancestor), self.nodes.get(&id)) else {
            return false;
        };
        self.tree
            .ancestor_ids(node)
            .map(|mut ancestors| ancestors.any(|n| n == ancestor))
            .unwrap_or(false)
    }
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&T> {
        self.get(*self.names.get(name)?)
    }
    #[must_use]
    pub fn get_by_tattoo(&self, tattoo: Tattoo) -> Option<&T> {
        self.iter_all().find(|t| t.item().tattoo() == tattoo)
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter_all().count()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree
            .children_ids(&self.toplevel)
            .map_or(true, |mut children| children.next().is_none())
    }
    #[must_use]
    pub fn active(&self) -> Option<ItemId> {
        self.active
    }
    /// Set the active item. Only attached items can be active. Returns whether it changed.
    pub(crate) fn set_active(&mut self, id: Option<ItemId>) -> Result<bool, TreeError> {
        if let Some(id) = id {
            if !self.is_attached(id) {
                return Err(TreeError::NotAttached(id));
            }
        }
        let changed = self.active != id;
        self.active = id;
        Ok(changed)
    }

    /// Resolve where an insertion should land. `position == None` means directly above the
    /// active item, if it lives in that container.
    pub fn insert_position(
        &self,
        parent: InsertParent,
        position: Option<usize>,
    ) -> Result<(Option<ItemId>, usize), TreeError> {
        let (parent, position) = match parent {
            InsertParent::Toplevel => (None, position),
            InsertParent::Group(group) => (Some(group), position),
            InsertParent::ActiveParent => match self.active.and_then(|a| Some((a, self.get(a)?))) {
                Some((active, item)) if item.is_container() => (Some(active), Some(0)),
                Some((active, _)) => (self.parent(active), position),
                None => (None, position),
            },
        };
        let container = self.container(parent)?;
        let position = position.unwrap_or_else(|| {
            self.active
                .and_then(|active| self.nodes.get(&active))
                .and_then(|active| {
                    self.tree
                        .children_ids(&container)
                        .ok()?
                        .position(|n| n == active)
                })
                .unwrap_or(0)
        });
        Ok((parent, position.min(self.n_children(parent))))
    }

    /// Take ownership of a new, detached item.
    pub(crate) fn insert_detached(&mut self, mut item: T) -> Result<ItemId, TreeError> {
        let id = item.item().id();
        if item.item().image() != self.image {
            return Err(TreeError::WrongImage(id));
        }
        if self.nodes.contains_key(&id) {
            return Err(TreeError::Duplicate(id));
        }
        item.item_mut().set_attached(false);
        let node = self
            .tree
            .insert(Node::new(Slot::Item(item)), InsertBehavior::UnderNode(&self.limbo))
            .map_err(|_| TreeError::NotFound(id))?;
        self.nodes.insert(id, node);
        Ok(id)
    }
    /// Take ownership of a new item as a child of a detached container. Used to assemble a group
    /// before attaching it.
    pub(crate) fn insert_detached_child(
        &mut self,
        parent: ItemId,
        position: usize,
        item: T,
    ) -> Result<ItemId, TreeError> {
        if self.is_attached(parent) {
            return Err(TreeError::AlreadyAttached(parent));
        }
        let container = self.container(Some(parent))?;
        let count = self.n_children(Some(parent));
        let id = self.insert_detached(item)?;
        let node = self.node_of(id)?.clone();
        self.tree
            .move_node(&node, MoveBehavior::ToParent(&container))
            .and_then(|()| self.tree.make_nth_sibling(&node, position.min(count)))
            .map_err(|_| TreeError::NotFound(id))?;
        T::children_changed(self, parent);
        Ok(id)
    }

    /// Insert a detached item into `parent` (or the top level) at `position`, clamped. The item
    /// and its whole subtree get unique names.
    pub(crate) fn attach(
        &mut self,
        id: ItemId,
        parent: Option<ItemId>,
        position: usize,
    ) -> Result<(), TreeError> {
        let node = self.node_of(id)?.clone();
        if self.is_attached(id) {
            return Err(TreeError::AlreadyAttached(id));
        }
        if self.parent_node(&node) != Some(&self.limbo) {
            return Err(TreeError::NotDetachedRoot(id));
        }
        if let Some(parent) = parent {
            if !self.is_attached(parent) {
                return Err(TreeError::NotAttached(parent));
            }
        }
        let container = self.container(parent)?;
        let count = self.tree.children_ids(&container).map_or(0, Iterator::count);
        self.tree
            .move_node(&node, MoveBehavior::ToParent(&container))
            .and_then(|()| self.tree.make_nth_sibling(&node, position.min(count)))
            .map_err(|_| TreeError::NotFound(id))?;

        for n in self.subtree_nodes(&node) {
            if let Some(item) = self.item_at_mut(&n) {
                item.item_mut().set_attached(true);
                let child = item.item().id();
                self.uniquify_name(child, None);
            }
        }
        if let Some(item) = self.get_mut(id) {
            item.item_mut().set_removed(false);
        }
        log::debug!("attached {:?} {id} under {parent:?}", T::KIND);
        if let Some(parent) = parent {
            T::children_changed(self, parent);
        }
        Ok(())
    }
    /// Move an attached item and its subtree into limbo. Returns the item that should become
    /// active: `fallback` if given, else the item now at the vacated index, else the parent.
    pub(crate) fn detach(
        &mut self,
        id: ItemId,
        fallback: Option<ItemId>,
    ) -> Result<Option<ItemId>, TreeError> {
        let node = self.node_of(id)?.clone();
        if !self.is_attached(id) {
            return Err(TreeError::NotAttached(id));
        }
        let parent = self.parent(id);
        let index = self.index(id).unwrap_or(0);

        let mut subtree = Vec::new();
        for n in self.subtree_nodes(&node) {
            if let Some(child) = self.id_at(&n) {
                self.forget_name(child);
                subtree.push(child);
            }
            if let Some(item) = self.item_at_mut(&n) {
                item.item_mut().set_attached(false);
            }
        }
        self.tree
            .move_node(&node, MoveBehavior::ToParent(&self.limbo))
            .map_err(|_| TreeError::NotFound(id))?;
        if let Some(item) = self.get_mut(id) {
            item.item_mut().set_removed(true);
        }
        if self.active.is_some_and(|active| subtree.contains(&active)) {
            self.active = None;
        }
        log::debug!("detached {:?} {id} from {parent:?}", T::KIND);

        let suggestion = fallback.or_else(|| {
            let siblings = self.children(parent);
            if siblings.is_empty() {
                parent
            } else {
                siblings.get(index.min(siblings.len() - 1)).copied()
            }
        });
        if let Some(parent) = parent {
            T::children_changed(self, parent);
        }
        Ok(suggestion)
    }

    /// Where a reorder would put the item, or `None` if it would change nothing.
    pub(crate) fn plan_reorder(
        &self,
        id: ItemId,
        new_parent: Option<ItemId>,
        new_index: usize,
    ) -> Result<Option<(Option<ItemId>, usize)>, TreeError> {
        if !self.is_attached(id) {
            return Err(TreeError::NotAttached(id));
        }
        if let Some(new_parent) = new_parent {
            if new_parent == id || self.is_ancestor(id, new_parent) {
                return Err(TreeError::WouldCycle(id));
            }
            if !self.is_attached(new_parent) {
                return Err(TreeError::NotAttached(new_parent));
            }
        }
        // Also validates that the parent can hold children.
        self.container(new_parent)?;
        let old_parent = self.parent(id);
        let mut n_items = self.n_children(new_parent);
        if old_parent == new_parent {
            n_items = n_items.saturating_sub(1);
        }
        let new_index = new_index.min(n_items);
        if old_parent == new_parent && self.index(id) == Some(new_index) {
            return Ok(None);
        }
        Ok(Some((new_parent, new_index)))
    }
    /// Move an attached item, possibly into another container. Returns whether anything moved.
    pub(crate) fn reorder(
        &mut self,
        id: ItemId,
        new_parent: Option<ItemId>,
        new_index: usize,
    ) -> Result<bool, TreeError> {
        let Some((new_parent, new_index)) = self.plan_reorder(id, new_parent, new_index)? else {
            return Ok(false);
        };
        let node = self.node_of(id)?.clone();
        let old_parent = self.parent(id);
        if old_parent != new_parent {
            let container = self.container(new_parent)?;
            self.tree
                .move_node(&node, MoveBehavior::ToParent(&container))
                .map_err(|_| TreeError::NotFound(id))?;
        }
        self.tree
            .make_nth_sibling(&node, new_index)
            .map_err(|_| TreeError::NotFound(id))?;
        if let Some(old_parent) = old_parent {
            T::children_changed(self, old_parent);
        }
        if let Some(new_parent) = new_parent.filter(|p| Some(*p) != old_parent) {
            T::children_changed(self, new_parent);
        }
        Ok(true)
    }
    /// Rename, uniquifying against the rest of the tree when attached. Returns whether the name
    /// changed at all.
    pub(crate) fn rename(&mut self, id: ItemId, name: &str) -> Result<bool, TreeError> {
        let current = self.get(id).ok_or(TreeError::NotFound(id))?;
        if current.item().name() == name {
            return Ok(false);
        }
        if self.is_attached(id) {
            self.uniquify_name(id, Some(name.to_owned()));
        } else if let Some(item) = self.get_mut(id) {
            item.item_mut().set_name(name.to_owned());
        }
        Ok(true)
    }

    /// Drop a detached item and its subtree for good. Returns whether anything was dropped.
    pub(crate) fn purge(&mut self, id: ItemId) -> bool {
        let Some(node) = self.nodes.get(&id).cloned() else {
            return false;
        };
        if self.is_attached(id) {
            return false;
        }
        for n in self.subtree_nodes(&node) {
            if let Some(child) = self.id_at(&n) {
                self.nodes.remove(&child);
            }
        }
        log::trace!("purged {:?} {id}", T::KIND);
        self.tree
            .remove_node(node, RemoveBehavior::DropChildren)
            .is_ok()
    }
    /// Drop everything in limbo.
    pub(crate) fn purge_detached(&mut self) {
        for id in self.child_ids_of(&self.limbo) {
            self.purge(id);
        }
    }

    fn forget_name(&mut self, id: ItemId) {
        let Some(name) = self.get(id).map(|t| t.item().name().to_owned()) else {
            return;
        };
        if self.names.get(&name) == Some(&id) {
            self.names.remove(&name);
        }
    }
    /// Make the item's name (or `new_name`) unique in this tree and record it.
    fn uniquify_name(&mut self, id: ItemId, new_name: Option<String>) {
        if let Some(new_name) = new_name {
            self.forget_name(id);
            if let Some(item) = self.get_mut(id) {
                item.item_mut().set_name(new_name);
            }
        }
        let Some(current) = self.get(id).map(|t| t.item().name().to_owned()) else {
            return;
        };
        let name = match self.names.get(&current) {
            Some(owner) if *owner != id => {
                let (base, mut number) = split_number_suffix(&current);
                loop {
                    number = number.saturating_add(1);
                    let candidate = format!("{base} #{number}");
                    if !self.names.contains_key(&candidate) {
                        break candidate;
                    }
                }
            }
            _ => current,
        };
        if let Some(item) = self.get_mut(id) {
            item.item_mut().set_name(name.clone());
        }
        self.names.insert(name, id);
    }
}

/// Split `"Name #12"` into `("Name", 12)`. Only an exact decimal rendering after the last `#`
/// counts as a number, so `"Name #012"` is left alone.
pub(crate) fn split_number_suffix(name: &str) -> (&str, i64) {
    if let Some(hash) = name.rfind('#') {
        let digits = &name[hash + 1..];
        if let Ok(number) = digits.parse::<i64>() {
            if number.to_string() == digits {
                let base = &name[..hash];
                return (base.strip_suffix(' ').unwrap_or(base), number);
            }
        }
    }
    (name, 0)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::item::{Item, ItemKind};
    use crate::util::Rect;

    struct Thing {
        item: Item,
        container: bool,
    }
    impl TreeItem for Thing {
        const KIND: ItemKind = ItemKind::Layer;
        fn item(&self) -> &Item {
            &self.item
        }
        fn item_mut(&mut self) -> &mut Item {
            &mut self.item
        }
        fn is_container(&self) -> bool {
            self.container
        }
    }

    fn thing(tree: &mut ItemTree<Thing>, name: &str, container: bool) -> ItemId {
        let item = Item::new(tree.image(), Tattoo(0), name, Rect::new(0, 0, 1, 1));
        tree.insert_detached(Thing { item, container }).unwrap()
    }
    fn name(tree: &ItemTree<Thing>, id: ItemId) -> &str {
        tree.get(id).unwrap().item().name()
    }

    #[test]
    fn suffix_parse() {
        assert_eq!(split_number_suffix("Layer"), ("Layer", 0));
        assert_eq!(split_number_suffix("Layer #3"), ("Layer", 3));
        assert_eq!(split_number_suffix("Layer#3"), ("Layer", 3));
        assert_eq!(split_number_suffix("Layer #03"), ("Layer #03", 0));
        assert_eq!(split_number_suffix("Layer #x"), ("Layer #x", 0));
    }
    #[test]
    fn unique_names() {
        let mut tree = ItemTree::new(ImageId::next());
        let a = thing(&mut tree, "Layer", false);
        let b = thing(&mut tree, "Layer", false);
        let c = thing(&mut tree, "Layer", false);
        tree.attach(a, None, 0).unwrap();
        tree.attach(b, None, 0).unwrap();
        tree.attach(c, None, 0).unwrap();
        assert_eq!(name(&tree, a), "Layer");
        assert_eq!(name(&tree, b), "Layer #1");
        assert_eq!(name(&tree, c), "Layer #2");
        // Counting continues from an existing suffix.
        let d = thing(&mut tree, "Layer #1", false);
        tree.attach(d, None, 0).unwrap();
        assert_eq!(name(&tree, d), "Layer #3");
        // Freed names are reused.
        tree.detach(b, None).unwrap();
        let e = thing(&mut tree, "Layer", false);
        tree.attach(e, None, 0).unwrap();
        assert_eq!(name(&tree, e), "Layer #1");
    }
    #[test]
    fn rename_uniquifies() {
        let mut tree = ItemTree::new(ImageId::next());
        let a = thing(&mut tree, "A", false);
        let b = thing(&mut tree, "B", false);
        tree.attach(a, None, 0).unwrap();
        tree.attach(b, None, 0).unwrap();
        assert!(!tree.rename(a, "A").unwrap());
        assert!(tree.rename(b, "A").unwrap());
        assert_eq!(name(&tree, b), "A #1");
        // The old name is free again.
        assert!(tree.rename(a, "B").unwrap());
        assert_eq!(name(&tree, a), "B");
        assert_eq!(tree.get_by_name("A #1").map(|t| t.item().id()), Some(b));
        assert!(tree.get_by_name("A").is_none());
    }
    #[test]
    fn attach_clamps_and_orders() {
        let mut tree = ItemTree::new(ImageId::next());
        let a = thing(&mut tree, "a", false);
        let b = thing(&mut tree, "b", false);
        tree.attach(a, None, 100).unwrap();
        tree.attach(b, None, 100).unwrap();
        assert_eq!(tree.children(None), vec![a, b]);
        assert_eq!(tree.index(b), Some(1));
        assert_eq!(tree.attach(a, None, 0), Err(TreeError::AlreadyAttached(a)));
    }
    #[test]
    fn detach_suggests_active() {
        let mut tree = ItemTree::new(ImageId::next());
        let group = thing(&mut tree, "g", true);
        tree.attach(group, None, 0).unwrap();
        let a = thing(&mut tree, "a", false);
        let b = thing(&mut tree, "b", false);
        tree.attach(a, Some(group), 0).unwrap();
        tree.attach(b, Some(group), 1).unwrap();
        // Removing the bottom child suggests the one now at the clamped index.
        assert_eq!(tree.detach(b, None).unwrap(), Some(a));
        // Removing the last child falls back to the parent.
        assert_eq!(tree.detach(a, None).unwrap(), Some(group));
        assert!(tree.get(a).unwrap().item().is_removed());
        // Re-attaching clears it.
        tree.attach(a, Some(group), 0).unwrap();
        assert!(!tree.get(a).unwrap().item().is_removed());
        assert_eq!(tree.detach(a, Some(group)).unwrap(), Some(group));
    }
    #[test]
    fn detached_group_keeps_children() {
        let mut tree = ItemTree::new(ImageId::next());
        let group = thing(&mut tree, "g", true);
        tree.attach(group, None, 0).unwrap();
        let child = thing(&mut tree, "child", false);
        tree.attach(child, Some(group), 0).unwrap();
        tree.detach(group, None).unwrap();
        assert!(!tree.is_attached(child));
        assert_eq!(tree.parent(child), Some(group));
        // Names of the whole subtree were released.
        assert!(tree.get_by_name("child").is_none());
        tree.attach(group, None, 0).unwrap();
        assert!(tree.is_attached(child));
        assert_eq!(tree.ids_all(), vec![group, child]);
        // A nested item can't be attached by itself.
        tree.detach(group, None).unwrap();
        assert_eq!(tree.attach(child, None, 0), Err(TreeError::NotDetachedRoot(child)));
    }
    #[test]
    fn reorder_rejects_cycles() {
        let mut tree = ItemTree::new(ImageId::next());
        let outer = thing(&mut tree, "outer", true);
        let inner = thing(&mut tree, "inner", true);
        tree.attach(outer, None, 0).unwrap();
        tree.attach(inner, Some(outer), 0).unwrap();
        assert_eq!(tree.reorder(outer, Some(outer), 0), Err(TreeError::WouldCycle(outer)));
        assert_eq!(tree.reorder(outer, Some(inner), 0), Err(TreeError::WouldCycle(outer)));
        // Nothing moved.
        assert_eq!(tree.children(None), vec![outer]);
        assert_eq!(tree.parent(inner), Some(outer));
    }
    #[test]
    fn reorder_moves() {
        let mut tree = ItemTree::new(ImageId::next());
        let group = thing(&mut tree, "g", true);
        let a = thing(&mut tree, "a", false);
        let b = thing(&mut tree, "b", false);
        tree.attach(group, None, 0).unwrap();
        tree.attach(a, None, 1).unwrap();
        tree.attach(b, None, 2).unwrap();
        // Same container, clamped to the last slot.
        assert!(tree.reorder(group, None, 99).unwrap());
        assert_eq!(tree.children(None), vec![a, b, group]);
        // No-op.
        assert!(!tree.reorder(group, None, 2).unwrap());
        // Across containers.
        assert!(tree.reorder(a, Some(group), 0).unwrap());
        assert_eq!(tree.children(None), vec![b, group]);
        assert_eq!(tree.children(Some(group)), vec![a]);
        // Leaves can't be parents.
        assert_eq!(tree.reorder(b, Some(a), 0), Err(TreeError::NotAContainer(a)));
    }
    #[test]
    fn insert_position_above_active() {
        let mut tree = ItemTree::new(ImageId::next());
        let a = thing(&mut tree, "a", false);
        let b = thing(&mut tree, "b", false);
        tree.attach(a, None, 0).unwrap();
        tree.attach(b, None, 1).unwrap();
        assert_eq!(tree.insert_position(InsertParent::Toplevel, None).unwrap(), (None, 0));
        tree.set_active(Some(b)).unwrap();
        assert_eq!(tree.insert_position(InsertParent::Toplevel, None).unwrap(), (None, 1));
        assert_eq!(tree.insert_position(InsertParent::ActiveParent, Some(7)).unwrap(), (None, 2));
        let group = thing(&mut tree, "g", true);
        tree.attach(group, None, 0).unwrap();
        tree.set_active(Some(group)).unwrap();
        assert_eq!(
            tree.insert_position(InsertParent::ActiveParent, None).unwrap(),
            (Some(group), 0)
        );
    }
    #[test]
    fn purge_drops_subtree() {
        let mut tree = ItemTree::new(ImageId::next());
        let group = thing(&mut tree, "g", true);
        let child = tree
            .insert_detached_child(
                group,
                0,
                Thing {
                    item: Item::new(tree.image(), Tattoo(0), "c", Rect::new(0, 0, 1, 1)),
                    container: false,
                },
            )
            .unwrap();
        assert_eq!(tree.parent(child), Some(group));
        assert!(tree.purge(group));
        assert!(!tree.contains(group));
        assert!(!tree.contains(child));
        // Attached items are never purged.
        let a = thing(&mut tree, "a", false);
        tree.attach(a, None, 0).unwrap();
        assert!(!tree.purge(a));
    }
}
