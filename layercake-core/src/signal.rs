//! # Signals
//!
//! Synchronous observer lists. Events fire from inside the mutating call, in the order the
//! mutations happen, and are never batched across calls.

use crate::guide::Orientation;
use crate::id::{GuideId, ItemId, SamplePointId};
use crate::item::ItemKind;
use crate::util::Rect;

/// Handle returned by [`Listeners::add`], used to unregister.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ListenerId(u64);

type Listener<E> = (ListenerId, Box<dyn FnMut(&E)>);

pub struct Listeners<E> {
    next: u64,
    // Rarely more than a view and a history panel.
    listeners: smallvec::SmallVec<[Listener<E>; 2]>,
}
impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            next: 0,
            listeners: smallvec::SmallVec::new(),
        }
    }
}
impl<E> Listeners<E> {
    pub fn add(&mut self, listener: impl FnMut(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.next);
        self.next += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }
    /// Returns whether a listener was registered under that handle.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }
    pub fn emit(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

/// Things that happen to undo history.
#[derive(strum::AsRefStr, Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum UndoEvent {
    Pushed,
    /// The oldest undo step was dropped to make room.
    Expired,
    RedoExpired,
    Undo,
    Redo,
    /// All history was dropped.
    Free,
    Freeze,
    Thaw,
}

#[derive(Clone, PartialEq, Debug)]
pub enum ImageEvent {
    ItemAdded {
        kind: ItemKind,
        item: ItemId,
    },
    ItemRemoved {
        kind: ItemKind,
        item: ItemId,
    },
    ItemReordered {
        kind: ItemKind,
        item: ItemId,
    },
    ItemRenamed(ItemId),
    /// Visibility, linked or lock flags changed.
    ItemFlags(ItemId),
    ItemMoved(ItemId),
    /// Mode, opacity, alpha lock or mask flags of a layer changed.
    LayerProperties(ItemId),
    ChannelColor(ItemId),
    VectorsChanged(ItemId),
    ActiveChanged {
        kind: ItemKind,
        item: Option<ItemId>,
    },
    /// Pixels in this image-space rectangle need redrawing.
    Updated(Rect),
    MaskChanged,
    GuideAdded(GuideId),
    GuideRemoved(GuideId),
    GuideMoved {
        guide: GuideId,
        orientation: Orientation,
        position: i32,
    },
    SamplePointAdded(SamplePointId),
    SamplePointRemoved(SamplePointId),
    SamplePointMoved(SamplePointId),
    GridChanged,
    ModeChanged,
    PrecisionChanged,
    SizeChanged {
        previous_origin: [i32; 2],
        previous_size: [i32; 2],
    },
    ResolutionChanged,
    ParasiteChanged {
        item: Option<ItemId>,
        name: String,
    },
    /// The drawable whose pixels an undo pop just restored.
    DrawableRestored(ItemId),
    /// Something the user should be told about, such as a step that can't be undone.
    Warning(String),
    /// The dirty counter changed. Zero means clean.
    Dirty(i32),
    Undo {
        event: UndoEvent,
        name: String,
    },
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    #[test]
    fn add_emit_remove() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Listeners::<u32>::default();
        let id = {
            let seen = seen.clone();
            listeners.add(move |e| seen.borrow_mut().push(*e))
        };
        listeners.emit(&1);
        assert!(listeners.remove(id));
        assert!(!listeners.remove(id));
        listeners.emit(&2);
        assert_eq!(*seen.borrow(), vec![1]);
    }
}
