//! Categories of change, used to drive minimal invalidation.

bitflags::bitflags! {
    /// What kind of invalidation an undo (or any mutation) implies.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
    pub struct DirtyMask: u32 {
        const IMAGE = 1 << 0;
        const IMAGE_SIZE = 1 << 1;
        const IMAGE_META = 1 << 2;
        const IMAGE_STRUCTURE = 1 << 3;
        const ITEM = 1 << 4;
        const ITEM_META = 1 << 5;
        const DRAWABLE = 1 << 6;
        const VECTORS = 1 << 7;
        const SELECTION = 1 << 8;
        const ACTIVE_DRAWABLE = 1 << 9;
        const ALL = 0xffff;
    }
}
