//! # IDs
//!
//! Identifiers come in two flavors. Process-unique IDs ([`ItemId`], [`ImageId`]) are handed out
//! from a global counter and are never reused during this execution, so they make safe handles for
//! undo records that outlive the attachment of the thing they point at. Per-image IDs
//! ([`Tattoo`], [`GuideId`], [`SamplePointId`]) are small numbers minted by their image.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! process_unique_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(NonZeroU64);
        impl $name {
            /// Mint an ID that has never been seen before during this execution.
            #[must_use]
            pub fn next() -> Self {
                static NEXT: AtomicU64 = AtomicU64::new(1);
                let id = NEXT.fetch_add(1, Ordering::Relaxed);
                // Wrapping 2^64 allocations isn't something we'll live to see.
                Self(NonZeroU64::new(id).unwrap_or(NonZeroU64::MIN))
            }
            #[must_use]
            pub fn get(self) -> u64 {
                self.0.get()
            }
        }
        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "#{}", self.0)
            }
        }
    };
}

process_unique_id!(
    /// Handle to an item (layer, channel, path or mask) for as long as the process lives.
    ItemId
);
process_unique_id!(
    /// Handle to an image.
    ImageId
);

macro_rules! per_image_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

per_image_id!(
    /// Stable, user visible identity of an item. Survives renames and reorders, and a merge
    /// result inherits the tattoo of its bottom layer.
    Tattoo
);
per_image_id!(GuideId);
per_image_id!(SamplePointId);

/// Mints the per-image IDs. Counters only ever go up.
#[derive(Debug, Default, Clone)]
pub(crate) struct IdCounters {
    tattoo: u32,
    guide: u32,
    sample_point: u32,
}
impl IdCounters {
    pub fn tattoo(&mut self) -> Tattoo {
        self.tattoo = self.tattoo.saturating_add(1);
        Tattoo(self.tattoo)
    }
    pub fn guide(&mut self) -> GuideId {
        self.guide = self.guide.saturating_add(1);
        GuideId(self.guide)
    }
    pub fn sample_point(&mut self) -> SamplePointId {
        self.sample_point = self.sample_point.saturating_add(1);
        SamplePointId(self.sample_point)
    }
}
