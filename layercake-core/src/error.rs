//! Error kinds shared across the image model.
//!
//! Two families matter to callers: contract violations ([`TreeError`], [`ImageError::Contract`]),
//! which mean the caller asked for something the model forbids, and user-facing failures
//! ([`MergeError`]), which are checked before anything is mutated and carry a message fit to show.

use crate::buffer::BufferError;
use crate::id::ItemId;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    #[error("item {0} not found")]
    NotFound(ItemId),
    #[error("item {0} is already attached")]
    AlreadyAttached(ItemId),
    #[error("item {0} is not attached")]
    NotAttached(ItemId),
    #[error("item {0} belongs to another image")]
    WrongImage(ItemId),
    #[error("item {0} is part of a detached group and cannot be attached by itself")]
    NotDetachedRoot(ItemId),
    #[error("item {0} cannot hold children")]
    NotAContainer(ItemId),
    #[error("item {0} cannot be moved into itself or its descendants")]
    WouldCycle(ItemId),
    #[error("item {0} is already in the tree")]
    Duplicate(ItemId),
}

/// User-facing merge failures. Each has a stable code within the merge domain.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeError {
    #[error("There is no visible layer to merge down to.")]
    NoVisibleLayerBelow,
    #[error("Cannot merge down to a layer group.")]
    TargetIsGroup,
    #[error("The layer to merge down to is locked.")]
    TargetLocked,
    #[error("Not enough visible paths for a merge. There must be at least two.")]
    NotEnoughPaths,
}
impl MergeError {
    pub const DOMAIN: &'static str = "layercake-image-merge";
    #[must_use]
    pub fn domain(&self) -> &'static str {
        Self::DOMAIN
    }
    #[must_use]
    pub fn code(&self) -> u32 {
        match self {
            Self::NoVisibleLayerBelow => 1,
            Self::TargetIsGroup => 2,
            Self::TargetLocked => 3,
            Self::NotEnoughPaths => 4,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ImageError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("contract violation: {0}")]
    Contract(String),
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error(transparent)]
    Merge(#[from] MergeError),
}
impl ImageError {
    pub(crate) fn contract(message: impl Into<String>) -> Self {
        Self::Contract(message.into())
    }
    /// The caller broke a precondition. Fatal to the operation, which made no changes.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::Tree(_) | Self::Contract(_))
    }
}
