//! # layercake-core
//!
//! The document model of a raster image editor: items arranged in trees, group layers with
//! cached projections, the image that owns them all, and the undo machinery that makes every
//! mutation reversible.
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod blend;
pub mod buffer;
pub mod channel;
pub mod color;
pub mod config;
pub mod context;
pub mod data;
pub mod dirty;
pub mod error;
pub mod guide;
pub mod id;
pub mod image;
pub mod item;
pub mod layer;
pub mod projection;
pub mod signal;
pub mod undo;
pub mod util;
pub mod vectors;

pub use error::{ImageError, MergeError};
pub use id::{ImageId, ItemId, Tattoo};
pub use image::Image;
