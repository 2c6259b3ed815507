//! Core data types for the Imagery image subsystem.
//!
//! This crate provides the small self-describing value types shared by every
//! other Imagery crate, the persistent [`ImageRecord`], and the two pure
//! algorithms that run on decoded pixels: [`average_color`] and
//! [`image_contain_size`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod color;
mod fit;
mod folder;
mod format;
mod geometry;
mod record;
mod rgb;
mod size;

pub use color::average_color;
pub use fit::ImageFit;
pub use folder::{VARIANT_SEPARATOR, id_to_folder};
pub use format::ImageFormat;
pub use geometry::image_contain_size;
pub use record::ImageRecord;
pub use rgb::Rgb;
pub use size::ImageSize;
