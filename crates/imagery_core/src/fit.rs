//! How an image is fitted into a target box.

use serde::{Deserialize, Serialize};

/// Policy for mapping an image into a width x height box.
///
/// A fit only means something together with a non-zero size; requests for the
/// original dimensions carry no fit at all.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    strum::EnumString,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImageFit {
    /// Fill the box exactly. The image may be shrunk, enlarged and cropped.
    #[display("cover")]
    Cover,
    /// Fit inside the box without enlarging or cropping.
    #[default]
    #[display("contain")]
    Contain,
}

impl ImageFit {
    /// Fit used when a size is requested without one.
    pub const DEFAULT: ImageFit = ImageFit::Contain;

    /// Lowercase name, as used in URLs and cache filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFit::Cover => "cover",
            ImageFit::Contain => "contain",
        }
    }
}
