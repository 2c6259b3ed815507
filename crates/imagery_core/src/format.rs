//! Supported image formats.

use serde::{Deserialize, Serialize};

/// Encoding of a stored or served image.
///
/// Parsing is case-sensitive and only accepts the three lowercase names;
/// anything else is rejected rather than coerced.
///
/// # Examples
///
/// ```
/// use imagery_core::ImageFormat;
///
/// let format: ImageFormat = "webp".parse().unwrap();
/// assert_eq!(format.extension(), ".webp");
/// assert!("gif".parse::<ImageFormat>().is_err());
/// ```
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
pub enum ImageFormat {
    /// JPEG, the default upload format
    #[default]
    #[display("jpeg")]
    Jpeg,
    /// WebP
    #[display("webp")]
    Webp,
    /// PNG
    #[display("png")]
    Png,
}

impl ImageFormat {
    /// Lowercase name, as used in URLs and database rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Webp => "webp",
            ImageFormat::Png => "png",
        }
    }

    /// File extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => ".jpeg",
            ImageFormat::Webp => ".webp",
            ImageFormat::Png => ".png",
        }
    }

    /// MIME type for `Content-Type` headers.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Png => "image/png",
        }
    }

    /// Map a format detected by the `image` crate, if it is one we support.
    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(ImageFormat::Jpeg),
            image::ImageFormat::WebP => Some(ImageFormat::Webp),
            image::ImageFormat::Png => Some(ImageFormat::Png),
            _ => None,
        }
    }

    /// The matching `image` crate format.
    pub fn to_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Webp => image::ImageFormat::WebP,
            ImageFormat::Png => image::ImageFormat::Png,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_parse_round_trips_every_format() {
        for format in ImageFormat::iter() {
            assert_eq!(format.as_str().parse::<ImageFormat>().unwrap(), format);
            assert_eq!(format.to_string(), format.as_str());
            assert_eq!(format.extension(), format!(".{}", format.as_str()));
        }
    }

    #[test]
    fn test_rejects_unknown_and_uppercase() {
        assert!("gif".parse::<ImageFormat>().is_err());
        assert!("JPEG".parse::<ImageFormat>().is_err());
        assert!("jpg".parse::<ImageFormat>().is_err());
        assert!("".parse::<ImageFormat>().is_err());
    }

    #[test]
    fn test_image_crate_mapping() {
        assert_eq!(
            ImageFormat::from_image_format(image::ImageFormat::WebP),
            Some(ImageFormat::Webp)
        );
        assert_eq!(ImageFormat::from_image_format(image::ImageFormat::Gif), None);
    }
}
