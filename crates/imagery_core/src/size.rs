//! Image dimensions with a compact text form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Width and height of an image, in pixels.
///
/// A size with either dimension zero means "the original dimensions".
/// The text form is `"400"` for a square and `"400x600"` otherwise.
///
/// # Examples
///
/// ```
/// use imagery_core::ImageSize;
///
/// let size: ImageSize = "300x200".parse().unwrap();
/// assert_eq!(size, ImageSize::new(300, 200));
/// assert_eq!(ImageSize::new(400, 400).to_string(), "400");
/// assert!(ImageSize::new(0, 120).is_zero());
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ImageSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl ImageSize {
    /// The canonical "original dimensions" size, rendered as `"0"`.
    pub const ZERO: ImageSize = ImageSize {
        width: 0,
        height: 0,
    };

    /// Create a size from width and height.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A square size.
    pub fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    /// True if either dimension is zero.
    pub fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Collapse every zero size to [`ImageSize::ZERO`].
    ///
    /// `0x120` and `0` both mean "original", and must sign and cache the same way.
    pub fn normalized(self) -> Self {
        if self.is_zero() { Self::ZERO } else { self }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.width == self.height {
            write!(f, "{}", self.width)
        } else {
            write!(f, "{}x{}", self.width, self.height)
        }
    }
}

impl FromStr for ImageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("Invalid image size: {:?}", s);

        let Some((width, height)) = s.split_once('x') else {
            let side = s.parse::<u32>().map_err(|_| invalid())?;
            return Ok(Self::square(side));
        };

        if height.is_empty() {
            return Err(invalid());
        }

        let width = width.parse::<u32>().map_err(|_| invalid())?;
        let height = height.parse::<u32>().map_err(|_| invalid())?;
        Ok(Self::new(width, height))
    }
}
