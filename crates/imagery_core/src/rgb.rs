//! RGB color with text and fixed-width binary encodings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An RGB color with channels in the range 0..=255.
///
/// Channels are stored as `u32` so the binary form is three little-endian
/// 32-bit integers (12 bytes), the layout used by the `average_color` column.
/// In JSON the color is written in its text form, `rgb(r,g,b)`.
///
/// # Examples
///
/// ```
/// use imagery_core::Rgb;
///
/// let color: Rgb = "rgb(10, 20, 30)".parse().unwrap();
/// assert_eq!(color.to_string(), "rgb(10,20,30)");
/// assert_eq!(Rgb::from_bytes(&color.to_bytes()).unwrap(), color);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    /// Red channel
    pub red: u32,
    /// Green channel
    pub green: u32,
    /// Blue channel
    pub blue: u32,
}

impl Rgb {
    /// Width of the binary encoding.
    pub const ENCODED_LEN: usize = 12;

    /// Create a color from its channels.
    pub fn new(red: u32, green: u32, blue: u32) -> Self {
        Self { red, green, blue }
    }

    /// Encode as three little-endian `u32`s.
    pub fn to_bytes(&self) -> [u8; Self::ENCODED_LEN] {
        let mut bytes = [0u8; Self::ENCODED_LEN];
        bytes[0..4].copy_from_slice(&self.red.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.green.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.blue.to_le_bytes());
        bytes
    }

    /// Decode the binary form. Trailing bytes past the first 12 are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() < Self::ENCODED_LEN {
            return Err(format!(
                "RGB value is too short: {} bytes, expected {}",
                bytes.len(),
                Self::ENCODED_LEN
            ));
        }
        let channel = |at: usize| {
            u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        Ok(Self::new(channel(0), channel(4), channel(8)))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.red, self.green, self.blue)
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("Invalid RGB value: {:?}", s);

        let inner = s
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(invalid)?;

        let channels = inner
            .split(',')
            .map(|part| part.trim().parse::<u32>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;

        match channels.as_slice() {
            [red, green, blue] => Ok(Self::new(*red, *green, *blue)),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_string()
    }
}
