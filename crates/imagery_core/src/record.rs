//! Persistent image metadata.

use crate::{ImageFormat, Rgb, id_to_folder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata row describing one uploaded image.
///
/// The metadata store owns the row and the named backend owns the bytes.
/// Cached variants are derived from both and are never authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Image id
    pub id: Uuid,
    /// Name of the backend holding the original bytes (e.g. "disk", "s3")
    pub store_name: String,
    /// Format of the stored bytes
    pub format: ImageFormat,
    /// Width of the stored image in pixels
    pub width: u32,
    /// Height of the stored image in pixels
    pub height: u32,
    /// Size of the stored bytes
    pub size: u64,
    /// Size of the bytes as uploaded, before processing
    pub upload_size: u64,
    /// Approximate average color, see [`crate::average_color`]
    pub average_color: Rgb,
    /// When the row was created
    pub created_at: DateTime<Utc>,
}

impl ImageRecord {
    /// Shard folder holding the original and its variants.
    pub fn folder(&self) -> String {
        id_to_folder(&self.id).0
    }

    /// Filename of the original, `{stem}{ext}`.
    pub fn filename(&self) -> String {
        let (_, stem) = id_to_folder(&self.id);
        stem + self.format.extension()
    }

    /// Backend-relative path of the original, `{folder}/{stem}{ext}`.
    pub fn relative_path(&self) -> String {
        format!("{}/{}", self.folder(), self.filename())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path() {
        let record = ImageRecord {
            id: Uuid::parse_str("0123abcd-0000-4000-8000-000000000001").unwrap(),
            store_name: "disk".to_string(),
            format: ImageFormat::Png,
            width: 10,
            height: 10,
            size: 100,
            upload_size: 120,
            average_color: Rgb::default(),
            created_at: Utc::now(),
        };
        assert_eq!(
            record.relative_path(),
            "01/23/0123abcd000040008000000000000001.png"
        );
    }
}
