//! Storage trait definition.

use imagery_core::ImageRecord;
use imagery_error::ImageryResult;

/// Trait for pluggable image storage backends.
///
/// A backend stores the original bytes of an image at a location derived only
/// from the record's id and format, never from caller-supplied paths. Distinct
/// ids never share a location, so implementations need no locking.
#[async_trait::async_trait]
pub trait ImageStore: Send + Sync {
    /// Process-unique name of this backend, recorded on every image row.
    fn name(&self) -> &str;

    /// Read the original bytes of `record`.
    ///
    /// # Errors
    ///
    /// `StorageErrorKind::NotFound` if nothing is stored for the record,
    /// a backend-specific storage error otherwise.
    async fn get(&self, record: &ImageRecord) -> ImageryResult<Vec<u8>>;

    /// Write the original bytes of `record`, replacing any previous object.
    async fn save(&self, record: &ImageRecord, image: &[u8]) -> ImageryResult<()>;

    /// Remove the object for `record`.
    ///
    /// Succeeds if the object is already gone.
    async fn delete(&self, record: &ImageRecord) -> ImageryResult<()>;
}
