//! Image metadata repository trait.

use async_trait::async_trait;
use imagery_core::ImageRecord;
use imagery_error::ImageryResult;
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

/// Work that must succeed for an inserted row to be committed.
///
/// Upload passes the backend save here.
pub type PersistFuture = Pin<Box<dyn Future<Output = ImageryResult<()>> + Send + 'static>>;

/// Storage of image metadata rows.
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Insert `record`, run `persist`, and commit only if both succeed.
    ///
    /// The row is invisible to readers until committed. If `persist` fails,
    /// the insert is rolled back and its error returned.
    ///
    /// The commit itself can still fail after `persist` succeeded, which
    /// leaves persisted bytes without a row.
    async fn insert_image(&self, record: &ImageRecord, persist: PersistFuture)
    -> ImageryResult<()>;

    /// Load one record.
    ///
    /// # Errors
    ///
    /// `DatabaseErrorKind::NotFound` if no row has this id.
    async fn get_image(&self, id: Uuid) -> ImageryResult<ImageRecord>;

    /// Load the records that exist among `ids`, in no particular order.
    async fn get_images(&self, ids: &[Uuid]) -> ImageryResult<Vec<ImageRecord>>;

    /// Delete rows by id, returning how many were removed.
    async fn delete_images(&self, ids: &[Uuid]) -> ImageryResult<usize>;
}
