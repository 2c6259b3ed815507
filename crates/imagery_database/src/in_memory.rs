//! In-memory implementation of ImageRepository for testing.

use crate::{ImageRepository, PersistFuture};
use async_trait::async_trait;
use imagery_core::ImageRecord;
use imagery_error::{DatabaseError, DatabaseErrorKind, ImageryResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory image repository.
///
/// Rows being inserted are held aside until their persist step succeeds, so
/// readers never see an uncommitted row. All data is lost when the repository
/// is dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemoryImageRepository {
    images: Arc<RwLock<HashMap<Uuid, ImageRecord>>>,
    pending: Arc<RwLock<HashSet<Uuid>>>,
}

impl InMemoryImageRepository {
    /// Create a new empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed rows.
    pub async fn len(&self) -> usize {
        self.images.read().await.len()
    }

    /// Whether there are no committed rows.
    pub async fn is_empty(&self) -> bool {
        self.images.read().await.is_empty()
    }
}

#[async_trait]
impl ImageRepository for InMemoryImageRepository {
    #[tracing::instrument(skip(self, record, persist), fields(id = %record.id))]
    async fn insert_image(
        &self,
        record: &ImageRecord,
        persist: PersistFuture,
    ) -> ImageryResult<()> {
        {
            let images = self.images.read().await;
            let mut pending = self.pending.write().await;
            if images.contains_key(&record.id) || !pending.insert(record.id) {
                return Err(DatabaseError::new(DatabaseErrorKind::Query(format!(
                    "duplicate key value violates unique constraint: {}",
                    record.id
                )))
                .into());
            }
        }

        let result = persist.await;

        self.pending.write().await.remove(&record.id);
        match result {
            Ok(()) => {
                self.images
                    .write()
                    .await
                    .insert(record.id, record.clone());
                tracing::debug!("Committed image row");
                Ok(())
            }
            Err(e) => {
                tracing::debug!(error = %e, "Rolled back image row");
                Err(e)
            }
        }
    }

    async fn get_image(&self, id: Uuid) -> ImageryResult<ImageRecord> {
        self.images
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| DatabaseError::new(DatabaseErrorKind::NotFound).into())
    }

    async fn get_images(&self, ids: &[Uuid]) -> ImageryResult<Vec<ImageRecord>> {
        let images = self.images.read().await;
        Ok(ids.iter().filter_map(|id| images.get(id).cloned()).collect())
    }

    async fn delete_images(&self, ids: &[Uuid]) -> ImageryResult<usize> {
        let mut images = self.images.write().await;
        Ok(ids.iter().filter(|id| images.remove(*id).is_some()).count())
    }
}
