//! Local disk backend.

use crate::ImageStore;
use imagery_core::ImageRecord;
use imagery_error::{ImageryResult, StorageError, StorageErrorKind};
use std::path::{Path, PathBuf};

/// Stores originals on the local filesystem.
///
/// Layout: `{root}/{stem[0:2]}/{stem[2:4]}/{stem}{ext}`
///
/// ```text
/// /var/lib/imagery/images/
/// ├── a1/
/// │   └── b2/
/// │       ├── a1b2c3d4...000.png           (original)
/// │       └── a1b2c3d4...000_64_cover.webp (cached variant)
/// └── 7f/
///     └── 03/
///         └── 7f03e1aa...9c1.jpeg
/// ```
///
/// The variant cache may share this root; originals never contain the variant
/// separator so the two never collide.
#[derive(Debug, Clone)]
pub struct FileSystemStore {
    root: PathBuf,
}

impl FileSystemStore {
    /// Backend name recorded on rows.
    pub const NAME: &'static str = "disk";

    /// Create a disk backend rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    #[tracing::instrument(skip(root))]
    pub fn new(root: impl Into<PathBuf>) -> ImageryResult<Self> {
        let root = root.into();

        std::fs::create_dir_all(&root).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                root.display(),
                e
            )))
        })?;

        tracing::info!(path = %root.display(), "Created disk image store");
        Ok(Self { root })
    }

    /// Root directory of this backend.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of the original for `record`.
    pub fn path_for(&self, record: &ImageRecord) -> PathBuf {
        self.root.join(record.folder()).join(record.filename())
    }
}

#[async_trait::async_trait]
impl ImageStore for FileSystemStore {
    fn name(&self) -> &str {
        Self::NAME
    }

    #[tracing::instrument(skip(self, record), fields(id = %record.id))]
    async fn get(&self, record: &ImageRecord) -> ImageryResult<Vec<u8>> {
        let path = self.path_for(record);

        let data = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NotFound(record.relative_path()))
            } else {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        })?;

        tracing::debug!(path = %path.display(), size = data.len(), "Read original");
        Ok(data)
    }

    #[tracing::instrument(skip(self, record, image), fields(id = %record.id, size = image.len()))]
    async fn save(&self, record: &ImageRecord, image: &[u8]) -> ImageryResult<()> {
        let path = self.path_for(record);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        // Readers must never observe a partial original.
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, image).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;

        tokio::fs::rename(&temp_path, &path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;

        tracing::info!(path = %path.display(), "Saved original");
        Ok(())
    }

    #[tracing::instrument(skip(self, record), fields(id = %record.id))]
    async fn delete(&self, record: &ImageRecord) -> ImageryResult<()> {
        let path = self.path_for(record);

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Deleted original");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Original already absent");
                Ok(())
            }
            Err(e) => Err(StorageError::new(StorageErrorKind::FileDelete(format!(
                "{}: {}",
                path.display(),
                e
            )))
            .into()),
        }
    }
}
