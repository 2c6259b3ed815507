//! Variant cache implementation.

use derive_getters::Getters;
use imagery_core::{VARIANT_SEPARATOR, id_to_folder};
use imagery_error::{ImageryResult, StorageError, StorageErrorKind};
use imagery_request::ImageRequest;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

/// Filename of the cached variant for `request`.
///
/// `{stem}{ext}` for the original size, `{stem}_{size}_{fit}{ext}` otherwise.
/// The fit is the effective one, so an omitted fit and an explicit default
/// fit share an entry.
///
/// # Examples
///
/// ```
/// use imagery_cache::variant_filename;
/// use imagery_core::{ImageFormat, ImageSize};
/// use imagery_request::ImageRequest;
/// use uuid::Uuid;
///
/// let id = Uuid::parse_str("a1b2c3d4e5f60718293a4b5c6d7e8f90").unwrap();
/// let request = ImageRequest::new(id, ImageSize::new(300, 200), None, ImageFormat::Webp).unwrap();
/// assert_eq!(
///     variant_filename(&request),
///     "a1b2c3d4e5f60718293a4b5c6d7e8f90_300x200_contain.webp"
/// );
/// ```
pub fn variant_filename(request: &ImageRequest) -> String {
    let (_, mut name) = id_to_folder(&request.id);
    if let Some(fit) = request.effective_fit() {
        name.push(VARIANT_SEPARATOR);
        name.push_str(&request.size.to_string());
        name.push(VARIANT_SEPARATOR);
        name.push_str(fit.as_str());
    }
    name.push_str(request.format.extension());
    name
}

/// Configuration for the variant cache.
#[derive(
    Debug,
    Clone,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
pub struct VariantCacheConfig {
    /// Root directory, normally the disk store's images directory
    root: PathBuf,

    /// Whether lookups and stores are performed
    #[serde(default = "default_enabled")]
    #[builder(default = "default_enabled()")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl VariantCacheConfig {
    /// Enabled cache rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            enabled: default_enabled(),
        }
    }
}

/// On-disk cache of derived variants.
///
/// Concurrent misses for the same request may both write; each writes a
/// uniquely named temp file and renames it into place, so readers only ever
/// see complete files and the last rename wins.
#[derive(Debug, Clone)]
pub struct VariantCache {
    config: VariantCacheConfig,
}

impl VariantCache {
    /// Create a cache with the given configuration.
    pub fn new(config: VariantCacheConfig) -> Self {
        tracing::debug!(
            root = %config.root.display(),
            enabled = config.enabled,
            "Creating variant cache"
        );
        Self { config }
    }

    /// The cache configuration.
    pub fn config(&self) -> &VariantCacheConfig {
        &self.config
    }

    /// Whether lookups and stores are performed.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Where the variant for `request` lives.
    pub fn path_for(&self, request: &ImageRequest) -> PathBuf {
        let (folder, _) = id_to_folder(&request.id);
        self.config
            .root
            .join(folder)
            .join(variant_filename(request))
    }

    /// Cached bytes for `request`, if any.
    ///
    /// Never fails: a missing file is a silent miss, any other read error is
    /// logged and also reported as a miss.
    #[tracing::instrument(skip(self, request), fields(id = %request.id, size = %request.size))]
    pub async fn lookup(&self, request: &ImageRequest) -> Option<Vec<u8>> {
        if !self.config.enabled {
            return None;
        }

        let path = self.path_for(request);
        match tokio::fs::read(&path).await {
            Ok(data) => {
                tracing::debug!(path = %path.display(), "Variant cache hit");
                Some(data)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Variant cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Variant cache read failed");
                None
            }
        }
    }

    /// Write the variant for `request`.
    ///
    /// Only size-bearing variants are written; original-size requests are a
    /// no-op so an original in a shared root is never overwritten.
    ///
    /// # Errors
    ///
    /// Returns error if the folder or file cannot be written. Callers log it
    /// and carry on serving.
    #[tracing::instrument(skip(self, request, data), fields(id = %request.id, size = data.len()))]
    pub async fn store(&self, request: &ImageRequest, data: &[u8]) -> ImageryResult<()> {
        if !self.config.enabled || !request.is_variant() {
            return Ok(());
        }

        let path = self.path_for(request);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        if let Err(e) = tokio::fs::write(&temp_path, data).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
            .into());
        }

        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(StorageError::new(StorageErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
            .into());
        }

        tracing::debug!(path = %path.display(), "Stored variant");
        Ok(())
    }

    /// Remove every cached variant of image `id`, returning how many were
    /// removed. The original, if it shares the folder, is kept.
    #[tracing::instrument(skip(self))]
    pub async fn purge(&self, id: Uuid) -> ImageryResult<usize> {
        let (folder, stem) = id_to_folder(&id);
        let dir = self.config.root.join(folder);

        let removed = run_blocking(move || {
            remove_matching(&dir, |name| {
                name.starts_with(&stem) && name.contains(VARIANT_SEPARATOR)
            })
        })
        .await?;

        tracing::debug!(removed, "Purged cached variants");
        Ok(removed)
    }

    /// Remove every cached variant of every image.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self) -> ImageryResult<usize> {
        let root = self.config.root.clone();

        let removed =
            run_blocking(move || remove_matching(&root, |name| name.contains(VARIANT_SEPARATOR)))
                .await?;

        tracing::info!(removed, "Cleared variant cache");
        Ok(removed)
    }
}

async fn run_blocking<F>(f: F) -> ImageryResult<usize>
where
    F: FnOnce() -> usize + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        StorageError::new(StorageErrorKind::FileDelete(format!(
            "cache walk task failed: {}",
            e
        )))
        .into()
    })
}

/// Delete files under `dir` whose names satisfy `matches`. Unreadable entries
/// and failed deletions are logged and skipped.
fn remove_matching(dir: &Path, matches: impl Fn(&str) -> bool) -> usize {
    if !dir.exists() {
        return 0;
    }

    let mut removed = 0;
    for entry in WalkDir::new(dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable cache entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !matches(name) {
            continue;
        }

        match std::fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "Failed to remove cached variant");
            }
        }
    }
    removed
}
