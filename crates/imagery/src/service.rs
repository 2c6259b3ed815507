//! Image lifecycle: upload, serve, delete.

use crate::config::{
    DEFAULT_MAX_IMAGE_SIZE, DEFAULT_MAX_VARIANT_DIMENSION, DEFAULT_URL_PREFIX, ImageryConfig,
};
use crate::transform::{self, ProcessedUpload};
use imagery_cache::{VariantCache, VariantCacheConfig};
use imagery_core::{ImageFit, ImageFormat, ImageRecord, ImageSize};
use imagery_database::{ImageRepository, PersistFuture};
use imagery_error::{
    ConfigError, ImageryResult, ProcessingError, ProcessingErrorKind, RequestError,
    RequestErrorKind,
};
use imagery_request::{ImageRequest, RequestSigner};
use imagery_storage::{FileSystemStore, ImageStore, ObjectStorage, StoreRegistry};
use std::sync::Arc;
use uuid::Uuid;

/// How an upload is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageOptions {
    /// Format to re-encode to
    pub format: ImageFormat,
    /// Box to resize into, zero to keep the upload's dimensions
    pub size: ImageSize,
    /// Fit for a non-zero size, the default fit when `None`
    pub fit: Option<ImageFit>,
}

/// Bytes ready to send to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedImage {
    /// Encoded image
    pub bytes: Vec<u8>,
    /// Format of `bytes`
    pub format: ImageFormat,
}

impl ServedImage {
    /// Value for the `Content-Type` header.
    pub fn content_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Uploads, serves and deletes images.
///
/// Cheap to clone; all collaborators are shared.
#[derive(Clone, derive_builder::Builder)]
#[builder(pattern = "owned")]
pub struct ImageService {
    /// Backends by name
    registry: Arc<StoreRegistry>,
    /// Metadata rows
    repository: Arc<dyn ImageRepository>,
    /// Derived-variant cache
    cache: VariantCache,
    /// URL signer
    #[builder(default)]
    signer: RequestSigner,
    /// Upload size limit in bytes
    #[builder(default = "DEFAULT_MAX_IMAGE_SIZE")]
    max_image_size: usize,
    /// Largest width or height a request may resize to
    #[builder(default = "DEFAULT_MAX_VARIANT_DIMENSION")]
    max_variant_dimension: u32,
    /// Upload batch limit
    #[builder(default = "10")]
    max_images_per_post: usize,
    /// Store uploads as received
    #[builder(default)]
    skip_processing: bool,
    /// Public URL prefix
    #[builder(default = "DEFAULT_URL_PREFIX.to_string()", setter(into))]
    url_prefix: String,
}

impl ImageService {
    /// Start building a service.
    pub fn builder() -> ImageServiceBuilder {
        ImageServiceBuilder::default()
    }

    /// Build the service described by `config` on top of `repository`.
    ///
    /// The disk backend is always registered. The S3 backend is registered
    /// when it is enabled and fully configured.
    pub fn from_config(
        config: &ImageryConfig,
        repository: Arc<dyn ImageRepository>,
    ) -> ImageryResult<Self> {
        let mut registry = StoreRegistry::new();
        registry.register(Arc::new(FileSystemStore::new(&config.images_folder_path)?))?;
        if config.s3_ready() {
            registry.register(Arc::new(ObjectStorage::s3(&config.s3)?))?;
        }

        let cache = VariantCache::new(
            VariantCacheConfig::new(&config.images_folder_path)
                .with_enabled(config.cache_enabled),
        );

        Self::builder()
            .registry(Arc::new(registry))
            .repository(repository)
            .cache(cache)
            .signer(RequestSigner::from_secret(config.signing_secret()))
            .max_image_size(config.max_image_size)
            .max_variant_dimension(config.max_variant_dimension)
            .max_images_per_post(config.max_images_per_post)
            .skip_processing(config.skip_processing)
            .url_prefix(config.url_prefix.clone())
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build image service: {}", e)).into())
    }

    /// Registered backends.
    pub fn registry(&self) -> &StoreRegistry {
        &self.registry
    }

    /// The URL signer.
    pub fn signer(&self) -> &RequestSigner {
        &self.signer
    }

    /// The variant cache.
    pub fn cache(&self) -> &VariantCache {
        &self.cache
    }

    /// Validate, process and persist an upload on backend `store_name`.
    ///
    /// Nothing is persisted unless the bytes decode as a JPEG, PNG or WebP
    /// image within the size limit. The row is only committed once the
    /// backend holds the bytes.
    ///
    /// # Errors
    ///
    /// - `ProcessingErrorKind::TooLarge`, `UnsupportedFormat` or `Decode` for
    ///   bad uploads
    /// - `RequestErrorKind::SizeTooLarge` for a resize box beyond the limit
    /// - `StorageErrorKind::StoreNotRegistered` for an unknown backend
    /// - storage or database errors from persisting
    #[tracing::instrument(skip(self, upload, options), fields(store = store_name, upload_size = upload.len()))]
    pub async fn save_image(
        &self,
        store_name: &str,
        upload: Vec<u8>,
        options: &ImageOptions,
    ) -> ImageryResult<ImageRecord> {
        if upload.len() > self.max_image_size {
            return Err(ProcessingError::new(ProcessingErrorKind::TooLarge {
                size: upload.len(),
                limit: self.max_image_size,
            })
            .into());
        }

        let size = options.size.normalized();
        self.check_dimensions(size)?;

        let format = options.format;
        let fit = options.fit.unwrap_or(ImageFit::DEFAULT);
        let skip_processing = self.skip_processing;
        let processed = run_blocking(move || {
            transform::process_upload(upload, format, size, fit, skip_processing)
        })
        .await?;

        let store = self.registry.get(store_name)?;
        let ProcessedUpload {
            bytes,
            format,
            width,
            height,
            average_color,
            upload_size,
        } = processed;

        let record = ImageRecord {
            id: Uuid::new_v4(),
            store_name: store.name().to_string(),
            format,
            width,
            height,
            size: bytes.len() as u64,
            upload_size: upload_size as u64,
            average_color,
            created_at: chrono::Utc::now(),
        };

        let persist: PersistFuture = {
            let store = Arc::clone(&store);
            let record = record.clone();
            Box::pin(async move { store.save(&record, &bytes).await })
        };
        self.repository.insert_image(&record, persist).await?;

        tracing::info!(id = %record.id, format = %record.format, "Saved image");
        self.repository.get_image(record.id).await
    }

    /// The metadata row for `id`.
    pub async fn record(&self, id: Uuid) -> ImageryResult<ImageRecord> {
        self.repository.get_image(id).await
    }

    /// Save a batch of uploads for one post.
    ///
    /// # Errors
    ///
    /// `ProcessingErrorKind::TooManyImages` if the batch exceeds the per-post
    /// limit, otherwise the first error from [`save_image`](Self::save_image).
    /// Uploads saved before a failure are kept.
    pub async fn save_images(
        &self,
        store_name: &str,
        uploads: Vec<Vec<u8>>,
        options: &ImageOptions,
    ) -> ImageryResult<Vec<ImageRecord>> {
        if uploads.len() > self.max_images_per_post {
            return Err(ProcessingError::new(ProcessingErrorKind::TooManyImages {
                count: uploads.len(),
                limit: self.max_images_per_post,
            })
            .into());
        }

        let mut records = Vec::with_capacity(uploads.len());
        for upload in uploads {
            records.push(self.save_image(store_name, upload, options).await?);
        }
        Ok(records)
    }

    /// Parse, verify and serve an image URL.
    ///
    /// Malformed or forged requests are rejected before any I/O.
    pub async fn serve(&self, path: &str, query: &str) -> ImageryResult<ServedImage> {
        let request = ImageRequest::parse(path, query)?;
        self.check_dimensions(request.size)?;
        self.signer.verify(&request)?;
        self.get_image(&request).await
    }

    /// Bytes for a verified request.
    ///
    /// Variants come from the cache when present. Otherwise the original is
    /// fetched from its backend and transformed if the size or format differ,
    /// and size-bearing variants are written back to the cache. Cache
    /// failures never fail the request.
    #[tracing::instrument(skip(self, request), fields(id = %request.id, size = %request.size, format = %request.format))]
    pub async fn get_image(&self, request: &ImageRequest) -> ImageryResult<ServedImage> {
        self.check_dimensions(request.size)?;

        if request.is_variant() {
            if let Some(bytes) = self.cache.lookup(request).await {
                return Ok(ServedImage {
                    bytes,
                    format: request.format,
                });
            }
        }

        let record = self.repository.get_image(request.id).await?;
        let store = self.registry.get(&record.store_name).inspect_err(|e| {
            tracing::error!(
                store = %record.store_name,
                error = %e,
                "Image row names a store this process does not have"
            );
        })?;
        let original = store.get(&record).await?;

        if !request.is_variant() && request.format == record.format {
            return Ok(ServedImage {
                bytes: original,
                format: record.format,
            });
        }

        let stored_format = record.format;
        let size = request.size;
        let fit = request.effective_fit();
        let format = request.format;
        // Render failures here are backend faults, never client errors
        let bytes = run_blocking(move || {
            transform::render_variant(&original, stored_format, size, fit, format).map_err(|e| {
                ProcessingError::new(ProcessingErrorKind::StoredImage(e.to_string())).into()
            })
        })
        .await
        .inspect_err(|e| {
            tracing::error!(store = %record.store_name, error = %e, "Failed to render stored image");
        })?;

        if request.is_variant() {
            if let Err(e) = self.cache.store(request, &bytes).await {
                tracing::warn!(error = %e, "Failed to cache variant");
            }
        }

        Ok(ServedImage { bytes, format })
    }

    /// Delete images with their backend objects and cached variants.
    ///
    /// Backend deletes run first; the first failure aborts the whole batch
    /// with every row still in place, so the batch can be retried. Cache
    /// purge failures are only logged. Unknown ids are ignored.
    ///
    /// Returns the number of rows deleted.
    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn delete_images(&self, ids: &[Uuid]) -> ImageryResult<usize> {
        let records = self.repository.get_images(ids).await?;

        for record in &records {
            let store = self.registry.get(&record.store_name)?;
            store.delete(record).await?;
        }

        for id in ids {
            if let Err(e) = self.cache.purge(*id).await {
                tracing::warn!(%id, error = %e, "Failed to purge cached variants");
            }
        }

        let deleted = self.repository.delete_images(ids).await?;
        tracing::info!(deleted, "Deleted images");
        Ok(deleted)
    }

    /// Remove every cached variant.
    pub async fn clear_cache(&self) -> ImageryResult<usize> {
        self.cache.clear().await
    }

    /// Reject sizes beyond the configured maximum before any work is done.
    fn check_dimensions(&self, size: ImageSize) -> ImageryResult<()> {
        let limit = self.max_variant_dimension;
        if size.width > limit || size.height > limit {
            return Err(RequestError::new(RequestErrorKind::SizeTooLarge {
                size: size.to_string(),
                limit,
            })
            .into());
        }
        Ok(())
    }

    /// Public, signed URL for `record` at the given size, fit and format.
    ///
    /// `format` defaults to the stored format.
    ///
    /// # Errors
    ///
    /// `RequestErrorKind::FitWithoutSize` for a fit with a zero size.
    pub fn image_url(
        &self,
        record: &ImageRecord,
        size: ImageSize,
        fit: Option<ImageFit>,
        format: Option<ImageFormat>,
    ) -> ImageryResult<String> {
        let request =
            ImageRequest::new(record.id, size, fit, format.unwrap_or(record.format))?;
        Ok(self.signer.full_url(&self.url_prefix, &request))
    }
}

async fn run_blocking<T, F>(f: F) -> ImageryResult<T>
where
    F: FnOnce() -> ImageryResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ProcessingError::new(ProcessingErrorKind::Task(e.to_string())))?
}
