//! S3 and S3-compatible object storage backend.

use crate::ImageStore;
use imagery_core::ImageRecord;
use imagery_error::{ImageryError, ImageryResult, StorageError, StorageErrorKind};
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Connection settings for the S3 backend.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Config {
    /// Whether uploads should go to S3
    #[serde(default)]
    pub enabled: bool,
    /// Bucket region
    #[serde(default)]
    pub region: String,
    /// Bucket name
    #[serde(default)]
    pub bucket: String,
    /// Access key id
    #[serde(default)]
    pub access_key: String,
    /// Secret access key
    #[serde(default)]
    pub secret_key: String,
    /// Custom endpoint for S3-compatible services
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Key prefix inside the bucket
    #[serde(default)]
    pub path_prefix: Option<String>,
}

impl S3Config {
    /// True when every setting needed to reach the bucket is present.
    pub fn is_complete(&self) -> bool {
        !self.region.is_empty()
            && !self.bucket.is_empty()
            && !self.access_key.is_empty()
            && !self.secret_key.is_empty()
    }
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("enabled", &self.enabled)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("path_prefix", &self.path_prefix)
            .finish()
    }
}

/// Stores originals as objects, keyed `{prefix}/{folder}/{stem}{ext}`.
///
/// Works against anything implementing [`ObjectStore`]; production uses
/// [`ObjectStorage::s3`], tests use an in-memory store.
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    prefix: Option<String>,
}

impl ObjectStorage {
    /// Backend name recorded on rows.
    pub const NAME: &'static str = "s3";

    /// Wrap an existing object store.
    pub fn new(store: Arc<dyn ObjectStore>, prefix: Option<String>) -> Self {
        let prefix = prefix
            .map(|p| p.trim_matches('/').to_string())
            .filter(|p| !p.is_empty());
        Self { store, prefix }
    }

    /// Connect to S3 (or a compatible service) with the given settings.
    ///
    /// # Errors
    ///
    /// `StorageErrorKind::InvalidConfig` if the client cannot be built.
    #[tracing::instrument(skip(config), fields(bucket = %config.bucket, region = %config.region))]
    pub fn s3(config: &S3Config) -> ImageryResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_region(&config.region)
            .with_bucket_name(&config.bucket)
            .with_access_key_id(&config.access_key)
            .with_secret_access_key(&config.secret_key);

        if let Some(endpoint) = config.endpoint.as_deref().filter(|e| !e.is_empty()) {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let s3 = builder
            .build()
            .map_err(|e| StorageError::new(StorageErrorKind::InvalidConfig(e.to_string())))?;

        tracing::info!("Created S3 image store");
        Ok(Self::new(Arc::new(s3), config.path_prefix.clone()))
    }

    /// Object key for the original of `record`.
    pub fn object_key(&self, record: &ImageRecord) -> Path {
        let relative = record.relative_path();
        match &self.prefix {
            Some(prefix) => Path::from(format!("{}/{}", prefix, relative).as_str()),
            None => Path::from(relative.as_str()),
        }
    }
}

impl fmt::Debug for ObjectStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStorage")
            .field("store", &self.store.to_string())
            .field("prefix", &self.prefix)
            .finish()
    }
}

fn map_error(key: &Path, error: object_store::Error) -> ImageryError {
    match error {
        object_store::Error::NotFound { .. } => {
            StorageError::new(StorageErrorKind::NotFound(key.to_string())).into()
        }
        other => StorageError::new(StorageErrorKind::ObjectStore(format!("{}: {}", key, other)))
            .into(),
    }
}

#[async_trait::async_trait]
impl ImageStore for ObjectStorage {
    fn name(&self) -> &str {
        Self::NAME
    }

    #[tracing::instrument(skip(self, record), fields(id = %record.id))]
    async fn get(&self, record: &ImageRecord) -> ImageryResult<Vec<u8>> {
        let key = self.object_key(record);

        let result = self.store.get(&key).await.map_err(|e| map_error(&key, e))?;
        let bytes = result.bytes().await.map_err(|e| map_error(&key, e))?;

        tracing::debug!(key = %key, size = bytes.len(), "Fetched original");
        Ok(bytes.to_vec())
    }

    #[tracing::instrument(skip(self, record, image), fields(id = %record.id, size = image.len()))]
    async fn save(&self, record: &ImageRecord, image: &[u8]) -> ImageryResult<()> {
        let key = self.object_key(record);

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, record.format.mime_type().into());
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        self.store
            .put_opts(&key, PutPayload::from(image.to_vec()), options)
            .await
            .map_err(|e| map_error(&key, e))?;

        tracing::info!(key = %key, "Uploaded original");
        Ok(())
    }

    #[tracing::instrument(skip(self, record), fields(id = %record.id))]
    async fn delete(&self, record: &ImageRecord) -> ImageryResult<()> {
        let key = self.object_key(record);

        match self.store.delete(&key).await {
            Ok(()) => {
                tracing::info!(key = %key, "Deleted original");
                Ok(())
            }
            Err(object_store::Error::NotFound { .. }) => {
                tracing::debug!(key = %key, "Original already absent");
                Ok(())
            }
            Err(e) => Err(map_error(&key, e)),
        }
    }
}
