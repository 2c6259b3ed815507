//! Imagery - image storage and serving for discussion platforms
//!
//! Imagery accepts uploaded images, normalizes and stores them on a pluggable
//! backend, and serves them back through HMAC-signed URLs that may request a
//! resized or re-encoded variant. Variants are cached on local disk.
//!
//! # Features
//!
//! - **Pluggable Backends**: local disk and S3-compatible object storage behind one trait
//! - **Signed URLs**: every size, fit and format parameter is covered by the signature
//! - **Variant Cache**: derived images are written once and served from disk after
//! - **Transactional Uploads**: the metadata row commits only once the bytes are stored
//! - **Average Color**: a placeholder color is sampled from every upload
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use imagery::{ImageOptions, ImageService, ImageryConfig, InMemoryImageRepository};
//! use std::sync::Arc;
//!
//! # async fn run(upload: Vec<u8>) -> imagery::ImageryResult<()> {
//! let config = ImageryConfig::load()?;
//! let service = ImageService::from_config(&config, Arc::new(InMemoryImageRepository::new()))?;
//!
//! let record = service
//!     .save_image(config.default_store_name(), upload, &ImageOptions::default())
//!     .await?;
//! let url = service.image_url(&record, imagery::ImageSize::square(200), None, None)?;
//! println!("{url}");
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! Imagery is organized as a workspace with focused crates:
//!
//! - `imagery_error` - Error types
//! - `imagery_core` - Value types, shard layout and the color sampler
//! - `imagery_storage` - Storage backends and their registry
//! - `imagery_request` - Image request URLs and their signatures
//! - `imagery_cache` - Derived-variant file cache
//! - `imagery_database` - PostgreSQL and in-memory metadata stores
//!
//! This crate (`imagery`) re-exports everything and adds the service, its
//! configuration and the HTTP endpoint.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod http;
mod observability;
mod service;
pub mod transform;

pub use imagery_cache::{
    VariantCache, VariantCacheConfig, VariantCacheConfigBuilder, variant_filename,
};
pub use imagery_core::*;
pub use imagery_database::{
    DatabaseResult, ImagePool, ImageRepository, ImageRow, InMemoryImageRepository, NewImageRow,
    PersistFuture, PostgresImageRepository, establish_pool, run_migrations,
};
pub use imagery_error::*;
pub use imagery_request::{ImageRequest, RequestSigner};
pub use imagery_storage::{FileSystemStore, ImageStore, ObjectStorage, S3Config, StoreRegistry};

pub use config::{DEFAULT_MAX_IMAGE_SIZE, DEFAULT_URL_PREFIX, ENV_PREFIX, ImageryConfig};
pub use http::{ApiState, CACHE_CONTROL, create_router, serve_http};
pub use observability::{ObservabilityConfig, init_logging};
pub use service::{ImageOptions, ImageService, ImageServiceBuilder, ServedImage};
