//! Pluggable storage backends for original image bytes.
//!
//! Metadata lives in the database; the bytes of each original upload live in
//! exactly one backend, named on the image's row. Backends implement
//! [`ImageStore`] and are collected once at startup into a [`StoreRegistry`],
//! which is then shared read-only.
//!
//! Two backends ship with the crate:
//!
//! - [`FileSystemStore`] (`"disk"`): files under a root directory, sharded
//!   into two-level folders derived from the image id
//! - [`ObjectStorage`] (`"s3"`): objects in S3 or an S3-compatible service,
//!   keyed by the same id-derived path under an optional prefix
//!
//! # Example
//!
//! ```rust,no_run
//! use imagery_storage::{FileSystemStore, StoreRegistry};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = StoreRegistry::new();
//! registry.register(Arc::new(FileSystemStore::new("/var/lib/imagery/images")?))?;
//! let store = registry.get("disk")?;
//! assert_eq!(store.name(), "disk");
//! # Ok(())
//! # }
//! ```

mod filesystem;
mod object;
mod registry;
mod store;

pub use filesystem::FileSystemStore;
pub use object::{ObjectStorage, S3Config};
pub use registry::StoreRegistry;
pub use store::ImageStore;
