//! Derived-variant cache.
//!
//! Resized or re-encoded images are cached on disk next to the originals,
//! under the same id-derived folder. Filenames are a pure function of the
//! request, so identical requests always hit the same file and purging an
//! image only has to scan one folder.
//!
//! The cache is never authoritative. Read failures are misses, and write
//! failures are the caller's to log.

#![warn(missing_docs)]

mod cache;

pub use cache::{VariantCache, VariantCacheConfig, VariantCacheConfigBuilder, variant_filename};
