//! Error types for the Imagery workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! Errors are grouped by how the serving tier must react to them:
//!
//! | Kind | Meaning | Surfaced as |
//! |------|---------|-------------|
//! | not found | record or backend object absent | 404 |
//! | bad request | malformed URL, bad signature, unsupported format/fit | 4xx, never retried |
//! | store not registered | configuration drift between rows and backends | 500, logged loudly |
//! | backend I/O | storage failure | propagated to the caller |
//!
//! Cache I/O failures never appear here as request failures; the cache logs
//! them and reports a miss.
//!
//! # Examples
//!
//! ```
//! use imagery_error::{ImageryResult, RequestError, RequestErrorKind};
//!
//! fn parse() -> ImageryResult<()> {
//!     Err(RequestError::new(RequestErrorKind::BadUrl("missing extension".into())))?
//! }
//!
//! let err = parse().unwrap_err();
//! assert!(err.is_bad_request());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
#[cfg(feature = "database")]
mod diesel_conversions;
mod database;
mod error;
mod processing;
mod request;
mod storage;

pub use config::ConfigError;
pub use database::{DatabaseError, DatabaseErrorKind};
pub use error::{ImageryError, ImageryErrorKind, ImageryResult};
pub use processing::{ProcessingError, ProcessingErrorKind};
pub use request::{RequestError, RequestErrorKind};
pub use storage::{StorageError, StorageErrorKind};
