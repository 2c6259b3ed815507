//! Top-level error wrapper types.

use crate::{
    ConfigError, DatabaseError, DatabaseErrorKind, ProcessingError, RequestError, StorageError,
    StorageErrorKind,
};

/// Every error condition an Imagery operation can end in.
///
/// # Examples
///
/// ```
/// use imagery_error::{ImageryError, StorageError, StorageErrorKind};
///
/// let err: ImageryError = StorageError::new(StorageErrorKind::NotFound("ab/cd/abcd.png".into())).into();
/// assert!(format!("{}", err).contains("not found"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum ImageryErrorKind {
    /// Storage backend or registry error
    #[from(StorageError)]
    Storage(StorageError),
    /// Malformed or forged image request
    #[from(RequestError)]
    Request(RequestError),
    /// Metadata store error
    #[from(DatabaseError)]
    Database(DatabaseError),
    /// Decoding, encoding or resizing failed
    #[from(ProcessingError)]
    Processing(ProcessingError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
}

/// Imagery error with kind discrimination.
///
/// # Examples
///
/// ```
/// use imagery_error::{ConfigError, ImageryResult};
///
/// fn might_fail() -> ImageryResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Imagery Error: {}", _0)]
pub struct ImageryError(Box<ImageryErrorKind>);

impl ImageryError {
    /// Create a new error from a kind.
    pub fn new(kind: ImageryErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ImageryErrorKind {
        &self.0
    }

    /// True when the record or its backend object does not exist.
    pub fn is_not_found(&self) -> bool {
        match self.kind() {
            ImageryErrorKind::Storage(e) => matches!(e.kind, StorageErrorKind::NotFound(_)),
            ImageryErrorKind::Database(e) => e.kind == DatabaseErrorKind::NotFound,
            _ => false,
        }
    }

    /// True for malformed, forged or unsupported requests and uploads.
    ///
    /// These are the caller's fault and must never be retried.
    pub fn is_bad_request(&self) -> bool {
        match self.kind() {
            ImageryErrorKind::Request(_) => true,
            ImageryErrorKind::Processing(e) => e.kind.is_client_error(),
            _ => false,
        }
    }

    /// True when a row names a backend the running process does not have.
    pub fn is_store_not_registered(&self) -> bool {
        matches!(
            self.kind(),
            ImageryErrorKind::Storage(e) if matches!(e.kind, StorageErrorKind::StoreNotRegistered(_))
        )
    }
}

// Generic From implementation for any type that converts to ImageryErrorKind
impl<T> From<T> for ImageryError
where
    T: Into<ImageryErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Imagery operations.
pub type ImageryResult<T> = std::result::Result<T, ImageryError>;
