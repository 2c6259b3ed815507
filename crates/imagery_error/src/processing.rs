//! Image processing error types.

/// Image processing error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ProcessingErrorKind {
    /// Bytes are not a readable image
    #[display("Failed to decode image: {}", _0)]
    Decode(String),
    /// Re-encoding the image failed
    #[display("Failed to encode image: {}", _0)]
    Encode(String),
    /// The upload is an image, but not of a supported format
    #[display("Unsupported image format: {}", _0)]
    UnsupportedFormat(String),
    /// Upload exceeds the configured maximum size
    #[display("Image of {} bytes exceeds the limit of {} bytes", size, limit)]
    TooLarge {
        /// Upload size in bytes
        size: usize,
        /// Configured limit in bytes
        limit: usize,
    },
    /// More images in one batch than the configured limit
    #[display("{} images exceed the limit of {} per post", count, limit)]
    TooManyImages {
        /// Images in the batch
        count: usize,
        /// Configured limit
        limit: usize,
    },
    /// A stored original could not be decoded or re-encoded while serving
    #[display("Stored image is unreadable: {}", _0)]
    StoredImage(String),
    /// A blocking worker failed to complete
    #[display("Processing task failed: {}", _0)]
    Task(String),
}

impl ProcessingErrorKind {
    /// Whether the caller supplied the bad input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Decode(_)
                | Self::UnsupportedFormat(_)
                | Self::TooLarge { .. }
                | Self::TooManyImages { .. }
        )
    }
}

/// Processing error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Processing Error: {} at line {} in {}", kind, line, file)]
pub struct ProcessingError {
    /// The kind of error that occurred
    pub kind: ProcessingErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ProcessingError {
    /// Create a new processing error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ProcessingErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
