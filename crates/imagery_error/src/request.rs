//! Image request error types.

/// Reasons an inbound image request is rejected before any I/O.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum RequestErrorKind {
    /// The URL could not be parsed into a request
    #[display("Bad image request url: {}", _0)]
    BadUrl(String),
    /// The extension names no supported format
    #[display("Image format not supported: {}", _0)]
    FormatUnsupported(String),
    /// The fit parameter names no supported fit
    #[display("Invalid image fit: {}", _0)]
    FitUnsupported(String),
    /// A fit was given for an original-size request
    #[display("Image fit requires a non-zero size")]
    FitWithoutSize,
    /// The signature does not match the request parameters
    #[display("Invalid image request signature")]
    BadSignature,
    /// A requested dimension exceeds the configured maximum
    #[display("Image size {} exceeds the limit of {} pixels per side", size, limit)]
    SizeTooLarge {
        /// Requested size as it appears in the URL
        size: String,
        /// Configured maximum width or height
        limit: u32,
    },
}

/// Request error with location tracking.
///
/// # Examples
///
/// ```
/// use imagery_error::{RequestError, RequestErrorKind};
///
/// let err = RequestError::new(RequestErrorKind::FitUnsupported("fill".into()));
/// assert!(format!("{}", err).contains("fill"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Request Error: {} at line {} in {}", kind, line, file)]
pub struct RequestError {
    /// The kind of error that occurred
    pub kind: RequestErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl RequestError {
    /// Create a new request error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: RequestErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
