//! Signed image request protocol.
//!
//! Image URLs carry the transformation to apply (size, fit, output format)
//! and an HMAC over those parameters, so clients cannot ask the server for
//! transformations it never handed out.
//!
//! ```text
//! {id}.{ext}?size={WxH|N}&fit={cover|contain}&sig={base64url-no-pad}
//! ```
//!
//! [`ImageRequest::parse`] turns a URL into a request and rejects anything
//! malformed before any I/O happens. [`RequestSigner`] signs, verifies and
//! builds URLs.
//!
//! # Example
//!
//! ```
//! use imagery_core::{ImageFit, ImageFormat, ImageSize};
//! use imagery_request::{ImageRequest, RequestSigner};
//! use uuid::Uuid;
//!
//! let signer = RequestSigner::new(b"secret".to_vec());
//! let request = ImageRequest::new(
//!     Uuid::new_v4(),
//!     ImageSize::square(64),
//!     Some(ImageFit::Cover),
//!     ImageFormat::Webp,
//! )
//! .unwrap();
//!
//! let url = signer.url(&request);
//! let (path, query) = url.split_once('?').unwrap();
//! let parsed = ImageRequest::parse(path, query).unwrap();
//! assert!(signer.verify(&parsed).is_ok());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod request;
mod signer;

pub use request::ImageRequest;
pub use signer::RequestSigner;
