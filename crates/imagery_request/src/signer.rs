//! HMAC signing, verification and URL construction.

use crate::ImageRequest;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use imagery_core::ImageFit;
use imagery_error::{ImageryResult, RequestError, RequestErrorKind};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies image requests with a process-wide secret.
///
/// Without a key, URLs are generated unsigned and every request verifies.
/// With a key, a request verifies only if its own signature matches an HMAC
/// recomputed over its own parsed fields.
#[derive(Clone, Default)]
pub struct RequestSigner {
    key: Option<Vec<u8>>,
}

impl RequestSigner {
    /// Signer using `key`. An empty key disables signing.
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        let key = key.into();
        Self {
            key: (!key.is_empty()).then_some(key),
        }
    }

    /// Signer with signing disabled.
    pub fn unsigned() -> Self {
        Self::default()
    }

    /// Signer from an optional configured secret.
    pub fn from_secret(secret: Option<&str>) -> Self {
        secret.map(|s| Self::new(s.as_bytes())).unwrap_or_default()
    }

    /// Whether a key is configured.
    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    fn mac(key: &[u8], request: &ImageRequest) -> ImageryResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(key)
            .map_err(|_| RequestError::new(RequestErrorKind::BadSignature))?;
        mac.update(request.signed_payload().as_bytes());
        Ok(mac)
    }

    /// Signature for `request`, or `None` when signing is disabled.
    ///
    /// Any signature already attached to `request` is ignored.
    pub fn sign(&self, request: &ImageRequest) -> Option<Vec<u8>> {
        let key = self.key.as_deref()?;
        let mac = Self::mac(key, request).ok()?;
        Some(mac.finalize().into_bytes().to_vec())
    }

    /// `request` with a fresh signature attached, if signing is enabled.
    pub fn signed(&self, request: ImageRequest) -> ImageRequest {
        match self.sign(&request) {
            Some(signature) => request.with_signature(signature),
            None => request,
        }
    }

    /// Check the signature carried by `request` against its own fields.
    ///
    /// # Errors
    ///
    /// `RequestErrorKind::BadSignature` if a key is configured and the
    /// signature is missing, truncated or computed over anything else.
    #[tracing::instrument(skip(self, request), fields(id = %request.id))]
    pub fn verify(&self, request: &ImageRequest) -> ImageryResult<()> {
        let Some(key) = self.key.as_deref() else {
            tracing::debug!("Signing disabled, accepting request");
            return Ok(());
        };

        let Some(signature) = request.signature.as_deref() else {
            tracing::debug!("Rejecting unsigned request");
            return Err(RequestError::new(RequestErrorKind::BadSignature).into());
        };

        Self::mac(key, request)?
            .verify_slice(signature)
            .map_err(|_| {
                tracing::debug!("Rejecting request with bad signature");
                RequestError::new(RequestErrorKind::BadSignature).into()
            })
    }

    /// Relative URL for `request`: `{id}{ext}` plus only the non-default
    /// query parameters, signed when a key is configured.
    pub fn url(&self, request: &ImageRequest) -> String {
        let mut path = request.id.simple().to_string();
        path.push_str(request.format.extension());

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if request.is_variant() {
            query.append_pair("size", &request.size.to_string());
            if let Some(fit) = request.fit.filter(|fit| *fit != ImageFit::DEFAULT) {
                query.append_pair("fit", fit.as_str());
            }
        }
        if let Some(signature) = self.sign(request) {
            query.append_pair("sig", &URL_SAFE_NO_PAD.encode(signature));
        }

        let query = query.finish();
        if query.is_empty() {
            path
        } else {
            format!("{}?{}", path, query)
        }
    }

    /// [`url`](Self::url) under the public prefix, e.g. `/images/`.
    pub fn full_url(&self, prefix: &str, request: &ImageRequest) -> String {
        format!("{}/{}", prefix.trim_end_matches('/'), self.url(request))
    }
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
