//! Structured image requests and URL parsing.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use imagery_core::{ImageFit, ImageFormat, ImageSize};
use imagery_error::{ImageryResult, RequestError, RequestErrorKind};
use uuid::Uuid;

/// One image, at one size, fit and format.
///
/// `size` is always normalized: any zero dimension becomes
/// [`ImageSize::ZERO`]. A zero size never carries a fit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRequest {
    /// Image id
    pub id: Uuid,
    /// Target size, zero for the original dimensions
    pub size: ImageSize,
    /// Fit as given; `None` means the default when a size is present
    pub fit: Option<ImageFit>,
    /// Output format
    pub format: ImageFormat,
    /// Raw signature bytes as supplied by the client
    pub signature: Option<Vec<u8>>,
}

impl ImageRequest {
    /// Build an unsigned request.
    ///
    /// # Errors
    ///
    /// `RequestErrorKind::FitWithoutSize` if `fit` is given with a zero size.
    pub fn new(
        id: Uuid,
        size: ImageSize,
        fit: Option<ImageFit>,
        format: ImageFormat,
    ) -> ImageryResult<Self> {
        let size = size.normalized();
        if size.is_zero() && fit.is_some() {
            return Err(RequestError::new(RequestErrorKind::FitWithoutSize).into());
        }
        Ok(Self {
            id,
            size,
            fit,
            format,
            signature: None,
        })
    }

    /// Request for the original dimensions in `format`.
    pub fn original(id: Uuid, format: ImageFormat) -> Self {
        Self {
            id,
            size: ImageSize::ZERO,
            fit: None,
            format,
            signature: None,
        }
    }

    /// Attach signature bytes.
    pub fn with_signature(mut self, signature: Vec<u8>) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Fit that is actually applied: `None` for the original size, the
    /// requested fit or [`ImageFit::DEFAULT`] otherwise.
    pub fn effective_fit(&self) -> Option<ImageFit> {
        if self.size.is_zero() {
            None
        } else {
            Some(self.fit.unwrap_or(ImageFit::DEFAULT))
        }
    }

    /// Whether serving this request needs more than the stored bytes.
    pub fn is_variant(&self) -> bool {
        !self.size.is_zero()
    }

    /// The byte string covered by the signature.
    ///
    /// `{id}{size}{fit}{ext}`, where the id is the 32-digit hex form, the size
    /// is `"0"` for the original, and the fit is empty for the original.
    pub(crate) fn signed_payload(&self) -> String {
        let fit = self.effective_fit().map(|f| f.as_str()).unwrap_or("");
        format!(
            "{}{}{}{}",
            self.id.simple(),
            self.size,
            fit,
            self.format.extension()
        )
    }

    /// Parse an image URL.
    ///
    /// `path` ends in `{id}.{ext}`; anything before the last `/` is ignored.
    /// `query` is the raw query string, with or without the leading `?`. Only
    /// the first occurrence of `size`, `fit` and `sig` counts, and empty values
    /// count as absent.
    ///
    /// Checks run in order: id, format, size, fit, fit against size, then
    /// signature encoding. The signature itself is not verified here.
    ///
    /// # Errors
    ///
    /// - `BadUrl` for a missing extension, a bad id, a malformed size or a
    ///   signature that is not URL-safe unpadded base64
    /// - `FormatUnsupported` for an unknown extension
    /// - `FitUnsupported` for an unknown fit
    /// - `FitWithoutSize` for a fit on an original-size request
    pub fn parse(path: &str, query: &str) -> ImageryResult<Self> {
        let file = path.rsplit('/').next().unwrap_or(path);
        let Some((id, extension)) = file.rsplit_once('.') else {
            return Err(bad_url(format!("missing extension in {:?}", file)));
        };

        let id = Uuid::parse_str(id).map_err(|_| bad_url(format!("invalid id {:?}", id)))?;

        let format = extension.parse::<ImageFormat>().map_err(|_| {
            RequestError::new(RequestErrorKind::FormatUnsupported(extension.to_string()))
        })?;

        let params = QueryParams::parse(query);

        let size = match params.size {
            Some(size) => size
                .parse::<ImageSize>()
                .map_err(bad_url)?
                .normalized(),
            None => ImageSize::ZERO,
        };

        let fit = params
            .fit
            .map(|fit| {
                fit.parse::<ImageFit>()
                    .map_err(|_| RequestError::new(RequestErrorKind::FitUnsupported(fit)))
            })
            .transpose()?;

        if size.is_zero() && fit.is_some() {
            return Err(RequestError::new(RequestErrorKind::FitWithoutSize).into());
        }

        let signature = params
            .sig
            .map(|sig| {
                URL_SAFE_NO_PAD
                    .decode(sig.as_bytes())
                    .map_err(|_| bad_url("signature is not valid base64".to_string()))
            })
            .transpose()?;

        Ok(Self {
            id,
            size,
            fit,
            format,
            signature,
        })
    }
}

fn bad_url(reason: String) -> imagery_error::ImageryError {
    RequestError::new(RequestErrorKind::BadUrl(reason)).into()
}

#[derive(Default)]
struct QueryParams {
    size: Option<String>,
    fit: Option<String>,
    sig: Option<String>,
}

impl QueryParams {
    fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Self::default();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_ref() {
                "size" => &mut params.size,
                "fit" => &mut params.fit,
                "sig" => &mut params.sig,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }

        params
    }
}
