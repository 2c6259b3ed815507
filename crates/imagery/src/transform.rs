//! Decoding, resizing and encoding.
//!
//! Everything here is CPU-bound and synchronous; the service runs it on the
//! blocking pool.

use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder};
use imagery_core::{ImageFit, ImageFormat, ImageSize, Rgb, average_color, image_contain_size};
use imagery_error::{ImageryResult, ProcessingError, ProcessingErrorKind};

const JPEG_QUALITY: u8 = 85;

/// Format of `bytes`, detected from magic bytes.
///
/// # Errors
///
/// `Decode` if the bytes are not a recognizable image,
/// `UnsupportedFormat` if they are an image of another format.
pub fn detect_format(bytes: &[u8]) -> ImageryResult<ImageFormat> {
    let detected = image::guess_format(bytes)
        .map_err(|e| ProcessingError::new(ProcessingErrorKind::Decode(e.to_string())))?;
    ImageFormat::from_image_format(detected).ok_or_else(|| {
        ProcessingError::new(ProcessingErrorKind::UnsupportedFormat(format!(
            "{:?}",
            detected
        )))
        .into()
    })
}

/// Decode `bytes` known to be `format`.
pub fn decode(bytes: &[u8], format: ImageFormat) -> ImageryResult<DynamicImage> {
    image::load_from_memory_with_format(bytes, format.to_image_format()).map_err(|e| {
        ProcessingError::new(ProcessingErrorKind::Decode(e.to_string())).into()
    })
}

/// Resize `image` into a `size` box with `fit`. A zero size returns the image
/// unchanged.
///
/// `Cover` fills the box exactly, cropping the overflow. `Contain` fits the
/// image inside the box and never enlarges it.
pub fn resize(image: DynamicImage, size: ImageSize, fit: ImageFit) -> DynamicImage {
    if size.is_zero() {
        return image;
    }

    match fit {
        ImageFit::Cover => image.resize_to_fill(size.width, size.height, FilterType::Lanczos3),
        ImageFit::Contain => {
            let (width, height) = image.dimensions();
            let (target_width, target_height) =
                image_contain_size(width, height, size.width, size.height);
            let (target_width, target_height) = (target_width.max(1), target_height.max(1));
            if (target_width, target_height) == (width, height) {
                image
            } else {
                image.resize_exact(target_width, target_height, FilterType::Lanczos3)
            }
        }
    }
}

/// Encode `image` as `format`.
///
/// Re-encoding drops any embedded metadata. JPEG output loses alpha, WebP
/// output is lossless.
pub fn encode(image: &DynamicImage, format: ImageFormat) -> ImageryResult<Vec<u8>> {
    let encode_error =
        |e: image::ImageError| ProcessingError::new(ProcessingErrorKind::Encode(e.to_string()));

    let mut bytes = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            let rgb = image.to_rgb8();
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY)
                .write_image(
                    rgb.as_raw(),
                    rgb.width(),
                    rgb.height(),
                    ExtendedColorType::Rgb8,
                )
                .map_err(encode_error)?;
        }
        ImageFormat::Webp => {
            let rgba = image.to_rgba8();
            image::codecs::webp::WebPEncoder::new_lossless(&mut bytes)
                .write_image(
                    rgba.as_raw(),
                    rgba.width(),
                    rgba.height(),
                    ExtendedColorType::Rgba8,
                )
                .map_err(encode_error)?;
        }
        ImageFormat::Png => {
            let rgba = image.to_rgba8();
            image::codecs::png::PngEncoder::new(&mut bytes)
                .write_image(
                    rgba.as_raw(),
                    rgba.width(),
                    rgba.height(),
                    ExtendedColorType::Rgba8,
                )
                .map_err(encode_error)?;
        }
    }
    Ok(bytes)
}

/// Produce the bytes for a derived variant of a stored original.
pub fn render_variant(
    original: &[u8],
    stored_format: ImageFormat,
    size: ImageSize,
    fit: Option<ImageFit>,
    format: ImageFormat,
) -> ImageryResult<Vec<u8>> {
    let image = decode(original, stored_format)?;
    let image = match fit {
        Some(fit) => resize(image, size, fit),
        None => image,
    };
    encode(&image, format)
}

/// An upload after validation and processing, ready to persist.
#[derive(Debug, Clone)]
pub struct ProcessedUpload {
    /// Bytes to store
    pub bytes: Vec<u8>,
    /// Format of `bytes`
    pub format: ImageFormat,
    /// Width of the stored image
    pub width: u32,
    /// Height of the stored image
    pub height: u32,
    /// Average color of the upload as received
    pub average_color: Rgb,
    /// Length of the upload as received
    pub upload_size: usize,
}

/// Decode and sample an upload, then re-encode it unless `skip_processing`.
pub fn process_upload(
    upload: Vec<u8>,
    format: ImageFormat,
    size: ImageSize,
    fit: ImageFit,
    skip_processing: bool,
) -> ImageryResult<ProcessedUpload> {
    let upload_format = detect_format(&upload)?;
    let image = decode(&upload, upload_format)?;
    let average_color = average_color(&image);
    let upload_size = upload.len();

    if skip_processing {
        let (width, height) = image.dimensions();
        return Ok(ProcessedUpload {
            bytes: upload,
            format: upload_format,
            width,
            height,
            average_color,
            upload_size,
        });
    }

    let image = resize(image, size, fit);
    let (width, height) = image.dimensions();
    Ok(ProcessedUpload {
        bytes: encode(&image, format)?,
        format,
        width,
        height,
        average_color,
        upload_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn sample(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        }))
    }

    #[test]
    fn test_encode_then_detect() {
        let image = sample(20, 10);
        for format in [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Webp] {
            let bytes = encode(&image, format).unwrap();
            assert_eq!(detect_format(&bytes).unwrap(), format);
            assert_eq!(decode(&bytes, format).unwrap().dimensions(), (20, 10));
        }
    }

    #[test]
    fn test_detect_rejects_other_formats() {
        let mut gif = Vec::new();
        sample(4, 4)
            .write_to(&mut std::io::Cursor::new(&mut gif), image::ImageFormat::Gif)
            .unwrap();
        let err = detect_format(&gif).unwrap_err();
        assert!(err.is_bad_request());

        assert!(detect_format(b"definitely not an image").is_err());
    }

    #[test]
    fn test_cover_fills_box() {
        let resized = resize(sample(200, 50), ImageSize::new(40, 40), ImageFit::Cover);
        assert_eq!(resized.dimensions(), (40, 40));
    }

    #[test]
    fn test_contain_keeps_ratio() {
        let resized = resize(sample(200, 50), ImageSize::new(100, 100), ImageFit::Contain);
        assert_eq!(resized.dimensions(), (100, 25));
    }

    #[test]
    fn test_contain_never_enlarges() {
        let resized = resize(sample(30, 20), ImageSize::new(100, 100), ImageFit::Contain);
        assert_eq!(resized.dimensions(), (30, 20));
    }

    #[test]
    fn test_process_upload_reencodes() {
        let png = encode(&sample(64, 32), ImageFormat::Png).unwrap();
        let processed = process_upload(
            png.clone(),
            ImageFormat::Webp,
            ImageSize::square(16),
            ImageFit::Contain,
            false,
        )
        .unwrap();
        assert_eq!(processed.format, ImageFormat::Webp);
        assert_eq!((processed.width, processed.height), (16, 8));
        assert_eq!(processed.upload_size, png.len());
        assert_eq!(detect_format(&processed.bytes).unwrap(), ImageFormat::Webp);
    }

    #[test]
    fn test_process_upload_skip_keeps_bytes() {
        let png = encode(&sample(64, 32), ImageFormat::Png).unwrap();
        let processed = process_upload(
            png.clone(),
            ImageFormat::Jpeg,
            ImageSize::square(16),
            ImageFit::Cover,
            true,
        )
        .unwrap();
        assert_eq!(processed.bytes, png);
        assert_eq!(processed.format, ImageFormat::Png);
        assert_eq!((processed.width, processed.height), (64, 32));
    }
}
