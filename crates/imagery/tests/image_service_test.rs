//! End-to-end tests for uploading, serving and deleting images.

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use imagery::{
    FileSystemStore, ImageFit, ImageFormat, ImageOptions, ImageRecord, ImageRequest,
    ImageService, ImageSize, ImageStore, ImageryErrorKind, ImageryResult,
    InMemoryImageRepository, ObjectStorage, ProcessingErrorKind, RequestSigner, StorageError,
    StorageErrorKind, StoreRegistry, VariantCache, VariantCacheConfig, transform,
};
use object_store::ObjectStore;
use object_store::memory::InMemory;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

const SECRET: &str = "test-signing-secret";

struct Harness {
    dir: TempDir,
    service: ImageService,
    repository: Arc<InMemoryImageRepository>,
    objects: Arc<InMemory>,
}

/// Store whose writes always fail.
struct BrokenStore;

#[async_trait]
impl ImageStore for BrokenStore {
    fn name(&self) -> &str {
        "broken"
    }

    async fn get(&self, record: &ImageRecord) -> ImageryResult<Vec<u8>> {
        Err(StorageError::new(StorageErrorKind::NotFound(record.relative_path())).into())
    }

    async fn save(&self, _record: &ImageRecord, _data: &[u8]) -> ImageryResult<()> {
        Err(StorageError::new(StorageErrorKind::FileWrite("disk full".to_string())).into())
    }

    async fn delete(&self, _record: &ImageRecord) -> ImageryResult<()> {
        Ok(())
    }
}

fn harness_with(secret: Option<&str>, max_images_per_post: usize) -> Harness {
    let dir = TempDir::new().unwrap();
    let objects = Arc::new(InMemory::new());

    let mut registry = StoreRegistry::new();
    registry
        .register(Arc::new(FileSystemStore::new(dir.path()).unwrap()))
        .unwrap();
    registry
        .register(Arc::new(ObjectStorage::new(
            objects.clone(),
            Some("media".to_string()),
        )))
        .unwrap();
    registry.register(Arc::new(BrokenStore)).unwrap();

    let repository = Arc::new(InMemoryImageRepository::new());
    let service = ImageService::builder()
        .registry(Arc::new(registry))
        .repository(repository.clone())
        .cache(VariantCache::new(VariantCacheConfig::new(dir.path())))
        .signer(RequestSigner::from_secret(secret))
        .max_image_size(1_000_000)
        .max_images_per_post(max_images_per_post)
        .build()
        .unwrap();

    Harness {
        dir,
        service,
        repository,
        objects,
    }
}

fn harness() -> Harness {
    harness_with(Some(SECRET), 10)
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 7 % 256) as u8, (y * 13 % 256) as u8, 90, 255])
    }));
    transform::encode(&image, ImageFormat::Png).unwrap()
}

fn split(url: &str) -> (&str, &str) {
    url.split_once('?').unwrap_or((url, ""))
}

async fn serve_url(service: &ImageService, url: &str) -> ImageryResult<imagery::ServedImage> {
    let (path, query) = split(url);
    service.serve(path, query).await
}

#[tokio::test]
async fn test_upload_stores_bytes_and_row() {
    let h = harness();
    let record = h
        .service
        .save_image("disk", png(64, 32), &ImageOptions::default())
        .await
        .unwrap();

    assert_eq!(record.store_name, "disk");
    assert_eq!(record.format, ImageFormat::Jpeg);
    assert_eq!((record.width, record.height), (64, 32));
    assert_eq!(h.repository.len().await, 1);

    let on_disk = std::fs::read(h.dir.path().join(record.relative_path())).unwrap();
    assert_eq!(on_disk.len() as u64, record.size);
    assert_eq!(
        transform::detect_format(&on_disk).unwrap(),
        ImageFormat::Jpeg
    );
}

#[tokio::test]
async fn test_upload_resizes_and_samples_color() {
    let h = harness();
    let red = DynamicImage::ImageRgba8(RgbaImage::from_pixel(100, 50, Rgba([250, 10, 10, 255])));
    let upload = transform::encode(&red, ImageFormat::Png).unwrap();
    let upload_len = upload.len();

    let options = ImageOptions {
        format: ImageFormat::Png,
        size: ImageSize::square(20),
        fit: Some(ImageFit::Contain),
    };
    let record = h.service.save_image("disk", upload, &options).await.unwrap();

    assert_eq!((record.width, record.height), (20, 10));
    assert_eq!(record.upload_size, upload_len as u64);
    assert!(record.average_color.red > 200);
    assert!(record.average_color.green < 50);
    assert!(record.average_color.blue < 50);
}

#[tokio::test]
async fn test_serve_original() {
    let h = harness();
    let record = h
        .service
        .save_image("disk", png(40, 40), &ImageOptions::default())
        .await
        .unwrap();

    let url = h
        .service
        .image_url(&record, ImageSize::ZERO, None, None)
        .unwrap();
    assert!(url.starts_with("/images/"));

    let served = serve_url(&h.service, &url).await.unwrap();
    assert_eq!(served.format, ImageFormat::Jpeg);
    assert_eq!(served.content_type(), "image/jpeg");
    assert_eq!(
        served.bytes,
        std::fs::read(h.dir.path().join(record.relative_path())).unwrap()
    );
}

#[tokio::test]
async fn test_serve_variant_then_cache_hit() {
    let h = harness();
    let record = h
        .service
        .save_image("disk", png(80, 40), &ImageOptions::default())
        .await
        .unwrap();

    let url = h
        .service
        .image_url(
            &record,
            ImageSize::square(16),
            Some(ImageFit::Cover),
            Some(ImageFormat::Webp),
        )
        .unwrap();

    let first = serve_url(&h.service, &url).await.unwrap();
    assert_eq!(first.format, ImageFormat::Webp);
    let decoded = image::load_from_memory(&first.bytes).unwrap();
    assert_eq!(decoded.dimensions(), (16, 16));

    let request = ImageRequest::new(
        record.id,
        ImageSize::square(16),
        Some(ImageFit::Cover),
        ImageFormat::Webp,
    )
    .unwrap();
    assert!(h.service.cache().path_for(&request).exists());

    // With the original gone only the cache can answer
    std::fs::remove_file(h.dir.path().join(record.relative_path())).unwrap();
    let second = serve_url(&h.service, &url).await.unwrap();
    assert_eq!(second.bytes, first.bytes);
}

#[tokio::test]
async fn test_serve_format_change_is_not_cached() {
    let h = harness();
    let record = h
        .service
        .save_image("disk", png(24, 24), &ImageOptions::default())
        .await
        .unwrap();

    let url = h
        .service
        .image_url(&record, ImageSize::ZERO, None, Some(ImageFormat::Png))
        .unwrap();
    let served = serve_url(&h.service, &url).await.unwrap();
    assert_eq!(
        transform::detect_format(&served.bytes).unwrap(),
        ImageFormat::Png
    );
    assert_eq!(h.service.clear_cache().await.unwrap(), 0);
}

#[tokio::test]
async fn test_forged_requests_are_rejected() {
    let h = harness();
    let record = h
        .service
        .save_image("disk", png(32, 32), &ImageOptions::default())
        .await
        .unwrap();

    let url = h
        .service
        .image_url(&record, ImageSize::square(8), None, None)
        .unwrap();
    let (path, query) = split(&url);

    let enlarged = query.replace("size=8", "size=4000");
    let err = h.service.serve(path, &enlarged).await.unwrap_err();
    assert!(err.is_bad_request());

    let unsigned = query.split("&sig=").next().unwrap();
    let err = h.service.serve(path, unsigned).await.unwrap_err();
    assert!(err.is_bad_request());

    let err = h.service.serve("/images/not-an-id.jpeg", "").await.unwrap_err();
    assert!(err.is_bad_request());

    // Nothing was rendered for the rejected requests
    assert_eq!(h.service.clear_cache().await.unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_image_is_not_found() {
    let h = harness();
    let request = h
        .service
        .signer()
        .signed(ImageRequest::original(Uuid::new_v4(), ImageFormat::Jpeg));
    let url = h.service.signer().full_url("/images/", &request);

    let err = serve_url(&h.service, &url).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_unsigned_mode_serves_plain_urls() {
    let h = harness_with(None, 10);
    let record = h
        .service
        .save_image("disk", png(16, 16), &ImageOptions::default())
        .await
        .unwrap();

    let url = h
        .service
        .image_url(&record, ImageSize::square(8), None, None)
        .unwrap();
    assert!(!url.contains("sig="));
    assert!(serve_url(&h.service, &url).await.is_ok());
}

#[tokio::test]
async fn test_rejected_uploads_persist_nothing() {
    let h = harness();

    let err = h
        .service
        .save_image("disk", vec![0; 1_000_001], &ImageOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err.kind(),
        ImageryErrorKind::Processing(e) if matches!(e.kind, ProcessingErrorKind::TooLarge { .. })
    ));

    let mut gif = Vec::new();
    DynamicImage::ImageRgba8(RgbaImage::new(4, 4))
        .write_to(&mut std::io::Cursor::new(&mut gif), image::ImageFormat::Gif)
        .unwrap();
    let err = h
        .service
        .save_image("disk", gif, &ImageOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_bad_request());

    let err = h
        .service
        .save_image("ftp", png(8, 8), &ImageOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_store_not_registered());

    assert!(h.repository.is_empty().await);
}

#[tokio::test]
async fn test_failed_backend_write_rolls_back_row() {
    let h = harness();
    let err = h
        .service
        .save_image("broken", png(8, 8), &ImageOptions::default())
        .await
        .unwrap_err();
    assert!(format!("{}", err).contains("disk full"));
    assert!(h.repository.is_empty().await);
}

#[tokio::test]
async fn test_object_storage_round_trip() {
    let h = harness();
    let record = h
        .service
        .save_image("s3", png(30, 30), &ImageOptions::default())
        .await
        .unwrap();
    assert_eq!(record.store_name, "s3");

    let key = object_store::path::Path::from(format!("media/{}", record.relative_path()));
    let meta = h.objects.head(&key).await.unwrap();
    assert_eq!(meta.size, record.size);

    let url = h
        .service
        .image_url(&record, ImageSize::square(10), None, None)
        .unwrap();
    let served = serve_url(&h.service, &url).await.unwrap();
    let decoded = image::load_from_memory(&served.bytes).unwrap();
    assert_eq!(decoded.dimensions(), (10, 10));
}

#[tokio::test]
async fn test_delete_removes_bytes_row_and_variants() {
    let h = harness();
    let record = h
        .service
        .save_image("disk", png(50, 50), &ImageOptions::default())
        .await
        .unwrap();
    let url = h
        .service
        .image_url(&record, ImageSize::square(12), None, None)
        .unwrap();
    serve_url(&h.service, &url).await.unwrap();

    let deleted = h
        .service
        .delete_images(&[record.id, Uuid::new_v4()])
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert!(h.repository.is_empty().await);
    assert!(!h.dir.path().join(record.relative_path()).exists());

    let folder = h.dir.path().join(record.folder());
    let leftovers = std::fs::read_dir(&folder)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0);

    let err = serve_url(&h.service, &url).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_concurrent_misses_agree() {
    let h = harness();
    let record = h
        .service
        .save_image("disk", png(60, 45), &ImageOptions::default())
        .await
        .unwrap();
    let url = h
        .service
        .image_url(&record, ImageSize::new(30, 20), Some(ImageFit::Cover), None)
        .unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let service = h.service.clone();
            let url = url.clone();
            tokio::spawn(async move { serve_url(&service, &url).await })
        })
        .collect();

    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.unwrap().unwrap().bytes);
    }
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));

    // The cached copy is one of the complete renders
    let again = serve_url(&h.service, &url).await.unwrap();
    assert_eq!(again.bytes, results[0]);
}

#[tokio::test]
async fn test_batch_limit() {
    let h = harness_with(Some(SECRET), 2);
    let uploads = vec![png(4, 4), png(4, 4), png(4, 4)];
    let err = h
        .service
        .save_images("disk", uploads, &ImageOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_bad_request());
    assert!(h.repository.is_empty().await);

    let records = h
        .service
        .save_images("disk", vec![png(4, 4), png(6, 6)], &ImageOptions::default())
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(h.repository.len().await, 2);
}

#[tokio::test]
async fn test_clear_cache_keeps_originals() {
    let h = harness();
    let record = h
        .service
        .save_image("disk", png(40, 40), &ImageOptions::default())
        .await
        .unwrap();
    for side in [8, 16] {
        let url = h
            .service
            .image_url(&record, ImageSize::square(side), None, None)
            .unwrap();
        serve_url(&h.service, &url).await.unwrap();
    }

    assert_eq!(h.service.clear_cache().await.unwrap(), 2);
    assert!(h.dir.path().join(record.relative_path()).exists());
}

#[tokio::test]
async fn test_variant_dimension_limit() {
    let dir = TempDir::new().unwrap();
    let mut registry = StoreRegistry::new();
    registry
        .register(Arc::new(FileSystemStore::new(dir.path()).unwrap()))
        .unwrap();
    let service = ImageService::builder()
        .registry(Arc::new(registry))
        .repository(Arc::new(InMemoryImageRepository::new()))
        .cache(VariantCache::new(VariantCacheConfig::new(dir.path())))
        .max_variant_dimension(64)
        .build()
        .unwrap();

    let record = service
        .save_image("disk", png(32, 24), &ImageOptions::default())
        .await
        .unwrap();

    let at_limit = ImageRequest::new(
        record.id,
        ImageSize::square(64),
        Some(ImageFit::Cover),
        ImageFormat::Png,
    )
    .unwrap();
    let served = service.get_image(&at_limit).await.unwrap();
    let decoded = image::load_from_memory(&served.bytes).unwrap();
    assert_eq!(decoded.dimensions(), (64, 64));

    let over = ImageRequest::new(
        record.id,
        ImageSize::new(65, 10),
        Some(ImageFit::Cover),
        ImageFormat::Png,
    )
    .unwrap();
    let err = service.get_image(&over).await.unwrap_err();
    assert!(err.is_bad_request());

    let path = format!("/images/{}.jpeg", record.id.simple());
    let err = service.serve(&path, "size=65&fit=cover").await.unwrap_err();
    assert!(err.is_bad_request());

    // Uploads are held to the same box
    let options = ImageOptions {
        size: ImageSize::square(65),
        ..ImageOptions::default()
    };
    let err = service
        .save_image("disk", png(8, 8), &options)
        .await
        .unwrap_err();
    assert!(err.is_bad_request());
}

#[tokio::test]
async fn test_unreadable_original_is_not_a_client_error() {
    let h = harness();
    let record = h
        .service
        .save_image("disk", png(20, 20), &ImageOptions::default())
        .await
        .unwrap();
    std::fs::write(h.dir.path().join(record.relative_path()), b"garbage").unwrap();

    let url = h
        .service
        .image_url(&record, ImageSize::square(8), None, None)
        .unwrap();
    let err = serve_url(&h.service, &url).await.unwrap_err();
    assert!(!err.is_bad_request());
    assert!(!err.is_not_found());
    assert!(matches!(
        err.kind(),
        ImageryErrorKind::Processing(e) if matches!(e.kind, ProcessingErrorKind::StoredImage(_))
    ));
}
