//! Tests for the HTTP image endpoint.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use imagery::{
    CACHE_CONTROL, FileSystemStore, ImageFormat, ImageOptions, ImageRecord, ImageService,
    ImageSize, InMemoryImageRepository, RequestSigner, StoreRegistry, VariantCache,
    VariantCacheConfig, create_router, transform,
};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

async fn service_with_image(dir: &TempDir) -> (ImageService, ImageRecord) {
    service_with_signer(dir, RequestSigner::new("router-secret")).await
}

async fn service_with_signer(dir: &TempDir, signer: RequestSigner) -> (ImageService, ImageRecord) {
    let mut registry = StoreRegistry::new();
    registry
        .register(Arc::new(FileSystemStore::new(dir.path()).unwrap()))
        .unwrap();

    let service = ImageService::builder()
        .registry(Arc::new(registry))
        .repository(Arc::new(InMemoryImageRepository::new()))
        .cache(VariantCache::new(VariantCacheConfig::new(dir.path())))
        .signer(signer)
        .build()
        .unwrap();

    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(32, 24, Rgba([0, 120, 240, 255])));
    let upload = transform::encode(&image, ImageFormat::Png).unwrap();
    let record = service
        .save_image("disk", upload, &ImageOptions::default())
        .await
        .unwrap();
    (service, record)
}

async fn get(service: ImageService, uri: &str) -> axum::response::Response {
    create_router(service, "/images/")
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let (service, _) = service_with_image(&dir).await;

    let response = get(service, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_serves_signed_variant() {
    let dir = TempDir::new().unwrap();
    let (service, record) = service_with_image(&dir).await;
    let url = service
        .image_url(&record, ImageSize::square(12), None, Some(ImageFormat::Png))
        .unwrap();

    let response = get(service, &url).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(response.headers()[header::CACHE_CONTROL], CACHE_CONTROL);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!(decoded.dimensions(), (12, 9));
}

#[tokio::test]
async fn test_bad_signature_is_400() {
    let dir = TempDir::new().unwrap();
    let (service, record) = service_with_image(&dir).await;
    let url = service
        .image_url(&record, ImageSize::square(12), None, None)
        .unwrap();
    let forged = url.replace("size=12", "size=13");

    let response = get(service, &forged).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_name_is_400() {
    let dir = TempDir::new().unwrap();
    let (service, _) = service_with_image(&dir).await;

    let response = get(service, "/images/nonsense").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_deleted_image_is_404() {
    let dir = TempDir::new().unwrap();
    let (service, record) = service_with_image(&dir).await;
    let url = service
        .image_url(&record, ImageSize::ZERO, None, None)
        .unwrap();
    service.delete_images(&[record.id]).await.unwrap();

    let response = get(service, &url).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unregistered_store_is_500() {
    let dir = TempDir::new().unwrap();
    let (service, record) = service_with_image(&dir).await;
    let url = service
        .image_url(&record, ImageSize::ZERO, None, None)
        .unwrap();

    // Same rows, but a process that no longer has the disk backend
    let stripped = ImageService::builder()
        .registry(Arc::new(StoreRegistry::new()))
        .repository(shared_repository(&service, &record).await)
        .cache(VariantCache::new(VariantCacheConfig::new(dir.path())))
        .signer(RequestSigner::new("router-secret"))
        .build()
        .unwrap();

    let response = get(stripped, &url).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

async fn shared_repository(
    service: &ImageService,
    record: &ImageRecord,
) -> Arc<InMemoryImageRepository> {
    use imagery::ImageRepository;

    let stored = service.record(record.id).await.unwrap();
    let repository = Arc::new(InMemoryImageRepository::new());
    repository
        .insert_image(&stored, Box::pin(async { Ok::<(), imagery::ImageryError>(()) }))
        .await
        .unwrap();
    repository
}

#[tokio::test]
async fn test_oversized_variant_is_400_without_signing() {
    let dir = TempDir::new().unwrap();
    let (service, record) = service_with_signer(&dir, RequestSigner::unsigned()).await;

    let uri = format!("/images/{}.jpeg?size=40000&fit=cover", record.id.simple());
    let response = get(service.clone(), &uri).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let uri = format!("/images/{}.jpeg?size=8x40000", record.id.simple());
    let response = get(service.clone(), &uri).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(service.clear_cache().await.unwrap(), 0);
}

#[tokio::test]
async fn test_corrupt_stored_original_is_500() {
    let dir = TempDir::new().unwrap();
    let (service, record) = service_with_image(&dir).await;
    std::fs::write(dir.path().join(record.relative_path()), b"garbage").unwrap();

    let url = service
        .image_url(&record, ImageSize::square(8), Some(imagery::ImageFit::Cover), None)
        .unwrap();
    let response = get(service, &url).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
