//! Command handlers.

use super::commands::Commands;
use imagery::{
    ImageOptions, ImageRepository, ImageService, ImageSize, ImageryConfig, ImageryResult,
    InMemoryImageRepository, ProcessingError, ProcessingErrorKind, PostgresImageRepository,
    StorageError, StorageErrorKind, serve_http,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Build the service, connecting to PostgreSQL when a database is configured.
pub async fn open_service(config: &ImageryConfig) -> ImageryResult<ImageService> {
    let repository: Arc<dyn ImageRepository> = match &config.database_url {
        Some(url) => Arc::new(PostgresImageRepository::connect(url).await?),
        None => {
            tracing::warn!("No database configured; image records will not outlive this process");
            Arc::new(InMemoryImageRepository::new())
        }
    };
    ImageService::from_config(config, repository)
}

/// Run one command.
pub async fn handle_command(command: Commands, config: &ImageryConfig) -> ImageryResult<()> {
    let service = open_service(config).await?;

    match command {
        Commands::Serve => serve_http(config, service).await,

        Commands::Upload {
            files,
            format,
            size,
            fit,
            store,
        } => {
            let store = store.unwrap_or_else(|| config.default_store_name().to_string());
            let options = ImageOptions { format, size, fit };
            upload(&service, &store, files, &options).await
        }

        Commands::Delete { ids } => {
            let deleted = service.delete_images(&ids).await?;
            println!("Deleted {} of {} images", deleted, ids.len());
            Ok(())
        }

        Commands::ClearCache => {
            let removed = service.clear_cache().await?;
            println!("Removed {} cached variants", removed);
            Ok(())
        }

        Commands::Url {
            id,
            size,
            fit,
            format,
        } => {
            let record = service.record(id).await?;
            println!("{}", service.image_url(&record, size.normalized(), fit, format)?);
            Ok(())
        }
    }
}

async fn upload(
    service: &ImageService,
    store: &str,
    files: Vec<PathBuf>,
    options: &ImageOptions,
) -> ImageryResult<()> {
    let mut uploads = Vec::with_capacity(files.len());
    for file in &files {
        let bytes = tokio::fs::read(file).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!(
                "{}: {}",
                file.display(),
                e
            )))
        })?;
        uploads.push(bytes);
    }

    let records = service.save_images(store, uploads, options).await?;
    for record in &records {
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| ProcessingError::new(ProcessingErrorKind::Encode(e.to_string())))?;
        println!("{}", json);
        println!(
            "{}",
            service.image_url(record, ImageSize::ZERO, None, None)?
        );
    }
    Ok(())
}
