//! Service configuration.

use config::{Config, Environment, File, FileFormat};
use imagery_error::{ConfigError, ImageryError, ImageryResult};
use imagery_storage::{FileSystemStore, ObjectStorage, S3Config};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Upload size limit when none is configured (25 MiB).
pub const DEFAULT_MAX_IMAGE_SIZE: usize = 25 * 1024 * 1024;

/// Largest width or height a served variant may request.
pub const DEFAULT_MAX_VARIANT_DIMENSION: u32 = 4096;

/// Public URL prefix when none is configured.
pub const DEFAULT_URL_PREFIX: &str = "/images/";

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "IMAGERY";

const DEFAULT_CONFIG: &str = include_str!("../../../imagery.toml");

/// Configuration for the image subsystem.
///
/// Sources, later overriding earlier:
/// 1. Bundled defaults (`imagery.toml` shipped with the crate)
/// 2. `~/.config/imagery/imagery.toml`
/// 3. `./imagery.toml`, or the file passed to [`ImageryConfig::load_from`]
/// 4. `IMAGERY_*` environment variables, `__` separating nested keys
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageryConfig {
    /// Whether the HTTP image endpoint is served
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Listen address for the HTTP server
    #[serde(default = "default_addr")]
    pub addr: String,
    /// Root of the disk store and of the variant cache
    #[serde(default = "default_images_folder_path")]
    pub images_folder_path: PathBuf,
    /// Public prefix prepended to image URLs, path or absolute URL
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
    /// Signing secret; unset or empty disables signing
    #[serde(default)]
    pub hmac_secret: Option<String>,
    /// Largest accepted upload in bytes
    #[serde(default = "default_max_image_size")]
    pub max_image_size: usize,
    /// Largest width or height a served variant may request
    #[serde(default = "default_max_variant_dimension")]
    pub max_variant_dimension: u32,
    /// Largest accepted upload batch
    #[serde(default = "default_max_images_per_post")]
    pub max_images_per_post: usize,
    /// Whether derived variants are cached on disk
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
    /// Store uploads as received instead of re-encoding them
    #[serde(default)]
    pub skip_processing: bool,
    /// PostgreSQL connection string; falls back to `DATABASE_URL`
    #[serde(default)]
    pub database_url: Option<String>,
    /// Emit logs as JSON
    #[serde(default)]
    pub json_logs: bool,
    /// Log filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Object storage settings
    #[serde(default)]
    pub s3: S3Config,
}

fn default_true() -> bool {
    true
}

fn default_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_images_folder_path() -> PathBuf {
    PathBuf::from("images")
}

fn default_url_prefix() -> String {
    DEFAULT_URL_PREFIX.to_string()
}

fn default_max_image_size() -> usize {
    DEFAULT_MAX_IMAGE_SIZE
}

fn default_max_variant_dimension() -> u32 {
    DEFAULT_MAX_VARIANT_DIMENSION
}

fn default_max_images_per_post() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ImageryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: default_addr(),
            images_folder_path: default_images_folder_path(),
            url_prefix: default_url_prefix(),
            hmac_secret: None,
            max_image_size: DEFAULT_MAX_IMAGE_SIZE,
            max_variant_dimension: DEFAULT_MAX_VARIANT_DIMENSION,
            max_images_per_post: default_max_images_per_post(),
            cache_enabled: true,
            skip_processing: false,
            database_url: None,
            json_logs: false,
            log_level: default_log_level(),
            s3: S3Config::default(),
        }
    }
}

impl fmt::Debug for ImageryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageryConfig")
            .field("enabled", &self.enabled)
            .field("addr", &self.addr)
            .field("images_folder_path", &self.images_folder_path)
            .field("url_prefix", &self.url_prefix)
            .field(
                "hmac_secret",
                &self.hmac_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("max_image_size", &self.max_image_size)
            .field("max_variant_dimension", &self.max_variant_dimension)
            .field("max_images_per_post", &self.max_images_per_post)
            .field("cache_enabled", &self.cache_enabled)
            .field("skip_processing", &self.skip_processing)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "<redacted>"),
            )
            .field("json_logs", &self.json_logs)
            .field("log_level", &self.log_level)
            .field("s3", &self.s3)
            .finish()
    }
}

fn build_error(e: config::ConfigError) -> ImageryError {
    ConfigError::new(format!("Failed to build configuration: {}", e)).into()
}

fn parse_error(e: config::ConfigError) -> ImageryError {
    ConfigError::new(format!("Failed to parse configuration: {}", e)).into()
}

impl ImageryConfig {
    /// Load configuration from the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a present file cannot be parsed or a value has the
    /// wrong type.
    pub fn load() -> ImageryResult<Self> {
        Self::load_from(None)
    }

    /// Load configuration, reading `path` instead of `./imagery.toml` if given.
    ///
    /// An explicit path must exist.
    #[instrument(skip(path), fields(path = ?path))]
    pub fn load_from(path: Option<&Path>) -> ImageryResult<Self> {
        debug!("Loading configuration");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/imagery/imagery.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name("imagery").required(false)),
        };

        let mut config: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(build_error)?
            .try_deserialize()
            .map_err(parse_error)?;

        if config.database_url.is_none() {
            config.database_url = std::env::var("DATABASE_URL").ok();
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text alone, ignoring files and environment.
    pub fn from_toml(text: &str) -> ImageryResult<Self> {
        let config: Self = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()
            .map_err(build_error)?
            .try_deserialize()
            .map_err(parse_error)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> ImageryResult<()> {
        if self.max_image_size == 0 {
            return Err(ConfigError::new("max_image_size must be greater than zero").into());
        }
        if self.max_variant_dimension == 0 {
            return Err(ConfigError::new("max_variant_dimension must be greater than zero").into());
        }
        if self.max_images_per_post == 0 {
            return Err(ConfigError::new("max_images_per_post must be greater than zero").into());
        }
        if self.addr.is_empty() {
            return Err(ConfigError::new("addr must not be empty").into());
        }
        Ok(())
    }

    /// Whether object storage is enabled and fully configured.
    pub fn s3_ready(&self) -> bool {
        self.s3.enabled && self.s3.is_complete()
    }

    /// Backend new uploads go to.
    ///
    /// `"s3"` when object storage is enabled and fully configured, otherwise
    /// `"disk"`. Enabled but incomplete object storage is logged.
    pub fn default_store_name(&self) -> &'static str {
        if self.s3_ready() {
            return ObjectStorage::NAME;
        }
        if self.s3.enabled {
            tracing::warn!(
                "S3 storage is enabled but region, bucket or credentials are missing; using disk"
            );
        }
        FileSystemStore::NAME
    }

    /// The configured signing secret, if it is non-empty.
    pub fn signing_secret(&self) -> Option<&str> {
        self.hmac_secret.as_deref().filter(|s| !s.is_empty())
    }

    /// Path component of [`url_prefix`](Self::url_prefix), always starting
    /// and ending with `/`.
    pub fn route_prefix(&self) -> String {
        let path = match url::Url::parse(&self.url_prefix) {
            Ok(url) => url.path().to_string(),
            Err(_) => self.url_prefix.clone(),
        };
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", trimmed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_defaults_parse() {
        let config = ImageryConfig::from_toml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.max_image_size, DEFAULT_MAX_IMAGE_SIZE);
        assert_eq!(config.max_images_per_post, 10);
        assert_eq!(config.max_variant_dimension, DEFAULT_MAX_VARIANT_DIMENSION);
        assert_eq!(config.url_prefix, DEFAULT_URL_PREFIX);
        assert!(config.cache_enabled);
        assert!(!config.skip_processing);
        assert_eq!(config.signing_secret(), None);
        assert_eq!(config.default_store_name(), "disk");
    }

    #[test]
    fn test_store_selection() {
        let mut config = ImageryConfig::default();
        config.s3.enabled = true;
        config.s3.region = "us-east-1".to_string();
        config.s3.bucket = "images".to_string();
        config.s3.access_key = "AKIA".to_string();
        assert_eq!(config.default_store_name(), "disk");

        config.s3.secret_key = "secret".to_string();
        assert_eq!(config.default_store_name(), "s3");

        config.s3.enabled = false;
        assert_eq!(config.default_store_name(), "disk");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = ImageryConfig::default();
        config.hmac_secret = Some("hmac-secret-value".to_string());
        config.s3.secret_key = "s3-secret-value".to_string();
        config.database_url = Some("postgres://user:pw@host/db".to_string());

        let debug = format!("{:?}", config);
        assert!(!debug.contains("hmac-secret-value"));
        assert!(!debug.contains("s3-secret-value"));
        assert!(!debug.contains("pw@host"));
    }

    #[test]
    fn test_route_prefix() {
        let mut config = ImageryConfig::default();
        assert_eq!(config.route_prefix(), "/images/");

        config.url_prefix = "https://cdn.example.com/media/img".to_string();
        assert_eq!(config.route_prefix(), "/media/img/");

        config.url_prefix = "/".to_string();
        assert_eq!(config.route_prefix(), "/");
    }

    #[test]
    fn test_rejects_zero_limit() {
        let err = ImageryConfig::from_toml("max_image_size = 0").unwrap_err();
        assert!(format!("{}", err).contains("max_image_size"));
    }
}
