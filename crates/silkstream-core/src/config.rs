//! Configuration module
//!
//! The whole process configuration is read once at startup by [`Config::from_env`]
//! and then handed to each component's constructor. Nothing reads the
//! environment after that point.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;

use crate::storage_types::{StorageBackend, StoreBackend};

const SERVER_PORT: u16 = 3000;
const SIGNED_URL_TTL_SECS: u64 = 3600;
const UPLOAD_PREFIX: &str = "uploads/";
const VIDEOS_TABLE: &str = "silkstream-vids";
const TAGS_TABLE: &str = "silkstream-tags";
const FAVORITES_TABLE: &str = "silkstream-favorites";
const DEFAULT_REGION: &str = "us-east-1";
const SCAN_PAGE_SIZE: usize = 1000;
const DEFAULT_PAGE_LIMIT: usize = 10;
const MAX_PAGE_LIMIT: usize = 100;
const TAG_SUGGESTION_LIMIT: usize = 1000;
const RANDOM_FAVORITES_LIMIT: usize = 20;
const MAX_BATCH_SIZE: usize = 100;
const THUMBNAIL_WIDTH: u32 = 320;
const THUMBNAIL_MAX_ATTEMPTS: u32 = 3;
const THUMBNAIL_RETRY_BASE_DELAY_MS: u64 = 1000;
const SEARCH_INDEX_NAME: &str = "videos";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub max_batch_size: usize,
    /// Emit logs as JSON lines instead of the compact console format
    pub log_json: bool,
}

/// Object storage settings
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: String,
    /// Custom endpoint for S3-compatible providers (MinIO, LocalStack)
    pub s3_endpoint: Option<String>,
    pub local_path: PathBuf,
    pub local_base_url: String,
    pub upload_prefix: String,
    pub signed_url_ttl_secs: u64,
}

/// Key-value store settings
#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub region: String,
    pub endpoint: Option<String>,
    pub videos_table: String,
    pub tags_table: String,
    pub favorites_table: String,
    /// Raw items requested per underlying scan page
    pub scan_page_size: usize,
}

#[derive(Clone, Debug)]
pub struct ListingConfig {
    pub default_page_limit: usize,
    pub max_page_limit: usize,
    pub tag_suggestion_limit: usize,
    pub random_favorites_limit: usize,
}

#[derive(Clone, Debug)]
pub struct ThumbnailConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub scratch_dir: PathBuf,
    pub width: u32,
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
}

/// Optional best-effort search mirror
#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub url: Option<String>,
    pub index_name: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub store: StoreConfig,
    pub listing: ListingConfig,
    pub thumbnail: ThumbnailConfig,
    pub search: SearchConfig,
}

impl Default for Config {
    /// Development defaults: in-memory store and local storage under `./data/media`.
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: SERVER_PORT,
                environment: "development".to_string(),
                cors_origins: vec!["*".to_string()],
                max_batch_size: MAX_BATCH_SIZE,
                log_json: false,
            },
            storage: StorageConfig {
                backend: StorageBackend::Local,
                s3_bucket: None,
                s3_region: DEFAULT_REGION.to_string(),
                s3_endpoint: None,
                local_path: PathBuf::from("./data/media"),
                local_base_url: format!("http://localhost:{}/media", SERVER_PORT),
                upload_prefix: UPLOAD_PREFIX.to_string(),
                signed_url_ttl_secs: SIGNED_URL_TTL_SECS,
            },
            store: StoreConfig {
                backend: StoreBackend::Memory,
                region: DEFAULT_REGION.to_string(),
                endpoint: None,
                videos_table: VIDEOS_TABLE.to_string(),
                tags_table: TAGS_TABLE.to_string(),
                favorites_table: FAVORITES_TABLE.to_string(),
                scan_page_size: SCAN_PAGE_SIZE,
            },
            listing: ListingConfig {
                default_page_limit: DEFAULT_PAGE_LIMIT,
                max_page_limit: MAX_PAGE_LIMIT,
                tag_suggestion_limit: TAG_SUGGESTION_LIMIT,
                random_favorites_limit: RANDOM_FAVORITES_LIMIT,
            },
            thumbnail: ThumbnailConfig {
                ffmpeg_path: "ffmpeg".to_string(),
                ffprobe_path: "ffprobe".to_string(),
                scratch_dir: env::temp_dir(),
                width: THUMBNAIL_WIDTH,
                max_attempts: THUMBNAIL_MAX_ATTEMPTS,
                retry_base_delay_ms: THUMBNAIL_RETRY_BASE_DELAY_MS,
            },
            search: SearchConfig {
                url: None,
                index_name: SEARCH_INDEX_NAME.to_string(),
            },
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str, default: T) -> Result<T, anyhow::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = var_or("CORS_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let port = parse_var("PORT", SERVER_PORT)?;

        let storage_backend = var_or("STORAGE_BACKEND", "s3").parse::<StorageBackend>()?;
        let store_backend = var_or("STORE_BACKEND", "dynamodb").parse::<StoreBackend>()?;

        let scratch_dir = optional_var("SCRATCH_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);

        let config = Config {
            server: ServerConfig {
                port,
                environment,
                cors_origins,
                max_batch_size: parse_var("MAX_BATCH_SIZE", MAX_BATCH_SIZE)?,
                log_json: var_or("LOG_FORMAT", "compact").eq_ignore_ascii_case("json"),
            },
            storage: StorageConfig {
                backend: storage_backend,
                s3_bucket: optional_var("S3_BUCKET"),
                s3_region: var_or("S3_REGION", DEFAULT_REGION),
                s3_endpoint: optional_var("S3_ENDPOINT"),
                local_path: PathBuf::from(var_or("LOCAL_STORAGE_PATH", "./data/media")),
                local_base_url: var_or(
                    "LOCAL_STORAGE_BASE_URL",
                    &format!("http://localhost:{}/media", port),
                ),
                upload_prefix: var_or("UPLOAD_PREFIX", UPLOAD_PREFIX),
                signed_url_ttl_secs: parse_var("SIGNED_URL_TTL_SECS", SIGNED_URL_TTL_SECS)?,
            },
            store: StoreConfig {
                backend: store_backend,
                region: var_or("DYNAMODB_REGION", DEFAULT_REGION),
                endpoint: optional_var("DYNAMODB_ENDPOINT"),
                videos_table: var_or("VIDEOS_TABLE", VIDEOS_TABLE),
                tags_table: var_or("TAGS_TABLE", TAGS_TABLE),
                favorites_table: var_or("FAVORITES_TABLE", FAVORITES_TABLE),
                scan_page_size: parse_var("SCAN_PAGE_SIZE", SCAN_PAGE_SIZE)?,
            },
            listing: ListingConfig {
                default_page_limit: parse_var("DEFAULT_PAGE_LIMIT", DEFAULT_PAGE_LIMIT)?,
                max_page_limit: parse_var("MAX_PAGE_LIMIT", MAX_PAGE_LIMIT)?,
                tag_suggestion_limit: parse_var("TAG_SUGGESTION_LIMIT", TAG_SUGGESTION_LIMIT)?,
                random_favorites_limit: parse_var(
                    "RANDOM_FAVORITES_LIMIT",
                    RANDOM_FAVORITES_LIMIT,
                )?,
            },
            thumbnail: ThumbnailConfig {
                ffmpeg_path: var_or("FFMPEG_PATH", "ffmpeg"),
                ffprobe_path: var_or("FFPROBE_PATH", "ffprobe"),
                scratch_dir,
                width: parse_var("THUMBNAIL_WIDTH", THUMBNAIL_WIDTH)?,
                max_attempts: parse_var("THUMBNAIL_MAX_ATTEMPTS", THUMBNAIL_MAX_ATTEMPTS)?,
                retry_base_delay_ms: parse_var(
                    "THUMBNAIL_RETRY_BASE_DELAY_MS",
                    THUMBNAIL_RETRY_BASE_DELAY_MS,
                )?,
            },
            search: SearchConfig {
                url: optional_var("SEARCH_INDEX_URL"),
                index_name: var_or("SEARCH_INDEX_NAME", SEARCH_INDEX_NAME),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() && self.server.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.storage.backend == StorageBackend::S3 && self.storage.s3_bucket.is_none() {
            return Err(anyhow::anyhow!(
                "S3_BUCKET must be set when STORAGE_BACKEND=s3"
            ));
        }

        if self.store.scan_page_size == 0 {
            return Err(anyhow::anyhow!("SCAN_PAGE_SIZE must be greater than 0"));
        }

        if self.listing.default_page_limit == 0 || self.listing.max_page_limit == 0 {
            return Err(anyhow::anyhow!("Page limits must be greater than 0"));
        }

        if self.listing.default_page_limit > self.listing.max_page_limit {
            return Err(anyhow::anyhow!(
                "DEFAULT_PAGE_LIMIT ({}) cannot exceed MAX_PAGE_LIMIT ({})",
                self.listing.default_page_limit,
                self.listing.max_page_limit
            ));
        }

        if self.thumbnail.max_attempts == 0 {
            return Err(anyhow::anyhow!("THUMBNAIL_MAX_ATTEMPTS must be at least 1"));
        }

        if self.server.max_batch_size == 0 {
            return Err(anyhow::anyhow!("MAX_BATCH_SIZE must be greater than 0"));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.server.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}
