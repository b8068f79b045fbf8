//! Configuration module
//!
//! Configuration is read once from the environment (and an optional `.env`
//! file). Both the API server and the CLI build their services from it.

use std::env;
use std::path::PathBuf;

// Common constants
const SERVER_PORT: u16 = 8000;
const GEMINI_MODEL: &str = "gemini-1.5-flash";
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";
const MAX_VIDEO_LENGTH_SECS: u64 = 600;
const CHUNK_SIZE: usize = 1000;
const CHUNK_OVERLAP: usize = 0;
const MAX_DOWNLOAD_MB: usize = 50;
const HTTP_TIMEOUT_SECS: u64 = 120;
const HTTP_CONCURRENCY_LIMIT: usize = 64;
const BYTES_PER_MB: usize = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    /// Requests served at once by the API server
    pub http_concurrency_limit: usize,
    /// Reverse proxies in front of the server whose `X-Forwarded-For` hops are trusted
    pub trusted_proxy_count: usize,
    // Hosted model
    pub google_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    // Loaders
    pub youtube_base_url: String,
    pub max_video_length_secs: u64,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_download_mb: usize,
    pub http_timeout_secs: u64,
    /// Skip the private/internal address guard on source URLs (tests, intranet deployments)
    pub allow_private_urls: bool,
    // Rendering
    pub results_dir: PathBuf,
    pub template_path: Option<PathBuf>,
    pub overlay_images_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            cors_origins,
            http_concurrency_limit: env::var("HTTP_CONCURRENCY_LIMIT")
                .unwrap_or_else(|_| HTTP_CONCURRENCY_LIMIT.to_string())
                .parse()
                .unwrap_or(HTTP_CONCURRENCY_LIMIT),
            trusted_proxy_count: env::var("TRUSTED_PROXY_COUNT")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .unwrap_or(0),
            google_api_key: env::var("GOOGLE_API_KEY")
                .map_err(|_| anyhow::anyhow!("GOOGLE_API_KEY must be set for the Gemini API"))?,
            gemini_model: env::var("GEMINI_MODEL").unwrap_or_else(|_| GEMINI_MODEL.to_string()),
            gemini_api_base: env::var("GEMINI_API_BASE")
                .unwrap_or_else(|_| GEMINI_API_BASE.to_string()),
            youtube_base_url: env::var("YOUTUBE_BASE_URL")
                .unwrap_or_else(|_| YOUTUBE_BASE_URL.to_string()),
            max_video_length_secs: env::var("MAX_VIDEO_LENGTH_SECS")
                .unwrap_or_else(|_| MAX_VIDEO_LENGTH_SECS.to_string())
                .parse()
                .unwrap_or(MAX_VIDEO_LENGTH_SECS),
            chunk_size: env::var("CHUNK_SIZE")
                .unwrap_or_else(|_| CHUNK_SIZE.to_string())
                .parse()
                .unwrap_or(CHUNK_SIZE),
            chunk_overlap: env::var("CHUNK_OVERLAP")
                .unwrap_or_else(|_| CHUNK_OVERLAP.to_string())
                .parse()
                .unwrap_or(CHUNK_OVERLAP),
            max_download_mb: env::var("MAX_DOWNLOAD_MB")
                .unwrap_or_else(|_| MAX_DOWNLOAD_MB.to_string())
                .parse()
                .unwrap_or(MAX_DOWNLOAD_MB),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| HTTP_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(HTTP_TIMEOUT_SECS),
            allow_private_urls: env::var("ALLOW_PRIVATE_URLS")
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(false),
            results_dir: env::var("RESULTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("results")),
            template_path: env::var("TEMPLATE_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            overlay_images_dir: env::var("OVERLAY_IMAGES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("assets/images")),
        };

        Ok(config)
    }

    /// Configuration with defaults for everything except the model credential.
    /// Used by tests and embedders that do not read the environment.
    pub fn with_api_key(google_api_key: impl Into<String>) -> Self {
        Config {
            server_port: SERVER_PORT,
            environment: "development".to_string(),
            cors_origins: vec!["*".to_string()],
            http_concurrency_limit: HTTP_CONCURRENCY_LIMIT,
            trusted_proxy_count: 0,
            google_api_key: google_api_key.into(),
            gemini_model: GEMINI_MODEL.to_string(),
            gemini_api_base: GEMINI_API_BASE.to_string(),
            youtube_base_url: YOUTUBE_BASE_URL.to_string(),
            max_video_length_secs: MAX_VIDEO_LENGTH_SECS,
            chunk_size: CHUNK_SIZE,
            chunk_overlap: CHUNK_OVERLAP,
            max_download_mb: MAX_DOWNLOAD_MB,
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            allow_private_urls: false,
            results_dir: PathBuf::from("results"),
            template_path: None,
            overlay_images_dir: PathBuf::from("assets/images"),
        }
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    /// Download cap in bytes, saturating on values `validate` rejects.
    pub fn max_download_bytes(&self) -> usize {
        self.max_download_mb.saturating_mul(BYTES_PER_MB)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.google_api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("GOOGLE_API_KEY cannot be empty"));
        }

        if self.chunk_size == 0 {
            return Err(anyhow::anyhow!("CHUNK_SIZE must be greater than 0"));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(anyhow::anyhow!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunk_overlap,
                self.chunk_size
            ));
        }

        if self.max_download_mb == 0 {
            return Err(anyhow::anyhow!("MAX_DOWNLOAD_MB must be greater than 0"));
        }

        if self.max_download_mb.checked_mul(BYTES_PER_MB).is_none() {
            return Err(anyhow::anyhow!(
                "MAX_DOWNLOAD_MB ({}) is too large",
                self.max_download_mb
            ));
        }

        if self.http_concurrency_limit == 0 {
            return Err(anyhow::anyhow!("HTTP_CONCURRENCY_LIMIT must be greater than 0"));
        }

        if self.max_video_length_secs == 0 {
            return Err(anyhow::anyhow!("MAX_VIDEO_LENGTH_SECS must be greater than 0"));
        }

        if self.http_timeout_secs == 0 {
            return Err(anyhow::anyhow!("HTTP_TIMEOUT_SECS must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::with_api_key("test-key");
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 0);
        assert_eq!(config.max_video_length_secs, 600);
        assert!(!config.is_production());
    }

    #[test]
    fn test_validate_rejects_overlap_not_below_chunk_size() {
        let mut config = Config::with_api_key("test-key");
        config.chunk_overlap = config.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_download_cap_is_rejected() {
        let mut config = Config::with_api_key("test-key");
        assert_eq!(config.max_download_bytes(), 50 * 1024 * 1024);

        config.max_download_mb = usize::MAX / 1024;
        assert_eq!(config.max_download_bytes(), usize::MAX);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("MAX_DOWNLOAD_MB"));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = Config::with_api_key("test-key");
        assert_eq!(config.http_concurrency_limit, 64);
        assert_eq!(config.trusted_proxy_count, 0);
        config.http_concurrency_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_api_key() {
        let config = Config::with_api_key("  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_production() {
        let mut config = Config::with_api_key("test-key");
        config.environment = "PROD".to_string();
        assert!(config.is_production());
    }
}
