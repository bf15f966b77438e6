//! Application configuration loaded from environment variables.
//!
//! Secrets are read once at startup and held in memory; every component
//! receives what it needs through constructors.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Directory for staging uploaded files before they reach the media store
    pub upload_dir: String,
    /// Whether session cookies carry the Secure attribute
    pub cookie_secure: bool,

    // --- Token signing ---
    /// HMAC secret for access tokens
    pub access_token_secret: String,
    /// HMAC secret for refresh tokens
    pub refresh_token_secret: String,
    /// Access token lifetime in seconds
    pub access_token_ttl_secs: i64,
    /// Refresh token lifetime in seconds
    pub refresh_token_ttl_secs: i64,

    // --- Media storage provider ---
    /// Base URL of the media storage API
    pub media_base_url: String,
    /// Media storage API key (public)
    pub media_api_key: String,
    /// Media storage API secret, used to sign upload requests
    pub media_api_secret: String,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            upload_dir: std::env::temp_dir().to_string_lossy().into_owned(),
            cookie_secure: true,
            access_token_secret: "test_access_secret_32_bytes_min!".to_string(),
            refresh_token_secret: "test_refresh_secret_32_bytes_m!".to_string(),
            access_token_ttl_secs: 86_400,
            refresh_token_ttl_secs: 864_000,
            media_base_url: "http://localhost:9090".to_string(),
            media_api_key: "test_media_key".to_string(),
            media_api_secret: "test_media_secret".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// For local development, secrets can be set via a `.env` file. In
    /// production they are injected as environment variables by the deploy
    /// platform's secret bindings.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            upload_dir: env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| std::env::temp_dir().to_string_lossy().into_owned()),
            cookie_secure: env::var("COOKIE_SECURE")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),

            access_token_secret: env::var("ACCESS_TOKEN_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("ACCESS_TOKEN_SECRET"))?,
            refresh_token_secret: env::var("REFRESH_TOKEN_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("REFRESH_TOKEN_SECRET"))?,
            access_token_ttl_secs: env::var("ACCESS_TOKEN_TTL_SECS")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()
                .unwrap_or(86_400),
            refresh_token_ttl_secs: env::var("REFRESH_TOKEN_TTL_SECS")
                .unwrap_or_else(|_| "864000".to_string())
                .parse()
                .unwrap_or(864_000),

            media_base_url: env::var("MEDIA_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("MEDIA_BASE_URL"))?,
            media_api_key: env::var("MEDIA_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("MEDIA_API_KEY"))?,
            media_api_secret: env::var("MEDIA_API_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("MEDIA_API_SECRET"))?,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
