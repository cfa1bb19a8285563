/// Configuration management for Search Service
///
/// Loaded once from environment variables at startup and handed to each
/// collaborator at construction.
use anyhow::{anyhow, Context, Result};
use db_pool::{parse_env_with_default, DbConfig};

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Search index settings
    pub search: SearchConfig,
    /// Comment store (posts database)
    pub comment_store: DbConfig,
    /// Media metadata store
    pub media_store: DbConfig,
}

/// Application settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host to bind to
    pub host: String,
    /// HTTP port
    pub http_port: u16,
    /// Upper bound for one aggregation, enforced at the HTTP boundary
    pub request_timeout_secs: u64,
}

/// Elasticsearch settings
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub url: String,
    pub post_index: String,
    pub user_index: String,
    /// Hits requested per query, 1..=500
    pub max_hits: i64,
}

fn default_http_port() -> u16 {
    8086
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_max_hits() -> i64 {
    50
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: parse_env_with_default("PORT", default_http_port()),
            request_timeout_secs: parse_env_with_default(
                "REQUEST_TIMEOUT_SECS",
                default_request_timeout_secs(),
            )
            .max(1),
        };

        let search = SearchConfig {
            url: std::env::var("ELASTICSEARCH_URL")
                .context("ELASTICSEARCH_URL environment variable not set")?,
            post_index: std::env::var("ELASTICSEARCH_POST_INDEX")
                .unwrap_or_else(|_| "posts".to_string()),
            user_index: std::env::var("ELASTICSEARCH_USER_INDEX")
                .unwrap_or_else(|_| "users".to_string()),
            max_hits: parse_env_with_default("SEARCH_MAX_HITS", default_max_hits()).clamp(1, 500),
        };

        let comment_store = DbConfig::from_env_prefixed("COMMENTS_DB", "search-service-comments")
            .map_err(|e| anyhow!(e))?;
        let media_store = DbConfig::from_env_prefixed("MEDIA_DB", "search-service-media")
            .map_err(|e| anyhow!(e))?;

        Ok(Config {
            app,
            search,
            comment_store,
            media_store,
        })
    }
}
