//! Database connection pool management
//!
//! Builds one PostgreSQL pool per backing store and hands out
//! per-call connections with acquisition metrics.

mod env_utils;
mod metrics;

pub use env_utils::{parse_env_required, parse_env_with_default};
pub use metrics::acquire_with_metrics;

use metrics::update_pool_metrics;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info};

/// Database connection pool configuration
#[derive(Clone)]
pub struct DbConfig {
    /// Store name for metrics labeling
    pub store_name: String,
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection creation timeout (new connection to PostgreSQL)
    pub connect_timeout_secs: u64,
    /// Connection acquisition timeout (get connection from pool)
    pub acquire_timeout_secs: u64,
    /// Connection idle timeout
    pub idle_timeout_secs: u64,
    /// Connection maximum lifetime
    pub max_lifetime_secs: u64,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("store_name", &self.store_name)
            .field("database_url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .field("max_lifetime_secs", &self.max_lifetime_secs)
            .finish()
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            store_name: String::from("unknown"),
            database_url: String::new(),
            max_connections: 8,
            min_connections: 1,
            connect_timeout_secs: 5,
            acquire_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

impl DbConfig {
    /// Create a DbConfig from `{prefix}_*` environment variables
    ///
    /// `{prefix}_URL` is required; `{prefix}_MAX_CONNECTIONS`,
    /// `{prefix}_MIN_CONNECTIONS`, `{prefix}_CONNECT_TIMEOUT_SECS`,
    /// `{prefix}_ACQUIRE_TIMEOUT_SECS`, `{prefix}_IDLE_TIMEOUT_SECS` and
    /// `{prefix}_MAX_LIFETIME_SECS` override the defaults.
    pub fn from_env_prefixed(prefix: &str, store_name: &str) -> Result<Self, String> {
        let defaults = Self::default();
        let database_url = parse_env_required::<String>(&format!("{prefix}_URL"))?;

        Ok(Self {
            store_name: store_name.to_string(),
            database_url,
            max_connections: parse_env_with_default(
                &format!("{prefix}_MAX_CONNECTIONS"),
                defaults.max_connections,
            ),
            min_connections: parse_env_with_default(
                &format!("{prefix}_MIN_CONNECTIONS"),
                defaults.min_connections,
            ),
            connect_timeout_secs: parse_env_with_default(
                &format!("{prefix}_CONNECT_TIMEOUT_SECS"),
                defaults.connect_timeout_secs,
            ),
            acquire_timeout_secs: parse_env_with_default(
                &format!("{prefix}_ACQUIRE_TIMEOUT_SECS"),
                defaults.acquire_timeout_secs,
            ),
            idle_timeout_secs: parse_env_with_default(
                &format!("{prefix}_IDLE_TIMEOUT_SECS"),
                defaults.idle_timeout_secs,
            ),
            max_lifetime_secs: parse_env_with_default(
                &format!("{prefix}_MAX_LIFETIME_SECS"),
                defaults.max_lifetime_secs,
            ),
        })
    }

    /// Log pool configuration details
    pub fn log_config(&self) {
        info!(
            store = %self.store_name,
            "Database Pool Configuration: \
             max_connections={}, min_connections={}, \
             connect_timeout={}s, acquire_timeout={}s, idle_timeout={}s, max_lifetime={}s",
            self.max_connections,
            self.min_connections,
            self.connect_timeout_secs,
            self.acquire_timeout_secs,
            self.idle_timeout_secs,
            self.max_lifetime_secs
        );
    }
}

/// Create a PostgreSQL connection pool with automatic metrics monitoring
pub async fn create_pool(config: DbConfig) -> Result<PgPool, sqlx::Error> {
    debug!(
        "Creating database pool: store={}, max={}, min={}, acquire_timeout={}s",
        config.store_name,
        config.max_connections,
        config.min_connections,
        config.acquire_timeout_secs
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .test_before_acquire(true)
        .connect(&config.database_url)
        .await?;

    match tokio::time::timeout(
        Duration::from_secs(config.connect_timeout_secs),
        sqlx::query("SELECT 1").execute(&pool),
    )
    .await
    {
        Ok(Ok(_)) => {
            info!(
                store = %config.store_name,
                "Database pool created and verified successfully"
            );

            update_pool_metrics(&pool, &config.store_name);
            {
                let pool_clone = pool.clone();
                let store = config.store_name.clone();
                tokio::spawn(async move {
                    let mut interval = tokio::time::interval(Duration::from_secs(30));
                    loop {
                        interval.tick().await;
                        update_pool_metrics(&pool_clone, &store);
                    }
                });
            }

            Ok(pool)
        }
        Ok(Err(e)) => {
            error!(
                store = %config.store_name,
                error = %e,
                "Database connection verification failed"
            );
            Err(e)
        }
        Err(_) => {
            error!(
                store = %config.store_name,
                timeout_secs = config.connect_timeout_secs,
                "Database connection verification timeout"
            );
            Err(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Database verification timeout",
            )))
        }
    }
}
