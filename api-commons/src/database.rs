//! PostgreSQL connection pool

use std::str::FromStr;
use std::time::Duration;

use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};

use crate::{
    config::DatabaseConfig,
    error::{sanitize_url, Error, Result},
};

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Create a connection pool, retrying with exponential backoff
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let mut attempt = 0;

    loop {
        match try_create_pool(config).await {
            Ok(pool) => {
                tracing::info!(
                    "Database connection pool created: max={}, min={}",
                    config.maximum_pool_size,
                    config.minimum_idle
                );
                return Ok(pool);
            }
            Err(e) => {
                attempt += 1;

                if attempt > MAX_RETRIES {
                    tracing::error!(
                        "Failed to connect to database after {} attempts: {}",
                        MAX_RETRIES + 1,
                        e
                    );
                    return Err(e);
                }

                let delay = RETRY_DELAY * 2_u32.pow(attempt - 1);
                tracing::warn!(
                    "Database connection attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

async fn try_create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let url_safe = sanitize_url(&config.url);
    let connect_error = |e: sqlx::Error| {
        Error::Internal(format!(
            "Failed to connect to database at '{}': {}",
            url_safe, e
        ))
    };

    let mut options = PgConnectOptions::from_str(&config.url).map_err(connect_error)?;
    if !config.username.is_empty() {
        options = options.username(&config.username);
    }
    if !config.password.is_empty() {
        options = options.password(&config.password);
    }

    PgPoolOptions::new()
        .max_connections(config.maximum_pool_size)
        .min_connections(config.minimum_idle)
        .idle_timeout(config.idle_timeout())
        .max_lifetime(config.max_lifetime())
        .test_before_acquire(true)
        .connect_with(options)
        .await
        .map_err(connect_error)
}
