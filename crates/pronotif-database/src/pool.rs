//! Pool setup and schema migrations.

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};

use pronotif_core::config::DatabaseConfig;
use pronotif_core::error::{AppError, ErrorKind};

/// Schema embedded at build time from the workspace `migrations/` directory.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Open PostgreSQL pool with an up-to-date schema.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connects and applies pending migrations.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, AppError> {
        tracing::info!(
            url = %config.redacted_url(),
            pool_max = config.pool_max,
            pool_min = config.pool_min,
            "Opening account store"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.pool_max)
            .min_connections(config.pool_min)
            .acquire_timeout(config.acquire_timeout())
            .idle_timeout(config.idle_timeout())
            .connect(&config.url)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, format!("Cannot reach account store: {e}"), e)
            })?;

        MIGRATOR.run(&pool).await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, format!("Schema migration failed: {e}"), e)
        })?;
        tracing::info!(migrations = MIGRATOR.iter().count(), "Account store schema is current");

        Ok(Self { pool })
    }

    /// The sqlx pool, for building repositories.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Waits for in-flight queries and closes every connection.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Account store closed");
    }
}
