//! Request log repository implementation.

use sqlx::PgPool;

use pronotif_core::AccountKey;
use pronotif_core::error::{AppError, ErrorKind};
use pronotif_core::result::AppResult;
use pronotif_entity::audit::RequestLog;

/// Repository for the `user_logs` audit trail.
#[derive(Debug, Clone)]
pub struct RequestLogRepository {
    pool: PgPool,
}

impl RequestLogRepository {
    /// Creates a new request log repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends a row.
    pub async fn create(&self, log: &RequestLog) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO user_logs (username, url, route, device_token, app_version, token_id, body, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&log.username)
        .bind(&log.url)
        .bind(&log.route)
        .bind(&log.device_token)
        .bind(&log.app_version)
        .bind(&log.token_id)
        .bind(&log.body)
        .bind(log.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to write request log", e))?;
        Ok(())
    }

    /// Lists the latest requests of an account.
    pub async fn find_by_account(&self, key: &AccountKey, limit: i64) -> AppResult<Vec<RequestLog>> {
        sqlx::query_as::<_, RequestLog>(
            "SELECT * FROM user_logs WHERE username = $1 AND url = $2 \
             ORDER BY created_at DESC LIMIT $3",
        )
        .bind(&key.username)
        .bind(&key.url)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list request logs", e))
    }
}
