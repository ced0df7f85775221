//! Device token repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use pronotif_core::AccountKey;
use pronotif_core::error::{AppError, ErrorKind};
use pronotif_core::result::AppResult;
use pronotif_entity::device::{DeviceToken, TokenSettings};

/// Repository for push registration tokens.
#[derive(Debug, Clone)]
pub struct DeviceTokenRepository {
    pool: PgPool,
}

impl DeviceTokenRepository {
    /// Creates a new device token repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds a token.
    pub async fn find(&self, token: &str) -> AppResult<Option<DeviceToken>> {
        sqlx::query_as::<_, DeviceToken>("SELECT * FROM device_tokens WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find token", e))
    }

    /// Lists the active tokens of an account.
    pub async fn find_active(&self, key: &AccountKey) -> AppResult<Vec<DeviceToken>> {
        sqlx::query_as::<_, DeviceToken>(
            "SELECT * FROM device_tokens WHERE username = $1 AND url = $2 AND is_active = TRUE \
             ORDER BY created_at ASC",
        )
        .bind(&key.username)
        .bind(&key.url)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list active tokens", e))
    }

    /// Registers a token, or reactivates it with every subscription enabled.
    pub async fn upsert(
        &self,
        key: &AccountKey,
        token: &str,
        device_id: Option<&str>,
    ) -> AppResult<DeviceToken> {
        sqlx::query_as::<_, DeviceToken>(
            "INSERT INTO device_tokens (token, username, url, is_active, notify_assignments, notify_grades, device_id, created_at) \
             VALUES ($1, $2, $3, TRUE, TRUE, TRUE, $4, NOW()) \
             ON CONFLICT ON CONSTRAINT device_tokens_pkey DO UPDATE SET \
             username = excluded.username, url = excluded.url, is_active = TRUE, \
             notify_assignments = TRUE, notify_grades = TRUE, \
             device_id = COALESCE(excluded.device_id, device_tokens.device_id) \
             RETURNING *",
        )
        .bind(token)
        .bind(&key.username)
        .bind(&key.url)
        .bind(device_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to upsert token", e))
    }

    /// Applies a partial settings update.
    pub async fn update_settings(&self, token: &str, settings: &TokenSettings) -> AppResult<()> {
        sqlx::query(
            "UPDATE device_tokens SET \
             notify_assignments = COALESCE($1, notify_assignments), \
             notify_grades = COALESCE($2, notify_grades), \
             is_active = COALESCE($3, is_active) \
             WHERE token = $4",
        )
        .bind(settings.notify_assignments)
        .bind(settings.notify_grades)
        .bind(settings.is_active)
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update token", e))?;
        Ok(())
    }

    /// Records a delivery attempt.
    pub async fn mark_active(&self, token: &str, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE device_tokens SET last_active_at = $1 WHERE token = $2")
            .bind(at)
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark token active", e))?;
        Ok(())
    }

    /// Records a successful delivery.
    pub async fn mark_success(&self, token: &str, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE device_tokens SET last_success_at = $1 WHERE token = $2")
            .bind(at)
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to mark token success", e)
            })?;
        Ok(())
    }
}
