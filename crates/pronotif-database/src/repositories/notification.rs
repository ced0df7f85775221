//! Notification repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use pronotif_core::AccountKey;
use pronotif_core::error::{AppError, ErrorKind};
use pronotif_core::result::AppResult;
use pronotif_entity::notification::NotificationRecord;

/// Repository for the notification log.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Creates a new notification repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a notification record.
    pub async fn create(&self, record: &NotificationRecord) -> AppResult<NotificationRecord> {
        sqlx::query_as::<_, NotificationRecord>(
            "INSERT INTO notifications (id, username, url, category, title, body, created_at, sent_at, read_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NULL, NULL) RETURNING *",
        )
        .bind(record.id)
        .bind(&record.username)
        .bind(&record.url)
        .bind(record.category)
        .bind(&record.title)
        .bind(&record.body)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create notification", e))
    }

    /// Lists the most recent notifications of an account.
    pub async fn find_by_account(
        &self,
        key: &AccountKey,
        limit: i64,
    ) -> AppResult<Vec<NotificationRecord>> {
        sqlx::query_as::<_, NotificationRecord>(
            "SELECT * FROM notifications WHERE username = $1 AND url = $2 \
             ORDER BY created_at DESC LIMIT $3",
        )
        .bind(&key.username)
        .bind(&key.url)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list notifications", e))
    }

    /// Sets the sent-at timestamp.
    pub async fn mark_sent(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE notifications SET sent_at = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark sent", e))?;
        Ok(())
    }

    /// Sets the read-at timestamp. Returns `false` if the record does not belong to the account.
    pub async fn mark_read(&self, id: Uuid, key: &AccountKey, at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET read_at = $1 WHERE id = $2 AND username = $3 AND url = $4",
        )
        .bind(at)
        .bind(id)
        .bind(&key.username)
        .bind(&key.url)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark read", e))?;
        Ok(result.rows_affected() > 0)
    }
}
