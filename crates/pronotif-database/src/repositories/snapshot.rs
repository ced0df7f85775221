//! Snapshot repository implementation.

use sqlx::PgPool;
use sqlx::types::Json;

use pronotif_core::AccountKey;
use pronotif_core::error::{AppError, ErrorKind};
use pronotif_core::result::AppResult;
use pronotif_entity::snapshot::{AcademicSnapshot, SnapshotRow};

/// Repository for cached academic snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotRepository {
    pool: PgPool,
}

impl SnapshotRepository {
    /// Creates a new snapshot repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads the snapshot for an account. Missing rows yield an empty snapshot.
    pub async fn find(&self, key: &AccountKey) -> AppResult<AcademicSnapshot> {
        let row = sqlx::query_as::<_, SnapshotRow>(
            "SELECT * FROM account_snapshots WHERE username = $1 AND url = $2",
        )
        .bind(&key.username)
        .bind(&key.url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load snapshot", e))?;

        Ok(row.map(AcademicSnapshot::from).unwrap_or_default())
    }

    /// Replaces the snapshot for an account.
    pub async fn upsert(&self, key: &AccountKey, snapshot: &AcademicSnapshot) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO account_snapshots (username, url, assignments, grades, last_update_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             ON CONFLICT ON CONSTRAINT account_snapshots_pkey DO UPDATE SET \
             assignments = excluded.assignments, grades = excluded.grades, last_update_at = excluded.last_update_at",
        )
        .bind(&key.username)
        .bind(&key.url)
        .bind(snapshot.assignments.as_ref().map(Json))
        .bind(snapshot.grades.as_ref().map(Json))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to save snapshot", e))?;
        Ok(())
    }
}
