//! Account repository implementation.

use sqlx::PgPool;

use pronotif_core::AccountKey;
use pronotif_core::error::{AppError, ErrorKind};
use pronotif_core::result::AppResult;
use pronotif_entity::account::{Account, CreateAccount};

/// Repository for account registration and credential bookkeeping.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    /// Creates a new account repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds an account by its composite key.
    pub async fn find(&self, key: &AccountKey) -> AppResult<Option<Account>> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE username = $1 AND url = $2")
            .bind(&key.username)
            .bind(&key.url)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find account", e))
    }

    /// Lists every registered account.
    pub async fn find_all(&self) -> AppResult<Vec<Account>> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list accounts", e))
    }

    /// Registers a new account.
    pub async fn create(&self, data: &CreateAccount) -> AppResult<Account> {
        sqlx::query_as::<_, Account>(
            "INSERT INTO accounts (username, url, password, auth_variant, full_name, student_class, establishment, credentials_valid, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, NOW()) RETURNING *",
        )
        .bind(&data.username)
        .bind(&data.url)
        .bind(&data.password)
        .bind(&data.auth_variant)
        .bind(&data.full_name)
        .bind(&data.student_class)
        .bind(&data.establishment)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create account", e))
    }

    /// Replaces the stored password.
    pub async fn update_password(&self, key: &AccountKey, password: &str) -> AppResult<()> {
        sqlx::query("UPDATE accounts SET password = $1 WHERE username = $2 AND url = $3")
            .bind(password)
            .bind(&key.username)
            .bind(&key.url)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update account password", e)
            })?;
        Ok(())
    }

    /// Refreshes the profile fields reported by the portal at login.
    pub async fn update_profile(
        &self,
        key: &AccountKey,
        full_name: Option<&str>,
        student_class: Option<&str>,
        establishment: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE accounts SET full_name = COALESCE($1, full_name), \
             student_class = COALESCE($2, student_class), \
             establishment = COALESCE($3, establishment) \
             WHERE username = $4 AND url = $5",
        )
        .bind(full_name)
        .bind(student_class)
        .bind(establishment)
        .bind(&key.username)
        .bind(&key.url)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update profile", e))?;
        Ok(())
    }

    /// Stores the resolved authentication variant.
    pub async fn set_auth_variant(&self, key: &AccountKey, variant: &str) -> AppResult<()> {
        sqlx::query("UPDATE accounts SET auth_variant = $1 WHERE username = $2 AND url = $3")
            .bind(variant)
            .bind(&key.username)
            .bind(&key.url)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to set auth variant", e)
            })?;
        Ok(())
    }

    /// Flips the credential-valid flag.
    pub async fn set_credentials_valid(&self, key: &AccountKey, valid: bool) -> AppResult<()> {
        sqlx::query("UPDATE accounts SET credentials_valid = $1 WHERE username = $2 AND url = $3")
            .bind(valid)
            .bind(&key.username)
            .bind(&key.url)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update credential state", e)
            })?;
        Ok(())
    }
}
