use crate::adapters::database::DbPool;
use crate::adapters::database::records::RefreshTokenRecord;
use crate::core::store::RefreshTokenStore;
use crate::domain::auth::RefreshTokenRecord as RefreshToken;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct RefreshTokenRepository {
    pool: DbPool,
}

impl RefreshTokenRepository {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for RefreshTokenRepository {
    /// Note: `token_id` is the HASH of the token, not the raw token.
    ///
    /// # Errors
    /// Returns `AppError::StoreUnavailable` if the upsert fails.
    #[tracing::instrument(level = "debug", skip(self, token_id), err)]
    async fn upsert_for_user(&self, user_id: Uuid, token_id: &str, expires_at: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET id = EXCLUDED.id, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(token_id)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(AppError::StoreUnavailable)?;

        Ok(())
    }

    /// Claims the old row and rewrites it under the new id in one statement.
    /// A concurrent rotation of the same id blocks on the row lock, then fails the
    /// re-checked predicate and gets no row back.
    ///
    /// # Errors
    /// Returns `AppError::StoreUnavailable` if the update fails.
    #[tracing::instrument(level = "debug", skip(self, old_id, new_id), err)]
    async fn rotate_unexpired(&self, old_id: &str, new_id: &str, now: i64, expires_at: i64) -> Result<Option<Uuid>> {
        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE refresh_tokens
            SET id = $2, expires_at = $3
            WHERE id = $1 AND expires_at >= $4
            RETURNING user_id
            "#,
        )
        .bind(old_id)
        .bind(new_id)
        .bind(expires_at)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user_id)
    }

    /// # Errors
    /// Returns `AppError::StoreUnavailable` if the deletion fails.
    #[tracing::instrument(level = "debug", skip(self, token_id), err)]
    async fn delete(&self, token_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE id = $1")
            .bind(token_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::StoreUnavailable)?;
        Ok(result.rows_affected() > 0)
    }

    /// # Errors
    /// Returns `AppError::StoreUnavailable` if the deletion fails.
    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn delete_expired(&self, now: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(AppError::StoreUnavailable)?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<RefreshToken>> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT id, user_id, expires_at FROM refresh_tokens WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Into::into))
    }
}
