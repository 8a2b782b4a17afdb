use crate::domain::auth::RefreshTokenRecord;
use crate::domain::user::User;
use crate::error::Result;
use async_trait::async_trait;
use std::fmt::Debug;
use uuid::Uuid;

/// Persistence for refresh tokens. Holds at most one row per user.
///
/// Token ids passed in and out are already hashed.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync + Debug {
    /// Inserts the user's refresh token, or overwrites the id and expiry of the existing one in place.
    async fn upsert_for_user(&self, user_id: Uuid, token_id: &str, expires_at: i64) -> Result<()>;

    /// Atomically replaces `old_id` with `new_id` if the row exists and has not expired at `now`.
    ///
    /// Returns the owning user, or `None` if there was nothing to claim.
    async fn rotate_unexpired(&self, old_id: &str, new_id: &str, now: i64, expires_at: i64) -> Result<Option<Uuid>>;

    /// Returns whether a row was deleted.
    async fn delete(&self, token_id: &str) -> Result<bool>;

    /// Deletes every row with `expires_at < now` and returns how many went.
    async fn delete_expired(&self, now: i64) -> Result<u64>;

    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<RefreshTokenRecord>>;
}

#[async_trait]
pub trait UserStore: Send + Sync + Debug {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn create(&self, name: Option<&str>, email: &str, password_hash: &str) -> Result<User>;
}
