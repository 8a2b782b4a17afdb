//! Process-local stores. Every operation holds a single lock for its whole duration,
//! which gives the same atomicity the Postgres statements provide.

use crate::core::store::{RefreshTokenStore, UserStore};
use crate::domain::auth::RefreshTokenRecord;
use crate::domain::user::User;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MemoryRefreshTokenStore {
    rows: Mutex<HashMap<String, RefreshTokenRecord>>,
}

impl MemoryRefreshTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> MutexGuard<'_, HashMap<String, RefreshTokenRecord>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    /// Inserts a row verbatim, bypassing the one-row-per-user upsert.
    pub fn insert_raw(&self, record: RefreshTokenRecord) {
        self.rows().insert(record.id.clone(), record);
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryRefreshTokenStore {
    async fn upsert_for_user(&self, user_id: Uuid, token_id: &str, expires_at: i64) -> Result<()> {
        let mut rows = self.rows();
        rows.retain(|_, record| record.user_id != user_id);
        rows.insert(token_id.to_string(), RefreshTokenRecord { id: token_id.to_string(), user_id, expires_at });
        Ok(())
    }

    async fn rotate_unexpired(&self, old_id: &str, new_id: &str, now: i64, expires_at: i64) -> Result<Option<Uuid>> {
        let mut rows = self.rows();
        let user_id = match rows.get(old_id) {
            Some(record) if !record.is_expired_at(now) => record.user_id,
            _ => return Ok(None),
        };

        rows.remove(old_id);
        rows.insert(new_id.to_string(), RefreshTokenRecord { id: new_id.to_string(), user_id, expires_at });
        Ok(Some(user_id))
    }

    async fn delete(&self, token_id: &str) -> Result<bool> {
        Ok(self.rows().remove(token_id).is_some())
    }

    async fn delete_expired(&self, now: i64) -> Result<u64> {
        let mut rows = self.rows();
        let before = rows.len();
        rows.retain(|_, record| !record.is_expired_at(now));
        Ok((before - rows.len()) as u64)
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<RefreshTokenRecord>> {
        Ok(self.rows().values().find(|record| record.user_id == user_id).cloned())
    }
}

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    async fn create(&self, name: Option<&str>, email: &str, password_hash: &str) -> Result<User> {
        let user = User {
            id: Uuid::new_v4(),
            name: name.map(str::to_string),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Some(OffsetDateTime::now_utc()),
        };
        self.users.lock().unwrap_or_else(PoisonError::into_inner).insert(user.id, user.clone());
        Ok(user)
    }
}
