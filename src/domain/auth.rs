use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by an access token. Timestamps are seconds since the Unix epoch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub const fn new(user_id: Uuid, issued_at: i64, ttl_secs: i64) -> Self {
        Self { sub: user_id, iat: issued_at, exp: issued_at.saturating_add(ttl_secs) }
    }

    #[must_use]
    pub const fn is_expired_at(&self, now: i64) -> bool {
        self.exp < now
    }
}

/// A persisted refresh token row.
///
/// `id` is the SHA-256 digest of the value handed to the client, never the raw value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: i64,
}

impl RefreshTokenRecord {
    #[must_use]
    pub const fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at < now
    }
}

/// Access/refresh token pair returned to the caller after login or rotation.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry of the access token.
    pub expires_at: i64,
}
