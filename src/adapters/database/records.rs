use crate::domain::auth::RefreshTokenRecord as RefreshToken;
use crate::domain::user::User;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRecord {
    pub(crate) id: Uuid,
    pub(crate) name: Option<String>,
    pub(crate) email: String,
    pub(crate) password_hash: String,
    pub(crate) created_at: Option<OffsetDateTime>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            email: record.email,
            password_hash: record.password_hash,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RefreshTokenRecord {
    pub(crate) id: String,
    pub(crate) user_id: Uuid,
    pub(crate) expires_at: i64,
}

impl From<RefreshTokenRecord> for RefreshToken {
    fn from(record: RefreshTokenRecord) -> Self {
        Self { id: record.id, user_id: record.user_id, expires_at: record.expires_at }
    }
}
