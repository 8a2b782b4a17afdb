use crate::config::AuthConfig;
use crate::core::auth::{self, SigningKey};
use crate::core::clock::Clock;
use crate::core::store::RefreshTokenStore;
use crate::domain::auth::{Claims, TokenPair};
use crate::error::{AppError, Result};
use opentelemetry::{global, metrics::Counter};
use std::sync::Arc;
use uuid::Uuid;

const SECS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Clone, Debug)]
struct Metrics {
    login_total: Counter<u64>,
    refresh_total: Counter<u64>,
    logout_total: Counter<u64>,
    swept_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("inkpost-server");
        Self {
            login_total: meter
                .u64_counter("auth_login_total")
                .with_description("Total number of token pairs issued at login")
                .build(),
            refresh_total: meter
                .u64_counter("auth_refresh_total")
                .with_description("Total number of successful token rotations")
                .build(),
            logout_total: meter
                .u64_counter("auth_logout_total")
                .with_description("Total number of revoked refresh tokens")
                .build(),
            swept_total: meter
                .u64_counter("auth_refresh_tokens_swept_total")
                .with_description("Total number of expired refresh tokens deleted by the sweep")
                .build(),
        }
    }
}

/// Issues, rotates, revokes and verifies the access/refresh token pair.
///
/// Refresh tokens are handed out raw and stored as SHA-256 digests.
#[derive(Clone, Debug)]
pub struct TokenService {
    key: SigningKey,
    access_token_ttl_secs: i64,
    rotated_access_token_ttl_secs: i64,
    refresh_token_ttl_secs: i64,
    store: Arc<dyn RefreshTokenStore>,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
}

impl TokenService {
    /// # Errors
    /// Returns `AppError::Configuration` if no signing key is configured or a TTL is out of range.
    pub fn new(config: &AuthConfig, store: Arc<dyn RefreshTokenStore>, clock: Arc<dyn Clock>) -> Result<Self> {
        let key = SigningKey::from_secret(config.jwt_secret.as_deref())?;

        Ok(Self {
            key,
            access_token_ttl_secs: i64::try_from(config.access_token_ttl_secs)
                .map_err(|_| AppError::Configuration("access token TTL out of range".into()))?,
            rotated_access_token_ttl_secs: i64::try_from(config.rotated_access_token_ttl_secs)
                .map_err(|_| AppError::Configuration("rotated access token TTL out of range".into()))?,
            refresh_token_ttl_secs: config
                .refresh_token_ttl_days
                .checked_mul(SECS_PER_DAY)
                .filter(|secs| *secs > 0)
                .ok_or_else(|| AppError::Configuration("refresh token TTL must be a positive number of days".into()))?,
            store,
            clock,
            metrics: Metrics::new(),
        })
    }

    /// Mints a fresh pair for a user whose credentials were just verified.
    ///
    /// Any refresh token the user already holds is overwritten.
    ///
    /// # Errors
    /// Returns `AppError::StoreUnavailable` if the upsert fails.
    #[tracing::instrument(skip(self), fields(user_id = %user_id), err(level = "warn"))]
    pub async fn issue(&self, user_id: Uuid) -> Result<TokenPair> {
        let now = self.clock.unix_timestamp();

        let claims = Claims::new(user_id, now, self.access_token_ttl_secs);
        let access_token = self.key.sign(&claims)?;

        let refresh_token = auth::generate_opaque_token();
        let refresh_id = auth::hash_token(&refresh_token);

        self.store.upsert_for_user(user_id, &refresh_id, self.refresh_expiry(now)).await?;

        self.metrics.login_total.add(1, &[]);

        Ok(TokenPair { access_token, refresh_token, expires_at: claims.exp })
    }

    /// Exchanges a live refresh token for a new pair. The presented token is consumed.
    ///
    /// # Errors
    /// Returns `AppError::MissingParameter` for an empty token and `AppError::InvalidToken`
    /// if the token is unknown, expired or already used.
    #[tracing::instrument(skip(self, refresh_token), fields(user_id = tracing::field::Empty), err(level = "warn"))]
    pub async fn rotate(&self, refresh_token: &str) -> Result<TokenPair> {
        if refresh_token.is_empty() {
            return Err(AppError::MissingParameter("refreshToken"));
        }

        let now = self.clock.unix_timestamp();
        let old_id = auth::hash_token(refresh_token);
        let new_refresh_token = auth::generate_opaque_token();
        let new_id = auth::hash_token(&new_refresh_token);

        let user_id = self
            .store
            .rotate_unexpired(&old_id, &new_id, now, self.refresh_expiry(now))
            .await?
            .ok_or(AppError::InvalidToken)?;

        tracing::Span::current().record("user_id", tracing::field::display(user_id));

        let claims = Claims::new(user_id, now, self.rotated_access_token_ttl_secs);
        let access_token = self.key.sign(&claims)?;

        tracing::info!("Tokens rotated successfully");
        self.metrics.refresh_total.add(1, &[]);

        Ok(TokenPair { access_token, refresh_token: new_refresh_token, expires_at: claims.exp })
    }

    /// Deletes a refresh token (logout).
    ///
    /// # Errors
    /// Returns `AppError::MissingParameter` for an empty token and `AppError::NotFound`
    /// if no such token is stored.
    #[tracing::instrument(skip(self, refresh_token), err(level = "warn"))]
    pub async fn revoke(&self, refresh_token: &str) -> Result<()> {
        if refresh_token.is_empty() {
            return Err(AppError::MissingParameter("refreshToken"));
        }

        let id = auth::hash_token(refresh_token);
        if !self.store.delete(&id).await? {
            return Err(AppError::NotFound);
        }

        self.metrics.logout_total.add(1, &[]);
        Ok(())
    }

    /// Deletes every refresh token that expired before now.
    ///
    /// # Errors
    /// Returns `AppError::StoreUnavailable` if the deletion fails.
    #[tracing::instrument(skip(self), err)]
    pub async fn sweep(&self) -> Result<u64> {
        let now = self.clock.unix_timestamp();
        let deleted = self.store.delete_expired(now).await?;
        self.metrics.swept_total.add(deleted, &[]);
        Ok(deleted)
    }

    const fn refresh_expiry(&self, now: i64) -> i64 {
        now.saturating_add(self.refresh_token_ttl_secs)
    }

    /// Verifies an access token and returns the user ID (subject).
    ///
    /// # Errors
    /// Returns `AppError::InvalidToken` on a bad signature, malformed token or expiry.
    pub fn verify(&self, access_token: &str) -> Result<Uuid> {
        let claims = self.key.decode(access_token)?;
        if claims.is_expired_at(self.clock.unix_timestamp()) {
            return Err(AppError::InvalidToken);
        }
        Ok(claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryRefreshTokenStore;
    use crate::core::clock::ManualClock;
    use time::{Duration, OffsetDateTime};

    struct Harness {
        service: TokenService,
        store: Arc<MemoryRefreshTokenStore>,
        clock: ManualClock,
    }

    fn config(secret: &str) -> AuthConfig {
        AuthConfig { jwt_secret: Some(secret.to_string()), ..AuthConfig::default() }
    }

    fn setup() -> Harness {
        let store = Arc::new(MemoryRefreshTokenStore::new());
        let clock = ManualClock::new(OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap());
        let shared: Arc<dyn RefreshTokenStore> = Arc::clone(&store) as Arc<dyn RefreshTokenStore>;
        let service = TokenService::new(&config("test_secret"), shared, Arc::new(clock.clone())).unwrap();
        Harness { service, store, clock }
    }

    #[test]
    fn test_new_without_key() {
        let store = Arc::new(MemoryRefreshTokenStore::new());
        let result = TokenService::new(&AuthConfig::default(), store, Arc::new(ManualClock::default()));
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_new_rejects_bad_refresh_ttl() {
        for days in [0, -1, i64::MAX / SECS_PER_DAY + 1] {
            let store = Arc::new(MemoryRefreshTokenStore::new());
            let cfg = AuthConfig { refresh_token_ttl_days: days, ..config("test_secret") };
            let result = TokenService::new(&cfg, store, Arc::new(ManualClock::default()));
            assert!(matches!(result, Err(AppError::Configuration(_))), "{days} days should be rejected");
        }
    }

    #[tokio::test]
    async fn test_issue_with_largest_refresh_ttl() {
        let store = Arc::new(MemoryRefreshTokenStore::new());
        let clock = ManualClock::new(OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap());
        let cfg = AuthConfig { refresh_token_ttl_days: i64::MAX / SECS_PER_DAY, ..config("test_secret") };
        let shared: Arc<dyn RefreshTokenStore> = Arc::clone(&store) as Arc<dyn RefreshTokenStore>;
        let service = TokenService::new(&cfg, shared, Arc::new(clock)).unwrap();
        let user_id = Uuid::new_v4();

        service.issue(user_id).await.unwrap();

        let row = store.find_by_user(user_id).await.unwrap().unwrap();
        assert_eq!(row.expires_at, i64::MAX);
    }

    #[tokio::test]
    async fn test_issue_persists_one_row_per_user() {
        let h = setup();
        let user_id = Uuid::new_v4();

        let pair = h.service.issue(user_id).await.unwrap();

        let record = h.store.find_by_user(user_id).await.unwrap().unwrap();
        assert_eq!(record.id, auth::hash_token(&pair.refresh_token));
        assert_eq!(record.expires_at, 1_700_000_000 + 30 * SECS_PER_DAY);
        assert_eq!(pair.expires_at, 1_700_000_000 + 7 * SECS_PER_DAY);
        assert_eq!(h.store.len(), 1);
        assert_eq!(h.service.verify(&pair.access_token).unwrap(), user_id);
    }

    #[tokio::test]
    async fn test_second_login_replaces_first() {
        let h = setup();
        let user_id = Uuid::new_v4();

        let first = h.service.issue(user_id).await.unwrap();
        let second = h.service.issue(user_id).await.unwrap();

        assert_ne!(first.refresh_token, second.refresh_token);
        assert_eq!(h.store.len(), 1);
        assert!(matches!(h.service.rotate(&first.refresh_token).await, Err(AppError::InvalidToken)));
        assert!(h.service.rotate(&second.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_rotate_is_single_use() {
        let h = setup();
        let user_id = Uuid::new_v4();
        let pair = h.service.issue(user_id).await.unwrap();

        let rotated = h.service.rotate(&pair.refresh_token).await.unwrap();
        assert_ne!(rotated.refresh_token, pair.refresh_token);
        assert_eq!(rotated.expires_at, 1_700_000_000 + 30 * SECS_PER_DAY);
        assert_eq!(h.service.verify(&rotated.access_token).unwrap(), user_id);

        let again = h.service.rotate(&pair.refresh_token).await;
        assert!(matches!(again, Err(AppError::InvalidToken)));

        let record = h.store.find_by_user(user_id).await.unwrap().unwrap();
        assert_eq!(record.id, auth::hash_token(&rotated.refresh_token));
    }

    #[tokio::test]
    async fn test_rotate_unknown_token() {
        let h = setup();
        assert!(matches!(h.service.rotate("never-issued").await, Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_rotate_empty_token_is_missing_parameter() {
        let h = setup();
        assert!(matches!(h.service.rotate("").await, Err(AppError::MissingParameter("refreshToken"))));
    }

    #[tokio::test]
    async fn test_rotate_expired_leaves_other_rows() {
        let h = setup();
        let stale_user = Uuid::new_v4();
        let stale = h.service.issue(stale_user).await.unwrap();

        h.clock.advance(Duration::days(20));
        let fresh_user = Uuid::new_v4();
        let fresh = h.service.issue(fresh_user).await.unwrap();

        h.clock.advance(Duration::days(11));
        let result = h.service.rotate(&stale.refresh_token).await;
        assert!(matches!(result, Err(AppError::InvalidToken)));

        let fresh_record = h.store.find_by_user(fresh_user).await.unwrap().unwrap();
        assert_eq!(fresh_record.id, auth::hash_token(&fresh.refresh_token));
        assert_eq!(h.store.len(), 2);
    }

    #[tokio::test]
    async fn test_rotate_at_exact_expiry_succeeds() {
        let h = setup();
        let pair = h.service.issue(Uuid::new_v4()).await.unwrap();

        h.clock.advance(Duration::days(30));
        assert!(h.service.rotate(&pair.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_rotation_single_winner() {
        let h = setup();
        let pair = h.service.issue(Uuid::new_v4()).await.unwrap();

        let (a, b) = tokio::join!(h.service.rotate(&pair.refresh_token), h.service.rotate(&pair.refresh_token));

        let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1);
        assert!(matches!(a.err().or(b.err()), Some(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_revoke() {
        let h = setup();
        let pair = h.service.issue(Uuid::new_v4()).await.unwrap();

        h.service.revoke(&pair.refresh_token).await.unwrap();
        assert_eq!(h.store.len(), 0);

        assert!(matches!(h.service.revoke(&pair.refresh_token).await, Err(AppError::NotFound)));
        assert!(matches!(h.service.rotate(&pair.refresh_token).await, Err(AppError::InvalidToken)));
        assert!(matches!(h.service.revoke("").await, Err(AppError::MissingParameter(_))));
    }

    #[tokio::test]
    async fn test_sweep_deletes_only_expired() {
        let h = setup();
        let old_user = Uuid::new_v4();
        h.service.issue(old_user).await.unwrap();

        h.clock.advance(Duration::days(15));
        let new_user = Uuid::new_v4();
        h.service.issue(new_user).await.unwrap();

        h.clock.advance(Duration::days(16));
        assert_eq!(h.service.sweep().await.unwrap(), 1);
        assert!(h.store.find_by_user(old_user).await.unwrap().is_none());
        assert!(h.store.find_by_user(new_user).await.unwrap().is_some());

        assert_eq!(h.service.sweep().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_verify_rejects_after_expiry() {
        let h = setup();
        let pair = h.service.issue(Uuid::new_v4()).await.unwrap();

        h.clock.advance(Duration::days(7));
        assert!(h.service.verify(&pair.access_token).is_ok());

        h.clock.advance(Duration::seconds(1));
        assert!(matches!(h.service.verify(&pair.access_token), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_verify_rejects_foreign_key() {
        let h = setup();
        let other = TokenService::new(
            &config("another_secret"),
            Arc::new(MemoryRefreshTokenStore::new()),
            Arc::new(h.clock.clone()),
        )
        .unwrap();

        let pair = other.issue(Uuid::new_v4()).await.unwrap();
        assert!(matches!(h.service.verify(&pair.access_token), Err(AppError::InvalidToken)));
        assert!(matches!(h.service.verify("garbage"), Err(AppError::InvalidToken)));
    }
}
