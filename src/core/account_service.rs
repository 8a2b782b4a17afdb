use crate::core::auth;
use crate::core::store::UserStore;
use crate::core::token_service::TokenService;
use crate::domain::auth::TokenPair;
use crate::domain::user::User;
use crate::error::{AppError, Result};
use std::sync::Arc;

#[derive(Debug)]
pub struct LoginOutcome {
    pub user: User,
    pub tokens: TokenPair,
}

#[derive(Clone, Debug)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    token_service: TokenService,
}

impl AccountService {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, token_service: TokenService) -> Self {
        Self { users, token_service }
    }

    /// # Errors
    /// Returns `AppError::Internal` if hashing fails or the blocking task panics.
    pub async fn hash_password(&self, password: &str) -> Result<String> {
        let password = password.to_string();
        tokio::task::spawn_blocking(move || auth::hash_password(&password))
            .await
            .map_err(|_| AppError::Internal)?
    }

    /// # Errors
    /// Returns `AppError::Internal` if the stored hash is unreadable or the blocking task panics.
    pub async fn verify_password(&self, password: &str, password_hash: &str) -> Result<bool> {
        let password = password.to_string();
        let password_hash = password_hash.to_string();
        tokio::task::spawn_blocking(move || auth::verify_password(&password, &password_hash))
            .await
            .map_err(|_| AppError::Internal)?
    }

    /// Creates a user with an argon2 hash of `password`.
    ///
    /// # Errors
    /// Returns `AppError::MissingParameter` for a blank email or password.
    pub async fn create_user(&self, name: Option<&str>, email: &str, password: &str) -> Result<User> {
        if email.is_empty() {
            return Err(AppError::MissingParameter("email"));
        }
        if password.is_empty() {
            return Err(AppError::MissingParameter("password"));
        }

        let password_hash = self.hash_password(password).await?;
        self.users.create(name, email, &password_hash).await
    }

    /// Checks the credentials and issues a fresh token pair.
    ///
    /// # Errors
    /// Returns `AppError::UserNotFound` for an unknown email and `AppError::InvalidCredentials`
    /// for a wrong password.
    #[tracing::instrument(
        skip(self, email, password),
        fields(user_id = tracing::field::Empty),
        err(level = "warn")
    )]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        if email.is_empty() {
            return Err(AppError::MissingParameter("email"));
        }
        if password.is_empty() {
            return Err(AppError::MissingParameter("password"));
        }

        let Some(user) = self.users.find_by_email(email).await? else {
            tracing::warn!("Login failed: user not found");
            return Err(AppError::UserNotFound);
        };

        tracing::Span::current().record("user_id", tracing::field::display(user.id));

        let is_valid = self.verify_password(password, &user.password_hash).await?;

        if !is_valid {
            tracing::warn!("Login failed: invalid password");
            return Err(AppError::InvalidCredentials);
        }

        let tokens = self.token_service.issue(user.id).await?;

        tracing::info!("User logged in successfully");

        Ok(LoginOutcome { user, tokens })
    }
}
