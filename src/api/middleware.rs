use crate::api::AppState;
use crate::error::AppError;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use uuid::Uuid;

/// The caller identified by a valid `Authorization: Bearer` access token.
#[derive(Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts.headers.get(header::AUTHORIZATION).ok_or(AppError::InvalidToken)?;

        let auth_str = auth_header.to_str().map_err(|_| AppError::InvalidToken)?;
        let token = auth_str.strip_prefix("Bearer ").ok_or(AppError::InvalidToken)?;

        let user_id = state.token_service.verify(token)?;
        tracing::debug!(user_id = %user_id, "Access token verified");

        Ok(Self { user_id })
    }
}
