use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::auth::{
    AuthSession as AuthSessionSchema, Login, LoginResponse, Logout, LogoutResponse, Refresh, UserSummary,
    VerifiedToken,
};
use crate::domain::auth::TokenPair;
use crate::error::{AppError, Result};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};

pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Login>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(payload) = accept_body(payload, "email")?;
    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    let outcome = state.account_service.login(&email, &password).await?;
    Ok(Json(LoginResponse {
        user: UserSummary { id: outcome.user.id, email: outcome.user.email },
        token: outcome.tokens.access_token,
        refresh_token: outcome.tokens.refresh_token,
        expires_at: outcome.tokens.expires_at,
    }))
}

pub async fn refresh(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Refresh>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(payload) = accept_body(payload, "refreshToken")?;
    let refresh_token = payload.refresh_token.unwrap_or_default();

    let tokens = state.token_service.rotate(&refresh_token).await?;
    Ok(Json(map_session(tokens)))
}

pub async fn logout(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Logout>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(payload) = accept_body(payload, "refreshToken")?;
    let refresh_token = payload.refresh_token.unwrap_or_default();

    state.token_service.revoke(&refresh_token).await?;
    tracing::info!("User logged out");
    Ok(Json(LogoutResponse { message: "Logged out successfully." }))
}

pub async fn verify(auth_user: AuthUser) -> Json<VerifiedToken> {
    Json(VerifiedToken { user_id: auth_user.user_id })
}

/// A body that is absent, not JSON or the wrong shape carries none of the
/// required fields, so it is reported against the first of them.
fn accept_body<T>(
    payload: std::result::Result<Json<T>, JsonRejection>,
    required: &'static str,
) -> Result<Json<T>> {
    payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected request body");
        AppError::MissingParameter(required)
    })
}

fn map_session(tokens: TokenPair) -> AuthSessionSchema {
    AuthSessionSchema { token: tokens.access_token, refresh_token: tokens.refresh_token, expires_at: tokens.expires_at }
}
