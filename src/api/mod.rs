use crate::core::account_service::AccountService;
use crate::core::token_service::TokenService;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod middleware;
pub mod schemas;

#[derive(Clone, Debug)]
pub struct AppState {
    pub token_service: TokenService,
    pub account_service: AccountService,
}

/// Routes for the session lifecycle: login, refresh, logout and access-token verification.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/users/login", post(auth::login))
        .route("/users/refresh-token", post(auth::refresh))
        .route("/users/logout", post(auth::logout))
        .route("/users/verify-token", get(auth::verify))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
