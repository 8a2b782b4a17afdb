#![allow(dead_code)]

use inkpost_server::adapters::memory::{MemoryRefreshTokenStore, MemoryUserStore};
use inkpost_server::config::{AuthConfig, SweepConfig};
use inkpost_server::core::clock::ManualClock;
use inkpost_server::core::store::{RefreshTokenStore, UserStore};
use inkpost_server::{App, AppBuilder};
use std::sync::{Arc, Once};
use time::OffsetDateTime;

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("inkpost_server=debug".parse().unwrap())
            .add_directive("sqlx=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}

pub fn test_auth_config() -> AuthConfig {
    AuthConfig { jwt_secret: Some("test_secret".to_string()), ..AuthConfig::default() }
}

pub struct TestApp {
    pub server_url: String,
    pub client: reqwest::Client,
    pub clock: ManualClock,
    pub token_store: Arc<MemoryRefreshTokenStore>,
    pub app: App,
}

impl TestApp {
    pub async fn spawn() -> Self {
        setup_tracing();

        let clock = ManualClock::new(OffsetDateTime::now_utc());
        let token_store = Arc::new(MemoryRefreshTokenStore::new());
        let user_store: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());

        let app = AppBuilder::new(test_auth_config(), SweepConfig::default())
            .with_stores(Arc::clone(&token_store) as Arc<dyn RefreshTokenStore>, user_store)
            .with_clock(Arc::new(clock.clone()))
            .build()
            .expect("Failed to build app");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = inkpost_server::api::app_router(app.state.clone());

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { server_url: format!("http://{addr}"), client: reqwest::Client::new(), clock, token_store, app }
    }

    pub async fn create_user(&self, email: &str, password: &str) -> uuid::Uuid {
        self.app.state.account_service.create_user(Some("Test User"), email, password).await.unwrap().id
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/users/login", self.server_url))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap()
    }

    pub async fn refresh(&self, refresh_token: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/users/refresh-token", self.server_url))
            .json(&serde_json::json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .unwrap()
    }
}

pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}_{}@example.com", &uuid::Uuid::new_v4().to_string()[..8])
}
