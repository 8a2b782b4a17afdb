#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

pub mod adapters;
pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod telemetry;
pub mod workers;

use crate::adapters::database::{DbPool, RefreshTokenRepository, UserRepository};
use crate::api::AppState;
use crate::config::{AuthConfig, SweepConfig};
use crate::core::account_service::AccountService;
use crate::core::clock::{Clock, SystemClock};
use crate::core::store::{RefreshTokenStore, UserStore};
use crate::core::token_service::TokenService;
use crate::error::{AppError, Result};
use crate::workers::RefreshTokenSweepWorker;
use std::sync::Arc;
use tokio::sync::watch;

/// Wired services plus the background worker that still has to be spawned.
#[derive(Debug)]
pub struct App {
    pub state: AppState,
    pub sweep_worker: RefreshTokenSweepWorker,
}

#[derive(Debug)]
pub struct AppBuilder {
    auth: AuthConfig,
    sweep: SweepConfig,
    token_store: Option<Arc<dyn RefreshTokenStore>>,
    user_store: Option<Arc<dyn UserStore>>,
    clock: Arc<dyn Clock>,
}

impl AppBuilder {
    #[must_use]
    pub fn new(auth: AuthConfig, sweep: SweepConfig) -> Self {
        Self { auth, sweep, token_store: None, user_store: None, clock: Arc::new(SystemClock) }
    }

    #[must_use]
    pub fn with_database(self, pool: DbPool) -> Self {
        self.with_stores(
            Arc::new(RefreshTokenRepository::new(pool.clone())),
            Arc::new(UserRepository::new(pool)),
        )
    }

    #[must_use]
    pub fn with_stores(mut self, token_store: Arc<dyn RefreshTokenStore>, user_store: Arc<dyn UserStore>) -> Self {
        self.token_store = Some(token_store);
        self.user_store = Some(user_store);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// # Errors
    /// Returns `AppError::Configuration` if a store is missing, the signing key is absent,
    /// or the sweep schedule is invalid.
    pub fn build(self) -> Result<App> {
        let token_store =
            self.token_store.ok_or_else(|| AppError::Configuration("refresh token store not configured".into()))?;
        let user_store = self.user_store.ok_or_else(|| AppError::Configuration("user store not configured".into()))?;

        let token_service = TokenService::new(&self.auth, token_store, Arc::clone(&self.clock))?;
        let account_service = AccountService::new(user_store, token_service.clone());
        let sweep_worker = RefreshTokenSweepWorker::new(token_service.clone(), self.clock, &self.sweep)?;

        Ok(App { state: AppState { token_service, account_service }, sweep_worker })
    }
}

/// Flips the shutdown channel on Ctrl+C or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
        }

        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });
}
