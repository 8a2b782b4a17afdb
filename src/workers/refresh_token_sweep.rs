use crate::config::SweepConfig;
use crate::core::clock::Clock;
use crate::core::token_service::TokenService;
use crate::error::{AppError, Result};
use opentelemetry::{global, metrics::Counter};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use time::{Duration, OffsetDateTime, Time, UtcOffset};
use tracing::Instrument;

/// A fixed UTC wall-clock time at which a job runs once per day.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DailySchedule {
    at: Time,
}

impl DailySchedule {
    /// # Errors
    /// Returns `AppError::Configuration` if the hour or minute is out of range.
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        let at = Time::from_hms(hour, minute, 0)
            .map_err(|e| AppError::Configuration(format!("invalid sweep time {hour:02}:{minute:02}: {e}")))?;
        Ok(Self { at })
    }

    /// The first scheduled instant strictly after `now`.
    #[must_use]
    pub fn next_after(&self, now: OffsetDateTime) -> OffsetDateTime {
        let now = now.to_offset(UtcOffset::UTC);
        let today = now.replace_time(self.at);
        if today > now { today } else { today + Duration::days(1) }
    }

    /// The slot after `completed`, even if the wall clock at `now` still reads earlier.
    #[must_use]
    pub fn following(&self, completed: OffsetDateTime, now: OffsetDateTime) -> OffsetDateTime {
        self.next_after(completed.max(now))
    }
}

#[derive(Clone, Debug)]
struct Metrics {
    runs: Counter<u64>,
    errors: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("inkpost-server");
        Self {
            runs: meter.u64_counter("auth_refresh_token_sweep_runs_total").build(),
            errors: meter.u64_counter("auth_refresh_token_sweep_errors_total").build(),
        }
    }
}

/// Deletes expired refresh tokens once a day.
#[derive(Debug)]
pub struct RefreshTokenSweepWorker {
    token_service: TokenService,
    clock: Arc<dyn Clock>,
    schedule: DailySchedule,
    enabled: bool,
    metrics: Metrics,
}

impl RefreshTokenSweepWorker {
    /// # Errors
    /// Returns `AppError::Configuration` if the configured sweep time is invalid.
    pub fn new(token_service: TokenService, clock: Arc<dyn Clock>, config: &SweepConfig) -> Result<Self> {
        Ok(Self {
            token_service,
            clock,
            schedule: DailySchedule::new(config.hour, config.minute)?,
            enabled: config.enabled,
            metrics: Metrics::new(),
        })
    }

    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        if !self.enabled {
            tracing::info!("Refresh token sweep is disabled");
            return;
        }

        let mut next = self.schedule.next_after(self.clock.now());
        while !*shutdown.borrow() {
            let delay = StdDuration::try_from(next - self.clock.now()).unwrap_or(StdDuration::ZERO);
            tracing::debug!(next_run = %next, "Next refresh token sweep scheduled");

            tokio::select! {
                () = tokio::time::sleep(delay) => {
                    self.perform_sweep()
                        .instrument(tracing::info_span!("run_refresh_token_sweep"))
                        .await;
                    next = self.schedule.following(next, self.clock.now());
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::info!("Refresh token sweep loop shutting down...");
    }

    /// Runs one sweep. Store failures are logged and swallowed.
    ///
    /// Returns the number of deleted rows, or `None` if the sweep failed.
    #[tracing::instrument(skip(self), fields(expired_deleted = tracing::field::Empty))]
    pub async fn perform_sweep(&self) -> Option<u64> {
        tracing::debug!("Running refresh token sweep...");
        self.metrics.runs.add(1, &[]);

        match self.token_service.sweep().await {
            Ok(count) => {
                if count > 0 {
                    tracing::info!(count = %count, "Deleted expired refresh tokens");
                }
                tracing::Span::current().record("expired_deleted", count);
                Some(count)
            }
            Err(e) => {
                self.metrics.errors.add(1, &[]);
                tracing::error!(error = ?e, "Refresh token sweep failed");
                None
            }
        }
    }
}
