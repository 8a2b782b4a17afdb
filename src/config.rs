use clap::{Args, Parser, ValueEnum};

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub database: DatabaseConfig,

    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub auth: AuthConfig,

    #[command(flatten)]
    pub sweep: SweepConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[arg(long = "database-url", env = "INKPOST_DATABASE_URL")]
    pub url: String,

    /// Maximum number of pooled connections
    #[arg(long = "db-max-connections", env = "INKPOST_DB_MAX_CONNECTIONS", default_value_t = 20)]
    pub max_connections: u32,

    /// Minimum number of idle connections kept open
    #[arg(long = "db-min-connections", env = "INKPOST_DB_MIN_CONNECTIONS", default_value_t = 1)]
    pub min_connections: u32,

    /// Seconds to wait for a free connection before giving up
    #[arg(long = "db-acquire-timeout-secs", env = "INKPOST_DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 5)]
    pub acquire_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "INKPOST_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "INKPOST_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Seconds to wait for background tasks after a shutdown signal
    #[arg(long, env = "INKPOST_SHUTDOWN_TIMEOUT_SECS", default_value_t = 5)]
    pub shutdown_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct AuthConfig {
    /// Secret key for JWT signing. The token service refuses to start without it.
    #[arg(long, env = "INKPOST_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Lifetime of access tokens issued at login, in seconds
    #[arg(long, env = "INKPOST_ACCESS_TOKEN_TTL_SECS", default_value_t = 7 * 24 * 60 * 60)]
    pub access_token_ttl_secs: u64,

    /// Lifetime of access tokens issued by refresh-token rotation, in seconds
    #[arg(long, env = "INKPOST_ROTATED_ACCESS_TOKEN_TTL_SECS", default_value_t = 30 * 24 * 60 * 60)]
    pub rotated_access_token_ttl_secs: u64,

    /// Refresh token time-to-live in days
    #[arg(long, env = "INKPOST_REFRESH_TOKEN_TTL_DAYS", default_value_t = 30)]
    pub refresh_token_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            access_token_ttl_secs: 7 * 24 * 60 * 60,
            rotated_access_token_ttl_secs: 30 * 24 * 60 * 60,
            refresh_token_ttl_days: 30,
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct SweepConfig {
    /// Run the daily expired refresh token sweep
    #[arg(
        long = "sweep-enabled",
        env = "INKPOST_SWEEP_ENABLED",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub enabled: bool,

    /// UTC hour at which the sweep runs
    #[arg(
        long = "sweep-hour",
        env = "INKPOST_SWEEP_HOUR",
        default_value_t = 3,
        value_parser = clap::value_parser!(u8).range(0..24)
    )]
    pub hour: u8,

    /// UTC minute at which the sweep runs
    #[arg(
        long = "sweep-minute",
        env = "INKPOST_SWEEP_MINUTE",
        default_value_t = 0,
        value_parser = clap::value_parser!(u8).range(0..60)
    )]
    pub minute: u8,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self { enabled: true, hour: 3, minute: 0 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// Log output format
    #[arg(long, env = "INKPOST_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_args() {
        let config = Config::try_parse_from([
            "inkpost-server",
            "--database-url",
            "postgres://localhost/inkpost",
            "--jwt-secret",
            "secret",
        ])
        .unwrap();

        assert_eq!(config.auth.jwt_secret.as_deref(), Some("secret"));
        assert_eq!(config.auth.access_token_ttl_secs, 604_800);
        assert_eq!(config.auth.rotated_access_token_ttl_secs, 2_592_000);
        assert_eq!(config.auth.refresh_token_ttl_days, 30);
        assert!(config.sweep.enabled);
        assert_eq!((config.sweep.hour, config.sweep.minute), (3, 0));
        assert_eq!(config.telemetry.log_format, LogFormat::Text);
    }

    #[test]
    fn test_sweep_can_be_disabled() {
        let config = Config::try_parse_from([
            "inkpost-server",
            "--database-url",
            "postgres://localhost/inkpost",
            "--sweep-enabled",
            "false",
        ])
        .unwrap();

        assert!(!config.sweep.enabled);
        assert!(config.auth.jwt_secret.is_none());
    }

    #[test]
    fn test_rejects_out_of_range_sweep_hour() {
        let result = Config::try_parse_from([
            "inkpost-server",
            "--database-url",
            "postgres://localhost/inkpost",
            "--sweep-hour",
            "24",
        ]);
        assert!(result.is_err());
    }
}
