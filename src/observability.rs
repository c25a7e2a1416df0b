//! Logging configuration and startup events for the feature server.

use std::env;
use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    /// Read `ODFS_LOG_LEVEL`, `ODFS_LOG_FORMAT`, and `ODFS_LOG_TARGET`,
    /// keeping defaults for unset or unparsable values.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level) = env::var("ODFS_LOG_LEVEL") {
            let trimmed = level.trim();
            if !trimmed.is_empty() {
                config.level = trimmed.to_string();
            }
        }

        if let Some(format) = env::var("ODFS_LOG_FORMAT").ok().and_then(|raw| LogFormat::parse(&raw))
        {
            config.format = format;
        }

        if let Some(include_target) = env::var("ODFS_LOG_TARGET").ok().and_then(|raw| parse_bool(&raw))
        {
            config.include_target = include_target;
        }

        config
    }
}

#[derive(Debug, Error)]
pub enum LoggingInitError {
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing::subscriber::SetGlobalDefaultError),
}

pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingInitError> {
    let env_filter =
        EnvFilter::try_new(config.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(config.include_target)
        .with_ansi(matches!(config.format, LogFormat::Pretty));

    match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish())?,
    }

    Ok(())
}

pub fn log_server_start(config: &LoggingConfig) {
    info!(
        component = "feature_server",
        event = "app.start",
        log_level = %config.level,
        log_format = ?config.format,
        include_target = config.include_target
    );
}

pub fn log_store_opened(path: &Path) {
    info!(
        component = "feature_server",
        event = "store.opened",
        store_path = %path.display()
    );
}

pub fn log_server_bind(bound_addr: SocketAddr) {
    info!(
        component = "feature_server",
        event = "app.bind",
        bind_addr = %bound_addr,
        route = "/features"
    );
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
