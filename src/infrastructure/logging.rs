//! Logging initialization.
//!
//! Console output through `tracing-subscriber` with an `EnvFilter` (the
//! `RUST_LOG` variable overrides the configured level), plus optional
//! non-blocking file output. The returned guard keeps the file writer's
//! worker thread alive; `main` holds it for the process lifetime.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: String,
    /// Also write daily-rotated log files.
    pub file_output: bool,
    /// Directory for log files when `file_output` is on.
    pub log_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_output: false,
            log_dir: PathBuf::from("logs"),
        }
    }
}

/// Initialize the global subscriber once per process.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false));

    if config.file_output {
        let appender = rolling::daily(&config.log_dir, "beer-price-tracker.log");
        let (writer, guard) = non_blocking(appender);
        registry
            .with(fmt::layer().with_writer(writer).with_ansi(false))
            .try_init()
            .map_err(|e| anyhow!("failed to initialize logging: {e}"))?;
        Ok(Some(guard))
    } else {
        registry
            .try_init()
            .map_err(|e| anyhow!("failed to initialize logging: {e}"))?;
        Ok(None)
    }
}
