//! Tracing setup for the `modula` binaries: one daily-rolling file per
//! component, plus an optional stderr layer.

use crate::config::LoggingConfig;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Directory log files are written to; `~/.modula/logs` unless configured.
pub fn log_dir(config: &LoggingConfig) -> PathBuf {
    config.directory.clone().unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".modula/logs")
    })
}

/// `RUST_LOG` takes precedence over the configured level.
fn filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Installs the global subscriber. Keep the guard alive until exit or
/// buffered lines are lost.
pub fn init_logging(component: &str, config: &LoggingConfig, to_stderr: bool) -> WorkerGuard {
    let dir = log_dir(config);
    let created = std::fs::create_dir_all(&dir);

    // e.g. cli.log.2024-01-21
    let file_appender = tracing_appender::rolling::daily(&dir, format!("{component}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let stderr_layer = to_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter(config))
        .with(file_layer)
        .with(stderr_layer)
        .init();

    if let Err(e) = created {
        tracing::warn!("Cannot create log directory {}: {}", dir.display(), e);
    }
    tracing::debug!("Logging {} to {}", component, dir.display());
    guard
}
