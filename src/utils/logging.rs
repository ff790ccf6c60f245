//! Structured logging setup.
//!
//! Installs a global `tracing` subscriber from [`LoggingConfig`]: console
//! and/or file output, human-readable or JSON. `RUST_LOG` directives take
//! precedence over the configured level.

use crate::config::LoggingConfig;
use crate::error::{ProtocolError, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Filter for `config`, honouring `RUST_LOG` when it is set.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(config.log_level).into())
        .from_env_lossy()
}

/// Install the global subscriber.
///
/// Returns `Ok(false)` if a global subscriber was already installed, so
/// calling this twice is harmless.
///
/// # Errors
/// `ConfigError` if file logging is enabled without a usable path.
pub fn init_logging(config: &LoggingConfig) -> Result<bool> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    if config.log_to_console {
        let layer = fmt::layer().with_target(true);
        layers.push(if config.json_format {
            layer.json().boxed()
        } else {
            layer.boxed()
        });
    }

    if config.log_to_file {
        let path = config.log_file_path.as_deref().ok_or_else(|| {
            ProtocolError::ConfigError(
                "log_file_path must be specified when log_to_file is true".to_string(),
            )
        })?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open log file: {e}")))?;

        let layer = fmt::layer().with_writer(Mutex::new(file)).with_ansi(false);
        layers.push(if config.json_format {
            layer.json().boxed()
        } else {
            layer.boxed()
        });
    }

    let installed = tracing_subscriber::registry()
        .with(layers)
        .with(env_filter(config))
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(app = %config.app_name, level = %config.log_level, "Logging initialized");
    }
    Ok(installed)
}
