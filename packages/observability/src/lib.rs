//! # Observability
//!
//! Logging setup shared by every community-feed binary.
//!
//! Components are **log producers** only. They call [`init_with_config`]
//! once at startup and use the standard `tracing` macros everywhere else;
//! where the lines end up is decided here.
//!
//! ## Output
//!
//! When a log path is configured, every event is appended as one JSON object
//! per line (see [`json_layer::LogEntry`]) so the file can be followed with
//! `tail -f feed.jsonl | jq`. An optional compact stderr layer gives
//! immediate feedback for interactive use. Without a log path the compact
//! stderr layer is the only sink.
//!
//! ## Usage
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "cli".into(),
//!         default_level: "debug".into(),
//!         log_path: Some("/tmp/feed.jsonl".into()),
//!         also_stderr: true,
//!     });
//!
//!     tracing::info!("ready");
//! }
//! ```

mod file;
mod json_layer;

use std::io;
use std::path::PathBuf;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub use file::{FileLogWriter, WriterFactory};
pub use json_layer::{JsonLayer, LogEntry};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g., "cli", "watch").
    /// Included in every JSON log line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional JSONL log file. No file sink is installed when absent.
    pub log_path: Option<PathBuf>,

    /// Also emit logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: true,
        }
    }
}

/// Initialize the observability layer with custom configuration.
///
/// Installing a global subscriber twice is a no-op. If the log file cannot
/// be opened the file sink is skipped and stderr is used instead.
pub fn init_with_config(config: LogConfig) {
    let env_filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_level))
    };

    let (json_layer, open_error) = match config.log_path.as_ref().map(FileLogWriter::new) {
        Some(Ok(writer)) => {
            let layer = JsonLayer::new(config.service_name.clone(), WriterFactory::new(writer));
            (Some(layer.with_filter(env_filter())), None)
        }
        Some(Err(error)) => (None, Some(error)),
        None => (None, None),
    };

    let stderr_wanted = config.also_stderr || json_layer.is_none();
    let stderr_layer = stderr_wanted.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(io::stderr)
            .with_filter(env_filter())
    });

    let installed = tracing_subscriber::registry()
        .with(json_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if !installed {
        return;
    }

    match (open_error, config.log_path.as_ref()) {
        (Some(error), Some(path)) => tracing::warn!(
            log_path = %path.display(),
            error = %error,
            "failed to open log file, logging to stderr only"
        ),
        (None, Some(path)) => tracing::debug!(
            log_path = %path.display(),
            service = %config.service_name,
            "observability initialized"
        ),
        _ => tracing::debug!(service = %config.service_name, "observability initialized"),
    }
}
