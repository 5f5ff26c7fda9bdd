//! Tracing subscriber setup.
//!
//! Logs go to stderr and, when a file is given, also to that file through a
//! non-blocking writer. The filter honours `RUST_LOG`; without it the level
//! is `info`, or `debug` when verbose.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to install tracing subscriber: {0}")]
    Init(String),
}

/// Keeps the file writer alive. Flushes on drop.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    })
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if the log file's directory cannot be created or a global
/// subscriber is already set.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<LoggingGuard, LoggingError> {
    let stderr_layer = fmt::layer().with_writer(io::stderr).with_target(false);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            fs::create_dir_all(dir).map_err(|source| LoggingError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "demtile-log.txt".into());

            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(LoggingGuard { _file: guard })
}
