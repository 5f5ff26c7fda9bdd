//! Shared command setup: configuration and logging.

use std::path::Path;

use demtile::config::{config_file_path, ConfigFile};
use demtile::logging::{init_logging, LoggingGuard};
use tracing::{debug, info};

use crate::error::CliError;

/// Holds what every command needs for its lifetime.
pub struct CliRunner {
    config: ConfigFile,
    _logging: LoggingGuard,
}

impl CliRunner {
    /// Load configuration and install logging.
    ///
    /// `log_file`, if given, receives a copy of everything logged.
    pub fn new(
        config_path: Option<&Path>,
        verbose: bool,
        log_file: Option<&Path>,
    ) -> Result<Self, CliError> {
        let logging =
            init_logging(verbose, log_file).map_err(|e| CliError::Logging(e.to_string()))?;

        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(config_file_path);
        let config = ConfigFile::load(&path)?;
        debug!(path = %path.display(), "Loaded configuration");

        Ok(Self {
            config,
            _logging: logging,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn log_startup(&self, command: &str) {
        info!(version = demtile::VERSION, command, "demtile starting");
    }
}
