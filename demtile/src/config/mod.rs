//! Configuration file handling.

mod file;

pub use file::{
    config_directory, config_file_path, ConfigFile, ProgramSettings, DEFAULT_PADDING,
    DEFAULT_TILE_SIZE,
};

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid value '{value}' for {section}.{key}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
