//! Common types and utilities shared across CLI commands.

use std::sync::Arc;

use clap::ValueEnum;
use demtile::config::ConfigFile;
use demtile::coordinator::PoolChoice;
use demtile::process::{ProcessRunner, SystemRunner};

use crate::error::CliError;

/// Worker pool selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum PoolArg {
    /// Distributor when --nodes-list is given, otherwise local processes
    #[default]
    Auto,
    /// Child processes on this machine
    Local,
    /// GNU parallel, optionally across the hosts in --nodes-list
    Distributor,
}

impl From<PoolArg> for PoolChoice {
    fn from(arg: PoolArg) -> Self {
        match arg {
            PoolArg::Auto => PoolChoice::Auto,
            PoolArg::Local => PoolChoice::Local,
            PoolArg::Distributor => PoolChoice::Distributor,
        }
    }
}

/// Tile size and padding, CLI taking precedence over config.
pub fn resolve_tiling(
    cli_tile_size: Option<i64>,
    cli_padding: Option<i64>,
    config: &ConfigFile,
) -> Result<(i64, i64), CliError> {
    let tile_size = cli_tile_size.unwrap_or(config.tile_size);
    let padding = cli_padding.unwrap_or(config.padding);

    if tile_size <= 0 {
        return Err(CliError::Usage(format!(
            "--tile-size must be positive, got {}",
            tile_size
        )));
    }
    if padding < 0 {
        return Err(CliError::Usage(format!(
            "--padding must not be negative, got {}",
            padding
        )));
    }
    Ok((tile_size, padding))
}

/// Runner for the real external programs.
pub fn system_runner() -> Arc<dyn ProcessRunner> {
    Arc::new(SystemRunner::new())
}
