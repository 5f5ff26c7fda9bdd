//! Init command: write a default configuration file.

use std::path::{Path, PathBuf};

use clap::Args;
use demtile::config::{config_file_path, ConfigFile};

use crate::error::CliError;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

/// Run the init command.
pub fn run(args: InitArgs, config_path: Option<PathBuf>) -> Result<(), CliError> {
    let path = config_path.unwrap_or_else(config_file_path);
    let written = write_default(&path, args.force)?;

    if written {
        println!("Created configuration file: {}", path.display());
    } else {
        println!("Configuration file already exists: {}", path.display());
        println!("Use --force to overwrite it with defaults.");
    }
    println!();
    println!("Edit this file to set the external program names and tiling defaults.");
    println!("CLI arguments override config file values.");
    Ok(())
}

/// Write defaults to `path`. Returns false if a file exists and `force` is off.
fn write_default(path: &Path, force: bool) -> Result<bool, CliError> {
    if path.exists() && !force {
        return Ok(false);
    }
    ConfigFile::default().save(path)?;
    Ok(true)
}
