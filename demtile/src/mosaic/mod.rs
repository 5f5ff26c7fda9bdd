//! Weighted-blend merge of per-tile outputs.
//!
//! After the join, every tile's output for a channel is handed to an
//! external mosaic tool in one invocation. Overlapping padded regions are
//! blended with weights that fall off with distance from each tile's
//! centerline. The tool names its result `<prefix>-tile-0.tif`; that file is
//! then renamed to the channel's final name.
//!
//! Missing per-tile files are not checked up front. They surface as the
//! tool's own failure.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::command::CommandLine;
use crate::grid::TileGrid;
use crate::layout::{OutputChannel, OutputLayout};
use crate::process::{ProcessError, ProcessRunner};

/// Default exponent of the centerline-distance weighting.
pub const DEFAULT_WEIGHTS_EXPONENT: u32 = 2;

/// Errors raised while merging tile outputs.
#[derive(Debug, Error)]
pub enum MosaicError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("mosaic of {channel} outputs exited with status {status:?}: {stderr}")]
    ToolFailed {
        channel: OutputChannel,
        status: Option<i32>,
        stderr: String,
    },

    #[error("failed to rename {} to {}: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Merges per-tile rasters into the run's final outputs.
#[derive(Clone)]
pub struct ResultMosaicker {
    program: PathBuf,
    weights_exponent: u32,
    runner: Arc<dyn ProcessRunner>,
}

impl std::fmt::Debug for ResultMosaicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultMosaicker")
            .field("program", &self.program)
            .field("weights_exponent", &self.weights_exponent)
            .finish()
    }
}

impl ResultMosaicker {
    pub fn new(program: impl Into<PathBuf>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            program: program.into(),
            weights_exponent: DEFAULT_WEIGHTS_EXPONENT,
            runner,
        }
    }

    pub fn with_weights_exponent(mut self, exponent: u32) -> Self {
        self.weights_exponent = exponent;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Expected per-tile inputs for a channel, in grid order.
    pub fn inputs(grid: &TileGrid, layout: &OutputLayout, channel: OutputChannel) -> Vec<PathBuf> {
        grid.tiles()
            .iter()
            .map(|tile| layout.tile_output(&tile.bounds, channel))
            .collect()
    }

    /// The merge invocation for a list of inputs.
    pub fn command_line(&self, inputs: &[PathBuf], layout: &OutputLayout) -> CommandLine {
        CommandLine::new(&self.program)
            .arg("--weights-exponent")
            .arg(self.weights_exponent.to_string())
            .args(inputs.iter().map(|p| p.to_string_lossy().into_owned()))
            .arg("-o")
            .arg(layout.prefix().to_string_lossy())
    }

    /// Merge one channel and move the result to its final name.
    ///
    /// Returns the final output path.
    pub fn merge(
        &self,
        grid: &TileGrid,
        layout: &OutputLayout,
        channel: OutputChannel,
    ) -> Result<PathBuf, MosaicError> {
        let inputs = Self::inputs(grid, layout, channel);
        let command = self.command_line(&inputs, layout);
        info!(%channel, tiles = inputs.len(), "Mosaicking tile outputs");
        debug!(command = %command, "Mosaic command");

        let output = self.runner.run(&command)?;
        if !output.is_success() {
            return Err(MosaicError::ToolFailed {
                channel,
                status: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        let from = layout.mosaic_default_output();
        let to = layout.final_output(channel);
        fs::rename(&from, &to).map_err(|source| MosaicError::Rename {
            from: from.clone(),
            to: to.clone(),
            source,
        })?;

        info!(%channel, output = %to.display(), "Wrote mosaic");
        Ok(to)
    }
}
