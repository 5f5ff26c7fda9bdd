//! The external shape-from-shading solver.
//!
//! The solver is an opaque program. This module knows three ways to call it:
//!
//! - **Report mode** (`--query`): print the input DEM size and exit.
//! - **Exposure mode** (`--compute-exposures-only`): the global calibration
//!   pre-pass that must finish before any tile starts.
//! - **Normal mode**: refine the DEM, optionally restricted with `--crop-win`.

pub mod flags;
mod report;

pub use report::{parse_dimensions, parse_key_values};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::command::{CommandLine, CommandSpec};
use crate::process::{ProcessError, ProcessOutput, ProcessRunner};

/// Errors raised while talking to the solver.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("dimension query exited with status {status:?}: {stderr}")]
    QueryFailed { status: Option<i32>, stderr: String },

    #[error("could not read DEM dimensions from solver output: {0:?}")]
    MalformedReport(String),
}

/// Handle to the solver executable.
#[derive(Clone)]
pub struct Solver {
    program: PathBuf,
    runner: Arc<dyn ProcessRunner>,
}

impl std::fmt::Debug for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("program", &self.program)
            .finish()
    }
}

impl Solver {
    /// Create a solver handle for the given executable.
    pub fn new(program: impl Into<PathBuf>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    /// Path of the solver executable.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Ask the solver for the pixel dimensions of `input_dem`.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::QueryFailed`] if the solver exits non-zero and
    /// [`SolverError::MalformedReport`] if its output has no usable size.
    pub fn query_dimensions(&self, input_dem: &Path) -> Result<(i64, i64), SolverError> {
        let command = CommandLine::new(&self.program)
            .arg(flags::QUERY)
            .arg("-i")
            .arg(input_dem.to_string_lossy());

        debug!(command = %command, "Querying DEM dimensions");
        let output = self.runner.run(&command)?;

        if !output.is_success() {
            return Err(SolverError::QueryFailed {
                status: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        let dims = parse_dimensions(&output.stdout)
            .filter(|(cols, rows)| *cols > 0 && *rows > 0)
            .ok_or_else(|| SolverError::MalformedReport(output.stdout.clone()))?;

        info!(cols = dims.0, rows = dims.1, "DEM dimensions");
        Ok(dims)
    }

    /// Build the command line for a solver run with the given arguments.
    pub fn command_line(&self, args: &CommandSpec) -> CommandLine {
        CommandLine::from_spec(&self.program, args)
    }

    /// Run the solver with fully materialized arguments.
    pub fn run(&self, args: &CommandSpec) -> Result<(CommandLine, ProcessOutput), SolverError> {
        let command = self.command_line(args);
        let output = self.runner.run(&command)?;
        Ok((command, output))
    }
}

/// Arguments for the exposure-only pre-pass derived from the full run arguments.
pub fn exposure_pass_args(base: &CommandSpec) -> CommandSpec {
    let mut args = base.clone();
    if !args.contains(flags::COMPUTE_EXPOSURES_ONLY) {
        args.push_switch(flags::COMPUTE_EXPOSURES_ONLY);
    }
    args
}
