//! Single-tile worker role.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use super::options::RunOptions;
use super::{echo_output, CoordinatorError};
use crate::command::CommandSpec;
use crate::grid::{PixelBox, Tile};
use crate::job::{JobResult, JobSpecBuilder};
use crate::layout::{OutputChannel, OutputLayout};
use crate::probe::ValidityProbe;
use crate::solver::{flags, Solver};

/// What a worker did with its tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// The tile does not intersect the crop window. No work, not a failure.
    OutsideCrop,
    /// A valid output from an earlier run was found.
    Resumed,
    /// The solver ran and its result was logged.
    Ran { exit_code: Option<i32>, log: PathBuf },
}

impl WorkerOutcome {
    pub fn is_success(&self) -> bool {
        match self {
            WorkerOutcome::OutsideCrop | WorkerOutcome::Resumed => true,
            WorkerOutcome::Ran { exit_code, .. } => *exit_code == Some(0),
        }
    }

    /// Status this process should exit with.
    pub fn exit_status(&self) -> i32 {
        match self {
            WorkerOutcome::Ran {
                exit_code: Some(code),
                ..
            } => *code,
            WorkerOutcome::Ran { exit_code: None, .. } => 1,
            _ => 0,
        }
    }
}

/// Runs exactly one tile, then returns.
pub struct TileWorker {
    options: RunOptions,
    solver: Solver,
    probe: Arc<dyn ValidityProbe>,
}

impl TileWorker {
    pub fn new(options: RunOptions, solver: Solver, probe: Arc<dyn ValidityProbe>) -> Self {
        Self {
            options,
            solver,
            probe,
        }
    }

    fn already_done(&self, layout: &OutputLayout, bounds: &PixelBox, pass: &CommandSpec) -> bool {
        let mut channels = vec![OutputChannel::Dem];
        if pass.contains(flags::FLOAT_ALBEDO) {
            channels.push(OutputChannel::Albedo);
        }
        channels
            .into_iter()
            .all(|channel| self.probe.is_valid(&layout.tile_output(bounds, channel)))
    }

    /// Handle the tile with these padded bounds.
    ///
    /// # Errors
    ///
    /// Fails on empty bounds, unparseable solver options, a solver that
    /// cannot be started, or a log that cannot be written. A solver that
    /// runs and exits non-zero is reported in the outcome instead.
    pub fn run(&self, bounds: PixelBox) -> Result<WorkerOutcome, CoordinatorError> {
        if bounds.is_empty() {
            return Err(CoordinatorError::Usage(format!(
                "worker bounds {} are empty",
                bounds
            )));
        }

        let layout = OutputLayout::new(&self.options.output_prefix);
        let pass = CommandSpec::parse(&self.options.solver_args, &flags::solver_arity_table())
            .map_err(|e| CoordinatorError::Usage(e.to_string()))?;

        let builder = JobSpecBuilder::new(&self.options.input_dem, layout.clone(), pass)
            .map_err(|e| CoordinatorError::Usage(e.to_string()))?
            .with_threads(self.options.threads);

        let tile = Tile::from_bounds(bounds);
        let Some(job) = builder.build(&tile) else {
            info!(tile = %tile.name(), "Tile outside crop window, nothing to do");
            return Ok(WorkerOutcome::OutsideCrop);
        };

        if self.options.resume && self.already_done(&layout, &bounds, builder.pass_through()) {
            info!(tile = %tile.name(), "Valid output exists, skipping");
            return Ok(WorkerOutcome::Resumed);
        }

        info!(tile = %tile.name(), window = %job.window, "Running solver");
        let started = Instant::now();
        let (command, output) = self
            .solver
            .run(&job.args)
            .map_err(CoordinatorError::Solver)?;

        let log = layout.tile_log(&bounds);
        let result = JobResult {
            command,
            output,
            elapsed: started.elapsed(),
        };
        result.write_to(&log).map_err(|source| CoordinatorError::Io {
            path: log.clone(),
            source,
        })?;

        echo_output(&result.output, self.options.suppress_output);
        info!(
            tile = %tile.name(),
            status = ?result.output.exit_code,
            elapsed_secs = result.elapsed.as_secs_f64(),
            "Tile finished"
        );

        Ok(WorkerOutcome::Ran {
            exit_code: result.output.exit_code,
            log,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_status() {
        assert!(WorkerOutcome::OutsideCrop.is_success());
        assert!(WorkerOutcome::Resumed.is_success());
        assert_eq!(WorkerOutcome::Resumed.exit_status(), 0);

        let failed = WorkerOutcome::Ran {
            exit_code: Some(4),
            log: PathBuf::from("x"),
        };
        assert!(!failed.is_success());
        assert_eq!(failed.exit_status(), 4);

        let killed = WorkerOutcome::Ran {
            exit_code: None,
            log: PathBuf::from("x"),
        };
        assert_eq!(killed.exit_status(), 1);
    }
}
