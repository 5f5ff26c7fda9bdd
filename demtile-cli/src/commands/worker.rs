//! Worker command: solve one tile. Invoked by the run command, not by users.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use demtile::coordinator::{RunMode, RunOptions, TileWorker, WorkerOutcome};
use demtile::probe::ExternalProbe;
use demtile::process::find_executable;
use demtile::solver::Solver;
use tracing::info;

use super::common::system_runner;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the worker command.
///
/// Flag names match what the coordinator renders for each tile.
#[derive(Debug, Args)]
pub struct WorkerArgs {
    #[arg(long)]
    pub pixel_begin_x: i64,

    #[arg(long)]
    pub pixel_begin_y: i64,

    #[arg(long)]
    pub pixel_end_x: i64,

    #[arg(long)]
    pub pixel_end_y: i64,

    #[arg(long)]
    pub input_dem: PathBuf,

    #[arg(long)]
    pub output_prefix: PathBuf,

    /// Solver executable, resolved by the coordinator
    #[arg(long)]
    pub solver: Option<PathBuf>,

    /// Validity probe executable
    #[arg(long)]
    pub probe: Option<PathBuf>,

    #[arg(long)]
    pub threads: Option<usize>,

    #[arg(long)]
    pub resume: bool,

    #[arg(long)]
    pub suppress_output: bool,

    #[arg(last = true)]
    pub solver_args: Vec<String>,
}

/// Run the worker command, returning the process exit status.
pub fn run(args: WorkerArgs, config_path: Option<PathBuf>, verbose: bool) -> Result<i32, CliError> {
    let runner = CliRunner::new(config_path.as_deref(), verbose, None)?;
    let config = runner.config();

    let bounds = match RunMode::from_pixel_bounds(
        Some(args.pixel_begin_x),
        Some(args.pixel_begin_y),
        Some(args.pixel_end_x),
        Some(args.pixel_end_y),
    ) {
        RunMode::Worker(bounds) => bounds,
        RunMode::Coordinator => {
            return Err(CliError::Usage("worker needs all four pixel bounds".to_string()))
        }
    };

    let solver_program = match args.solver {
        Some(path) => path,
        None => find_executable(&config.programs.solver)?,
    };
    let probe_program = args
        .probe
        .unwrap_or_else(|| PathBuf::from(&config.programs.probe));

    let options = RunOptions::new(args.input_dem, args.output_prefix)
        .with_threads(args.threads)
        .with_resume(args.resume)
        .with_suppress_output(args.suppress_output)
        .with_solver_args(args.solver_args);

    let process = system_runner();
    let worker = TileWorker::new(
        options,
        Solver::new(solver_program, Arc::clone(&process)),
        Arc::new(ExternalProbe::new(probe_program, process)),
    );

    let outcome = worker.run(bounds)?;
    match &outcome {
        WorkerOutcome::OutsideCrop => info!(?bounds, "Tile outside crop window, nothing to do"),
        WorkerOutcome::Resumed => info!(?bounds, "Tile outputs already valid, skipped"),
        WorkerOutcome::Ran { exit_code, log } => {
            info!(?bounds, ?exit_code, log = %log.display(), "Tile finished")
        }
    }
    Ok(outcome.exit_status())
}
