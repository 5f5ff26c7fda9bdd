//! Run command: plan, dispatch and mosaic a tiled solve.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use demtile::coordinator::{
    Coordinator, ExecutionPath, FailurePolicy, PoolChoice, RunOptions, RunReport, Toolchain,
};
use demtile::layout::OutputLayout;
use demtile::mosaic::ResultMosaicker;
use demtile::pool::{DistributorPool, LocalPool, WorkerCommand, WorkerPool};
use demtile::probe::ExternalProbe;
use demtile::solver::Solver;
use tracing::info;

use super::common::{resolve_tiling, system_runner, PoolArg};
use crate::error::CliError;
use crate::progress::RunProgress;
use crate::runner::CliRunner;

/// Arguments for the run command.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Input DEM to refine
    #[arg(short = 'i', long)]
    pub input_dem: PathBuf,

    /// Prefix for every output file
    #[arg(short = 'o', long)]
    pub output_prefix: PathBuf,

    /// Tile core edge length in pixels [default: from config, else 300]
    #[arg(long)]
    pub tile_size: Option<i64>,

    /// Pixels added on every side of each tile [default: from config, else 50]
    #[arg(long)]
    pub padding: Option<i64>,

    /// Concurrent tile processes per node
    #[arg(long)]
    pub processes: Option<usize>,

    /// File listing the hosts to run tiles on, one per line
    #[arg(long)]
    pub nodes_list: Option<PathBuf>,

    /// Threads each solver process may use
    #[arg(long)]
    pub threads: Option<usize>,

    /// Skip tiles whose outputs already exist and are valid
    #[arg(long)]
    pub resume: bool,

    /// Keep solver output out of the console (still in the run log)
    #[arg(long)]
    pub suppress_output: bool,

    /// Fail the run before mosaicking if any tile failed
    #[arg(long)]
    pub strict: bool,

    /// Where tiles run
    #[arg(long, value_enum, default_value_t = PoolArg::Auto)]
    pub pool: PoolArg,

    /// Options passed through to the solver, after `--`
    #[arg(last = true)]
    pub solver_args: Vec<String>,
}

impl RunArgs {
    fn to_options(&self, runner: &CliRunner) -> Result<RunOptions, CliError> {
        let config = runner.config();
        let (tile_size, padding) = resolve_tiling(self.tile_size, self.padding, config)?;

        if self.processes == Some(0) {
            return Err(CliError::Usage("--processes must be at least 1".to_string()));
        }

        let policy = if self.strict {
            FailurePolicy::Strict
        } else {
            FailurePolicy::Lenient
        };

        Ok(RunOptions::new(&self.input_dem, &self.output_prefix)
            .with_tile_size(tile_size)
            .with_padding(padding)
            .with_processes(self.processes)
            .with_nodes_list(self.nodes_list.clone())
            .with_threads(self.threads)
            .with_resume(self.resume)
            .with_suppress_output(self.suppress_output)
            .with_failure_policy(policy)
            .with_pool(self.pool.into())
            .with_oversubscription(config.oversubscription)
            .with_solver_args(self.solver_args.iter().cloned()))
    }
}

/// Run the run command.
pub fn run(args: RunArgs, config_path: Option<PathBuf>, verbose: bool) -> Result<(), CliError> {
    let layout = OutputLayout::new(&args.output_prefix);
    let runner = CliRunner::new(
        config_path.as_deref(),
        verbose,
        Some(&layout.run_log_path()),
    )?;
    runner.log_startup("run");

    let options = args.to_options(&runner)?;
    let config = runner.config();
    let toolchain = Toolchain::discover(&config.programs)?;
    let process = system_runner();

    let pool: Box<dyn WorkerPool> = match options.pool_choice() {
        PoolChoice::Distributor => {
            let program = toolchain.require_distributor()?;
            Box::new(DistributorPool::new(program, Arc::clone(&process)))
        }
        _ => Box::new(LocalPool::new(Arc::clone(&process))),
    };

    let self_exe = std::env::current_exe()
        .map_err(|e| CliError::Config(format!("cannot locate the demtile executable: {}", e)))?;
    let worker = WorkerCommand::new(self_exe).with_leading_args(["worker"]);

    let solver = Solver::new(&toolchain.solver, Arc::clone(&process));
    let mosaicker = ResultMosaicker::new(&toolchain.mosaic, Arc::clone(&process))
        .with_weights_exponent(config.weights_exponent);
    let probe = Arc::new(ExternalProbe::new(&toolchain.probe, Arc::clone(&process)));

    println!("Input DEM:     {}", options.input_dem.display());
    println!("Output prefix: {}", options.output_prefix.display());
    println!(
        "Tiling:        {} px tiles, {} px padding",
        options.tile_size, options.padding
    );
    println!();

    let progress = RunProgress::new(options.suppress_output);
    let coordinator = Coordinator::new(options, toolchain, solver, mosaicker, pool, worker)
        .with_probe(probe)
        .with_phase_observer(progress.phase_observer())
        .with_progress(progress.tile_callback());

    let report = coordinator.run()?;
    print_summary(&report, &layout);
    Ok(())
}

fn print_summary(report: &RunReport, layout: &OutputLayout) {
    println!();
    println!(
        "Grid: {} x {} tiles over {} x {} pixels",
        report.num_tiles_x, report.num_tiles_y, report.extent.0, report.extent.1
    );

    match report.path {
        ExecutionPath::ExposuresOnly => {
            println!("Exposures written to {}", layout.exposures_path().display())
        }
        ExecutionPath::Direct => println!("Single tile, solver ran directly"),
        ExecutionPath::Distributed => {
            if let (Some(pool), Some(concurrency)) = (&report.pool, report.concurrency) {
                println!(
                    "Dispatched {} tiles to the {} pool, {} at a time",
                    report.tiles, pool, concurrency
                );
            }
        }
    }

    if !report.failed_tiles.is_empty() {
        println!("Failed tiles ({}):", report.failed_tiles.len());
        for name in &report.failed_tiles {
            println!("  {}", name);
        }
    }

    for output in &report.outputs {
        println!("Wrote {}", output.display());
    }

    for timing in &report.phases {
        println!("  {:<22} {:>8.1}s", timing.phase.to_string(), timing.seconds);
    }
    println!("Finished in {:.1}s", report.elapsed_secs);
    info!(summary = %layout.summary_path().display(), "Run complete");
}
