//! Run coordination.
//!
//! The [`Coordinator`] drives one run through its phases:
//!
//! 1. **Planning**: ask the solver for the DEM size and cut the tile grid.
//! 2. **Exposure precompute**: one whole-problem solver pass that writes the
//!    per-image exposures, unless they were supplied or can be reused. No
//!    tile starts before it finishes.
//! 3. **Single-tile direct** (grid of one tile): run the solver once on the
//!    run prefix, no table, no pool.
//! 4. **Distributing**: write the tile table, bound the concurrency and hand
//!    every tile to a [`WorkerPool`]. Blocks until all workers exit.
//! 5. **Mosaicking**: merge the per-tile outputs of each requested channel.
//!
//! Each worker is this program re-invoked for one tile; see [`TileWorker`].

mod concurrency;
mod options;
mod phase;
mod toolchain;
mod worker;

pub use concurrency::{
    bound_concurrency, cpus_per_node, default_concurrency, DEFAULT_OVERSUBSCRIPTION,
};
pub use options::{worker_flags, FailurePolicy, PoolChoice, RunMode, RunOptions};
pub use phase::{ExecutionPath, ExposureSource, PhaseObserver, PhaseTiming, RunPhase, RunReport};
pub use toolchain::Toolchain;
pub use worker::{TileWorker, WorkerOutcome};

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::command::CommandSpec;
use crate::grid::{plan_grid, GridError, Tile, TileGrid};
use crate::job::{read_logged_status, JobResult, JobSpecBuilder, LoggedStatus};
use crate::layout::{OutputChannel, OutputLayout};
use crate::mosaic::{MosaicError, ResultMosaicker};
use crate::pool::{
    write_table, DispatchBatch, PoolError, PoolReport, TileProgressCallback, WorkerCommand,
    WorkerPool,
};
use crate::probe::{ExistenceProbe, ValidityProbe};
use crate::process::{DiscoveryError, ProcessOutput};
use crate::solver::{exposure_pass_args, flags, Solver, SolverError};

use phase::PhaseTracker;

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Bad or missing arguments.
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("could not determine DEM dimensions: {0}")]
    DimensionQuery(#[source] SolverError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("solver could not be run: {0}")]
    Solver(#[source] SolverError),

    #[error("exposure pass exited with status {status:?}, see {}", log.display())]
    ExposureFailed { status: Option<i32>, log: PathBuf },

    #[error(transparent)]
    Dispatch(#[from] PoolError),

    #[error("{} tile(s) failed: {}", .0.len(), .0.join(", "))]
    TilesFailed(Vec<String>),

    /// The pool failed without pinning the failure on any tile.
    #[error("worker pool exited with status {status:?}")]
    PoolFailed { status: Option<i32> },

    #[error(transparent)]
    Mosaic(#[from] MosaicError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CoordinatorError {
    pub fn is_usage(&self) -> bool {
        matches!(self, CoordinatorError::Usage(_))
    }
}

/// Forward solver output to the log at `info`, or `debug` when suppressed.
pub(crate) fn echo_output(output: &ProcessOutput, suppress: bool) {
    for line in output.stdout.lines().chain(output.stderr.lines()) {
        if suppress {
            tracing::debug!(target: "solver", "{}", line);
        } else {
            tracing::info!(target: "solver", "{}", line);
        }
    }
}

/// Drives one coordinator run.
pub struct Coordinator {
    options: RunOptions,
    toolchain: Toolchain,
    solver: Solver,
    mosaicker: ResultMosaicker,
    pool: Box<dyn WorkerPool>,
    worker: WorkerCommand,
    probe: Arc<dyn ValidityProbe>,
    cpus: usize,
    on_phase: Option<Arc<PhaseObserver>>,
    on_progress: Option<Arc<TileProgressCallback>>,
}

impl Coordinator {
    /// Create a coordinator.
    ///
    /// `worker` starts a worker process; the shared run options are appended
    /// to it for each tile.
    pub fn new(
        options: RunOptions,
        toolchain: Toolchain,
        solver: Solver,
        mosaicker: ResultMosaicker,
        pool: Box<dyn WorkerPool>,
        worker: WorkerCommand,
    ) -> Self {
        Self {
            options,
            toolchain,
            solver,
            mosaicker,
            pool,
            worker,
            probe: Arc::new(ExistenceProbe),
            cpus: cpus_per_node(),
            on_phase: None,
            on_progress: None,
        }
    }

    /// Probe used to decide whether a resumed single-tile run is done.
    pub fn with_probe(mut self, probe: Arc<dyn ValidityProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Override the CPU count used for the default concurrency.
    pub fn with_cpus_per_node(mut self, cpus: usize) -> Self {
        self.cpus = cpus.max(1);
        self
    }

    pub fn with_phase_observer(mut self, observer: Arc<PhaseObserver>) -> Self {
        self.on_phase = Some(observer);
        self
    }

    pub fn with_progress(mut self, callback: Arc<TileProgressCallback>) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    fn layout(&self) -> OutputLayout {
        OutputLayout::new(&self.options.output_prefix)
    }

    /// Parse and check the pass-through solver options.
    fn pass_through(&self) -> Result<CommandSpec, CoordinatorError> {
        let pass = CommandSpec::parse(&self.options.solver_args, &flags::solver_arity_table())
            .map_err(|e| CoordinatorError::Usage(e.to_string()))?;

        if pass.contains(flags::CROP_WIN) {
            return Err(CoordinatorError::Usage(format!(
                "{} is not allowed here; run the solver directly to process a sub-window",
                flags::CROP_WIN
            )));
        }
        if self.options.input_dem.as_os_str().is_empty() {
            return Err(CoordinatorError::Usage("no input DEM given".to_string()));
        }
        // Options missing from the arity table leave their values behind as
        // positionals; a bare number is one of those, never an image or camera
        if !pass.positionals().any(|p| p.parse::<f64>().is_err()) {
            return Err(CoordinatorError::Usage(
                "no input images or cameras given (numbers are not counted as inputs)"
                    .to_string(),
            ));
        }

        // Drop the options this program manages itself, once, up front
        Ok(self.job_builder(&self.layout(), &pass)?.pass_through().clone())
    }

    fn job_builder(
        &self,
        layout: &OutputLayout,
        pass: &CommandSpec,
    ) -> Result<JobSpecBuilder, CoordinatorError> {
        Ok(
            JobSpecBuilder::new(&self.options.input_dem, layout.clone(), pass.clone())
                .map_err(|e| CoordinatorError::Usage(e.to_string()))?
                .with_threads(self.options.threads),
        )
    }

    fn run_logged(&self, args: &CommandSpec, log: PathBuf) -> Result<JobResult, CoordinatorError> {
        let started = Instant::now();
        let (command, output) = self.solver.run(args).map_err(CoordinatorError::Solver)?;
        let result = JobResult {
            command,
            output,
            elapsed: started.elapsed(),
        };
        result
            .write_to(&log)
            .map_err(|source| CoordinatorError::Io { path: log, source })?;
        echo_output(&result.output, self.options.suppress_output);
        Ok(result)
    }

    /// Run the exposure pass if needed and point the tiles at its output.
    fn precompute_exposures(
        &self,
        layout: &OutputLayout,
        pass: &mut CommandSpec,
    ) -> Result<ExposureSource, CoordinatorError> {
        if pass.contains(flags::IMAGE_EXPOSURES_PREFIX) {
            info!("Using supplied image exposures");
            return Ok(ExposureSource::Supplied);
        }

        let exposures = layout.exposures_path();
        let source = if self.options.resume && exposures.is_file() {
            info!(path = %exposures.display(), "Reusing exposures from earlier run");
            ExposureSource::Reused
        } else {
            let args = exposure_pass_args(&self.job_builder(layout, pass)?.build_global_args());
            let log = layout.exposures_log();
            let result = self.run_logged(&args, log.clone())?;
            if !result.output.is_success() {
                return Err(CoordinatorError::ExposureFailed {
                    status: result.output.exit_code,
                    log,
                });
            }
            info!(path = %exposures.display(), "Computed exposures");
            ExposureSource::Computed
        };

        pass.push_flag(
            flags::IMAGE_EXPOSURES_PREFIX,
            [layout.prefix().to_string_lossy()],
        );
        Ok(source)
    }

    fn requested_channels(pass: &CommandSpec) -> Vec<OutputChannel> {
        let mut channels = vec![OutputChannel::Dem];
        if pass.contains(flags::FLOAT_ALBEDO) {
            channels.push(OutputChannel::Albedo);
        }
        channels
    }

    /// Tiles that failed, by pool report or else by their logs.
    ///
    /// A tile without a log counts as done only if its output exists, which
    /// is the case for tiles a resumed worker skipped.
    fn failed_tiles(
        &self,
        layout: &OutputLayout,
        grid: &TileGrid,
        report: &PoolReport,
    ) -> Vec<String> {
        if let Some(failed) = report.failed_tiles() {
            return failed.into_iter().map(Tile::name).collect();
        }

        grid.tiles()
            .iter()
            .filter(|tile| {
                match read_logged_status(&layout.tile_log(&tile.bounds)) {
                    status if status.is_success() => false,
                    LoggedStatus::Missing => !layout
                        .tile_output(&tile.bounds, OutputChannel::Dem)
                        .is_file(),
                    _ => true,
                }
            })
            .map(Tile::name)
            .collect()
    }

    /// Execute the run.
    pub fn run(&self) -> Result<RunReport, CoordinatorError> {
        let started = Instant::now();
        let layout = self.layout();
        let mut tracker = PhaseTracker::new(self.on_phase.clone());

        let mut pass = self.pass_through()?;

        tracker.enter(RunPhase::Planning);
        let extent = self
            .solver
            .query_dimensions(&self.options.input_dem)
            .map_err(CoordinatorError::DimensionQuery)?;
        let grid = plan_grid(extent.0, extent.1, self.options.tile_size, self.options.padding)?;
        info!(
            cols = extent.0,
            rows = extent.1,
            tiles_x = grid.num_tiles_x(),
            tiles_y = grid.num_tiles_y(),
            tile_size = self.options.tile_size,
            padding = self.options.padding,
            "Planned tile grid"
        );

        let mut report = RunReport {
            output_prefix: layout.prefix().to_path_buf(),
            extent,
            num_tiles_x: grid.num_tiles_x(),
            num_tiles_y: grid.num_tiles_y(),
            tiles: grid.len(),
            exposures: ExposureSource::Supplied,
            path: ExecutionPath::Distributed,
            pool: None,
            concurrency: None,
            failed_tiles: Vec::new(),
            outputs: Vec::new(),
            phases: Vec::new(),
            elapsed_secs: 0.0,
        };

        tracker.enter(RunPhase::ExposurePrecompute);
        report.exposures = self.precompute_exposures(&layout, &mut pass)?;

        if pass.contains(flags::COMPUTE_EXPOSURES_ONLY) {
            info!("Exposure-only run, stopping before tiling");
            report.path = ExecutionPath::ExposuresOnly;
            report.outputs.push(layout.exposures_path());
        } else if grid.is_single_tile() {
            tracker.enter(RunPhase::SingleTileDirect);
            report.path = ExecutionPath::Direct;
            self.run_direct(&layout, &grid, &pass, &mut report)?;
        } else {
            tracker.enter(RunPhase::Distributing);
            let pool_report = self.distribute(&layout, &grid, &pass, &mut report)?;

            tracker.enter(RunPhase::Joined);
            report.failed_tiles = self.failed_tiles(&layout, &grid, &pool_report);
            let pool_ok = pool_report.exit_code == Some(0);
            match self.options.failure_policy {
                FailurePolicy::Strict if !report.failed_tiles.is_empty() => {
                    return Err(CoordinatorError::TilesFailed(report.failed_tiles));
                }
                FailurePolicy::Strict if !pool_ok => {
                    return Err(CoordinatorError::PoolFailed {
                        status: pool_report.exit_code,
                    });
                }
                _ => {
                    for name in &report.failed_tiles {
                        warn!(tile = %name, "Tile failed, see its log");
                    }
                    if !pool_ok {
                        warn!(status = ?pool_report.exit_code, "Worker pool reported failures");
                    }
                }
            }

            tracker.enter(RunPhase::Mosaicking);
            for channel in Self::requested_channels(&pass) {
                report
                    .outputs
                    .push(self.mosaicker.merge(&grid, &layout, channel)?);
            }
        }

        tracker.enter(RunPhase::Complete);
        report.phases = tracker.timings().to_vec();
        report.elapsed_secs = started.elapsed().as_secs_f64();

        let summary = layout.summary_path();
        if let Err(e) = report.write_json(&summary) {
            warn!(path = %summary.display(), error = %e, "Could not write run summary");
        }

        info!(elapsed_secs = report.elapsed_secs, "Run complete");
        Ok(report)
    }

    fn run_direct(
        &self,
        layout: &OutputLayout,
        grid: &TileGrid,
        pass: &CommandSpec,
        report: &mut RunReport,
    ) -> Result<(), CoordinatorError> {
        let channels = Self::requested_channels(pass);
        let outputs: Vec<PathBuf> = channels.iter().map(|c| layout.final_output(*c)).collect();

        if self.options.resume && outputs.iter().all(|p| self.probe.is_valid(p)) {
            info!("Outputs exist, skipping single-tile run");
            report.outputs = outputs;
            return Ok(());
        }

        let builder = self.job_builder(layout, pass)?;
        let Some(tile) = grid.tiles().first() else {
            return Err(CoordinatorError::Usage("empty tile grid".to_string()));
        };
        let job = builder.build_direct(tile);

        info!(tile = %tile.name(), "Single tile, running solver directly");
        let result = self.run_logged(&job.args, layout.run_command_log())?;
        if !result.output.is_success() {
            report.failed_tiles.push(tile.name());
            match self.options.failure_policy {
                FailurePolicy::Strict => {
                    return Err(CoordinatorError::TilesFailed(report.failed_tiles.clone()));
                }
                FailurePolicy::Lenient => {
                    warn!(status = ?result.output.exit_code, "Solver failed, see its log");
                }
            }
        }

        report.outputs = outputs;
        Ok(())
    }

    /// Remove tile logs and outputs left by an earlier run.
    ///
    /// Without this a tile that never ran this time would be judged by its
    /// previous result. Resumed runs keep them, since skipping valid tiles
    /// is the point.
    fn clear_stale_tiles(
        &self,
        layout: &OutputLayout,
        grid: &TileGrid,
        channels: &[OutputChannel],
    ) -> Result<(), CoordinatorError> {
        for tile in grid.tiles() {
            let stale = channels
                .iter()
                .map(|c| layout.tile_output(&tile.bounds, *c))
                .chain(std::iter::once(layout.tile_log(&tile.bounds)));
            for path in stale {
                match fs::remove_file(&path) {
                    Ok(()) => debug!(path = %path.display(), "Removed stale tile file"),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(source) => return Err(CoordinatorError::Io { path, source }),
                }
            }
        }
        Ok(())
    }

    fn distribute(
        &self,
        layout: &OutputLayout,
        grid: &TileGrid,
        pass: &CommandSpec,
        report: &mut RunReport,
    ) -> Result<PoolReport, CoordinatorError> {
        if !self.options.resume {
            self.clear_stale_tiles(layout, grid, &Self::requested_channels(pass))?;
        }

        let table_path = layout.table_path();
        write_table(&table_path, grid.tiles().iter().map(|t| &t.bounds)).map_err(|source| {
            CoordinatorError::Io {
                path: table_path.clone(),
                source,
            }
        })?;

        let default = default_concurrency(self.cpus, self.options.oversubscription);
        let concurrency = bound_concurrency(self.options.processes, default, grid.len());

        let worker = self
            .worker
            .clone()
            .with_trailing_args(self.options.worker_args(&self.toolchain, pass));

        let batch = DispatchBatch {
            tiles: grid.tiles().to_vec(),
            worker,
            table_path,
            concurrency,
            nodes_list: self.options.nodes_list.clone(),
        };

        info!(
            tiles = batch.tiles.len(),
            concurrency,
            pool = self.pool.name(),
            "Dispatching tiles"
        );
        report.pool = Some(self.pool.name().to_string());
        report.concurrency = Some(concurrency);

        Ok(self.pool.submit(&batch, self.on_progress.clone())?)
    }
}
