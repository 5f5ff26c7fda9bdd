//! Run configuration and role selection.

use std::fmt;
use std::path::{Path, PathBuf};

use super::concurrency::DEFAULT_OVERSUBSCRIPTION;
use super::toolchain::Toolchain;
use crate::command::CommandSpec;
use crate::config::{DEFAULT_PADDING, DEFAULT_TILE_SIZE};
use crate::grid::PixelBox;

/// Flags of the worker entry point that carry the shared run options.
pub mod worker_flags {
    pub const INPUT_DEM: &str = "--input-dem";
    pub const OUTPUT_PREFIX: &str = "--output-prefix";
    pub const THREADS: &str = "--threads";
    pub const RESUME: &str = "--resume";
    pub const SUPPRESS_OUTPUT: &str = "--suppress-output";
    pub const SOLVER: &str = "--solver";
    pub const PROBE: &str = "--probe";
}

/// Which role this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Plans, dispatches and merges.
    Coordinator,
    /// Runs exactly one tile with these padded bounds, then exits.
    Worker(PixelBox),
}

impl RunMode {
    /// Worker iff all four pixel bounds are present.
    pub fn from_pixel_bounds(
        begin_x: Option<i64>,
        begin_y: Option<i64>,
        end_x: Option<i64>,
        end_y: Option<i64>,
    ) -> Self {
        match (begin_x, begin_y, end_x, end_y) {
            (Some(bx), Some(by), Some(ex), Some(ey)) => {
                RunMode::Worker(PixelBox::new(bx, by, ex, ey))
            }
            _ => RunMode::Coordinator,
        }
    }

    pub fn is_worker(&self) -> bool {
        matches!(self, RunMode::Worker(_))
    }
}

/// What to do when individual tiles fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log failed tiles and carry on to the mosaic.
    #[default]
    Lenient,
    /// Fail the run before mosaicking if any tile failed.
    Strict,
}

/// Which worker pool to dispatch tiles to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PoolChoice {
    /// Distributor when a node list is given, local pool otherwise.
    #[default]
    Auto,
    Local,
    Distributor,
}

impl PoolChoice {
    /// Resolve `Auto` against whether a node list was given.
    pub fn resolve(self, has_nodes_list: bool) -> PoolChoice {
        match self {
            PoolChoice::Auto if has_nodes_list => PoolChoice::Distributor,
            PoolChoice::Auto => PoolChoice::Local,
            other => other,
        }
    }
}

impl fmt::Display for PoolChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolChoice::Auto => write!(f, "auto"),
            PoolChoice::Local => write!(f, "local"),
            PoolChoice::Distributor => write!(f, "distributor"),
        }
    }
}

/// Options of one run, shared by the coordinator and its workers.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub input_dem: PathBuf,
    pub output_prefix: PathBuf,
    pub tile_size: i64,
    pub padding: i64,
    /// Worker processes; `None` means CPUs × oversubscription.
    pub processes: Option<usize>,
    pub nodes_list: Option<PathBuf>,
    /// Threads per solver process.
    pub threads: Option<usize>,
    pub resume: bool,
    /// Keep solver output out of the console; it still goes to the logs.
    pub suppress_output: bool,
    pub failure_policy: FailurePolicy,
    pub pool: PoolChoice,
    pub oversubscription: f64,
    /// Options and inputs handed through to the solver.
    pub solver_args: Vec<String>,
}

impl RunOptions {
    pub fn new(input_dem: impl Into<PathBuf>, output_prefix: impl Into<PathBuf>) -> Self {
        Self {
            input_dem: input_dem.into(),
            output_prefix: output_prefix.into(),
            tile_size: DEFAULT_TILE_SIZE,
            padding: DEFAULT_PADDING,
            processes: None,
            nodes_list: None,
            threads: None,
            resume: false,
            suppress_output: false,
            failure_policy: FailurePolicy::default(),
            pool: PoolChoice::default(),
            oversubscription: DEFAULT_OVERSUBSCRIPTION,
            solver_args: Vec::new(),
        }
    }

    pub fn with_tile_size(mut self, tile_size: i64) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_padding(mut self, padding: i64) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_processes(mut self, processes: Option<usize>) -> Self {
        self.processes = processes;
        self
    }

    pub fn with_nodes_list(mut self, nodes_list: Option<PathBuf>) -> Self {
        self.nodes_list = nodes_list;
        self
    }

    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn with_suppress_output(mut self, suppress: bool) -> Self {
        self.suppress_output = suppress;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_pool(mut self, pool: PoolChoice) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_oversubscription(mut self, factor: f64) -> Self {
        self.oversubscription = factor;
        self
    }

    pub fn with_solver_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.solver_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// The pool actually used by this run.
    pub fn pool_choice(&self) -> PoolChoice {
        self.pool.resolve(self.nodes_list.is_some())
    }

    /// Arguments following the pixel bounds when this run re-invokes itself
    /// as a worker.
    ///
    /// `solver_args` are the pass-through options as rewritten by the
    /// coordinator; they go last, after `--`.
    pub fn worker_args(&self, toolchain: &Toolchain, solver_args: &CommandSpec) -> Vec<String> {
        let path = |p: &Path| p.to_string_lossy().into_owned();

        let mut args = vec![
            worker_flags::INPUT_DEM.to_string(),
            path(&self.input_dem),
            worker_flags::OUTPUT_PREFIX.to_string(),
            path(&self.output_prefix),
            worker_flags::SOLVER.to_string(),
            path(&toolchain.solver),
            worker_flags::PROBE.to_string(),
            path(&toolchain.probe),
        ];
        if let Some(threads) = self.threads {
            args.push(worker_flags::THREADS.to_string());
            args.push(threads.to_string());
        }
        if self.resume {
            args.push(worker_flags::RESUME.to_string());
        }
        if self.suppress_output {
            args.push(worker_flags::SUPPRESS_OUTPUT.to_string());
        }
        args.push("--".to_string());
        args.extend(solver_args.to_args());
        args
    }
}
