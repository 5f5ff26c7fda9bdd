//! Worker pools that run per-tile worker processes.
//!
//! A pool receives a [`DispatchBatch`] (every tile of the grid, the worker
//! command to start for each one, and a concurrency bound) and blocks until
//! all workers have finished.
//!
//! - [`LocalPool`] runs workers on this machine with a rayon thread pool and
//!   sees every worker's exit status.
//! - [`DistributorPool`] hands the tile table to GNU `parallel`, optionally
//!   fanning out over the hosts in a node-list file. Per-tile statuses are
//!   not visible through it; they are recovered from the tile logs.

mod distributor;
mod local;
mod table;
mod worker;

pub use distributor::DistributorPool;
pub use local::LocalPool;
pub use table::{read_table, render_table, write_table};
pub use worker::{WorkerCommand, PIXEL_BEGIN_X, PIXEL_BEGIN_Y, PIXEL_END_X, PIXEL_END_Y};

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::grid::Tile;
use crate::process::ProcessError;

/// Errors raised when a batch cannot be dispatched.
///
/// Individual workers failing is not an error at this layer; see
/// [`PoolReport`].
#[derive(Debug, Error)]
pub enum PoolError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("failed to build local worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Everything a pool needs to run one round of tiles.
#[derive(Debug, Clone)]
pub struct DispatchBatch {
    /// Tiles in table order.
    pub tiles: Vec<Tile>,
    /// Command used to start one worker.
    pub worker: WorkerCommand,
    /// Tile-argument table, already written.
    pub table_path: PathBuf,
    /// Maximum workers running at once.
    pub concurrency: usize,
    /// Hosts to spread workers over, one per line.
    pub nodes_list: Option<PathBuf>,
}

/// Exit status of one worker process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileOutcome {
    pub tile: Tile,
    /// `None` if the worker was killed by a signal or never started.
    pub exit_code: Option<i32>,
    /// Start failure, if any.
    pub error: Option<String>,
}

impl TileOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.exit_code == Some(0)
    }
}

/// What a pool learned about a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolReport {
    /// Number of workers dispatched.
    pub submitted: usize,
    /// Per-tile statuses, when the pool can observe them.
    pub outcomes: Option<Vec<TileOutcome>>,
    /// Exit status of the pool itself (the distributor process).
    pub exit_code: Option<i32>,
}

impl PoolReport {
    /// Tiles whose worker failed, if per-tile statuses are known.
    pub fn failed_tiles(&self) -> Option<Vec<&Tile>> {
        self.outcomes.as_ref().map(|outcomes| {
            outcomes
                .iter()
                .filter(|o| !o.is_success())
                .map(|o| &o.tile)
                .collect()
        })
    }
}

/// Called after each worker finishes: `(finished, total, outcome)`.
pub type TileProgressCallback = dyn Fn(usize, usize, &TileOutcome) + Send + Sync;

/// A way of running a batch of worker processes.
pub trait WorkerPool: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Run every tile of the batch, blocking until all workers have exited.
    ///
    /// # Errors
    ///
    /// Returns an error only if the batch could not be dispatched at all.
    fn submit(
        &self,
        batch: &DispatchBatch,
        on_progress: Option<Arc<TileProgressCallback>>,
    ) -> Result<PoolReport, PoolError>;
}
