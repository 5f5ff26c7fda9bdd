//! In-process worker pool backed by rayon.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, warn};

use super::{DispatchBatch, PoolError, PoolReport, TileOutcome, TileProgressCallback, WorkerPool};
use crate::grid::Tile;
use crate::process::ProcessRunner;

/// Runs worker processes on this machine, `concurrency` at a time.
#[derive(Clone)]
pub struct LocalPool {
    runner: Arc<dyn ProcessRunner>,
}

impl LocalPool {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    fn run_one(&self, batch: &DispatchBatch, tile: &Tile) -> TileOutcome {
        let command = batch.worker.for_tile(&tile.bounds);
        debug!(tile = %tile.name(), "Starting worker");

        match self.runner.run(&command) {
            Ok(output) => {
                if !output.is_success() {
                    warn!(
                        tile = %tile.name(),
                        status = ?output.exit_code,
                        stderr = %output.stderr.trim(),
                        "Worker failed"
                    );
                }
                TileOutcome {
                    tile: tile.clone(),
                    exit_code: output.exit_code,
                    error: None,
                }
            }
            Err(e) => {
                warn!(tile = %tile.name(), error = %e, "Worker could not start");
                TileOutcome {
                    tile: tile.clone(),
                    exit_code: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

impl WorkerPool for LocalPool {
    fn name(&self) -> &'static str {
        "local"
    }

    fn submit(
        &self,
        batch: &DispatchBatch,
        on_progress: Option<Arc<TileProgressCallback>>,
    ) -> Result<PoolReport, PoolError> {
        let total = batch.tiles.len();
        let threads = batch.concurrency.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("demtile-worker-{}", i))
            .build()?;

        debug!(tiles = total, threads, "Dispatching tiles to local pool");

        let finished = AtomicUsize::new(0);
        let outcomes: Vec<TileOutcome> = pool.install(|| {
            batch
                .tiles
                .par_iter()
                .map(|tile| {
                    let outcome = self.run_one(batch, tile);
                    let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(cb) = &on_progress {
                        cb(done, total, &outcome);
                    }
                    outcome
                })
                .collect()
        });

        let all_ok = outcomes.iter().all(TileOutcome::is_success);
        Ok(PoolReport {
            submitted: total,
            outcomes: Some(outcomes),
            exit_code: Some(if all_ok { 0 } else { 1 }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandLine;
    use crate::grid::PixelBox;
    use crate::pool::WorkerCommand;
    use crate::process::{ProcessError, ProcessOutput};
    use parking_lot::Mutex;
    use std::path::PathBuf;

    /// Fails any worker whose begin-x is 100.
    #[derive(Default)]
    struct RecordingRunner {
        seen: Mutex<Vec<CommandLine>>,
    }

    impl ProcessRunner for RecordingRunner {
        fn run(&self, command: &CommandLine) -> Result<ProcessOutput, ProcessError> {
            self.seen.lock().push(command.clone());
            if command.arguments().windows(2).any(|w| w == ["--pixel-begin-x", "100"]) {
                Ok(ProcessOutput::failure(3, "boom"))
            } else {
                Ok(ProcessOutput::success(""))
            }
        }
    }

    fn batch(concurrency: usize) -> DispatchBatch {
        DispatchBatch {
            tiles: (0..4)
                .map(|i| Tile::from_bounds(PixelBox::new(i * 100, 0, i * 100 + 150, 150)))
                .collect(),
            worker: WorkerCommand::new("demtile").with_leading_args(["worker"]),
            table_path: PathBuf::from("run-tile-args.txt"),
            concurrency,
            nodes_list: None,
        }
    }

    #[test]
    fn test_runs_every_tile_and_reports_failures() {
        let runner = Arc::new(RecordingRunner::default());
        let pool = LocalPool::new(runner.clone());

        let report = pool.submit(&batch(2), None).unwrap();
        assert_eq!(report.submitted, 4);
        assert_eq!(runner.seen.lock().len(), 4);

        let failed = report.failed_tiles().unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].bounds.begin_x, 100);
        assert_eq!(report.exit_code, Some(1));
    }

    #[test]
    fn test_outcomes_keep_table_order() {
        let pool = LocalPool::new(Arc::new(RecordingRunner::default()));
        let report = pool.submit(&batch(4), None).unwrap();
        let xs: Vec<i64> = report
            .outcomes
            .unwrap()
            .iter()
            .map(|o| o.tile.bounds.begin_x)
            .collect();
        assert_eq!(xs, vec![0, 100, 200, 300]);
    }

    #[test]
    fn test_progress_callback_counts_up() {
        let pool = LocalPool::new(Arc::new(RecordingRunner::default()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let cb: Arc<TileProgressCallback> =
            Arc::new(move |done: usize, total: usize, _o: &TileOutcome| {
                sink.lock().push((done, total));
            });

        pool.submit(&batch(1), Some(cb)).unwrap();
        let mut seen = seen.lock().clone();
        seen.sort();
        assert_eq!(seen, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
    }
}
