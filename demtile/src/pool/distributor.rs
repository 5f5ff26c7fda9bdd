//! Worker pool that delegates to GNU `parallel`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{DispatchBatch, PoolError, PoolReport, TileProgressCallback, WorkerPool};
use crate::command::CommandLine;
use crate::process::ProcessRunner;

/// Runs one worker per table row through a parallel job distributor.
///
/// The distributor reads the tile table with a tab column separator and
/// substitutes the four columns into the worker template's `{1}`..`{4}`.
/// With a node list it spreads jobs over those hosts, each starting in the
/// same working directory. The template is passed with `-q`, so each token
/// reaches the worker as one argument even when it holds spaces or shell
/// metacharacters.
#[derive(Clone)]
pub struct DistributorPool {
    program: PathBuf,
    runner: Arc<dyn ProcessRunner>,
}

impl DistributorPool {
    pub fn new(program: impl Into<PathBuf>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The distributor invocation for a batch.
    pub fn command_line(&self, batch: &DispatchBatch) -> CommandLine {
        let mut line = CommandLine::new(&self.program)
            .arg("--will-cite")
            .args(["--colsep", "\t"])
            .args(["-j".to_string(), batch.concurrency.max(1).to_string()])
            .arg("-q");

        if let Some(nodes) = &batch.nodes_list {
            line = line
                .arg("--sshloginfile")
                .arg(nodes.to_string_lossy())
                .args(["--workdir", "."]);
        }

        let template = batch.worker.template();
        line.arg("-a")
            .arg(batch.table_path.to_string_lossy())
            .arg(template.program().to_string_lossy())
            .args(template.arguments().iter().cloned())
    }
}

impl WorkerPool for DistributorPool {
    fn name(&self) -> &'static str {
        "distributor"
    }

    fn submit(
        &self,
        batch: &DispatchBatch,
        _on_progress: Option<Arc<TileProgressCallback>>,
    ) -> Result<PoolReport, PoolError> {
        let command = self.command_line(batch);
        info!(
            tiles = batch.tiles.len(),
            jobs = batch.concurrency,
            nodes = ?batch.nodes_list,
            "Dispatching tiles to distributor"
        );
        debug!(command = %command, "Distributor command");

        let output = self.runner.run(&command)?;
        if !output.is_success() {
            // GNU parallel exits with the number of failed jobs
            warn!(
                status = ?output.exit_code,
                stderr = %output.stderr.trim(),
                "Distributor reported failed jobs"
            );
        }

        Ok(PoolReport {
            submitted: batch.tiles.len(),
            outcomes: None,
            exit_code: output.exit_code,
        })
    }
}
