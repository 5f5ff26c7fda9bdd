//! Run phases and the run summary.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

/// Coordinator state machine.
///
/// `Idle → Planning → ExposurePrecompute → (SingleTileDirect | Distributing)
/// → Joined → Mosaicking → Complete`. An exposure-only run goes straight
/// from `ExposurePrecompute` to `Complete`, and the direct path completes
/// without a join or mosaic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RunPhase {
    Idle,
    Planning,
    ExposurePrecompute,
    SingleTileDirect,
    Distributing,
    Joined,
    Mosaicking,
    Complete,
}

impl RunPhase {
    /// Returns true if the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: RunPhase) -> bool {
        use RunPhase::*;
        matches!(
            (self, next),
            (Idle, Planning)
                | (Planning, ExposurePrecompute)
                | (ExposurePrecompute, SingleTileDirect)
                | (ExposurePrecompute, Distributing)
                | (ExposurePrecompute, Complete)
                | (SingleTileDirect, Complete)
                | (Distributing, Joined)
                | (Joined, Mosaicking)
                | (Mosaicking, Complete)
        )
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Planning => "planning",
            RunPhase::ExposurePrecompute => "exposure computation",
            RunPhase::SingleTileDirect => "single-tile run",
            RunPhase::Distributing => "dispatch",
            RunPhase::Joined => "join",
            RunPhase::Mosaicking => "mosaicking",
            RunPhase::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Called when the coordinator enters a phase.
pub type PhaseObserver = dyn Fn(RunPhase) + Send + Sync;

/// Time spent in one phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseTiming {
    pub phase: RunPhase,
    pub seconds: f64,
}

/// Tracks the current phase and how long each one took.
pub(crate) struct PhaseTracker {
    current: RunPhase,
    entered: Instant,
    timings: Vec<PhaseTiming>,
    observer: Option<Arc<PhaseObserver>>,
}

impl PhaseTracker {
    pub(crate) fn new(observer: Option<Arc<PhaseObserver>>) -> Self {
        Self {
            current: RunPhase::Idle,
            entered: Instant::now(),
            timings: Vec::new(),
            observer,
        }
    }

    #[cfg(test)]
    pub(crate) fn current(&self) -> RunPhase {
        self.current
    }

    /// Close the current phase and enter `next`.
    pub(crate) fn enter(&mut self, next: RunPhase) {
        debug_assert!(
            self.current.can_transition_to(next),
            "invalid phase transition {:?} -> {:?}",
            self.current,
            next
        );

        if self.current != RunPhase::Idle {
            self.timings.push(PhaseTiming {
                phase: self.current,
                seconds: self.entered.elapsed().as_secs_f64(),
            });
        }
        self.current = next;
        self.entered = Instant::now();

        if next != RunPhase::Complete {
            info!(phase = %next, "Entering phase");
        }
        if let Some(observer) = &self.observer {
            observer(next);
        }
    }

    pub(crate) fn timings(&self) -> &[PhaseTiming] {
        &self.timings
    }
}

/// How the run executed its tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPath {
    /// Stopped after the exposure pass.
    ExposuresOnly,
    /// One tile, solver run directly on the run prefix.
    Direct,
    /// Tiles dispatched to a worker pool and mosaicked.
    Distributed,
}

/// Where the exposure values came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposureSource {
    /// Given by the user with `--image-exposures-prefix`.
    Supplied,
    /// Reused from a previous run.
    Reused,
    /// Computed by this run's exposure pass.
    Computed,
}

/// Summary of a finished coordinator run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub output_prefix: PathBuf,
    /// DEM size in pixels, `(cols, rows)`.
    pub extent: (i64, i64),
    pub num_tiles_x: u32,
    pub num_tiles_y: u32,
    pub tiles: usize,
    pub exposures: ExposureSource,
    pub path: ExecutionPath,
    /// Pool used for dispatch, if any.
    pub pool: Option<String>,
    pub concurrency: Option<usize>,
    /// Names of tiles known to have failed.
    pub failed_tiles: Vec<String>,
    /// Final rasters written.
    pub outputs: Vec<PathBuf>,
    pub phases: Vec<PhaseTiming>,
    pub elapsed_secs: f64,
}

impl RunReport {
    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.elapsed_secs.max(0.0))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write the summary as pretty JSON.
    pub fn write_json(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(io::Error::other)?;
        fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_distributed_transitions() {
        use RunPhase::*;
        let path = [
            Idle,
            Planning,
            ExposurePrecompute,
            Distributing,
            Joined,
            Mosaicking,
            Complete,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?}", pair);
        }
    }

    #[test]
    fn test_invalid_transitions() {
        use RunPhase::*;
        assert!(!Idle.can_transition_to(Distributing));
        assert!(!Distributing.can_transition_to(Mosaicking));
        assert!(!SingleTileDirect.can_transition_to(Mosaicking));
        assert!(!Complete.can_transition_to(Planning));
    }

    #[test]
    fn test_tracker_records_timings_and_notifies() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer: Arc<PhaseObserver> = Arc::new(move |p: RunPhase| sink.lock().push(p));

        let mut tracker = PhaseTracker::new(Some(observer));
        tracker.enter(RunPhase::Planning);
        tracker.enter(RunPhase::ExposurePrecompute);
        tracker.enter(RunPhase::Complete);

        assert_eq!(tracker.current(), RunPhase::Complete);
        let phases: Vec<RunPhase> = tracker.timings().iter().map(|t| t.phase).collect();
        assert_eq!(phases, vec![RunPhase::Planning, RunPhase::ExposurePrecompute]);
        assert_eq!(
            *seen.lock(),
            vec![
                RunPhase::Planning,
                RunPhase::ExposurePrecompute,
                RunPhase::Complete
            ]
        );
    }

    #[test]
    fn test_report_json() {
        let report = RunReport {
            output_prefix: PathBuf::from("out/run"),
            extent: (1000, 1000),
            num_tiles_x: 4,
            num_tiles_y: 4,
            tiles: 16,
            exposures: ExposureSource::Computed,
            path: ExecutionPath::Distributed,
            pool: Some("local".to_string()),
            concurrency: Some(10),
            failed_tiles: vec![],
            outputs: vec![PathBuf::from("out/run-DEM-final.tif")],
            phases: vec![],
            elapsed_secs: 12.5,
        };
        let json = report.to_json().unwrap();
        assert!(json.contains("\"path\": \"distributed\""));
        assert!(json.contains("\"tiles\": 16"));
        assert_eq!(report.elapsed(), Duration::from_millis(12_500));
    }
}
