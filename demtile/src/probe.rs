//! Output validity probe used by resume.
//!
//! A tile whose final raster exists *and* can be opened by an external
//! format checker (by default `gdalinfo`) counts as done. A file left
//! half-written by an interrupted run fails the check and is redone.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::command::CommandLine;
use crate::process::ProcessRunner;

/// Decides whether an output raster is complete and readable.
pub trait ValidityProbe: Send + Sync {
    fn is_valid(&self, path: &Path) -> bool;
}

/// Probe that runs an external format checker on the file.
#[derive(Clone)]
pub struct ExternalProbe {
    program: PathBuf,
    runner: Arc<dyn ProcessRunner>,
}

impl ExternalProbe {
    pub fn new(program: impl Into<PathBuf>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }
}

impl ValidityProbe for ExternalProbe {
    fn is_valid(&self, path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }

        let command = CommandLine::new(&self.program).arg(path.to_string_lossy());
        match self.runner.run(&command) {
            Ok(output) => {
                debug!(path = %path.display(), valid = output.is_success(), "Probed output");
                output.is_success()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Validity probe could not run");
                false
            }
        }
    }
}

/// Probe that only checks the file exists and is non-empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExistenceProbe;

impl ValidityProbe for ExistenceProbe {
    fn is_valid(&self, path: &Path) -> bool {
        path.metadata().map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
    }
}
