//! External process execution.
//!
//! Every external collaborator (solver, distributor, mosaic tool, validity
//! probe, and this program re-invoked as a worker) is run through the
//! [`ProcessRunner`] trait. Production code uses [`SystemRunner`]; tests
//! substitute a recording fake.

mod discovery;

pub use discovery::{find_executable, DiscoveryError};

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::command::CommandLine;

/// Errors raised when a process cannot be started at all.
///
/// A process that starts and exits non-zero is not an error at this layer;
/// its status is reported in [`ProcessOutput`].
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Output of a process that exited with status 0.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Output of a process that exited with the given status.
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns true if the process exited with status 0.
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs external commands to completion.
pub trait ProcessRunner: Send + Sync {
    /// Run a command, blocking until it exits, and capture its output.
    fn run(&self, command: &CommandLine) -> Result<ProcessOutput, ProcessError>;
}

/// Runs commands as real operating-system processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, command: &CommandLine) -> Result<ProcessOutput, ProcessError> {
        debug!(command = %command, "Running process");

        let output = command
            .to_command()
            .output()
            .map_err(|source| ProcessError::Spawn {
                program: command.program().to_path_buf(),
                source,
            })?;

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_output_success() {
        let out = ProcessOutput::success("ok");
        assert!(out.is_success());
        assert_eq!(out.stdout, "ok");
    }

    #[test]
    fn test_process_output_failure() {
        let out = ProcessOutput::failure(3, "bad");
        assert!(!out.is_success());
        assert_eq!(out.exit_code, Some(3));
    }

    #[test]
    fn test_signal_is_not_success() {
        let out = ProcessOutput {
            exit_code: None,
            ..Default::default()
        };
        assert!(!out.is_success());
    }

    #[test]
    fn test_spawn_missing_program_is_error() {
        let runner = SystemRunner::new();
        let result = runner.run(&CommandLine::new("/nonexistent/demtile-test-program"));
        assert!(matches!(result, Err(ProcessError::Spawn { .. })));
    }
}
