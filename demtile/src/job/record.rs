//! Per-tile command logs.
//!
//! Each solver run leaves `<prefix>-cmd-log.txt` behind, holding the exact
//! command line, the captured streams, and the exit status on its last line:
//!
//! ```text
//! Command: sfs -i dem.tif -o out/run-350_350_0_0/run --crop-win 0 0 350 350 ...
//! Finished: 2026-10-19T12:00:00+00:00
//! Elapsed: 812.4s
//! Stdout:
//! ...
//! Stderr:
//! ...
//! Exit status: 0
//! ```
//!
//! The exit status line is what strict-mode aggregation reads back after an
//! external distributor has run the tiles.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::command::CommandLine;
use crate::process::ProcessOutput;

/// Outcome of one solver run, as recorded in its log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub command: CommandLine,
    pub output: ProcessOutput,
    pub elapsed: Duration,
}

impl JobResult {
    /// Render the log file contents.
    pub fn render(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "Command: {}", self.command);
        let _ = writeln!(text, "Finished: {}", chrono::Local::now().to_rfc3339());
        let _ = writeln!(text, "Elapsed: {:.1}s", self.elapsed.as_secs_f64());
        let _ = writeln!(text, "Stdout:");
        push_block(&mut text, &self.output.stdout);
        let _ = writeln!(text, "Stderr:");
        push_block(&mut text, &self.output.stderr);
        let _ = writeln!(text, "Exit status: {}", format_status(self.output.exit_code));
        text
    }

    /// Write the log, creating parent directories as needed.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.render())
    }
}

fn push_block(text: &mut String, block: &str) {
    text.push_str(block);
    if !block.is_empty() && !block.ends_with('\n') {
        text.push('\n');
    }
}

fn format_status(code: Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string())
}

fn status_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^Exit status: (-?\d+|signal)\s*$").unwrap())
}

/// Exit status recorded in a log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggedStatus {
    /// The log exists and records this status (`None` = killed by a signal).
    Exited(Option<i32>),
    /// No log, or a log without a status line (the run never finished).
    Missing,
}

impl LoggedStatus {
    /// Returns true for a recorded exit status of 0.
    pub fn is_success(&self) -> bool {
        matches!(self, LoggedStatus::Exited(Some(0)))
    }
}

/// Read the exit status back from a log file.
///
/// The last status line wins, so a log appended to by a rerun reports the
/// latest result.
pub fn read_logged_status(path: &Path) -> LoggedStatus {
    let Ok(text) = fs::read_to_string(path) else {
        return LoggedStatus::Missing;
    };

    status_pattern()
        .captures_iter(&text)
        .last()
        .map(|c| LoggedStatus::Exited(c[1].parse().ok()))
        .unwrap_or(LoggedStatus::Missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(code: Option<i32>) -> JobResult {
        JobResult {
            command: CommandLine::new("sfs").args(["-o", "run"]),
            output: ProcessOutput {
                exit_code: code,
                stdout: "iter 1\niter 2".to_string(),
                stderr: String::new(),
            },
            elapsed: Duration::from_millis(1500),
        }
    }

    #[test]
    fn test_render_contains_sections() {
        let text = result(Some(0)).render();
        assert!(text.starts_with("Command: sfs -o run\n"));
        assert!(text.contains("Stdout:\niter 1\niter 2\nStderr:\n"));
        assert!(text.contains("Elapsed: 1.5s"));
        assert!(text.ends_with("Exit status: 0\n"));
    }

    #[test]
    fn test_round_trip_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile").join("run-cmd-log.txt");

        result(Some(3)).write_to(&path).unwrap();
        assert_eq!(read_logged_status(&path), LoggedStatus::Exited(Some(3)));

        result(None).write_to(&path).unwrap();
        assert_eq!(read_logged_status(&path), LoggedStatus::Exited(None));

        result(Some(0)).write_to(&path).unwrap();
        assert!(read_logged_status(&path).is_success());
    }

    #[test]
    fn test_missing_log() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            read_logged_status(&dir.path().join("nope.txt")),
            LoggedStatus::Missing
        );
    }

    #[test]
    fn test_log_without_status_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        fs::write(&path, "Command: sfs\nStdout:\n").unwrap();
        assert_eq!(read_logged_status(&path), LoggedStatus::Missing);
    }
}
