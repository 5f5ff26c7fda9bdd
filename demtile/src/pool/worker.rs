//! Re-invocation of this program as a single-tile worker.

use std::path::{Path, PathBuf};

use crate::command::CommandLine;
use crate::grid::PixelBox;

/// Hidden worker flags carrying a tile's padded bounds.
pub const PIXEL_BEGIN_X: &str = "--pixel-begin-x";
pub const PIXEL_BEGIN_Y: &str = "--pixel-begin-y";
pub const PIXEL_END_X: &str = "--pixel-end-x";
pub const PIXEL_END_Y: &str = "--pixel-end-y";

/// Placeholders the distributor replaces with the table's columns.
const PLACEHOLDERS: [&str; 4] = ["{1}", "{2}", "{3}", "{4}"];

/// How to start a worker process for one tile.
///
/// The rendered command is
/// `<program> <leading...> --pixel-begin-x X0 --pixel-begin-y Y0
/// --pixel-end-x X1 --pixel-end-y Y1 <trailing...>`, where `leading` selects
/// the worker entry point and `trailing` carries the shared run options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    program: PathBuf,
    leading: Vec<String>,
    trailing: Vec<String>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading: Vec::new(),
            trailing: Vec::new(),
        }
    }

    /// Arguments placed before the pixel-bound flags.
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading = args.into_iter().map(Into::into).collect();
        self
    }

    /// Arguments placed after the pixel-bound flags.
    pub fn with_trailing_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trailing = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn render(&self, values: [String; 4]) -> CommandLine {
        let flags = [PIXEL_BEGIN_X, PIXEL_BEGIN_Y, PIXEL_END_X, PIXEL_END_Y];
        let bounds = flags
            .iter()
            .zip(values)
            .flat_map(|(flag, value)| [flag.to_string(), value]);

        CommandLine::new(&self.program)
            .args(self.leading.iter().cloned())
            .args(bounds)
            .args(self.trailing.iter().cloned())
    }

    /// Concrete command for one tile.
    pub fn for_tile(&self, bounds: &PixelBox) -> CommandLine {
        self.render(bounds.to_array().map(|v| v.to_string()))
    }

    /// Template with `{1}`..`{4}` in place of the bounds.
    pub fn template(&self) -> CommandLine {
        self.render(PLACEHOLDERS.map(String::from))
    }
}
