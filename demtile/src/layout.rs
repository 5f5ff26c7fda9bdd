//! Output file layout.
//!
//! Every path a run reads or writes is derived from the run's output prefix
//! and, for per-tile files, from the tile's padded bounds. Tiles therefore
//! write to disjoint paths and can run concurrently without locking.
//!
//! ```text
//! out/run-tile-args.txt                      tile-argument table
//! out/run-exposures.txt                      exposure pre-pass result
//! out/run-400_350_250_0/run-DEM-final.tif    per-tile primary output
//! out/run-400_350_250_0/run-cmd-log.txt      per-tile log
//! out/run-tile-0.tif                         mosaic tool's default output
//! out/run-DEM-final.tif                      final primary output
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::grid::{tile_name, PixelBox};

/// File-name stem used inside each tile directory.
const TILE_STEM: &str = "run";

/// An output channel that is produced per tile and merged at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OutputChannel {
    /// Refined elevation, always produced.
    Dem,
    /// Reflectance / albedo, produced when the solver floats albedo.
    Albedo,
}

impl OutputChannel {
    /// Suffix appended to a prefix to name this channel's raster.
    pub fn suffix(&self) -> &'static str {
        match self {
            OutputChannel::Dem => "-DEM-final.tif",
            OutputChannel::Albedo => "-comp-albedo-final.tif",
        }
    }
}

impl fmt::Display for OutputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputChannel::Dem => write!(f, "DEM"),
            OutputChannel::Albedo => write!(f, "albedo"),
        }
    }
}

/// Append a suffix to a path prefix without treating it as an extension.
pub fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut s = prefix.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

/// Path layout for one run, rooted at its output prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    prefix: PathBuf,
}

impl OutputLayout {
    /// Create a layout for the given output prefix (e.g. `out/run`).
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The run's output prefix.
    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// Directory holding one tile's files.
    pub fn tile_dir(&self, bounds: &PixelBox) -> PathBuf {
        with_suffix(&self.prefix, &format!("-{}", tile_name(bounds)))
    }

    /// Output prefix handed to the solver for one tile.
    pub fn tile_prefix(&self, bounds: &PixelBox) -> PathBuf {
        self.tile_dir(bounds).join(TILE_STEM)
    }

    /// A tile's raster for the given channel.
    pub fn tile_output(&self, bounds: &PixelBox, channel: OutputChannel) -> PathBuf {
        with_suffix(&self.tile_prefix(bounds), channel.suffix())
    }

    /// A tile's command log.
    pub fn tile_log(&self, bounds: &PixelBox) -> PathBuf {
        command_log_path(&self.tile_prefix(bounds))
    }

    /// Final merged raster for the given channel.
    pub fn final_output(&self, channel: OutputChannel) -> PathBuf {
        with_suffix(&self.prefix, channel.suffix())
    }

    /// Tile-argument table consumed by the distributor.
    pub fn table_path(&self) -> PathBuf {
        with_suffix(&self.prefix, "-tile-args.txt")
    }

    /// Exposures written by the pre-pass.
    pub fn exposures_path(&self) -> PathBuf {
        with_suffix(&self.prefix, "-exposures.txt")
    }

    /// Log of the exposure pass.
    pub fn exposures_log(&self) -> PathBuf {
        with_suffix(&self.prefix, "-exposures-cmd-log.txt")
    }

    /// Name the mosaic tool gives its output before it is renamed.
    pub fn mosaic_default_output(&self) -> PathBuf {
        with_suffix(&self.prefix, "-tile-0.tif")
    }

    /// Coordinator log file.
    pub fn run_log_path(&self) -> PathBuf {
        with_suffix(&self.prefix, "-demtile-log.txt")
    }

    /// JSON run summary.
    pub fn summary_path(&self) -> PathBuf {
        with_suffix(&self.prefix, "-run-summary.json")
    }

    /// Command log for a solver run that used the run prefix directly.
    pub fn run_command_log(&self) -> PathBuf {
        command_log_path(&self.prefix)
    }
}

/// `<prefix>-cmd-log.txt`
pub fn command_log_path(prefix: &Path) -> PathBuf {
    with_suffix(prefix, "-cmd-log.txt")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> PixelBox {
        PixelBox::new(250, 0, 650, 350)
    }

    #[test]
    fn test_tile_paths() {
        let layout = OutputLayout::new("out/run");
        assert_eq!(
            layout.tile_prefix(&bounds()),
            PathBuf::from("out/run-400_350_250_0/run")
        );
        assert_eq!(
            layout.tile_output(&bounds(), OutputChannel::Dem),
            PathBuf::from("out/run-400_350_250_0/run-DEM-final.tif")
        );
        assert_eq!(
            layout.tile_output(&bounds(), OutputChannel::Albedo),
            PathBuf::from("out/run-400_350_250_0/run-comp-albedo-final.tif")
        );
        assert_eq!(
            layout.tile_log(&bounds()),
            PathBuf::from("out/run-400_350_250_0/run-cmd-log.txt")
        );
    }

    #[test]
    fn test_run_paths() {
        let layout = OutputLayout::new("out/run");
        assert_eq!(layout.table_path(), PathBuf::from("out/run-tile-args.txt"));
        assert_eq!(
            layout.final_output(OutputChannel::Dem),
            PathBuf::from("out/run-DEM-final.tif")
        );
        assert_eq!(
            layout.mosaic_default_output(),
            PathBuf::from("out/run-tile-0.tif")
        );
        assert_eq!(
            layout.exposures_path(),
            PathBuf::from("out/run-exposures.txt")
        );
    }

    #[test]
    fn test_with_suffix_does_not_touch_dots() {
        assert_eq!(
            with_suffix(Path::new("out/run.v2"), "-x.tif"),
            PathBuf::from("out/run.v2-x.tif")
        );
    }

    #[test]
    fn test_distinct_tiles_get_distinct_dirs() {
        let layout = OutputLayout::new("p");
        let a = layout.tile_dir(&PixelBox::new(0, 0, 350, 350));
        let b = layout.tile_dir(&PixelBox::new(250, 0, 650, 350));
        assert_ne!(a, b);
    }
}
