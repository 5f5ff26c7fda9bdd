//! Per-tile solver arguments.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::crop::{parse_crop_window, reconcile};
use super::JobError;
use crate::command::CommandSpec;
use crate::grid::{PixelBox, Tile};
use crate::layout::OutputLayout;
use crate::solver::flags;

/// A tile bound to the exact arguments its solver run receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    /// The tile this job covers. Its name and paths come from `tile.bounds`.
    pub tile: Tile,
    /// Region the solver is cropped to, after reconciliation.
    pub window: PixelBox,
    /// Output prefix handed to the solver.
    pub output_prefix: PathBuf,
    /// Fully materialized solver arguments.
    pub args: CommandSpec,
}

/// Builds [`JobSpec`]s from tiles and a set of pass-through solver options.
///
/// The input DEM, output prefix and thread count are owned by this builder;
/// any copies of them in the pass-through options are dropped. A
/// `--crop-win` in the pass-through options becomes the crop window every
/// tile is reconciled against.
#[derive(Debug, Clone)]
pub struct JobSpecBuilder {
    input_dem: PathBuf,
    layout: OutputLayout,
    threads: Option<usize>,
    crop: Option<PixelBox>,
    pass_through: CommandSpec,
}

impl JobSpecBuilder {
    /// Create a builder.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::InvalidCropWindow`] if the pass-through options
    /// carry a `--crop-win` whose values are not four integers.
    pub fn new(
        input_dem: impl Into<PathBuf>,
        layout: OutputLayout,
        mut pass_through: CommandSpec,
    ) -> Result<Self, JobError> {
        for owned in [flags::INPUT_DEM, flags::OUTPUT_PREFIX, flags::THREADS] {
            if let Some(opt) = pass_through.remove(owned) {
                warn!(flag = %opt.flag, "Ignoring solver option managed by demtile");
            }
        }

        let crop = pass_through
            .remove(flags::CROP_WIN)
            .map(|opt| parse_crop_window(&opt.values))
            .transpose()?;

        Ok(Self {
            input_dem: input_dem.into(),
            layout,
            threads: None,
            crop,
            pass_through,
        })
    }

    /// Set the per-process solver thread count.
    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }

    /// Set the crop window explicitly.
    pub fn with_crop_window(mut self, crop: Option<PixelBox>) -> Self {
        self.crop = crop;
        self
    }

    /// The crop window tiles are reconciled against, if any.
    pub fn crop_window(&self) -> Option<PixelBox> {
        self.crop
    }

    /// The pass-through options with managed flags removed.
    pub fn pass_through(&self) -> &CommandSpec {
        &self.pass_through
    }

    fn base_args(&self, output_prefix: &Path) -> CommandSpec {
        let mut args = CommandSpec::new();
        args.push_aliased(flags::INPUT_DEM, "-i", [self.input_dem.to_string_lossy()]);
        args.push_aliased(flags::OUTPUT_PREFIX, "-o", [output_prefix.to_string_lossy()]);
        if let Some(threads) = self.threads {
            args.push_flag(flags::THREADS, [threads.to_string()]);
        }
        args
    }

    /// Build the job for one tile of a distributed run.
    ///
    /// Returns `None` when the tile does not intersect the crop window; such
    /// a tile contributes no work and is not a failure.
    pub fn build(&self, tile: &Tile) -> Option<JobSpec> {
        let window = match &self.crop {
            Some(crop) => match reconcile(&tile.bounds, crop) {
                Some(window) => window,
                None => {
                    debug!(tile = %tile.name(), crop = %crop, "Tile outside crop window, skipping");
                    return None;
                }
            },
            None => tile.bounds,
        };

        let output_prefix = self.layout.tile_prefix(&tile.bounds);
        let mut args = self.base_args(&output_prefix);
        args.push_flag(
            flags::CROP_WIN,
            window.to_array().iter().map(|v| v.to_string()),
        );
        args.extend(&self.pass_through);

        Some(JobSpec {
            tile: tile.clone(),
            window,
            output_prefix,
            args,
        })
    }

    /// Build the single job of a run whose grid is one tile.
    ///
    /// The solver writes straight to the run prefix and is not cropped.
    pub fn build_direct(&self, tile: &Tile) -> JobSpec {
        let output_prefix = self.layout.prefix().to_path_buf();
        let mut args = self.base_args(&output_prefix);
        args.extend(&self.pass_through);

        JobSpec {
            tile: tile.clone(),
            window: tile.bounds,
            output_prefix,
            args,
        }
    }

    /// Build the arguments of a whole-problem solver run (the exposure pass).
    pub fn build_global_args(&self) -> CommandSpec {
        let mut args = self.base_args(self.layout.prefix());
        args.extend(&self.pass_through);
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::flags::solver_arity_table;

    fn spec(s: &str) -> CommandSpec {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        CommandSpec::parse(&tokens, &solver_arity_table()).unwrap()
    }

    fn tile(b: PixelBox) -> Tile {
        Tile::from_bounds(b)
    }

    #[test]
    fn test_build_tile_args() {
        let builder = JobSpecBuilder::new(
            "dem.tif",
            OutputLayout::new("out/run"),
            spec("a.tif a.cub --smoothness-weight 0.04"),
        )
        .unwrap()
        .with_threads(Some(4));

        let job = builder.build(&tile(PixelBox::new(0, 0, 350, 350))).unwrap();
        assert_eq!(
            job.args.to_args().join(" "),
            "-i dem.tif -o out/run-350_350_0_0/run --threads 4 --crop-win 0 0 350 350 \
             a.tif a.cub --smoothness-weight 0.04"
        );
        assert_eq!(job.output_prefix, PathBuf::from("out/run-350_350_0_0/run"));
    }

    #[test]
    fn test_build_reconciles_crop_window() {
        let builder = JobSpecBuilder::new(
            "dem.tif",
            OutputLayout::new("p"),
            spec("--crop-win 150 150 350 350 a.tif"),
        )
        .unwrap();

        let job = builder
            .build(&tile(PixelBox::new(100, 100, 400, 400)))
            .unwrap();
        assert_eq!(job.window, PixelBox::new(150, 150, 350, 350));
        assert_eq!(
            job.args.get(flags::CROP_WIN).unwrap(),
            &["150", "150", "350", "350"].map(String::from)
        );
        // Paths still follow the padded bounds, not the reconciled window
        assert_eq!(job.output_prefix, PathBuf::from("p-300_300_100_100/run"));
        // The crop window appears once
        assert_eq!(
            job.args
                .to_args()
                .iter()
                .filter(|a| *a == flags::CROP_WIN)
                .count(),
            1
        );
    }

    #[test]
    fn test_build_skips_disjoint_tile() {
        let builder = JobSpecBuilder::new(
            "dem.tif",
            OutputLayout::new("p"),
            spec("--crop-win 500 500 600 600"),
        )
        .unwrap();
        assert!(builder
            .build(&tile(PixelBox::new(100, 100, 400, 400)))
            .is_none());
    }

    #[test]
    fn test_managed_flags_are_dropped() {
        let builder = JobSpecBuilder::new(
            "dem.tif",
            OutputLayout::new("p"),
            spec("-o elsewhere --threads 99 -i other.tif a.tif"),
        )
        .unwrap();
        assert_eq!(builder.pass_through().to_args(), vec!["a.tif"]);
    }

    #[test]
    fn test_invalid_crop_window() {
        let err = JobSpecBuilder::new(
            "dem.tif",
            OutputLayout::new("p"),
            spec("--crop-win 0 0 a b"),
        )
        .unwrap_err();
        assert!(matches!(err, JobError::InvalidCropWindow(_)));
    }

    #[test]
    fn test_build_direct_writes_to_run_prefix() {
        let builder =
            JobSpecBuilder::new("dem.tif", OutputLayout::new("out/run"), spec("a.tif")).unwrap();
        let job = builder.build_direct(&tile(PixelBox::new(0, 0, 200, 150)));
        assert_eq!(job.args.to_args().join(" "), "-i dem.tif -o out/run a.tif");
        assert!(!job.args.contains(flags::CROP_WIN));
    }
}
