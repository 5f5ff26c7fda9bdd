//! Solver option names and their arities.

use crate::command::{ArityTable, FlagSpec};

/// Sub-window `x0 y0 x1 y1` the solver restricts itself to.
pub const CROP_WIN: &str = "--crop-win";

/// Input DEM (`-i`).
pub const INPUT_DEM: &str = "--input-dem";

/// Output prefix (`-o`).
pub const OUTPUT_PREFIX: &str = "--output-prefix";

/// Threads per solver process.
pub const THREADS: &str = "--threads";

/// Run only the global exposure computation, then stop.
pub const COMPUTE_EXPOSURES_ONLY: &str = "--compute-exposures-only";

/// Prefix of a previously computed exposures file.
pub const IMAGE_EXPOSURES_PREFIX: &str = "--image-exposures-prefix";

/// Report the input DEM dimensions and exit.
pub const QUERY: &str = "--query";

/// Also solve for albedo, producing the secondary output channel.
pub const FLOAT_ALBEDO: &str = "--float-albedo";

/// Arity table for solver options.
///
/// Only options this program inspects or rewrites, plus common value-taking
/// options, need to be listed; anything else passes through unchanged.
pub fn solver_arity_table() -> ArityTable {
    ArityTable::new()
        .with(FlagSpec::new(CROP_WIN, 4))
        .with(FlagSpec::new(INPUT_DEM, 1).with_alias("-i"))
        .with(FlagSpec::new(OUTPUT_PREFIX, 1).with_alias("-o"))
        .with(FlagSpec::new(THREADS, 1))
        .with(FlagSpec::new(COMPUTE_EXPOSURES_ONLY, 0))
        .with(FlagSpec::new(IMAGE_EXPOSURES_PREFIX, 1))
        .with(FlagSpec::new(QUERY, 0))
        .with(FlagSpec::new(FLOAT_ALBEDO, 0))
        .with(FlagSpec::new("--smoothness-weight", 1))
        .with(FlagSpec::new("--initial-dem-constraint-weight", 1))
        .with(FlagSpec::new("--max-iterations", 1).with_alias("-n"))
        .with(FlagSpec::new("--reflectance-type", 1))
        .with(FlagSpec::new("--bundle-adjust-prefix", 1))
        .with(FlagSpec::new("--shadow-thresholds", 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_aliases() {
        let table = solver_arity_table();
        assert_eq!(table.canonical("-i"), INPUT_DEM);
        assert_eq!(table.canonical("-o"), OUTPUT_PREFIX);
    }

    #[test]
    fn test_crop_win_takes_four() {
        assert_eq!(solver_arity_table().arity(CROP_WIN), 4);
    }
}
