//! Worker concurrency.

use std::thread;

/// Workers per CPU when the user gives no process count.
pub const DEFAULT_OVERSUBSCRIPTION: f64 = 1.25;

/// Number of CPUs on this node, 1 if unknown.
pub fn cpus_per_node() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// `ceil(cpus × factor)`, at least 1.
pub fn default_concurrency(cpus: usize, factor: f64) -> usize {
    let scaled = (cpus as f64 * factor).ceil();
    if scaled.is_finite() && scaled >= 1.0 {
        scaled as usize
    } else {
        1
    }
}

/// Never request more workers than there are tiles, nor fewer than one.
pub fn bound_concurrency(requested: Option<usize>, default: usize, tiles: usize) -> usize {
    requested.unwrap_or(default).min(tiles).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_concurrency() {
        assert_eq!(default_concurrency(8, 1.25), 10);
        assert_eq!(default_concurrency(3, 1.25), 4);
        assert_eq!(default_concurrency(1, 1.0), 1);
        assert_eq!(default_concurrency(0, 1.25), 1);
        assert_eq!(default_concurrency(4, f64::NAN), 1);
    }

    #[test]
    fn test_bound_by_tile_count() {
        assert_eq!(bound_concurrency(Some(32), 10, 16), 16);
        assert_eq!(bound_concurrency(None, 10, 16), 10);
        assert_eq!(bound_concurrency(None, 10, 4), 4);
        assert_eq!(bound_concurrency(Some(0), 10, 4), 1);
    }

    proptest! {
        #[test]
        fn test_bound_never_exceeds_work(
            requested in proptest::option::of(0usize..256),
            default in 1usize..256,
            tiles in 1usize..512,
        ) {
            let n = bound_concurrency(requested, default, tiles);
            prop_assert!(n >= 1);
            prop_assert!(n <= tiles);
        }
    }
}
