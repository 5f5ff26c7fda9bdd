//! Tile grid planning.
//!
//! [`plan_grid`] splits a raster extent into a grid of tiles. Cores are laid
//! out every `tile_size` pixels along each axis; the last row and column may
//! be narrower. Each core is then grown by `padding` and clipped to the
//! extent:
//!
//! ```text
//!   0        300       600       900  1000
//!   ┌─────────┬─────────┬─────────┬────┐
//!   │  core   │         │         │    │
//!   │ ┌ ─ ─ ─ ┼ ─ ┐     │         │    │   padded bounds of the
//!   ├─┼───────┼───┼─────┼─────────┼────┤   tile at (1, 1) reach
//!   │ │       │###│     │         │    │   50 px into each
//!   │ └ ─ ─ ─ ┼ ─ ┘     │         │    │   neighbour
//!   └─────────┴─────────┴─────────┴────┘
//! ```
//!
//! Overlap between padded regions is expected; the mosaic step blends it.
//! Identical padded bounds are not: a tile's name and output directory come
//! from its bounds, so a padding wide enough to clip two cores to the same
//! box is rejected.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

use super::tile::{PixelBox, Tile};

/// Errors raised when the grid parameters cannot describe a valid grid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("tile size must be positive, got {0}")]
    InvalidTileSize(i64),

    #[error("padding must not be negative, got {0}")]
    InvalidPadding(i64),

    #[error("raster extent must be positive, got {size_x}×{size_y}")]
    InvalidExtent { size_x: i64, size_y: i64 },

    #[error("padding {padding} makes several tiles share the bounds {bounds}; use a smaller padding or a larger tile size")]
    DuplicateBounds { padding: i64, bounds: PixelBox },
}

/// An immutable grid of tiles covering a raster extent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileGrid {
    size_x: i64,
    size_y: i64,
    tile_size: i64,
    padding: i64,
    num_tiles_x: u32,
    num_tiles_y: u32,
    tiles: Vec<Tile>,
}

impl TileGrid {
    /// Number of tile columns.
    pub fn num_tiles_x(&self) -> u32 {
        self.num_tiles_x
    }

    /// Number of tile rows.
    pub fn num_tiles_y(&self) -> u32 {
        self.num_tiles_y
    }

    /// Total number of tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Returns true if the grid holds no tiles. Never true for a planned grid.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Returns true if the whole extent is a single tile.
    pub fn is_single_tile(&self) -> bool {
        self.tiles.len() == 1
    }

    /// Tiles in row-major order.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Full raster extent as `(size_x, size_y)`.
    pub fn extent(&self) -> (i64, i64) {
        (self.size_x, self.size_y)
    }

    /// Nominal tile edge used to plan this grid.
    pub fn tile_size(&self) -> i64 {
        self.tile_size
    }

    /// Padding used to plan this grid.
    pub fn padding(&self) -> i64 {
        self.padding
    }
}

/// Cut points `0, step, 2·step, …, size` along one axis.
fn cut_points(size: i64, step: i64) -> Vec<i64> {
    let mut cuts: Vec<i64> = (0..size).step_by(step as usize).collect();
    cuts.push(size);
    cuts
}

/// Plan a tile grid for a `size_x × size_y` raster.
///
/// # Arguments
///
/// * `size_x`, `size_y` - Raster extent in pixels
/// * `tile_size` - Nominal core edge length, excluding padding
/// * `padding` - Margin added on every side of each core before clipping
///
/// # Errors
///
/// Returns [`GridError`] for a non-positive tile size or extent, or a
/// negative padding.
pub fn plan_grid(
    size_x: i64,
    size_y: i64,
    tile_size: i64,
    padding: i64,
) -> Result<TileGrid, GridError> {
    if tile_size <= 0 {
        return Err(GridError::InvalidTileSize(tile_size));
    }
    if padding < 0 {
        return Err(GridError::InvalidPadding(padding));
    }
    if size_x <= 0 || size_y <= 0 {
        return Err(GridError::InvalidExtent { size_x, size_y });
    }

    let xs = cut_points(size_x, tile_size);
    let ys = cut_points(size_y, tile_size);

    let mut tiles = Vec::with_capacity((xs.len() - 1) * (ys.len() - 1));
    let mut seen = HashSet::with_capacity(tiles.capacity());
    for (row, y) in ys.windows(2).enumerate() {
        for (col, x) in xs.windows(2).enumerate() {
            let core = PixelBox::new(x[0], y[0], x[1], y[1]);
            let bounds = core.expand_clipped(padding, size_x, size_y);
            if !seen.insert(bounds) {
                return Err(GridError::DuplicateBounds { padding, bounds });
            }
            tiles.push(Tile {
                col: col as u32,
                row: row as u32,
                core,
                bounds,
            });
        }
    }

    Ok(TileGrid {
        size_x,
        size_y,
        tile_size,
        padding,
        num_tiles_x: (xs.len() - 1) as u32,
        num_tiles_y: (ys.len() - 1) as u32,
        tiles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_by_four_grid() {
        let grid = plan_grid(1000, 1000, 300, 50).unwrap();
        assert_eq!(grid.num_tiles_x(), 4);
        assert_eq!(grid.num_tiles_y(), 4);
        assert_eq!(grid.len(), 16);

        let cores_x: Vec<i64> = grid.tiles()[..4].iter().map(|t| t.core.begin_x).collect();
        assert_eq!(cores_x, vec![0, 300, 600, 900]);
        assert_eq!(grid.tiles()[3].core.end_x, 1000);
    }

    #[test]
    fn test_corner_tile_clipped_to_zero() {
        let grid = plan_grid(1000, 1000, 300, 50).unwrap();
        let corner = &grid.tiles()[0];
        assert_eq!(corner.bounds.begin_x, 0);
        assert_eq!(corner.bounds.begin_y, 0);
        assert_eq!(corner.bounds.end_x, 350);
        assert_eq!(corner.bounds.end_y, 350);
    }

    #[test]
    fn test_last_tile_clipped_to_extent() {
        let grid = plan_grid(1000, 1000, 300, 50).unwrap();
        let last = grid.tiles().last().unwrap();
        assert_eq!(last.core, PixelBox::new(900, 900, 1000, 1000));
        assert_eq!(last.bounds, PixelBox::new(850, 850, 1000, 1000));
    }

    #[test]
    fn test_small_image_is_single_tile() {
        let grid = plan_grid(200, 150, 300, 50).unwrap();
        assert!(grid.is_single_tile());
        assert_eq!(grid.tiles()[0].bounds, PixelBox::new(0, 0, 200, 150));
    }

    #[test]
    fn test_exact_multiple_has_no_sliver() {
        let grid = plan_grid(600, 300, 300, 0).unwrap();
        assert_eq!(grid.num_tiles_x(), 2);
        assert_eq!(grid.num_tiles_y(), 1);
    }

    #[test]
    fn test_row_major_order() {
        let grid = plan_grid(600, 600, 300, 0).unwrap();
        let order: Vec<(u32, u32)> = grid.tiles().iter().map(|t| (t.row, t.col)).collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn test_names_are_unique() {
        let grid = plan_grid(1000, 700, 128, 16).unwrap();
        let mut names: Vec<String> = grid.tiles().iter().map(Tile::name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), grid.len());
    }

    #[test]
    fn test_rejects_padding_that_merges_tiles() {
        assert_eq!(
            plan_grid(100, 100, 10, 100),
            Err(GridError::DuplicateBounds {
                padding: 100,
                bounds: PixelBox::new(0, 0, 100, 100),
            })
        );
        // One row of tiles: only the x intervals can collide
        assert!(matches!(
            plan_grid(40, 5, 10, 30),
            Err(GridError::DuplicateBounds { .. })
        ));
        assert!(plan_grid(40, 5, 10, 10).is_ok());
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert_eq!(
            plan_grid(100, 100, 0, 0),
            Err(GridError::InvalidTileSize(0))
        );
        assert_eq!(
            plan_grid(100, 100, 10, -1),
            Err(GridError::InvalidPadding(-1))
        );
        assert!(matches!(
            plan_grid(0, 100, 10, 0),
            Err(GridError::InvalidExtent { .. })
        ));
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_cores_partition_extent(
                size_x in 1i64..2000,
                size_y in 1i64..2000,
                tile_size in 1i64..700,
                padding in 0i64..200
            ) {
                let planned = plan_grid(size_x, size_y, tile_size, padding);
                prop_assume!(!matches!(planned, Err(GridError::DuplicateBounds { .. })));
                let grid = planned?;

                // Core areas add up to the extent and stay inside it
                let area: i64 = grid.tiles().iter().map(|t| t.core.width() * t.core.height()).sum();
                prop_assert_eq!(area, size_x * size_y);

                // Cores abut exactly along each axis
                let nx = grid.num_tiles_x() as usize;
                for row in grid.tiles().chunks(nx) {
                    prop_assert_eq!(row[0].core.begin_x, 0);
                    prop_assert_eq!(row[nx - 1].core.end_x, size_x);
                    for pair in row.windows(2) {
                        prop_assert_eq!(pair[0].core.end_x, pair[1].core.begin_x);
                        prop_assert!(pair[0].core.width() <= tile_size);
                    }
                }
                for col in 0..nx {
                    let column: Vec<&Tile> = grid.tiles().iter().skip(col).step_by(nx).collect();
                    prop_assert_eq!(column[0].core.begin_y, 0);
                    prop_assert_eq!(column[column.len() - 1].core.end_y, size_y);
                    for pair in column.windows(2) {
                        prop_assert_eq!(pair[0].core.end_y, pair[1].core.begin_y);
                    }
                }
            }

            #[test]
            fn test_padded_bounds_within_extent(
                size_x in 1i64..2000,
                size_y in 1i64..2000,
                tile_size in 1i64..700,
                padding in 0i64..400
            ) {
                let planned = plan_grid(size_x, size_y, tile_size, padding);
                prop_assume!(!matches!(planned, Err(GridError::DuplicateBounds { .. })));
                let grid = planned?;
                for tile in grid.tiles() {
                    let b = tile.bounds;
                    prop_assert!(0 <= b.begin_x && b.begin_x < b.end_x && b.end_x <= size_x);
                    prop_assert!(0 <= b.begin_y && b.begin_y < b.end_y && b.end_y <= size_y);
                    prop_assert!(b.begin_x <= tile.core.begin_x && b.end_x >= tile.core.end_x);
                }
            }

            #[test]
            fn test_planned_names_are_unique(
                size_x in 1i64..500,
                size_y in 1i64..500,
                tile_size in 1i64..100,
                padding in 0i64..300
            ) {
                if let Ok(grid) = plan_grid(size_x, size_y, tile_size, padding) {
                    let names: HashSet<String> = grid.tiles().iter().map(Tile::name).collect();
                    prop_assert_eq!(names.len(), grid.len());
                }
            }
        }
    }
}
