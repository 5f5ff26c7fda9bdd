//! Tile grid planning.
//!
//! Splits a raster extent into overlapping tiles. Each tile has a core
//! (disjoint from every other core) and padded bounds (clipped to the
//! extent, possibly overlapping neighbours).
//!
//! # Example
//!
//! ```
//! use demtile::grid::plan_grid;
//!
//! let grid = plan_grid(1000, 1000, 300, 50).unwrap();
//! assert_eq!(grid.len(), 16);
//! assert_eq!(grid.tiles()[0].bounds.begin_x, 0);
//! ```

mod planner;
mod tile;

pub use planner::{plan_grid, GridError, TileGrid};
pub use tile::{tile_name, PixelBox, Tile};
