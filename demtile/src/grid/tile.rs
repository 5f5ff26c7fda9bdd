//! Tile and pixel-bounds types.

use std::fmt;

use serde::Serialize;

/// A half-open pixel rectangle `[begin_x, end_x) × [begin_y, end_y)`.
///
/// Used both for padded tile bounds and for user-supplied crop windows.
/// A box is empty when either axis has `begin >= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PixelBox {
    pub begin_x: i64,
    pub begin_y: i64,
    pub end_x: i64,
    pub end_y: i64,
}

impl PixelBox {
    /// Create a box from its four corner coordinates.
    pub fn new(begin_x: i64, begin_y: i64, end_x: i64, end_y: i64) -> Self {
        Self {
            begin_x,
            begin_y,
            end_x,
            end_y,
        }
    }

    /// Width in pixels (zero for inverted boxes).
    pub fn width(&self) -> i64 {
        (self.end_x - self.begin_x).max(0)
    }

    /// Height in pixels (zero for inverted boxes).
    pub fn height(&self) -> i64 {
        (self.end_y - self.begin_y).max(0)
    }

    /// Returns true if the box covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.begin_x >= self.end_x || self.begin_y >= self.end_y
    }

    /// Grow the box by `margin` on every side and clip it to `[0, size_x] × [0, size_y]`.
    pub fn expand_clipped(&self, margin: i64, size_x: i64, size_y: i64) -> Self {
        Self {
            begin_x: (self.begin_x - margin).max(0),
            begin_y: (self.begin_y - margin).max(0),
            end_x: (self.end_x + margin).min(size_x),
            end_y: (self.end_y + margin).min(size_y),
        }
    }

    /// Returns true if the pixel `(x, y)` lies inside the box.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.begin_x && x < self.end_x && y >= self.begin_y && y < self.end_y
    }

    /// The four coordinates in `begin_x, begin_y, end_x, end_y` order.
    pub fn to_array(&self) -> [i64; 4] {
        [self.begin_x, self.begin_y, self.end_x, self.end_y]
    }
}

impl fmt::Display for PixelBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) - ({}, {})",
            self.begin_x, self.begin_y, self.end_x, self.end_y
        )
    }
}

/// One cell of a [`TileGrid`](super::TileGrid).
///
/// `core` is the un-padded region this tile is responsible for; cores of
/// neighbouring tiles never overlap. `bounds` is the padded region the solver
/// actually processes, clipped to the image extent. The tile name is derived
/// from `bounds` only, so it stays stable no matter how the bounds are later
/// reconciled against a crop window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Tile {
    /// Column index within the grid.
    pub col: u32,
    /// Row index within the grid.
    pub row: u32,
    /// Un-padded core region.
    pub core: PixelBox,
    /// Padded, clipped region.
    pub bounds: PixelBox,
}

impl Tile {
    /// Canonical name, `{width}_{height}_{begin_x}_{begin_y}` of the padded bounds.
    pub fn name(&self) -> String {
        tile_name(&self.bounds)
    }

    /// Rebuild a tile from padded bounds alone, as a worker does.
    ///
    /// The core is unknown on the worker side and is set equal to the bounds.
    pub fn from_bounds(bounds: PixelBox) -> Self {
        Self {
            col: 0,
            row: 0,
            core: bounds,
            bounds,
        }
    }
}

/// Deterministic tile name for a set of padded bounds.
pub fn tile_name(bounds: &PixelBox) -> String {
    format!(
        "{}_{}_{}_{}",
        bounds.width(),
        bounds.height(),
        bounds.begin_x,
        bounds.begin_y
    )
}
