//! demtile - Tiled, distributed shape-from-shading DEM refinement
//!
//! This library splits a DEM into overlapping tiles, runs an external
//! shape-from-shading solver once per tile (on this machine or across a set
//! of nodes), and blends the per-tile results back into one raster.
//!
//! The solver, the job distributor, the mosaic tool and the raster validity
//! checker are external programs. Everything here is the coordination
//! around them: grid planning, per-tile argument construction, dispatch,
//! resume and merge.

pub mod command;
pub mod config;
pub mod coordinator;
pub mod grid;
pub mod job;
pub mod layout;
pub mod logging;
pub mod mosaic;
pub mod pool;
pub mod probe;
pub mod process;
pub mod solver;

/// Version of the demtile library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
