//! Plan command: show the tile grid a run would use, without running it.

use std::path::PathBuf;

use clap::Args;
use demtile::coordinator::{bound_concurrency, cpus_per_node, default_concurrency, CoordinatorError};
use demtile::grid::{plan_grid, PixelBox, TileGrid};
use demtile::process::find_executable;
use demtile::solver::Solver;

use super::common::{resolve_tiling, system_runner};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the plan command.
#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Query the extent of this DEM with the solver
    #[arg(short = 'i', long, conflicts_with_all = ["size_x", "size_y"])]
    pub input_dem: Option<PathBuf>,

    /// Raster width in pixels
    #[arg(long, requires = "size_y")]
    pub size_x: Option<i64>,

    /// Raster height in pixels
    #[arg(long, requires = "size_x")]
    pub size_y: Option<i64>,

    #[arg(long)]
    pub tile_size: Option<i64>,

    #[arg(long)]
    pub padding: Option<i64>,

    /// Concurrent tile processes per node
    #[arg(long)]
    pub processes: Option<usize>,

    /// List every tile's bounds
    #[arg(long)]
    pub tiles: bool,
}

/// Run the plan command.
pub fn run(args: PlanArgs, config_path: Option<PathBuf>, verbose: bool) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path.as_deref(), verbose, None)?;
    let config = runner.config();
    let (tile_size, padding) = resolve_tiling(args.tile_size, args.padding, config)?;

    let (size_x, size_y) = match (&args.input_dem, args.size_x, args.size_y) {
        (Some(dem), _, _) => {
            let program = find_executable(&config.programs.solver)?;
            Solver::new(program, system_runner())
                .query_dimensions(dem)
                .map_err(CoordinatorError::DimensionQuery)?
        }
        (None, Some(x), Some(y)) => (x, y),
        _ => {
            return Err(CliError::Usage(
                "give either --input-dem or both --size-x and --size-y".to_string(),
            ))
        }
    };

    let grid = plan_grid(size_x, size_y, tile_size, padding).map_err(CoordinatorError::from)?;
    let default = default_concurrency(cpus_per_node(), config.oversubscription);
    let concurrency = bound_concurrency(args.processes, default, grid.len());

    print_grid(&grid, concurrency, args.tiles);
    Ok(())
}

fn print_grid(grid: &TileGrid, concurrency: usize, list_tiles: bool) {
    let (size_x, size_y) = grid.extent();
    println!("Extent:      {} x {} pixels", size_x, size_y);
    println!(
        "Tiling:      {} px tiles, {} px padding",
        grid.tile_size(),
        grid.padding()
    );
    println!(
        "Grid:        {} x {} = {} tiles",
        grid.num_tiles_x(),
        grid.num_tiles_y(),
        grid.len()
    );
    if grid.is_single_tile() {
        println!("Execution:   single tile, solver runs directly");
    } else {
        println!("Concurrency: {} per node", concurrency);
    }

    if list_tiles {
        println!();
        println!("{:<28} {:>24} {:>24}", "TILE", "BOUNDS", "CORE");
        for tile in grid.tiles() {
            println!(
                "{:<28} {:>24} {:>24}",
                tile.name(),
                corners(&tile.bounds),
                corners(&tile.core)
            );
        }
    }
}

fn corners(b: &PixelBox) -> String {
    format!("{},{} {},{}", b.begin_x, b.begin_y, b.end_x, b.end_y)
}
