//! demtile - Tiled, distributed shape-from-shading DEM refinement

mod commands;
mod error;
mod progress;
mod runner;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::init::InitArgs;
use commands::plan::PlanArgs;
use commands::run::RunArgs;
use commands::worker::WorkerArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "demtile")]
#[command(version, about = "Refine a DEM with shape-from-shading, one tile at a time")]
struct Cli {
    /// Configuration file [default: ~/.demtile/config.ini]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split the DEM into tiles, solve them in parallel and mosaic the results
    Run(RunArgs),

    /// Show the tile grid a run would use
    Plan(PlanArgs),

    /// Write a default configuration file
    Init(InitArgs),

    /// Solve a single tile (invoked by `run`)
    #[command(hide = true)]
    Worker(WorkerArgs),
}

fn dispatch(cli: Cli) -> Result<i32, CliError> {
    match cli.command {
        Commands::Run(args) => commands::run::run(args, cli.config, cli.verbose).map(|_| 0),
        Commands::Plan(args) => commands::plan::run(args, cli.config, cli.verbose).map(|_| 0),
        Commands::Init(args) => commands::init::run(args, cli.config).map(|_| 0),
        Commands::Worker(args) => commands::worker::run(args, cli.config, cli.verbose),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match dispatch(cli) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {}", e);
            if e.wants_usage_hint() {
                eprintln!("Run 'demtile --help' for usage.");
            }
            ExitCode::from(e.exit_code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use crate::commands::common::PoolArg;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_collects_solver_args_after_separator() {
        let cli = Cli::try_parse_from([
            "demtile", "run", "-i", "in.tif", "-o", "out/run", "--processes", "4", "--", "img1.cub",
            "img2.cub", "--smoothness-weight", "0.04",
        ])
        .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.input_dem, PathBuf::from("in.tif"));
                assert_eq!(args.processes, Some(4));
                assert_eq!(args.pool, PoolArg::Auto);
                assert!(!args.strict);
                assert_eq!(
                    args.solver_args,
                    vec!["img1.cub", "img2.cub", "--smoothness-weight", "0.04"]
                );
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_worker_accepts_rendered_tile_command() {
        let cli = Cli::try_parse_from([
            "demtile",
            "worker",
            "--pixel-begin-x",
            "250",
            "--pixel-begin-y",
            "0",
            "--pixel-end-x",
            "650",
            "--pixel-end-y",
            "350",
            "--input-dem",
            "in.tif",
            "--output-prefix",
            "out/run",
            "--solver",
            "/usr/bin/sfs",
            "--probe",
            "/usr/bin/gdalinfo",
            "--threads",
            "2",
            "--resume",
            "--",
            "img1.cub",
        ])
        .unwrap();
        match cli.command {
            Commands::Worker(args) => {
                assert_eq!(args.pixel_begin_x, 250);
                assert_eq!(args.pixel_end_y, 350);
                assert_eq!(args.threads, Some(2));
                assert!(args.resume);
                assert!(!args.suppress_output);
                assert_eq!(args.solver_args, vec!["img1.cub"]);
            }
            _ => panic!("expected worker"),
        }
    }

    #[test]
    fn test_worker_requires_pixel_bounds() {
        let result = Cli::try_parse_from([
            "demtile",
            "worker",
            "--pixel-begin-x",
            "0",
            "--input-dem",
            "in.tif",
            "--output-prefix",
            "out/run",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_plan_needs_both_sizes() {
        assert!(Cli::try_parse_from(["demtile", "plan", "--size-x", "100"]).is_err());
        assert!(Cli::try_parse_from(["demtile", "plan", "--size-x", "100", "--size-y", "80"]).is_ok());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["demtile", "init", "--config", "/tmp/c.ini", "-v"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.ini")));
    }
}
