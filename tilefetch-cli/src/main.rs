//! tilefetch CLI - Command-line interface
//!
//! Downloads map tiles into the disk cache and inspects cached tiles.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tilefetch::logging::{default_log_dir, default_log_file, init_logging};

use commands::cache::CacheAction;
use commands::config::ConfigCommands;
use commands::fetch::FetchArgs;
use commands::lookup::LookupArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "tilefetch")]
#[command(version, about = "Fetch and cache raster map tiles", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.tilefetch/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a block of tiles into the disk cache
    Fetch(FetchArgs),

    /// Show the cache state of a single tile
    Lookup(LookupArgs),

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Inspect the disk cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Fetch(args) => {
            let _logging = init_logging(&default_log_dir(), default_log_file())
                .map_err(|e| CliError::LoggingInit(e.to_string()))?;
            commands::fetch::run(args, config_path)
        }
        Commands::Lookup(args) => commands::lookup::run(args, config_path),
        Commands::Config { command } => commands::config::run(command, config_path),
        Commands::Cache { action } => commands::cache::run(action, config_path),
    }
}
