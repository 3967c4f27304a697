//! Lookup command - inspect a single tile in the disk cache.

use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use clap::Args;

use tilefetch::tile::{TileAddress, TileSource};

use super::common::{load_config, validate_row, validate_tile_args};
use crate::error::CliError;

/// Arguments for `tilefetch lookup`.
#[derive(Debug, Args)]
pub struct LookupArgs {
    /// Zoom level
    #[arg(long)]
    pub zoom: u8,

    /// Tile column
    #[arg(long, allow_hyphen_values = true)]
    pub x: i32,

    /// Tile row
    #[arg(long)]
    pub y: i32,

    /// Source layer
    #[arg(long, default_value = "0")]
    pub layer: u8,
}

/// Run the lookup command.
pub fn run(args: LookupArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let source: Arc<dyn TileSource> = Arc::new(config.tile_source());
    validate_tile_args(source.as_ref(), args.layer, args.zoom)?;

    let address = TileAddress::new(source, args.layer, args.x, args.y, args.zoom);
    validate_row(&address)?;
    let cache = config.disk_cache();

    println!("Tile: {}", address);
    println!("URL:  {}", address.url().as_deref().unwrap_or("(none)"));

    let Some(path) = cache.tile_path(&address) else {
        println!("Disk cache is disabled");
        return Ok(());
    };
    println!("Path: {}", path.display());

    match cache.lookup(&address) {
        Some(tile) => {
            println!("Cached:   yes");
            println!("Size:     {} bytes", tile.data.len());
            println!("Modified: {}", format_time(tile.modified));
            println!("Age:      {}", format_age(tile.modified));
            println!(
                "Status:   {}",
                if tile.is_stale { "stale" } else { "fresh" }
            );
        }
        None => println!("Cached:   no"),
    }

    Ok(())
}

fn format_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Human-readable age of a file, e.g. "3d 4h".
fn format_age(modified: SystemTime) -> String {
    let secs = SystemTime::now()
        .duration_since(modified)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}
