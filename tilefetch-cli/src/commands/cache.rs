//! Cache management CLI commands.

use std::path::Path;

use clap::Subcommand;
use tilefetch::cache::disk_cache_stats;

use super::common::load_config;
use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show disk cache statistics
    Stats,
}

/// Run a cache subcommand.
pub fn run(action: CacheAction, config_path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config_path)?;

    match action {
        CacheAction::Stats => {
            let Some(cache_dir) = config.cache.directory.as_deref() else {
                println!("Disk cache is disabled");
                return Ok(());
            };
            println!("Disk cache: {}", cache_dir.display());

            if !cache_dir.exists() {
                println!("  (empty, directory not created yet)");
                return Ok(());
            }

            let stats = disk_cache_stats(cache_dir).map_err(CliError::CacheStats)?;
            println!("  Files: {}", stats.files);
            println!("  Size:  {}", format_size(stats.bytes));
            println!("  Max age: {} days", config.cache.max_age_days);
            Ok(())
        }
    }
}

/// Format a byte count with a binary unit suffix.
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
