//! Configuration management CLI commands.
//!
//! Provides `config init`, `config show` and `config path`.

use std::path::Path;

use clap::Subcommand;
use tilefetch::config::{ConfigFile, DEFAULT_SOURCE_URL};

use super::common::{load_config, resolve_config_path};
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Create the configuration file with default settings if missing
    Init,

    /// Show the effective configuration
    Show,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init => run_init(config_path),
        ConfigCommands::Show => run_show(config_path),
        ConfigCommands::Path => {
            println!("{}", resolve_config_path(config_path).display());
            Ok(())
        }
    }
}

fn run_init(config_path: Option<&Path>) -> Result<(), CliError> {
    let path = resolve_config_path(config_path);
    if ConfigFile::ensure_exists(&path)? {
        println!("Created configuration file: {}", path.display());
        println!("Tiles are fetched from {} by default.", DEFAULT_SOURCE_URL);
    } else {
        println!("Configuration file already exists: {}", path.display());
    }
    Ok(())
}

fn run_show(config_path: Option<&Path>) -> Result<(), CliError> {
    let path = resolve_config_path(config_path);
    let config = load_config(config_path)?;

    if path.exists() {
        println!("# {}", path.display());
    } else {
        println!("# {} (not found, showing defaults)", path.display());
    }
    println!();
    println!("[source]");
    println!("name = {}", config.source.name);
    println!("url = {}", config.source.url);
    println!("extension = {}", config.source.extension);
    println!("max_zoom = {}", config.source.max_zoom);
    println!();
    println!("[cache]");
    match &config.cache.directory {
        Some(dir) => println!("directory = {}", dir.display()),
        None => println!("directory = (disabled)"),
    }
    println!("max_age_days = {}", config.cache.max_age_days);
    println!();
    println!("[fetch]");
    println!("max_workers = {}", config.fetch.max_workers);
    println!("timeout = {}", config.fetch.timeout);
    println!("user_agent = {}", config.fetch.user_agent);
    println!("online = {}", config.fetch.online);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_file_once() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");

        run(ConfigCommands::Init, Some(path.as_path())).unwrap();
        assert!(path.is_file());
        let first = std::fs::read_to_string(&path).unwrap();

        run(ConfigCommands::Init, Some(path.as_path())).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn test_show_rejects_invalid_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[fetch]\ntimeout = never\n").unwrap();

        assert!(matches!(
            run(ConfigCommands::Show, Some(path.as_path())),
            Err(CliError::Config(_))
        ));
    }
}
