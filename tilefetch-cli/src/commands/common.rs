//! Common utilities shared across CLI commands.

use std::path::{Path, PathBuf};

use tilefetch::config::{config_file_path, ConfigFile};
use tilefetch::tile::{TileAddress, TileSource};

use crate::error::CliError;

/// Resolve the config file path, honouring `--config`.
pub fn resolve_config_path(config_path: Option<&Path>) -> PathBuf {
    config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path)
}

/// Load configuration from `--config` or the default location.
pub fn load_config(config_path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let path = resolve_config_path(config_path);
    Ok(ConfigFile::load_from(&path)?)
}

/// Check a zoom level and layer against the source.
pub fn validate_tile_args(source: &dyn TileSource, layer: u8, zoom: u8) -> Result<(), CliError> {
    if zoom > source.max_zoom() {
        return Err(CliError::InvalidArgument(format!(
            "Zoom level {} exceeds the maximum of {} for {}",
            zoom,
            source.max_zoom(),
            source.name()
        )));
    }
    if layer >= source.num_layers() {
        return Err(CliError::InvalidArgument(format!(
            "Layer {} does not exist; {} has {} layer(s)",
            layer,
            source.name(),
            source.num_layers()
        )));
    }
    Ok(())
}

/// Check that a tile row lies inside the grid at `zoom`.
pub fn validate_row(address: &TileAddress) -> Result<(), CliError> {
    let tiles_per_axis = 1i64 << address.zoom();
    if address.y() < 0 || i64::from(address.y()) >= tiles_per_axis {
        return Err(CliError::InvalidArgument(format!(
            "Row {} is outside the grid at zoom {} (0..{})",
            address.y(),
            address.zoom(),
            tiles_per_axis
        )));
    }
    Ok(())
}
