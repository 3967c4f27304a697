//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented INI representation written to `config.ini`.

use std::path::Path;

use super::file::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let directory = config
        .cache
        .directory
        .as_deref()
        .map(path_to_string)
        .unwrap_or_default();

    format!(
        r#"[source]
; Display name of the tile server
name = {}
; Base URL; tiles are fetched from <url><zoom>/<x>/<y>.<extension>
url = {}
; Tile file extension (png, jpg)
extension = {}
; Highest zoom level offered by the server
max_zoom = {}

[cache]
; Directory for downloaded tiles. Leave empty to disable the disk cache
directory = {}
; Days after which a cached tile is refreshed (default: 20)
max_age_days = {}

[fetch]
; Maximum number of parallel downloads (default: 20)
max_workers = {}
; Timeout in seconds for HTTP requests (default: 30)
timeout = {}
; User-Agent header sent to the tile server
user_agent = {}
; Set to false to work from the disk cache only
online = {}
"#,
        config.source.name,
        config.source.url,
        config.source.extension,
        config.source.max_zoom,
        directory,
        config.cache.max_age_days,
        config.fetch.max_workers,
        config.fetch.timeout,
        config.fetch.user_agent,
        config.fetch.online,
    )
}

/// Render a path, abbreviating the home directory to `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
