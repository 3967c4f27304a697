//! Configuration file handling for ~/.tilefetch/config.ini.
//!
//! Loads and saves user configuration with sensible defaults. Parsing lives
//! in [`super::parser`], serialization in [`super::writer`].

use ini::Ini;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::cache::{DiskCache, DEFAULT_MAX_AGE};
use crate::fetch::{FetchConfig, DEFAULT_MAX_WORKERS, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::tile::OsmSource;

/// Default tile source name.
pub const DEFAULT_SOURCE_NAME: &str = "OpenStreetMap";

/// Default tile server.
pub const DEFAULT_SOURCE_URL: &str = "https://tile.openstreetmap.org/";

/// Default tile file extension.
pub const DEFAULT_SOURCE_EXTENSION: &str = "png";

/// Default maximum zoom of the configured source.
pub const DEFAULT_SOURCE_MAX_ZOOM: u8 = 19;

/// Highest zoom level that still fits tile coordinates in an `i32`.
pub const MAX_SUPPORTED_ZOOM: u8 = 30;

/// Longest accepted cache retention window, in days (about 100 years).
pub const MAX_CACHE_AGE_DAYS: u64 = 36_500;

/// Seconds in one day, for `max_age_days`.
const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

/// Complete user configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub source: SourceSettings,
    pub cache: CacheSettings,
    pub fetch: FetchSettings,
}

/// `[source]` section: the tile server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    pub name: String,
    pub url: String,
    pub extension: String,
    pub max_zoom: u8,
}

/// `[cache]` section: the disk cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Cache directory; `None` disables the disk cache.
    pub directory: Option<PathBuf>,
    /// Age in days after which a cached tile is stale.
    pub max_age_days: u64,
}

/// `[fetch]` section: downloading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub max_workers: usize,
    /// Request timeout in seconds.
    pub timeout: u64,
    pub user_agent: String,
    /// Whether tiles may be downloaded at all.
    pub online: bool,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_SOURCE_NAME.to_string(),
            url: DEFAULT_SOURCE_URL.to_string(),
            extension: DEFAULT_SOURCE_EXTENSION.to_string(),
            max_zoom: DEFAULT_SOURCE_MAX_ZOOM,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: Some(default_cache_directory()),
            max_age_days: DEFAULT_MAX_AGE.as_secs() / SECS_PER_DAY,
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            timeout: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            online: true,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            source: SourceSettings::default(),
            cache: CacheSettings::default(),
            fetch: FetchSettings::default(),
        }
    }
}

impl ConfigFile {
    /// Load configuration from the default path (~/.tilefetch/config.ini).
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load() -> Result<Self, ConfigFileError> {
        let path = config_file_path();
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Create the default config file at `path` if it doesn't exist.
    ///
    /// Returns `true` if a new file was written.
    pub fn ensure_exists(path: &Path) -> Result<bool, ConfigFileError> {
        if path.exists() {
            return Ok(false);
        }
        Self::default().save_to(path)?;
        Ok(true)
    }

    /// Fetch pipeline settings.
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig::default()
            .with_max_workers(self.fetch.max_workers)
            .with_timeout(Duration::from_secs(self.fetch.timeout))
            .with_user_agent(self.fetch.user_agent.clone())
    }

    /// Disk cache for the configured directory and retention window.
    pub fn disk_cache(&self) -> DiskCache {
        DiskCache::from_option(self.cache.directory.clone())
            .with_max_age(Duration::from_secs(
                self.cache.max_age_days.saturating_mul(SECS_PER_DAY),
            ))
    }

    /// The configured tile source.
    pub fn tile_source(&self) -> OsmSource {
        OsmSource::with_layers(
            self.source.name.clone(),
            &[(self.source.url.as_str(), self.source.extension.as_str())],
            self.source.max_zoom,
        )
    }
}

/// Get the path to the config directory (~/.tilefetch).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tilefetch")
}

/// Get the path to the config file (~/.tilefetch/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

/// Default disk cache location (~/.tilefetch/cache).
pub fn default_cache_directory() -> PathBuf {
    config_directory().join("cache")
}
