//! User configuration.
//!
//! Settings are read from `~/.tilefetch/config.ini`; a missing file yields
//! defaults. [`ConfigFile`] also builds the runtime objects it describes:
//!
//! ```
//! use tilefetch::config::ConfigFile;
//!
//! let config = ConfigFile::default();
//! let fetch = config.fetch_config();
//! assert_eq!(fetch.max_workers, 20);
//! ```

mod file;
mod parser;
mod writer;

pub use file::{
    config_directory, config_file_path, default_cache_directory, CacheSettings, ConfigFile,
    ConfigFileError, FetchSettings, SourceSettings, DEFAULT_SOURCE_EXTENSION,
    DEFAULT_SOURCE_MAX_ZOOM, DEFAULT_SOURCE_NAME, DEFAULT_SOURCE_URL, MAX_CACHE_AGE_DAYS,
    MAX_SUPPORTED_ZOOM,
};
