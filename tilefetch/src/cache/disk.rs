//! File-system backed tile cache.
//!
//! Tiles live at `<base>/<source cache path>`, e.g.
//! `~/.tilefetch/cache/tile.openstreetmap.org/12/2148/1332.png`. There is no
//! index file: presence, content and modification time of each file is the
//! whole persisted state.
//!
//! # Staleness
//!
//! A cached tile older than the maximum age (20 days by default) is still
//! returned, flagged as stale so the caller can refresh it.
//!
//! # Directory provisioning
//!
//! The base directory is created automatically at most once per cache
//! instance. If that attempt fails, later writes report
//! [`CacheWriteError::BaseUnavailable`] without touching the file system
//! again. Per-tile subdirectories are created on every write.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use image::{DynamicImage, ImageFormat};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::error::CacheWriteError;
use crate::tile::{TileAddress, TileFormat};

/// Default time after which a cached tile is considered stale (20 days).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(20 * 24 * 60 * 60);

/// Raw tile bytes read from the disk cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTile {
    /// The tile payload as stored on disk.
    pub data: Vec<u8>,
    /// Whether the file is older than the cache's maximum age.
    pub is_stale: bool,
    /// Modification time of the cached file.
    pub modified: SystemTime,
}

/// Decoded tile image read from the disk cache.
#[derive(Debug, Clone)]
pub struct CachedImage {
    /// The decoded tile.
    pub image: DynamicImage,
    /// Whether the file is older than the cache's maximum age.
    pub is_stale: bool,
}

/// Persistent tile cache on the local file system.
///
/// A cache without a base path is inert: lookups always miss and stores
/// always succeed without writing anything.
///
/// The cache does no locking of its own. It is shared between fetch workers
/// through an `Arc`; concurrent writes to different tiles are independent
/// and writes to the same tile simply overwrite each other.
#[derive(Debug)]
pub struct DiskCache {
    base_path: Option<PathBuf>,
    max_age: Duration,
    /// Sticky flag: set on the first automatic base directory creation attempt.
    /// Held while that attempt runs, so concurrent writers wait for it.
    tried_to_create_base: Mutex<bool>,
}

impl DiskCache {
    /// Create a disk cache rooted at the given directory.
    ///
    /// The directory does not need to exist yet; it is created on the
    /// first write.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self::from_option(Some(base_path.into()))
    }

    /// Create an inert cache that never stores anything.
    pub fn disabled() -> Self {
        Self::from_option(None)
    }

    /// Create a cache from an optional base directory.
    pub fn from_option(base_path: Option<PathBuf>) -> Self {
        Self {
            base_path,
            max_age: DEFAULT_MAX_AGE,
            tried_to_create_base: Mutex::new(false),
        }
    }

    /// Set the age after which cached tiles are reported as stale.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Root directory of the cache, if caching is enabled.
    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    /// Whether the cache has a base directory configured.
    pub fn is_enabled(&self) -> bool {
        self.base_path.is_some()
    }

    /// Age after which cached tiles are reported as stale.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Full path of a tile's cache file, if caching is enabled.
    pub fn tile_path(&self, address: &TileAddress) -> Option<PathBuf> {
        self.base_path
            .as_ref()
            .map(|base| base.join(address.cache_path()))
    }

    /// Look up the raw bytes of a cached tile.
    ///
    /// Returns `None` if caching is disabled, the file is missing, empty
    /// or unreadable. Read problems are never reported as errors; the
    /// caller simply falls back to a network fetch.
    pub fn lookup(&self, address: &TileAddress) -> Option<CachedTile> {
        let path = self.tile_path(address)?;
        let metadata = fs::metadata(&path).ok()?;
        if !metadata.is_file() || metadata.len() == 0 {
            return None;
        }
        let modified = metadata.modified().ok()?;

        let data = match fs::read(&path) {
            Ok(data) if !data.is_empty() => data,
            Ok(_) => return None,
            Err(e) => {
                debug!(tile = %address, error = %e, "Unreadable cached tile");
                return None;
            }
        };

        let is_stale = self.is_expired(modified);
        if is_stale {
            debug!(tile = %address, "Cached tile is stale");
        }

        Some(CachedTile {
            data,
            is_stale,
            modified,
        })
    }

    /// Look up a cached tile and decode it into an image.
    ///
    /// A payload that cannot be decoded is treated as a cache miss.
    pub fn lookup_image(&self, address: &TileAddress) -> Option<CachedImage> {
        let cached = self.lookup(address)?;
        match image::load_from_memory(&cached.data) {
            Ok(image) => Some(CachedImage {
                image,
                is_stale: cached.is_stale,
            }),
            Err(e) => {
                debug!(tile = %address, error = %e, "Cached tile could not be decoded");
                None
            }
        }
    }

    /// Store raw tile bytes, overwriting any existing file.
    ///
    /// Succeeds without writing when caching is disabled.
    pub fn store(&self, address: &TileAddress, data: &[u8]) -> Result<(), CacheWriteError> {
        let Some(path) = self.prepare(address)? else {
            return Ok(());
        };

        fs::write(&path, data).map_err(|source| {
            warn!(path = %path.display(), error = %source, "Failed to write cached tile");
            CacheWriteError::Write { path, source }
        })
    }

    /// Store a decoded tile image.
    ///
    /// Only PNG can be encoded, so nothing is written (and `Ok` returned)
    /// when the tile's layer prefers another format.
    pub fn store_image(
        &self,
        address: &TileAddress,
        image: &DynamicImage,
    ) -> Result<(), CacheWriteError> {
        if !self.is_enabled() {
            return Ok(());
        }
        let format = address.source().preferred_format(address.layer());
        if format != TileFormat::Png {
            debug!(tile = %address, format = %format, "Skipping image store for non-PNG layer");
            return Ok(());
        }

        let Some(path) = self.prepare(address)? else {
            return Ok(());
        };

        image
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| match e {
                image::ImageError::IoError(source) => CacheWriteError::Write { path, source },
                source => CacheWriteError::Encode { path, source },
            })
    }

    /// Make sure the directories for a tile exist and return its path.
    fn prepare(&self, address: &TileAddress) -> Result<Option<PathBuf>, CacheWriteError> {
        let Some(base) = self.base_path.as_deref() else {
            return Ok(None);
        };
        self.check_base_path(base)?;

        let path = base.join(address.cache_path());
        if let Some(parent) = path.parent() {
            if !parent.is_dir() {
                fs::create_dir_all(parent).map_err(|source| CacheWriteError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        Ok(Some(path))
    }

    /// Check the base directory, creating it on the first attempt only.
    fn check_base_path(&self, base: &Path) -> Result<(), CacheWriteError> {
        if base.is_dir() {
            return Ok(());
        }

        let mut tried = self.tried_to_create_base.lock();
        if !base.exists() && !*tried {
            *tried = true;
            info!(path = %base.display(), "Cache directory does not exist, creating it");
            return fs::create_dir_all(base).map_err(|source| {
                warn!(path = %base.display(), error = %source, "Failed to create cache directory");
                CacheWriteError::CreateDir {
                    path: base.to_path_buf(),
                    source,
                }
            });
        }
        drop(tried);

        if base.is_dir() {
            Ok(())
        } else {
            Err(CacheWriteError::BaseUnavailable {
                path: base.to_path_buf(),
            })
        }
    }

    fn is_expired(&self, modified: SystemTime) -> bool {
        SystemTime::now()
            .duration_since(modified)
            .map(|age| age > self.max_age)
            .unwrap_or(false)
    }
}

/// Statistics about the contents of a cache directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskCacheStats {
    pub files: u64,
    pub bytes: u64,
}

/// Walk a cache directory and count its files and bytes.
pub fn disk_cache_stats(dir: &Path) -> io::Result<DiskCacheStats> {
    let mut stats = DiskCacheStats::default();
    if !dir.exists() {
        return Ok(stats);
    }

    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                stats.files += 1;
                stats.bytes += entry.metadata()?.len();
            }
        }
    }
    Ok(stats)
}
