//! Persistent tile cache.
//!
//! - [`DiskCache`]: file-system store with age-based staleness
//! - [`CacheWriteError`]: failures while persisting a tile
//!
//! Reads never fail: anything unusable on disk is reported as a miss so the
//! caller falls back to downloading the tile.

mod disk;
mod error;

pub use disk::{
    disk_cache_stats, CachedImage, CachedTile, DiskCache, DiskCacheStats, DEFAULT_MAX_AGE,
};
pub use error::CacheWriteError;
