//! Disk cache error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while writing a tile to the disk cache.
///
/// A write failure never invalidates the tile that was being stored: the
/// freshly fetched data is still fine for display, only the persistent copy
/// is missing.
#[derive(Debug, Error)]
pub enum CacheWriteError {
    /// The base directory is missing and could not (or may no longer) be created.
    #[error("Cache directory unavailable: {}", path.display())]
    BaseUnavailable { path: PathBuf },

    /// Failed to create a tile's parent directory.
    #[error("Failed to create cache directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write the tile file.
    #[error("Failed to write cached tile {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to encode a decoded image for storage.
    #[error("Failed to encode cached tile {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl CacheWriteError {
    /// Path the failed operation was working on.
    pub fn path(&self) -> &PathBuf {
        match self {
            CacheWriteError::BaseUnavailable { path }
            | CacheWriteError::CreateDir { path, .. }
            | CacheWriteError::Write { path, .. }
            | CacheWriteError::Encode { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_base_unavailable_display() {
        let err = CacheWriteError::BaseUnavailable {
            path: PathBuf::from("/tiles"),
        };
        assert_eq!(err.to_string(), "Cache directory unavailable: /tiles");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_write_error_keeps_source() {
        let err = CacheWriteError::Write {
            path: PathBuf::from("/tiles/osm/1/2/3.png"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        };
        assert!(err.to_string().contains("3.png"));
        assert!(err.to_string().contains("read-only"));
        assert!(err.source().is_some());
        assert_eq!(err.path(), &PathBuf::from("/tiles/osm/1/2/3.png"));
    }
}
