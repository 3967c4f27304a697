//! Consumer of tiles delivered by the tile manager.

use image::DynamicImage;

use crate::tile::TileAddress;

/// Receives tiles as downloads complete.
///
/// Called from fetch worker threads. A single download can produce up to
/// four `tile_ready` calls when the source serves double-resolution tiles.
pub trait TileConsumer: Send + Sync {
    /// A tile is available.
    fn tile_ready(&self, address: &TileAddress, image: &DynamicImage);

    /// Downloading a tile failed.
    fn tile_failed(&self, address: &TileAddress);
}
