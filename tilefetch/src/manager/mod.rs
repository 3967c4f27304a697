//! Tile manager: the entry point used by map displays.
//!
//! [`TileManager`] answers tile requests from the disk cache and feeds
//! misses to the fetch scheduler. Finished downloads are cached and handed
//! to a [`TileConsumer`].

mod consumer;
mod tiles;

pub use consumer::TileConsumer;
pub use tiles::{TileManager, TILE_SIZE};
