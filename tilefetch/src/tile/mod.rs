//! Tile addressing and source descriptors.
//!
//! - [`TileAddress`]: identifies one tile and provides zoom arithmetic
//! - [`TileSource`]: builds URLs and cache paths for a tile server
//! - [`OsmSource`]: `zoom/x/y.ext` servers such as OpenStreetMap

mod address;
mod source;

pub use address::TileAddress;
pub use source::{fix_base_url, OsmSource, TileFormat, TileSource, DEFAULT_MAX_ZOOM};
