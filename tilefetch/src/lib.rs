//! tilefetch - Map tile download scheduling and disk caching
//!
//! This library fetches raster map tiles from OpenStreetMap-style servers,
//! keeps them in a persistent disk cache and coordinates concurrent downloads
//! so that each tile is fetched at most once at a time.
//!
//! - [`tile`]: tile addresses and source descriptors
//! - [`cache`]: the on-disk tile cache with age-based staleness
//! - [`fetch`]: the de-duplicating scheduler and its worker pool
//! - [`manager`]: cache-first tile access tying the above together
//! - [`config`]: the `~/.tilefetch/config.ini` file
//! - [`logging`]: tracing setup for binaries

pub mod cache;
pub mod config;
pub mod fetch;
pub mod logging;
pub mod manager;
pub mod tile;
