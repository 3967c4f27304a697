//! Tile addressing.
//!
//! Provides the `TileAddress` type identifying one tile of one layer of a
//! tile source, together with the zoom arithmetic used to move between a
//! tile and its parent or children.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;

use super::source::TileSource;

/// Address of a single map tile.
///
/// Addresses are cheap to clone (the source is shared) and are created on
/// demand whenever a tile is needed. Many transient instances may describe
/// the same tile; equality is structural over the source *name*, layer,
/// coordinates and zoom, never over source identity.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tilefetch::tile::{OsmSource, TileAddress};
///
/// let source = Arc::new(OsmSource::new("osm", "https://tile.openstreetmap.org/"));
/// let tile = TileAddress::new(source, 0, 5, 7, 4);
/// let parent = tile.zoom_out().unwrap();
/// assert_eq!((parent.x(), parent.y(), parent.zoom()), (2, 3, 3));
/// assert_eq!(parent.zoom_in(tile.quadrant()), Some(tile));
/// ```
#[derive(Clone)]
pub struct TileAddress {
    source: Arc<dyn TileSource>,
    layer: u8,
    x: i32,
    y: i32,
    zoom: u8,
}

impl TileAddress {
    /// Create a new tile address.
    ///
    /// # Arguments
    ///
    /// * `source` - Tile source the tile belongs to
    /// * `layer` - Layer index within the source, starting from 0
    /// * `x` - Tile column
    /// * `y` - Tile row
    /// * `zoom` - Zoom level
    pub fn new(source: Arc<dyn TileSource>, layer: u8, x: i32, y: i32, zoom: u8) -> Self {
        Self {
            source,
            layer,
            x,
            y,
            zoom,
        }
    }

    /// Get the tile source.
    pub fn source(&self) -> &Arc<dyn TileSource> {
        &self.source
    }

    /// Get the layer index.
    pub fn layer(&self) -> u8 {
        self.layer
    }

    /// Get the tile column.
    pub fn x(&self) -> i32 {
        self.x
    }

    /// Get the tile row.
    pub fn y(&self) -> i32 {
        self.y
    }

    /// Get the zoom level.
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Address of the parent tile one zoom level out.
    ///
    /// Coordinates are halved with truncation toward zero. Returns `None`
    /// at zoom 0, which has no parent.
    pub fn zoom_out(&self) -> Option<Self> {
        let zoom = self.zoom.checked_sub(1)?;
        Some(Self {
            source: Arc::clone(&self.source),
            layer: self.layer,
            x: self.x / 2,
            y: self.y / 2,
            zoom,
        })
    }

    /// Address of one of the four child tiles one zoom level in.
    ///
    /// Quadrants are numbered left-to-right, top-to-bottom: 0 is top-left,
    /// 1 top-right, 2 bottom-left and 3 bottom-right. Values above 3 wrap.
    ///
    /// Returns `None` if the child's zoom or coordinates do not fit.
    pub fn zoom_in(&self, quadrant: u8) -> Option<Self> {
        let quadrant = quadrant % 4;
        Some(Self {
            source: Arc::clone(&self.source),
            layer: self.layer,
            x: self.x.checked_mul(2)?.checked_add(i32::from(quadrant % 2))?,
            y: self.y.checked_mul(2)?.checked_add(i32::from(quadrant / 2))?,
            zoom: self.zoom.checked_add(1)?,
        })
    }

    /// Quadrant this tile occupies within its parent.
    ///
    /// For non-negative coordinates `a.zoom_out()?.zoom_in(a.quadrant()) == Some(a)`.
    pub fn quadrant(&self) -> u8 {
        (self.x.rem_euclid(2) + 2 * self.y.rem_euclid(2)) as u8
    }

    /// Download URL for this tile, if the source can produce one.
    pub fn url(&self) -> Option<String> {
        self.source.url(self.layer, self.zoom, self.x, self.y)
    }

    /// Relative path of this tile inside the disk cache.
    pub fn cache_path(&self) -> PathBuf {
        self.source.cache_path(self.layer, self.zoom, self.x, self.y)
    }
}

impl PartialEq for TileAddress {
    fn eq(&self, other: &Self) -> bool {
        self.layer == other.layer
            && self.x == other.x
            && self.y == other.y
            && self.zoom == other.zoom
            && self.source.name() == other.source.name()
    }
}

impl Eq for TileAddress {}

impl Hash for TileAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.name().hash(state);
        self.layer.hash(state);
        self.x.hash(state);
        self.y.hash(state);
        self.zoom.hash(state);
    }
}

impl fmt::Debug for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileAddress")
            .field("source", &self.source.name())
            .field("layer", &self.layer)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("zoom", &self.zoom)
            .finish()
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.source.name(),
            self.layer,
            self.zoom,
            self.x,
            self.y
        )
    }
}
