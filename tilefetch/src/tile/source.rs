//! Tile source descriptors.
//!
//! A [`TileSource`] knows how to turn a tile position into a download URL
//! and a relative cache path. Sources are shared between many
//! [`TileAddress`](super::TileAddress) values, so they are handed around as
//! `Arc<dyn TileSource>`.

use std::fmt;
use std::path::PathBuf;

use reqwest::Url;

/// Default maximum zoom level for OSM-style sources.
pub const DEFAULT_MAX_ZOOM: u8 = 18;

/// Image format a source layer serves its tiles in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TileFormat {
    Png,
    Jpeg,
    /// Any other extension, kept verbatim for path building.
    Other(String),
}

impl TileFormat {
    /// Parse a file extension such as `"png"` or `"jpg"`.
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim().to_lowercase().as_str() {
            "png" => TileFormat::Png,
            "jpg" | "jpeg" => TileFormat::Jpeg,
            other => TileFormat::Other(other.to_string()),
        }
    }

    /// File extension used for cached tiles of this format.
    pub fn extension(&self) -> &str {
        match self {
            TileFormat::Png => "png",
            TileFormat::Jpeg => "jpg",
            TileFormat::Other(ext) => ext,
        }
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Descriptor of a tile server.
///
/// Implementations must be cheap to call: the scheduler and cache call
/// into them for every tile.
pub trait TileSource: Send + Sync {
    /// Stable name of the source.
    ///
    /// Two tile addresses only compare equal when their sources share a name.
    fn name(&self) -> &str;

    /// Number of layers (1 for plain sources, 2 for base + overlay).
    fn num_layers(&self) -> u8;

    /// Maximum zoom level the server provides.
    fn max_zoom(&self) -> u8;

    /// Build the download URL for a tile.
    ///
    /// Returns `None` if the layer has no usable URL.
    fn url(&self, layer: u8, zoom: u8, x: i32, y: i32) -> Option<String>;

    /// Relative file path of a tile inside the disk cache.
    fn cache_path(&self, layer: u8, zoom: u8, x: i32, y: i32) -> PathBuf;

    /// Format tiles of the given layer are stored in.
    fn preferred_format(&self, layer: u8) -> TileFormat;
}

/// One layer of an [`OsmSource`].
#[derive(Debug, Clone)]
struct SourceLayer {
    /// Validated base URL, always ending with `/`. `None` if invalid.
    base_url: Option<String>,
    format: TileFormat,
}

/// Source for OpenStreetMap-style servers using the `zoom/x/y.ext` layout.
///
/// # Example
///
/// ```
/// use tilefetch::tile::{OsmSource, TileSource};
///
/// let source = OsmSource::new("OpenStreetMap", "tile.openstreetmap.org");
/// assert_eq!(
///     source.url(0, 3, 4, 2).as_deref(),
///     Some("http://tile.openstreetmap.org/3/4/2.png")
/// );
/// ```
#[derive(Debug, Clone)]
pub struct OsmSource {
    name: String,
    layers: Vec<SourceLayer>,
    max_zoom: u8,
}

impl OsmSource {
    /// Create a single-layer PNG source with the default maximum zoom.
    pub fn new(name: impl Into<String>, base_url: &str) -> Self {
        Self::with_layers(name, &[(base_url, "png")], DEFAULT_MAX_ZOOM)
    }

    /// Create a source from `(base_url, extension)` pairs.
    ///
    /// Invalid base URLs are kept as layers without a URL so that layer
    /// indices stay stable; fetches for them fail immediately.
    pub fn with_layers(name: impl Into<String>, layers: &[(&str, &str)], max_zoom: u8) -> Self {
        let layers = layers
            .iter()
            .map(|(url, ext)| SourceLayer {
                base_url: fix_base_url(url),
                format: TileFormat::from_extension(ext),
            })
            .collect();
        Self {
            name: name.into(),
            layers,
            max_zoom,
        }
    }

    /// Base URL of a layer, if it is valid.
    pub fn base_url(&self, layer: u8) -> Option<&str> {
        self.layers
            .get(layer as usize)
            .and_then(|l| l.base_url.as_deref())
    }

    /// Directory name used for a layer inside the cache.
    ///
    /// Derived from the host and path of the base URL, e.g.
    /// `tile.openstreetmap.org/` or `tiles.example.com/hike/`.
    fn site_name(&self, layer: u8) -> String {
        let Some(base) = self.base_url(layer) else {
            return format!("{}_{}/", sanitize(&self.name), layer);
        };
        let without_scheme = base.split_once("://").map(|(_, rest)| rest).unwrap_or(base);
        let mut site: String = without_scheme
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '/' => c,
                _ => '_',
            })
            .collect();
        if !site.ends_with('/') {
            site.push('/');
        }
        site
    }
}

impl TileSource for OsmSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_layers(&self) -> u8 {
        self.layers.len() as u8
    }

    fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    fn url(&self, layer: u8, zoom: u8, x: i32, y: i32) -> Option<String> {
        let layer_def = self.layers.get(layer as usize)?;
        let base = layer_def.base_url.as_deref()?;
        Some(format!(
            "{}{}/{}/{}.{}",
            base,
            zoom,
            x,
            y,
            layer_def.format.extension()
        ))
    }

    fn cache_path(&self, layer: u8, zoom: u8, x: i32, y: i32) -> PathBuf {
        let ext = self.preferred_format(layer);
        PathBuf::from(self.site_name(layer))
            .join(zoom.to_string())
            .join(x.to_string())
            .join(format!("{}.{}", y, ext.extension()))
    }

    fn preferred_format(&self, layer: u8) -> TileFormat {
        self.layers
            .get(layer as usize)
            .map(|l| l.format.clone())
            .unwrap_or(TileFormat::Png)
    }
}

/// Normalise a user-supplied base URL.
///
/// Adds `http://` when no scheme is given, enforces a trailing slash and
/// requires the host to contain a dot. Returns `None` if the URL cannot be
/// used.
pub fn fix_base_url(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let mut candidate = if Url::parse(input).is_ok_and(|u| u.has_host()) {
        input.to_string()
    } else if input.contains("://") {
        return None;
    } else {
        format!("http://{}", input)
    };

    if !candidate.ends_with('/') {
        candidate.push('/');
    }

    let parsed = Url::parse(&candidate).ok()?;
    match parsed.host_str() {
        Some(host) if host.contains('.') => Some(candidate),
        _ => None,
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
