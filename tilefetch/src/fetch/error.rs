//! Fetch error types.

use thiserror::Error;

/// Outcome of fetching a single tile: the raw payload or the reason it failed.
///
/// The address that produced the result travels alongside it through the
/// scheduler; it is not embedded here.
pub type FetchResult = Result<Vec<u8>, FetchError>;

/// Reasons a tile fetch can fail.
///
/// Callers only need to distinguish success from failure; the variants
/// exist for logging. No failure is retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The tile source could not produce a URL for the tile.
    #[error("No URL available for tile")]
    NoUrl,

    /// The HTTP client could not be created.
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    /// Connection or request failure.
    #[error("Request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The response body could not be read.
    #[error("Failed to read response: {0}")]
    Read(String),

    /// The server returned no data.
    #[error("Empty response from {url}")]
    EmptyBody { url: String },
}
