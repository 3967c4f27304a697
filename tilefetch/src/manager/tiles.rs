//! Cache-first tile access backed by the fetch scheduler.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::DynamicImage;
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use super::consumer::TileConsumer;
use crate::cache::{CachedTile, DiskCache};
use crate::fetch::{
    FetchConfig, FetchResult, FetchScheduler, HttpClient, HttpWorkerFactory, SchedulerStats,
    TileReceiver,
};
use crate::tile::{TileAddress, TileSource};

/// Edge length of a standard tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Serves tiles from the disk cache and schedules downloads for missing or
/// stale ones.
///
/// Downloaded tiles are written back to the cache and handed to the
/// [`TileConsumer`]. Layers whose server returns 512 px tiles are detected
/// on the fly; from then on each download covers four tiles one zoom level
/// deeper.
pub struct TileManager {
    source: Arc<dyn TileSource>,
    scheduler: Arc<FetchScheduler>,
    inner: Arc<ManagerInner>,
    downloads_enabled: AtomicBool,
}

/// State shared with the scheduler's worker threads.
struct ManagerInner {
    cache: Arc<DiskCache>,
    consumer: Arc<dyn TileConsumer>,
    double_res_layers: Mutex<HashSet<u8>>,
}

impl TileManager {
    /// Create a tile manager with its own fetch scheduler.
    pub fn new(
        source: Arc<dyn TileSource>,
        cache: Arc<DiskCache>,
        client: Arc<dyn HttpClient>,
        consumer: Arc<dyn TileConsumer>,
        config: FetchConfig,
    ) -> Self {
        let inner = Arc::new(ManagerInner {
            cache,
            consumer,
            double_res_layers: Mutex::new(HashSet::new()),
        });
        let scheduler = FetchScheduler::with_max_workers(
            Arc::clone(&inner) as Arc<dyn TileReceiver>,
            HttpWorkerFactory::new(client),
            config.max_workers,
        );

        Self {
            source,
            scheduler,
            inner,
            downloads_enabled: AtomicBool::new(true),
        }
    }

    /// Get a tile from the disk cache, downloading it if necessary.
    ///
    /// Returns the cached tile when present, even if stale. A download is
    /// scheduled when the tile is missing or stale, downloads are enabled
    /// and `download_if_necessary` is set.
    ///
    /// Rows outside the grid, zoom levels above the source's maximum and
    /// unknown layers yield `None`; columns wrap around the antimeridian.
    pub fn get_tile(
        &self,
        layer: u8,
        x: i32,
        y: i32,
        zoom: u8,
        download_if_necessary: bool,
    ) -> Option<CachedTile> {
        let address = self.address(layer, x, y, zoom)?;
        let cached = self.inner.cache.lookup(&address);

        let should_download = cached.as_ref().map_or(true, |tile| tile.is_stale);
        if should_download && download_if_necessary && self.downloads_enabled() {
            let target = if self.is_double_res(layer) {
                address.zoom_out().unwrap_or(address)
            } else {
                address
            };
            trace!(tile = %target, "Scheduling tile download");
            self.scheduler.schedule(target);
        }

        cached
    }

    /// Build a normalised address, or `None` if it lies outside the grid.
    fn address(&self, layer: u8, x: i32, y: i32, zoom: u8) -> Option<TileAddress> {
        if layer >= self.source.num_layers() || zoom > self.source.max_zoom() {
            return None;
        }
        let tiles_per_axis = 1i64 << zoom.min(31);
        if y < 0 || i64::from(y) >= tiles_per_axis {
            return None;
        }
        let x = i64::from(x).rem_euclid(tiles_per_axis) as i32;
        Some(TileAddress::new(Arc::clone(&self.source), layer, x, y, zoom))
    }

    /// Enable or disable downloads (offline mode).
    pub fn set_downloads_enabled(&self, enabled: bool) {
        self.downloads_enabled.store(enabled, Ordering::Relaxed);
        info!(enabled, "Tile downloads toggled");
    }

    pub fn downloads_enabled(&self) -> bool {
        self.downloads_enabled.load(Ordering::Relaxed)
    }

    /// Whether a layer has been detected as serving 512 px tiles.
    pub fn is_double_res(&self, layer: u8) -> bool {
        self.inner.double_res_layers.lock().contains(&layer)
    }

    pub fn source(&self) -> &Arc<dyn TileSource> {
        &self.source
    }

    pub fn cache(&self) -> &Arc<DiskCache> {
        &self.inner.cache
    }

    pub fn scheduler(&self) -> &Arc<FetchScheduler> {
        &self.scheduler
    }

    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }
}

impl ManagerInner {
    fn handle_tile(&self, address: &TileAddress, data: Vec<u8>) {
        let image = match image::load_from_memory(&data) {
            Ok(image) => image,
            Err(e) => {
                warn!(tile = %address, error = %e, "Downloaded tile could not be decoded");
                self.consumer.tile_failed(address);
                return;
            }
        };

        if image.width() == TILE_SIZE * 2 {
            if self.double_res_layers.lock().insert(address.layer()) {
                info!(layer = address.layer(), "Layer serves double resolution tiles");
            }
            let children: Option<Vec<_>> = (0..4).map(|q| address.zoom_in(q)).collect();
            let Some(children) = children else {
                warn!(tile = %address, "Double resolution tile has no children to slice into");
                self.consumer.tile_failed(address);
                return;
            };
            for (quadrant, child) in (0u8..).zip(children) {
                let subtile = crop_quadrant(&image, quadrant);
                if let Err(e) = self.cache.store_image(&child, &subtile) {
                    warn!(
                        tile = %child,
                        path = %e.path().display(),
                        error = %e,
                        "Failed to cache tile"
                    );
                }
                self.consumer.tile_ready(&child, &subtile);
            }
        } else {
            if let Err(e) = self.cache.store(address, &data) {
                warn!(
                    tile = %address,
                    path = %e.path().display(),
                    error = %e,
                    "Failed to cache tile"
                );
            }
            self.consumer.tile_ready(address, &image);
        }
    }
}

impl TileReceiver for ManagerInner {
    fn on_tile_ready(&self, address: &TileAddress, result: FetchResult) {
        match result {
            Ok(data) => self.handle_tile(address, data),
            Err(e) => {
                debug!(tile = %address, error = %e, "Tile unavailable");
                self.consumer.tile_failed(address);
            }
        }
    }
}

/// Cut one 256 px quadrant out of a 512 px tile.
///
/// Quadrants follow [`TileAddress::zoom_in`] numbering.
fn crop_quadrant(image: &DynamicImage, quadrant: u8) -> DynamicImage {
    let x = u32::from(quadrant % 2) * TILE_SIZE;
    let y = u32::from(quadrant / 2) * TILE_SIZE;
    image.crop_imm(x, y, TILE_SIZE, TILE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchError, MockHttpClient};
    use crate::tile::OsmSource;
    use image::{GenericImageView, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::thread;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingConsumer {
        ready: Mutex<Vec<(TileAddress, u32)>>,
        failed: Mutex<Vec<TileAddress>>,
    }

    impl TileConsumer for RecordingConsumer {
        fn tile_ready(&self, address: &TileAddress, image: &DynamicImage) {
            self.ready.lock().push((address.clone(), image.width()));
        }

        fn tile_failed(&self, address: &TileAddress) {
            self.failed.lock().push(address.clone());
        }
    }

    fn png(size: u32) -> Vec<u8> {
        let image = RgbaImage::from_fn(size, size, |x, y| {
            // Colour encodes the quadrant so slicing can be checked.
            let q = (x / TILE_SIZE) as u8 + 2 * (y / TILE_SIZE) as u8;
            Rgba([q * 60, 0, 0, 255])
        });
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn osm() -> Arc<dyn TileSource> {
        Arc::new(OsmSource::new("osm", "https://tile.example.org/"))
    }

    struct Fixture {
        _dir: TempDir,
        manager: TileManager,
        consumer: Arc<RecordingConsumer>,
        client: Arc<MockHttpClient>,
    }

    fn fixture(client: MockHttpClient) -> Fixture {
        let dir = TempDir::new().unwrap();
        let consumer = Arc::new(RecordingConsumer::default());
        let client = Arc::new(client);
        let manager = TileManager::new(
            osm(),
            Arc::new(DiskCache::new(dir.path().join("cache"))),
            client.clone(),
            consumer.clone(),
            FetchConfig::default().with_max_workers(2),
        );
        Fixture {
            _dir: dir,
            manager,
            consumer,
            client,
        }
    }

    fn wait_idle(manager: &TileManager) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !manager.scheduler().is_idle() {
            assert!(Instant::now() < deadline, "scheduler did not drain");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_missing_tile_is_downloaded_cached_and_delivered() {
        let f = fixture(MockHttpClient::ok(png(256)));

        assert!(f.manager.get_tile(0, 3, 4, 5, true).is_none());
        wait_idle(&f.manager);

        assert_eq!(
            f.client.requested_urls(),
            vec!["https://tile.example.org/5/3/4.png"]
        );
        let ready = f.consumer.ready.lock().clone();
        assert_eq!(ready.len(), 1);
        assert_eq!((ready[0].0.x(), ready[0].0.y(), ready[0].1), (3, 4, 256));

        let cached = f.manager.get_tile(0, 3, 4, 5, true).unwrap();
        assert!(!cached.is_stale);
        assert_eq!(cached.data, png(256));
        wait_idle(&f.manager);
        assert_eq!(f.client.requested_urls().len(), 1);
    }

    #[test]
    fn test_no_download_when_not_requested() {
        let f = fixture(MockHttpClient::ok(png(256)));

        assert!(f.manager.get_tile(0, 3, 4, 5, false).is_none());
        wait_idle(&f.manager);

        assert!(f.client.requested_urls().is_empty());
        assert_eq!(f.manager.stats().workers_started, 0);
    }

    #[test]
    fn test_offline_mode_skips_download() {
        let f = fixture(MockHttpClient::ok(png(256)));
        f.manager.set_downloads_enabled(false);
        assert!(!f.manager.downloads_enabled());

        assert!(f.manager.get_tile(0, 3, 4, 5, true).is_none());
        wait_idle(&f.manager);

        assert!(f.client.requested_urls().is_empty());
    }

    #[test]
    fn test_failed_download_reported_to_consumer() {
        let f = fixture(MockHttpClient::failing(FetchError::Status {
            status: 404,
            url: "https://tile.example.org/5/3/4.png".to_string(),
        }));

        f.manager.get_tile(0, 3, 4, 5, true);
        wait_idle(&f.manager);

        assert!(f.consumer.ready.lock().is_empty());
        assert_eq!(f.consumer.failed.lock().len(), 1);
        assert!(f.manager.get_tile(0, 3, 4, 5, false).is_none());
    }

    #[test]
    fn test_undecodable_download_is_a_failure() {
        let f = fixture(MockHttpClient::ok(b"<html>rate limited</html>".to_vec()));

        f.manager.get_tile(0, 1, 1, 2, true);
        wait_idle(&f.manager);

        assert_eq!(f.consumer.failed.lock().len(), 1);
        assert!(f.manager.get_tile(0, 1, 1, 2, false).is_none());
    }

    #[test]
    fn test_double_res_tile_is_sliced() {
        let f = fixture(MockHttpClient::ok(png(512)));

        f.manager.get_tile(0, 2, 3, 4, true);
        wait_idle(&f.manager);

        assert!(f.manager.is_double_res(0));
        let mut ready: Vec<(i32, i32, u8, u32)> = f
            .consumer
            .ready
            .lock()
            .iter()
            .map(|(a, w)| (a.x(), a.y(), a.zoom(), *w))
            .collect();
        ready.sort();
        assert_eq!(
            ready,
            vec![
                (4, 6, 5, 256),
                (4, 7, 5, 256),
                (5, 6, 5, 256),
                (5, 7, 5, 256)
            ]
        );

        let cached = f.manager.cache().lookup_image(&TileAddress::new(osm(), 0, 5, 7, 5));
        let pixel = cached.unwrap().image.get_pixel(0, 0);
        assert_eq!(pixel[0], 180);
    }

    #[test]
    fn test_double_res_layer_fetches_parent() {
        let f = fixture(MockHttpClient::ok(png(512)));

        f.manager.get_tile(0, 2, 3, 4, true);
        wait_idle(&f.manager);
        f.manager.get_tile(0, 9, 9, 5, true);
        wait_idle(&f.manager);

        assert_eq!(
            f.client.requested_urls(),
            vec![
                "https://tile.example.org/4/2/3.png",
                "https://tile.example.org/4/4/4.png"
            ]
        );
    }

    #[test]
    fn test_out_of_grid_requests() {
        let f = fixture(MockHttpClient::ok(png(256)));

        assert!(f.manager.get_tile(0, 0, -1, 3, true).is_none());
        assert!(f.manager.get_tile(0, 0, 8, 3, true).is_none());
        assert!(f.manager.get_tile(1, 0, 0, 3, true).is_none());
        wait_idle(&f.manager);
        assert!(f.client.requested_urls().is_empty());
    }

    #[test]
    fn test_over_zoomed_request_is_refused() {
        let f = fixture(MockHttpClient::ok(png(512)));
        let max_zoom = f.manager.source().max_zoom();

        assert!(f.manager.get_tile(0, 0, 0, max_zoom + 1, true).is_none());
        assert!(f.manager.get_tile(0, 0, 0, u8::MAX, true).is_none());
        assert_eq!(f.manager.stats().workers_started, 0);

        f.manager.get_tile(0, 1, 0, 3, true);
        wait_idle(&f.manager);
        assert_eq!(
            f.client.requested_urls(),
            vec!["https://tile.example.org/3/1/0.png"]
        );
        assert_eq!(f.consumer.ready.lock().len(), 4);
    }

    #[test]
    fn test_double_res_tile_without_children_is_a_failure() {
        let f = fixture(MockHttpClient::ok(png(512)));
        let address = TileAddress::new(osm(), 0, 0, 0, u8::MAX);

        f.manager.inner.on_tile_ready(&address, Ok(png(512)));

        assert!(f.consumer.ready.lock().is_empty());
        assert_eq!(f.consumer.failed.lock().clone(), vec![address]);
    }

    #[test]
    fn test_column_wraps_around() {
        let f = fixture(MockHttpClient::ok(png(256)));

        f.manager.get_tile(0, -1, 2, 3, true);
        wait_idle(&f.manager);
        f.manager.get_tile(0, 9, 2, 3, true);
        wait_idle(&f.manager);

        assert_eq!(
            f.client.requested_urls(),
            vec![
                "https://tile.example.org/3/7/2.png",
                "https://tile.example.org/3/1/2.png"
            ]
        );
    }

    #[test]
    fn test_cache_failure_does_not_block_delivery() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let consumer = Arc::new(RecordingConsumer::default());
        let manager = TileManager::new(
            osm(),
            Arc::new(DiskCache::new(&blocker)),
            Arc::new(MockHttpClient::ok(png(256))),
            consumer.clone(),
            FetchConfig::default(),
        );

        manager.get_tile(0, 1, 1, 3, true);
        wait_idle(&manager);

        assert_eq!(consumer.ready.lock().len(), 1);
        assert!(consumer.failed.lock().is_empty());
    }

    #[test]
    fn test_crop_quadrant_offsets() {
        let image = image::load_from_memory(&png(512)).unwrap();
        for q in 0..4u8 {
            let sub = crop_quadrant(&image, q);
            assert_eq!(sub.dimensions(), (256, 256));
            assert_eq!(sub.get_pixel(10, 10)[0], q * 60);
        }
    }
}
