//! HTTP fetch worker.

use std::sync::Arc;

use tracing::{debug, warn};

use super::error::{FetchError, FetchResult};
use super::http::HttpClient;
use super::scheduler::{FetchScheduler, Worker, WorkerFactory};
use crate::tile::TileAddress;

/// Downloads queued tiles until the scheduler runs dry.
///
/// Every claimed address produces exactly one report, success or failure.
/// Failures are not retried.
pub struct FetchWorker {
    scheduler: Arc<FetchScheduler>,
    client: Arc<dyn HttpClient>,
}

impl FetchWorker {
    /// Create a worker bound to a scheduler.
    pub fn new(scheduler: Arc<FetchScheduler>, client: Arc<dyn HttpClient>) -> Self {
        Self { scheduler, client }
    }

    /// Fetch a single tile.
    pub fn fetch(&self, address: &TileAddress) -> FetchResult {
        let url = address.url().ok_or(FetchError::NoUrl)?;
        self.client.get(&url)
    }
}

impl Worker for FetchWorker {
    fn run(self: Box<Self>) {
        while let Some(address) = self.scheduler.next_task() {
            let result = self.fetch(&address);
            match &result {
                Ok(data) => debug!(tile = %address, bytes = data.len(), "Tile downloaded"),
                Err(e) => warn!(tile = %address, error = %e, "Tile download failed"),
            }
            self.scheduler.report_result(&address, result);
        }
        self.scheduler.worker_exited();
    }
}

/// Factory producing [`FetchWorker`]s that share one HTTP client.
pub struct HttpWorkerFactory {
    client: Arc<dyn HttpClient>,
}

impl HttpWorkerFactory {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }
}

impl WorkerFactory for HttpWorkerFactory {
    fn create(&self, scheduler: Arc<FetchScheduler>) -> Box<dyn Worker> {
        Box::new(FetchWorker::new(scheduler, Arc::clone(&self.client)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::http::tests::MockHttpClient;
    use crate::fetch::scheduler::TileReceiver;
    use crate::tile::{OsmSource, TileSource};
    use parking_lot::Mutex;

    struct NoopWorker;

    impl Worker for NoopWorker {
        fn run(self: Box<Self>) {}
    }

    #[derive(Default)]
    struct RecordingReceiver {
        results: Mutex<Vec<(TileAddress, FetchResult)>>,
    }

    impl TileReceiver for RecordingReceiver {
        fn on_tile_ready(&self, address: &TileAddress, result: FetchResult) {
            self.results.lock().push((address.clone(), result));
        }
    }

    /// Scheduler whose own workers do nothing, so a test can drive a
    /// `FetchWorker` synchronously on the test thread.
    fn manual_scheduler() -> (Arc<FetchScheduler>, Arc<RecordingReceiver>) {
        let receiver = Arc::new(RecordingReceiver::default());
        let scheduler = FetchScheduler::with_max_workers(
            Arc::clone(&receiver) as Arc<dyn TileReceiver>,
            |_s: Arc<FetchScheduler>| -> Box<dyn Worker> { Box::new(NoopWorker) },
            1,
        );
        (scheduler, receiver)
    }

    fn osm() -> Arc<dyn TileSource> {
        Arc::new(OsmSource::new("osm", "https://tile.example.org/"))
    }

    #[test]
    fn test_fetch_builds_url_from_address() {
        let (scheduler, _) = manual_scheduler();
        let client = Arc::new(MockHttpClient::ok(vec![9, 9]));
        let worker = FetchWorker::new(scheduler, client.clone());

        let result = worker.fetch(&TileAddress::new(osm(), 0, 5, 7, 4));

        assert_eq!(result, Ok(vec![9, 9]));
        assert_eq!(
            client.requested_urls(),
            vec!["https://tile.example.org/4/5/7.png"]
        );
    }

    #[test]
    fn test_fetch_without_url_fails() {
        let (scheduler, _) = manual_scheduler();
        let client = Arc::new(MockHttpClient::ok(vec![1]));
        let worker = FetchWorker::new(scheduler, client.clone());

        // Layer 3 does not exist on a single-layer source.
        let result = worker.fetch(&TileAddress::new(osm(), 3, 0, 0, 1));

        assert_eq!(result, Err(FetchError::NoUrl));
        assert!(client.requested_urls().is_empty());
    }

    #[test]
    fn test_run_drains_queue_and_reports_each_tile() {
        let (scheduler, receiver) = manual_scheduler();
        scheduler.schedule(TileAddress::new(osm(), 0, 1, 1, 5));
        scheduler.schedule(TileAddress::new(osm(), 0, 2, 1, 5));
        scheduler.schedule(TileAddress::new(osm(), 0, 3, 1, 5));

        let client = Arc::new(MockHttpClient::ok(vec![1, 2, 3]));
        Box::new(FetchWorker::new(Arc::clone(&scheduler), client.clone())).run();

        let results = receiver.results.lock();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
        assert_eq!(client.requested_urls().len(), 3);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_run_reports_failures() {
        let (scheduler, receiver) = manual_scheduler();
        scheduler.schedule(TileAddress::new(osm(), 0, 1, 1, 5));

        let client = Arc::new(MockHttpClient::failing(FetchError::Status {
            status: 503,
            url: "https://tile.example.org/5/1/1.png".to_string(),
        }));
        Box::new(FetchWorker::new(Arc::clone(&scheduler), client)).run();

        let results = receiver.results.lock();
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0].1,
            Err(FetchError::Status { status: 503, .. })
        ));
        assert_eq!(scheduler.stats().claimed, 0);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_factory_creates_http_worker() {
        let (scheduler, receiver) = manual_scheduler();
        scheduler.schedule(TileAddress::new(osm(), 0, 0, 0, 0));

        let factory = HttpWorkerFactory::new(Arc::new(MockHttpClient::ok(vec![7])));
        factory.create(Arc::clone(&scheduler)).run();

        assert_eq!(receiver.results.lock().len(), 1);
        assert!(scheduler.is_idle());
    }
}
