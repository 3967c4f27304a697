//! Fetch scheduler with in-flight de-duplication and a bounded worker pool.
//!
//! # Lifecycle
//!
//! ```text
//! schedule(addr) ──► pending (FIFO) ──► next_task() ──► claimed ──► report_result()
//!      │                                    ▲                            │
//!      └── starts a worker if below max ────┘                            ▼
//!                                                             TileReceiver::on_tile_ready
//! ```
//!
//! Workers pull tasks until the queue is empty, then call
//! [`FetchScheduler::worker_exited`] and terminate. There is no idle pool
//! and no shutdown signalling: new work simply starts a fresh worker. A
//! worker thread that panics still gives its slot back.
//!
//! # De-duplication
//!
//! An address already pending or claimed is ignored by `schedule`. The
//! claimed set is scoped to a run of tasks at one zoom level: when a task at
//! a different zoom is claimed, the set is cleared, on the assumption that
//! fetches from the previous zoom have long finished.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, error, trace};

use super::config::DEFAULT_MAX_WORKERS;
use super::error::FetchResult;
use crate::tile::TileAddress;

/// Receiver of completed fetches.
///
/// Implemented by the tile manager that owns the scheduler. Called from
/// worker threads, outside the scheduler's lock, exactly once per claimed
/// task.
pub trait TileReceiver: Send + Sync {
    /// A fetch finished, successfully or not.
    fn on_tile_ready(&self, address: &TileAddress, result: FetchResult);
}

/// A unit of fetch work running on its own thread.
///
/// Implementations loop on [`FetchScheduler::next_task`], report every
/// task through [`FetchScheduler::report_result`] and call
/// [`FetchScheduler::worker_exited`] once no task is left.
pub trait Worker: Send {
    /// Run until the scheduler has no more work.
    fn run(self: Box<Self>);
}

/// Creates workers for a scheduler.
///
/// Any `Fn(Arc<FetchScheduler>) -> Box<dyn Worker>` closure is a factory,
/// which is how tests substitute fake workers.
pub trait WorkerFactory: Send + Sync {
    /// Create a worker bound to the given scheduler.
    fn create(&self, scheduler: Arc<FetchScheduler>) -> Box<dyn Worker>;
}

impl<F> WorkerFactory for F
where
    F: Fn(Arc<FetchScheduler>) -> Box<dyn Worker> + Send + Sync,
{
    fn create(&self, scheduler: Arc<FetchScheduler>) -> Box<dyn Worker> {
        self(scheduler)
    }
}

/// Snapshot of scheduler state for display and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Addresses queued but not yet claimed.
    pub pending: usize,
    /// Addresses currently tracked as being fetched.
    pub claimed: usize,
    /// Workers started and not yet exited.
    pub live_workers: usize,
    /// Total workers started since creation.
    pub workers_started: u64,
    /// Configured worker limit.
    pub max_workers: usize,
}

#[derive(Debug, Default)]
struct SchedulerState {
    pending: VecDeque<TileAddress>,
    claimed: HashSet<TileAddress>,
    worker_count: usize,
    last_zoom_served: Option<u8>,
    workers_started: u64,
}

impl SchedulerState {
    /// Take a worker slot if one is free.
    fn reserve_worker(&mut self, max_workers: usize) -> bool {
        if self.worker_count < max_workers {
            self.worker_count += 1;
            self.workers_started += 1;
            true
        } else {
            false
        }
    }
}

/// Coordinates tile fetches across a bounded set of worker threads.
///
/// All four operations (`schedule`, `next_task`, `report_result` and
/// `worker_exited`) run one at a time under a single lock. None of them
/// performs I/O while holding it.
pub struct FetchScheduler {
    state: Mutex<SchedulerState>,
    receiver: Arc<dyn TileReceiver>,
    factory: Box<dyn WorkerFactory>,
    max_workers: usize,
}

impl FetchScheduler {
    /// Create a scheduler with the default worker limit.
    pub fn new(
        receiver: Arc<dyn TileReceiver>,
        factory: impl WorkerFactory + 'static,
    ) -> Arc<Self> {
        Self::with_max_workers(receiver, factory, DEFAULT_MAX_WORKERS)
    }

    /// Create a scheduler with a custom worker limit (minimum 1).
    pub fn with_max_workers(
        receiver: Arc<dyn TileReceiver>,
        factory: impl WorkerFactory + 'static,
        max_workers: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SchedulerState::default()),
            receiver,
            factory: Box::new(factory),
            max_workers: max_workers.max(1),
        })
    }

    /// Maximum number of concurrently live workers.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Request a tile fetch.
    ///
    /// Ignored if an equal address is already pending or claimed.
    /// Otherwise the address is queued and, if a worker slot is free, a new
    /// worker is started.
    pub fn schedule(self: &Arc<Self>, address: TileAddress) {
        let start_worker = {
            let mut state = self.state.lock();
            if state.pending.contains(&address) || state.claimed.contains(&address) {
                trace!(tile = %address, "Tile already scheduled");
                return;
            }
            trace!(tile = %address, "Tile queued");
            state.pending.push_back(address);
            state.reserve_worker(self.max_workers)
        };

        if start_worker {
            self.start_worker();
        }
    }

    /// Claim the next queued address. Called by workers only.
    ///
    /// Returns `None` when the queue is empty; the worker should then call
    /// [`worker_exited`](Self::worker_exited) and stop.
    pub fn next_task(&self) -> Option<TileAddress> {
        let mut state = self.state.lock();
        let address = state.pending.pop_front()?;

        let zoom = address.zoom();
        if state.last_zoom_served != Some(zoom) {
            if !state.claimed.is_empty() {
                trace!(
                    from = ?state.last_zoom_served,
                    to = zoom,
                    dropped = state.claimed.len(),
                    "Zoom changed, resetting claimed tiles"
                );
            }
            state.claimed.clear();
            state.last_zoom_served = Some(zoom);
        }

        state.claimed.insert(address.clone());
        Some(address)
    }

    /// Hand a finished fetch back to the receiver. Called by workers only.
    ///
    /// The address is released before the receiver is called, so a request
    /// for the same tile arriving afterwards is treated as new work.
    pub fn report_result(&self, address: &TileAddress, result: FetchResult) {
        self.state.lock().claimed.remove(address);
        self.receiver.on_tile_ready(address, result);
    }

    /// Release the calling worker's slot. Called by workers only, after
    /// `next_task` returned `None`.
    ///
    /// If work was queued between that empty `next_task` and this call, a
    /// replacement worker is started so the queued tiles are not stranded.
    pub fn worker_exited(self: &Arc<Self>) {
        let start_replacement = {
            let mut state = self.state.lock();
            state.worker_count = state.worker_count.saturating_sub(1);
            !state.pending.is_empty() && state.reserve_worker(self.max_workers)
        };

        if start_replacement {
            debug!("Work queued while worker was exiting, starting replacement");
            self.start_worker();
        }
    }

    /// Snapshot of the current scheduler state.
    pub fn stats(&self) -> SchedulerStats {
        let state = self.state.lock();
        SchedulerStats {
            pending: state.pending.len(),
            claimed: state.claimed.len(),
            live_workers: state.worker_count,
            workers_started: state.workers_started,
            max_workers: self.max_workers,
        }
    }

    /// Whether no work is queued and no worker is running.
    pub fn is_idle(&self) -> bool {
        let state = self.state.lock();
        state.pending.is_empty() && state.worker_count == 0
    }

    /// Start a worker for a slot already reserved under the lock.
    fn start_worker(self: &Arc<Self>) {
        let worker = self.factory.create(Arc::clone(self));
        let guard = PanicGuard {
            scheduler: Arc::clone(self),
        };
        let spawned = thread::Builder::new()
            .name("tile-fetch".to_string())
            .spawn(move || {
                let _guard = guard;
                worker.run();
            });

        match spawned {
            Ok(_) => trace!("Fetch worker started"),
            Err(e) => {
                error!(error = %e, "Failed to start fetch worker");
                let mut state = self.state.lock();
                state.worker_count = state.worker_count.saturating_sub(1);
                state.workers_started = state.workers_started.saturating_sub(1);
            }
        }
    }
}

/// Releases a worker's slot if its thread unwinds before calling
/// [`FetchScheduler::worker_exited`].
///
/// The task the worker had claimed, if any, stays claimed until the next
/// zoom change and is not reported to the receiver.
struct PanicGuard {
    scheduler: Arc<FetchScheduler>,
}

impl Drop for PanicGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("Fetch worker panicked, releasing its slot");
            self.scheduler.worker_exited();
        }
    }
}
