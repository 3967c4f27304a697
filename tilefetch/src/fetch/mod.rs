//! Tile fetching.
//!
//! Callers hand [`TileAddress`](crate::tile::TileAddress)es to a
//! [`FetchScheduler`], which de-duplicates in-flight requests and runs them
//! on a bounded pool of short-lived worker threads:
//!
//! ```text
//! ┌───────────┐ schedule ┌────────────────┐ next_task ┌─────────────┐  GET  ┌────────────┐
//! │ requester ├─────────►│ FetchScheduler │◄──────────┤ FetchWorker ├──────►│ HttpClient │
//! └───────────┘          └───────┬────────┘           └──────┬──────┘       └────────────┘
//!                                │ on_tile_ready             │ report_result
//!                                ▼                           │
//!                        ┌──────────────┐                    │
//!                        │ TileReceiver │◄───────────────────┘
//!                        └──────────────┘
//! ```
//!
//! Workers and the HTTP client sit behind traits ([`WorkerFactory`],
//! [`HttpClient`]) so tests can substitute fakes.

mod config;
mod error;
mod http;
mod scheduler;
mod worker;

pub use config::{FetchConfig, DEFAULT_MAX_WORKERS};
pub use error::{FetchError, FetchResult};
pub use http::{HttpClient, ReqwestClient, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
pub use scheduler::{FetchScheduler, SchedulerStats, TileReceiver, Worker, WorkerFactory};
pub use worker::{FetchWorker, HttpWorkerFactory};

#[cfg(test)]
pub(crate) use http::tests::MockHttpClient;
