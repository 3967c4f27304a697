//! Fetch command - download a block of tiles into the disk cache.

use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Args;
use image::DynamicImage;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use tilefetch::fetch::{HttpClient, ReqwestClient};
use tilefetch::manager::{TileConsumer, TileManager};
use tilefetch::tile::{TileAddress, TileSource};

use super::common::{load_config, validate_row, validate_tile_args};
use crate::error::CliError;

/// Arguments for `tilefetch fetch`.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Zoom level
    #[arg(long)]
    pub zoom: u8,

    /// Column of the top-left tile
    #[arg(long, allow_hyphen_values = true)]
    pub x: i32,

    /// Row of the top-left tile
    #[arg(long)]
    pub y: i32,

    /// Number of columns to fetch
    #[arg(long, default_value = "1")]
    pub width: u32,

    /// Number of rows to fetch
    #[arg(long, default_value = "1")]
    pub height: u32,

    /// Source layer
    #[arg(long, default_value = "0")]
    pub layer: u8,

    /// Maximum parallel downloads (overrides the config file)
    #[arg(long)]
    pub max_workers: Option<usize>,
}

/// Outcome of one delivered tile.
enum TileEvent {
    Ready,
    Failed,
}

/// Forwards manager callbacks to the progress loop.
struct ChannelConsumer {
    events: Sender<TileEvent>,
}

impl TileConsumer for ChannelConsumer {
    fn tile_ready(&self, _address: &TileAddress, _image: &DynamicImage) {
        let _ = self.events.send(TileEvent::Ready);
    }

    fn tile_failed(&self, _address: &TileAddress) {
        let _ = self.events.send(TileEvent::Failed);
    }
}

/// Running totals for the summary.
#[derive(Debug, Default)]
struct FetchSummary {
    requested: usize,
    cached: usize,
    stale: usize,
    delivered: usize,
    failed: usize,
}

impl FetchSummary {
    fn drain(&mut self, events: &Receiver<TileEvent>) {
        while let Ok(event) = events.try_recv() {
            match event {
                TileEvent::Ready => self.delivered += 1,
                TileEvent::Failed => self.failed += 1,
            }
        }
    }

    fn message(&self) -> String {
        format!(
            "Fetching tiles... (downloaded: {}, failed: {})",
            self.delivered, self.failed
        )
    }
}

/// Run the fetch command.
pub fn run(args: FetchArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let source: Arc<dyn TileSource> = Arc::new(config.tile_source());
    validate_tile_args(source.as_ref(), args.layer, args.zoom)?;
    validate_row(&TileAddress::new(
        Arc::clone(&source),
        args.layer,
        args.x,
        args.y,
        args.zoom,
    ))?;

    let mut fetch_config = config.fetch_config();
    if let Some(max_workers) = args.max_workers {
        fetch_config = fetch_config.with_max_workers(max_workers);
    }

    let client: Arc<dyn HttpClient> = Arc::new(
        ReqwestClient::with_config(fetch_config.timeout, &fetch_config.user_agent)
            .map_err(CliError::HttpClient)?,
    );

    let cache = Arc::new(config.disk_cache());
    println!("Source: {}", source.name());
    match cache.base_path() {
        Some(dir) => println!("Cache:  {}", dir.display()),
        None => println!("Cache:  disabled"),
    }
    println!("Workers: {}", fetch_config.max_workers);
    println!();

    let (tx, rx) = mpsc::channel();
    let manager = TileManager::new(
        Arc::clone(&source),
        cache,
        client,
        Arc::new(ChannelConsumer { events: tx }),
        fetch_config,
    );
    if !config.fetch.online {
        println!("Offline mode: only the disk cache is consulted.");
        manager.set_downloads_enabled(false);
    }

    info!(
        zoom = args.zoom,
        x = args.x,
        y = args.y,
        width = args.width,
        height = args.height,
        "Fetching tile block"
    );

    let start = Instant::now();
    let mut summary = FetchSummary::default();
    let tiles_per_axis = 1i64 << args.zoom;
    for dy in 0..args.height {
        let y = i64::from(args.y) + i64::from(dy);
        if y >= tiles_per_axis {
            break;
        }
        for dx in 0..args.width {
            let x = (i64::from(args.x) + i64::from(dx)).rem_euclid(tiles_per_axis) as i32;
            summary.requested += 1;
            if let Some(tile) = manager.get_tile(args.layer, x, y as i32, args.zoom, true) {
                summary.cached += 1;
                if tile.is_stale {
                    summary.stale += 1;
                }
            }
        }
    }

    let progress = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") {
        progress.set_style(style);
    }
    progress.enable_steady_tick(Duration::from_millis(100));

    while !manager.scheduler().is_idle() {
        summary.drain(&rx);
        progress.set_message(summary.message());
        thread::sleep(Duration::from_millis(50));
    }
    summary.drain(&rx);
    progress.finish_and_clear();

    let stats = manager.stats();
    println!("Requested:   {}", summary.requested);
    println!(
        "From cache:  {} ({} stale)",
        summary.cached, summary.stale
    );
    println!("Downloaded:  {}", summary.delivered);
    println!("Failed:      {}", summary.failed);
    println!("Workers:     {}", stats.workers_started);
    println!("Elapsed:     {:.1}s", start.elapsed().as_secs_f64());

    info!(
        delivered = summary.delivered,
        failed = summary.failed,
        "Fetch finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_events() {
        let (tx, rx) = mpsc::channel();
        let consumer = ChannelConsumer { events: tx };
        let source: Arc<dyn TileSource> = Arc::new(tilefetch::tile::OsmSource::new(
            "osm",
            "https://tile.example.org/",
        ));
        let address = TileAddress::new(source, 0, 1, 1, 1);
        let image = DynamicImage::new_rgba8(1, 1);

        consumer.tile_ready(&address, &image);
        consumer.tile_ready(&address, &image);
        consumer.tile_failed(&address);

        let mut summary = FetchSummary::default();
        summary.drain(&rx);
        assert_eq!(summary.delivered, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(
            summary.message(),
            "Fetching tiles... (downloaded: 2, failed: 1)"
        );
    }
}
