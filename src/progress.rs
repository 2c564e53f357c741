// src/progress.rs

//! Run observer trait and implementations
//!
//! The transaction run reports its externally visible events through a
//! [`RunObserver`]:
//! - the cache summary, emitted before any download begins
//! - download and install progress (counts of finished vs. total work)
//! - non-fatal warnings such as a cached file failing verification
//!
//! Implementations include:
//! - `LogObserver`: routes events to tracing
//! - `SilentObserver`: no-op for scripted/quiet modes

use crate::db::models::PackageKey;
use tracing::{info, warn};

/// Cache scan result reported before downloads start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheSummary {
    /// Packages in the transaction
    pub total: usize,
    /// Packages whose cached file passed verification
    pub cached: usize,
    /// Packages that must be downloaded
    pub missing: usize,
}

/// Observer of one transaction run
pub trait RunObserver {
    /// Called exactly once per run, after the cache scan
    fn cache_summary(&mut self, summary: CacheSummary);

    /// A package download finished (`done` of `total`)
    fn download_progress(&mut self, _done: usize, _total: usize, _key: &PackageKey) {}

    /// The executor finished one package (`done` of `total`)
    fn install_progress(&mut self, _done: usize, _total: usize, _key: &PackageKey) {}

    /// A non-fatal problem the caller should display
    fn warning(&mut self, _message: &str) {}
}

/// Observer that logs every event to tracing
#[derive(Debug, Default)]
pub struct LogObserver {
    /// Log install progress only every N packages
    log_interval: usize,
}

impl LogObserver {
    pub fn new() -> Self {
        Self { log_interval: 1 }
    }

    /// Set the install progress logging interval
    pub fn with_log_interval(mut self, interval: usize) -> Self {
        self.log_interval = interval.max(1);
        self
    }
}

impl RunObserver for LogObserver {
    fn cache_summary(&mut self, summary: CacheSummary) {
        info!(
            "Packages: {} total, {} cached, {} to download",
            summary.total, summary.cached, summary.missing
        );
    }

    fn download_progress(&mut self, done: usize, total: usize, key: &PackageKey) {
        info!("Downloaded {} ({}/{})", key, done, total);
    }

    fn install_progress(&mut self, done: usize, total: usize, key: &PackageKey) {
        let interval = self.log_interval.max(1);
        if done % interval == 0 || done == total {
            info!("Installing {} ({}/{})", key, done, total);
        }
    }

    fn warning(&mut self, message: &str) {
        warn!("{}", message);
    }
}

/// Observer that ignores every event
#[derive(Debug, Default)]
pub struct SilentObserver;

impl RunObserver for SilentObserver {
    fn cache_summary(&mut self, _summary: CacheSummary) {}
}
