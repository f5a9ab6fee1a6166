//! Watch command implementation.
//!
//! Watcher signals are collected into a set and applied once no new signal
//! arrived for the debounce window. A batch containing any directory signal
//! becomes a single full scan, which also covers the batch's file signals.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use vaultsync_core::config::ResolvedConfig;
use vaultsync_core::index::{IndexCoordinator, IndexObserver, ScanSummary};
use vaultsync_core::vault::{ChangeSignal, ChangeWatcher};

use crate::WatchArgs;

struct Reporter;

impl IndexObserver for Reporter {
    fn on_finished(&self, summary: &ScanSummary) {
        println!(
            "Scan: {} indexed, {} removed, {} unchanged ({}ms)",
            summary.indexed, summary.removed, summary.unchanged, summary.duration_ms
        );
    }

    fn on_file_updated(&self, path: &str) {
        println!("Updated: {}", path);
    }
}

pub fn run(rc: &ResolvedConfig, args: WatchArgs) {
    let coordinator = super::open_coordinator(rc);
    coordinator.subscribe(Arc::new(Reporter));

    let (tx, rx) = mpsc::channel();
    let watcher = match ChangeWatcher::start(coordinator.root(), coordinator.settings(), tx) {
        Ok(watcher) => watcher,
        Err(e) => {
            eprintln!("Error starting watcher: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Watching {} directories under {} with {}ms debounce",
        watcher.watched_dirs().len(),
        coordinator.root().display(),
        args.debounce_ms
    );

    if let Some(scan) = coordinator.scan_all() {
        scan.wait();
    }
    println!("Watching for changes (Ctrl+C to stop)...");

    let debounce = Duration::from_millis(args.debounce_ms);
    let mut pending: HashSet<ChangeSignal> = HashSet::new();
    let mut last_event: Option<Instant> = None;

    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(signal) => {
                tracing::debug!("Detected change: {:?}", signal);
                pending.insert(signal);
                last_event = Some(Instant::now());
            }
            Err(RecvTimeoutError::Timeout) => {
                let settled = last_event.is_some_and(|t| t.elapsed() >= debounce);
                if settled && !pending.is_empty() {
                    flush(&coordinator, &mut pending);
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!("Filesystem watcher stopped");
                break;
            }
        }
    }

    drop(watcher);
    coordinator.shutdown();
}

/// Apply a settled batch. Leaves it pending while a scan is running, so a
/// directory change is never dropped by the single-flight guard.
fn flush(coordinator: &IndexCoordinator, pending: &mut HashSet<ChangeSignal>) {
    let has_directory = pending.iter().any(|s| matches!(s, ChangeSignal::Directory(_)));

    if has_directory {
        if coordinator.is_scanning() {
            return;
        }
        let count = pending.len();
        pending.clear();
        tracing::debug!("Rescanning for {} pending change(s)", count);
        coordinator.handle_change(ChangeSignal::Directory(String::new()));
        return;
    }

    for signal in pending.drain() {
        coordinator.handle_change(signal);
    }
}
