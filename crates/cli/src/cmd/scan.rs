//! Scan command implementation.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use vaultsync_core::config::ResolvedConfig;
use vaultsync_core::index::IndexObserver;

use crate::ScanArgs;

/// Prints one line per processed document, or a running counter.
struct Progress {
    verbose: bool,
    done: AtomicUsize,
}

impl IndexObserver for Progress {
    fn on_progress(&self, path: &str) {
        let n = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if self.verbose {
            println!("[{}] {}", n, path);
        } else if n % 50 == 0 {
            print!("\rIndexing... {}", n);
            std::io::stdout().flush().ok();
        }
    }
}

pub fn run(rc: &ResolvedConfig, args: ScanArgs) {
    let coordinator = super::open_coordinator(rc);
    let progress = Arc::new(Progress { verbose: args.verbose, done: AtomicUsize::new(0) });
    coordinator.subscribe(progress.clone());

    println!("Scanning vault: {}", coordinator.root().display());

    let Some(handle) = coordinator.scan_all() else {
        eprintln!("A scan is already running.");
        std::process::exit(1);
    };
    let Some(summary) = handle.wait() else {
        eprintln!("Scan thread stopped unexpectedly.");
        std::process::exit(1);
    };

    if !args.verbose && progress.done.load(Ordering::Relaxed) >= 50 {
        println!(); // Newline after progress
    }

    if !summary.complete {
        eprintln!("Scan did not complete; see the log for details.");
        std::process::exit(1);
    }

    println!();
    println!("Scan complete:");
    println!("  Files found:    {}", summary.files_found);
    println!("  Indexed:        {}", summary.indexed);
    println!("  Unchanged:      {}", summary.unchanged);
    println!("  Removed:        {}", summary.removed);
    if summary.skipped > 0 {
        println!("  Skipped:        {}", summary.skipped);
    }
    println!("  Duration:       {}ms", summary.duration_ms);
    println!();
    println!("Index stored at: {}", coordinator.store().path().display());
}
