//! Index orchestration: full scans, targeted updates and search.
//!
//! An [`IndexCoordinator`] owns everything needed to keep one vault's
//! store in sync with the files on disk:
//!
//! - a dedicated scan thread, at most one at a time, which diffs the walk
//!   against the stored modification times and fans changed documents out
//!   to a rayon pool,
//! - a bounded queue of targeted updates drained by a few worker threads,
//! - a [`SearchService`] with its own connection.
//!
//! Each worker opens its own [`StoreConnection`]; connections never cross
//! threads. Every document is written in a single transaction, so readers
//! see either the previous or the new version of a file.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Instant, UNIX_EPOCH};

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use super::db::{MetadataStore, StoreConnection, StoreError};
use super::observer::{IndexObserver, Observers};
use super::search::{SearchOptions, SearchService};
use super::types::{DocumentRecord, SearchHit};
use super::workers::BoundedQueue;
use crate::config::IndexSettings;
use crate::vault::{ChangeSignal, VaultWalker, VaultWalkerError, extract_metadata, mtime_nanos};

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Vault walker error: {0}")]
    Walker(#[from] VaultWalkerError),

    #[error("Index store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to build scan pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("Failed to start update workers: {0}")]
    Spawn(#[source] io::Error),
}

/// Failure while indexing one document. Never escapes the coordinator:
/// the document is counted as skipped and its previous rows are kept.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Index store error: {0}")]
    Store(#[from] StoreError),
}

/// What happened to a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocOutcome {
    /// Rows were written from the current file content.
    Indexed,
    /// The file no longer exists and its rows were deleted.
    Removed,
    /// Reading or storing failed; previous rows are untouched.
    Skipped,
    /// Not a tracked document (wrong extension, hidden, outside the vault).
    Ignored,
}

/// Statistics from one full scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// Tracked files found by the walk.
    pub files_found: usize,
    /// New or modified files written to the store.
    pub indexed: usize,
    /// New or modified files that failed and kept their previous rows.
    pub skipped: usize,
    /// Stored files that no longer exist on disk.
    pub removed: usize,
    /// Files whose stored modification time already matched.
    pub unchanged: usize,
    /// False when the scan stopped early (store or walk failure).
    pub complete: bool,
    /// Scan duration in milliseconds.
    pub duration_ms: u64,
}

/// Completion handle returned by [`IndexCoordinator::scan_all`].
pub struct ScanHandle {
    done: Receiver<ScanSummary>,
}

impl ScanHandle {
    /// Block until the scan finishes. `None` if the scan thread died.
    pub fn wait(self) -> Option<ScanSummary> {
        self.done.recv().ok()
    }
}

/// State shared by the coordinator, the scan thread and the update workers.
struct Shared {
    walker: VaultWalker,
    settings: IndexSettings,
    store: MetadataStore,
    pool: rayon::ThreadPool,
    scanning: AtomicBool,
    walks: AtomicUsize,
    observers: Observers,
}

/// Clears the scanning flag on every exit path, including panics.
struct ScanGuard<'a>(&'a AtomicBool);

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Keeps a vault's metadata store in sync with its files.
pub struct IndexCoordinator {
    shared: Arc<Shared>,
    search: SearchService,
    updates: BoundedQueue<PathBuf>,
    scan_thread: Mutex<Option<JoinHandle<()>>>,
}

impl IndexCoordinator {
    /// Open the store for `root` and start the update workers.
    ///
    /// This is the only operation that reports errors; everything after it
    /// logs failures and degrades instead.
    pub fn open(root: &Path, settings: &IndexSettings) -> Result<Self, CoordinatorError> {
        let settings = settings.clone().normalized();
        let walker = VaultWalker::new(root, &settings)?;
        let store = MetadataStore::open(walker.root(), &settings)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.workers)
            .thread_name(|i| format!("vaultsync-index-{i}"))
            .build()?;
        let search = SearchService::new(&store)?;

        tracing::debug!(
            "Opened index for {} at {} ({} scan workers, {} update workers)",
            walker.root().display(),
            store.path().display(),
            settings.workers,
            settings.update_workers
        );

        let (update_workers, queue_capacity) = (settings.update_workers, settings.queue_capacity);
        let shared = Arc::new(Shared {
            walker,
            settings,
            store,
            pool,
            scanning: AtomicBool::new(false),
            walks: AtomicUsize::new(0),
            observers: Observers::default(),
        });

        let updates = BoundedQueue::start(
            "vaultsync-update",
            update_workers,
            queue_capacity,
            || {
                let shared = Arc::clone(&shared);
                let mut conn: Option<StoreConnection> = None;
                move |path: PathBuf| shared.run_queued_update(&mut conn, &path)
            },
        )
        .map_err(CoordinatorError::Spawn)?;

        Ok(Self { shared, search, updates, scan_thread: Mutex::new(None) })
    }

    /// Canonical vault root.
    pub fn root(&self) -> &Path {
        self.shared.walker.root()
    }

    pub fn settings(&self) -> &IndexSettings {
        &self.shared.settings
    }

    pub fn store(&self) -> &MetadataStore {
        &self.shared.store
    }

    pub fn subscribe(&self, observer: Arc<dyn IndexObserver>) {
        self.shared.observers.subscribe(observer);
    }

    /// Start a full scan on a background thread.
    ///
    /// Returns `None` without doing anything when a scan is already
    /// running. The flag is claimed before this returns, so two calls in a
    /// row always start exactly one scan.
    pub fn scan_all(&self) -> Option<ScanHandle> {
        if self
            .shared
            .scanning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Scan already in progress, request dropped");
            return None;
        }

        let shared = Arc::clone(&self.shared);
        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new().name("vaultsync-scan".to_string()).spawn(move || {
            let summary = {
                let _guard = ScanGuard(&shared.scanning);
                shared.run_scan()
            };
            shared.observers.notify(|o| o.on_finished(&summary));
            let _ = tx.send(summary);
        });

        match spawned {
            Ok(handle) => {
                // A previous handle belongs to a scan that already cleared the
                // flag; replacing it detaches that thread's final notification.
                *self.scan_thread.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
                Some(ScanHandle { done: rx })
            }
            Err(e) => {
                tracing::error!("Failed to start scan thread: {}", e);
                self.shared.scanning.store(false, Ordering::Release);
                None
            }
        }
    }

    /// True while a full scan is running.
    pub fn is_scanning(&self) -> bool {
        self.shared.scanning.load(Ordering::Acquire)
    }

    /// Number of vault walks performed so far.
    pub fn walk_count(&self) -> usize {
        self.shared.walks.load(Ordering::Acquire)
    }

    /// Queue a targeted update for one path, relative to the vault root or
    /// absolute inside it. Blocks while the update queue is full.
    pub fn update_file(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.updates.submit(path.clone()) {
            tracing::warn!("Update queue closed, dropping {}", path.display());
        }
    }

    /// Run a targeted update on the calling thread.
    pub fn update_file_now(&self, path: impl AsRef<Path>) -> Result<DocOutcome, StoreError> {
        let mut conn = self.shared.store.connect()?;
        Ok(self.shared.update_and_notify(&mut conn, path.as_ref()))
    }

    /// Route a watcher signal: directories rescan, files update.
    pub fn handle_change(&self, signal: ChangeSignal) {
        match signal {
            ChangeSignal::Directory(dir) => {
                tracing::debug!("Directory change in '{}', requesting scan", dir);
                self.scan_all();
            }
            ChangeSignal::File(path) => self.update_file(path),
        }
    }

    /// Full-text search with prefix matching and the default limit.
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>, StoreError> {
        self.search.search(query)
    }

    pub fn search_with(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, StoreError> {
        self.search.search_with(query, options)
    }

    /// Snapshot of every stored path and its modification time.
    pub fn get_all_files(&self) -> Result<HashMap<String, i64>, StoreError> {
        self.shared.store.connect()?.get_all_files()
    }

    /// Drain pending updates and wait for a running scan.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.updates.shutdown();
        let handle = self.scan_thread.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("Scan thread panicked");
            }
        }
    }
}

impl Drop for IndexCoordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    fn run_scan(&self) -> ScanSummary {
        let start = Instant::now();
        let mut summary = ScanSummary::default();
        self.observers.notify(|o| o.on_started());

        let mut conn = match self.store.connect() {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!("Scan aborted, cannot open store: {}", e);
                return finish(summary, start);
            }
        };

        let stored = match conn.get_all_files() {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!("Scan aborted, cannot read stored files: {}", e);
                return finish(summary, start);
            }
        };

        self.walks.fetch_add(1, Ordering::AcqRel);
        let files = match self.walker.walk() {
            Ok(files) => files,
            Err(e) => {
                tracing::error!("Scan aborted: {}", e);
                return finish(summary, start);
            }
        };
        summary.files_found = files.len();

        let live: HashSet<String> = files.iter().map(|f| f.key()).collect();
        let (changed, unchanged): (Vec<_>, Vec<_>) =
            files.iter().partition(|f| stored.get(&f.key()) != Some(&f.mtime()));
        summary.unchanged = unchanged.len();

        tracing::debug!(
            "Scan found {} files: {} new or modified, {} unchanged",
            summary.files_found,
            changed.len(),
            summary.unchanged
        );

        let outcomes: Vec<DocOutcome> = self.pool.install(|| {
            changed
                .par_iter()
                .map_init(
                    || self.store.connect(),
                    |conn, file| {
                        let key = file.key();
                        let outcome = match conn {
                            Ok(conn) => self.index_document(
                                conn,
                                &key,
                                &file.absolute_path,
                                file.mtime(),
                                file.size,
                            ),
                            Err(e) => {
                                tracing::warn!("No store connection for {}: {}", key, e);
                                DocOutcome::Skipped
                            }
                        };
                        self.observers.notify(|o| o.on_progress(&key));
                        outcome
                    },
                )
                .collect()
        });

        summary.indexed = outcomes.iter().filter(|o| **o == DocOutcome::Indexed).count();
        summary.skipped = outcomes.len() - summary.indexed;

        for path in stored.keys().filter(|p| !live.contains(*p)) {
            match conn.remove_file(path) {
                Ok(true) => summary.removed += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!("Failed to remove {} from index: {}", path, e),
            }
        }

        summary.complete = true;
        let summary = finish(summary, start);
        tracing::info!(
            "Scan complete: {} indexed, {} skipped, {} removed, {} unchanged in {}ms",
            summary.indexed,
            summary.skipped,
            summary.removed,
            summary.unchanged,
            summary.duration_ms
        );
        summary
    }

    fn run_queued_update(&self, conn: &mut Option<StoreConnection>, path: &Path) {
        if conn.is_none() {
            match self.store.connect() {
                Ok(c) => *conn = Some(c),
                Err(e) => {
                    tracing::warn!("Dropping update for {}: {}", path.display(), e);
                    return;
                }
            }
        }
        if let Some(conn) = conn.as_mut() {
            self.update_and_notify(conn, path);
        }
    }

    fn update_and_notify(&self, conn: &mut StoreConnection, path: &Path) -> DocOutcome {
        let Some(key) = self.document_key(path) else {
            tracing::debug!("Ignoring update for untracked path {}", path.display());
            return DocOutcome::Ignored;
        };

        let outcome = self.update_document(conn, &key);
        self.observers.notify(|o| o.on_file_updated(&key));
        outcome
    }

    /// Bring one stored document in line with the file at `key`.
    fn update_document(&self, conn: &mut StoreConnection, key: &str) -> DocOutcome {
        let absolute = self.walker.root().join(key);

        match fs::metadata(&absolute) {
            Ok(meta) if meta.is_file() => {
                let mtime = mtime_nanos(meta.modified().unwrap_or(UNIX_EPOCH));
                self.index_document(conn, key, &absolute, mtime, meta.len())
            }
            Ok(_) => self.remove_document(conn, key),
            Err(e) if e.kind() == io::ErrorKind::NotFound => self.remove_document(conn, key),
            Err(e) => {
                tracing::warn!("Cannot stat {}: {}", key, e);
                DocOutcome::Skipped
            }
        }
    }

    fn remove_document(&self, conn: &mut StoreConnection, key: &str) -> DocOutcome {
        match conn.remove_file(key) {
            Ok(_) => DocOutcome::Removed,
            Err(e) => {
                tracing::warn!("Failed to remove {} from index: {}", key, e);
                DocOutcome::Skipped
            }
        }
    }

    fn index_document(
        &self,
        conn: &mut StoreConnection,
        key: &str,
        absolute: &Path,
        mtime: i64,
        size: u64,
    ) -> DocOutcome {
        match write_document(conn, key, absolute, mtime, size) {
            Ok(()) => DocOutcome::Indexed,
            Err(e) => {
                tracing::warn!("Failed to index {}: {}", key, e);
                DocOutcome::Skipped
            }
        }
    }

    /// Store key for a caller-supplied path, or `None` when the path is not
    /// a tracked document inside the vault.
    fn document_key(&self, path: &Path) -> Option<String> {
        let relative = if path.is_absolute() {
            path.strip_prefix(self.walker.root()).ok()?
        } else {
            path
        };

        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => return None,
            }
        }

        let (_, dirs) = parts.split_last()?;
        if dirs.iter().any(|d| self.settings.is_hidden_name(d)) {
            return None;
        }

        let key = parts.join("/");
        self.settings.is_tracked(Path::new(&key)).then_some(key)
    }
}

/// Read, extract and store one document in a single transaction.
fn write_document(
    conn: &mut StoreConnection,
    key: &str,
    absolute: &Path,
    mtime: i64,
    size: u64,
) -> Result<(), PipelineError> {
    let content = fs::read_to_string(absolute)
        .map_err(|e| PipelineError::FileRead { path: key.to_string(), source: e })?;

    let title = Path::new(key)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let meta = extract_metadata(&content);
    let doc = DocumentRecord::from_extracted(key.to_string(), mtime, size, title, content, meta);

    conn.write_document(&doc)?;
    Ok(())
}

fn finish(mut summary: ScanSummary, start: Instant) -> ScanSummary {
    summary.duration_ms = start.elapsed().as_millis() as u64;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vault(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(full, content).unwrap();
        }
        dir
    }

    fn settings() -> IndexSettings {
        IndexSettings { workers: 2, update_workers: 1, ..Default::default() }
    }

    #[test]
    fn test_document_key_normalization() {
        let dir = vault(&[]);
        let coord = IndexCoordinator::open(dir.path(), &settings()).unwrap();
        let shared = &coord.shared;

        assert_eq!(shared.document_key(Path::new("a/b.md")).as_deref(), Some("a/b.md"));
        assert_eq!(shared.document_key(Path::new("./a.md")).as_deref(), Some("a.md"));
        assert_eq!(
            shared.document_key(&coord.root().join("sub/n.md")).as_deref(),
            Some("sub/n.md")
        );
        assert_eq!(shared.document_key(Path::new("../escape.md")), None);
        assert_eq!(shared.document_key(Path::new("notes.txt")), None);
        assert_eq!(shared.document_key(Path::new(".vaultsync/x.md")), None);
        assert_eq!(shared.document_key(Path::new("/elsewhere/x.md")), None);
        assert_eq!(shared.document_key(Path::new("")), None);
    }

    #[test]
    fn test_scan_summary_counts() {
        let dir = vault(&[("a.md", "alpha"), ("b.md", "beta"), ("skip.txt", "x")]);
        let coord = IndexCoordinator::open(dir.path(), &settings()).unwrap();

        let first = coord.scan_all().unwrap().wait().unwrap();
        assert!(first.complete);
        assert_eq!(first.files_found, 2);
        assert_eq!(first.indexed, 2);
        assert_eq!(first.unchanged, 0);

        fs::remove_file(dir.path().join("b.md")).unwrap();
        let second = coord.scan_all().unwrap().wait().unwrap();
        assert_eq!(second.files_found, 1);
        assert_eq!(second.indexed, 0);
        assert_eq!(second.unchanged, 1);
        assert_eq!(second.removed, 1);
    }

    #[test]
    fn test_title_is_file_stem() {
        let dir = vault(&[("sub/My Note.md", "# Heading\nbody")]);
        let coord = IndexCoordinator::open(dir.path(), &settings()).unwrap();
        coord.scan_all().unwrap().wait().unwrap();

        let hits = coord.search("body").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "sub/My Note.md");
        assert_eq!(hits[0].title, "My Note");
    }

    #[test]
    fn test_update_now_outcomes() {
        let dir = vault(&[("a.md", "alpha")]);
        let coord = IndexCoordinator::open(dir.path(), &settings()).unwrap();

        assert_eq!(coord.update_file_now("a.md").unwrap(), DocOutcome::Indexed);
        assert_eq!(coord.update_file_now("a.txt").unwrap(), DocOutcome::Ignored);

        fs::remove_file(dir.path().join("a.md")).unwrap();
        assert_eq!(coord.update_file_now("a.md").unwrap(), DocOutcome::Removed);
        assert!(coord.get_all_files().unwrap().is_empty());
    }

    #[test]
    fn test_shutdown_drains_queued_updates() {
        let dir = vault(&[("a.md", "one"), ("b.md", "two")]);
        let coord = IndexCoordinator::open(dir.path(), &settings()).unwrap();
        let store = coord.store().clone();

        coord.update_file("a.md");
        coord.update_file("b.md");
        coord.shutdown();

        let files = store.connect().unwrap().get_all_files().unwrap();
        assert_eq!(files.len(), 2);
    }
}
