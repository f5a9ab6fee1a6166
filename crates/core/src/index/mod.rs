//! SQLite-backed metadata store for vault documents.
//!
//! This module provides:
//! - Per-document rows for links, tags, frontmatter and headers
//! - A full-text search table (FTS5), degrading gracefully when unavailable
//! - An [`IndexCoordinator`] that keeps the store in sync with the vault
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use vaultsync_core::config::IndexSettings;
//! use vaultsync_core::index::IndexCoordinator;
//!
//! let coordinator = IndexCoordinator::open(Path::new("notes"), &IndexSettings::default())?;
//! if let Some(scan) = coordinator.scan_all() {
//!     scan.wait();
//! }
//! for hit in coordinator.search("meeting")? {
//!     println!("{}: {}", hit.path, hit.snippet);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod coordinator;
pub mod db;
pub mod observer;
pub mod schema;
pub mod search;
pub mod types;
pub mod workers;

pub use coordinator::{
    CoordinatorError, DocOutcome, IndexCoordinator, PipelineError, ScanHandle, ScanSummary,
};
pub use db::{DB_FILE, MetadataStore, StoreConnection, StoreError};
pub use observer::IndexObserver;
pub use schema::{SEARCH_TABLE, SchemaError};
pub use search::{DEFAULT_LIMIT, SearchOptions, SearchService, build_match_query};
pub use types::{
    Backlink, DocumentRecord, FileMetadata, FileRecord, FrontmatterRecord, HeaderRecord,
    LinkRecord, LinkType, SearchHit, StoreStats, TagRecord,
};
