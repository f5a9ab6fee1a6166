#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

//! Incremental indexing and full-text search for markdown vaults.
//!
//! The vault on disk is the source of truth. [`index::IndexCoordinator`]
//! keeps a SQLite index (files, links, tags, frontmatter, headers and an
//! FTS5 search table) converged with it through full scans and targeted
//! single-document updates.

pub mod config;
pub mod index;
pub mod vault;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
