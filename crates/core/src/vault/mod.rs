//! Vault file discovery, change watching and content extraction.
//!
//! This module provides utilities for walking vault directories,
//! extracting metadata from markdown files, and turning filesystem
//! notifications into index update signals.

pub mod extractor;
pub mod walker;
pub mod watcher;

pub use extractor::{
    ExtractedHeader, ExtractedLink, ExtractedMetadata, ExtractedTag, extract_frontmatter,
    extract_headers, extract_links, extract_metadata, extract_tags,
};
pub use walker::{VaultWalker, VaultWalkerError, WalkedFile, mtime_nanos, relative_key};
pub use watcher::{ChangeSignal, ChangeWatcher, WatchError, classify_event};
