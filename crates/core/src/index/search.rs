//! Query façade over the full-text index.
//!
//! Raw user input is never handed to FTS5 directly: every term is quoted
//! so operators and punctuation lose their meaning, and prefix matching is
//! opt-in per query.

use std::sync::{Mutex, PoisonError};

use super::db::{MetadataStore, StoreConnection, StoreError};
use super::types::SearchHit;

/// Default number of hits returned by a search.
pub const DEFAULT_LIMIT: usize = 50;

/// Search query parameters.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    /// Maximum results to return.
    pub limit: usize,
    /// Treat every term as a prefix (`plan` also finds `planning`).
    pub prefix: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { limit: DEFAULT_LIMIT, prefix: true }
    }
}

/// Translate user input into an FTS5 MATCH expression.
///
/// Returns `None` when nothing searchable remains.
pub fn build_match_query(raw: &str, prefix: bool) -> Option<String> {
    let terms: Vec<String> = raw
        .split_whitespace()
        .filter(|term| term.chars().any(char::is_alphanumeric))
        .map(|term| {
            let quoted = format!("\"{}\"", term.replace('"', "\"\""));
            if prefix { format!("{quoted}*") } else { quoted }
        })
        .collect();

    if terms.is_empty() { None } else { Some(terms.join(" ")) }
}

/// Search engine using the vault index. Holds its own connection.
pub struct SearchService {
    conn: Mutex<StoreConnection>,
}

impl SearchService {
    pub fn new(store: &MetadataStore) -> Result<Self, StoreError> {
        Ok(Self { conn: Mutex::new(store.connect()?) })
    }

    /// Search with default options (prefix matching, default limit).
    pub fn search(&self, raw: &str) -> Result<Vec<SearchHit>, StoreError> {
        self.search_with(raw, &SearchOptions::default())
    }

    pub fn search_with(
        &self,
        raw: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let Some(query) = build_match_query(raw, options.prefix) else {
            return Ok(Vec::new());
        };

        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let hits = conn.search(&query, options.limit)?;
        Ok(hits.into_iter().map(shape_hit).collect())
    }
}

fn shape_hit(hit: SearchHit) -> SearchHit {
    let title = if hit.title.trim().is_empty() {
        hit.path.rsplit('/').next().unwrap_or(&hit.path).to_string()
    } else {
        hit.title
    };
    SearchHit {
        path: hit.path,
        title,
        snippet: hit.snippet.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}
