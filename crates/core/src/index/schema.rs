//! SQLite schema definition.
//!
//! Creation is idempotent (`IF NOT EXISTS` everywhere). There is no
//! migration path: a store written by an incompatible build has to be
//! deleted and rebuilt with a full scan.

use rusqlite::Connection;
use thiserror::Error;

/// Name of the FTS5 table holding `(title, content)`, keyed by file id.
pub const SEARCH_TABLE: &str = "search_index";

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Create the core tables and try to create the full-text table.
///
/// Returns whether full-text search is usable. A SQLite build without FTS5
/// still gets a working store; only search degrades.
pub fn init_schema(conn: &Connection) -> Result<bool, SchemaError> {
    create_core_tables(conn)?;

    let created = conn.execute_batch(&format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS {SEARCH_TABLE} USING fts5(title, content);"
    ));
    if let Err(e) = created {
        tracing::warn!("Full-text search unavailable, search is disabled: {}", e);
        return Ok(false);
    }

    Ok(probe_search(conn))
}

/// Check whether the full-text table exists and can be queried.
pub fn probe_search(conn: &Connection) -> bool {
    conn.prepare(&format!("SELECT rowid FROM {SEARCH_TABLE} LIMIT 0")).is_ok()
}

fn create_core_tables(conn: &Connection) -> Result<(), SchemaError> {
    conn.execute_batch(
        r#"
        -- One row per indexed document
        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            path TEXT NOT NULL UNIQUE,
            mtime_ns INTEGER NOT NULL,
            size INTEGER NOT NULL
        );

        -- Derived rows, replaced wholesale on every reindex of their file
        CREATE TABLE IF NOT EXISTS links (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
            target_path TEXT NOT NULL,
            link_type TEXT NOT NULL,
            line INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_links_file ON links(file_id);
        CREATE INDEX IF NOT EXISTS idx_links_target ON links(target_path);

        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
            tag TEXT NOT NULL,
            line INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tags_file ON tags(file_id);
        CREATE INDEX IF NOT EXISTS idx_tags_tag ON tags(tag);

        CREATE TABLE IF NOT EXISTS frontmatter (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_frontmatter_file ON frontmatter(file_id);

        CREATE TABLE IF NOT EXISTS headers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
            level INTEGER NOT NULL,
            text TEXT NOT NULL,
            line INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_headers_file ON headers(file_id);
        "#,
    )?;

    Ok(())
}
