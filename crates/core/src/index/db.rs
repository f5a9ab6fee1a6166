//! Database handles and operations.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use thiserror::Error;

use super::schema::{SEARCH_TABLE, SchemaError, init_schema, probe_search};
use super::types::{
    Backlink, DocumentRecord, FileMetadata, FileRecord, FrontmatterRecord, HeaderRecord,
    LinkRecord, LinkType, SearchHit, StoreStats, TagRecord,
};
use crate::config::IndexSettings;

/// Database file inside the store directory.
pub const DB_FILE: &str = "index.db";

/// Marker keeping the store directory out of version control.
const VCS_MARKER: &str = ".gitignore";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Failed to prepare store directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Per-vault store location and capabilities.
///
/// Cheap to clone. Hands out one [`StoreConnection`] per worker through
/// [`MetadataStore::connect`]; connections are never shared between threads.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    db_path: PathBuf,
    search_available: bool,
}

impl MetadataStore {
    /// Open or create the store inside the vault's hidden store directory.
    pub fn open(vault_root: &Path, settings: &IndexSettings) -> Result<Self, StoreError> {
        let dir = settings.store_dir(vault_root);
        fs::create_dir_all(&dir)
            .map_err(|e| StoreError::Io { path: dir.display().to_string(), source: e })?;

        let marker = dir.join(VCS_MARKER);
        if !marker.exists() {
            fs::write(&marker, "*\n")
                .map_err(|e| StoreError::Io { path: marker.display().to_string(), source: e })?;
        }

        Self::open_at(&dir.join(DB_FILE))
    }

    /// Open or create a store at an explicit database path.
    pub fn open_at(db_path: &Path) -> Result<Self, StoreError> {
        let conn = open_connection(db_path)?;
        let search_available = init_schema(&conn)?;
        Ok(Self { db_path: db_path.to_path_buf(), search_available })
    }

    /// Open a new connection for the calling worker.
    pub fn connect(&self) -> Result<StoreConnection, StoreError> {
        let conn = open_connection(&self.db_path)?;
        let search_available = self.search_available && probe_search(&conn);
        Ok(StoreConnection { conn, search_available })
    }

    pub fn search_available(&self) -> bool {
        self.search_available
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }
}

fn open_connection(path: &Path) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(conn)
}

/// One worker's connection to the store.
///
/// Every mutating method runs in its own `BEGIN IMMEDIATE` transaction, so
/// a file's rows are either fully replaced or left as they were.
pub struct StoreConnection {
    conn: Connection,
    search_available: bool,
}

impl StoreConnection {
    pub fn search_available(&self) -> bool {
        self.search_available
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert or update a file row and clear all of its derived rows.
    pub fn upsert_file(&mut self, path: &str, mtime: i64, size: u64) -> Result<i64, StoreError> {
        let search = self.search_available;
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let id = upsert_file_row(&tx, path, mtime, size)?;
        clear_derived(&tx, id, search)?;
        tx.commit()?;
        Ok(id)
    }

    pub fn add_links(&mut self, file_id: i64, links: &[LinkRecord]) -> Result<(), StoreError> {
        if links.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        insert_links(&tx, file_id, links)?;
        tx.commit()?;
        Ok(())
    }

    pub fn add_tags(&mut self, file_id: i64, tags: &[TagRecord]) -> Result<(), StoreError> {
        if tags.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        insert_tags(&tx, file_id, tags)?;
        tx.commit()?;
        Ok(())
    }

    pub fn add_frontmatter(
        &mut self,
        file_id: i64,
        fields: &[FrontmatterRecord],
    ) -> Result<(), StoreError> {
        if fields.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        insert_frontmatter(&tx, file_id, fields)?;
        tx.commit()?;
        Ok(())
    }

    pub fn add_headers(
        &mut self,
        file_id: i64,
        headers: &[HeaderRecord],
    ) -> Result<(), StoreError> {
        if headers.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        insert_headers(&tx, file_id, headers)?;
        tx.commit()?;
        Ok(())
    }

    /// Replace the searchable text of a file. No-op without full-text search.
    pub fn update_search_entry(
        &mut self,
        file_id: i64,
        title: &str,
        content: &str,
    ) -> Result<(), StoreError> {
        if !self.search_available {
            return Ok(());
        }
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        write_search_entry(&tx, file_id, title, content)?;
        tx.commit()?;
        Ok(())
    }

    /// Write a whole document generation in one transaction.
    ///
    /// The file row is upserted, the previous derived rows are cleared and
    /// the new ones inserted. Any failure rolls everything back, leaving the
    /// previous generation intact.
    pub fn write_document(&mut self, doc: &DocumentRecord) -> Result<i64, StoreError> {
        let search = self.search_available;
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let id = upsert_file_row(&tx, &doc.path, doc.mtime, doc.size)?;
        clear_derived(&tx, id, search)?;
        insert_links(&tx, id, &doc.links)?;
        insert_tags(&tx, id, &doc.tags)?;
        insert_frontmatter(&tx, id, &doc.frontmatter)?;
        insert_headers(&tx, id, &doc.headers)?;
        if search {
            write_search_entry(&tx, id, &doc.title, &doc.content)?;
        }

        tx.commit()?;
        Ok(id)
    }

    /// Delete a file and all of its derived rows. Returns whether it existed.
    pub fn remove_file(&mut self, path: &str) -> Result<bool, StoreError> {
        let search = self.search_available;
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let id: Option<i64> = tx
            .query_row("SELECT id FROM files WHERE path = ?1", [path], |row| row.get(0))
            .optional()?;
        let Some(id) = id else {
            return Ok(false);
        };

        clear_derived(&tx, id, search)?;
        tx.execute("DELETE FROM files WHERE id = ?1", [id])?;
        tx.commit()?;
        Ok(true)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Map of every indexed path to its stored mtime.
    pub fn get_all_files(&self) -> Result<HashMap<String, i64>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT path, mtime_ns FROM files")?;
        let files = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(files)
    }

    pub fn get_file(&self, path: &str) -> Result<Option<FileRecord>, StoreError> {
        self.conn
            .query_row(
                "SELECT id, path, mtime_ns, size FROM files WHERE path = ?1",
                [path],
                |row| {
                    Ok(FileRecord {
                        id: row.get(0)?,
                        path: row.get(1)?,
                        mtime: row.get(2)?,
                        size: u64::try_from(row.get::<_, i64>(3)?).unwrap_or(0),
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// A file row with all of its derived rows, in line order.
    pub fn file_metadata(&self, path: &str) -> Result<Option<FileMetadata>, StoreError> {
        let Some(file) = self.get_file(path)? else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT target_path, link_type, line FROM links WHERE file_id = ?1 ORDER BY line, id",
        )?;
        let links = stmt.query_map([file.id], row_to_link)?.collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self
            .conn
            .prepare("SELECT tag, line FROM tags WHERE file_id = ?1 ORDER BY line, id")?;
        let tags = stmt
            .query_map([file.id], |row| Ok(TagRecord { tag: row.get(0)?, line: row.get(1)? }))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt =
            self.conn.prepare("SELECT key, value FROM frontmatter WHERE file_id = ?1")?;
        let frontmatter = stmt
            .query_map([file.id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT level, text, line FROM headers WHERE file_id = ?1 ORDER BY line, id",
        )?;
        let headers = stmt
            .query_map([file.id], |row| {
                Ok(HeaderRecord { level: row.get(0)?, text: row.get(1)?, line: row.get(2)? })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(FileMetadata { file, links, tags, frontmatter, headers }))
    }

    /// Paths of files carrying `tag`, sorted.
    pub fn files_with_tag(&self, tag: &str) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT f.path FROM tags t JOIN files f ON f.id = t.file_id
             WHERE t.tag = ?1 ORDER BY f.path",
        )?;
        let paths = stmt.query_map([tag], |row| row.get(0))?.collect::<Result<Vec<_>, _>>()?;
        Ok(paths)
    }

    /// Links whose raw target names `target`, with or without `.extension`.
    pub fn backlinks(&self, target: &str, extension: &str) -> Result<Vec<Backlink>, StoreError> {
        let suffix = format!(".{extension}");
        let bare = target.strip_suffix(suffix.as_str()).unwrap_or(target);
        let with_ext = format!("{bare}{suffix}");

        let mut stmt = self.conn.prepare(
            "SELECT f.path, l.target_path, l.link_type, l.line
             FROM links l JOIN files f ON f.id = l.file_id
             WHERE l.target_path IN (?1, ?2)
             ORDER BY f.path, l.line",
        )?;
        let links = stmt
            .query_map(params![bare, with_ext], |row| {
                Ok(Backlink {
                    source_path: row.get(0)?,
                    link: LinkRecord {
                        target_path: row.get(1)?,
                        link_type: parse_link_type(row.get::<_, String>(2)?),
                        line: row.get(3)?,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(links)
    }

    /// Ranked full-text search.
    ///
    /// `query` uses FTS5 MATCH syntax. A malformed expression, or a store
    /// without full-text search, yields an empty result instead of an error.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, StoreError> {
        if !self.search_available || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT f.path, {SEARCH_TABLE}.title,
                    snippet({SEARCH_TABLE}, -1, '**', '**', '...', 16)
             FROM {SEARCH_TABLE} JOIN files f ON f.id = {SEARCH_TABLE}.rowid
             WHERE {SEARCH_TABLE} MATCH ?1
             ORDER BY rank
             LIMIT ?2"
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let run = || -> Result<Vec<SearchHit>, rusqlite::Error> {
            let mut stmt = self.conn.prepare(&sql)?;
            let hits = stmt
                .query_map(params![query, limit], |row| {
                    Ok(SearchHit { path: row.get(0)?, title: row.get(1)?, snippet: row.get(2)? })
                })?
                .collect::<Result<Vec<_>, _>>();
            hits
        };

        match run() {
            Ok(hits) => Ok(hits),
            Err(e) => {
                tracing::debug!("Search query {:?} rejected: {}", query, e);
                Ok(Vec::new())
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statistics
    // ─────────────────────────────────────────────────────────────────────────

    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        let count = |table: &str| -> Result<i64, rusqlite::Error> {
            self.conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        };

        let search_entries =
            if self.search_available { count(SEARCH_TABLE).unwrap_or(0) } else { 0 };

        Ok(StoreStats {
            files: count("files")?,
            links: count("links")?,
            tags: count("tags")?,
            frontmatter: count("frontmatter")?,
            headers: count("headers")?,
            search_entries,
            search_available: self.search_available,
        })
    }

    #[cfg(test)]
    pub(crate) fn disable_search(&mut self) {
        self.search_available = false;
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn upsert_file_row(
    conn: &Connection,
    path: &str,
    mtime: i64,
    size: u64,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO files (path, mtime_ns, size) VALUES (?1, ?2, ?3)
         ON CONFLICT(path) DO UPDATE SET
            mtime_ns = excluded.mtime_ns,
            size = excluded.size",
        params![path, mtime, i64::try_from(size).unwrap_or(i64::MAX)],
    )?;

    // Get the ID (either new or existing)
    conn.query_row("SELECT id FROM files WHERE path = ?1", [path], |row| row.get(0))
}

fn clear_derived(conn: &Connection, file_id: i64, search: bool) -> Result<(), rusqlite::Error> {
    for table in ["links", "tags", "frontmatter", "headers"] {
        conn.execute(&format!("DELETE FROM {table} WHERE file_id = ?1"), [file_id])?;
    }
    if search {
        conn.execute(&format!("DELETE FROM {SEARCH_TABLE} WHERE rowid = ?1"), [file_id])?;
    }
    Ok(())
}

fn insert_links(
    conn: &Connection,
    file_id: i64,
    links: &[LinkRecord],
) -> Result<(), rusqlite::Error> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO links (file_id, target_path, link_type, line) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for link in links {
        stmt.execute(params![file_id, link.target_path, link.link_type.as_str(), link.line])?;
    }
    Ok(())
}

fn insert_tags(conn: &Connection, file_id: i64, tags: &[TagRecord]) -> Result<(), rusqlite::Error> {
    let mut stmt =
        conn.prepare_cached("INSERT INTO tags (file_id, tag, line) VALUES (?1, ?2, ?3)")?;
    for tag in tags {
        stmt.execute(params![file_id, tag.tag, tag.line])?;
    }
    Ok(())
}

fn insert_frontmatter(
    conn: &Connection,
    file_id: i64,
    fields: &[FrontmatterRecord],
) -> Result<(), rusqlite::Error> {
    let mut stmt =
        conn.prepare_cached("INSERT INTO frontmatter (file_id, key, value) VALUES (?1, ?2, ?3)")?;
    for field in fields {
        stmt.execute(params![file_id, field.key, field.value])?;
    }
    Ok(())
}

fn insert_headers(
    conn: &Connection,
    file_id: i64,
    headers: &[HeaderRecord],
) -> Result<(), rusqlite::Error> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO headers (file_id, level, text, line) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for header in headers {
        stmt.execute(params![file_id, header.level, header.text, header.line])?;
    }
    Ok(())
}

/// Replace the full-text row of a file. Only called when search is
/// available; errors abort the surrounding transaction.
fn write_search_entry(
    conn: &Connection,
    file_id: i64,
    title: &str,
    content: &str,
) -> Result<(), rusqlite::Error> {
    conn.execute(&format!("DELETE FROM {SEARCH_TABLE} WHERE rowid = ?1"), [file_id])?;
    conn.execute(
        &format!("INSERT INTO {SEARCH_TABLE} (rowid, title, content) VALUES (?1, ?2, ?3)"),
        params![file_id, title, content],
    )?;
    Ok(())
}

fn row_to_link(row: &rusqlite::Row) -> Result<LinkRecord, rusqlite::Error> {
    Ok(LinkRecord {
        target_path: row.get(0)?,
        link_type: parse_link_type(row.get::<_, String>(1)?),
        line: row.get(2)?,
    })
}

fn parse_link_type(s: String) -> LinkType {
    LinkType::parse(&s).unwrap_or(LinkType::Wikilink)
}
