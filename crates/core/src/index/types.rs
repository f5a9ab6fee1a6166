//! Index data types for vault files and their derived rows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::vault::ExtractedMetadata;

/// Type of link between documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    /// `[[target]]` or `[[target|alias]]`.
    Wikilink,
    /// `[text](target)` or `![alt](target)`.
    Markdown,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wikilink => "wikilink",
            Self::Markdown => "markdown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "wikilink" => Some(Self::Wikilink),
            "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }
}

/// One indexed document, keyed by its relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub id: i64,
    /// `/`-separated path relative to the vault root.
    pub path: String,
    /// Modification time in nanoseconds since the Unix epoch.
    pub mtime: i64,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    /// Raw, unresolved target as written in the document.
    pub target_path: String,
    pub link_type: LinkType,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRecord {
    pub tag: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrontmatterRecord {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderRecord {
    pub level: u8,
    pub text: String,
    pub line: u32,
}

/// Everything written for one document in a single transaction.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub path: String,
    pub mtime: i64,
    pub size: u64,
    pub title: String,
    pub content: String,
    pub links: Vec<LinkRecord>,
    pub tags: Vec<TagRecord>,
    pub frontmatter: Vec<FrontmatterRecord>,
    pub headers: Vec<HeaderRecord>,
}

impl DocumentRecord {
    /// Assemble a record from extracted metadata and the raw text.
    pub fn from_extracted(
        path: String,
        mtime: i64,
        size: u64,
        title: String,
        content: String,
        meta: ExtractedMetadata,
    ) -> Self {
        Self {
            path,
            mtime,
            size,
            title,
            content,
            links: meta
                .links
                .into_iter()
                .map(|l| LinkRecord {
                    target_path: l.target,
                    link_type: l.link_type,
                    line: l.line,
                })
                .collect(),
            tags: meta
                .tags
                .into_iter()
                .map(|t| TagRecord { tag: t.tag, line: t.line })
                .collect(),
            frontmatter: meta
                .frontmatter
                .into_iter()
                .map(|(key, value)| FrontmatterRecord { key, value })
                .collect(),
            headers: meta
                .headers
                .into_iter()
                .map(|h| HeaderRecord { level: h.level, text: h.text, line: h.line })
                .collect(),
        }
    }
}

/// A file row together with all of its derived rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMetadata {
    pub file: FileRecord,
    pub links: Vec<LinkRecord>,
    pub tags: Vec<TagRecord>,
    pub frontmatter: BTreeMap<String, String>,
    pub headers: Vec<HeaderRecord>,
}

/// A link pointing at a queried target, with the file containing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Backlink {
    pub source_path: String,
    pub link: LinkRecord,
}

/// A ranked full-text match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub path: String,
    pub title: String,
    pub snippet: String,
}

/// Row counts across the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub files: i64,
    pub links: i64,
    pub tags: i64,
    pub frontmatter: i64,
    pub headers: i64,
    pub search_entries: i64,
    pub search_available: bool,
}
