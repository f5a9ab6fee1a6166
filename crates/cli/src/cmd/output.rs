//! Shared output formatting for query commands.

use chrono::{DateTime, Local};
use serde::Serialize;
use vaultsync_core::index::{Backlink, SearchHit};

/// Indexed file for listing.
#[derive(Debug, Serialize)]
pub struct FileOutput {
    pub path: String,
    /// Nanoseconds since the Unix epoch, as stored.
    pub mtime: i64,
    pub modified: String,
}

impl FileOutput {
    pub fn new(path: String, mtime: i64) -> Self {
        Self { modified: format_mtime(mtime), path, mtime }
    }
}

/// Local time for a stored nanosecond timestamp.
pub fn format_mtime(nanos: i64) -> String {
    DateTime::from_timestamp_nanos(nanos)
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// Print search hits as a table.
pub fn print_hits_table(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("(no results found)");
        return;
    }

    let path_width = hits.iter().map(|h| h.path.len()).max().unwrap_or(4).clamp(4, 40);
    let title_width = hits.iter().map(|h| h.title.len()).max().unwrap_or(5).clamp(5, 30);

    println!(
        "{:<path_width$}  {:<title_width$}  SNIPPET",
        "PATH",
        "TITLE",
        path_width = path_width,
        title_width = title_width,
    );
    println!(
        "{:-<path_width$}  {:-<title_width$}  {:-<7}",
        "",
        "",
        "",
        path_width = path_width,
        title_width = title_width,
    );

    for hit in hits {
        println!(
            "{:<path_width$}  {:<title_width$}  {}",
            truncate(&hit.path, path_width),
            truncate(&hit.title, title_width),
            truncate(&hit.snippet, 60),
            path_width = path_width,
            title_width = title_width,
        );
    }

    println!();
    println!("-- {} results --", hits.len());
}

/// Print indexed files as a table.
pub fn print_files_table(files: &[FileOutput]) {
    if files.is_empty() {
        println!("(no files indexed)");
        return;
    }

    let path_width = files.iter().map(|f| f.path.len()).max().unwrap_or(4).clamp(4, 60);

    println!("{:<path_width$}  MODIFIED", "PATH", path_width = path_width);
    println!("{:-<path_width$}  {:-<16}", "", "", path_width = path_width);

    for file in files {
        println!(
            "{:<path_width$}  {}",
            truncate(&file.path, path_width),
            file.modified,
            path_width = path_width,
        );
    }

    println!();
    println!("-- {} files --", files.len());
}

/// Print backlinks as a table.
pub fn print_backlinks_table(links: &[Backlink]) {
    if links.is_empty() {
        println!("(no backlinks found)");
        return;
    }

    let path_width =
        links.iter().map(|l| l.source_path.len()).max().unwrap_or(4).clamp(4, 50);
    let type_width = 10;

    println!(
        "{:<path_width$}  {:<type_width$}  LINE",
        "PATH",
        "LINK_TYPE",
        path_width = path_width,
        type_width = type_width
    );
    println!(
        "{:-<path_width$}  {:-<type_width$}  {:-<6}",
        "",
        "",
        "",
        path_width = path_width,
        type_width = type_width
    );

    for link in links {
        println!(
            "{:<path_width$}  {:<type_width$}  {}",
            truncate(&link.source_path, path_width),
            link.link.link_type.as_str(),
            link.link.line,
            path_width = path_width,
            type_width = type_width,
        );
    }

    println!();
    println!("-- {} backlinks --", links.len());
}

/// Print any serializable value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

/// Truncate string with ellipsis if needed.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer path", 8), "a lon...");
        assert_eq!(truncate("abcdef", 2), "ab");
        assert_eq!(truncate("ñandú über", 6), "ñan...");
    }

    #[test]
    fn test_format_mtime_shape() {
        let formatted = format_mtime(1_700_000_000_000_000_000);
        assert_eq!(formatted.len(), 16);
        assert!(formatted.starts_with("2023-11-1"));
    }
}
