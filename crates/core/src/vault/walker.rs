//! Recursive vault directory walker.

use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use walkdir::WalkDir;

use crate::config::IndexSettings;

#[derive(Debug, Error)]
pub enum VaultWalkerError {
    #[error("vault root does not exist: {0}")]
    MissingRoot(String),
}

/// Information about a discovered markdown file.
#[derive(Debug, Clone)]
pub struct WalkedFile {
    /// Absolute path to the file.
    pub absolute_path: PathBuf,
    /// Path relative to vault root.
    pub relative_path: PathBuf,
    /// File modification time.
    pub modified: SystemTime,
    /// File size in bytes.
    pub size: u64,
}

impl WalkedFile {
    /// Store key for this file (`/`-separated relative path).
    pub fn key(&self) -> String {
        relative_key(&self.relative_path)
    }

    pub fn mtime(&self) -> i64 {
        mtime_nanos(self.modified)
    }
}

/// Walker for discovering tracked documents in a vault.
#[derive(Debug, Clone)]
pub struct VaultWalker {
    root: PathBuf,
    extension: String,
    hidden_prefix: String,
}

impl VaultWalker {
    /// Create a new walker for the given vault root.
    pub fn new(root: &Path, settings: &IndexSettings) -> Result<Self, VaultWalkerError> {
        let root = root
            .canonicalize()
            .map_err(|_| VaultWalkerError::MissingRoot(root.display().to_string()))?;

        if !root.is_dir() {
            return Err(VaultWalkerError::MissingRoot(root.display().to_string()));
        }

        Ok(Self {
            root,
            extension: settings.extension.clone(),
            hidden_prefix: settings.hidden_prefix.clone(),
        })
    }

    /// Walk the vault and return all tracked files, sorted by relative path.
    ///
    /// Entries that disappear while the walk is in progress are skipped.
    /// Only a vanished root is an error, so a scan never mistakes an
    /// unmounted vault for an empty one.
    pub fn walk(&self) -> Result<Vec<WalkedFile>, VaultWalkerError> {
        if !self.root.is_dir() {
            return Err(VaultWalkerError::MissingRoot(self.root.display().to_string()));
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !self.is_pruned(e))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Skipping unreadable vault entry: {}", e);
                    continue;
                }
            };

            let file_type = entry.file_type();
            let candidate = file_type.is_file() || file_type.is_symlink();
            if !candidate || !self.is_tracked(entry.path()) {
                continue;
            }

            // Symlinked documents count when their target is a regular file,
            // matching the stat a targeted update performs.
            let metadata = match std::fs::metadata(entry.path()) {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!(
                        "Skipping {} (vanished during walk): {}",
                        entry.path().display(),
                        e
                    );
                    continue;
                }
            };

            let path = entry.path();
            let relative_path = path.strip_prefix(&self.root).unwrap_or(path).to_path_buf();

            files.push(WalkedFile {
                absolute_path: path.to_path_buf(),
                relative_path,
                modified: metadata.modified().unwrap_or(UNIX_EPOCH),
                size: metadata.len(),
            });
        }

        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(files)
    }

    /// The root plus every non-hidden directory beneath it, as absolute paths.
    pub fn directories(&self) -> Vec<PathBuf> {
        WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !self.is_pruned(e))
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_dir())
            .map(|e| e.path().to_path_buf())
            .collect()
    }

    /// Hidden directories are pruned entirely; the root never is.
    fn is_pruned(&self, entry: &walkdir::DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }

        let name = entry.file_name().to_string_lossy();
        !self.hidden_prefix.is_empty() && name.starts_with(&self.hidden_prefix)
    }

    fn is_tracked(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()).is_some_and(|e| e == self.extension)
    }

    /// Get the vault root path.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Convert a relative path into the `/`-separated key used by the store.
pub fn relative_key(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Nanoseconds since the Unix epoch, negative for earlier timestamps.
pub fn mtime_nanos(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_nanos()).unwrap_or(i64::MAX),
        Err(e) => -i64::try_from(e.duration().as_nanos()).unwrap_or(i64::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_vault() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        // Create some markdown files
        fs::write(root.join("note1.md"), "# Note 1").unwrap();
        fs::write(root.join("note2.md"), "# Note 2").unwrap();

        // Create subdirectory with notes
        fs::create_dir(root.join("subdir")).unwrap();
        fs::write(root.join("subdir/note3.md"), "# Note 3").unwrap();

        // Create hidden directory (should be skipped)
        fs::create_dir(root.join(".hidden")).unwrap();
        fs::write(root.join(".hidden/secret.md"), "# Secret").unwrap();
        fs::create_dir(root.join(".hidden/deeper")).unwrap();

        // Create non-markdown file (should be skipped)
        fs::write(root.join("readme.txt"), "Not markdown").unwrap();

        dir
    }

    fn walker_for(root: &Path) -> VaultWalker {
        VaultWalker::new(root, &IndexSettings::default()).unwrap()
    }

    #[test]
    fn test_walk_finds_markdown_files() {
        let vault = create_test_vault();
        let files = walker_for(vault.path()).walk().unwrap();

        assert_eq!(files.len(), 3);

        let keys: Vec<_> = files.iter().map(WalkedFile::key).collect();
        assert!(keys.contains(&"note1.md".to_string()));
        assert!(keys.contains(&"note2.md".to_string()));
        assert!(keys.contains(&"subdir/note3.md".to_string()));
    }

    #[test]
    fn test_walk_skips_hidden_directories() {
        let vault = create_test_vault();
        let files = walker_for(vault.path()).walk().unwrap();

        assert!(!files.iter().any(|f| f.key().contains(".hidden")));
    }

    #[test]
    fn test_walk_skips_other_extensions() {
        let vault = create_test_vault();
        let files = walker_for(vault.path()).walk().unwrap();

        assert!(!files.iter().any(|f| f.key().contains("readme.txt")));
    }

    #[test]
    fn test_walk_honours_configured_extension() {
        let vault = create_test_vault();
        let settings =
            IndexSettings { extension: "txt".to_string(), ..Default::default() };
        let files = VaultWalker::new(vault.path(), &settings).unwrap().walk().unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].key(), "readme.txt");
    }

    #[test]
    fn test_walk_results_sorted() {
        let vault = create_test_vault();
        let files = walker_for(vault.path()).walk().unwrap();

        let paths: Vec<_> = files.iter().map(|f| &f.relative_path).collect();
        let mut sorted = paths.clone();
        sorted.sort();

        assert_eq!(paths, sorted);
    }

    #[test]
    fn test_walk_reports_size_and_mtime() {
        let vault = create_test_vault();
        let files = walker_for(vault.path()).walk().unwrap();
        let note1 = files.iter().find(|f| f.key() == "note1.md").unwrap();

        assert_eq!(note1.size, "# Note 1".len() as u64);
        let on_disk = fs::metadata(vault.path().join("note1.md")).unwrap();
        assert_eq!(note1.mtime(), mtime_nanos(on_disk.modified().unwrap()));
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_follows_symlinked_documents() {
        let vault = create_test_vault();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("target.md"), "# Linked").unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("target.md"),
            vault.path().join("linked.md"),
        )
        .unwrap();
        std::os::unix::fs::symlink(outside.path().join("gone.md"), vault.path().join("dangling.md"))
            .unwrap();

        let files = walker_for(vault.path()).walk().unwrap();
        let keys: Vec<_> = files.iter().map(WalkedFile::key).collect();

        assert!(keys.contains(&"linked.md".to_string()));
        assert!(!keys.contains(&"dangling.md".to_string()));
        let linked = files.iter().find(|f| f.key() == "linked.md").unwrap();
        assert_eq!(linked.size, "# Linked".len() as u64);
    }

    #[test]
    fn test_directories_exclude_hidden() {
        let vault = create_test_vault();
        let walker = walker_for(vault.path());
        let dirs = walker.directories();

        assert_eq!(dirs.len(), 2);
        assert!(dirs.contains(&walker.root().to_path_buf()));
        assert!(dirs.contains(&walker.root().join("subdir")));
    }

    #[test]
    fn test_missing_root() {
        let result = VaultWalker::new(Path::new("/nonexistent/path"), &IndexSettings::default());
        assert!(matches!(result.unwrap_err(), VaultWalkerError::MissingRoot(_)));
    }

    #[test]
    fn test_root_removed_after_setup() {
        let vault = create_test_vault();
        let walker = walker_for(vault.path());
        fs::remove_dir_all(vault.path()).unwrap();

        assert!(matches!(walker.walk(), Err(VaultWalkerError::MissingRoot(_))));
    }

    #[test]
    fn test_relative_key_uses_forward_slashes() {
        let path: PathBuf = ["a", "b", "c.md"].iter().collect();
        assert_eq!(relative_key(&path), "a/b/c.md");
    }
}
