//! Filesystem notifications turned into index update signals.
//!
//! Directory-level events say only that *something* changed below a path,
//! so they become [`ChangeSignal::Directory`] and are answered with a full
//! scan. Events naming a tracked document become [`ChangeSignal::File`] and
//! are answered with a targeted update.
//!
//! Directories are watched non-recursively, and only those that existed
//! when the watcher started. A directory created later is not watched;
//! its parent still reports the creation, which triggers a scan.

use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::Sender;

use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;

use super::walker::{VaultWalker, VaultWalkerError};
use crate::config::IndexSettings;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Vault walker error: {0}")]
    Walker(#[from] VaultWalkerError),

    #[error("Failed to watch {path}: {source}")]
    Notify {
        path: String,
        #[source]
        source: notify::Error,
    },
}

/// A change reported by the watcher, relative to the vault root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChangeSignal {
    /// Something changed under this directory (`""` is the root).
    Directory(String),
    /// This document changed, appeared or disappeared.
    File(String),
}

/// Watches a vault's directories and forwards [`ChangeSignal`]s.
///
/// Watching stops when this is dropped.
pub struct ChangeWatcher {
    _watcher: RecommendedWatcher,
    watched: Vec<PathBuf>,
}

impl ChangeWatcher {
    /// Watch `root` and every non-hidden directory below it.
    pub fn start(
        root: &Path,
        settings: &IndexSettings,
        sink: Sender<ChangeSignal>,
    ) -> Result<Self, WatchError> {
        let walker = VaultWalker::new(root, settings)?;
        let root = walker.root().to_path_buf();

        let handler_root = root.clone();
        let handler_settings = settings.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for signal in classify_event(&handler_root, &handler_settings, &event) {
                        let _ = sink.send(signal);
                    }
                }
                Err(e) => {
                    tracing::warn!("Watch error: {}", e);
                    let _ = sink.send(ChangeSignal::Directory(String::new()));
                }
            },
            Config::default(),
        )
        .map_err(|e| WatchError::Notify { path: root.display().to_string(), source: e })?;

        let mut watched = Vec::new();
        for dir in walker.directories() {
            match watcher.watch(&dir, RecursiveMode::NonRecursive) {
                Ok(()) => watched.push(dir),
                Err(e) if dir == root => {
                    return Err(WatchError::Notify { path: dir.display().to_string(), source: e });
                }
                Err(e) => tracing::warn!("Not watching {}: {}", dir.display(), e),
            }
        }

        tracing::debug!("Watching {} directories under {}", watched.len(), root.display());
        Ok(Self { _watcher: watcher, watched })
    }

    /// Absolute paths of the watched directories.
    pub fn watched_dirs(&self) -> &[PathBuf] {
        &self.watched
    }
}

/// Classify one notification. Paths outside `root` or inside hidden
/// directories are dropped.
pub fn classify_event(root: &Path, settings: &IndexSettings, event: &Event) -> Vec<ChangeSignal> {
    let mut signals = Vec::new();

    if event.need_rescan() || matches!(event.kind, EventKind::Any | EventKind::Other) {
        let dir = event
            .paths
            .first()
            .and_then(|p| visible_relative(root, settings, p))
            .unwrap_or_default();
        signals.push(ChangeSignal::Directory(dir));
        return signals;
    }

    if matches!(event.kind, EventKind::Access(_)) {
        return signals;
    }

    for path in &event.paths {
        let Some(rel) = visible_relative(root, settings, path) else {
            continue;
        };

        let folder_event = matches!(
            event.kind,
            EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder)
        );
        // A vanished or renamed path without an extension may have been a directory
        let maybe_dir = path.extension().is_none()
            && matches!(
                event.kind,
                EventKind::Remove(RemoveKind::Any) | EventKind::Modify(ModifyKind::Name(_))
            );

        let signal = if folder_event {
            ChangeSignal::Directory(rel)
        } else if settings.is_tracked(path) {
            ChangeSignal::File(rel)
        } else if path.is_dir() || maybe_dir {
            ChangeSignal::Directory(rel)
        } else {
            continue;
        };

        if !signals.contains(&signal) {
            signals.push(signal);
        }
    }

    signals
}

/// `/`-separated path relative to `root`, or `None` if outside it or
/// below a hidden directory. The root itself maps to `""`.
fn visible_relative(root: &Path, settings: &IndexSettings, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            _ => return None,
        }
    }

    let leaf_is_dir = path.is_dir();
    let hidden_upto = if leaf_is_dir { parts.len() } else { parts.len().saturating_sub(1) };
    if parts[..hidden_upto].iter().any(|p| settings.is_hidden_name(p)) {
        return None;
    }

    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{DataChange, Flag, RenameMode};
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("notes/daily")).unwrap();
        fs::create_dir_all(dir.path().join(".vaultsync")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        let root = dir.path().canonicalize().unwrap();
        (dir, root)
    }

    fn event(kind: EventKind, paths: &[&Path]) -> Event {
        paths.iter().fold(Event::new(kind), |e, p| e.add_path(p.to_path_buf()))
    }

    #[test]
    fn test_document_events_are_file_signals() {
        let (_dir, root) = setup();
        let settings = IndexSettings::default();

        let modify = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &[&root.join("notes/a.md")],
        );
        assert_eq!(
            classify_event(&root, &settings, &modify),
            vec![ChangeSignal::File("notes/a.md".to_string())]
        );

        let removed = event(EventKind::Remove(RemoveKind::File), &[&root.join("gone.md")]);
        assert_eq!(
            classify_event(&root, &settings, &removed),
            vec![ChangeSignal::File("gone.md".to_string())]
        );
    }

    #[test]
    fn test_rename_reports_both_sides() {
        let (_dir, root) = setup();
        let settings = IndexSettings::default();

        let rename = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &[&root.join("old.md"), &root.join("new.md")],
        );
        assert_eq!(
            classify_event(&root, &settings, &rename),
            vec![
                ChangeSignal::File("old.md".to_string()),
                ChangeSignal::File("new.md".to_string())
            ]
        );
    }

    #[test]
    fn test_directory_events_are_directory_signals() {
        let (_dir, root) = setup();
        let settings = IndexSettings::default();

        let created = event(EventKind::Create(CreateKind::Folder), &[&root.join("projects")]);
        assert_eq!(
            classify_event(&root, &settings, &created),
            vec![ChangeSignal::Directory("projects".to_string())]
        );

        let touched = event(
            EventKind::Modify(ModifyKind::Metadata(notify::event::MetadataKind::Any)),
            &[&root.join("notes/daily")],
        );
        assert_eq!(
            classify_event(&root, &settings, &touched),
            vec![ChangeSignal::Directory("notes/daily".to_string())]
        );

        let vanished = event(EventKind::Remove(RemoveKind::Any), &[&root.join("archive")]);
        assert_eq!(
            classify_event(&root, &settings, &vanished),
            vec![ChangeSignal::Directory("archive".to_string())]
        );
    }

    #[test]
    fn test_rescan_and_ambiguous_kinds() {
        let (_dir, root) = setup();
        let settings = IndexSettings::default();

        let rescan = Event::new(EventKind::Other).set_flag(Flag::Rescan);
        assert_eq!(
            classify_event(&root, &settings, &rescan),
            vec![ChangeSignal::Directory(String::new())]
        );

        let any = event(EventKind::Any, &[&root.join("notes")]);
        assert_eq!(
            classify_event(&root, &settings, &any),
            vec![ChangeSignal::Directory("notes".to_string())]
        );
    }

    #[test]
    fn test_ignored_paths() {
        let (_dir, root) = setup();
        let settings = IndexSettings::default();
        let create = |p: &Path| event(EventKind::Create(CreateKind::File), &[p]);

        for path in [
            root.join("image.png"),
            root.join(".vaultsync/index.db-wal"),
            root.join(".git/notes.md"),
            PathBuf::from("/somewhere/else.md"),
        ] {
            assert!(classify_event(&root, &settings, &create(&path)).is_empty(), "{path:?}");
        }

        let access = event(
            EventKind::Access(notify::event::AccessKind::Read),
            &[&root.join("a.md")],
        );
        assert!(classify_event(&root, &settings, &access).is_empty());
    }

    #[test]
    fn test_watches_visible_directories() {
        let (_dir, root) = setup();
        let (tx, _rx) = std::sync::mpsc::channel();

        let watcher = ChangeWatcher::start(&root, &IndexSettings::default(), tx).unwrap();
        let mut watched: Vec<_> = watcher
            .watched_dirs()
            .iter()
            .map(|d| d.strip_prefix(&root).unwrap().to_path_buf())
            .collect();
        watched.sort();

        assert_eq!(
            watched,
            vec![PathBuf::new(), PathBuf::from("notes"), PathBuf::from("notes/daily")]
        );
    }
}
