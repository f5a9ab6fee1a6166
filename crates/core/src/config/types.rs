use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ConfigFile {
    pub version: u32,
    pub profile: Option<String>,
    pub profiles: HashMap<String, Profile>,
    #[serde(default)]
    pub index: IndexSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct Profile {
    pub vault_root: String,
}

/// Tunables for walking, storing and indexing a vault.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct IndexSettings {
    /// The single tracked document extension, without the leading dot.
    pub extension: String,
    /// Name prefix marking hidden entries. Hidden directories are pruned
    /// from walks and the store lives in a directory carrying this prefix.
    pub hidden_prefix: String,
    /// Threads in the per-document scan pool.
    pub workers: usize,
    /// Threads draining the targeted update queue.
    pub update_workers: usize,
    /// Pending targeted updates before `update_file` blocks.
    pub queue_capacity: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            extension: "md".to_string(),
            hidden_prefix: ".".to_string(),
            workers: 4,
            update_workers: 2,
            queue_capacity: 64,
        }
    }
}

/// Directory name of the store, appended to the hidden prefix.
pub const STORE_DIR_NAME: &str = "vaultsync";

impl IndexSettings {
    /// Clamp counts to at least one and strip a leading dot from the extension.
    pub fn normalized(mut self) -> Self {
        self.extension = self.extension.trim_start_matches('.').to_string();
        if self.extension.is_empty() {
            self.extension = "md".to_string();
        }
        self.workers = self.workers.max(1);
        self.update_workers = self.update_workers.max(1);
        self.queue_capacity = self.queue_capacity.max(1);
        self
    }

    /// Hidden directory holding the index database.
    pub fn store_dir(&self, vault_root: &Path) -> PathBuf {
        vault_root.join(format!("{}{}", self.hidden_prefix, STORE_DIR_NAME))
    }

    pub fn is_hidden_name(&self, name: &str) -> bool {
        !self.hidden_prefix.is_empty() && name.starts_with(&self.hidden_prefix)
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()).is_some_and(|e| e == self.extension)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file_level: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), file_level: None, file: None }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub active_profile: String,
    pub vault_root: PathBuf,
    pub index: IndexSettings,
    pub logging: LoggingConfig,
}

impl ResolvedConfig {
    /// Configuration for a vault given directly, without a config file.
    pub fn for_vault(vault_root: PathBuf) -> Self {
        Self {
            active_profile: "default".to_string(),
            vault_root,
            index: IndexSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_strips_dot_and_clamps() {
        let settings = IndexSettings {
            extension: ".markdown".to_string(),
            workers: 0,
            update_workers: 0,
            queue_capacity: 0,
            ..Default::default()
        }
        .normalized();

        assert_eq!(settings.extension, "markdown");
        assert_eq!(settings.workers, 1);
        assert_eq!(settings.update_workers, 1);
        assert_eq!(settings.queue_capacity, 1);
    }

    #[test]
    fn test_store_dir_uses_hidden_prefix() {
        let settings = IndexSettings::default();
        assert_eq!(
            settings.store_dir(Path::new("/vault")),
            PathBuf::from("/vault/.vaultsync")
        );
    }

    #[test]
    fn test_is_tracked() {
        let settings = IndexSettings::default();
        assert!(settings.is_tracked(Path::new("notes/a.md")));
        assert!(!settings.is_tracked(Path::new("notes/a.txt")));
        assert!(!settings.is_tracked(Path::new("notes/md")));
    }
}
