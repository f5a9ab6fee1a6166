use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::{env, fs};

use dirs::home_dir;
use thiserror::Error;

use crate::config::types::{ConfigFile, LoggingConfig, ResolvedConfig};

/// Profile used when neither the file nor the caller names one.
const FALLBACK_PROFILE: &str = "default";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found at {0}")]
    NotFound(String),

    #[error("failed to read config file {0}: {1}")]
    ReadError(String, #[source] std::io::Error),

    #[error("failed to parse TOML in {0}: {1}")]
    ParseError(String, #[source] toml::de::Error),

    #[error("profile '{0}' not found")]
    ProfileNotFound(String),

    #[error("no profiles defined in config")]
    NoProfiles,

    #[error("version {0} is unsupported (expected 1)")]
    BadVersion(u32),

    #[error("home directory not available to expand '~'")]
    NoHome,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load `config_path` (or the default location) and resolve one profile.
    pub fn load(
        config_path: Option<&Path>,
        profile_override: Option<&str>,
    ) -> Result<ResolvedConfig, ConfigError> {
        let path = config_path.map_or_else(default_config_path, Path::to_path_buf);
        let shown = path.display().to_string();

        let text = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigError::NotFound(shown.clone()),
            _ => ConfigError::ReadError(shown.clone(), e),
        })?;

        Self::from_toml(&text, &path, profile_override)
    }

    /// Resolve configuration from TOML text; `origin` is only used in errors.
    pub fn from_toml(
        text: &str,
        origin: &Path,
        profile_override: Option<&str>,
    ) -> Result<ResolvedConfig, ConfigError> {
        let file: ConfigFile = toml::from_str(text)
            .map_err(|e| ConfigError::ParseError(origin.display().to_string(), e))?;

        if file.version != 1 {
            return Err(ConfigError::BadVersion(file.version));
        }
        if file.profiles.is_empty() {
            return Err(ConfigError::NoProfiles);
        }

        let name = profile_override
            .or(file.profile.as_deref())
            .unwrap_or(FALLBACK_PROFILE)
            .to_string();
        let Some(profile) = file.profiles.get(&name) else {
            return Err(ConfigError::ProfileNotFound(name));
        };

        let vault_root = expand_path(&profile.vault_root)?;
        let logging = resolve_logging(file.logging, &vault_root)?;

        Ok(ResolvedConfig {
            active_profile: name,
            vault_root,
            index: file.index.normalized(),
            logging,
        })
    }
}

/// Expand the log file path, substituting `{{vault_root}}` first.
fn resolve_logging(
    mut logging: LoggingConfig,
    vault_root: &Path,
) -> Result<LoggingConfig, ConfigError> {
    if let Some(file) = logging.file.take() {
        let raw = file.to_string_lossy().replace("{{vault_root}}", &vault_root.to_string_lossy());
        logging.file = Some(expand_path(&raw)?);
    }
    Ok(logging)
}

/// `$XDG_CONFIG_HOME/vaultsync/config.toml`, else under `~/.config`.
pub fn default_config_path() -> PathBuf {
    let base = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("vaultsync").join("config.toml")
}

fn expand_path(input: &str) -> Result<PathBuf, ConfigError> {
    shellexpand::full(input)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .map_err(|_| ConfigError::NoHome)
}
