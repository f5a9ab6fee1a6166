//! Configuration file loading.

pub mod loader;
pub mod types;

pub use loader::{ConfigError, ConfigLoader, default_config_path};
pub use types::{IndexSettings, LoggingConfig, ResolvedConfig, STORE_DIR_NAME};
