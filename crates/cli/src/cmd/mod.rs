//! Subcommand implementations.
//!
//! Commands print to stdout, report errors on stderr and exit with status 1
//! on failure.

pub mod backlinks;
pub mod files;
pub mod output;
pub mod scan;
pub mod search;
pub mod show;
pub mod status;
pub mod tags;
pub mod update;
pub mod watch;

use std::path::Path;

use vaultsync_core::config::{ConfigError, ConfigLoader, ResolvedConfig};
use vaultsync_core::index::{IndexCoordinator, MetadataStore, StoreConnection};

/// Load the config file, letting `--vault` stand in for a missing default
/// config and override the profile's vault root otherwise.
pub fn resolve_config(
    config: Option<&Path>,
    profile: Option<&str>,
    vault: Option<&Path>,
) -> ResolvedConfig {
    match (ConfigLoader::load(config, profile), vault) {
        (Ok(mut rc), Some(vault)) => {
            rc.vault_root = vault.to_path_buf();
            rc
        }
        (Ok(rc), None) => rc,
        (Err(ConfigError::NotFound(_)), Some(vault)) if config.is_none() => {
            ResolvedConfig::for_vault(vault.to_path_buf())
        }
        (Err(e), _) => {
            eprintln!("Error loading config: {}", e);
            if vault.is_none() {
                eprintln!("Hint: Pass --vault <DIR> to run without a config file.");
            }
            std::process::exit(1);
        }
    }
}

/// Open the vault's store for reading.
pub fn open_store(rc: &ResolvedConfig) -> MetadataStore {
    ensure_vault(rc);
    match MetadataStore::open(&rc.vault_root, &rc.index) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error opening index: {}", e);
            std::process::exit(1);
        }
    }
}

/// Open a connection for one-shot queries.
pub fn connect(rc: &ResolvedConfig) -> (MetadataStore, StoreConnection) {
    let store = open_store(rc);
    match store.connect() {
        Ok(conn) => (store, conn),
        Err(e) => {
            eprintln!("Error opening index: {}", e);
            std::process::exit(1);
        }
    }
}

/// Open a coordinator for commands that write to the index.
pub fn open_coordinator(rc: &ResolvedConfig) -> IndexCoordinator {
    ensure_vault(rc);
    match IndexCoordinator::open(&rc.vault_root, &rc.index) {
        Ok(coordinator) => coordinator,
        Err(e) => {
            eprintln!("Error opening index: {}", e);
            std::process::exit(1);
        }
    }
}

fn ensure_vault(rc: &ResolvedConfig) {
    if !rc.vault_root.is_dir() {
        eprintln!("Vault root does not exist: {}", rc.vault_root.display());
        std::process::exit(1);
    }
}

/// Exit with a database error, hinting at a scan when the index is empty.
pub fn query_failed(what: &str, e: impl std::fmt::Display) -> ! {
    eprintln!("Error {}: {}", what, e);
    eprintln!("Hint: Run 'vsync scan' to build the index first.");
    std::process::exit(1);
}
