use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;
use vaultsync_core::config::loader::ConfigLoader;

fn write_file(path: &PathBuf, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn load_default_profile_ok() {
    let tmp = tempdir().unwrap();
    let cfg_path = tmp.path().join("config.toml");
    let toml = r#"
version = 1
profile = "default"

[profiles.default]
vault_root = "/tmp/vault"

[index]
extension = ".markdown"
workers = 8
queue_capacity = 16

[logging]
level = "debug"
file = "{{vault_root}}/.vaultsync/vsync.log"
"#;

    write_file(&cfg_path, toml);

    let rc = ConfigLoader::load(Some(&cfg_path), None).expect("should load");
    assert_eq!(rc.active_profile, "default");
    assert_eq!(rc.vault_root.display().to_string(), "/tmp/vault");
    assert_eq!(rc.index.extension, "markdown");
    assert_eq!(rc.index.workers, 8);
    assert_eq!(rc.index.update_workers, 2);
    assert_eq!(rc.index.queue_capacity, 16);
    assert_eq!(rc.index.hidden_prefix, ".");
    assert_eq!(rc.logging.level, "debug");
    assert_eq!(
        rc.logging.file.unwrap().display().to_string(),
        "/tmp/vault/.vaultsync/vsync.log"
    );
}

#[test]
fn index_section_is_optional() {
    let toml = r#"
version = 1
[profiles.default]
vault_root = "/tmp/vault"
"#;
    let rc = ConfigLoader::from_toml(toml, &PathBuf::from("inline.toml"), None).unwrap();
    assert_eq!(rc.active_profile, "default");
    assert_eq!(rc.index.extension, "md");
    assert_eq!(rc.index.workers, 4);
    assert_eq!(rc.logging.level, "info");
    assert!(rc.logging.file.is_none());
}

#[test]
fn load_with_profile_override_ok() {
    let tmp = tempdir().unwrap();
    let cfg_path = tmp.path().join("vaultsync/config.toml");
    let toml = r#"
version = 1
profile = "default"

[profiles.default]
vault_root = "/tmp/def"

[profiles.work]
vault_root = "/tmp/work"
"#;
    write_file(&cfg_path, toml);

    let rc = ConfigLoader::load(Some(&cfg_path), Some("work")).expect("should load");
    assert_eq!(rc.active_profile, "work");
    assert_eq!(rc.vault_root.display().to_string(), "/tmp/work");
}
