use anyhow::Result;
use ironsplit::config::SettingsStore;
use ironsplit::Settings;
use serde_json::json;
use std::fs;

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SettingsStore::load_from(dir.path().join("nope/config.json"));

    assert_eq!(store.settings, Settings::default());
    assert!(store.settings.enable_logging);
    assert!(store.settings.retain_header);
    assert!(!store.settings.open_dir_after_split);
    assert_eq!(store.settings.default_output_file_type, ".csv");
}

#[test]
fn save_then_load_round_trips() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("FileSplitterPro/config.json");

    let mut store = SettingsStore::load_from(&path);
    store.set("retain_header", "false")?;
    store.set("default_output_file_type", "txt")?;
    store.save()?;

    let reloaded = SettingsStore::load_from(&path);
    assert!(!reloaded.settings.retain_header);
    assert_eq!(reloaded.settings.default_output_file_type, ".txt");
    assert_eq!(reloaded.get("retain_header"), Some(json!(false)));
    Ok(())
}

#[test]
fn stored_keys_merge_over_defaults() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"enable_logging": false, "unknown_key": 5}"#)?;

    let store = SettingsStore::load_from(&path);

    assert!(!store.settings.enable_logging);
    assert!(store.settings.retain_header);
    assert_eq!(store.settings.default_output_file_type, ".csv");
    Ok(())
}

#[test]
fn corrupt_file_falls_back_to_defaults() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.json");
    fs::write(&path, "{not json")?;

    let store = SettingsStore::load_from(&path);

    assert_eq!(store.settings, Settings::default());
    Ok(())
}

#[test]
fn set_rejects_bad_input_and_reset_restores_defaults() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut store = SettingsStore::load_from(dir.path().join("config.json"));

    assert!(store.set("no_such_key", "true").is_err());
    assert!(store.set("enable_logging", "maybe").is_err());
    assert!(store.set("default_output_file_type", "  ").is_err());
    assert_eq!(store.get("no_such_key"), None);

    store.set("open_dir_after_split", "yes")?;
    assert!(store.settings.open_dir_after_split);
    store.reset();
    assert_eq!(store.settings, Settings::default());
    Ok(())
}
