//! Edge case and error scenario tests

use std::fs;
use shelfcast_config::{Config, ConfigError, ConfigManager};
use tempfile::TempDir;

fn setup_test_manager() -> Result<(TempDir, ConfigManager), Box<dyn std::error::Error>> {
    let _ = env_logger::builder().is_test(true).try_init();
    let temp_dir = TempDir::new()?;
    let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf())?;
    Ok((temp_dir, manager))
}

#[test]
fn test_corrupted_config_uses_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    fs::write(manager.config_path(), "this is not valid TOML {{{")?;

    assert!(matches!(manager.load(), Err(ConfigError::ParseError { .. })));
    assert_eq!(manager.load_or_default(), Config::default());

    Ok(())
}

#[test]
fn test_save_creates_parent_directories() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let nested_path = temp_dir.path().join("a").join("b").join("c");
    let manager = ConfigManager::with_directory(nested_path)?;

    manager.save(&Config::default())?;
    assert!(manager.config_path().exists());

    Ok(())
}

#[test]
fn test_concurrent_config_loads() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let config_dir = temp_dir.path().to_path_buf();
    let manager = ConfigManager::with_directory(config_dir.clone())?;
    manager.initialize()?;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let dir = config_dir.clone();
            std::thread::spawn(move || {
                let manager = ConfigManager::with_directory(dir).ok()?;
                (0..10).map(|_| manager.load().ok()).collect::<Option<Vec<_>>>()
            })
        })
        .collect();

    for handle in handles {
        let loads = handle.join().map_err(|_| "loader thread panicked")?;
        assert_eq!(loads.map(|l| l.len()), Some(10));
    }

    Ok(())
}

#[test]
fn test_boundary_values_validation() {
    let mut config = Config::default();

    config.sync.retry_attempts = 1;
    config.sync.short_interval_ms = 500;
    config.sync.long_interval_ms = 1_000;
    assert!(config.validate().is_ok());

    config.sync.retry_attempts = 10;
    config.sync.long_interval_ms = 600_000;
    assert!(config.validate().is_ok());

    config.sync.retry_attempts = 11;
    assert!(config.validate().is_err());

    config.sync.retry_attempts = 3;
    config.sync.short_interval_ms = 499;
    assert!(config.validate().is_err());
}

#[test]
fn test_equal_intervals_are_allowed() {
    let mut config = Config::default();
    config.sync.short_interval_ms = 30_000;
    assert!(config.validate().is_ok());
}

#[test]
fn test_rapid_saves() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    let mut config = Config::default();

    for i in 0..100 {
        config.library.recent_limit = (i % 100) + 1;
        manager.save(&config)?;
    }

    assert_eq!(manager.load()?.library.recent_limit, 100);
    Ok(())
}

#[test]
fn test_merge_with_defaults_overrides() {
    let mut base = Config::default();
    base.library.hide_finished = true;
    base.merge(Config::default());

    assert!(!base.library.hide_finished);
}

#[test]
fn test_config_file_deleted_during_operation() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    manager.initialize()?;
    fs::remove_file(manager.config_path())?;

    assert_eq!(manager.load_or_default(), Config::default());
    Ok(())
}

#[test]
fn test_empty_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    fs::write(manager.config_path(), "")?;

    assert!(manager.load().is_err());
    assert_eq!(manager.load_or_default(), Config::default());
    Ok(())
}

#[test]
fn test_partial_config_toml() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    fs::write(
        manager.config_path(),
        r#"
version = 1

[server]
host = "http://192.168.1.10:13378"
"#,
    )?;

    let config = manager.load()?;
    assert_eq!(config.server.base_url(), Some("http://192.168.1.10:13378"));
    assert!(!config.server.is_configured());
    assert_eq!(config.sync, Default::default());

    Ok(())
}

#[test]
fn test_unknown_keys_are_ignored() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    fs::write(
        manager.config_path(),
        "[library]\nhide_finished = true\nshelf_color = \"teal\"\n",
    )?;

    assert!(manager.load()?.library.hide_finished);
    Ok(())
}

#[test]
fn test_invalid_values_are_loaded_with_warning() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    fs::write(manager.config_path(), "[sync]\nretry_attempts = 0\n")?;

    let config = manager.load()?;
    assert_eq!(config.sync.retry_attempts, 0);
    assert_eq!(manager.validate()?.len(), 1);
    Ok(())
}

#[test]
fn test_update_with_invalid_value() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    manager.initialize()?;

    let result = manager.update(|config| {
        config.server.host = Some("abs.example.org".to_string());
    });
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));

    assert_eq!(manager.load()?.server.host, None);
    Ok(())
}

#[test]
fn test_tolerance_precision() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::default();
    config.library.finished_tolerance_secs = Some(1.23456789);

    let toml = toml::to_string(&config)?;
    let deserialized: Config = toml::from_str(&toml)?;

    let tolerance = deserialized.library.finished_tolerance_secs.unwrap_or_default();
    assert!((tolerance - 1.23456789).abs() < 0.0001);
    Ok(())
}

#[test]
fn test_backup_preserved_on_failed_save() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    let mut config = Config::default();
    config.library.recent_limit = 7;
    manager.save(&config)?;
    manager.save(&config)?;

    config.library.recent_limit = 0;
    assert!(manager.save(&config).is_err());

    let backup_path = manager.config_path().with_extension("toml.backup");
    let backup_config: Config = toml::from_str(&fs::read_to_string(&backup_path)?)?;
    assert_eq!(backup_config.library.recent_limit, 7);
    assert_eq!(manager.load()?.library.recent_limit, 7);

    Ok(())
}
