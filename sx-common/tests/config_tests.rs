//! Tests for configuration resolution
//!
//! Tests that redirect XDG_CONFIG_HOME are marked #[serial] so they do not
//! race each other on the process environment.

use serial_test::serial;
use std::env;
use std::path::PathBuf;
use sx_common::config::{
    find_config_file, load_toml_config, ConfigOverrides, ServiceConfig, DEFAULT_BIND_ADDR,
};
use tempfile::TempDir;

fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_explicit_config_file_is_loaded() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
        bind_addr = "0.0.0.0:8080"
        database_path = "/srv/syntaxia/progress.db"
        log_level = "debug"
        "#,
    );

    let config = ServiceConfig::resolve(ConfigOverrides {
        config_file: Some(path),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(config.bind_addr, "0.0.0.0:8080");
    assert_eq!(config.database_path, PathBuf::from("/srv/syntaxia/progress.db"));
    assert_eq!(config.log_level, "debug");
}

#[test]
fn test_cli_values_override_file_values() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "bind_addr = \"0.0.0.0:8080\"\nlog_level = \"warn\"\n");

    let config = ServiceConfig::resolve(ConfigOverrides {
        config_file: Some(path),
        bind_addr: Some("127.0.0.1:9999".to_string()),
        database_path: None,
        log_level: None,
    })
    .unwrap();

    assert_eq!(config.bind_addr, "127.0.0.1:9999");
    assert_eq!(config.log_level, "warn");
}

#[test]
fn test_missing_explicit_config_file_is_an_error() {
    let result = ServiceConfig::resolve(ConfigOverrides {
        config_file: Some(PathBuf::from("/nonexistent/syntaxia/config.toml")),
        ..Default::default()
    });

    assert!(result.is_err());
}

#[test]
fn test_malformed_config_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "bind_addr = [not valid");

    assert!(load_toml_config(&path).is_err());
}

#[test]
#[serial]
fn test_config_file_discovered_under_xdg_config_home() {
    let dir = TempDir::new().unwrap();
    let app_dir = dir.path().join("syntaxia");
    std::fs::create_dir_all(&app_dir).unwrap();
    std::fs::write(app_dir.join("config.toml"), "log_level = \"trace\"\n").unwrap();

    let previous = env::var_os("XDG_CONFIG_HOME");
    env::set_var("XDG_CONFIG_HOME", dir.path());

    let found = find_config_file();
    let config = ServiceConfig::resolve(ConfigOverrides::default()).unwrap();

    match previous {
        Some(value) => env::set_var("XDG_CONFIG_HOME", value),
        None => env::remove_var("XDG_CONFIG_HOME"),
    }

    if cfg!(target_os = "linux") {
        assert_eq!(found, Some(app_dir.join("config.toml")));
        assert_eq!(config.log_level, "trace");
    }
}

#[test]
#[serial]
fn test_no_config_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();

    let previous = env::var_os("XDG_CONFIG_HOME");
    env::set_var("XDG_CONFIG_HOME", dir.path());

    let result = ServiceConfig::resolve(ConfigOverrides::default());

    match previous {
        Some(value) => env::set_var("XDG_CONFIG_HOME", value),
        None => env::remove_var("XDG_CONFIG_HOME"),
    }

    // A system-wide /etc/syntaxia/config.toml could still be present
    let config = result.unwrap();
    if !PathBuf::from("/etc/syntaxia/config.toml").exists() {
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
    }
}
