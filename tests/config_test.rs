//! Integration tests for configuration loading

use memory_probe::config::{validate_config, Config, ConfigError, ConfigLoader};
use memory_probe::ScanLimits;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_partial_file_merges_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memory-probe.toml");
    fs::write(
        &path,
        r#"
[scanner]
max_results = 500
chunk_size = 65536

[logging]
level = "debug"
file = "probe.log"
"#,
    )
    .unwrap();

    let config = ConfigLoader::new(&path).load().unwrap();
    assert_eq!(config.scanner.max_results, 500);
    assert_eq!(config.scanner.chunk_size, 65536);
    assert_eq!(config.scanner.regex_window, 4096);
    assert_eq!(config.memory.max_read_size, 100 * 1024 * 1024);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.file, Some(PathBuf::from("probe.log")));
    assert!(validate_config(&config).is_ok());

    let limits = ScanLimits::from(&config);
    assert_eq!(limits.max_results, 500);
    assert_eq!(limits.chunk_size, 65536);
    assert_eq!(limits.float_tolerance, 0.001);
}

#[test]
fn test_save_then_load() {
    let dir = TempDir::new().unwrap();
    let loader = ConfigLoader::new(dir.path().join("saved.toml"));

    let mut config = Config::default();
    config.memory.float_tolerance = 0.5;
    config.scanner.max_chain_offset = 0x200;
    loader.save(&config).unwrap();

    assert_eq!(loader.load().unwrap(), config);
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let loader = ConfigLoader::new(dir.path().join("absent.toml"));

    assert!(matches!(loader.load(), Err(ConfigError::FileNotFound(_))));
    assert_eq!(loader.load_or_default().unwrap(), Config::default());
}

#[test]
fn test_malformed_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[scanner\nmax_results = ").unwrap();

    let loader = ConfigLoader::new(&path);
    assert!(matches!(loader.load(), Err(ConfigError::TomlParse(_))));
    assert!(loader.load_or_default().is_err());
}

#[test]
fn test_invalid_values_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("invalid.toml");
    fs::write(&path, "[scanner]\nchunk_size = 1000\n").unwrap();

    let config = ConfigLoader::new(&path).load().unwrap();
    let err = validate_config(&config).unwrap_err();
    assert!(err.to_string().contains("Chunk size"));

    fs::write(&path, "[logging]\nlevel = \"loud\"\n").unwrap();
    let config = ConfigLoader::new(&path).load().unwrap();
    assert!(validate_config(&config).is_err());
}
