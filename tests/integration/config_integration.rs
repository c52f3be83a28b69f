//! Integration tests for layered configuration

use clap::Parser;
use tempfile::TempDir;
use zkcopy::cli::Cli;
use zkcopy::config::ConfigLoader;

use crate::integration::with_env;

const CONFIG_FILE: &str = r#"
source = "zk1:2181/app"
target = "zk2:2181/backup"
workers = 2
copy_only = false

[retry]
max_attempts = 3
initial_delay_ms = 50
"#;

fn write_config(temp_dir: &TempDir) -> std::path::PathBuf {
    let path = temp_dir.path().join("zkcopy.toml");
    std::fs::write(&path, CONFIG_FILE).unwrap();
    path
}

/// Test that environment variables override the config file
#[test]
fn test_env_overrides_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir);

    let config = with_env(
        &[
            ("ZKCOPY_WORKERS", "4"),
            ("ZKCOPY_COPY_ONLY", "true"),
            ("ZKCOPY_RETRY__MAX_ATTEMPTS", "7"),
        ],
        || ConfigLoader::load(Some(&path)).unwrap(),
    );

    assert_eq!(config.workers, 4);
    assert!(config.copy_only);
    assert_eq!(config.retry.max_attempts, 7);
    assert_eq!(config.retry.initial_delay_ms, 50);
    assert_eq!(config.source.as_deref(), Some("zk1:2181/app"));
}

/// Test that command-line flags override both the environment and the file
#[test]
fn test_flags_override_env_and_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir);
    let path_arg = path.to_string_lossy().to_string();

    let config = with_env(
        &[
            ("ZKCOPY_WORKERS", "4"),
            ("ZKCOPY_COPY_ONLY", "true"),
            ("ZKCOPY_TARGET", "zk3:2181/env"),
        ],
        || {
            Cli::try_parse_from([
                "zkcopy",
                "--config",
                path_arg.as_str(),
                "-w",
                "8",
                "-c",
                "false",
            ])
            .unwrap()
            .into_config()
            .unwrap()
        },
    );

    assert_eq!(config.workers, 8);
    assert!(!config.copy_only);
    assert!(config.delete_stale());
    assert_eq!(config.target.as_deref(), Some("zk3:2181/env"));
    assert_eq!(config.source.as_deref(), Some("zk1:2181/app"));
    assert_eq!(config.retry.max_attempts, 3);
    assert!(config.validate().is_ok());
}

/// Test that the environment alone can supply a complete configuration
#[test]
fn test_env_only_configuration() {
    let config = with_env(
        &[
            ("ZKCOPY_SOURCE", "zk1:2181/app"),
            ("ZKCOPY_TARGET", "zk2:2181/app"),
            ("ZKCOPY_LOGGING__LEVEL", "debug"),
        ],
        || ConfigLoader::load(None).unwrap(),
    );

    assert!(config.validate().is_ok());
    assert_eq!(config.workers, 10);
    assert_eq!(config.logging.level, "debug");
}
