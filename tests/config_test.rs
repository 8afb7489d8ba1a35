//! Tests for config loading from files and environment variables

use serial_test::serial;
use std::io::Write;
use tempfile::NamedTempFile;
use wordday::config::Config;

const ENV_VARS: &[&str] = &[
    "WORDDAY_ENDPOINTS",
    "WORDDAY_MAX_ATTEMPTS",
    "WORDDAY_UTC_OFFSET_MINUTES",
    "WORDDAY_SNAPSHOT_PATH",
    "WORDDAY_MAX_ITEMS_PER_KEY",
    "WORDDAY_DAILY_TIME",
    "WORDDAY_ENABLE_HEALTH",
    "WORDDAY_PORT",
    "WORDDAY_LOG_FORMAT",
];

fn clear_env() {
    for var in ENV_VARS {
        std::env::remove_var(var);
    }
}

#[test]
fn test_config_from_toml_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[resolver]
endpoints = ["https://example.com/answers/{{date}}.json"]
max_attempts = 5
utc_offset_minutes = -300

[store]
snapshot_path = "/tmp/wordday/store.json"
max_items_per_key = 4

[scheduler]
daily_time = "05:15"
enable_health_check = false

[server]
host = "0.0.0.0"
port = 3000

[logging]
format = "json"
"#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert!(config.validate().is_ok());

    assert_eq!(config.resolver.endpoints.len(), 1);
    assert_eq!(config.resolver.max_attempts, 5);
    assert_eq!(config.resolver.utc_offset_minutes, -300);
    assert_eq!(config.resolver.request_timeout_ms, 2_000);
    assert_eq!(config.store.max_items_per_key, 4);
    assert_eq!(config.scheduler.daily_time, "05:15");
    assert!(!config.scheduler.enable_health_check);
    assert!(config.scheduler.enable_daily_generation);
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.logging.format, "json");
    assert!(!config.cache.enabled);
}

#[test]
fn test_invalid_toml_file_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[scheduler\ndaily_time = ").unwrap();

    let err = Config::from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse TOML"));
}

#[test]
fn test_load_validates() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[scheduler]\ncleanup_interval_hours = 0\n").unwrap();

    assert!(Config::from_file(file.path()).is_ok());
    assert!(Config::load(Some(file.path())).is_err());
}

#[test]
fn test_missing_file_is_error() {
    let err = Config::from_file(std::path::Path::new("/nonexistent/wordday.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
#[serial]
fn test_config_from_env() {
    clear_env();
    std::env::set_var(
        "WORDDAY_ENDPOINTS",
        "https://a.example/{date}, https://b.example/{date}",
    );
    std::env::set_var("WORDDAY_MAX_ATTEMPTS", "4");
    std::env::set_var("WORDDAY_UTC_OFFSET_MINUTES", "540");
    std::env::set_var("WORDDAY_SNAPSHOT_PATH", "/var/lib/wordday/store.json");
    std::env::set_var("WORDDAY_MAX_ITEMS_PER_KEY", "3");
    std::env::set_var("WORDDAY_DAILY_TIME", "09:00");
    std::env::set_var("WORDDAY_ENABLE_HEALTH", "false");
    std::env::set_var("WORDDAY_PORT", "9999");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(
        config.resolver.endpoints,
        vec!["https://a.example/{date}", "https://b.example/{date}"]
    );
    assert_eq!(config.resolver.max_attempts, 4);
    assert_eq!(config.resolver.utc_offset_minutes, 540);
    assert_eq!(
        config.store.snapshot_path,
        std::path::PathBuf::from("/var/lib/wordday/store.json")
    );
    assert_eq!(config.store.max_items_per_key, 3);
    assert_eq!(config.scheduler.daily_time, "09:00");
    assert!(!config.scheduler.enable_health_check);
    assert_eq!(config.server.port, 9999);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_env_garbage_falls_back_to_defaults() {
    clear_env();
    std::env::set_var("WORDDAY_MAX_ATTEMPTS", "many");
    std::env::set_var("WORDDAY_PORT", "-1");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.resolver.max_attempts, 3);
    assert_eq!(config.server.port, 8080);
}

#[test]
#[serial]
fn test_env_invalid_log_format_fails_validation() {
    clear_env();
    std::env::set_var("WORDDAY_LOG_FORMAT", "xml");

    let config = Config::from_env().unwrap();
    clear_env();

    assert!(config.validate().is_err());
}
