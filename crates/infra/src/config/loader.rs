//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `TEMPORA_DB_PATH`: Database file path
//! - `TEMPORA_DB_POOL_SIZE`: Connection pool size (optional)
//! - `TEMPORA_TRACKER_BASE_URL`: Base URL of the issue-tracker bridge
//! - `TEMPORA_TRACKER_API_TOKEN`: Pre-issued tracker API token
//! - `TEMPORA_TRACKER_TIMEOUT`: Tracker request timeout in seconds (optional)
//! - `TEMPORA_DEFAULT_HOURLY_RATE`: Fallback hourly rate for billing (optional)
//! - `TEMPORA_PAYMENT_TERMS_DAYS`: Invoice payment terms in days (optional)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./tempora.json` or `./tempora.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use tempora_domain::constants::{
    DEFAULT_DB_POOL_SIZE, DEFAULT_PAYMENT_TERMS_DAYS, DEFAULT_TRACKER_TIMEOUT_SECS,
};
use tempora_domain::{
    BillingConfig, DatabaseConfig, Result, TemporaConfig, TemporaError, TrackerConfig,
};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `TemporaError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<TemporaConfig> {
    // Try loading from environment first
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            // Fall back to file
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// The database path, tracker base URL and tracker API token are required;
/// everything else falls back to its default when unset.
///
/// # Errors
/// Returns `TemporaError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<TemporaConfig> {
    let db_path = env_var("TEMPORA_DB_PATH")?;
    let db_pool_size = env_parse("TEMPORA_DB_POOL_SIZE", DEFAULT_DB_POOL_SIZE)?;

    let tracker_base_url = env_var("TEMPORA_TRACKER_BASE_URL")?;
    let tracker_api_token = env_var("TEMPORA_TRACKER_API_TOKEN")?;
    let tracker_timeout = env_parse("TEMPORA_TRACKER_TIMEOUT", DEFAULT_TRACKER_TIMEOUT_SECS)?;

    let default_hourly_rate = match std::env::var("TEMPORA_DEFAULT_HOURLY_RATE") {
        Ok(raw) => Some(Decimal::from_str_exact(&raw).map_err(|e| {
            TemporaError::Config(format!("Invalid value for TEMPORA_DEFAULT_HOURLY_RATE: {}", e))
        })?),
        Err(_) => None,
    };
    let payment_terms_days = env_parse("TEMPORA_PAYMENT_TERMS_DAYS", DEFAULT_PAYMENT_TERMS_DAYS)?;

    Ok(TemporaConfig {
        database: DatabaseConfig { path: db_path, pool_size: db_pool_size },
        tracker: TrackerConfig {
            base_url: tracker_base_url,
            api_token: tracker_api_token,
            timeout_seconds: tracker_timeout,
        },
        billing: BillingConfig { default_hourly_rate, payment_terms_days },
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `TemporaError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<TemporaConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(TemporaError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            TemporaError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| TemporaError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `TemporaError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<TemporaConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| TemporaError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| TemporaError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(TemporaError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches for config files in the following locations (in order):
/// 1. Current working directory (`./config.{json,toml}`,
///    `./tempora.{json,toml}`)
/// 2. Parent directories (up to 2 levels)
/// 3. Relative to executable location
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    // Try current working directory
    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(vec![
            cwd.join("config.json"),
            cwd.join("config.toml"),
            cwd.join("tempora.json"),
            cwd.join("tempora.toml"),
            cwd.join("../config.json"),
            cwd.join("../config.toml"),
            cwd.join("../../config.json"),
            cwd.join("../../config.toml"),
        ]);
    }

    // Try relative to executable
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(vec![
                exe_dir.join("config.json"),
                exe_dir.join("config.toml"),
                exe_dir.join("tempora.json"),
                exe_dir.join("tempora.toml"),
                exe_dir.join("../config.json"),
                exe_dir.join("../config.toml"),
                exe_dir.join("../../config.json"),
                exe_dir.join("../../config.toml"),
            ]);
        }
    }

    // Return first existing candidate
    candidates.into_iter().find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `TemporaError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        TemporaError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Parse an optional environment variable, falling back to a default
///
/// # Errors
/// Returns `TemporaError::Config` if the variable is set but does not parse.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| TemporaError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ALL_VARS: &[&str] = &[
        "TEMPORA_DB_PATH",
        "TEMPORA_DB_POOL_SIZE",
        "TEMPORA_TRACKER_BASE_URL",
        "TEMPORA_TRACKER_API_TOKEN",
        "TEMPORA_TRACKER_TIMEOUT",
        "TEMPORA_DEFAULT_HOURLY_RATE",
        "TEMPORA_PAYMENT_TERMS_DAYS",
    ];

    fn clear_env() {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("TEMPORA_DB_PATH", "/tmp/test.db");
        std::env::set_var("TEMPORA_DB_POOL_SIZE", "5");
        std::env::set_var("TEMPORA_TRACKER_BASE_URL", "http://localhost:3000");
        std::env::set_var("TEMPORA_TRACKER_API_TOKEN", "secret-token");
        std::env::set_var("TEMPORA_TRACKER_TIMEOUT", "10");
        std::env::set_var("TEMPORA_DEFAULT_HOURLY_RATE", "85.5");
        std::env::set_var("TEMPORA_PAYMENT_TERMS_DAYS", "14");

        let result = load_from_env();
        assert!(result.is_ok(), "Should load config from env vars, error: {:?}", result.err());

        let config = result.unwrap();
        assert_eq!(config.database.path, "/tmp/test.db");
        assert_eq!(config.database.pool_size, 5);
        assert_eq!(config.tracker.base_url, "http://localhost:3000");
        assert_eq!(config.tracker.api_token, "secret-token");
        assert_eq!(config.tracker.timeout_seconds, 10);
        assert_eq!(
            config.billing.default_hourly_rate,
            Some(Decimal::from_str_exact("85.5").unwrap())
        );
        assert_eq!(config.billing.payment_terms_days, 14);

        clear_env();
    }

    #[test]
    fn test_load_from_env_optional_vars_default() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("TEMPORA_DB_PATH", "/tmp/test.db");
        std::env::set_var("TEMPORA_TRACKER_BASE_URL", "http://localhost:3000");
        std::env::set_var("TEMPORA_TRACKER_API_TOKEN", "secret-token");

        let config = load_from_env().expect("required vars are set");
        assert_eq!(config.database.pool_size, DEFAULT_DB_POOL_SIZE);
        assert_eq!(config.tracker.timeout_seconds, DEFAULT_TRACKER_TIMEOUT_SECS);
        assert!(config.billing.default_hourly_rate.is_none());
        assert_eq!(config.billing.payment_terms_days, DEFAULT_PAYMENT_TERMS_DAYS);

        clear_env();
    }

    #[test]
    fn test_load_from_env_missing_var() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let result = load_from_env();
        assert!(result.is_err(), "Should fail with missing env var");

        let err = result.unwrap_err();
        assert!(matches!(err, TemporaError::Config(_)), "Should be a Config error");
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("TEMPORA_DB_PATH", "/tmp/test.db");
        std::env::set_var("TEMPORA_DB_POOL_SIZE", "not-a-number");
        std::env::set_var("TEMPORA_TRACKER_BASE_URL", "http://localhost:3000");
        std::env::set_var("TEMPORA_TRACKER_API_TOKEN", "secret-token");

        let result = load_from_env();
        assert!(result.is_err(), "Should fail with invalid pool size");

        let err = result.unwrap_err();
        assert!(matches!(err, TemporaError::Config(_)), "Should be a Config error");

        clear_env();
    }

    #[test]
    fn test_load_from_env_invalid_rate() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("TEMPORA_DB_PATH", "/tmp/test.db");
        std::env::set_var("TEMPORA_TRACKER_BASE_URL", "http://localhost:3000");
        std::env::set_var("TEMPORA_TRACKER_API_TOKEN", "secret-token");
        std::env::set_var("TEMPORA_DEFAULT_HOURLY_RATE", "fifty");

        let result = load_from_env();
        assert!(result.is_err(), "Should fail with invalid hourly rate");

        clear_env();
    }

    #[test]
    fn test_load_from_file_json() {
        let json_content = r#"{
            "database": {
                "path": "test.db",
                "pool_size": 4
            },
            "tracker": {
                "base_url": "http://localhost:3000",
                "api_token": "file-token",
                "timeout_seconds": 20
            },
            "billing": {
                "default_hourly_rate": 75,
                "payment_terms_days": 21
            }
        }"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(json_content.as_bytes()).unwrap();
        let path = temp_file.path().with_extension("json");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let result = load_from_file(Some(path.clone()));
        assert!(result.is_ok(), "Should load config from JSON file");

        let config = result.unwrap();
        assert_eq!(config.database.path, "test.db");
        assert_eq!(config.database.pool_size, 4);
        assert_eq!(config.tracker.api_token, "file-token");
        assert_eq!(config.billing.payment_terms_days, 21);

        // Cleanup
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_toml() {
        let toml_content = r#"
[database]
path = "test.db"
pool_size = 6

[tracker]
base_url = "http://localhost:3000"
api_token = "toml-token"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        let path = temp_file.path().with_extension("toml");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let result = load_from_file(Some(path.clone()));
        assert!(result.is_ok(), "Should load config from TOML file");

        let config = result.unwrap();
        assert_eq!(config.database.path, "test.db");
        assert_eq!(config.database.pool_size, 6);
        assert_eq!(config.tracker.api_token, "toml-token");
        assert_eq!(config.tracker.timeout_seconds, DEFAULT_TRACKER_TIMEOUT_SECS);

        // Cleanup
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/config.json")));
        assert!(result.is_err(), "Should fail when file not found");

        let err = result.unwrap_err();
        assert!(matches!(err, TemporaError::Config(_)), "Should be a Config error");
    }

    #[test]
    fn test_load_from_file_invalid_json() {
        let invalid_json = r#"{ "this is": "not valid json" "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_json.as_bytes()).unwrap();
        let path = temp_file.path().with_extension("json");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let result = load_from_file(Some(path.clone()));
        assert!(result.is_err(), "Should fail with invalid JSON");

        // Cleanup
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let content = "some content";
        let path = PathBuf::from("test.yaml");
        let result = parse_config(content, &path);
        assert!(result.is_err(), "Should fail with unsupported format");
    }
}
