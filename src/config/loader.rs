//! Configuration loading and environment variable interpolation

use crate::error::{Error, Result};
use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::Config;

pub const CONFIG_FILENAME: &str = "rainsafe.toml";

/// Load configuration from rainsafe.toml, falling back to defaults when no file exists
pub fn load_config() -> Result<Config> {
    match find_config_file()? {
        Some(config_path) => load_config_from_path(&config_path),
        None => {
            tracing::debug!("No {} found, using defaults", CONFIG_FILENAME);
            Ok(Config::default())
        }
    }
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
    parse_config(&content)
}

/// Parse configuration text after interpolating environment variables
pub fn parse_config(content: &str) -> Result<Config> {
    let content = interpolate_env_vars(content);
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

/// Write configuration to a specific path
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}

/// Find the configuration file, searching upward from current directory
fn find_config_file() -> Result<Option<PathBuf>> {
    let mut current = env::current_dir().map_err(|e| Error::Config(e.to_string()))?;

    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Ok(Some(config_path));
        }

        if !current.pop() {
            return Ok(None);
        }
    }
}

/// Interpolate environment variables in the format ${VAR_NAME} or ${VAR_NAME:-default}
fn interpolate_env_vars(content: &str) -> String {
    // This regex is a compile-time constant, panicking is acceptable here
    // as it indicates a programming error in the codebase, not a runtime issue
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("Invalid regex pattern - this is a bug in the codebase");

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        env::var(var_name).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}

/// Generate a default configuration file content
pub fn default_config_content() -> &'static str {
    r#"# RainSafe client configuration

[api]
# Base URL of the RainSafe REST API (trailing slash optional)
base_url = "${RAINSAFE_API_URL:-http://127.0.0.1:8000/api/}"
timeout_secs = 15

[storage]
# Where the session tokens are kept. Defaults to the platform data directory.
# path = "./.rainsafe/session.json"

[notifications]
# How often to check for new notifications
poll_interval_secs = 30
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_env_interpolation() {
        env::set_var("RAINSAFE_TEST_VAR", "hello");
        let content = "value = \"${RAINSAFE_TEST_VAR}\"";
        let result = interpolate_env_vars(content);
        assert_eq!(result, "value = \"hello\"");
        env::remove_var("RAINSAFE_TEST_VAR");
    }

    #[test]
    fn test_env_interpolation_with_default() {
        let content = "value = \"${NONEXISTENT_VAR:-default_value}\"";
        let result = interpolate_env_vars(content);
        assert_eq!(result, "value = \"default_value\"");
    }

    #[test]
    fn test_default_content_parses() {
        let config = parse_config(default_config_content()).expect("default config parses");
        assert_eq!(config.notifications.poll_interval_secs, 30);
        assert_eq!(config.api.timeout_secs, 15);
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);

        let mut config = Config::default();
        config.api.base_url = "https://weather.example.edu/api/".to_string();
        config.notifications.poll_interval_secs = 10;

        save_config(&config, &path).unwrap();
        let loaded = load_config_from_path(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = parse_config("[api]\nbase_url = \"http://localhost:9000/api/\"\n").unwrap();
        assert_eq!(config.api.base_url, "http://localhost:9000/api/");
        assert_eq!(config.api.timeout_secs, 15);
        assert_eq!(config.notifications.poll_interval_secs, 30);
    }
}
