//! Configuration management for digest.
//!
//! Loads configuration from ${DIGEST_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::messages::Locale;

/// Environment variable that overrides `base_url`.
pub const BASE_URL_ENV: &str = "DIGEST_BASE_URL";

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for digest configuration and data files.
    //!
    //! DIGEST_HOME resolution order:
    //! 1. DIGEST_HOME environment variable (if set)
    //! 2. ~/.config/digest (default)

    use std::path::PathBuf;

    /// Returns the digest home directory.
    pub fn digest_home() -> PathBuf {
        if let Ok(home) = std::env::var("DIGEST_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".digest"),
            |h| h.join(".config").join("digest"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        digest_home().join("config.toml")
    }

    /// Returns the path to the stored session credentials.
    pub fn credentials_path() -> PathBuf {
        digest_home().join("credentials.json")
    }

    /// Returns the path to the cached vote map.
    pub fn votes_path() -> PathBuf {
        digest_home().join("votes.json")
    }

    /// Returns the path to the remembered admin table pagination.
    pub fn admin_pagination_path() -> PathBuf {
        digest_home().join("admin_pagination.json")
    }

    /// Returns the directory for rotated log files.
    pub fn logs_dir() -> PathBuf {
        digest_home().join("logs")
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives for stderr output.
    pub filter: String,
    /// Write a daily-rotated log file in addition to stderr.
    pub file: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
            file: false,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the REST API (path prefix included)
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Feed page size
    pub page_size: u32,
    /// Locale for user-facing error messages
    pub locale: Locale,
    pub log: LogConfig,
}

impl Config {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:8000/api";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
    pub const DEFAULT_PAGE_SIZE: u32 = 10;

    /// Loads configuration from the default path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    ///
    /// # Errors
    /// Returns an error if the file exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Sets a single key (dotted for nested tables, e.g. `log.file`).
    ///
    /// Creates the file from the template if it doesn't exist. Comments and
    /// unrelated keys are preserved using `toml_edit`. The edited document
    /// must still deserialize into a valid `Config`.
    ///
    /// # Errors
    /// Returns an error if the key is unknown, the value has the wrong type,
    /// or the file cannot be written.
    pub fn set_value(path: &Path, key: &str, raw: &str) -> Result<()> {
        use toml_edit::{DocumentMut, Item, Table};

        let contents = if path.exists() {
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        let parts: Vec<&str> = key.split('.').map(str::trim).collect();
        let Some((leaf, tables)) = parts.split_last() else {
            anyhow::bail!("Empty config key");
        };
        if leaf.is_empty() || tables.iter().any(|t| t.is_empty()) {
            anyhow::bail!("Invalid config key '{key}'");
        }

        let known = Self::known_keys();
        if !known.contains(&key) {
            anyhow::bail!(
                "Unknown config key '{key}'. Known keys: {}",
                known.join(", ")
            );
        }

        let mut table = doc.as_table_mut();
        for name in tables {
            if !table.contains_key(name) {
                table.insert(name, Item::Table(Table::new()));
            }
            table = table[*name]
                .as_table_mut()
                .with_context(|| format!("Config key '{name}' is not a table"))?;
        }
        table[*leaf] = Item::Value(parse_value(raw));

        let updated = doc.to_string();
        toml::from_str::<Config>(&updated)
            .with_context(|| format!("Invalid value for '{key}': {raw}"))?;

        Self::write_config(path, &updated)
    }

    /// Keys accepted by [`Config::set_value`].
    pub fn known_keys() -> &'static [&'static str] {
        &[
            "base_url",
            "timeout_secs",
            "page_size",
            "locale",
            "log.filter",
            "log.file",
        ]
    }

    /// Renders the configuration as TOML (without the template comments).
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Resolves the base URL with precedence: env > config > default.
    ///
    /// # Errors
    /// Returns an error if the resolved value is not a valid http(s) URL.
    pub fn effective_base_url(&self) -> Result<String> {
        resolve_base_url(Some(&self.base_url), BASE_URL_ENV, Self::DEFAULT_BASE_URL)
    }

    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            page_size: Self::DEFAULT_PAGE_SIZE,
            locale: Locale::default(),
            log: LogConfig::default(),
        }
    }
}

/// Interprets a command-line value as a TOML scalar, falling back to a string.
fn parse_value(raw: &str) -> toml_edit::Value {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return toml_edit::Value::from(v);
    }
    if let Ok(v) = trimmed.parse::<bool>() {
        return toml_edit::Value::from(v);
    }
    toml_edit::Value::from(trimmed)
}

/// Resolves a base URL with precedence: env > config > default.
///
/// # Errors
/// Returns an error if the chosen URL is not a valid http(s) URL.
pub fn resolve_base_url(
    config_base_url: Option<&str>,
    env_var: &str,
    default_url: &str,
) -> Result<String> {
    if let Ok(env_url) = std::env::var(env_var) {
        let trimmed = env_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    if let Some(config_url) = config_base_url {
        let trimmed = config_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    Ok(default_url.to_string())
}

fn validate_url(value: &str) -> Result<()> {
    let parsed = url::Url::parse(value).with_context(|| format!("Invalid base URL: {value}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => anyhow::bail!("Unsupported URL scheme '{other}' in base URL: {value}"),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    /// Config loading: missing file returns defaults.
    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.base_url, Config::DEFAULT_BASE_URL);
        assert_eq!(config.page_size, 10);
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.locale, Locale::Vi);
    }

    /// Config loading: partial config merges with defaults.
    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "page_size = 25\n[log]\nfile = true\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.page_size, 25);
        assert!(config.log.file);
        assert_eq!(config.log.filter, "warn");
        assert_eq!(config.base_url, Config::DEFAULT_BASE_URL);
    }

    /// Config init: creates file from the template, creates parent dirs.
    #[test]
    fn test_init_creates_config_with_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("base_url ="));
        assert!(contents.contains("# Request timeout in seconds."));

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.page_size, Config::DEFAULT_PAGE_SIZE);
    }

    /// Config init: fails if file exists (no silent overwrite).
    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "").unwrap();

        assert!(Config::init(&config_path).is_err());
    }

    /// Config set: edits one key and keeps the comments around it.
    #[test]
    fn test_set_value_preserves_comments() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        Config::init(&config_path).unwrap();

        Config::set_value(&config_path, "page_size", "30").unwrap();
        Config::set_value(&config_path, "log.file", "true").unwrap();
        Config::set_value(&config_path, "locale", "en").unwrap();

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("# Number of items fetched per feed page."));

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.page_size, 30);
        assert!(config.log.file);
        assert_eq!(config.locale, Locale::En);
    }

    #[test]
    fn test_set_value_rejects_unknown_key_and_bad_type() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        assert!(Config::set_value(&config_path, "model", "x").is_err());
        assert!(Config::set_value(&config_path, "page_size", "many").is_err());
        assert!(!config_path.exists());
    }

    #[test]
    fn test_resolve_base_url_prefers_config_over_default() {
        let url = resolve_base_url(
            Some("https://news.example.com/api/"),
            "DIGEST_TEST_UNSET_BASE_URL",
            Config::DEFAULT_BASE_URL,
        )
        .unwrap();
        assert_eq!(url, "https://news.example.com/api");

        let url = resolve_base_url(Some("  "), "DIGEST_TEST_UNSET_BASE_URL", "http://d").unwrap();
        assert_eq!(url, "http://d");
    }

    #[test]
    fn test_resolve_base_url_rejects_bad_scheme() {
        let err = resolve_base_url(
            Some("ftp://news.example.com"),
            "DIGEST_TEST_UNSET_BASE_URL",
            Config::DEFAULT_BASE_URL,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Unsupported URL scheme"));
    }
}
