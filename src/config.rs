//! Browser configuration
//!
//! Loaded once at startup from a TOML file, optionally overridden from the
//! environment, and then passed explicitly to the cache and sync engine.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

/// Default IPC socket path
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/config-browser.sock";

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "CONFIG_BROWSER_CONFIG";

/// Default per-request timeout for remote calls
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default number of retries for retryable listing errors
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrowserConfig {
    /// Local directory holding the configuration files
    pub config_folder: PathBuf,
    /// Unix socket the IPC server listens on
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
    /// Remote sync settings
    #[serde(default)]
    pub sync: SyncSettings,
}

/// Settings for refreshing the config folder from a bucket
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSettings {
    /// Whether the sync action is offered at all
    pub enabled: bool,
    /// Bucket to pull from
    pub bucket: String,
    /// Key prefix scoping the sync
    pub prefix: String,
    /// AWS region override
    pub region: Option<String>,
    /// Endpoint override for S3-compatible stores
    pub endpoint: Option<String>,
    /// List nested keys too instead of stopping at the first `/` after the prefix
    pub recursive: bool,
    /// Timeout applied to each remote call
    pub request_timeout_secs: u64,
    /// Retries for a failed page request before giving up on the pass
    pub max_retries: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            bucket: String::new(),
            prefix: String::new(),
            region: None,
            endpoint: None,
            recursive: false,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl SyncSettings {
    /// Timeout for a single remote call
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Listing delimiter: `/` unless the sync is recursive
    pub fn delimiter(&self) -> Option<&'static str> {
        if self.recursive {
            None
        } else {
            Some("/")
        }
    }
}

fn default_socket_path() -> PathBuf {
    PathBuf::from(DEFAULT_SOCKET_PATH)
}

impl BrowserConfig {
    /// Load configuration from a TOML file and apply environment overrides
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded config file");

        let mut config = Self::from_toml_str(&raw)?;
        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text without validation
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply overrides from a variable lookup (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(folder) = lookup("CONFIG_FOLDER") {
            self.config_folder = PathBuf::from(folder);
        }
        if let Some(bucket) = lookup("SYNC_BUCKET") {
            self.sync.bucket = bucket;
        }
        if let Some(prefix) = lookup("SYNC_PREFIX") {
            self.sync.prefix = prefix;
        }
        if let Some(enabled) = lookup("SYNC_ENABLED") {
            self.sync.enabled = matches!(enabled.trim(), "1" | "true" | "yes" | "on");
        }
    }

    /// Check the invariants the rest of the crate relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.config_folder.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("config_folder must not be empty".into()));
        }
        if self.sync.enabled && self.sync.bucket.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "sync.bucket is required when sync is enabled".into(),
            ));
        }
        Ok(())
    }

    /// Resolve the config file location: explicit path, env var, then the platform config dir
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("config-browser")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_full_config() {
        let raw = r#"
            config_folder = "/opt/goobi/config"
            socket_path = "/run/browser.sock"

            [sync]
            enabled = true
            bucket = "configs"
            prefix = "production/config/"
            region = "eu-central-1"
            endpoint = "https://s3.example.org"
            request_timeout_secs = 5
            max_retries = 1
        "#;
        let config = BrowserConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.config_folder, PathBuf::from("/opt/goobi/config"));
        assert_eq!(config.socket_path, PathBuf::from("/run/browser.sock"));
        assert!(config.sync.enabled);
        assert_eq!(config.sync.bucket, "configs");
        assert_eq!(config.sync.prefix, "production/config/");
        assert_eq!(config.sync.region.as_deref(), Some("eu-central-1"));
        assert_eq!(config.sync.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.sync.max_retries, 1);
        assert_eq!(config.sync.delimiter(), Some("/"));
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults_when_sync_section_missing() {
        let config = BrowserConfig::from_toml_str(r#"config_folder = "/cfg""#).unwrap();
        assert!(!config.sync.enabled);
        assert_eq!(config.socket_path, PathBuf::from(DEFAULT_SOCKET_PATH));
        assert_eq!(config.sync.request_timeout_secs, 30);
        assert_eq!(config.sync.max_retries, 3);
        config.validate().unwrap();
    }

    #[test]
    fn test_recursive_drops_delimiter() {
        let raw = r#"
            config_folder = "/cfg"
            [sync]
            recursive = true
        "#;
        let config = BrowserConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.sync.delimiter(), None);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let raw = r#"
            config_folder = "/cfg"
            [sync]
            bucket_name = "typo"
        "#;
        assert!(matches!(
            BrowserConfig::from_toml_str(raw),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_enabled_without_bucket_is_invalid() {
        let raw = r#"
            config_folder = "/cfg"
            [sync]
            enabled = true
        "#;
        let config = BrowserConfig::from_toml_str(raw).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_overrides() {
        let mut config = BrowserConfig::from_toml_str(r#"config_folder = "/cfg""#).unwrap();
        let vars: HashMap<&str, &str> = [
            ("CONFIG_FOLDER", "/other"),
            ("SYNC_BUCKET", "bucket-b"),
            ("SYNC_PREFIX", "p/"),
            ("SYNC_ENABLED", "true"),
        ]
        .into_iter()
        .collect();

        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.config_folder, PathBuf::from("/other"));
        assert_eq!(config.sync.bucket, "bucket-b");
        assert_eq!(config.sync.prefix, "p/");
        assert!(config.sync.enabled);
        config.validate().unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = BrowserConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
